//! # TextHooker 캡처 클라이언트 진입점
//!
//! 1. 환경변수(.env) 로딩, 로깅 초기화
//! 2. 로컬 저장소 열기 → 설정 읽기 (환경변수 > 로컬 환경설정 > 기본값)
//! 3. 세션 저장소에서 세션을 불러와 타이머 시작값 조정
//! 4. 브리지 소켓 접속, 방 설정이 있으면 릴레이 접속 + 입장
//! 5. 표준 입력을 붙여넣기 영역으로 사용 (`:toggle`, `:edit 120` 같은 명령도 여기로)
//! 6. Ctrl+C → 마지막 체크포인트 후 종료

use anyhow::Result;
use std::time::Instant;
use texthooker::client::{
    config::{data_dir_from_env, CaptureConfig},
    local::LocalStore,
    CaptureClient, ClientSettings, HttpSessionStore, Inputs,
};
use tokio::{io::AsyncReadExt, sync::mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STDIN_CHUNK: usize = 4096;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "texthooker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut local = LocalStore::open_in(&data_dir_from_env()).await?;
    let config = CaptureConfig::from_env(local.preferences())?;
    let preferences = config.to_preferences(local.preferences());
    local.set_preferences(preferences).await?;
    tracing::info!(
        "Capturing into {:?} (local store {})",
        config.target,
        local.path().display()
    );

    let store = HttpSessionStore::new(config.api_url.clone(), config.access_token.clone());
    let mut client = CaptureClient::open(store, local, ClientSettings::from(&config), Instant::now()).await;

    let bridge = client.connect_bridge(&config.bridge_url, config.reconnect);
    let relay = match &config.room {
        Some(room) => {
            let url = with_token(&room.relay_url, config.access_token.as_deref());
            let relay = client.connect_relay(&url, config.reconnect);
            client.join_room(room, config.username.clone()).await;
            relay
        }
        // 송신자가 없는 채널: 릴레이 이벤트가 오지 않음
        None => mpsc::channel(1).1,
    };

    let (paste_tx, paste) = mpsc::channel(16);
    tokio::spawn(read_stdin(paste_tx));

    client
        .run(Inputs { bridge, relay, paste }, shutdown_signal())
        .await;
    Ok(())
}

/// 릴레이 URL에 액세스 토큰을 붙여 인증된 사용자로 접속합니다.
fn with_token(url: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}token={}", url, separator, token)
        }
        None => url.to_string(),
    }
}

async fn read_stdin(tx: mpsc::Sender<Vec<u8>>) {
    let mut stdin = tokio::io::stdin();
    let mut buf = vec![0u8; STDIN_CHUNK];
    loop {
        match stdin.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down capture client");
}

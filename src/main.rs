//! # TextHooker 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 로딩
//! 4. SQLite 데이터베이스 연결 풀 생성
//! 5. 데이터베이스 마이그레이션 실행
//! 6. 만료된 방 세션 정리 작업(sweeper) 시작
//! 7. API 라우터 + WebSocket 릴레이 설정
//! 8. HTTP 서버 시작 (Ctrl+C로 정상 종료)

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::time::Duration;
use texthooker::{build_router, config::Config, db, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 texthooker, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "texthooker=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting TextHooker server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 생성 ──
    // `?mode=rwc` 없이 파일 경로만 주면 파일이 없을 때 실패하므로 create_if_missing을 켭니다.
    let options = config
        .database_url
        .parse::<sqlx::sqlite::SqliteConnectOptions>()?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // ── 5단계: 마이그레이션 ──
    tracing::info!("Running database migrations...");
    db::MIGRATOR.run(&pool).await?;

    // ── 6단계: 만료 세션 정리 작업 ──
    // 방 세션은 임시 데이터이므로 주기적으로 지웁니다.
    // 만료된 행은 정리되기 전에도 조회에서 제외됩니다.
    tokio::spawn(sweep_expired_sessions(
        pool.clone(),
        Duration::from_secs(config.session_sweep_interval_secs),
    ));

    // ── 7단계: 애플리케이션 상태 + 라우터 ──
    let state = AppState::new(pool, config.jwt_secret.clone(), config.room_session_ttl_hours);
    let app = build_router(state);

    // ── 8단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `interval`마다 만료된 방 세션을 삭제합니다. 실패는 로그만 남기고 계속합니다.
async fn sweep_expired_sessions(pool: SqlitePool, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // 첫 tick은 즉시 완료되므로 시작 직후에도 한 번 정리합니다
    loop {
        ticker.tick().await;
        match db::delete_expired_sessions(&pool).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Swept expired room sessions"),
            Err(e) => tracing::warn!("Failed to sweep expired sessions: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // 신호를 받을 수 없으면 서버를 계속 실행합니다
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

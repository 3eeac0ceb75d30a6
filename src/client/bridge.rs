//! # 브리지 소켓 연결
//!
//! 로컬 텍스트 후킹 도구(브리지)의 WebSocket에 접속해 원문 페이로드를 받습니다.
//! 연결 상태 변화와 수신 텍스트를 채널로 런타임에 전달합니다.
//!
//! 재연결 루프는 `Reconnector`가 소유한 태스크 하나로만 돌아갑니다.
//! 새 연결을 시작하면 이전 태스크(대기 중인 재시도 포함)를 먼저 취소하므로
//! 같은 브리지에 소켓이 두 개 열려 문장이 중복 수집되는 일이 없습니다.

use super::state::ConnectionStatus;
use futures::StreamExt;
use std::{future::Future, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// 브리지에서 런타임으로 가는 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Status(ConnectionStatus),
    Payload(String),
}

/// 취소 가능한 재시도 태스크: 핸들은 항상 하나만 소유합니다
#[derive(Debug, Default)]
pub struct Reconnector {
    handle: Option<JoinHandle<()>>,
}

impl Reconnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 태스크를 취소한 뒤 새 태스크를 시작합니다.
    pub fn start<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.handle = Some(tokio::spawn(task));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Reconnector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 브리지 접속 설정 + 재연결 태스크
pub struct BridgeConnector {
    url: String,
    retry: Option<Duration>,
    tx: mpsc::Sender<BridgeEvent>,
    task: Reconnector,
}

impl BridgeConnector {
    pub fn new(url: impl Into<String>, retry: Option<Duration>, tx: mpsc::Sender<BridgeEvent>) -> Self {
        Self {
            url: url.into(),
            retry,
            tx,
            task: Reconnector::new(),
        }
    }

    /// (재)접속. 진행 중이던 연결이나 재시도는 취소됩니다.
    pub fn connect(&mut self) {
        tracing::info!("Connecting to bridge at {}", self.url);
        self.task
            .start(bridge_loop(self.url.clone(), self.retry, self.tx.clone()));
    }
}

/// 브리지 접속 루프
///
/// `retry`가 None이면 연결 실패나 끊김 후 종료합니다.
/// 수신 채널이 닫히면(런타임 종료) 즉시 끝납니다.
pub async fn bridge_loop(url: String, retry: Option<Duration>, tx: mpsc::Sender<BridgeEvent>) {
    loop {
        if tx.send(BridgeEvent::Status(ConnectionStatus::Connecting)).await.is_err() {
            return;
        }

        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                if tx.send(BridgeEvent::Status(ConnectionStatus::Connected)).await.is_err() {
                    return;
                }
                let status = loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(BridgeEvent::Payload(text.as_str().to_owned())).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break ConnectionStatus::Disconnected,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break ConnectionStatus::Error(e.to_string()),
                    }
                };
                if tx.send(BridgeEvent::Status(status)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!("Bridge connect failed: {}", e);
                if tx
                    .send(BridgeEvent::Status(ConnectionStatus::Error(e.to_string())))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        match retry {
            Some(interval) => tokio::time::sleep(interval).await,
            None => return,
        }
    }
}

//! # 릴레이 클라이언트 연결
//!
//! 방송 릴레이(`/api/v1/ws`)에 접속해 `ClientEvent`를 보내고 `ServerEvent`를 받습니다.
//! 연결이 맺어질 때마다 `RelayEvent::Connected`를 보내므로 런타임이 입장을 다시 요청할 수 있습니다.

use crate::relay::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Connected,
    Server(ServerEvent),
    Disconnected,
}

/// 릴레이 접속 루프
///
/// `outbound`가 닫히면(런타임 종료) 소켓을 닫고 끝납니다.
/// 연결이 없는 동안 쌓인 송신 이벤트는 재연결 직후 버립니다.
/// 입장 전에 보내면 `not in room`으로 거부되기 때문입니다.
pub async fn relay_loop(
    url: String,
    retry: Option<Duration>,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    tx: mpsc::Sender<RelayEvent>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                while outbound.try_recv().is_ok() {}
                if tx.send(RelayEvent::Connected).await.is_err() {
                    return;
                }
                tracing::info!("Connected to relay at {}", url);

                let (mut write, mut read) = ws.split();
                loop {
                    tokio::select! {
                        incoming = read.next() => match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(text.as_str()) {
                                    Ok(event) => {
                                        if tx.send(RelayEvent::Server(event)).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(e) => tracing::debug!("Ignoring unknown relay frame: {}", e),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::warn!("Relay connection error: {}", e);
                                break;
                            }
                        },
                        event = outbound.recv() => match event {
                            Some(event) => {
                                let text = match serde_json::to_string(&event) {
                                    Ok(text) => text,
                                    Err(e) => {
                                        tracing::error!("Failed to encode relay event: {}", e);
                                        continue;
                                    }
                                };
                                if let Err(e) = write.send(Message::Text(text.into())).await {
                                    tracing::warn!("Relay send failed: {}", e);
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                        },
                    }
                }

                if tx.send(RelayEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!("Relay connect failed: {}", e),
        }

        match retry {
            Some(interval) => tokio::time::sleep(interval).await,
            None => return,
        }
    }
}

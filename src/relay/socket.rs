//! # 릴레이 WebSocket 핸들러
//!
//! `GET /api/v1/ws` 로 업그레이드된 연결 하나를 처리합니다.
//!
//! 연결마다 두 개의 흐름이 있습니다:
//! - 작성 태스크: 송신 큐(`mpsc`)의 `ServerEvent`를 JSON 텍스트 프레임으로 보냄
//! - 읽기 루프: 클라이언트 이벤트를 파싱해 레지스트리에 전달
//!
//! 입장 거부는 이 연결의 방 멤버십만 막을 뿐 소켓은 닫지 않습니다.
//! 닫을지 여부는 클라이언트가 정합니다.

use super::protocol::*;
use super::registry::{Connection, RelayError};
use crate::{db, middleware::auth::verify_access_token, models::SessionKey, state::AppState};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// 선택: JWT 액세스 토큰: 유효하면 참가자의 userId로 사용
    pub token: Option<String>,
}

/// WebSocket 업그레이드 핸들러
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    let user_id = params
        .token
        .as_deref()
        .and_then(|token| match verify_access_token(token, &state.jwt_secret) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                tracing::debug!("Ignoring relay token: {:?}", e);
                None
            }
        });

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// 연결 하나의 수명 동안 실행됩니다.
async fn handle_socket(socket: WebSocket, state: AppState, auth_user_id: Option<String>) {
    let conn_id = uuid::Uuid::now_v7().to_string();
    tracing::debug!("Relay connection {} opened", conn_id);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize relay event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut current_room: Option<String> = None;

    while let Some(result) = ws_rx.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Relay connection {} errored: {}", conn_id, e);
                break;
            }
        };

        let event: ClientEvent = match serde_json::from_str(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Invalid relay message from {}: {}", conn_id, e);
                let _ = tx.send(ServerEvent::ErrorMessage("invalid message".to_string()));
                continue;
            }
        };

        match event {
            ClientEvent::JoinRoom(request) => {
                // 다른 방에 있으면 먼저 나감
                if let Some(previous) = current_room.take() {
                    state.rooms.leave(&previous, &conn_id).await;
                }

                let history = match request.role {
                    Role::Guest => load_history(&state, &request.room_id).await,
                    Role::Host => Vec::new(),
                };
                let conn = Connection {
                    id: conn_id.clone(),
                    username: request.username.clone(),
                    // 본문의 userId는 검증할 수 없으므로 토큰에서 얻은 값만 씁니다
                    user_id: auth_user_id.clone(),
                    tx: tx.clone(),
                };

                match state.rooms.join(&request, conn, history).await {
                    Ok(admission) => current_room = Some(admission.room_id),
                    Err(e) => {
                        let _ = tx.send(ServerEvent::ErrorMessage(e.to_string()));
                    }
                }
            }
            ClientEvent::SendLine(send) => {
                if current_room.as_deref() != Some(send.room_id.as_str()) {
                    let _ = tx.send(ServerEvent::ErrorMessage(RelayError::NotInRoom.to_string()));
                    continue;
                }
                if let Err(e) = state
                    .rooms
                    .relay_line(&send.room_id, &conn_id, send.line_data)
                    .await
                {
                    let _ = tx.send(ServerEvent::ErrorMessage(e.to_string()));
                }
            }
        }
    }

    if let Some(room_id) = current_room {
        state.rooms.leave(&room_id, &conn_id).await;
    }
    send_task.abort();
    tracing::debug!("Relay connection {} closed", conn_id);
}

/// 방에 연결된 세션의 문장 기록: 없거나 조회에 실패하면 빈 기록
async fn load_history(state: &AppState, room_id: &str) -> Vec<LineData> {
    match db::get_session_view(&state.pool, &SessionKey::room(room_id)).await {
        Ok(view) => view.lines.iter().map(LineData::from).collect(),
        Err(e) => {
            tracing::warn!("Failed to load history for room {}: {}", room_id, e);
            Vec::new()
        }
    }
}

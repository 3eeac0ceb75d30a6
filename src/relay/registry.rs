//! # 방(Room) 레지스트리
//!
//! 방 ID → 접속 중인 참가자 목록 + 호스트 토큰을 메모리에만 보관합니다.
//! 프로세스가 재시작되면 모든 방이 사라집니다.
//!
//! ## 방 상태
//! ```text
//! [없음] ──host join──▶ ACTIVE(호스트) ──guest join──▶ ACTIVE(호스트+게스트)
//!   ▲                                                       │
//!   └──────────── 마지막 연결 종료 (참가자 0명) ◀────────────┘
//! ```
//! 호스트가 나가도 게스트가 남아 있으면 방은 유지되고, 같은 토큰을 가진
//! 연결이 다시 호스트로 들어올 때까지 문장 릴레이가 멈춥니다.
//!
//! ## 동시성
//! 모든 변경(입장, 퇴장, 토큰 발급)과 그에 따른 `room_users_update` 송신은
//! 하나의 Mutex 안에서 일어납니다. 송신은 연결별 unbounded 큐에 넣는 것뿐이라
//! 잠금 중에 대기하지 않고, 큐가 FIFO이므로 방 단위 순서가 그대로 보존됩니다.

use super::protocol::*;
use crate::models::is_valid_id;
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// 연결 하나의 송신 큐: 소켓 작성 태스크가 비웁니다
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

const MAX_USERNAME_LEN: usize = 64;
const MAX_TOKEN_LEN: usize = 128;

/// 입장 거부 사유: `Display` 문자열이 그대로 `error_message` 페이로드가 됩니다
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room already has a host")]
    HostTaken,
    #[error("{0}")]
    Invalid(String),
}

/// 문장 릴레이 거부 사유
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("not in room")]
    NotInRoom,
    #[error("only the host can send lines")]
    NotHost,
}

/// 레지스트리에 넘기는 연결 정보
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub tx: Outbound,
}

/// 입장 성공 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub room_id: String,
    pub role: Role,
    /// 이 입장으로 방이 새로 만들어졌는지
    pub created: bool,
}

#[derive(Debug)]
struct Participant {
    conn: Connection,
    role: Role,
    joined_at: DateTime<Utc>,
}

impl Participant {
    fn new(conn: Connection, role: Role) -> Self {
        Self {
            conn,
            role,
            joined_at: Utc::now(),
        }
    }

    fn send(&self, event: ServerEvent) -> bool {
        // 받는 쪽이 이미 끊겼으면 무시: 소켓 종료 시 leave()가 정리합니다
        self.conn.tx.send(event).is_ok()
    }
}

#[derive(Debug)]
struct Room {
    host_token: String,
    /// 입장 순서대로
    members: Vec<Participant>,
}

impl Room {
    fn member_infos(&self) -> Vec<MemberInfo> {
        self.members
            .iter()
            .map(|p| MemberInfo {
                id: p.conn.id.clone(),
                role: p.role,
                username: p.conn.username.clone(),
                user_id: p.conn.user_id.clone(),
            })
            .collect()
    }

    fn broadcast_members(&self) {
        let snapshot = self.member_infos();
        for participant in &self.members {
            participant.send(ServerEvent::RoomUsersUpdate(snapshot.clone()));
        }
    }
}

/// 실시간 방 레지스트리
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `join_room` 처리.
    ///
    /// - 호스트 + 방 없음: 방 생성, 토큰 발급, `room_created` 응답
    /// - 호스트 + 방 있음 + 토큰 일치: 호스트 재접속 (기존 호스트 연결은 게스트로 강등)
    /// - 호스트 + 방 있음 + 토큰 불일치/없음: `HostTaken`
    /// - 게스트 + 방 없음: `RoomNotFound`
    /// - 게스트 + 방 있음: 입장 후 `load_history(history)` 전송
    ///
    /// 성공하면 방의 모든 연결에 `room_users_update`를 보냅니다.
    /// 실패하면 멤버십은 바뀌지 않고 아무에게도 아무것도 보내지 않습니다.
    pub async fn join(
        &self,
        request: &JoinRoom,
        conn: Connection,
        history: Vec<LineData>,
    ) -> Result<Admission, AdmissionError> {
        validate_join(request)?;

        let mut rooms = self.rooms.lock().await;
        let room_id = request.room_id.clone();

        match request.role {
            Role::Host => match rooms.get_mut(&room_id) {
                None => {
                    let host_token = mint_host_token();
                    let host = Participant::new(conn, Role::Host);
                    host.send(ServerEvent::RoomCreated(RoomCreated {
                        room_id: room_id.clone(),
                        host_token: host_token.clone(),
                    }));

                    let room = Room {
                        host_token,
                        members: vec![host],
                    };
                    room.broadcast_members();
                    rooms.insert(room_id.clone(), room);
                    tracing::info!("Room {} created", room_id);

                    Ok(Admission {
                        room_id,
                        role: Role::Host,
                        created: true,
                    })
                }
                Some(room) => {
                    if request.host_token.as_deref() != Some(room.host_token.as_str()) {
                        tracing::warn!("Rejected host join for room {}: token mismatch", room_id);
                        return Err(AdmissionError::HostTaken);
                    }

                    for member in room.members.iter_mut().filter(|m| m.role == Role::Host) {
                        tracing::info!(
                            "Host connection {} in room {} replaced, now guest",
                            member.conn.id,
                            room_id
                        );
                        member.role = Role::Guest;
                    }
                    room.members.push(Participant::new(conn, Role::Host));
                    room.broadcast_members();
                    tracing::info!("Host reclaimed room {}", room_id);

                    Ok(Admission {
                        room_id,
                        role: Role::Host,
                        created: false,
                    })
                }
            },
            Role::Guest => {
                let Some(room) = rooms.get_mut(&room_id) else {
                    tracing::warn!("Rejected guest join: room {} not found", room_id);
                    return Err(AdmissionError::RoomNotFound);
                };

                let guest = Participant::new(conn, Role::Guest);
                guest.send(ServerEvent::LoadHistory(history));
                room.members.push(guest);
                room.broadcast_members();
                tracing::debug!("Guest joined room {} ({} members)", room_id, room.members.len());

                Ok(Admission {
                    room_id,
                    role: Role::Guest,
                    created: false,
                })
            }
        }
    }

    /// 연결을 방에서 제거합니다. 방이 비면 방을 없애고 `true`를 반환합니다.
    ///
    /// 남은 참가자가 있으면 새 `room_users_update`를 보냅니다.
    /// 호스트가 나가도 토큰은 유지되어 재접속으로 호스트를 되찾을 수 있습니다.
    pub async fn leave(&self, room_id: &str, conn_id: &str) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };

        let Some(index) = room.members.iter().position(|m| m.conn.id == conn_id) else {
            return false;
        };
        let left = room.members.remove(index);
        tracing::debug!(
            "{:?} {} left room {} after {}s",
            left.role,
            conn_id,
            room_id,
            (Utc::now() - left.joined_at).num_seconds()
        );

        if room.members.is_empty() {
            rooms.remove(room_id);
            tracing::info!("Room {} destroyed (no connections left)", room_id);
            return true;
        }

        room.broadcast_members();
        false
    }

    /// 호스트의 문장을 같은 방의 다른 모든 연결에 `receive_line`으로 전달합니다.
    ///
    /// 보낸 연결 수를 반환합니다. 호스트가 아닌 연결의 요청은 거부됩니다.
    pub async fn relay_line(
        &self,
        room_id: &str,
        conn_id: &str,
        line: LineData,
    ) -> Result<usize, RelayError> {
        let rooms = self.rooms.lock().await;
        let room = rooms.get(room_id).ok_or(RelayError::NotInRoom)?;
        let sender = room
            .members
            .iter()
            .find(|m| m.conn.id == conn_id)
            .ok_or(RelayError::NotInRoom)?;
        if sender.role != Role::Host {
            return Err(RelayError::NotHost);
        }

        let delivered = room
            .members
            .iter()
            .filter(|m| m.conn.id != conn_id)
            .filter(|m| m.send(ServerEvent::ReceiveLine(line.clone())))
            .count();
        Ok(delivered)
    }

    /// 접속 중인 연결이 있는 방인지
    pub async fn is_live(&self, room_id: &str) -> bool {
        self.rooms.lock().await.contains_key(room_id)
    }

    /// 현재 멤버 목록 (방이 없으면 None)
    pub async fn members(&self, room_id: &str) -> Option<Vec<MemberInfo>> {
        self.rooms.lock().await.get(room_id).map(Room::member_infos)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

fn validate_join(request: &JoinRoom) -> Result<(), AdmissionError> {
    if !is_valid_id(&request.room_id) {
        return Err(AdmissionError::Invalid("invalid room id".to_string()));
    }
    if let Some(username) = &request.username {
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AdmissionError::Invalid("username too long".to_string()));
        }
    }
    if let Some(token) = &request.host_token {
        if token.len() > MAX_TOKEN_LEN {
            return Err(AdmissionError::Invalid("invalid host token".to_string()));
        }
    }
    Ok(())
}

/// 128비트 난수 호스트 토큰 (16진수 32자)
fn mint_host_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

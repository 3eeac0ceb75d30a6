//! # 릴레이 와이어 프로토콜
//!
//! WebSocket 텍스트 프레임 하나가 이벤트 하나입니다:
//! `{"event": "<이름>", "data": <페이로드>}`
//!
//! | 방향 | 이벤트 | 페이로드 |
//! |---|---|---|
//! | 클라이언트→릴레이 | `join_room` | `{roomId, role, hostToken?, username?, userId?}` |
//! | 호스트→릴레이 | `send_line` | `{roomId, lineData:{id,text,japaneseCount}}` |
//! | 릴레이→클라이언트 | `room_created` | `{roomId, hostToken}` |
//! | 릴레이→클라이언트 | `error_message` | 문자열 |
//! | 릴레이→클라이언트 | `room_users_update` | `[{id, role, username?, userId?}]` |
//! | 릴레이→게스트 | `receive_line` | `{id,text,japaneseCount}` |
//! | 릴레이→입장자 | `load_history` | `[{id,text,japaneseCount}]` |
//!
//! 서버와 캡처 클라이언트가 같은 타입을 사용하므로 양쪽 모두 Serialize/Deserialize를 구현합니다.

use crate::models::Line;
use serde::{Deserialize, Serialize};

/// 방 안에서의 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

/// 릴레이로 전달되는 문장: 저장용 `Line`에서 수집 시각을 뺀 형태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineData {
    pub id: String,
    pub text: String,
    pub japanese_count: i64,
}

impl From<&Line> for LineData {
    fn from(line: &Line) -> Self {
        Self {
            id: line.id.clone(),
            text: line.text.clone(),
            japanese_count: line.japanese_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// 호환용으로 받기만 하고 무시합니다. 멤버 목록의 userId는 `/ws?token=`에서 옵니다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLine {
    pub room_id: String,
    pub line_data: LineData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: String,
    pub host_token: String,
}

/// `room_users_update`의 참가자 한 명
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// 인증된 연결(`/ws?token=`)만 가집니다
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// 클라이언트 → 릴레이
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    SendLine(SendLine),
}

/// 릴레이 → 클라이언트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomCreated(RoomCreated),
    ErrorMessage(String),
    RoomUsersUpdate(Vec<MemberInfo>),
    ReceiveLine(LineData),
    LoadHistory(Vec<LineData>),
}

//! # TextHooker 세션 모델 정의
//!
//! 수집된 문장(Line)과 누적 타이머를 담는 세션 관련 구조체들입니다.
//!
//! ## 세션 주소 지정
//! 세션은 두 가지 방식으로 찾을 수 있습니다:
//! - 미디어 세션 `(user_id, media_id)`: 사용자별 작품 하나당 하나
//! - 방 세션 `room_id`: 미디어와 무관한 임시 공유 방 (만료 시각 있음)
//!
//! 미디어 세션에 `room_id`를 연결하면 같은 레코드를 방 링크로도 열 수 있습니다.
//! 두 주소 체계는 `SessionKey` 하나의 합 타입으로 표현되므로,
//! "세션 하나 = 문장 기록 하나" 불변식은 DB 계층 한 곳에서만 지키면 됩니다.

use serde::{Deserialize, Serialize};

/// 식별자(media_id, room_id, line id)의 최대 길이
pub const MAX_ID_LEN: usize = 64;

/// 한 번의 append 요청에 담을 수 있는 최대 문장 수
pub const MAX_LINES_PER_REQUEST: usize = 500;

/// 세션을 찾는 키: 미디어 키 또는 방 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// 로그인한 사용자의 특정 미디어에 묶인 세션
    Media { user_id: String, media_id: String },
    /// 방 ID로 찾는 세션 (익명 접근 허용)
    Room(String),
}

impl SessionKey {
    pub fn media(user_id: impl Into<String>, media_id: impl Into<String>) -> Self {
        SessionKey::Media {
            user_id: user_id.into(),
            media_id: media_id.into(),
        }
    }

    pub fn room(room_id: impl Into<String>) -> Self {
        SessionKey::Room(room_id.into())
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKey::Media { user_id, media_id } => write!(f, "media:{}/{}", user_id, media_id),
            SessionKey::Room(room_id) => write!(f, "room:{}", room_id),
        }
    }
}

/// 식별자 형식 검사: 1~64자의 영숫자, `-`, `_`
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 세션 레코드: DB의 `hooker_sessions` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HookerSession {
    pub id: String,
    pub user_id: Option<String>,
    pub media_id: Option<String>,
    pub room_id: Option<String>,
    /// 서버에 저장된 누적 경과 시간(초)
    pub timer_seconds: i64,
    /// 임시 방 세션의 만료 시각: 미디어 세션은 항상 None
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 수집된 문장 하나: `hooker_lines` 테이블 한 행
///
/// 생성 후에는 수정되지 않습니다. 개별 삭제 또는 전체 삭제만 가능합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Line {
    /// 클라이언트가 생성한 ID (세션 내에서 유일)
    pub id: String,
    pub text: String,
    /// 텍스트의 일본어 문자 수 (`services::text::count_japanese`)
    pub japanese_count: i64,
    pub captured_at: String,
}

/// `getSession` 응답: 세션이 없어도 에러가 아니라 빈 세션을 돌려줍니다.
///
/// 처음 여는 미디어는 "세션 생성" 경로로 취급해야 하므로
/// 클라이언트는 `exists: false`를 정상 응답으로 처리합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionView {
    pub exists: bool,
    pub session_id: Option<String>,
    pub media_id: Option<String>,
    pub room_id: Option<String>,
    pub timer_seconds: i64,
    pub expires_at: Option<String>,
    pub lines: Vec<Line>,
}

impl SessionView {
    pub fn from_parts(session: HookerSession, lines: Vec<Line>) -> Self {
        Self {
            exists: true,
            session_id: Some(session.id),
            media_id: session.media_id,
            room_id: session.room_id,
            timer_seconds: session.timer_seconds,
            expires_at: session.expires_at,
            lines,
        }
    }
}

/// 최근 세션 목록의 한 항목: 문장 수와 일본어 문자 수 합계 포함
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionSummary {
    pub id: String,
    pub media_id: Option<String>,
    pub room_id: Option<String>,
    pub timer_seconds: i64,
    pub line_count: i64,
    pub char_count: i64,
    pub updated_at: String,
}

/// append 요청의 문장 하나
///
/// `japanese_count`는 받더라도 서버가 텍스트로부터 다시 계산합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLine {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub japanese_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
}

impl From<&Line> for NewLine {
    fn from(line: &Line) -> Self {
        Self {
            id: line.id.clone(),
            text: line.text.clone(),
            japanese_count: Some(line.japanese_count),
            captured_at: Some(line.captured_at.clone()),
        }
    }
}

/// `POST .../lines` 요청 본문
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendLinesRequest {
    pub lines: Vec<NewLine>,
}

/// `DELETE .../lines` 요청 본문
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveLinesRequest {
    pub line_ids: Vec<String>,
}

/// `PUT .../timer` 요청 본문: 음수는 400
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTimerRequest {
    pub seconds: i64,
}

/// `PUT /texthooker/media/{media_id}/room` 요청 본문
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRoomRequest {
    pub room_id: String,
}

/// `GET /texthooker/sessions?limit=` 쿼리
#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub limit: Option<i64>,
}

//! # 캡처 클라이언트 설정
//!
//! 서버 `Config`처럼 환경변수(또는 `.env`)에서 읽습니다.
//! 환경변수가 없으면 로컬 저장소의 환경설정(`Preferences`), 그것도 없으면 기본값을 씁니다.
//!
//! | 변수 | 기본값 |
//! |------|--------|
//! | `TEXTHOOKER_API_URL` | `http://127.0.0.1:3000/api/v1` |
//! | `TEXTHOOKER_ACCESS_TOKEN` | 없음 (미디어 세션에는 필수) |
//! | `TEXTHOOKER_MEDIA_ID` / `TEXTHOOKER_ROOM_ID` | 둘 중 하나 필수 |
//! | `TEXTHOOKER_ROLE` | `solo` (`host`, `guest`는 방 ID 필요) |
//! | `TEXTHOOKER_HOST_TOKEN` | 없음 (호스트 재접속용) |
//! | `TEXTHOOKER_USERNAME` | 없음 |
//! | `TEXTHOOKER_BRIDGE_URL` | `ws://127.0.0.1:6677` |
//! | `TEXTHOOKER_RELAY_URL` | `ws://127.0.0.1:3000/api/v1/ws` |
//! | `TEXTHOOKER_AUTO_PAUSE_SECS` | 60 (0이면 자동 일시정지 끔) |
//! | `TEXTHOOKER_AUTOSTART` | true |
//! | `TEXTHOOKER_BRIDGE_CAPTURE_WHILE_PAUSED` | false |
//! | `TEXTHOOKER_PASTE_CAPTURE_WHILE_PAUSED` | false |
//! | `TEXTHOOKER_RECONNECT` | true |
//! | `TEXTHOOKER_RECONNECT_SECS` | 3 |
//! | `TEXTHOOKER_CHECKPOINT_SECS` | 30 |
//! | `TEXTHOOKER_DATA_DIR` | `.texthooker` |

use super::{
    local::Preferences,
    state::CaptureOptions,
    store::SessionTarget,
};
use crate::{models::is_valid_id, relay::Role};
use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api/v1";
const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:6677";
const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3000/api/v1/ws";
const DEFAULT_DATA_DIR: &str = ".texthooker";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("either TEXTHOOKER_MEDIA_ID or TEXTHOOKER_ROOM_ID must be set")]
    MissingTarget,
    #[error("{0} must be 1-64 characters of letters, digits, '-' or '_'")]
    InvalidId(&'static str),
    #[error("TEXTHOOKER_ROLE must be solo, host or guest (got {0})")]
    InvalidRole(String),
    #[error("TEXTHOOKER_ROLE={0} requires TEXTHOOKER_ROOM_ID")]
    RoomRequired(&'static str),
}

/// 방 참여 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    pub room_id: String,
    pub role: Role,
    pub host_token: Option<String>,
    pub relay_url: String,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub api_url: String,
    pub access_token: Option<String>,
    /// 문장과 타이머를 저장할 세션
    pub target: SessionTarget,
    /// None이면 혼자 수집 (릴레이 접속 안 함)
    pub room: Option<RoomConfig>,
    pub username: Option<String>,
    pub bridge_url: String,
    pub auto_pause: Option<Duration>,
    pub options: CaptureOptions,
    /// None이면 연결이 끊겨도 재연결하지 않음
    pub reconnect: Option<Duration>,
    pub checkpoint_interval: Duration,
}

/// 로컬 저장소를 열기 위해 설정보다 먼저 읽습니다
pub fn data_dir_from_env() -> PathBuf {
    env::var("TEXTHOOKER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

impl CaptureConfig {
    pub fn from_env(preferences: &Preferences) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), preferences)
    }

    /// `lookup`으로 변수를 읽습니다. 테스트는 HashMap을 넘깁니다.
    pub fn from_lookup<F>(lookup: F, preferences: &Preferences) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| var(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"));
        let number = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok());

        let media_id = var("TEXTHOOKER_MEDIA_ID");
        let room_id = var("TEXTHOOKER_ROOM_ID");
        if media_id.as_deref().is_some_and(|id| !is_valid_id(id)) {
            return Err(ConfigError::InvalidId("TEXTHOOKER_MEDIA_ID"));
        }
        if room_id.as_deref().is_some_and(|id| !is_valid_id(id)) {
            return Err(ConfigError::InvalidId("TEXTHOOKER_ROOM_ID"));
        }

        let role = match var("TEXTHOOKER_ROLE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("solo") => None,
            Some("host") => Some(Role::Host),
            Some("guest") => Some(Role::Guest),
            Some(other) => return Err(ConfigError::InvalidRole(other.to_string())),
        };

        let target = match (&media_id, &room_id) {
            (Some(media_id), _) => SessionTarget::Media(media_id.clone()),
            (None, Some(room_id)) => SessionTarget::Room(room_id.clone()),
            (None, None) => return Err(ConfigError::MissingTarget),
        };

        let room = match role {
            None => None,
            Some(role) => {
                let room_id = room_id.clone().ok_or(ConfigError::RoomRequired(match role {
                    Role::Host => "host",
                    Role::Guest => "guest",
                }))?;
                Some(RoomConfig {
                    room_id,
                    role,
                    host_token: var("TEXTHOOKER_HOST_TOKEN"),
                    relay_url: var("TEXTHOOKER_RELAY_URL")
                        .or_else(|| preferences.relay_url.clone())
                        .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
                })
            }
        };

        let auto_pause_secs = number("TEXTHOOKER_AUTO_PAUSE_SECS")
            .or(preferences.auto_pause_secs)
            .unwrap_or(60);
        let reconnect_secs = number("TEXTHOOKER_RECONNECT_SECS").unwrap_or(3).max(1);

        Ok(Self {
            api_url: var("TEXTHOOKER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            access_token: var("TEXTHOOKER_ACCESS_TOKEN"),
            target,
            room,
            username: var("TEXTHOOKER_USERNAME"),
            bridge_url: var("TEXTHOOKER_BRIDGE_URL").unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string()),
            auto_pause: (auto_pause_secs > 0).then(|| Duration::from_secs(auto_pause_secs)),
            options: CaptureOptions {
                autostart: flag("TEXTHOOKER_AUTOSTART").unwrap_or(true),
                bridge_while_paused: flag("TEXTHOOKER_BRIDGE_CAPTURE_WHILE_PAUSED")
                    .or(preferences.bridge_capture_while_paused)
                    .unwrap_or(false),
                paste_while_paused: flag("TEXTHOOKER_PASTE_CAPTURE_WHILE_PAUSED")
                    .or(preferences.paste_capture_while_paused)
                    .unwrap_or(false),
            },
            reconnect: flag("TEXTHOOKER_RECONNECT")
                .unwrap_or(true)
                .then(|| Duration::from_secs(reconnect_secs)),
            checkpoint_interval: Duration::from_secs(number("TEXTHOOKER_CHECKPOINT_SECS").unwrap_or(30).max(1)),
        })
    }

    /// 현재 유효한 설정을 환경설정 레코드에 반영합니다 (글꼴/레이아웃은 유지).
    pub fn to_preferences(&self, previous: &Preferences) -> Preferences {
        Preferences {
            auto_pause_secs: Some(self.auto_pause.map_or(0, |d| d.as_secs())),
            bridge_capture_while_paused: Some(self.options.bridge_while_paused),
            paste_capture_while_paused: Some(self.options.paste_while_paused),
            relay_url: self
                .room
                .as_ref()
                .map(|room| room.relay_url.clone())
                .or_else(|| previous.relay_url.clone()),
            ..previous.clone()
        }
    }
}

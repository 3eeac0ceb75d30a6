//! # 서버 설정(Configuration) 모듈
//!
//! 환경변수(또는 `.env` 파일)에서 서버 설정값을 읽어옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: JWT 토큰 서명에 사용할 비밀키 (필수)
//! - `HOST`: 서버 바인딩 주소 (기본값 `0.0.0.0`)
//! - `PORT`: 서버 포트 번호 (기본값 3000)
//! - `ROOM_SESSION_TTL_HOURS`: 임시 방 세션의 수명 (기본값 24시간)
//! - `SESSION_SWEEP_INTERVAL_SECS`: 만료된 방 세션 정리 주기 (기본값 300초)
//!
//! 캡처 클라이언트의 설정은 `client::config::CaptureConfig`에 따로 있습니다.

use std::env;

/// 서버 전체 설정: 시작 시 한 번 읽어 공유합니다.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub room_session_ttl_hours: i64,
    pub session_sweep_interval_secs: u64,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`이 없으면 `VarError`를 반환합니다.
    /// 나머지 항목은 값이 없거나 파싱에 실패하면 기본값을 사용합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            room_session_ttl_hours: parse_or("ROOM_SESSION_TTL_HOURS", 24).max(1),
            session_sweep_interval_secs: parse_or("SESSION_SWEEP_INTERVAL_SECS", 300).max(1),
        })
    }
}

/// 환경변수를 파싱하고, 없거나 형식이 잘못되면 기본값을 돌려줍니다.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

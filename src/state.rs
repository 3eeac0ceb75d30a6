//! # 애플리케이션 공유 상태
//!
//! 모든 핸들러가 `State(state): State<AppState>`로 접근합니다.
//! `SqlitePool`과 `Arc<RoomRegistry>`는 clone해도 같은 풀/레지스트리를 가리킵니다.

use crate::relay::RoomRegistry;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀: 세션 저장소
    pub pool: SqlitePool,
    /// JWT 토큰 서명용 비밀키
    pub jwt_secret: String,
    /// 방 키로 만든 임시 세션의 수명(시간)
    pub room_ttl_hours: i64,
    /// 실시간 방 레지스트리: 프로세스 수명 동안만 존재 (영속화 안 함)
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: impl Into<String>, room_ttl_hours: i64) -> Self {
        Self {
            pool,
            jwt_secret: jwt_secret.into(),
            room_ttl_hours,
            rooms: Arc::new(RoomRegistry::new()),
        }
    }
}

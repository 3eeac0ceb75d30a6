//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)와 릴레이(relay/)가 이 모듈의 함수를 호출합니다.
//!
//! 각 하위 모듈:
//! - `sessions`: TextHooker 세션 저장소 (문장 추가/삭제, 타이머, 방 연결, 만료 정리)

pub mod sessions;

pub use sessions::*;

use chrono::{Duration, Utc};
use sqlx::migrate::Migrator;

/// `./migrations` 폴더의 SQL 파일들을 컴파일 타임에 포함한 마이그레이터
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// DB에 저장하는 타임스탬프 형식. SQLite의 `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`와
/// 같은 모양이라 문자열 비교가 곧 시각 비교가 됩니다.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 현재 UTC 시각 문자열
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// 지금부터 `hours`시간 뒤의 UTC 시각 문자열 (임시 방 세션 만료 시각)
pub fn timestamp_after_hours(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> sqlx::SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // 인메모리 DB는 연결마다 별개이므로 연결 하나를 끝까지 유지합니다
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    MIGRATOR.run(&pool).await.expect("migrations");
    pool
}

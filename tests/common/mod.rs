//! 통합 테스트 공용 도우미: 인메모리 DB, 서버 기동, 토큰 발급

#![allow(dead_code)]

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::net::SocketAddr;
use texthooker::{build_router, db, middleware::auth::create_access_token, state::AppState};

pub const SECRET: &str = "test-secret";

/// 연결 하나짜리 인메모리 풀 (연결이 닫히면 DB도 사라지므로 수명 제한 없음)
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::MIGRATOR.run(&pool).await.unwrap();
    pool
}

pub async fn test_state() -> AppState {
    AppState::new(memory_pool().await, SECRET, 24)
}

/// 임의 포트에 전체 앱을 띄우고 주소를 반환합니다.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

pub fn token_for(user_id: &str) -> String {
    create_access_token(user_id, SECRET).unwrap()
}

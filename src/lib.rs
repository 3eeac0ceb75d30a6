//! # TextHooker
//!
//! 학습용 문장 수집(TextHooker) 세션의 서버와 클라이언트 라이브러리입니다.
//!
//! - 서버: 세션 저장소 REST API (`routes`, `db`) + 실시간 방 릴레이 (`relay`)
//! - 클라이언트: 문장 수집, 활동 타이머 상태 머신, 저장소/릴레이 동기화 (`client`)
//!
//! 바이너리 두 개가 이 라이브러리를 사용합니다:
//! `texthooker`(서버, `src/main.rs`)와 `texthooker-capture`(`src/bin/capture.rs`).

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod relay;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use routes::*;
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// `/api/v1` 아래의 모든 라우트를 조립합니다.
///
/// 경로 파라미터는 axum 0.8 문법(`{media_id}`)을 사용합니다.
pub fn api_router(state: AppState) -> Router {
    // 미디어 세션: 로그인 필수
    let media_routes = Router::new()
        .route("/texthooker/sessions", get(list_sessions))
        .route(
            "/texthooker/media/{media_id}",
            get(get_media_session).delete(delete_media_session),
        )
        .route(
            "/texthooker/media/{media_id}/lines",
            post(append_media_lines).delete(remove_media_lines),
        )
        .route("/texthooker/media/{media_id}/clear", post(clear_media_lines))
        .route("/texthooker/media/{media_id}/timer", put(update_media_timer))
        .route("/texthooker/media/{media_id}/room", put(link_media_room));

    // 방 세션: 익명 허용
    let room_routes = Router::new()
        .route(
            "/texthooker/rooms/{room_id}",
            get(get_room_session).delete(delete_room_session),
        )
        .route("/texthooker/rooms/{room_id}/exists", get(room_exists))
        .route(
            "/texthooker/rooms/{room_id}/lines",
            post(append_room_lines).delete(remove_room_lines),
        )
        .route("/texthooker/rooms/{room_id}/clear", post(clear_room_lines))
        .route("/texthooker/rooms/{room_id}/timer", put(update_room_timer));

    Router::new()
        .merge(media_routes)
        .merge(room_routes)
        .route("/ws", get(relay::ws_handler))
        .route("/health", get(health_check))
        .with_state(state)
}

/// 미들웨어(CORS, HTTP 로깅)까지 포함한 전체 앱
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

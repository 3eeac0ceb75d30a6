//! # 헬스체크(Health Check) 핸들러
//!
//! - `GET /api/v1/health` → `{ "status": "ok", "rooms": <실시간 방 수> }`

use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// 서버 상태와 현재 열려 있는 실시간 방 수를 반환합니다. 실패하지 않습니다.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "rooms": state.rooms.room_count().await
    }))
}

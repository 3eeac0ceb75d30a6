//! # TextHooker 세션 API 라우트 핸들러
//!
//! 세션 저장소(Session Store)의 HTTP 표면입니다.
//! 같은 연산을 두 가지 주소 체계로 노출합니다.
//!
//! ## 미디어 세션 (로그인 필수)
//! | 메서드 | 경로 | 핸들러 |
//! |--------|------|--------|
//! | GET | /api/v1/texthooker/sessions | `list_sessions` |
//! | GET | /api/v1/texthooker/media/{media_id} | `get_media_session` |
//! | DELETE | /api/v1/texthooker/media/{media_id} | `delete_media_session` |
//! | POST | /api/v1/texthooker/media/{media_id}/lines | `append_media_lines` |
//! | DELETE | /api/v1/texthooker/media/{media_id}/lines | `remove_media_lines` |
//! | POST | /api/v1/texthooker/media/{media_id}/clear | `clear_media_lines` |
//! | PUT | /api/v1/texthooker/media/{media_id}/timer | `update_media_timer` |
//! | PUT | /api/v1/texthooker/media/{media_id}/room | `link_media_room` |
//!
//! ## 방 세션 (익명 허용)
//! | 메서드 | 경로 | 핸들러 |
//! |--------|------|--------|
//! | GET | /api/v1/texthooker/rooms/{room_id} | `get_room_session` |
//! | GET | /api/v1/texthooker/rooms/{room_id}/exists | `room_exists` |
//! | DELETE | /api/v1/texthooker/rooms/{room_id} | `delete_room_session` |
//! | POST | /api/v1/texthooker/rooms/{room_id}/lines | `append_room_lines` |
//! | DELETE | /api/v1/texthooker/rooms/{room_id}/lines | `remove_room_lines` |
//! | POST | /api/v1/texthooker/rooms/{room_id}/clear | `clear_room_lines` |
//! | PUT | /api/v1/texthooker/rooms/{room_id}/timer | `update_room_timer` |
//!
//! 방이 로그인 사용자의 미디어 세션에 연결되어 있으면 읽기는 누구나 가능하지만
//! 쓰기(추가, 삭제, 초기화, 타이머)는 그 소유자만 할 수 있습니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::{AuthUser, MaybeAuthUser},
    models::*,
    services::text::normalize_line,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

fn media_key(auth_user: &AuthUser, media_id: &str) -> Result<SessionKey, AppError> {
    if !is_valid_id(media_id) {
        return Err(AppError::BadRequest("Invalid media id".to_string()));
    }
    Ok(SessionKey::media(&auth_user.user_id, media_id))
}

fn room_key(room_id: &str) -> Result<SessionKey, AppError> {
    if !is_valid_id(room_id) {
        return Err(AppError::BadRequest("Invalid room id".to_string()));
    }
    Ok(SessionKey::room(room_id))
}

/// 쓰기용 방 키. 연결된 세션에 소유자가 있으면 같은 사용자만 통과합니다.
/// 익명이면 401, 다른 사용자면 403.
async fn writable_room_key(
    state: &AppState,
    auth_user: &MaybeAuthUser,
    room_id: &str,
) -> Result<SessionKey, AppError> {
    let key = room_key(room_id)?;
    let owner = db::find_session(&state.pool, &key)
        .await?
        .and_then(|session| session.user_id);

    if let Some(owner) = owner {
        match &auth_user.0 {
            None => {
                return Err(AppError::Unauthorized(
                    "Room is linked to a signed-in user's session".to_string(),
                ))
            }
            Some(user) if user.user_id != owner => {
                tracing::warn!("User {} tried to modify room {} owned by {}", user.user_id, room_id, owner);
                return Err(AppError::Forbidden(
                    "Room is linked to another user's session".to_string(),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(key)
}

/// append 요청 검증: 개수 제한, ID 형식, 빈 텍스트 거부, 텍스트 정리
fn validate_lines(req: AppendLinesRequest) -> Result<Vec<NewLine>, AppError> {
    if req.lines.len() > MAX_LINES_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "At most {} lines per request",
            MAX_LINES_PER_REQUEST
        )));
    }

    req.lines
        .into_iter()
        .map(|line| {
            if !is_valid_id(&line.id) {
                return Err(AppError::BadRequest(format!("Invalid line id: {}", line.id)));
            }
            let text = normalize_line(&line.text)
                .ok_or_else(|| AppError::BadRequest("Line text must not be empty".to_string()))?;
            Ok(NewLine { text, ..line })
        })
        .collect()
}

async fn append(state: &AppState, key: SessionKey, req: AppendLinesRequest) -> Result<Json<Value>, AppError> {
    let lines = validate_lines(req)?;
    let inserted = db::append_lines(&state.pool, &key, &lines, state.room_ttl_hours).await?;
    tracing::debug!("Appended {} of {} lines to {}", inserted, lines.len(), key);
    Ok(Json(json!({ "inserted": inserted })))
}

async fn remove(state: &AppState, key: SessionKey, req: RemoveLinesRequest) -> Result<Json<Value>, AppError> {
    let removed = db::remove_lines(&state.pool, &key, &req.line_ids).await?;
    Ok(Json(json!({ "removed": removed })))
}

async fn clear(state: &AppState, key: SessionKey) -> Result<Json<Value>, AppError> {
    let removed = db::clear_lines(&state.pool, &key).await?;
    Ok(Json(json!({ "removed": removed })))
}

async fn set_timer(state: &AppState, key: SessionKey, req: UpdateTimerRequest) -> Result<Json<Value>, AppError> {
    if req.seconds < 0 {
        return Err(AppError::BadRequest("Timer seconds must not be negative".to_string()));
    }
    let session = db::update_timer(&state.pool, &key, req.seconds, state.room_ttl_hours).await?;
    Ok(Json(json!({ "timer_seconds": session.timer_seconds })))
}

// ── 미디어 세션 ──

/// `GET /texthooker/sessions?limit=20` → `{ "sessions": [...] }`
pub async fn list_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let sessions = db::list_recent_sessions(&state.pool, &auth_user.user_id, limit).await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// `GET /texthooker/media/{media_id}`: 없으면 `exists: false`인 빈 세션
pub async fn get_media_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let key = media_key(&auth_user, &media_id)?;
    Ok(Json(db::get_session_view(&state.pool, &key).await?))
}

/// `DELETE /texthooker/media/{media_id}` → 204 (없어도 204)
pub async fn delete_media_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let key = media_key(&auth_user, &media_id)?;
    db::delete_session(&state.pool, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn append_media_lines(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
    Json(req): Json<AppendLinesRequest>,
) -> Result<Json<Value>, AppError> {
    append(&state, media_key(&auth_user, &media_id)?, req).await
}

pub async fn remove_media_lines(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
    Json(req): Json<RemoveLinesRequest>,
) -> Result<Json<Value>, AppError> {
    remove(&state, media_key(&auth_user, &media_id)?, req).await
}

pub async fn clear_media_lines(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    clear(&state, media_key(&auth_user, &media_id)?).await
}

pub async fn update_media_timer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
    Json(req): Json<UpdateTimerRequest>,
) -> Result<Json<Value>, AppError> {
    set_timer(&state, media_key(&auth_user, &media_id)?, req).await
}

/// `PUT /texthooker/media/{media_id}/room` + `{ "room_id": "..." }`
///
/// 호스트가 방을 만든 뒤 호출합니다. 이후 게스트는 이 미디어 세션의 문장을
/// `load_history`로 받습니다.
pub async fn link_media_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(media_id): Path<String>,
    Json(req): Json<LinkRoomRequest>,
) -> Result<Json<HookerSession>, AppError> {
    media_key(&auth_user, &media_id)?;
    room_key(&req.room_id)?;
    let session = db::link_room(
        &state.pool,
        &auth_user.user_id,
        &media_id,
        &req.room_id,
        state.room_ttl_hours,
    )
    .await?;
    Ok(Json(session))
}

// ── 방 세션 ──
// MaybeAuthUser: 익명 허용, 단 Authorization 헤더가 있으면 유효해야 함
// 쓰기 핸들러는 writable_room_key로 연결된 세션의 소유자를 확인

pub async fn get_room_session(
    State(state): State<AppState>,
    _auth_user: MaybeAuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let key = room_key(&room_id)?;
    Ok(Json(db::get_session_view(&state.pool, &key).await?))
}

/// `GET /texthooker/rooms/{room_id}/exists` → `{ "exists": bool }`
///
/// 영속화된 방 세션 기준입니다 (실시간 접속 여부와 무관).
pub async fn room_exists(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    room_key(&room_id)?;
    let exists = db::room_exists(&state.pool, &room_id).await?;
    Ok(Json(json!({ "exists": exists })))
}

pub async fn delete_room_session(
    State(state): State<AppState>,
    auth_user: MaybeAuthUser,
    Path(room_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let key = writable_room_key(&state, &auth_user, &room_id).await?;
    db::delete_session(&state.pool, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn append_room_lines(
    State(state): State<AppState>,
    auth_user: MaybeAuthUser,
    Path(room_id): Path<String>,
    Json(req): Json<AppendLinesRequest>,
) -> Result<Json<Value>, AppError> {
    append(&state, writable_room_key(&state, &auth_user, &room_id).await?, req).await
}

pub async fn remove_room_lines(
    State(state): State<AppState>,
    auth_user: MaybeAuthUser,
    Path(room_id): Path<String>,
    Json(req): Json<RemoveLinesRequest>,
) -> Result<Json<Value>, AppError> {
    remove(&state, writable_room_key(&state, &auth_user, &room_id).await?, req).await
}

pub async fn clear_room_lines(
    State(state): State<AppState>,
    auth_user: MaybeAuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    clear(&state, writable_room_key(&state, &auth_user, &room_id).await?).await
}

pub async fn update_room_timer(
    State(state): State<AppState>,
    auth_user: MaybeAuthUser,
    Path(room_id): Path<String>,
    Json(req): Json<UpdateTimerRequest>,
) -> Result<Json<Value>, AppError> {
    set_timer(&state, writable_room_key(&state, &auth_user, &room_id).await?, req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, text: &str) -> NewLine {
        NewLine {
            id: id.to_string(),
            text: text.to_string(),
            japanese_count: None,
            captured_at: None,
        }
    }

    #[test]
    fn validate_trims_text_and_rejects_blank() {
        let ok = validate_lines(AppendLinesRequest {
            lines: vec![line("a", "  本  ")],
        })
        .unwrap();
        assert_eq!(ok[0].text, "本");

        let blank = validate_lines(AppendLinesRequest {
            lines: vec![line("a", " \n ")],
        });
        assert!(matches!(blank, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn validate_rejects_bad_ids_and_oversized_batches() {
        let bad_id = validate_lines(AppendLinesRequest {
            lines: vec![line("bad id", "本")],
        });
        assert!(matches!(bad_id, Err(AppError::BadRequest(_))));

        let too_many = validate_lines(AppendLinesRequest {
            lines: (0..=MAX_LINES_PER_REQUEST)
                .map(|i| line(&format!("l{}", i), "本"))
                .collect(),
        });
        assert!(matches!(too_many, Err(AppError::BadRequest(_))));
    }
}

//! # TextHooker 세션 저장소 쿼리 모듈
//!
//! 세션(`hooker_sessions`)과 수집 문장(`hooker_lines`)에 대한 SQL 쿼리 함수들입니다.
//!
//! ## 세션 라이프사이클
//! ```text
//! [없음] ──첫 append / 첫 타이머 저장──▶ [존재] ──delete_session()──▶ [없음]
//!                                          │
//!                                          └─(방 세션) expires_at 경과 ──▶ 스위퍼가 삭제
//! ```
//!
//! ## 보장하는 성질
//! - 문장 추가는 ID 기준으로 멱등입니다 (`UNIQUE (session_id, id)` + `INSERT OR IGNORE`).
//! - 문장 순서는 삽입 순서(`position`)입니다.
//! - 없는 세션 조회는 에러가 아니라 `None` / 빈 `SessionView`입니다.
//! - 만료된 방 세션은 모든 조회에서 없는 것으로 취급합니다.

use super::{now_timestamp, timestamp_after_hours};
use crate::error::AppError;
use crate::models::*;
use crate::services::text::count_japanese;
use sqlx::SqlitePool;

/// 키로 세션 레코드를 찾습니다. 만료된 방 세션은 `None`입니다.
pub async fn find_session(
    pool: &SqlitePool,
    key: &SessionKey,
) -> Result<Option<HookerSession>, AppError> {
    let now = now_timestamp();

    let session = match key {
        SessionKey::Media { user_id, media_id } => {
            sqlx::query_as::<_, HookerSession>(
                r#"
                SELECT id, user_id, media_id, room_id, timer_seconds, expires_at,
                       created_at, updated_at
                FROM hooker_sessions
                WHERE user_id = ? AND media_id = ?
                  AND (expires_at IS NULL OR expires_at > ?)
                "#,
            )
            .bind(user_id)
            .bind(media_id)
            .bind(&now)
            .fetch_optional(pool)
            .await?
        }
        SessionKey::Room(room_id) => {
            sqlx::query_as::<_, HookerSession>(
                r#"
                SELECT id, user_id, media_id, room_id, timer_seconds, expires_at,
                       created_at, updated_at
                FROM hooker_sessions
                WHERE room_id = ?
                  AND (expires_at IS NULL OR expires_at > ?)
                "#,
            )
            .bind(room_id)
            .bind(&now)
            .fetch_optional(pool)
            .await?
        }
    };

    Ok(session)
}

async fn find_session_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<HookerSession>, AppError> {
    let session = sqlx::query_as::<_, HookerSession>(
        r#"
        SELECT id, user_id, media_id, room_id, timer_seconds, expires_at,
               created_at, updated_at
        FROM hooker_sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// 세션이 없으면 만들고, 있으면 그대로 돌려줍니다.
///
/// 방 키로 만든 세션은 미디어와 무관한 임시 세션이므로
/// `expires_at = 지금 + ttl_hours`가 설정됩니다.
/// 동시에 두 요청이 만들려고 해도 UNIQUE 제약 + `INSERT OR IGNORE`로 하나만 남습니다.
pub async fn get_or_create_session(
    pool: &SqlitePool,
    key: &SessionKey,
    ttl_hours: i64,
) -> Result<HookerSession, AppError> {
    if let Some(session) = find_session(pool, key).await? {
        return Ok(session);
    }

    let id = uuid::Uuid::now_v7().to_string();

    match key {
        SessionKey::Media { user_id, media_id } => {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO hooker_sessions (id, user_id, media_id)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(user_id)
            .bind(media_id)
            .execute(pool)
            .await?;
        }
        SessionKey::Room(room_id) => {
            // 같은 방 ID의 만료된 레코드가 남아 있으면 UNIQUE 충돌이 나므로 먼저 정리
            purge_expired_room(pool, room_id).await?;

            sqlx::query(
                r#"
                INSERT OR IGNORE INTO hooker_sessions (id, room_id, expires_at)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(room_id)
            .bind(timestamp_after_hours(ttl_hours))
            .execute(pool)
            .await?;
            tracing::debug!("Created ephemeral room session for {}", room_id);
        }
    }

    find_session(pool, key)
        .await?
        .ok_or(AppError::Internal(
            "Failed to retrieve created session".to_string(),
        ))
}

/// 세션의 문장들을 수집 순서대로 조회합니다.
pub async fn list_lines(pool: &SqlitePool, session_id: &str) -> Result<Vec<Line>, AppError> {
    let lines = sqlx::query_as::<_, Line>(
        r#"
        SELECT id, text, japanese_count, captured_at
        FROM hooker_lines
        WHERE session_id = ?
        ORDER BY position
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}

/// `getSession`: 세션 전체(문장 + 타이머)를 조회합니다.
///
/// 세션이 없으면 `exists: false`인 빈 뷰를 반환합니다 (에러 아님).
pub async fn get_session_view(pool: &SqlitePool, key: &SessionKey) -> Result<SessionView, AppError> {
    let Some(session) = find_session(pool, key).await? else {
        return Ok(SessionView::default());
    };

    let lines = list_lines(pool, &session.id).await?;
    Ok(SessionView::from_parts(session, lines))
}

/// `appendLines`: 문장들을 추가하고 실제로 새로 들어간 개수를 반환합니다.
///
/// 이미 있는 ID의 문장은 무시됩니다. `japanese_count`는 항상 텍스트에서 다시 계산합니다.
/// 임시 방 세션이면 만료 시각을 `ttl_hours`만큼 연장합니다.
pub async fn append_lines(
    pool: &SqlitePool,
    key: &SessionKey,
    lines: &[NewLine],
    ttl_hours: i64,
) -> Result<u64, AppError> {
    let session = get_or_create_session(pool, key, ttl_hours).await?;

    // 트랜잭션: 한 요청의 문장들은 전부 들어가거나 전부 안 들어갑니다
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for line in lines {
        let captured_at = line.captured_at.clone().unwrap_or_else(now_timestamp);
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO hooker_lines (session_id, id, text, japanese_count, captured_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&line.id)
        .bind(&line.text)
        .bind(count_japanese(&line.text) as i64)
        .bind(captured_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    sqlx::query(
        r#"
        UPDATE hooker_sessions
        SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            expires_at = CASE WHEN expires_at IS NULL THEN NULL ELSE ? END
        WHERE id = ?
        "#,
    )
    .bind(timestamp_after_hours(ttl_hours))
    .bind(&session.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(inserted)
}

/// `removeLines`: ID로 문장들을 삭제하고 삭제된 개수를 반환합니다.
///
/// 없는 ID나 없는 세션은 조용히 무시합니다 (0 반환).
pub async fn remove_lines(
    pool: &SqlitePool,
    key: &SessionKey,
    line_ids: &[String],
) -> Result<u64, AppError> {
    let Some(session) = find_session(pool, key).await? else {
        return Ok(0);
    };

    let mut tx = pool.begin().await?;
    let mut removed = 0;
    for line_id in line_ids {
        let result = sqlx::query("DELETE FROM hooker_lines WHERE session_id = ? AND id = ?")
            .bind(&session.id)
            .bind(line_id)
            .execute(&mut *tx)
            .await?;
        removed += result.rows_affected();
    }

    if removed > 0 {
        touch(&mut *tx, &session.id).await?;
    }
    tx.commit().await?;

    Ok(removed)
}

/// `clearLines`: 모든 문장을 삭제합니다. 세션 레코드와 타이머는 유지됩니다.
pub async fn clear_lines(pool: &SqlitePool, key: &SessionKey) -> Result<u64, AppError> {
    let Some(session) = find_session(pool, key).await? else {
        return Ok(0);
    };

    let result = sqlx::query("DELETE FROM hooker_lines WHERE session_id = ?")
        .bind(&session.id)
        .execute(pool)
        .await?;
    touch(pool, &session.id).await?;

    Ok(result.rows_affected())
}

/// `updateTimer`: 저장된 경과 시간을 덮어씁니다 (last-write-wins).
///
/// 세션이 없으면 만듭니다. 값의 단조성은 호출자가 책임집니다.
pub async fn update_timer(
    pool: &SqlitePool,
    key: &SessionKey,
    seconds: i64,
    ttl_hours: i64,
) -> Result<HookerSession, AppError> {
    let session = get_or_create_session(pool, key, ttl_hours).await?;

    sqlx::query(
        r#"
        UPDATE hooker_sessions
        SET timer_seconds = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(seconds)
    .bind(&session.id)
    .execute(pool)
    .await?;

    find_session_by_id(pool, &session.id)
        .await?
        .ok_or(AppError::NotFound)
}

/// `deleteSession`: 세션과 모든 문장을 삭제합니다. 멱등이며 삭제 여부를 반환합니다.
pub async fn delete_session(pool: &SqlitePool, key: &SessionKey) -> Result<bool, AppError> {
    let Some(session) = find_session(pool, key).await? else {
        return Ok(false);
    };

    delete_session_rows(pool, &session.id).await?;
    Ok(true)
}

/// `roomExists`: 영속화된 방 세션이 있는지 확인합니다.
///
/// 실시간 릴레이의 방(접속 중인 연결)과는 무관합니다.
pub async fn room_exists(pool: &SqlitePool, room_id: &str) -> Result<bool, AppError> {
    Ok(find_session(pool, &SessionKey::room(room_id)).await?.is_some())
}

/// 미디어 세션에 방 ID를 연결합니다.
///
/// 연결 후에는 같은 레코드를 `SessionKey::Room`으로도 찾을 수 있고,
/// 릴레이는 이 레코드의 문장을 늦게 들어온 게스트에게 `load_history`로 보냅니다.
///
/// ## 에러
/// - `Conflict`: 방 ID가 만료되지 않은 다른 세션에 이미 연결됨
pub async fn link_room(
    pool: &SqlitePool,
    user_id: &str,
    media_id: &str,
    room_id: &str,
    ttl_hours: i64,
) -> Result<HookerSession, AppError> {
    let key = SessionKey::media(user_id, media_id);
    let session = get_or_create_session(pool, &key, ttl_hours).await?;
    if session.room_id.as_deref() == Some(room_id) {
        return Ok(session);
    }

    purge_expired_room(pool, room_id).await?;
    let holder: Option<String> =
        sqlx::query_scalar("SELECT id FROM hooker_sessions WHERE room_id = ?")
            .bind(room_id)
            .fetch_optional(pool)
            .await?;
    if holder.is_some() {
        return Err(AppError::Conflict(
            "Room id is already bound to another session".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE hooker_sessions
        SET room_id = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(room_id)
    .bind(&session.id)
    .execute(pool)
    .await?;

    find_session_by_id(pool, &session.id)
        .await?
        .ok_or(AppError::NotFound)
}

/// 사용자의 최근 세션 목록을 문장 수 / 일본어 문자 수 합계와 함께 조회합니다.
pub async fn list_recent_sessions(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<SessionSummary>, AppError> {
    let sessions = sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT s.id, s.media_id, s.room_id, s.timer_seconds,
               COUNT(l.position) AS line_count,
               COALESCE(SUM(l.japanese_count), 0) AS char_count,
               s.updated_at
        FROM hooker_sessions s
        LEFT JOIN hooker_lines l ON l.session_id = s.id
        WHERE s.user_id = ?
        GROUP BY s.id
        ORDER BY s.updated_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

/// 만료된 임시 방 세션들을 삭제하고 삭제된 세션 수를 반환합니다.
///
/// `main.rs`의 백그라운드 스위퍼가 주기적으로 호출합니다.
pub async fn delete_expired_sessions(pool: &SqlitePool) -> Result<u64, AppError> {
    let now = now_timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM hooker_lines
        WHERE session_id IN (
            SELECT id FROM hooker_sessions
            WHERE expires_at IS NOT NULL AND expires_at <= ?
        )
        "#,
    )
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    let result =
        sqlx::query("DELETE FROM hooker_sessions WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}

async fn purge_expired_room(pool: &SqlitePool, room_id: &str) -> Result<(), AppError> {
    let expired: Option<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM hooker_sessions
        WHERE room_id = ? AND expires_at IS NOT NULL AND expires_at <= ?
        "#,
    )
    .bind(room_id)
    .bind(now_timestamp())
    .fetch_optional(pool)
    .await?;

    if let Some(id) = expired {
        delete_session_rows(pool, &id).await?;
    }
    Ok(())
}

async fn delete_session_rows(pool: &SqlitePool, session_id: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM hooker_lines WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM hooker_sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

async fn touch<'e, E>(executor: E, session_id: &str) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "UPDATE hooker_sessions SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
    )
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(())
}

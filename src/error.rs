//! # 에러 처리 모듈
//!
//! REST API에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형: 핸들러가 반환하는 에러를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 `{"error": {"code", "message"}}` JSON 응답으로 변환
//!
//! 릴레이(WebSocket)의 입장 거부는 HTTP 응답이 아니라 `error_message` 이벤트로
//! 전달되므로 `relay::registry::AdmissionError`에서 따로 다룹니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400): 식별자 형식, 음수 타이머 등
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// `#[from]` 덕분에 sqlx 호출 뒤의 `?`가 자동으로 이 variant로 변환됩니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 권한 없음 (HTTP 403): 다른 사용자의 세션에 연결된 방을 수정하려는 경우
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 리소스 충돌 (HTTP 409): 이미 다른 세션에 연결된 방 ID 등
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for AppError {
    /// 내부 에러(Database, Internal)는 실제 내용을 로그에만 남기고
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

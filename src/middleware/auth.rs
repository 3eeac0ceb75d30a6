//! # JWT 인증 추출기
//!
//! 미디어 세션 API는 로그인한 사용자만 호출할 수 있고,
//! 방 세션 API와 릴레이는 익명 접근을 허용합니다.
//! - `AuthUser`: 토큰이 없으면 401 (미디어 세션용)
//! - `MaybeAuthUser`: 토큰이 없으면 익명, 잘못된 토큰이면 401 (방 세션용)
//!
//! 회원가입과 로그인은 별도 계정 서비스가 맡습니다. 이 서버는 같은 비밀키로
//! 서명된 액세스 토큰을 검증만 하고, 토큰의 `sub`를 사용자 ID로 씁니다.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        let claims = verify_access_token(token, &state.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

/// 선택적 인증: Authorization 헤더가 없으면 `MaybeAuthUser(None)`
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(MaybeAuthUser(None));
        };
        let claims = verify_access_token(token, &state.jwt_secret)?;

        Ok(MaybeAuthUser(Some(AuthUser {
            user_id: claims.sub,
        })))
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "missing_token",
                "Authorization token is required",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid authorization token",
            ),
            AuthError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "expired_token",
                "Authorization token has expired",
            ),
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

fn create_token(
    user_id: &str,
    secret: &str,
    lifetime: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// 15분짜리 액세스 토큰. 계정 서비스와 같은 형식이며 테스트와 개발용 클라이언트가 씁니다.
pub fn create_access_token(
    user_id: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(user_id, secret, Duration::minutes(15))
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

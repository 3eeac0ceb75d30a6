//! # 미들웨어 모듈
//!
//! - `auth`: JWT bearer 토큰 추출기 (`AuthUser`, `MaybeAuthUser`)

pub mod auth;

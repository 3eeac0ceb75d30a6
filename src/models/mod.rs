//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `session`: TextHooker 세션, 문장(Line), 세션 키와 요청/응답 본문
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Line`처럼 짧게 접근합니다.

pub mod session;

pub use session::*;

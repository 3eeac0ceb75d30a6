//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인
//! - `texthooker`: 세션 저장소 API (미디어 세션 / 방 세션)
//!
//! 릴레이 WebSocket 핸들러는 `relay::socket`에 있습니다.

pub mod health;
pub mod texthooker;

pub use health::*;
pub use texthooker::*;

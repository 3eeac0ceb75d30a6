//! # 방송 릴레이 (Broadcast Relay)
//!
//! 호스트가 수집한 문장을 같은 방의 게스트들에게 실시간으로 전달합니다.
//! - `protocol`: 이벤트 이름과 페이로드 (서버/클라이언트 공용)
//! - `registry`: 방 멤버십과 호스트 토큰 (메모리 전용)
//! - `socket`: WebSocket 연결 처리

pub mod protocol;
pub mod registry;
pub mod socket;

pub use protocol::*;
pub use registry::{AdmissionError, RelayError, RoomRegistry};
pub use socket::ws_handler;

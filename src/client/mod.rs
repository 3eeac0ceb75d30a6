//! # 캡처 클라이언트 (Capture Client)
//!
//! 참가자 한 명의 로컬 프로세스입니다. 문장을 수집하고, 활동 타이머를 돌리고,
//! 세션 저장소와 방송 릴레이에 동기화합니다.
//!
//! - `timer`: 활동 타이머 상태 머신 (자동 일시정지, 보정, 시작값 조정)
//! - `state`: 클라이언트 상태 전체와 전이 메서드 → `Effect`
//! - `ingest`: 브리지 페이로드 해석, 붙여넣기 문단 추출
//! - `store`: 세션 저장소 트레이트 + HTTP 구현
//! - `local`: 로컬 빠른 저장소 (JSON 파일)
//! - `config`: 환경변수 설정
//! - `bridge`: 브리지 소켓 연결과 재연결 태스크
//! - `relay`: 릴레이 WebSocket 연결
//! - `runtime`: 위 모든 것을 묶는 이벤트 루프

pub mod bridge;
pub mod config;
pub mod ingest;
pub mod local;
pub mod relay;
pub mod runtime;
pub mod state;
pub mod store;
pub mod timer;

pub use config::CaptureConfig;
pub use runtime::{CaptureClient, ClientSettings, Command, Inputs};
pub use state::{CaptureOptions, CaptureSource, CaptureState, Collaboration, ConnectionStatus, Effect};
pub use store::{HttpSessionStore, SessionStore, SessionTarget, StoreCall, StoreError};

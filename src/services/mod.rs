//! # 비즈니스 로직 서비스 모듈
//!
//! DB나 HTTP에 의존하지 않는 순수 함수들을 모아둔 모듈입니다.
//! - `text`: 문장 텍스트 통계 (일본어 문자 수 등)

pub mod text;

//! # 문장 수집(Ingestion)
//!
//! 두 개의 독립적인 입력원이 같은 파이프라인으로 들어옵니다:
//! - 브리지 소켓: 로컬 텍스트 후킹 도구가 보내는 원문 페이로드 (`parse_bridge_payload`)
//! - 붙여넣기 임시 영역: 삽입된 텍스트에서 문단 단위로 잘라냄 (`Scratch`)
//!
//! 어느 쪽이든 정리된 텍스트는 `new_line()`으로 ID와 일본어 문자 수가 붙은 `Line`이 됩니다.

use crate::{db::now_timestamp, models::Line, services::text};
use serde_json::Value;
use uuid::Uuid;

/// 브리지 페이로드에서 문장 텍스트를 꺼냅니다.
///
/// 문자열 `sentence` 필드를 가진 JSON 객체면 그 값을, 아니면 원문 전체를 사용합니다.
/// 공백뿐이면 `None`.
pub fn parse_bridge_payload(raw: &str) -> Option<String> {
    let sentence = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .get("sentence")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    };

    match sentence {
        Some(sentence) => text::normalize_line(&sentence),
        None => text::normalize_line(raw),
    }
}

/// 수집된 텍스트로 새 문장을 만듭니다. ID는 시간순 정렬되는 UUID v7.
pub fn new_line(text: String) -> Line {
    Line {
        id: Uuid::now_v7().to_string(),
        japanese_count: text::count_japanese(&text) as i64,
        text,
        captured_at: now_timestamp(),
    }
}

/// 붙여넣기 임시 영역
///
/// 입력은 바이트 조각으로 들어옵니다. 줄바꿈으로 끝난 문단만 잘라내고
/// 아직 끝나지 않은 나머지는 다음 입력을 기다립니다.
/// 잘라낸 문단은 버퍼에서 제거되므로 같은 텍스트가 두 번 수집되지 않습니다.
#[derive(Debug, Default)]
pub struct Scratch {
    buf: Vec<u8>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 조각을 추가하고 완성된 문단들을 꺼냅니다 (빈 문단은 버림).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let Some(last_newline) = self.buf.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        // '\n'은 UTF-8 다중 바이트 문자 안에 나타나지 않으므로 여기서 잘라도 문자가 깨지지 않음
        let complete: Vec<u8> = self.buf.drain(..=last_newline).collect();

        String::from_utf8_lossy(&complete)
            .split('\n')
            .filter_map(text::normalize_line)
            .collect()
    }

    /// 입력이 끝났을 때 남은 텍스트를 마지막 문단으로 꺼냅니다.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        text::normalize_line(&String::from_utf8_lossy(&rest))
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

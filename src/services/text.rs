//! # 문장 텍스트 통계 서비스
//!
//! 수집된 문장(Line)의 텍스트를 분석하는 유틸리티 함수들입니다.
//!
//! 이 모듈의 함수들:
//! - `is_japanese_char()`: 한 문자가 일본어 스크립트(한자, 히라가나, 가타카나)에 속하는지 판별
//! - `count_japanese()`: 텍스트의 일본어 문자 수 계산 (독서 속도 통계용)
//! - `normalize_line()`: 캡처된 원문을 저장 가능한 한 줄로 정리
//!
//! 서버(저장 시 재계산)와 캡처 클라이언트(로컬 뷰 표시)가 같은 함수를 사용하므로
//! 두 쪽의 글자 수가 항상 일치합니다.

/// 문장 텍스트의 최대 길이 (문자 단위)
pub const MAX_LINE_CHARS: usize = 10_000;

/// 문자가 일본어 스크립트 범위에 속하는지 판별합니다.
///
/// 포함 범위:
/// - CJK 통합 한자 (U+4E00–U+9FFF), 확장 A (U+3400–U+4DBF), 확장 B (U+20000–U+2A6DF)
/// - CJK 호환 한자 (U+F900–U+FAFF)
/// - 히라가나 (U+3040–U+309F)
/// - 가타카나 (U+30A0–U+30FF), 가타카나 음성 확장 (U+31F0–U+31FF)
/// - 반각 가타카나 (U+FF66–U+FF9F)
///
/// 구두점(「」、。)과 전각 라틴 문자는 포함하지 않습니다.
pub fn is_japanese_char(c: char) -> bool {
    matches!(
        c,
        '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | '\u{31F0}'..='\u{31FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FF66}'..='\u{FF9F}'
            | '\u{20000}'..='\u{2A6DF}'
    )
}

/// 텍스트에 포함된 일본어 문자 수를 셉니다.
///
/// `.chars()`로 유니코드 스칼라 단위로 순회하므로 바이트 길이와 무관합니다.
pub fn count_japanese(text: &str) -> usize {
    text.chars().filter(|c| is_japanese_char(*c)).count()
}

/// 캡처된 원문을 저장할 문장으로 정리합니다.
///
/// 앞뒤 공백을 제거하고, 비어 있으면 `None`을 반환합니다.
/// `MAX_LINE_CHARS`를 넘는 부분은 잘라냅니다.
pub fn normalize_line(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > MAX_LINE_CHARS {
        return Some(trimmed.chars().take(MAX_LINE_CHARS).collect());
    }
    Some(trimmed.to_string())
}

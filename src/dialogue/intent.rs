//! 키워드 기반 의도 판별
//!
//! - 다시 말해 달라는 요청 (언어별 키워드 표, en/vi/ko만 지원)
//! - 일반 지식 사용 제안에 대한 예/아니오 응답
//!
//! 키워드 표는 전수 목록이 아닙니다. 표에 없는 언어는 반복 요청으로 보지 않습니다.

use super::turn::PENDING_CONFIRMATION_MARKER;

/// 일반 지식 사용 확인 질문 (항상 영어 고정, 번역하지 않음)
pub const GK_CONFIRMATION_PROMPT: &str = "I couldn't find this information in my documents. \
Would you like me to try to find out about it using my general knowledge? \
Please respond with 'yes' or 'no'.";

/// 반복 요청 키워드 (언어 코드, 키워드)
const REPEAT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &["repeat", "say again", "what did you say", "clarify", "last answer"],
    ),
    ("vi", &["nhắc lại", "lặp lại", "nói lại", "câu trả lời trước"]),
    ("ko", &["다시 말해줘", "반복해줘", "뭐라고 했어"]),
];

const AFFIRMATIVES: &[&str] = &[
    "yes", "y", "ok", "okay", "sure", "vâng", "có", "chấp nhận", "đồng ý", "네", "예", "응",
];

const NEGATIVES: &[&str] = &["no", "n", "nope", "không", "ko", "từ chối", "아니요", "아니"];

/// 사용자 응답 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Declined,
    Unclear,
}

impl Confirmation {
    /// 앞뒤 공백 제거 + 소문자 변환 후 정확히 일치하는지 비교
    pub fn classify(message: &str) -> Self {
        let normalized = message.trim().to_lowercase();

        if AFFIRMATIVES.contains(&normalized.as_str()) {
            Confirmation::Accepted
        } else if NEGATIVES.contains(&normalized.as_str()) {
            Confirmation::Declined
        } else {
            Confirmation::Unclear
        }
    }
}

/// 반복 요청 여부
///
/// 해당 언어 키워드 중 하나라도 메시지에 포함되면 반복 요청입니다.
pub fn is_repeat_request(lang_code: &str, message: &str) -> bool {
    let normalized = message.trim().to_lowercase();

    REPEAT_KEYWORDS
        .iter()
        .find(|(code, _)| *code == lang_code)
        .map(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
        .unwrap_or(false)
}

/// 마커가 붙은 일반 지식 사용 제안
pub fn confirmation_offer() -> String {
    format!("{} {}", GK_CONFIRMATION_PROMPT, PENDING_CONFIRMATION_MARKER)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_request_per_language() {
        assert!(is_repeat_request("en", "Can you REPEAT that?"));
        assert!(is_repeat_request("vi", "Bạn có thể nhắc lại câu trả lời được không?"));
        assert!(is_repeat_request("ko", "다시 말해줘"));
        assert!(!is_repeat_request("en", "What is APEC?"));
    }

    #[test]
    fn test_repeat_request_unsupported_language() {
        // 키워드 표에 없는 언어는 영어 키워드가 있어도 반복 요청이 아님
        assert!(!is_repeat_request("fr", "repeat"));
        assert!(!is_repeat_request("vi", "repeat"));
    }

    #[test]
    fn test_confirmation_classify() {
        assert_eq!(Confirmation::classify("  YES "), Confirmation::Accepted);
        assert_eq!(Confirmation::classify("đồng ý"), Confirmation::Accepted);
        assert_eq!(Confirmation::classify("네"), Confirmation::Accepted);
        assert_eq!(Confirmation::classify("No"), Confirmation::Declined);
        assert_eq!(Confirmation::classify("không"), Confirmation::Declined);
        assert_eq!(Confirmation::classify("yes please"), Confirmation::Unclear);
        assert_eq!(Confirmation::classify("maybe"), Confirmation::Unclear);
    }

    #[test]
    fn test_confirmation_offer_carries_marker() {
        let offer = confirmation_offer();
        assert!(offer.starts_with(GK_CONFIRMATION_PROMPT));
        assert!(offer.ends_with(PENDING_CONFIRMATION_MARKER));
    }
}

//! 언어 감지
//!
//! 생성 모델에 ISO 639-1 코드만 답하게 하고,
//! 두 글자 알파벳이 아니거나 호출이 실패하면 `en`으로 처리합니다.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::gemini::GenerationProvider;

/// 기본 언어 코드
pub const DEFAULT_LANGUAGE: &str = "en";

static LANG_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Alphabetic}{2}$").expect("language code regex is valid"));

pub struct LanguageDetector {
    llm: Arc<dyn GenerationProvider>,
}

impl LanguageDetector {
    pub fn new(llm: Arc<dyn GenerationProvider>) -> Self {
        Self { llm }
    }

    /// 텍스트의 주 언어 코드 (소문자 두 글자)
    pub async fn detect(&self, text: &str) -> String {
        let prompt = detection_prompt(text);

        let response = match self.llm.generate(&prompt).await {
            Ok(generation) => generation.text,
            Err(e) => {
                tracing::warn!("Error during language detection: {}. Defaulting to 'en'.", e);
                return DEFAULT_LANGUAGE.to_string();
            }
        };

        match validate_code(&response) {
            Some(code) => code,
            None => {
                tracing::warn!(
                    "Invalid language code '{}' from detection. Defaulting to 'en'.",
                    response.trim()
                );
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }
}

/// 응답을 정리해 유효한 코드면 반환
pub fn validate_code(response: &str) -> Option<String> {
    let code = response.trim().to_lowercase();
    LANG_CODE_RE.is_match(&code).then_some(code)
}

fn detection_prompt(text: &str) -> String {
    format!(
        "Detect the primary language of the following text and respond with ONLY its ISO 639-1 two-letter language code.\n\
         For example: 'en' for English, 'vi' for Vietnamese, 'ko' for Korean, 'zh' for Chinese, 'fr' for French, 'de' for German, 'es' for Spanish.\n\
         If the language cannot be confidently determined or is not one of the common languages, default to 'en'.\n\n\
         Text: {}\n\n\
         Language Code:",
        text
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::testing::ScriptedLlm;

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code(" VI\n"), Some("vi".to_string()));
        assert_eq!(validate_code("ko"), Some("ko".to_string()));
        assert_eq!(validate_code("eng"), None);
        assert_eq!(validate_code("e1"), None);
        assert_eq!(validate_code(""), None);
        assert_eq!(validate_code("Language: en"), None);
    }

    #[tokio::test]
    async fn test_detect_valid_code() {
        let llm = Arc::new(ScriptedLlm::new().reply("Language Code:", "vi"));
        let detector = LanguageDetector::new(llm);
        assert_eq!(detector.detect("APEC là gì?").await, "vi");
    }

    #[tokio::test]
    async fn test_detect_defaults_on_invalid_or_failure() {
        let llm = Arc::new(ScriptedLlm::new().reply("Language Code:", "Vietnamese"));
        assert_eq!(LanguageDetector::new(llm).detect("x").await, "en");

        let llm = Arc::new(ScriptedLlm::new().fail("Language Code:"));
        assert_eq!(LanguageDetector::new(llm).detect("x").await, "en");

        let llm = Arc::new(ScriptedLlm::new().blocked("Language Code:"));
        assert_eq!(LanguageDetector::new(llm).detect("x").await, "en");
    }
}

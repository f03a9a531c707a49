//! 다국어 오류 메시지 카탈로그
//!
//! 오류 종류마다 고정 영어 메시지가 있고, 다른 언어는 요청 시 번역합니다.
//! 번역 결과는 주입된 `TranslationCache`에 (영어 메시지, 언어) 쌍으로 저장됩니다.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;

use crate::gemini::GenerationProvider;

// ============================================================================
// ErrorKind
// ============================================================================

/// 사용자에게 보이는 오류 종류
///
/// `Display`가 영어 원문 메시지입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("Sorry, I encountered an error while processing your question.")]
    QueryPreprocessing,

    #[error("Sorry, I encountered an error while searching for relevant information in the database.")]
    VectorQuery,

    #[error("Sorry, I couldn't form a valid context from the retrieved information.")]
    ContextBuilding,

    #[error("Sorry, I encountered an error while generating the answer.")]
    LlmGeneration,

    #[error("Sorry, I couldn't find the answer using my general knowledge either. Can I help you with anything else?")]
    GeneralKnowledgeFallback,

    /// 오류가 아니라 사용자의 거절 응답이지만 같은 경로로 현지화합니다.
    #[error("Understood. I will stick to information from the provided documents. Is there anything else I can help you with?")]
    GeneralKnowledgeDeclined,

    #[error("I'm sorry, I cannot repeat the answer as there is no previous conversation to refer to. What else can I help you with?")]
    RepeatNoHistory,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::QueryPreprocessing,
        ErrorKind::VectorQuery,
        ErrorKind::ContextBuilding,
        ErrorKind::LlmGeneration,
        ErrorKind::GeneralKnowledgeFallback,
        ErrorKind::GeneralKnowledgeDeclined,
        ErrorKind::RepeatNoHistory,
    ];

    /// 고정 키
    pub fn key(self) -> &'static str {
        match self {
            ErrorKind::QueryPreprocessing => "query_preprocessing_error",
            ErrorKind::VectorQuery => "pinecone_query_error",
            ErrorKind::ContextBuilding => "context_building_error",
            ErrorKind::LlmGeneration => "llm_generation_error",
            ErrorKind::GeneralKnowledgeFallback => "general_knowledge_fallback_error",
            ErrorKind::GeneralKnowledgeDeclined => "general_knowledge_declined",
            ErrorKind::RepeatNoHistory => "repeat_no_history",
        }
    }

    /// 키로 조회, 모르는 키는 생성 오류로 대체
    pub fn from_key(key: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|k| k.key() == key)
            .unwrap_or(ErrorKind::LlmGeneration)
    }
}

// ============================================================================
// TranslationCache
// ============================================================================

/// 번역 캐시 (프로세스 전역 공유용)
///
/// 같은 쌍의 동시 삽입은 덮어쓰기로 끝나므로 문제되지 않습니다.
pub struct TranslationCache {
    entries: Mutex<LruCache<(String, String), String>>,
}

impl TranslationCache {
    /// `capacity`가 None이면 무제한
    pub fn new(capacity: Option<usize>) -> Self {
        let cache = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        Self {
            entries: Mutex::new(cache),
        }
    }

    pub fn get(&self, message: &str, lang_code: &str) -> Option<String> {
        self.entries
            .lock()
            .get(&(message.to_string(), lang_code.to_string()))
            .cloned()
    }

    pub fn insert(&self, message: &str, lang_code: &str, translated: String) {
        self.entries
            .lock()
            .put((message.to_string(), lang_code.to_string()), translated);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(None)
    }
}

// ============================================================================
// ErrorCatalog
// ============================================================================

/// 오류 메시지 현지화
pub struct ErrorCatalog {
    llm: Arc<dyn GenerationProvider>,
    cache: Arc<TranslationCache>,
}

impl ErrorCatalog {
    pub fn new(llm: Arc<dyn GenerationProvider>, cache: Arc<TranslationCache>) -> Self {
        Self { llm, cache }
    }

    /// 언어 코드에 맞는 메시지
    ///
    /// `en`이면 원문 그대로, 아니면 번역합니다. 번역에 실패하면 영어 원문입니다.
    pub async fn localize(&self, lang_code: &str, kind: ErrorKind) -> String {
        let message_en = kind.to_string();
        if lang_code == "en" {
            return message_en;
        }
        self.translate(&message_en, lang_code).await
    }

    async fn translate(&self, message_en: &str, lang_code: &str) -> String {
        if let Some(cached) = self.cache.get(message_en, lang_code) {
            tracing::debug!("Translation cache hit ({})", lang_code);
            return cached;
        }

        let prompt = translation_prompt(message_en, lang_code);

        match self.llm.generate(&prompt).await {
            Ok(generation) => match generation.answer() {
                Some(text) => {
                    let translated = text.trim().to_string();
                    tracing::info!(
                        "Translated error '{}' to '{}': '{}'",
                        message_en,
                        lang_code,
                        translated
                    );
                    self.cache.insert(message_en, lang_code, translated.clone());
                    translated
                }
                None => {
                    tracing::warn!("Empty translation for '{}' ({})", message_en, lang_code);
                    message_en.to_string()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Error translating error message '{}' to '{}': {}",
                    message_en,
                    lang_code,
                    e
                );
                message_en.to_string()
            }
        }
    }
}

fn translation_prompt(message_en: &str, lang_code: &str) -> String {
    format!(
        "Translate the following error message into {lang} language.\n\
         Respond with only the translated error message, without any additional commentary.\n\n\
         [ERROR MESSAGE IN ENGLISH]\n\
         {message}\n\n\
         [TRANSLATED ERROR MESSAGE]\n",
        lang = lang_code,
        message = message_en
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
    fn test_error_kind_keys_roundtrip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_key(kind.key()), kind);
        }
        assert_eq!(ErrorKind::from_key("no_such_error"), ErrorKind::LlmGeneration);
    }

    #[test]
    fn test_error_kind_display_is_english_message() {
        assert_eq!(
            ErrorKind::LlmGeneration.to_string(),
            "Sorry, I encountered an error while generating the answer."
        );
    }

    #[test]
    fn test_translation_cache_bounded() {
        let cache = TranslationCache::new(Some(2));
        cache.insert("a", "vi", "A".into());
        cache.insert("b", "vi", "B".into());
        cache.insert("c", "vi", "C".into());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", "vi").is_none());
        assert_eq!(cache.get("c", "vi"), Some("C".to_string()));
        assert!(cache.get("c", "ko").is_none());
    }

    #[test]
    fn test_translation_cache_unbounded() {
        let cache = TranslationCache::new(None);
        for i in 0..500 {
            cache.insert(&i.to_string(), "vi", i.to_string());
        }
        assert_eq!(cache.len(), 500);
    }

    #[tokio::test]
    async fn test_localize_english_skips_llm() {
        let llm = Arc::new(ScriptedLlm::new());
        let catalog = ErrorCatalog::new(llm.clone(), Arc::new(TranslationCache::default()));

        let message = catalog.localize("en", ErrorKind::RepeatNoHistory).await;
        assert_eq!(message, ErrorKind::RepeatNoHistory.to_string());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_localize_translates_once_then_caches() {
        let llm = Arc::new(ScriptedLlm::new().reply("[TRANSLATED ERROR MESSAGE]", " Xin lỗi. \n"));
        let cache = Arc::new(TranslationCache::default());
        let catalog = ErrorCatalog::new(llm.clone(), cache.clone());

        let first = catalog.localize("vi", ErrorKind::LlmGeneration).await;
        let second = catalog.localize("vi", ErrorKind::LlmGeneration).await;

        assert_eq!(first, "Xin lỗi.");
        assert_eq!(first, second);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_localize_failure_falls_back_to_english_uncached() {
        let llm = Arc::new(ScriptedLlm::new().fail("[TRANSLATED ERROR MESSAGE]"));
        let cache = Arc::new(TranslationCache::default());
        let catalog = ErrorCatalog::new(llm.clone(), cache.clone());

        let message = catalog.localize("ko", ErrorKind::ContextBuilding).await;
        assert_eq!(message, ErrorKind::ContextBuilding.to_string());
        assert!(cache.is_empty());
    }
}

//! 질의 정규화 - 맞춤법/문법 교정 후 영어로 번역
//!
//! 검색 파이프라인의 작업 언어는 영어입니다.
//! 호출이 실패하면 원래 질의를 그대로 돌려줍니다.

use std::sync::Arc;

use crate::gemini::GenerationProvider;

pub struct QueryNormalizer {
    llm: Arc<dyn GenerationProvider>,
}

impl QueryNormalizer {
    pub fn new(llm: Arc<dyn GenerationProvider>) -> Self {
        Self { llm }
    }

    /// 교정 + 번역된 질의
    pub async fn normalize(&self, query: &str, source_lang: &str) -> String {
        let prompt = normalization_prompt(query);

        let result = self
            .llm
            .generate(&prompt)
            .await
            .and_then(|generation| match generation.answer() {
                Some(text) => Ok(text.trim().to_string()),
                None => Err(anyhow::anyhow!("empty or blocked response")),
            });

        match result {
            Ok(processed) => {
                tracing::info!(
                    "Processed query ({} -> en): '{}' -> '{}'",
                    source_lang,
                    query,
                    processed
                );
                processed
            }
            Err(e) => {
                tracing::warn!(
                    "Error during query preprocessing: {}. Falling back to original query.",
                    e
                );
                query.to_string()
            }
        }
    }
}

fn normalization_prompt(query: &str) -> String {
    format!(
        "As a professional language assistant, your task is to review the user's question, correct any spelling or grammatical errors, \
         improve the phrasing if it's unclear or awkward, and then translate the corrected and improved question into English.\n\
         Respond with only the corrected and translated English question. Do not add any other content or commentary.\n\n\
         [ORIGINAL QUESTION]\n\
         {}\n\n\
         [CORRECTED AND TRANSLATED ENGLISH QUESTION]\n",
        query
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::testing::ScriptedLlm;

    const NEEDLE: &str = "[CORRECTED AND TRANSLATED ENGLISH QUESTION]";

    #[tokio::test]
    async fn test_normalize_translates() {
        let llm = Arc::new(ScriptedLlm::new().reply(NEEDLE, "  What is APEC?\n"));
        let normalizer = QueryNormalizer::new(llm.clone());

        assert_eq!(normalizer.normalize("APEC là gì?", "vi").await, "What is APEC?");
        assert_eq!(llm.prompts_containing("APEC là gì?").len(), 1);
    }

    #[tokio::test]
    async fn test_normalize_falls_back_to_original() {
        let llm = Arc::new(ScriptedLlm::new().fail(NEEDLE));
        let normalizer = QueryNormalizer::new(llm);
        assert_eq!(normalizer.normalize("APEC là gì?", "vi").await, "APEC là gì?");

        let llm = Arc::new(ScriptedLlm::new().blocked(NEEDLE));
        let normalizer = QueryNormalizer::new(llm);
        assert_eq!(normalizer.normalize("APEC là gì?", "vi").await, "APEC là gì?");
    }
}

//! 대화 기록 요약
//!
//! 최근 N턴을 `User: ...` / `Assistant: ...` 형식으로 펼치고,
//! 단어 수가 예산을 넘으면 생성 모델로 요약합니다.
//! 단어 수는 공백 기준 대략치입니다.

use std::sync::Arc;

use crate::gemini::GenerationProvider;

use super::turn::{strip_marker, Role, Turn};

pub const CONVERSATION_HEADER: &str = "[PREVIOUS CONVERSATION]";
pub const SUMMARY_HEADER: &str = "[PREVIOUS CONVERSATION SUMMARY]";
pub const UNAVAILABLE_PLACEHOLDER: &str = "[PREVIOUS CONVERSATION CONTEXT UNAVAILABLE]";

pub struct HistorySummarizer {
    llm: Arc<dyn GenerationProvider>,
    max_turns: usize,
    word_budget: usize,
}

impl HistorySummarizer {
    pub fn new(llm: Arc<dyn GenerationProvider>, max_turns: usize, word_budget: usize) -> Self {
        Self {
            llm,
            max_turns,
            word_budget,
        }
    }

    /// 기록을 프롬프트용 컨텍스트 블록으로 변환
    ///
    /// 기록이 없으면 빈 문자열입니다. 요약 실패는 자리표시 블록으로 대신합니다.
    pub async fn summarize(&self, history: &[Turn]) -> String {
        if history.is_empty() {
            return String::new();
        }

        let dialogue = render_dialogue(history, self.max_turns);

        if dialogue.split_whitespace().count() <= self.word_budget {
            return format!("\n{}\n{}\n", CONVERSATION_HEADER, dialogue);
        }

        let prompt = summary_prompt(&dialogue);

        match self.llm.generate(&prompt).await {
            Ok(generation) => match generation.answer() {
                Some(summary) => {
                    let summary = summary.trim();
                    tracing::info!(
                        "Conversation history summarized: {}...",
                        summary.chars().take(150).collect::<String>()
                    );
                    format!("\n{}\n{}\n", SUMMARY_HEADER, summary)
                }
                None => {
                    tracing::warn!("Empty summary for conversation history");
                    format!("\n{}\n", UNAVAILABLE_PLACEHOLDER)
                }
            },
            Err(e) => {
                tracing::warn!("Error summarizing history: {}", e);
                format!("\n{}\n", UNAVAILABLE_PLACEHOLDER)
            }
        }
    }
}

/// 최근 `max_turns`개 턴을 대화체로 펼침 (어시스턴트 턴의 마커 제거)
pub fn render_dialogue(history: &[Turn], max_turns: usize) -> String {
    let start = history.len().saturating_sub(max_turns);

    history[start..]
        .iter()
        .map(|turn| match turn.role {
            Role::User => format!("User: {}\n", turn.content),
            Role::Assistant => format!("Assistant: {}\n", strip_marker(&turn.content)),
        })
        .collect()
}

fn summary_prompt(dialogue: &str) -> String {
    format!(
        "Summarize the following conversation history concisely to extract key topics and context. \
         This summary will be used to help an assistant understand the ongoing conversation and respond appropriately to the next user query.\n\n\
         [CONVERSATION HISTORY]\n\
         {}\n\
         [CONCISE SUMMARY]\n",
        dialogue
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::testing::ScriptedLlm;
    use crate::dialogue::turn::PENDING_CONFIRMATION_MARKER;

    fn long_history(words_per_turn: usize) -> Vec<Turn> {
        let text = vec!["word"; words_per_turn].join(" ");
        vec![
            Turn::user(text.clone()),
            Turn::assistant(text.clone()),
            Turn::user(text),
        ]
    }

    #[test]
    fn test_render_dialogue_window_and_marker() {
        let history = vec![
            Turn::user("first"),
            Turn::assistant("dropped"),
            Turn::user("q1"),
            Turn::assistant(format!("offer {}", PENDING_CONFIRMATION_MARKER)),
        ];

        let rendered = render_dialogue(&history, 2);
        assert_eq!(rendered, "User: q1\nAssistant: offer\n");
    }

    #[tokio::test]
    async fn test_summarize_empty_history() {
        let llm = Arc::new(ScriptedLlm::new());
        let summarizer = HistorySummarizer::new(llm.clone(), 5, 700);
        assert_eq!(summarizer.summarize(&[]).await, "");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_short_history_verbatim() {
        let llm = Arc::new(ScriptedLlm::new());
        let summarizer = HistorySummarizer::new(llm.clone(), 5, 700);

        let block = summarizer
            .summarize(&[Turn::user("What is APEC?"), Turn::assistant("A forum.")])
            .await;

        assert_eq!(
            block,
            "\n[PREVIOUS CONVERSATION]\nUser: What is APEC?\nAssistant: A forum.\n\n"
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_long_history_uses_llm() {
        let llm = Arc::new(ScriptedLlm::new().reply("[CONCISE SUMMARY]", "User asked about APEC."));
        let summarizer = HistorySummarizer::new(llm.clone(), 5, 700);

        let block = summarizer.summarize(&long_history(300)).await;
        assert_eq!(block, "\n[PREVIOUS CONVERSATION SUMMARY]\nUser asked about APEC.\n");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_summarize_failure_placeholder() {
        let llm = Arc::new(ScriptedLlm::new().fail("[CONCISE SUMMARY]"));
        let summarizer = HistorySummarizer::new(llm, 5, 700);

        let block = summarizer.summarize(&long_history(300)).await;
        assert_eq!(block, "\n[PREVIOUS CONVERSATION CONTEXT UNAVAILABLE]\n");
    }
}

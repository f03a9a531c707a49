//! 턴 단위 대화 처리
//!
//! 처리 순서 (먼저 맞는 분기가 처리):
//! 1. 언어 감지 (이 턴의 모든 사용자 메시지에 사용)
//! 2. 반복 요청 → 직전 어시스턴트 답변
//! 3. 기록에서 확인 대기 상태 복원
//! 4. 확인 응답 → 일반 지식 답변 / 거절 안내 / 재질문
//! 5. 기본 RAG: 요약 → 정규화 → 검색 → 게이트 → 근거 기반 답변

use std::sync::Arc;

use crate::config::RagSettings;
use crate::gemini::GenerationProvider;
use crate::knowledge::{ChunkSource, GateDecision, RetrievalGate};

use super::catalog::{ErrorCatalog, ErrorKind, TranslationCache};
use super::intent::{confirmation_offer, is_repeat_request, Confirmation};
use super::language::LanguageDetector;
use super::normalizer::QueryNormalizer;
use super::summarizer::HistorySummarizer;
use super::synthesizer::{build_context, AnswerSynthesizer};
use super::turn::{last_assistant_turn, strip_marker, DialogueState, Turn};

pub struct DialogueOrchestrator {
    detector: LanguageDetector,
    summarizer: HistorySummarizer,
    normalizer: QueryNormalizer,
    synthesizer: AnswerSynthesizer,
    catalog: ErrorCatalog,
    source: Arc<dyn ChunkSource>,
    gate: RetrievalGate,
    top_k: usize,
}

impl DialogueOrchestrator {
    pub fn new(
        llm: Arc<dyn GenerationProvider>,
        source: Arc<dyn ChunkSource>,
        cache: Arc<TranslationCache>,
        settings: &RagSettings,
    ) -> Self {
        Self {
            detector: LanguageDetector::new(llm.clone()),
            summarizer: HistorySummarizer::new(
                llm.clone(),
                settings.history_turns,
                settings.history_word_budget,
            ),
            normalizer: QueryNormalizer::new(llm.clone()),
            synthesizer: AnswerSynthesizer::new(llm.clone()),
            catalog: ErrorCatalog::new(llm, cache),
            source,
            gate: RetrievalGate::new(settings.confidence_threshold),
            top_k: settings.top_k,
        }
    }

    /// 메시지 하나에 대한 답변
    ///
    /// 반환값에 확인 대기 마커가 들어갈 수 있으며,
    /// 호출자는 다음 턴의 기록에 이를 그대로 보존해야 합니다.
    pub async fn respond(&self, message: &str, history: &[Turn]) -> String {
        let lang = self.detector.detect(message).await;
        tracing::info!("Detected language: {}", lang);

        if is_repeat_request(&lang, message) {
            return self.repeat_last_answer(&lang, history).await;
        }

        match DialogueState::recover(history, message) {
            DialogueState::AwaitingConfirmation { original_query } => {
                self.resolve_confirmation(&lang, message, &original_query)
                    .await
            }
            DialogueState::Idle => self.answer_with_retrieval(&lang, message, history).await,
        }
    }

    async fn repeat_last_answer(&self, lang: &str, history: &[Turn]) -> String {
        tracing::info!("Repeat request detected");

        if history.len() >= 2 {
            if let Some((_, turn)) = last_assistant_turn(history) {
                let previous = strip_marker(&turn.content);
                if !previous.is_empty() {
                    return previous;
                }
            }
        }

        self.catalog.localize(lang, ErrorKind::RepeatNoHistory).await
    }

    async fn resolve_confirmation(&self, lang: &str, message: &str, original_query: &str) -> String {
        match Confirmation::classify(message) {
            Confirmation::Accepted => {
                tracing::info!(
                    "User accepted general knowledge for: '{}'",
                    original_query
                );
                match self.synthesizer.answer_general(original_query, lang).await {
                    Ok(answer) => answer,
                    Err(kind) => self.catalog.localize(lang, kind).await,
                }
            }
            Confirmation::Declined => {
                tracing::info!("User declined general knowledge");
                self.catalog
                    .localize(lang, ErrorKind::GeneralKnowledgeDeclined)
                    .await
            }
            Confirmation::Unclear => {
                tracing::info!("Unclear confirmation reply, asking again");
                confirmation_offer()
            }
        }
    }

    async fn answer_with_retrieval(&self, lang: &str, message: &str, history: &[Turn]) -> String {
        let history_context = self.summarizer.summarize(history).await;

        let query = self.normalizer.normalize(message, lang).await;
        if query.trim().is_empty() {
            tracing::warn!("Query is empty after preprocessing");
            return self
                .catalog
                .localize(lang, ErrorKind::QueryPreprocessing)
                .await;
        }

        let chunks = match self.source.retrieve(&query, self.top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::error!("Error querying vector index: {:#}", e);
                return self.catalog.localize(lang, ErrorKind::VectorQuery).await;
            }
        };

        let chunks = match self.gate.evaluate(chunks) {
            GateDecision::Accept { chunks, confidence } => {
                tracing::info!("Retrieval accepted (confidence {:.3})", confidence);
                chunks
            }
            GateDecision::Reject { confidence } => {
                tracing::info!(
                    "Low retrieval confidence ({:.3} < {:.2}), offering general knowledge",
                    confidence,
                    self.gate.threshold()
                );
                return confirmation_offer();
            }
        };

        let Some(context) = build_context(&chunks) else {
            tracing::warn!("No usable content in retrieved chunks");
            return self.catalog.localize(lang, ErrorKind::ContextBuilding).await;
        };

        match self
            .synthesizer
            .answer_grounded(&history_context, &context, message, lang)
            .await
        {
            Ok(answer) => answer,
            Err(kind) => self.catalog.localize(lang, kind).await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

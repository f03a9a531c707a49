//! Dialogue 모듈 - 대화 턴 처리
//!
//! - Turn: 대화 기록 타입 + 확인 대기 상태 복원
//! - Intent: 반복 요청 / 예·아니오 판별
//! - Catalog: 다국어 오류 메시지 + 번역 캐시
//! - Language / Summarizer / Normalizer: 생성 모델 보조 작업
//! - Synthesizer: 근거 기반 / 일반 지식 답변
//! - Orchestrator: 턴 단위 상태 기계

mod catalog;
mod intent;
mod language;
mod normalizer;
mod orchestrator;
mod summarizer;
mod synthesizer;
mod turn;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use catalog::{ErrorCatalog, ErrorKind, TranslationCache};
pub use intent::{confirmation_offer, is_repeat_request, Confirmation, GK_CONFIRMATION_PROMPT};
pub use language::{validate_code, LanguageDetector, DEFAULT_LANGUAGE};
pub use normalizer::QueryNormalizer;
pub use orchestrator::DialogueOrchestrator;
pub use summarizer::{render_dialogue, HistorySummarizer};
pub use synthesizer::{build_context, AnswerSynthesizer};
pub use turn::{
    last_assistant_turn, parse_history, strip_marker, DialogueState, Role, Turn,
    PENDING_CONFIRMATION_MARKER,
};

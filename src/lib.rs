//! apec-rag - APEC 2025 대화형 RAG 챗봇
//!
//! Gemini 생성/임베딩 + LanceDB 벡터 검색 위에서
//! 다국어 대화 턴을 처리합니다.
//! 검색 신뢰도가 낮으면 일반 지식 사용 여부를 사용자에게 묻고,
//! 그 확인 상태는 대화 기록의 마커만으로 복원합니다.

pub mod cli;
pub mod config;
pub mod dialogue;
pub mod gemini;
pub mod knowledge;
pub mod session;

// Re-exports
pub use config::{get_data_dir, has_api_key, AppConfig, RagSettings};
pub use dialogue::{DialogueOrchestrator, ErrorKind, Role, TranslationCache, Turn};
pub use gemini::{EmbeddingProvider, GeminiClient, Generation, GenerationProvider};
pub use knowledge::{
    ChunkLoader, ChunkRecord, ChunkSource, LanceVectorStore, RetrievalGate, RetrievedChunk,
    VectorRetriever, VectorSearch,
};
pub use session::SessionStore;

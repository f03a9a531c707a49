//! Knowledge 모듈 - APEC 2025 청크 검색
//!
//! - Vector: 벡터 검색 트레이트 + 메모리 구현
//! - Lance: LanceDB 벡터 저장소 (코사인 거리)
//! - Chunks: 청크 파일 적재
//! - Retriever: 질의 검색 + 신뢰도 게이트
//! - Events: "오늘의 행사" 날짜 필터

mod chunks;
mod events;
mod lance;
mod retriever;
mod vector;

// Re-exports
pub use chunks::{load_chunk_file, ChunkLoader, ChunkRecord, IngestStats, DEFAULT_BATCH_SIZE};
pub use events::{asks_about_today, filter_todays_events, parse_event_start, NO_EVENTS_TODAY};
pub use lance::LanceVectorStore;
pub use retriever::{
    mean_score, ChunkSource, GateDecision, RetrievalGate, RetrievedChunk, VectorRetriever,
};
pub use vector::{
    cosine_similarity, Metadata, MemoryVectorStore, VectorEntry, VectorMatch, VectorSearch,
    EMBEDDING_DIMENSION, MISSING_TEXT, ORIGINAL_TEXT_KEY,
};

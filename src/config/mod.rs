//! 설정 모듈 - 환경변수 기반 애플리케이션 설정
//!
//! Gemini API 키 풀, 모델 이름, 데이터 경로와
//! RAG 파이프라인 튜닝 값을 한 곳에서 관리합니다.

use std::path::PathBuf;

use anyhow::Result;

// ============================================================================
// Constants
// ============================================================================

/// 키 풀 환경변수 접두사 (GEMINI_API_KEY_01 ~ GEMINI_API_KEY_05)
const KEY_POOL_PREFIX: &str = "GEMINI_API_KEY_0";
const KEY_POOL_SIZE: usize = 5;

/// 기본 생성 모델
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";

/// 기본 임베딩 모델 (768 차원)
/// source: https://ai.google.dev/gemini-api/docs/embeddings
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// 기본 LanceDB 테이블 이름
pub const DEFAULT_TABLE_NAME: &str = "apec2025-chatbot";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로
///
/// `APEC_RAG_DATA_DIR`이 있으면 그 값을, 없으면 `~/.apec-rag/`를 사용합니다.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = non_empty_env("APEC_RAG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".apec-rag")
}

// ============================================================================
// RagSettings
// ============================================================================

/// 대화 턴 처리에 쓰이는 고정 튜닝 값
#[derive(Debug, Clone)]
pub struct RagSettings {
    /// 검색 결과 채택 임계값 (평균 유사도)
    pub confidence_threshold: f32,
    /// 검색할 청크 수
    pub top_k: usize,
    /// 요약 대상 최근 턴 수
    pub history_turns: usize,
    /// 요약으로 전환되는 단어 수 기준
    pub history_word_budget: usize,
    /// 번역 캐시 용량 (None이면 무제한)
    pub translation_cache_capacity: Option<usize>,
    /// "오늘의 행사" 날짜 필터 사용 여부
    pub today_filter: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            top_k: 3,
            history_turns: 5,
            history_word_budget: 700,
            translation_cache_capacity: Some(128),
            today_filter: false,
        }
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API 키 풀 (라운드 로빈 순서)
    pub api_keys: Vec<String>,
    pub generation_model: String,
    pub embedding_model: String,
    pub data_dir: PathBuf,
    pub table_name: String,
    pub rag: RagSettings,
}

impl AppConfig {
    /// 환경변수에서 설정 로드
    ///
    /// API 키가 하나도 없으면 실패합니다. 시작 단계의 치명적 오류입니다.
    pub fn from_env() -> Result<Self> {
        let api_keys = load_api_keys();
        if api_keys.is_empty() {
            anyhow::bail!(
                "No Gemini API key found.\n\
                 Set GEMINI_API_KEY_01 .. GEMINI_API_KEY_05 (or GEMINI_API_KEY).\n\
                 Get your API key at: https://aistudio.google.com/app/apikey"
            );
        }

        tracing::debug!("Loaded {} Gemini API key(s)", api_keys.len());

        Ok(Self {
            api_keys,
            generation_model: non_empty_env("APEC_RAG_GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            embedding_model: non_empty_env("APEC_RAG_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            data_dir: get_data_dir(),
            table_name: non_empty_env("APEC_RAG_TABLE")
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            rag: RagSettings::default(),
        })
    }

    /// LanceDB 경로
    pub fn lance_path(&self) -> PathBuf {
        self.data_dir.join("vectors.lance")
    }

    /// 세션 DB 경로
    pub fn sessions_path(&self) -> PathBuf {
        self.data_dir.join("sessions.db")
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 풀 로드
///
/// 우선순위:
/// 1. `GEMINI_API_KEY_01` ~ `GEMINI_API_KEY_05` (번호 순)
/// 2. `GEMINI_API_KEY`
/// 3. `GOOGLE_AI_API_KEY`
pub fn load_api_keys() -> Vec<String> {
    let pool: Vec<String> = (1..=KEY_POOL_SIZE)
        .filter_map(|i| non_empty_env(&format!("{}{}", KEY_POOL_PREFIX, i)))
        .collect();

    if !pool.is_empty() {
        return pool;
    }

    ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"]
        .iter()
        .find_map(|name| non_empty_env(name))
        .into_iter()
        .collect()
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    !load_api_keys().is_empty()
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Tests
// ============================================================================

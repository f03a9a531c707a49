//! 테스트용 생성/검색 스텁

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::gemini::{Generation, GenerationProvider};
use crate::knowledge::{ChunkSource, Metadata, RetrievedChunk};

enum Reply {
    Text(String),
    Blocked,
    Fail,
}

/// 프롬프트에 포함된 문자열로 응답을 고르는 생성 스텁
///
/// 규칙은 등록 순서대로 검사합니다. 맞는 규칙이 없으면 오류를 돌려줍니다.
#[derive(Default)]
pub struct ScriptedLlm {
    rules: Vec<(String, Reply)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, needle: &str, text: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Text(text.to_string())));
        self
    }

    pub fn blocked(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Blocked));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail));
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// 주어진 문자열을 포함한 프롬프트들
    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains(needle))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.prompts.lock().push(prompt.to_string());

        match self.rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            Some((_, Reply::Text(text))) => Ok(Generation::text(text.clone())),
            Some((_, Reply::Blocked)) => Ok(Generation::blocked()),
            Some((needle, Reply::Fail)) => anyhow::bail!("scripted failure for '{}'", needle),
            None => anyhow::bail!("no scripted reply"),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// 고정 결과를 돌려주는 검색 스텁
pub struct StaticSource {
    chunks: Option<Vec<RetrievedChunk>>,
    queries: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self {
            chunks: Some(chunks),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// 항상 실패하는 검색
    pub fn failing() -> Self {
        Self {
            chunks: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ChunkSource for StaticSource {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.queries.lock().push(query.to_string());
        match &self.chunks {
            Some(chunks) => Ok(chunks.iter().take(k).cloned().collect()),
            None => anyhow::bail!("index unavailable"),
        }
    }
}

pub fn chunk(id: &str, score: f32, content: &str) -> RetrievedChunk {
    RetrievedChunk {
        id: id.to_string(),
        score,
        content: content.to_string(),
        metadata: Metadata::new(),
    }
}

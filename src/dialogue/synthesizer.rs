//! 답변 생성
//!
//! - 근거 기반 답변: 대화 컨텍스트 + 검색 청크 + 지시사항 + 원래 질문
//! - 일반 지식 답변: 검색 컨텍스트 없이 모델 자체 지식으로 답변
//!
//! 두 경로 모두 생성된 콘텐츠 파트가 있을 때만 답변으로 인정합니다.

use std::sync::Arc;

use crate::gemini::GenerationProvider;
use crate::knowledge::RetrievedChunk;

use super::catalog::ErrorKind;

/// 청크 본문 구분자
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub struct AnswerSynthesizer {
    llm: Arc<dyn GenerationProvider>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn GenerationProvider>) -> Self {
        Self { llm }
    }

    /// 검색 컨텍스트 기반 답변
    ///
    /// 호출 실패, 차단, 빈 응답은 모두 `LlmGeneration`입니다.
    pub async fn answer_grounded(
        &self,
        history_context: &str,
        context: &str,
        question: &str,
        lang_code: &str,
    ) -> Result<String, ErrorKind> {
        let prompt = grounded_prompt(history_context, context, question, lang_code);
        tracing::debug!("--- LLM Prompt (Final Generation) ---\n{}", prompt);

        match self.llm.generate(&prompt).await {
            Ok(generation) => match generation.answer() {
                Some(_) => Ok(generation.text),
                None => {
                    tracing::warn!("LLM response was empty or blocked");
                    Err(ErrorKind::LlmGeneration)
                }
            },
            Err(e) => {
                tracing::warn!("Error generating content with LLM: {}", e);
                Err(ErrorKind::LlmGeneration)
            }
        }
    }

    /// 일반 지식 답변
    ///
    /// 호출 실패는 `GeneralKnowledgeFallback`, 빈 응답은 `LlmGeneration`입니다.
    pub async fn answer_general(&self, question: &str, lang_code: &str) -> Result<String, ErrorKind> {
        let prompt = general_knowledge_prompt(question, lang_code);

        match self.llm.generate(&prompt).await {
            Ok(generation) => match generation.answer() {
                Some(_) => Ok(generation.text),
                None => {
                    tracing::warn!("General knowledge response was empty or blocked");
                    Err(ErrorKind::LlmGeneration)
                }
            },
            Err(e) => {
                tracing::warn!("Error generating general knowledge content: {}", e);
                Err(ErrorKind::GeneralKnowledgeFallback)
            }
        }
    }
}

/// 청크 본문 결합
///
/// 센티널(`N/A`)이거나 빈 본문은 제외하며, 남는 것이 없으면 `None`입니다.
pub fn build_context(chunks: &[RetrievedChunk]) -> Option<String> {
    let texts: Vec<&str> = chunks
        .iter()
        .filter(|c| c.has_content())
        .map(|c| c.content.as_str())
        .collect();

    if texts.is_empty() {
        return None;
    }

    Some(texts.join(CONTEXT_SEPARATOR))
}

fn grounded_prompt(history_context: &str, context: &str, question: &str, lang_code: &str) -> String {
    format!(
        r#"You are an intelligent assistant specialized in APEC 2025 information.

{history}

You must answer the user's question accurately and completely BASED ON the context provided below.
If the context does not contain enough information to answer, state that you do not know that information.
Do not fabricate information.

Answer in the language of the ORIGINAL USER QUESTION, whose language code is '{lang}'.
For example: If the ORIGINAL USER QUESTION is in Vietnamese, answer in Vietnamese. If it is in English, answer in English. If it is in Korean, answer in Korean.

IMPORTANT: ALWAYS RETAIN PLACE NAMES, EVENT NAMES, ORGANIZATION NAMES, TIMES, DATES, PHONE NUMBERS, WEBSITES, and SPECIALIZED TERMS in English in the answer.
Example: "The APEC Economic Leaders' Meeting will take place in Gyeongju."

FORMATTING GUIDELINES:
- For answers containing lists of items (e.g., members, events, detailed information), use bullet points or numbered lists.
- Bold important keywords, names, dates, and locations using Markdown (e.g., **Example Text**).
- Ensure the answer is well-structured, easy to read, and uses line breaks appropriately for clarity.
- If the answer has multiple distinct parts, use subheadings or clear paragraph breaks.

[CONTEXT]
{context}

[ORIGINAL USER QUESTION]
{question}

[ANSWER]
"#,
        history = history_context,
        lang = lang_code,
        context = context,
        question = question
    )
}

fn general_knowledge_prompt(question: &str, lang_code: &str) -> String {
    format!(
        r#"You are an intelligent assistant. Answer the following question using your general knowledge.
Answer in the language of the ORIGINAL USER QUESTION, which was: '{lang}'.
IMPORTANT: ALWAYS RETAIN PLACE NAMES, EVENT NAMES, ORGANIZATION NAMES, TIMES, DATES, PHONE NUMBERS, WEBSITES, and SPECIALIZED TERMS in English in the answer.

[ORIGINAL USER QUESTION]
{question}

[ANSWER]
"#,
        lang = lang_code,
        question = question
    )
}

// ============================================================================
// Tests
// ============================================================================

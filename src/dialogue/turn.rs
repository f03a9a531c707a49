//! 대화 턴과 확인 대기 상태
//!
//! 대화 기록은 평문 턴으로만 외부에 저장되므로,
//! "일반 지식 사용 확인 대기" 상태는 마지막 어시스턴트 턴에 박힌
//! 마커 문자열로만 복원합니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 확인 대기 마커
///
/// 호출자는 이 문자열이 포함된 답변을 수정 없이 다음 호출의 기록에 넣어야 합니다.
pub const PENDING_CONFIRMATION_MARKER: &str = "[AWAITING_GK_CONFIRMATION]";

// ============================================================================
// Turn
// ============================================================================

/// 발화 주체
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// 대화 한 턴
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// 느슨한 JSON 항목에서 턴 생성
    ///
    /// `role`이 user/assistant이고 `content`가 문자열인 객체만 받습니다.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let role = obj.get("role").and_then(Value::as_str).and_then(Role::parse)?;
        let content = obj.get("content").and_then(Value::as_str)?;

        Some(Self {
            role,
            content: content.to_string(),
        })
    }

    /// 마커 포함 여부
    pub fn is_pending_confirmation(&self) -> bool {
        self.role == Role::Assistant && self.content.contains(PENDING_CONFIRMATION_MARKER)
    }
}

/// JSON 배열을 대화 기록으로 변환 (형식이 맞지 않는 항목은 버림)
pub fn parse_history(values: &[Value]) -> Vec<Turn> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            let turn = Turn::from_value(v);
            if turn.is_none() {
                tracing::warn!("Ignoring malformed history entry #{}", i);
            }
            turn
        })
        .collect()
}

/// 마커 제거 후 앞뒤 공백 정리
pub fn strip_marker(content: &str) -> String {
    content
        .replace(PENDING_CONFIRMATION_MARKER, "")
        .trim()
        .to_string()
}

/// 가장 최근 어시스턴트 턴 (인덱스, 턴)
pub fn last_assistant_turn(history: &[Turn]) -> Option<(usize, &Turn)> {
    history
        .iter()
        .enumerate()
        .rev()
        .find(|(_, t)| t.role == Role::Assistant)
}

// ============================================================================
// DialogueState
// ============================================================================

/// 기록에서 복원한 대화 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    Idle,
    /// 일반 지식 사용 확인 대기
    AwaitingConfirmation {
        /// 확인을 기다리는 원래 질문
        original_query: String,
    },
}

impl DialogueState {
    /// 기록과 현재 메시지로 상태 복원
    ///
    /// 마지막 어시스턴트 턴에 마커가 있으면 확인 대기 상태입니다.
    /// 그 바로 앞 턴이 사용자 턴이면 그 내용이 원래 질문이고,
    /// 아니면 현재 메시지를 원래 질문으로 씁니다.
    pub fn recover(history: &[Turn], message: &str) -> Self {
        let Some((index, turn)) = last_assistant_turn(history) else {
            return DialogueState::Idle;
        };

        if !turn.is_pending_confirmation() {
            return DialogueState::Idle;
        }

        let original_query = index
            .checked_sub(1)
            .and_then(|i| history.get(i))
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.clone())
            .unwrap_or_else(|| message.to_string());

        DialogueState::AwaitingConfirmation { original_query }
    }
}

// ============================================================================
// Tests
// ============================================================================

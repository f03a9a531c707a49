//! 오늘의 행사 필터
//!
//! 질의가 "today"/"hôm nay"를 포함하면 검색 결과를 오늘 시작하는 행사로 좁힙니다.
//! 행사 날짜는 메타데이터 `date` 필드의 `July 8, 2025` 또는
//! `July 8 - 10, 2025` 형식에서 시작일을 읽습니다.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use super::retriever::RetrievedChunk;
use super::vector::Metadata;

static EVENT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z]+)\s+(\d{1,2})(?:\s*-\s*\d{1,2})?,\s*(\d{4})")
        .expect("event date regex is valid")
});

const TODAY_KEYWORDS: &[&str] = &["today", "hôm nay"];

/// 오늘 행사가 없을 때 돌려주는 안내 청크 본문
pub const NO_EVENTS_TODAY: &str =
    "There are no events taking place today according to the APEC 2025 schedule.";

/// 질의가 오늘 행사를 묻는지 여부
pub fn asks_about_today(query: &str) -> bool {
    let lower = query.to_lowercase();
    TODAY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// 행사 시작일 파싱
pub fn parse_event_start(date: &str) -> Option<NaiveDate> {
    let caps = EVENT_DATE_RE.captures(date)?;
    let normalized = format!("{} {}, {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&normalized, "%B %d, %Y").ok()
}

/// 오늘 행사 필터 적용
///
/// 오늘 시작하는 행사가 없으면 안내 청크 하나만 돌려줍니다.
pub fn filter_todays_events(chunks: Vec<RetrievedChunk>, today: NaiveDate) -> Vec<RetrievedChunk> {
    let todays: Vec<RetrievedChunk> = chunks
        .into_iter()
        .filter(|c| event_start(&c.metadata) == Some(today))
        .collect();

    if todays.is_empty() {
        tracing::info!("No events found for {}", today);
        return vec![RetrievedChunk {
            id: "no-events-today".to_string(),
            score: 1.0,
            content: NO_EVENTS_TODAY.to_string(),
            metadata: Metadata::new(),
        }];
    }

    todays
}

fn event_start(metadata: &Metadata) -> Option<NaiveDate> {
    metadata.get("event")?;
    let date = metadata.get("date").and_then(Value::as_str)?;
    if date.trim() == "-" {
        return None;
    }

    let parsed = parse_event_start(date);
    if parsed.is_none() {
        tracing::warn!("Error parsing event date '{}'", date);
    }
    parsed
}

// ============================================================================
// Tests
// ============================================================================

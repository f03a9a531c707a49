//! Session Store - rusqlite 기반 대화 기록 저장소
//!
//! 대화 처리 자체는 기록을 소유하지 않으므로, CLI가 세션별 턴을 보관했다가
//! 매 호출마다 전체 기록을 넘겨줍니다.
//! 어시스턴트 턴은 확인 대기 마커까지 그대로 저장합니다.
//! 저장 위치: <data_dir>/sessions.db

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;

use crate::dialogue::{Role, Turn};

// ============================================================================
// Types
// ============================================================================

/// 세션 목록 항목
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub turn_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_count: usize,
    pub turn_count: usize,
    pub db_path: PathBuf,
}

// ============================================================================
// SessionStore
// ============================================================================

pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SessionStore {
    /// 저장소 열기 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        store.initialize()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS turns (
                session_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (session_id, position)
            )",
            [],
        )
        .context("Failed to create turns table")?;

        tracing::debug!("Session store initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 세션 끝에 턴 추가, 추가된 위치 반환
    pub fn append(&self, session: &str, turn: &Turn) -> Result<i64> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM turns WHERE session_id = ?1",
            params![session],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO turns (session_id, position, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session,
                position,
                turn.role.as_str(),
                turn.content,
                Utc::now().to_rfc3339()
            ],
        )
        .context("Failed to insert turn")?;

        Ok(position)
    }

    /// 세션 기록 (순서대로)
    ///
    /// 역할 값이 알 수 없는 행은 건너뜁니다.
    pub fn history(&self, session: &str) -> Result<Vec<Turn>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT role, content FROM turns WHERE session_id = ?1 ORDER BY position ASC",
        )?;

        let rows = stmt.query_map(params![session], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut turns = Vec::new();
        for row in rows {
            let (role, content) = row?;
            match Role::parse(&role) {
                Some(role) => turns.push(Turn { role, content }),
                None => tracing::warn!("Skipping turn with unknown role '{}'", role),
            }
        }

        Ok(turns)
    }

    /// 세션 목록 (최근 갱신 순)
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT session_id, COUNT(*), MAX(created_at) FROM turns
             GROUP BY session_id
             ORDER BY MAX(created_at) DESC",
        )?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    name: row.get(0)?,
                    turn_count: row.get::<_, i64>(1)? as usize,
                    updated_at: parse_datetime(row.get::<_, String>(2)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(sessions)
    }

    /// 세션 삭제, 삭제된 턴 수 반환
    pub fn delete_session(&self, session: &str) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let rows = conn.execute("DELETE FROM turns WHERE session_id = ?1", params![session])?;
        tracing::info!("Deleted session '{}' ({} turns)", session, rows);

        Ok(rows)
    }

    pub fn stats(&self) -> Result<SessionStats> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let (sessions, turns): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(DISTINCT session_id), COUNT(*) FROM turns",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap_or((0, 0));

        Ok(SessionStats {
            session_count: sessions as usize,
            turn_count: turns as usize,
            db_path: self.db_path.clone(),
        })
    }
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================

//! CLI 모듈
//!
//! apec-rag CLI 명령어 정의 및 구현

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::config::{get_data_dir, load_api_keys, AppConfig};
use crate::dialogue::{
    parse_history, strip_marker, DialogueOrchestrator, ErrorCatalog, ErrorKind, TranslationCache,
    Turn,
};
use crate::gemini::GeminiClient;
use crate::knowledge::{load_chunk_file, ChunkLoader, LanceVectorStore, VectorRetriever, VectorSearch};
use crate::session::SessionStore;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "apec-rag")]
#[command(version, about = "APEC 2025 대화형 RAG 챗봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 대화형 채팅 (세션 기록 저장)
    Chat {
        /// 세션 이름 (없으면 새로 생성)
        #[arg(short, long)]
        session: Option<String>,

        /// "오늘의 행사" 날짜 필터 사용
        #[arg(long)]
        today_filter: bool,
    },

    /// 질문 한 번 하기
    Ask {
        /// 질문
        question: String,

        /// 이전 대화 기록 JSON 파일 ({role, content} 배열)
        #[arg(long)]
        history: Option<PathBuf>,

        /// "오늘의 행사" 날짜 필터 사용
        #[arg(long)]
        today_filter: bool,
    },

    /// 청크 파일을 벡터 인덱스에 적재
    Load {
        /// 청크 JSON 파일 경로
        file: PathBuf,

        /// 업서트 배치 크기
        #[arg(short, long, default_value = "100")]
        batch_size: usize,
    },

    /// 오류 메시지 카탈로그 출력 (지정 언어로 번역)
    Messages {
        /// 언어 코드 (ISO 639-1)
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// 메시지 키 (예: pinecone_query_error)
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// 저장된 세션 목록 / 삭제
    Sessions {
        /// 삭제할 세션 이름
        #[arg(short, long)]
        delete: Option<String>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat {
            session,
            today_filter,
        } => cmd_chat(session, today_filter).await,
        Commands::Ask {
            question,
            history,
            today_filter,
        } => cmd_ask(&question, history.as_deref(), today_filter).await,
        Commands::Load { file, batch_size } => cmd_load(&file, batch_size).await,
        Commands::Messages { lang, kind } => cmd_messages(&lang, kind.as_deref()).await,
        Commands::Sessions { delete } => cmd_sessions(delete.as_deref()),
        Commands::Status => cmd_status().await,
    }
}

// ============================================================================
// Setup
// ============================================================================

/// 설정 로드 (API 키가 없으면 안내 메시지와 함께 실패)
fn load_config() -> Result<AppConfig> {
    AppConfig::from_env().context(
        "API 키가 설정되지 않았습니다.\n\
         설정: export GEMINI_API_KEY_01=your-key (최대 GEMINI_API_KEY_05)",
    )
}

/// 대화 처리기 구성
async fn build_orchestrator(config: &AppConfig, today_filter: bool) -> Result<DialogueOrchestrator> {
    let client = Arc::new(GeminiClient::new(config).context("Gemini 클라이언트 생성 실패")?);

    let store = LanceVectorStore::open(&config.lance_path(), &config.table_name)
        .await
        .context("벡터 인덱스 열기 실패")?;

    let retriever = VectorRetriever::new(client.clone(), Arc::new(store))
        .with_today_filter(today_filter || config.rag.today_filter);

    let cache = Arc::new(TranslationCache::new(config.rag.translation_cache_capacity));

    Ok(DialogueOrchestrator::new(
        client,
        Arc::new(retriever),
        cache,
        &config.rag,
    ))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 채팅 명령어 (chat)
///
/// 매 턴 세션 기록 전체를 넘겨 답변을 받고, 사용자/어시스턴트 턴을 그대로 저장합니다.
async fn cmd_chat(session: Option<String>, today_filter: bool) -> Result<()> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config, today_filter).await?;
    let sessions = SessionStore::open(&config.sessions_path()).context("세션 저장소 열기 실패")?;

    let session = session.unwrap_or_else(new_session_name);
    let existing = sessions.history(&session)?.len();

    println!("[*] 세션: {} (기존 턴 {}개)", session, existing);
    println!("    종료: exit 또는 Ctrl+D");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        let history = sessions.history(&session)?;
        let answer = orchestrator.respond(message, &history).await;

        sessions.append(&session, &Turn::user(message))?;
        sessions.append(&session, &Turn::assistant(answer.clone()))?;

        println!("\n{}\n", display_answer(&answer));
    }

    println!("[OK] 세션 저장됨: {}", session);
    Ok(())
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(question: &str, history_file: Option<&Path>, today_filter: bool) -> Result<()> {
    let history = match history_file {
        Some(path) => read_history_file(path)?,
        None => Vec::new(),
    };

    let config = load_config()?;
    let orchestrator = build_orchestrator(&config, today_filter).await?;

    let answer = orchestrator.respond(question, &history).await;
    println!("{}", answer);

    Ok(())
}

/// 적재 명령어 (load)
async fn cmd_load(file: &Path, batch_size: usize) -> Result<()> {
    let config = load_config()?;
    let chunks = load_chunk_file(file)?;

    if chunks.is_empty() {
        println!("[!] 적재할 청크가 없습니다.");
        return Ok(());
    }

    println!("[*] 청크 {}개 적재 중: {}", chunks.len(), file.display());

    let client = Arc::new(GeminiClient::new(&config).context("Gemini 클라이언트 생성 실패")?);
    let store = LanceVectorStore::open(&config.lance_path(), &config.table_name)
        .await
        .context("벡터 인덱스 열기 실패")?;

    let loader = ChunkLoader::new(client, Arc::new(store)).with_batch_size(batch_size);
    let stats = loader.ingest(&chunks).await.context("청크 적재 실패")?;

    println!(
        "[OK] 완료: 저장 {}, 건너뜀 {}, 실패 배치 {}",
        stats.upserted, stats.skipped, stats.failed_batches
    );

    Ok(())
}

/// 메시지 명령어 (messages)
async fn cmd_messages(lang: &str, kind: Option<&str>) -> Result<()> {
    let kinds: Vec<ErrorKind> = match kind {
        Some(key) => vec![ErrorKind::from_key(key)],
        None => ErrorKind::ALL.to_vec(),
    };

    let lang = lang.trim().to_lowercase();

    // 영어는 번역이 필요 없으므로 API 키 없이 출력
    if lang == "en" {
        for kind in kinds {
            println!("{:<34} {}", kind.key(), kind);
        }
        return Ok(());
    }

    let config = load_config()?;
    let client = Arc::new(GeminiClient::new(&config).context("Gemini 클라이언트 생성 실패")?);
    let catalog = ErrorCatalog::new(
        client,
        Arc::new(TranslationCache::new(config.rag.translation_cache_capacity)),
    );

    for kind in kinds {
        println!("{:<34} {}", kind.key(), catalog.localize(&lang, kind).await);
    }

    Ok(())
}

/// 세션 명령어 (sessions)
fn cmd_sessions(delete: Option<&str>) -> Result<()> {
    let store = SessionStore::open(&get_data_dir().join("sessions.db"))
        .context("세션 저장소 열기 실패")?;

    if let Some(name) = delete {
        let removed = store.delete_session(name).context("세션 삭제 실패")?;
        if removed > 0 {
            println!("[OK] 세션 '{}' 삭제됨 ({} 턴)", name, removed);
        } else {
            println!("[!] 세션 '{}'을(를) 찾을 수 없습니다", name);
        }
        return Ok(());
    }

    let sessions = store.list_sessions().context("세션 목록 조회 실패")?;
    if sessions.is_empty() {
        println!("[!] 저장된 세션이 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 세션 ({} 건):\n", sessions.len());
    for session in sessions {
        println!(
            "  {:<24} {:>4} 턴 | {}",
            session.name,
            session.turn_count,
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status() -> Result<()> {
    println!("apec-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let data_dir = get_data_dir();
    println!("[*] 데이터 디렉토리: {}", data_dir.display());

    let keys = load_api_keys();
    if keys.is_empty() {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY_01=your-key");
    } else {
        println!("[OK] API 키: {}개", keys.len());
    }

    match SessionStore::open(&data_dir.join("sessions.db")).and_then(|s| s.stats()) {
        Ok(stats) => println!(
            "[OK] 세션: {}개 ({} 턴)",
            stats.session_count, stats.turn_count
        ),
        Err(e) => println!("[!] 세션 저장소 열기 실패: {}", e),
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(_) => return Ok(()),
    };

    let lance_path = config.lance_path();
    if !lance_path.exists() {
        println!("[!] 벡터 인덱스 없음 (apec-rag load 로 적재)");
        return Ok(());
    }

    match LanceVectorStore::open(&lance_path, &config.table_name).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("[OK] 벡터 인덱스: {} 청크 ({})", count, config.table_name),
            Err(e) => tracing::debug!("벡터 통계 조회 실패: {}", e),
        },
        Err(e) => tracing::debug!("벡터 인덱스 열기 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 화면 표시용 답변 (확인 대기 마커 제거)
fn display_answer(answer: &str) -> String {
    strip_marker(answer)
}

/// 새 세션 이름
fn new_session_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("session-{}", &id[..8])
}

/// 기록 파일 읽기 (형식이 맞지 않는 항목은 경고 후 무시)
fn read_history_file(path: &Path) -> Result<Vec<Turn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {:?}", path))?;

    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse history file: {:?}", path))?;

    let Value::Array(items) = value else {
        bail!("History file must contain a JSON array: {:?}", path);
    };

    Ok(parse_history(&items))
}

// ============================================================================
// Tests
// ============================================================================

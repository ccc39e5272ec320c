use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::RagError;
use crate::config::{Config, IndexBackend};
use crate::document::{self, Document};
use crate::embeddings::OllamaClient;
use crate::generation;
use crate::index::{LanceIndex, MemoryIndex, VectorIndex};
use crate::qa::{AnswerResult, QueryLog, Role, Session};

/// Where `ingest` reads the document from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
}

/// Build a session from the configured collaborators
#[inline]
pub fn build_session(config: &Config) -> Result<Session> {
    let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let generator = generation::from_config(config).context("Failed to create answer generator")?;

    Ok(Session::new(
        Box::new(embedder),
        generator,
        config.qa.clone(),
        config.generator.max_tokens,
    )
    .with_query_log(QueryLog::new(config.query_log_path())))
}

/// An empty index for the configured backend, ready to be filled by a build
#[inline]
pub async fn fresh_index(config: &Config) -> Result<Box<dyn VectorIndex>> {
    let index: Box<dyn VectorIndex> = match config.index.backend {
        IndexBackend::Memory => Box::new(MemoryIndex::new(config.index.similarity)),
        IndexBackend::LanceDb => Box::new(
            LanceIndex::temporary_in(config.get_base_dir())
                .await
                .context("Failed to create LanceDB staging index")?,
        ),
    };
    Ok(index)
}

/// The index written by the last successful `ingest`, if any
#[inline]
pub async fn open_persisted_index(config: &Config) -> Result<Option<Box<dyn VectorIndex>>> {
    let path = config.index_path();
    if !path.exists() {
        return Ok(None);
    }

    let index: Box<dyn VectorIndex> = match config.index.backend {
        IndexBackend::Memory => Box::new(MemoryIndex::load(&path)?),
        IndexBackend::LanceDb => Box::new(LanceIndex::open(&path).await?),
    };
    Ok(Some(index))
}

fn load_document(source: &DocumentSource, config: &Config) -> Result<Document> {
    match source {
        DocumentSource::Path(path) => document::load_path(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        DocumentSource::Url(url) => document::web::load_url_with_timeout(
            url,
            Duration::from_secs(config.ollama.timeout_secs),
        )
        .with_context(|| format!("Failed to fetch {}", url)),
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Load, chunk and embed a document into `session`, then persist the new index
async fn process_document(
    session: &mut Session,
    config: &Config,
    source: &DocumentSource,
) -> Result<()> {
    let bar = spinner("Extracting text".to_string());
    let document = match load_document(source, config) {
        Ok(document) => document,
        Err(e) => {
            bar.finish_and_clear();
            return Err(e);
        }
    };

    bar.set_message(format!(
        "Indexing {} ({} pages)",
        document.source_id,
        document.page_count()
    ));
    let built = async {
        let index = fresh_index(config).await?;
        let summary = session
            .build_index(&document, &config.chunking, index)
            .await
            .context("Failed to build index")?;
        if let Some(index) = session.index() {
            index
                .persist(&config.index_path())
                .await
                .context("Failed to save index")?;
        }
        Ok::<_, anyhow::Error>(summary)
    }
    .await;
    bar.finish_and_clear();
    let summary = built?;

    if summary.chunks == 0 {
        eprintln!(
            "{}",
            style(format!(
                "⚠ No extractable text in {}. Scanned PDFs need OCR first.",
                summary.source_id
            ))
            .yellow()
        );
    } else {
        eprintln!(
            "{} {} ({} pages, {} chunks)",
            style("✓ Processed").green(),
            style(&summary.source_id).cyan(),
            summary.pages,
            summary.chunks
        );
    }
    info!("Index saved to {}", config.index_path().display());
    Ok(())
}

/// Process a document and save its index for later questions
#[inline]
pub async fn ingest(source: DocumentSource) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let mut session = build_session(&config)?;
    process_document(&mut session, &config, &source).await
}

async fn session_with_persisted_index(config: &Config) -> Result<Session> {
    let mut session = build_session(config)?;
    match open_persisted_index(config).await? {
        Some(index) => session.attach_index(index, None),
        None => warn!("No saved index at {}", config.index_path().display()),
    }
    Ok(session)
}

/// Answer one question against the saved index
#[inline]
pub async fn ask(question: &str) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let mut session = session_with_persisted_index(&config).await?;

    match session.answer(question).await {
        Ok(result) => {
            print_answer(&result);
            Ok(())
        }
        Err(RagError::NotReady) => Err(anyhow::anyhow!(
            "No document has been processed yet. Run `pdf-rag ingest <file>` first."
        )),
        Err(e) => Err(e.into()),
    }
}

/// Interactive question loop
///
/// Lines starting with `/` are commands: `/load <file>`, `/history`, `/quit`.
#[inline]
pub async fn chat(pdf: Option<PathBuf>) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let mut session = match &pdf {
        Some(path) => {
            let mut session = build_session(&config)?;
            process_document(&mut session, &config, &DocumentSource::Path(path.clone())).await?;
            session
        }
        None => session_with_persisted_index(&config).await?,
    };

    eprintln!("{}", style("💬 Ask questions about your document").bold().cyan());
    eprintln!("{}", style("Commands: /load <file>, /history, /quit").dim());
    if session.index().is_none() {
        eprintln!(
            "{}",
            style("No document loaded yet. Use /load <file> to process one.").yellow()
        );
    }

    loop {
        let line: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();

        match parse_chat_line(line) {
            ChatLine::Empty => {}
            ChatLine::Quit => break,
            ChatLine::History => print_history(&session),
            ChatLine::Load(path) => {
                let source = DocumentSource::Path(PathBuf::from(path));
                if let Err(e) = process_document(&mut session, &config, &source).await {
                    eprintln!("{} {:#}", style("✗").red(), e);
                }
            }
            ChatLine::Question(question) => match session.answer(question).await {
                Ok(result) => print_answer(&result),
                Err(RagError::NotReady) => eprintln!(
                    "{}",
                    style("Please load a document first with /load <file>").yellow()
                ),
                Err(RagError::InvalidQuery(message)) => {
                    eprintln!("{}", style(message).yellow());
                }
                Err(e) => eprintln!("{} {}", style("✗").red(), e),
            },
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ChatLine<'a> {
    Empty,
    Quit,
    History,
    Load(&'a str),
    Question(&'a str),
}

fn parse_chat_line(line: &str) -> ChatLine<'_> {
    match line {
        "" => ChatLine::Empty,
        "/quit" | "/exit" => ChatLine::Quit,
        "/history" => ChatLine::History,
        _ => match line.strip_prefix("/load") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                ChatLine::Load(rest.trim())
            }
            _ => ChatLine::Question(line),
        },
    }
}

fn print_answer(result: &AnswerResult) {
    println!();
    println!("{}", result.answer);
    println!();
    if result.chunks_used > 0 {
        println!(
            "{}",
            style(format!("📊 Based on {} chunks", result.chunks_used)).dim()
        );
    }
    for citation in &result.citations {
        println!(
            "  {} {}",
            style(citation.label()).cyan(),
            style(format!("(score {:.3})", citation.score)).dim()
        );
        println!("    {}", style(citation.preview.replace('\n', " ")).dim());
    }
}

fn print_history(session: &Session) {
    let turns = session.recent_turns();
    if turns.is_empty() {
        println!("{}", style("No conversation yet.").dim());
        return;
    }
    for turn in turns {
        let speaker = match turn.role {
            Role::User => style("You").bold().green(),
            Role::Assistant => style("Assistant").bold().blue(),
        };
        println!("{}: {}", speaker, turn.content);
    }
}

fn count_lines(path: &Path) -> Option<usize> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| content.lines().count())
}

/// Report configuration, collaborator health and the saved index
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default().unwrap_or_default();

    println!("📊 PDF RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Embedding Provider:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => println!("   ⚠️  Ollama: Unhealthy - {:#}", e),
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {}", e),
    }
    println!();

    println!("💡 Answer Generator:");
    println!("   Backend: {}", config.generator.backend.as_str());
    println!("   Model: {}", config.generator.model);
    println!("   Max Tokens: {}", config.generator.max_tokens);
    println!();

    println!("🔍 Index:");
    let index_path = config.index_path();
    println!("   Path: {}", index_path.display());
    match open_persisted_index(&config).await {
        Ok(Some(index)) => match index.len().await {
            Ok(0) => println!("   ⚠️  Index is empty (no extractable text)"),
            Ok(count) => println!("   ✅ {} chunks indexed", count),
            Err(e) => println!("   ❌ Failed to read index - {}", e),
        },
        Ok(None) => println!("   No document processed yet"),
        Err(e) => println!("   ❌ Failed to open index - {:#}", e),
    }
    println!();

    println!("📝 Query Log:");
    let log_path = config.query_log_path();
    match count_lines(&log_path) {
        Some(count) => println!("   {} questions logged in {}", count, log_path.display()),
        None => println!("   No questions logged yet"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;
    use crate::index::IndexEntry;
    use tempfile::TempDir;

    fn config_in(dir: &Path, backend: IndexBackend) -> Config {
        let mut config = Config {
            base_dir: dir.to_path_buf(),
            ..Config::default()
        };
        config.index.backend = backend;
        config
    }

    #[test]
    fn chat_line_parsing() {
        assert_eq!(parse_chat_line(""), ChatLine::Empty);
        assert_eq!(parse_chat_line("/quit"), ChatLine::Quit);
        assert_eq!(parse_chat_line("/exit"), ChatLine::Quit);
        assert_eq!(parse_chat_line("/history"), ChatLine::History);
        assert_eq!(
            parse_chat_line("/load notes/week 3.pdf"),
            ChatLine::Load("notes/week 3.pdf")
        );
        assert_eq!(
            parse_chat_line("/loader is not a command"),
            ChatLine::Question("/loader is not a command")
        );
        assert_eq!(
            parse_chat_line("What is covered?"),
            ChatLine::Question("What is covered?")
        );
    }

    #[test]
    fn session_builds_from_default_config() {
        let temp_dir = TempDir::new().expect("temp dir");
        let session = build_session(&config_in(temp_dir.path(), IndexBackend::Memory))
            .expect("session");

        assert!(session.index().is_none());
        assert_eq!(session.config().top_k, 3);
    }

    #[tokio::test]
    async fn missing_index_is_none() {
        let temp_dir = TempDir::new().expect("temp dir");

        for backend in [IndexBackend::Memory, IndexBackend::LanceDb] {
            let config = config_in(temp_dir.path(), backend);
            assert!(open_persisted_index(&config).await.expect("open").is_none());
        }
    }

    #[tokio::test]
    async fn fresh_memory_index_persists_where_status_looks() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = config_in(temp_dir.path(), IndexBackend::Memory);

        let mut index = fresh_index(&config).await.expect("fresh index");
        index
            .add(vec![IndexEntry::new(
                Chunk {
                    text: "hello".to_string(),
                    source_id: "a.pdf".to_string(),
                    page_number: Some(1),
                    last_page_number: Some(1),
                    offset: 0,
                },
                vec![1.0, 0.0],
            )])
            .await
            .expect("add");
        index.persist(&config.index_path()).await.expect("persist");

        let reopened = open_persisted_index(&config)
            .await
            .expect("open")
            .expect("index exists");
        assert_eq!(reopened.len().await.expect("len"), 1);
    }

    #[test]
    fn count_lines_of_missing_file_is_none() {
        let temp_dir = TempDir::new().expect("temp dir");
        assert_eq!(count_lines(&temp_dir.path().join("queries.log")), None);

        let path = temp_dir.path().join("queries.log");
        std::fs::write(&path, "a\tb\nc\td\n").expect("write");
        assert_eq!(count_lines(&path), Some(2));
    }
}

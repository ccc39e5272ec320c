use clap::{Parser, Subcommand};
use pdf_rag::Result;
use pdf_rag::commands::{DocumentSource, ask, chat, ingest, show_status};
use pdf_rag::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Ask questions about a PDF using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding model, answer generator and chunking
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Extract, chunk and embed a document, replacing the saved index
    Ingest {
        /// PDF or plain-text file to process
        #[arg(required_unless_present = "url", conflicts_with = "url")]
        path: Option<PathBuf>,
        /// Fetch a single web page instead of reading a file
        #[arg(long)]
        url: Option<String>,
    },
    /// Answer one question about the processed document
    Ask {
        /// The question to answer
        question: String,
    },
    /// Start an interactive question session
    Chat {
        /// Process this PDF before the first question
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Show the state of the providers and the saved index
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { path, url } => {
            let source = match (path, url) {
                (_, Some(url)) => DocumentSource::Url(url),
                (Some(path), None) => DocumentSource::Path(path),
                (None, None) => {
                    return Err(pdf_rag::RagError::Config(
                        "ingest needs a file path or --url".to_string(),
                    ));
                }
            };
            ingest(source).await?;
        }
        Commands::Ask { question } => {
            ask(&question).await?;
        }
        Commands::Chat { pdf } => {
            chat(pdf).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["pdf-rag", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
        }
    }

    #[test]
    fn ingest_command_with_path() {
        let cli = Cli::try_parse_from(["pdf-rag", "ingest", "notes.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { path, url } = parsed.command {
                assert_eq!(path, Some(PathBuf::from("notes.pdf")));
                assert_eq!(url, None);
            }
        }
    }

    #[test]
    fn ingest_command_with_url() {
        let cli = Cli::try_parse_from(["pdf-rag", "ingest", "--url", "https://example.com/paper"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { path, url } = parsed.command {
                assert_eq!(path, None);
                assert_eq!(url, Some("https://example.com/paper".to_string()));
            }
        }
    }

    #[test]
    fn ingest_requires_a_source() {
        let cli = Cli::try_parse_from(["pdf-rag", "ingest"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["pdf-rag", "ingest", "a.pdf", "--url", "https://x.y"]);
        assert!(cli.is_err());
    }

    #[test]
    fn ask_command() {
        let cli = Cli::try_parse_from(["pdf-rag", "ask", "What are the key findings?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What are the key findings?");
            }
        }
    }

    #[test]
    fn chat_command_with_pdf() {
        let cli = Cli::try_parse_from(["pdf-rag", "chat", "--pdf", "lecture.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chat { pdf } = parsed.command {
                assert_eq!(pdf, Some(PathBuf::from("lecture.pdf")));
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["pdf-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["pdf-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["pdf-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}

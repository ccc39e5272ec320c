
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{Config, ConfigError, GeneratorBackend, GeneratorConfig, OllamaConfig};
use crate::chunking::ChunkingConfig;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 PDF RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed document chunks.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Answer Generator").bold().yellow());
    eprintln!("Choose the language model that answers questions.");
    eprintln!();

    configure_generator(&mut config.generator)?;

    eprintln!();
    eprintln!("{}", style("Chunking").bold().yellow());
    eprintln!();

    configure_chunking(&mut config.chunking)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama)? {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before processing a PDF.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Embedding Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Generator Settings:").bold().yellow());
    eprintln!(
        "  Backend: {}",
        style(config.generator.backend.as_str()).cyan()
    );
    eprintln!("  Model: {}", style(&config.generator.model).cyan());
    eprintln!("  Max Tokens: {}", style(config.generator.max_tokens).cyan());
    if config.generator.backend == GeneratorBackend::OpenAi {
        match config.openai_url() {
            Ok(url) => eprintln!("  API URL: {}", style(url).cyan()),
            Err(e) => eprintln!("  API URL: {} ({})", style("Invalid").red(), e),
        }
        let key_state = if config.generator.api_key.is_some() {
            "set"
        } else {
            "not set"
        };
        eprintln!("  API Key: {}", style(key_state).cyan());
    }

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!(
        "  Chunk Size / Overlap: {} / {}",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.qa.top_k).cyan());
    eprintln!(
        "  Context: {} chunks x {} chars",
        style(config.qa.max_context_chunks).cyan(),
        style(config.qa.max_chars_per_chunk).cyan()
    );
    eprintln!(
        "  Max Answer Length: {}",
        style(config.qa.max_answer_chars).cyan()
    );

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());
    eprintln!("Index: {}", style(config.index_path().display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let dir = Config::config_dir()?;
    let existed = dir.join("config.toml").exists();
    Config::load(&dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("Existing configuration is invalid. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: dir.clone(),
                ..Config::default()
            })
        },
        |config| {
            if existed {
                eprintln!("{}", style("Found existing configuration.").green());
            } else {
                eprintln!(
                    "{}",
                    style("No existing configuration found. Using defaults.").yellow()
                );
            }
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_generator(generator: &mut GeneratorConfig) -> Result<()> {
    let backends: Vec<&str> = GeneratorBackend::ALL.iter().map(|b| b.as_str()).collect();
    let default_index = GeneratorBackend::ALL
        .iter()
        .position(|&b| b == generator.backend)
        .unwrap_or(0);

    let backend_index = Select::new()
        .with_prompt("Generator backend")
        .default(default_index)
        .items(&backends)
        .interact()?;
    generator.set_backend(GeneratorBackend::ALL[backend_index]);

    let model: String = Input::new()
        .with_prompt("Generator model")
        .default(generator.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    generator.set_model(model)?;

    let max_tokens: u32 = Input::new()
        .with_prompt("Maximum answer tokens")
        .default(generator.max_tokens)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=8192).contains(input) {
                Ok(())
            } else {
                Err("Max tokens must be between 1 and 8192")
            }
        })
        .interact_text()?;
    generator.set_max_tokens(max_tokens)?;

    if generator.backend == GeneratorBackend::OpenAi {
        let current = generator
            .openai_url()
            .map(|url| url.to_string())
            .unwrap_or_default();
        let base_url: String = Input::new()
            .with_prompt("OpenAI-compatible API base URL")
            .default(current)
            .validate_with(|input: &String| -> Result<(), ConfigError> {
                let temp_config = GeneratorConfig {
                    base_url: Some(input.clone()),
                    ..GeneratorConfig::default()
                };
                temp_config.openai_url()?;
                Ok(())
            })
            .interact_text()?;
        generator.set_base_url(Some(base_url))?;

        let api_key = Password::new()
            .with_prompt("API key (leave empty to keep the current one)")
            .allow_empty_password(true)
            .interact()?;
        if !api_key.trim().is_empty() {
            generator.api_key = Some(api_key.trim().to_string());
        }
    }

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100_000).contains(input) {
                Ok(())
            } else {
                Err("Chunk size must be between 1 and 100000")
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(chunking.chunk_overlap.min(chunk_size.saturating_sub(1)))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input < chunk_size {
                Ok(())
            } else {
                Err("Overlap must be smaller than the chunk size")
            }
        })
        .interact_text()?;

    chunking.chunk_size = chunk_size;
    chunking.chunk_overlap = chunk_overlap;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}

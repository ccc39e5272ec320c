// Configuration management module
// TOML settings for the embedding server, the answer generator, chunking and retrieval

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, GeneratorBackend, GeneratorConfig, IndexBackend, IndexConfig,
    OllamaConfig,
};

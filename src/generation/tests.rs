use super::*;

#[test]
fn prompt_layout_places_context_before_question() {
    let prompt = Prompt::new("Rust was first released in 2015.", "When was Rust released?");

    assert_eq!(prompt.system, SYSTEM_INSTRUCTION);
    assert_eq!(
        prompt.render(),
        "Context from PDF:\nRust was first released in 2015.\n\nQuestion: When was Rust released?\n\nAnswer briefly using only the context above:"
    );
}

#[test]
fn system_instruction_allows_not_knowing() {
    assert!(SYSTEM_INSTRUCTION.contains("say you don't know"));
}

#[test]
fn factory_honours_backend() {
    let mut config = Config::default();
    config.generator.model = "llama3.2:latest".to_string();
    let generator = from_config(&config).expect("ollama generator");
    assert_eq!(generator.model(), "llama3.2:latest");

    config.generator.backend = GeneratorBackend::OpenAi;
    config.generator.model = "gpt-4o-mini".to_string();
    let generator = from_config(&config).expect("openai generator");
    assert_eq!(generator.model(), "gpt-4o-mini");

    config.generator.base_url = Some("not a url".to_string());
    assert!(matches!(from_config(&config), Err(crate::RagError::Config(_))));
}


use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::Document;
use crate::embeddings::ollama::{build_agent_with_user_agent, describe_http_error};
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const USER_AGENT: &str = "pdf-rag/0.0.1 (Document Loader)";

/// Fetch a single web page and turn its main content into a one-page document
#[inline]
pub fn load_url(url: &str) -> Result<Document> {
    load_url_with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
}

#[inline]
pub fn load_url_with_timeout(url: &str, timeout: Duration) -> Result<Document> {
    let parsed = Url::parse(url).map_err(|e| RagError::Network(format!("Invalid URL {}: {}", url, e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(RagError::Network(format!(
            "Unsupported URL scheme '{}' (must be http or https)",
            parsed.scheme()
        )));
    }

    let agent = build_agent_with_user_agent(timeout, USER_AGENT);

    debug!("Fetching {}", parsed);

    let html = agent
        .get(parsed.as_str())
        .call()
        .and_then(|mut response| response.body_mut().read_to_string())
        .map_err(|e| {
            RagError::Network(format!(
                "Failed to fetch {}: {}",
                parsed,
                describe_http_error(&e)
            ))
        })?;

    let text = extract_text(&html);
    info!("Loaded {} ({} characters)", parsed, text.chars().count());

    Ok(Document::from_text(parsed.as_str(), text))
}

/// Extract readable text from HTML, keeping paragraph breaks as blank lines
#[inline]
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let main_content = find_main_content(&document);

    let mut content = String::new();
    extract_text_recursive(main_content, &mut content);
    clean_text(&content)
}

/// Find the main content area of the document
fn find_main_content(document: &Html) -> ElementRef<'_> {
    let main_selectors = [
        "main",
        "[role=\"main\"]",
        "article",
        "#content",
        ".content",
        "body",
    ];

    for selector_str in &main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                debug!("Found main content using selector: {}", selector_str);
                return element;
            }
        }
    }

    document.root_element()
}

fn extract_text_recursive(element: ElementRef, content: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            match child_element.value().name() {
                "script" | "style" | "noscript" | "nav" | "header" | "footer" | "aside"
                | "button" | "form" | "template" => {}

                "br" => content.push('\n'),

                "li" => {
                    content.push_str("\n- ");
                    extract_text_recursive(child_element, content);
                    content.push('\n');
                }

                "p" | "div" | "section" | "article" | "blockquote" | "pre" | "table" | "tr"
                | "ul" | "ol" | "dl" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    content.push_str("\n\n");
                    extract_text_recursive(child_element, content);
                    content.push_str("\n\n");
                }

                _ => extract_text_recursive(child_element, content),
            }
        } else if let Some(text_node) = child.value().as_text() {
            // Line breaks in markup are layout, not content
            content.extend(
                text_node
                    .chars()
                    .map(|c| if c.is_whitespace() { ' ' } else { c }),
            );
        }
    }
}

/// Collapse runs of whitespace inside lines and keep at most one blank line between blocks
fn clean_text(text: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs.join("\n\n")
}

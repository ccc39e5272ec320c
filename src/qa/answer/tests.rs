use super::*;
use crate::chunking::Chunk;

fn hit(text: &str, page: Option<u32>, score: f32) -> ScoredChunk {
    ScoredChunk {
        chunk: Chunk {
            text: text.to_string(),
            source_id: "notes.pdf".to_string(),
            page_number: page,
            last_page_number: page,
            offset: 0,
        },
        score,
        ordinal: 0,
    }
}

#[test]
fn long_answer_is_cut_with_marker() {
    let raw = "a".repeat(1000);

    let (answer, truncated) = truncate_answer(&raw, 800);

    assert!(truncated);
    assert_eq!(answer, format!("{}{}", "a".repeat(800), TRUNCATION_MARKER));
    assert_eq!(answer.chars().count(), 800 + TRUNCATION_MARKER.chars().count());
}

#[test]
fn answer_at_limit_is_untouched() {
    let raw = "b".repeat(800);

    let (answer, truncated) = truncate_answer(&raw, 800);

    assert!(!truncated);
    assert_eq!(answer, raw);
}

#[test]
fn surrounding_whitespace_is_trimmed_before_counting() {
    let (answer, truncated) = truncate_answer("  \n Two years. \n", 10);

    assert!(!truncated);
    assert_eq!(answer, "Two years.");
}

#[test]
fn truncation_counts_characters_not_bytes() {
    let (answer, truncated) = truncate_answer(&"é".repeat(5), 3);

    assert!(truncated);
    assert_eq!(answer, format!("ééé{}", TRUNCATION_MARKER));
}

#[test]
fn citations_follow_context_order_and_limits() {
    let config = QaConfig {
        max_citations: 2,
        citation_preview_chars: 10,
        ..QaConfig::default()
    };
    let chunks = vec![
        hit("The first relevant passage.", Some(4), 0.9),
        hit("Second.", None, 0.8),
        hit("Third passage.", Some(1), 0.7),
    ];

    let result = post_process("Answer.", &chunks, &config);

    assert_eq!(result.answer, "Answer.");
    assert_eq!(result.chunks_used, 3);
    assert_eq!(result.citations.len(), 2);
    assert_eq!(result.citations[0].preview, "The first ");
    assert_eq!(result.citations[0].label(), "notes.pdf p. 4");
    assert_eq!(result.citations[1].preview, "Second.");
    assert_eq!(result.citations[1].label(), "notes.pdf");
}

#[test]
fn spanning_citation_label_shows_range() {
    let citation = Citation {
        source_id: "paper.pdf".to_string(),
        page_number: Some(2),
        last_page_number: Some(3),
        score: 0.5,
        preview: String::new(),
    };

    assert_eq!(citation.label(), "paper.pdf pp. 2-3");
}

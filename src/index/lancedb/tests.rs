use super::*;
use tempfile::TempDir;

fn entry(text: &str, page: Option<u32>, embedding: Vec<f32>) -> IndexEntry {
    IndexEntry::new(
        Chunk {
            text: text.to_string(),
            source_id: "manual.pdf".to_string(),
            page_number: page,
            last_page_number: page,
            offset: 0,
        },
        embedding,
    )
}

fn sample_entries() -> Vec<IndexEntry> {
    vec![
        entry("installation steps", Some(1), vec![1.0, 0.0, 0.0, 0.0, 0.0]),
        entry("configuration options", Some(2), vec![0.0, 1.0, 0.0, 0.0, 0.0]),
        entry("troubleshooting", None, vec![0.7, 0.7, 0.0, 0.0, 0.0]),
    ]
}

#[tokio::test]
async fn new_index_is_empty_and_queries_return_nothing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = LanceIndex::create(&temp_dir.path().join("vectors"))
        .await
        .expect("should create index");

    assert_eq!(index.len().await.expect("len"), 0);
    assert!(index.vector_dimension().is_none());
    assert!(
        index
            .query(&[1.0, 0.0, 0.0, 0.0, 0.0], 3)
            .await
            .expect("query")
            .is_empty()
    );
}

#[tokio::test]
async fn stores_and_ranks_entries_by_cosine_similarity() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut index = LanceIndex::create(&temp_dir.path().join("vectors"))
        .await
        .expect("should create index");

    index.add(sample_entries()).await.expect("add");
    assert_eq!(index.len().await.expect("len"), 3);
    assert_eq!(index.vector_dimension(), Some(5));

    let result = index
        .query(&[1.0, 0.1, 0.0, 0.0, 0.0], 2)
        .await
        .expect("query");

    assert_eq!(result.len(), 2);
    assert_eq!(result.hits()[0].chunk.text, "installation steps");
    assert_eq!(result.hits()[0].chunk.page_number, Some(1));
    assert_eq!(result.hits()[1].chunk.text, "troubleshooting");
    assert_eq!(result.hits()[1].chunk.page_number, None);
    assert!(result.hits()[0].score >= result.hits()[1].score);
    assert!(result.hits()[0].score > 0.9);
}

#[tokio::test]
async fn rejects_dimension_mismatch() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut index = LanceIndex::create(&temp_dir.path().join("vectors"))
        .await
        .expect("should create index");
    index.add(sample_entries()).await.expect("add");

    let err = index
        .add(vec![entry("short", None, vec![1.0, 0.0])])
        .await
        .expect_err("dimension mismatch");
    assert!(matches!(err, RagError::Index(_)));

    let err = index.query(&[1.0], 1).await.expect_err("dimension mismatch");
    assert!(matches!(err, RagError::Index(_)));
    assert_eq!(index.len().await.expect("len"), 3);
}

#[tokio::test]
async fn reopened_index_keeps_entries_and_ordinals() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("vectors");
    {
        let mut index = LanceIndex::create(&path).await.expect("create");
        index.add(sample_entries()).await.expect("add");
    }

    let mut reopened = LanceIndex::open(&path).await.expect("open");
    assert_eq!(reopened.len().await.expect("len"), 3);
    assert_eq!(reopened.vector_dimension(), Some(5));

    reopened
        .add(vec![entry("appendix", Some(9), vec![0.0, 0.0, 1.0, 0.0, 0.0])])
        .await
        .expect("add more");
    let result = reopened
        .query(&[0.0, 0.0, 1.0, 0.0, 0.0], 1)
        .await
        .expect("query");
    assert_eq!(result.hits()[0].chunk.text, "appendix");
    assert_eq!(result.hits()[0].ordinal, 3);
}

#[tokio::test]
async fn ties_beyond_k_keep_insertion_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("vectors");
    {
        let mut index = LanceIndex::create(&path).await.expect("create");
        let batch = |start: usize| {
            (start..start + 25)
                .map(|i| entry(&format!("copy {i}"), Some(1), vec![1.0, 0.0, 0.0]))
                .collect::<Vec<_>>()
        };
        index.add(batch(0)).await.expect("first batch");
        index.add(batch(25)).await.expect("second batch");
    }

    let index = LanceIndex::open(&path).await.expect("open");
    let result = index.query(&[1.0, 0.0, 0.0], 3).await.expect("query");

    let ordinals: Vec<usize> = result.iter().map(|hit| hit.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
    assert_eq!(result.hits()[0].chunk.text, "copy 0");
}

#[tokio::test]
async fn open_missing_directory_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let err = LanceIndex::open(&temp_dir.path().join("nothing-here"))
        .await
        .expect_err("missing index");
    assert!(matches!(err, RagError::Index(_)));
}

#[tokio::test]
async fn temporary_index_persists_to_target_and_cleans_up() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let target = temp_dir.path().join("vectors");

    let mut staged = LanceIndex::temporary_in(temp_dir.path())
        .await
        .expect("staging index");
    let staging_path = staged.path().to_path_buf();
    staged.add(sample_entries()).await.expect("add");
    staged.persist(&target).await.expect("persist");
    drop(staged);

    assert!(!staging_path.exists(), "staging directory removed on drop");
    let reopened = LanceIndex::open(&target).await.expect("open persisted");
    assert_eq!(reopened.len().await.expect("len"), 3);

    let leftovers: Vec<String> = std::fs::read_dir(temp_dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, vec!["vectors".to_string()]);
}

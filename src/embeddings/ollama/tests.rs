use super::*;
use crate::config::OllamaConfig;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn config_for(server: &MockServer, batch_size: u32) -> OllamaConfig {
    let address = server.address();
    OllamaConfig {
        host: address.ip().to_string(),
        port: address.port(),
        model: "all-minilm:latest".to_string(),
        batch_size,
        ..OllamaConfig::default()
    }
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("chunk {i}")).collect()
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
}

#[tokio::test]
async fn embeds_in_batches_preserving_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["chunk 0", "chunk 1"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["chunk 2"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 2)).expect("client");
    let vectors = client.embed(&texts(3)).await.expect("embeddings");

    assert_eq!(
        vectors,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]
    );
}

#[tokio::test]
async fn empty_input_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 8)).expect("client");
    let vectors = client.embed(&[]).await.expect("no work");

    assert!(vectors.is_empty());
}

#[tokio::test]
async fn server_error_is_a_provider_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 8)).expect("client");
    let err = client.embed(&texts(2)).await.expect_err("should fail");

    match err {
        RagError::Provider(message) => assert!(message.contains("503"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 2.0]]})),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 8)).expect("client");
    let err = client.embed(&texts(2)).await.expect_err("should fail");

    assert!(matches!(err, RagError::Provider(ref m) if m.contains("Mismatch")));
}

#[tokio::test]
async fn embed_one_returns_single_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2, 0.3]]})),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 8)).expect("client");
    let vector = client.embed_one("What is this about?").await.expect("vector");

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn health_check_validates_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "all-minilm:latest", "size": 45_000_000}]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 8)).expect("client");
    client.health_check().expect("model available");

    let missing = OllamaClient::new(&OllamaConfig {
        model: "nomic-embed-text:latest".to_string(),
        ..config_for(&server, 8)
    })
    .expect("client");
    let err = missing.validate_model().expect_err("model missing");
    assert!(err.to_string().contains("nomic-embed-text"));
}

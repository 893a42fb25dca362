//! End-to-end ingestion and question answering against mocked Pinecone and
//! Ollama servers, wired through the same configuration path as the binary.

#![cfg(feature = "ollama")]

use jarvis::JarvisConfig;
use jarvis::types::FALLBACK_ANSWER;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIMS: usize = 3;

fn config_for(pinecone: &MockServer, ollama: &MockServer) -> JarvisConfig {
    let mut config = JarvisConfig::default();
    config
        .apply_overrides(|name| match name {
            "PINECONE_API_KEY" => Some("pk-test".to_string()),
            "OLLAMA_URL" => Some(ollama.uri()),
            "OLLAMA_MODEL" => Some("mistral".to_string()),
            _ => None,
        })
        .unwrap();
    config.vector_store.control_plane_url = pinecone.uri();
    config.embedding.dimensions = DIMS;
    config.validate().unwrap();
    config
}

async fn mock_embeddings(ollama: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "all-minilm" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "all-minilm",
            "embeddings": [[3.0, 0.0, 4.0]]
        })))
        .mount(ollama)
        .await;
}

async fn mock_existing_index(pinecone: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{ "name": "jarvis-knowledge", "host": pinecone.uri() }]
        })))
        .mount(pinecone)
        .await;

    Mock::given(method("GET"))
        .and(path("/indexes/jarvis-knowledge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "jarvis-knowledge",
            "host": pinecone.uri(),
            "status": { "ready": true, "state": "Ready" }
        })))
        .mount(pinecone)
        .await;
}

#[tokio::test]
async fn test_ingest_upserts_normalised_vectors_with_metadata() {
    let pinecone = MockServer::start().await;
    let ollama = MockServer::start().await;
    mock_embeddings(&ollama).await;
    mock_existing_index(&pinecone).await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", "pk-test"))
        .and(body_partial_json(json!({
            "vectors": [{
                "metadata": {
                    "source": "Handbook.pdf",
                    "chunk_id": "0",
                    "text": "Employees get 12 paid leaves per year."
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&pinecone)
        .await;

    let pipeline = config_for(&pinecone, &ollama).build_pipeline().unwrap();
    let report = pipeline
        .ingest_document("Handbook.pdf", "  Employees get 12 paid leaves per year.\n")
        .await
        .unwrap();

    assert_eq!(report.chunks, 1);

    let requests = pinecone.received_requests().await.unwrap();
    let upsert = requests
        .iter()
        .find(|r| r.url.path() == "/vectors/upsert")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&upsert.body).unwrap();
    let values: Vec<f64> = body["vectors"][0]["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(values.len(), DIMS);
    for (got, want) in values.iter().zip([0.6, 0.0, 0.8]) {
        assert!((got - want).abs() < 1e-6, "{:?}", values);
    }
}

#[tokio::test]
async fn test_answer_query_calls_ollama_with_grounded_prompt() {
    let pinecone = MockServer::start().await;
    let ollama = MockServer::start().await;
    mock_embeddings(&ollama).await;
    mock_existing_index(&pinecone).await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "topK": 4, "includeMetadata": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {
                    "id": "a",
                    "score": 0.91,
                    "metadata": {
                        "source": "Handbook.pdf",
                        "chunk_id": "0",
                        "text": "Overtime rate: 1.5x hourly pay for extra hours."
                    }
                },
                { "id": "b", "score": 0.42, "metadata": { "text": "Standard work week is 40 hours." } }
            ],
            "namespace": ""
        })))
        .mount(&pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "mistral", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mistral",
            "created_at": "2024-01-01T00:00:00Z",
            "response": " Overtime is paid at 1.5x. ",
            "done": true
        })))
        .expect(1)
        .mount(&ollama)
        .await;

    let pipeline = config_for(&pinecone, &ollama).build_pipeline().unwrap();
    let response = pipeline.answer_query("What is the overtime rate?").await.unwrap();

    assert_eq!(response.answer, "Overtime is paid at 1.5x.");
    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.sources[0].source, "Handbook.pdf");
    assert_eq!(response.sources[1].source, "unknown");
    assert_eq!(response.sources[1].chunk_id, "NA");

    let requests = ollama.received_requests().await.unwrap();
    let generate = requests
        .iter()
        .find(|r| r.url.path() == "/api/generate")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&generate.body).unwrap();
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("You are an enterprise personal assistant."));
    assert!(prompt.contains("[Source: unknown | Chunk: NA]\nStandard work week is 40 hours."));
}

#[tokio::test]
async fn test_blank_matches_never_reach_ollama() {
    let pinecone = MockServer::start().await;
    let ollama = MockServer::start().await;
    mock_embeddings(&ollama).await;
    mock_existing_index(&pinecone).await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{ "id": "a", "score": 0.3, "metadata": { "text": "   " } }]
        })))
        .mount(&pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ollama)
        .await;

    let pipeline = config_for(&pinecone, &ollama).build_pipeline().unwrap();
    let response = pipeline.answer_query("Anything?").await.unwrap();

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn test_pinecone_outage_surfaces_as_vector_store_error() {
    let pinecone = MockServer::start().await;
    let ollama = MockServer::start().await;
    mock_embeddings(&ollama).await;
    mock_existing_index(&pinecone).await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&pinecone)
        .await;

    let pipeline = config_for(&pinecone, &ollama).build_pipeline().unwrap();
    let err = pipeline.answer_query("Anything?").await.unwrap_err();

    assert!(matches!(err, jarvis::AppError::VectorStore(_)));
}

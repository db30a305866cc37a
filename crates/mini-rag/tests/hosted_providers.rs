//! Hosted provider clients against a local mock of the upstream APIs

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use mini_rag::{
    config::{BackendProvider, EmbeddingConfig, LlmConfig, RerankConfig, VectorDbConfig},
    providers::{
        cohere::CohereReranker, openai::OpenAiEmbedder, openai::OpenAiLlm,
        pinecone::PineconeVectorStore, CompletionRequest, EmbeddingProvider, LlmProvider,
        RerankProvider, SamplingParams, VectorRecord, VectorStoreProvider,
    },
    server::{build_router, state::AppState},
    types::Chunk,
    Credentials, Error, RagConfig,
};

const OPENAI_KEY: &str = "sk-test";
const PINECONE_KEY: &str = "pc-test";
const COHERE_KEY: &str = "co-test";

#[derive(Clone, Default)]
struct Upstream {
    upsert_batches: Arc<Mutex<Vec<Value>>>,
    vectors: Arc<Mutex<Vec<Value>>>,
    queries: Arc<Mutex<Vec<Value>>>,
    embedding_calls: Arc<Mutex<usize>>,
}

fn bearer(headers: &HeaderMap, key: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == format!("Bearer {}", key))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": { "message": "bad key" } }))).into_response()
}

async fn embeddings(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !bearer(&headers, OPENAI_KEY) {
        return unauthorized();
    }
    *upstream.embedding_calls.lock() += 1;
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    // Reverse order so clients must sort by index
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(index, text)| {
            let len = text.as_str().unwrap_or_default().len() as f32;
            json!({ "object": "embedding", "index": index, "embedding": [len, 1.0] })
        })
        .collect();
    Json(json!({ "object": "list", "data": data })).into_response()
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !bearer(&headers, OPENAI_KEY) {
        return unauthorized();
    }
    let content = if body["model"] == "silent-model" {
        Value::Null
    } else {
        json!("Fossil fuels and deforestation drive it [1] [7].")
    };
    Json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
    .into_response()
}

async fn models(headers: HeaderMap) -> StatusCode {
    if bearer(&headers, OPENAI_KEY) || bearer(&headers, COHERE_KEY) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

fn pinecone_key(headers: &HeaderMap) -> bool {
    headers.get("Api-Key").and_then(|v| v.to_str().ok()) == Some(PINECONE_KEY)
}

async fn upsert(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !pinecone_key(&headers) {
        return unauthorized();
    }
    let vectors = body["vectors"].as_array().cloned().unwrap_or_default();
    let count = vectors.len();
    upstream.vectors.lock().extend(vectors);
    upstream.upsert_batches.lock().push(body);
    Json(json!({ "upsertedCount": count })).into_response()
}

async fn query(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !pinecone_key(&headers) {
        return unauthorized();
    }
    let wanted = body["filter"]["request_id"]["$eq"].as_str().map(str::to_string);
    let top_k = body["topK"].as_u64().unwrap_or(10) as usize;
    let matches: Vec<Value> = upstream
        .vectors
        .lock()
        .iter()
        .filter(|v| {
            wanted
                .as_deref()
                .map_or(true, |id| v["metadata"]["request_id"] == id)
        })
        .take(top_k)
        .map(|v| json!({ "id": v["id"], "score": 0.9, "metadata": v["metadata"] }))
        .collect();
    upstream.queries.lock().push(body);
    Json(json!({ "matches": matches, "namespace": "" })).into_response()
}

async fn describe_index_stats(headers: HeaderMap) -> StatusCode {
    if pinecone_key(&headers) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn rerank(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !bearer(&headers, COHERE_KEY) {
        return unauthorized();
    }
    let count = body["documents"].as_array().map_or(0, |d| d.len());
    let top_n = body["top_n"].as_u64().unwrap_or(3) as usize;
    let results: Vec<Value> = (0..count)
        .rev()
        .take(top_n)
        .enumerate()
        .map(|(rank, index)| json!({ "index": index, "relevance_score": 0.9 - rank as f64 * 0.1 }))
        .collect();
    Json(json!({ "id": "rerank-1", "results": results })).into_response()
}

async fn spawn_upstream() -> (String, Upstream) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat))
        .route("/v1/models/:model", get(models))
        .route("/vectors/upsert", post(upsert))
        .route("/query", post(query))
        .route("/describe_index_stats", post(describe_index_stats))
        .route("/v2/rerank", post(rerank))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), upstream)
}

fn embedding_config(base: &str) -> EmbeddingConfig {
    EmbeddingConfig {
        base_url: format!("{}/v1", base),
        dimensions: 2,
        ..Default::default()
    }
}

fn vector_db_config(base: &str) -> VectorDbConfig {
    VectorDbConfig {
        index_host: Some(base.to_string()),
        namespace: Some("tests".to_string()),
        timeout_secs: Some(5),
    }
}

#[tokio::test]
async fn openai_embeddings_keep_input_order() {
    let (base, _) = spawn_upstream().await;
    let embedder = OpenAiEmbedder::new(&embedding_config(&base), OPENAI_KEY).unwrap();

    let vectors = embedder
        .embed_batch(&["a".to_string(), "bbb".to_string(), "cc".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);

    assert_eq!(embedder.embed("four").await.unwrap(), vec![4.0, 1.0]);
    assert!(embedder.health_check().await.unwrap());
}

#[tokio::test]
async fn openai_embeddings_split_large_inputs_across_requests() {
    let (base, upstream) = spawn_upstream().await;
    let config = EmbeddingConfig {
        max_concurrency: 2,
        ..embedding_config(&base)
    };
    let embedder = OpenAiEmbedder::new(&config, OPENAI_KEY).unwrap();

    let texts: Vec<String> = (0..2500).map(|i| "x".repeat(i % 5 + 1)).collect();
    let vectors = embedder.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors.len(), texts.len());
    for (text, vector) in texts.iter().zip(&vectors) {
        assert_eq!(vector[0], text.len() as f32);
    }
    assert_eq!(*upstream.embedding_calls.lock(), 2);
}

#[tokio::test]
async fn openai_errors_surface_as_embedding_errors() {
    let (base, _) = spawn_upstream().await;

    let embedder = OpenAiEmbedder::new(&embedding_config(&base), "sk-wrong").unwrap();
    let err = embedder.embed("text").await.unwrap_err();
    assert!(matches!(&err, Error::Embedding(msg) if msg.contains("bad key")));
    assert!(!embedder.health_check().await.unwrap());
}

#[tokio::test]
async fn openai_chat_completion() {
    let (base, _) = spawn_upstream().await;
    let request = CompletionRequest {
        system_prompt: "[1] Fossil fuels".to_string(),
        user_message: "What causes climate change?".to_string(),
        params: SamplingParams {
            temperature: 0.2,
            max_tokens: 100,
        },
    };

    let config = LlmConfig {
        base_url: format!("{}/v1", base),
        ..Default::default()
    };
    let llm = OpenAiLlm::new(&config, OPENAI_KEY).unwrap();
    let answer = llm.complete(&request).await.unwrap();
    assert_eq!(
        answer.as_deref(),
        Some("Fossil fuels and deforestation drive it [1] [7].")
    );

    let silent = OpenAiLlm::new(
        &LlmConfig {
            model: "silent-model".to_string(),
            ..config
        },
        OPENAI_KEY,
    )
    .unwrap();
    assert_eq!(silent.complete(&request).await.unwrap(), None);
}

#[tokio::test]
async fn pinecone_upserts_in_batches_and_filters_queries() {
    let (base, upstream) = spawn_upstream().await;
    let store = PineconeVectorStore::new(&vector_db_config(&base), PINECONE_KEY).unwrap();

    let mine = Uuid::new_v4();
    let other = Uuid::new_v4();
    let mut records: Vec<VectorRecord> = (0..150)
        .map(|i| VectorRecord::from_chunk(&Chunk::new(mine, format!("chunk {}", i), i, 150), vec![1.0, 0.0]))
        .collect();
    records.push(VectorRecord::from_chunk(
        &Chunk::new(other, "someone else".to_string(), 0, 1),
        vec![1.0, 0.0],
    ));

    store.upsert(&records).await.unwrap();
    {
        let batches = upstream.upsert_batches.lock();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0]["vectors"].as_array().unwrap().len(), 100);
        assert_eq!(batches[1]["vectors"].as_array().unwrap().len(), 51);
        assert_eq!(batches[0]["namespace"], "tests");
    }

    let scoped = store.query(&[1.0, 0.0], 200, Some(other)).await.unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].chunk_text, "someone else");
    assert_eq!(scoped[0].similarity_score, 0.9);

    let unscoped = store.query(&[1.0, 0.0], 8, None).await.unwrap();
    assert_eq!(unscoped.len(), 8);

    let queries = upstream.queries.lock();
    assert_eq!(queries[0]["includeMetadata"], true);
    assert!(queries[1].get("filter").is_none());
    drop(queries);

    assert!(store.health_check().await.unwrap());
}

#[tokio::test]
async fn pinecone_rejects_bad_key() {
    let (base, _) = spawn_upstream().await;
    let store = PineconeVectorStore::new(&vector_db_config(&base), "pc-wrong").unwrap();
    let err = store.query(&[1.0], 8, None).await.unwrap_err();
    assert!(matches!(err, Error::VectorDb(_)));
}

#[tokio::test]
async fn cohere_rerank_returns_hits() {
    let (base, _) = spawn_upstream().await;
    let config = RerankConfig {
        base_url: base,
        ..Default::default()
    };
    let reranker = CohereReranker::new(&config, COHERE_KEY).unwrap();

    let documents = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let hits = reranker.rerank("query", &documents, 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].index, 2);
    assert_eq!(hits[1].index, 1);
    assert!(hits[0].relevance_score > hits[1].relevance_score);
}

#[tokio::test]
async fn hosted_backend_end_to_end() {
    let (base, upstream) = spawn_upstream().await;

    let mut config = RagConfig {
        backend: BackendProvider::Hosted,
        embeddings: embedding_config(&base),
        vector_db: vector_db_config(&base),
        ..Default::default()
    };
    config.reranker.base_url = base.clone();
    config.llm.base_url = format!("{}/v1", base);

    let credentials = Credentials {
        openai_api_key: Some(OPENAI_KEY.to_string()),
        pinecone_api_key: Some(PINECONE_KEY.to_string()),
        cohere_api_key: Some(COHERE_KEY.to_string()),
    };
    config.validate(&credentials).unwrap();

    let app = build_router(AppState::new(config, &credentials).unwrap());
    let request = Request::builder()
        .method("POST")
        .uri("/api/rag")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "text": "Burning fossil fuels and deforestation are the main causes of climate change.",
                "query": "What causes climate change?"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    // [7] has no matching source and is removed
    assert_eq!(body["answer"], "Fossil fuels and deforestation drive it [1].");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["id"], 1);
    assert!(sources[0]["similarityScore"].as_f64().unwrap() > 0.89);
    assert!(sources[0]["rerankScore"].as_f64().unwrap() > 0.89);

    let vectors = upstream.vectors.lock();
    let request_id = vectors[0]["metadata"]["request_id"].as_str().unwrap().to_string();
    drop(vectors);
    let queries = upstream.queries.lock();
    assert_eq!(queries[0]["filter"]["request_id"]["$eq"], request_id);
}

//! URL ingestion tests against a local mock HTTP server.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use tempfile::TempDir;

use inquest::chat::ChatModel;
use inquest::config::{
    ChatConfig, ChunkingConfig, Config, EmbeddingConfig, RetrievalConfig, ServerConfig,
    StoreConfig,
};
use inquest::embedding::EmbeddingProvider;
use inquest::engine::Engine;
use inquest::models::IngestOutcome;
use inquest::progress::NoProgress;
use inquest::store::Store;

const DIMS: usize = 26;

struct CharFreqEmbedder;

#[async_trait]
impl EmbeddingProvider for CharFreqEmbedder {
    fn model_name(&self) -> &str {
        "char-freq-test"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vec = vec![0.0f32; DIMS];
                for c in text.chars().flat_map(|c| c.to_lowercase()) {
                    if c.is_ascii_lowercase() {
                        vec[(c as u8 - b'a') as usize] += 1.0;
                    }
                }
                vec
            })
            .collect())
    }
}

struct CannedChat;

#[async_trait]
impl ChatModel for CannedChat {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("canned".to_string())
    }
}

fn test_config(db_path: &Path) -> Config {
    Config {
        store: StoreConfig {
            path: db_path.to_path_buf(),
        },
        chunking: ChunkingConfig {
            chunk_size: 1000,
            url_overlap: 0,
            document_overlap: 200,
        },
        retrieval: RetrievalConfig { top_k: 4 },
        embedding: EmbeddingConfig {
            base_url: "http://unused.invalid".to_string(),
            model: "char-freq-test".to_string(),
            dims: DIMS,
            batch_size: 8,
            max_retries: 1,
            timeout_secs: 5,
            api_key_env: "UNUSED".to_string(),
        },
        chat: ChatConfig {
            base_url: "http://unused.invalid".to_string(),
            model: "canned".to_string(),
            max_tokens: 500,
            temperature: 0.9,
            timeout_secs: 5,
            api_key_env: "UNUSED".to_string(),
        },
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    }
}

async fn test_engine(tmp: &TempDir) -> Engine {
    let db_path = tmp.path().join("inquest.db");
    let config = test_config(&db_path);

    let store = Store::open(&db_path, config.retrieval.top_k, config.embedding.batch_size)
        .await
        .unwrap();

    Engine::with_components(
        config,
        store,
        Box::new(CharFreqEmbedder),
        Box::new(CannedChat),
    )
    .unwrap()
}

#[tokio::test]
async fn test_ingest_html_and_plain_text_urls() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/article");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><body><h1>Ferrets</h1><p>Ferrets are domesticated mustelids kept as pets.</p></body></html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/notes.txt");
            then.status(200)
                .header("content-type", "text/plain")
                .body("Plain notes about glaciers and moraines.");
        })
        .await;

    let tmp = TempDir::new().unwrap();
    let engine = test_engine(&tmp).await;

    let urls = vec![server.url("/article"), server.url("/notes.txt")];
    let report = engine.ingest_urls(&urls, &NoProgress).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.items.len(), 2);
    assert!(report.items.iter().all(|item| item.result.is_ok()));

    // HTML markup is stripped before chunking, so the query reaches the
    // rendered text.
    let result = engine.query("ferrets as pets").await.unwrap();
    assert!(result.sources.contains("/article"));
}

#[tokio::test]
async fn test_failed_url_is_recorded_not_fatal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ok");
            then.status(200)
                .header("content-type", "text/plain")
                .body("Working page about beekeeping and hives.");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone");
            then.status(404).body("not here");
        })
        .await;

    let tmp = TempDir::new().unwrap();
    let engine = test_engine(&tmp).await;

    let urls = vec![server.url("/gone"), server.url("/ok")];
    let report = engine.ingest_urls(&urls, &NoProgress).await.unwrap();

    assert!(report.succeeded());
    assert!(report.items[0].result.is_err());
    assert!(report.items[1].result.is_ok());

    let result = engine.query("beekeeping").await.unwrap();
    assert!(result.sources.contains("/ok"));
    assert!(!result.sources.contains("/gone"));
}

#[tokio::test]
async fn test_two_urls_chunked_and_cited() {
    let server = MockServer::start_async().await;
    // Two pages totaling ~3000 characters; at chunk_size 1000 with no
    // overlap that splits into at least 3 chunks.
    let page_a = "Emperor penguins huddle together through the Antarctic winter to conserve heat. "
        .repeat(19);
    let page_b =
        "Humpback whales migrate thousands of kilometers between feeding and breeding grounds. "
            .repeat(17);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/a");
            then.status(200)
                .header("content-type", "text/plain")
                .body(&page_a);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b");
            then.status(200)
                .header("content-type", "text/plain")
                .body(&page_b);
        })
        .await;

    let tmp = TempDir::new().unwrap();
    let engine = test_engine(&tmp).await;

    let urls = vec![server.url("/a"), server.url("/b")];
    let report = engine.ingest_urls(&urls, &NoProgress).await.unwrap();

    assert!(report.succeeded());
    assert!(
        report.chunks_added() >= 3,
        "expected >= 3 chunks, got {}",
        report.chunks_added()
    );

    let result = engine.query("where do humpback whales migrate").await.unwrap();
    // Both URLs are cited, newline-joined and lexicographically sorted.
    let sources: Vec<&str> = result.sources.lines().collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().any(|s| s.ends_with("/a")));
    assert!(sources.iter().any(|s| s.ends_with("/b")));
    let mut sorted = sources.clone();
    sorted.sort();
    assert_eq!(sources, sorted);
}

#[tokio::test]
async fn test_unsupported_content_type_fails_item() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/image");
            then.status(200)
                .header("content-type", "image/png")
                .body("not really a png");
        })
        .await;

    let tmp = TempDir::new().unwrap();
    let engine = test_engine(&tmp).await;

    let report = engine
        .ingest_urls(&[server.url("/image")], &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.outcome, IngestOutcome::EmptyCorpus);
    assert!(report.items[0].result.is_err());
}

//! Pipeline orchestration.
//!
//! [`Engine`] owns the store and the model providers and exposes the three
//! operations everything else is built from: ingest URLs, ingest uploaded
//! files, and answer a question. The CLI and the HTTP server are both thin
//! wrappers over an `Engine`.
//!
//! Ingestion replaces the whole corpus: each run resets the store before
//! adding the freshly loaded chunks. A `tokio` read-write lock serializes
//! ingest runs against queries so a query never observes a half-reset store.

use anyhow::{bail, Result};
use tokio::sync::RwLock;

use crate::chat::{ChatModel, OpenAiChat};
use crate::chunk;
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, OpenAiEmbeddings};
use crate::loader;
use crate::models::{
    IngestOutcome, IngestReport, ItemOutcome, LoadedDocument, QueryResult, RawFile,
};
use crate::progress::{IngestEvent, ProgressSink};
use crate::store::Store;
use crate::synth;

pub struct Engine {
    config: Config,
    store: Store,
    embedder: Box<dyn EmbeddingProvider>,
    chat: Box<dyn ChatModel>,
    http: reqwest::Client,
    // Ingest takes the write half, queries the read half.
    gate: RwLock<()>,
}

impl Engine {
    /// Build an engine from configuration: open (or create) the SQLite
    /// store and construct the remote embedding and chat clients.
    pub async fn new(config: Config) -> Result<Self> {
        let store = Store::open(
            &config.store.path,
            config.retrieval.top_k,
            config.embedding.batch_size,
        )
        .await?;

        let embedder = Box::new(OpenAiEmbeddings::new(&config.embedding)?);
        let chat = Box::new(OpenAiChat::new(&config.chat)?);

        Self::assemble(config, store, embedder, chat)
    }

    /// Build an engine around caller-supplied providers. Used by tests to
    /// substitute deterministic embedding and chat implementations.
    pub fn with_components(
        config: Config,
        store: Store,
        embedder: Box<dyn EmbeddingProvider>,
        chat: Box<dyn ChatModel>,
    ) -> Result<Self> {
        Self::assemble(config, store, embedder, chat)
    }

    fn assemble(
        config: Config,
        store: Store,
        embedder: Box<dyn EmbeddingProvider>,
        chat: Box<dyn ChatModel>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            store,
            embedder,
            chat,
            http: loader::http_client()?,
            gate: RwLock::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch each URL, extract its text, and rebuild the knowledge base
    /// from the result. An empty list is rejected before the store is
    /// touched. Individual fetch failures are recorded in the report and
    /// do not abort the run.
    pub async fn ingest_urls(
        &self,
        urls: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<IngestReport> {
        if urls.is_empty() {
            bail!("url list must not be empty");
        }

        let _guard = self.gate.write().await;

        sink.report(IngestEvent::Resetting);
        self.store.reset().await?;

        let mut documents: Vec<LoadedDocument> = Vec::new();
        let mut items: Vec<ItemOutcome> = Vec::new();

        for url in urls {
            sink.report(IngestEvent::Loading {
                source: url.clone(),
            });
            match loader::load_url(&self.http, url).await {
                Ok(doc) => {
                    items.push(ItemOutcome::loaded(url, 1));
                    documents.push(doc);
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(url = %url, error = %message, "failed to load URL");
                    sink.report(IngestEvent::LoadFailed {
                        source: url.clone(),
                        error: message.clone(),
                    });
                    items.push(ItemOutcome::failed(url, message));
                }
            }
        }

        self.finish_ingest(documents, items, self.config.chunking.url_overlap, sink)
            .await
    }

    /// Extract text from each uploaded file and rebuild the knowledge base
    /// from the result. An empty list is rejected before the store is
    /// touched. As with URLs, a file that cannot be parsed is recorded as
    /// failed and skipped.
    pub async fn ingest_files(
        &self,
        files: &[RawFile],
        sink: &dyn ProgressSink,
    ) -> Result<IngestReport> {
        if files.is_empty() {
            bail!("file list must not be empty");
        }

        let _guard = self.gate.write().await;

        sink.report(IngestEvent::Resetting);
        self.store.reset().await?;

        let mut documents: Vec<LoadedDocument> = Vec::new();
        let mut items: Vec<ItemOutcome> = Vec::new();

        for file in files {
            sink.report(IngestEvent::Loading {
                source: file.name.clone(),
            });
            match loader::load_file(file) {
                Ok(docs) => {
                    items.push(ItemOutcome::loaded(&file.name, docs.len()));
                    documents.extend(docs);
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(file = %file.name, error = %message, "failed to extract file");
                    sink.report(IngestEvent::LoadFailed {
                        source: file.name.clone(),
                        error: message.clone(),
                    });
                    items.push(ItemOutcome::failed(&file.name, message));
                }
            }
        }

        self.finish_ingest(
            documents,
            items,
            self.config.chunking.document_overlap,
            sink,
        )
        .await
    }

    async fn finish_ingest(
        &self,
        documents: Vec<LoadedDocument>,
        items: Vec<ItemOutcome>,
        overlap: usize,
        sink: &dyn ProgressSink,
    ) -> Result<IngestReport> {
        if documents.is_empty() {
            sink.report(IngestEvent::NothingLoaded);
            return Ok(IngestReport {
                outcome: IngestOutcome::EmptyCorpus,
                items,
            });
        }

        sink.report(IngestEvent::Splitting);
        let chunks = chunk::split_documents(&documents, self.config.chunking.chunk_size, overlap);

        sink.report(IngestEvent::Storing {
            chunks: chunks.len(),
        });
        let added = self.store.add(self.embedder.as_ref(), &chunks).await?;

        sink.report(IngestEvent::Done { chunks: added });
        tracing::info!(chunks = added, sources = items.len(), "ingest complete");

        Ok(IngestReport {
            outcome: IngestOutcome::Completed {
                chunks_added: added,
            },
            items,
        })
    }

    /// Answer a question from the stored corpus. Fails with
    /// [`crate::store::StoreError::Uninitialized`] when nothing has been
    /// ingested yet.
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        let question = question.trim();
        if question.is_empty() {
            bail!("question must not be empty");
        }

        let _guard = self.gate.read().await;

        let chunks = self.store.retrieve(self.embedder.as_ref(), question).await?;
        synth::answer(self.chat.as_ref(), question, &chunks).await
    }
}

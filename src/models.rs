//! Core data models used throughout inquest.
//!
//! These types represent the inputs, documents, chunks, and results that flow
//! through the ingestion and query pipelines.

/// An uploaded file before loading: the original filename (used for its
/// extension and for citation) plus raw byte content.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Text extracted from one input, tagged with where it came from.
///
/// `source` is the URL or the original filename and is never empty.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: String,
    pub text: String,
}

/// A bounded-size segment of a document's text, the unit that gets embedded,
/// stored, and retrieved. Carries its parent document's `source` for citation.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
}

/// Answer to one question plus the newline-joined, sorted, deduplicated
/// source identifiers of the retrieved context.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub sources: String,
}

/// Per-input result recorded by the ingestion pipeline. Load failures are
/// data here, not errors: a failed item never aborts the batch.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub source: String,
    pub result: Result<usize, String>,
}

impl ItemOutcome {
    pub fn loaded(source: impl Into<String>, documents: usize) -> Self {
        Self {
            source: source.into(),
            result: Ok(documents),
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            result: Err(error.into()),
        }
    }
}

/// Terminal outcome of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The run reached the store; `chunks_added` chunks were embedded and stored.
    Completed { chunks_added: usize },
    /// Every item in the batch failed to load; the store was left reset and empty.
    EmptyCorpus,
}

/// Structured result of an ingestion run: the tagged outcome plus the
/// per-item record. Callers decide success from this, never from scanning
/// the emitted status strings.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub items: Vec<ItemOutcome>,
}

impl IngestReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, IngestOutcome::Completed { .. })
    }

    pub fn chunks_added(&self) -> usize {
        match self.outcome {
            IngestOutcome::Completed { chunks_added } => chunks_added,
            IngestOutcome::EmptyCorpus => 0,
        }
    }
}

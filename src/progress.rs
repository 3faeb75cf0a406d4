//! Ingest progress reporting.
//!
//! The ingest pipeline emits status events as it works through its phases
//! so callers can show what is happening. The CLI prints them to stderr,
//! the HTTP server collects them into the response body, and tests use the
//! collecting sink to assert on phase ordering.

use std::io::Write;
use std::sync::Mutex;

/// A single status event from the ingest pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestEvent {
    /// Vector store is being cleared before re-population.
    Resetting,
    /// One input (URL or file name) is being fetched and extracted.
    Loading { source: String },
    /// Loading a source failed; the pipeline continues with the rest.
    LoadFailed { source: String, error: String },
    /// Extracted text is being split into chunks.
    Splitting,
    /// Chunks are being embedded and written to the store.
    Storing { chunks: usize },
    /// Pipeline finished; `chunks` chunks were added.
    Done { chunks: usize },
    /// Nothing usable was loaded; the store was left empty.
    NothingLoaded,
}

impl IngestEvent {
    /// Human-readable status line for this event.
    pub fn message(&self) -> String {
        match self {
            IngestEvent::Resetting => "Resetting vector store...".to_string(),
            IngestEvent::Loading { source } => format!("Loading {}...", source),
            IngestEvent::LoadFailed { source, error } => {
                format!("Failed to load {}: {}", source, error)
            }
            IngestEvent::Splitting => "Splitting text into chunks...".to_string(),
            IngestEvent::Storing { chunks } => {
                format!("Embedding and storing {} chunks...", chunks)
            }
            IngestEvent::Done { chunks } => {
                format!("Done! Added {} chunks to the knowledge base.", chunks)
            }
            IngestEvent::NothingLoaded => {
                "No content could be loaded; knowledge base is empty.".to_string()
            }
        }
    }
}

/// Receives ingest status events. Implementations must tolerate being
/// called from async context without blocking for long.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Prints each status line to stderr, keeping stdout clean for results.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let _ = writeln!(std::io::stderr().lock(), "{}", event.message());
    }
}

/// Accumulates status lines in memory. Used by the HTTP server to return
/// the pipeline's status trail in the response.
#[derive(Default)]
pub struct CollectingProgress {
    lines: Mutex<Vec<String>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status lines reported so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingProgress {
    fn report(&self, event: IngestEvent) {
        self.lines.lock().unwrap().push(event.message());
    }
}

/// Discards all events.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_preserves_order() {
        let sink = CollectingProgress::new();
        sink.report(IngestEvent::Resetting);
        sink.report(IngestEvent::Loading {
            source: "https://example.com".to_string(),
        });
        sink.report(IngestEvent::Done { chunks: 3 });

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Resetting vector store...");
        assert_eq!(lines[1], "Loading https://example.com...");
        assert_eq!(lines[2], "Done! Added 3 chunks to the knowledge base.");
    }

    #[test]
    fn test_event_messages() {
        assert_eq!(
            IngestEvent::Storing { chunks: 12 }.message(),
            "Embedding and storing 12 chunks..."
        );
        assert!(IngestEvent::LoadFailed {
            source: "a.pdf".to_string(),
            error: "bad header".to_string(),
        }
        .message()
        .contains("a.pdf"));
    }
}

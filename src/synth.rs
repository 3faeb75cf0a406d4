//! Answer synthesis from retrieved context.
//!
//! Builds the grounding prompt, invokes the chat model, and pairs the
//! answer with a deterministic source listing derived from the retrieved
//! chunks themselves (never from the model's output).

use anyhow::Result;
use std::collections::BTreeSet;

use crate::chat::ChatModel;
use crate::models::{Chunk, QueryResult};

/// Sentence the model is instructed to emit when the context does not
/// contain an answer.
pub const FALLBACK_ANSWER: &str = "I don't have enough information to answer this question.";

fn build_prompt(question: &str, chunks: &[Chunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question based only on the following context. \
         If the context does not contain the answer, say \"{FALLBACK_ANSWER}\"\n\n\
         Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

/// Distinct chunk sources, sorted lexicographically, one per line.
pub fn sources_line(chunks: &[Chunk]) -> String {
    let sources: BTreeSet<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    sources.into_iter().collect::<Vec<_>>().join("\n")
}

/// Generate an answer for `question` grounded in `chunks`.
pub async fn answer(
    chat: &dyn ChatModel,
    question: &str,
    chunks: &[Chunk],
) -> Result<QueryResult> {
    let prompt = build_prompt(question, chunks);
    let answer = chat.complete(&prompt).await?;

    Ok(QueryResult {
        answer,
        sources: sources_line(chunks),
    })
}

//! Separator-priority text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters,
//! breaking at the most meaningful boundary available: paragraph break, line
//! break, sentence-ending period, then space. A segment that still exceeds
//! the limit after all separators are exhausted is emitted oversized rather
//! than cut mid-character.
//!
//! When `overlap > 0`, each chunk after the first begins with the trailing
//! `overlap` characters of its predecessor, so context survives the cut.
//! Each chunk receives a random UUID and inherits its document's `source`.

use uuid::Uuid;

use crate::models::{Chunk, LoadedDocument};

/// Split boundaries in priority order.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Split raw text into chunk strings of at most `chunk_size` characters
/// (Unicode scalars), overlapping consecutive chunks by `overlap` characters.
/// Empty or whitespace-only input yields no chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    collect_pieces(text, &SEPARATORS, chunk_size, &mut pieces);

    let mut chunks: Vec<String> = Vec::new();
    // `head` carries the overlap from the previous chunk; `body` is new text.
    let mut head = String::new();
    let mut body = String::new();

    for piece in pieces {
        let piece_len = char_len(piece);

        if !body.is_empty() && char_len(&head) + char_len(&body) + piece_len > chunk_size {
            let chunk = format!("{head}{body}");
            head = if overlap > 0 {
                tail_chars(&chunk, overlap).to_string()
            } else {
                String::new()
            };
            body.clear();
            chunks.push(chunk);
        }

        if body.is_empty() && !head.is_empty() {
            // Shrink the carried overlap so the first piece still fits.
            let budget = chunk_size.saturating_sub(piece_len);
            if char_len(&head) > budget {
                head = tail_chars(&head, budget).to_string();
            }
        }

        body.push_str(piece);
    }

    if !body.is_empty() {
        chunks.push(format!("{head}{body}"));
    }

    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

/// Split one document, propagating its `source` into every chunk.
/// Chunk indices are contiguous from 0.
pub fn split_document(doc: &LoadedDocument, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    split_text(&doc.text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: Uuid::new_v4().to_string(),
            source: doc.source.clone(),
            chunk_index: i as i64,
            text,
        })
        .collect()
}

/// Split a batch of documents in order.
pub fn split_documents(
    docs: &[LoadedDocument],
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| split_document(doc, chunk_size, overlap))
        .collect()
}

/// Recursively break `text` into pieces of at most `max` characters, trying
/// separators in priority order. Pieces keep their trailing separator so the
/// merge step reassembles exact substrings of the input.
fn collect_pieces<'a>(text: &'a str, seps: &[&str], max: usize, out: &mut Vec<&'a str>) {
    if text.is_empty() {
        return;
    }
    if char_len(text) <= max || seps.is_empty() {
        out.push(text);
        return;
    }

    let segments = split_after(text, seps[0]);
    if segments.len() <= 1 {
        collect_pieces(text, &seps[1..], max, out);
        return;
    }

    for seg in segments {
        if char_len(seg) <= max {
            out.push(seg);
        } else {
            collect_pieces(seg, &seps[1..], max, out);
        }
    }
}

/// Split `text` after each occurrence of `sep`, keeping the separator
/// attached to the preceding segment.
fn split_after<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, m) in text.match_indices(sep) {
        let end = idx + m.len();
        out.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s` (the whole string when shorter).
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let count = char_len(s);
    if count <= n {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

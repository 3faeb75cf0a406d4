//! # Inquest
//!
//! A retrieval-augmented research assistant. Inquest fetches web pages and
//! parses uploaded documents, splits the text into overlapping chunks,
//! embeds them, and answers questions from the stored corpus with an LLM,
//! always citing which sources the answer came from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │   Loaders    │──▶│   Pipeline   │──▶│  SQLite   │
//! │ URL/PDF/DOCX │   │ Chunk+Embed  │   │  vectors  │
//! └──────────────┘   └──────────────┘   └────┬──────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │   CLI    │       │   HTTP   │
//!                   │  (inq)   │       │  (axum)  │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! inq init                                  # create database
//! inq ingest urls https://example.com/post  # build knowledge base from URLs
//! inq ingest files notes.pdf report.docx    # ...or from local documents
//! inq ask "What does the post argue?"
//! inq serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | URL fetching and PDF/DOCX/text extraction |
//! | [`chunk`] | Recursive text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | SQLite-backed vector store |
//! | [`chat`] | Chat-completion client |
//! | [`synth`] | Answer synthesis and source attribution |
//! | [`engine`] | Ingest and query pipelines |
//! | [`server`] | JSON HTTP API |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod loader;
pub mod models;
pub mod progress;
pub mod server;
pub mod store;
pub mod synth;

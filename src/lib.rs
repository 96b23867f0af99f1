//! # faqx
//!
//! Answers repeated questions in a community chat. Incoming messages are
//! matched against a curated, per-topic corpus of known phrasings; when the
//! closest phrase is similar enough the linked canned answer is delivered,
//! and the people who got it vote on whether it helped. Those votes move the
//! confidence bar each answer has to clear.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! faqx --config config.json add --topic support --short refund \
//!     --answer "Refunds take five business days."
//! faqx --config config.json teach --topic support --label refund "how do I get a refund"
//! faqx --config config.json check --topic support "How do I get a refund?"
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use faqx::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Config::load("config.json").unwrap();
//! let registry = TopicRegistry::open(&config, Arc::new(HashEmbedder::default())).unwrap();
//!
//! let engine = registry.engine("support").unwrap();
//! let mut engine = engine.lock();
//! match engine.check_message("How do I get a refund?", "user-42").unwrap() {
//!     Decision::Answer { answer, mut ticket, .. } => {
//!         println!("{}", answer);
//!         // later, when user-42 clicks "this helped"
//!         engine.settle(&mut ticket, "user-42", Vote::Up).unwrap();
//!     }
//!     other => println!("no answer: {:?}", other),
//! }
//! ```
//!
//! ## Crate Structure
//!
//! - [`faqx-core`](https://docs.rs/faqx-core) - Normalizer, FAQ entries, thresholds, configuration
//! - [`faqx-storage`](https://docs.rs/faqx-storage) - Corpus document, repair, atomic JSON persistence
//! - [`faqx-similarity`](https://docs.rs/faqx-similarity) - Embedders and the nearest-phrase classifier
//! - [`faqx-engine`](https://docs.rs/faqx-engine) - Per-topic matching engine, feedback, dataset expansion
//!
//! ## Features
//!
//! - `bert`: all-MiniLM-L6-v2 sentence embeddings via candle (downloads the model on first use)

// Re-export core types
pub use faqx_core::{
    clean, Config, EngineConfig, EntryId, Error, FaqEntry, FillWords, MessageFilter, Normalizer,
    Rejection, Result, ThresholdPolicy, Vector, Vote,
};

// Re-export storage
pub use faqx_storage::{
    Change, Conflict, CorpusDocument, CorpusStore, DocumentBackend, DocumentStore,
    JsonFileBackend, MemoryBackend,
};

// Re-export similarity
pub use faqx_similarity::{
    Embedder, HashEmbedder, Label, Prediction, SimilarityClassifier, Unclassifiable,
};
#[cfg(feature = "bert")]
pub use faqx_similarity::MiniLmEmbedder;

// Re-export engine
pub use faqx_engine::{
    Candidate, Decision, EntryInfo, EntryPreview, ExpandDecision, ExpandSession, FeedbackTicket,
    MatchingEngine, Settlement, SharedEngine, TeachOutcome, TestReport, TopicRegistry,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Change, Config, Decision, Embedder, EntryId, Error, FaqEntry, FeedbackTicket,
        HashEmbedder, Label, MatchingEngine, Prediction, Result, Settlement, TopicRegistry, Vote,
    };
}

//! # faqx Storage
//!
//! Persistence for the FAQ corpus.
//!
//! - [`CorpusDocument`] - The on-disk document, keyed by topic
//! - [`DocumentBackend`] - Where the document lives ([`JsonFileBackend`], [`MemoryBackend`])
//! - [`DocumentStore`] - The shared in-memory document, written atomically
//! - [`CorpusStore`] - One topic's entries and nonsense set, with repair and rollback

pub mod corpus;
pub mod document;
pub mod manager;
pub mod persistence;

pub use corpus::{Change, Conflict, CorpusStore};
pub use document::{CorpusDocument, TopicCorpus};
pub use manager::DocumentStore;
pub use persistence::{DocumentBackend, JsonFileBackend, MemoryBackend};

//! # faqx Engine
//!
//! Per-topic orchestration on top of the corpus store and the similarity
//! classifier.
//!
//! - [`MatchingEngine`] - validate, classify, apply the vote-driven threshold,
//!   and edit the corpus with the refits that requires
//! - [`FeedbackTicket`] - exactly-once up/down vote on a delivered answer
//! - [`ExpandSession`] - operator walk through chat history to grow the corpus
//! - [`TopicRegistry`] - every topic engine of a deployment
//!
//! ## Example
//!
//! ```rust
//! use faqx_core::{EngineConfig, Normalizer, Vote};
//! use faqx_engine::{Decision, MatchingEngine, Settlement};
//! use faqx_similarity::HashEmbedder;
//! use faqx_storage::{DocumentStore, MemoryBackend};
//! use std::sync::Arc;
//!
//! let store = Arc::new(DocumentStore::open(Box::new(MemoryBackend::new())).unwrap());
//! let mut engine = MatchingEngine::new(
//!     "support",
//!     store,
//!     Arc::new(HashEmbedder::default()),
//!     Normalizer::default(),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! engine.create_entry("Refunds take five business days.", "refund").unwrap();
//! engine.teach("how do i get a refund", "refund").unwrap();
//!
//! if let Decision::Answer { answer, mut ticket, .. } =
//!     engine.check_message("How do I get a refund?", "alice").unwrap()
//! {
//!     assert_eq!(answer, "Refunds take five business days.");
//!     let settled = engine.settle(&mut ticket, "alice", Vote::Up).unwrap();
//!     assert_eq!(settled, Settlement::Recorded(Vote::Up));
//! }
//! ```

pub mod engine;
pub mod expand;
pub mod feedback;
pub mod registry;

pub use engine::{
    Decision, EntryInfo, EntryPreview, MatchingEngine, TeachOutcome, TestReport, PREVIEW_WIDTH,
};
pub use expand::{Candidate, ExpandDecision, ExpandSession};
pub use feedback::{FeedbackTicket, Settlement};
pub use registry::{SharedEngine, TopicRegistry};

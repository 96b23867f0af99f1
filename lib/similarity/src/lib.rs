//! # faqx Similarity
//!
//! Embedding-based nearest-phrase classification for one topic.
//!
//! - [`Embedder`] - text to fixed-length vectors; [`HashEmbedder`] works offline,
//!   `MiniLmEmbedder` (feature `bert`) runs all-MiniLM-L6-v2 on candle
//! - [`SimilarityClassifier`] - embeds a corpus once and answers
//!   "closest phrase label + cosine confidence"
//!
//! ## Example
//!
//! ```rust
//! use faqx_core::{FaqEntry, FillWords, MessageFilter, Normalizer};
//! use faqx_similarity::{HashEmbedder, Label, SimilarityClassifier};
//! use std::sync::Arc;
//!
//! let mut refund = FaqEntry::new("refund", "Refunds are handled by the store.");
//! refund.messages.push("how do i get refund".to_string());
//!
//! let classifier = SimilarityClassifier::build(
//!     &[refund],
//!     &["good morning everyone here".to_string()],
//!     Arc::new(HashEmbedder::default()),
//!     Normalizer::new(Arc::new(FillWords::default())),
//!     MessageFilter::default(),
//! )
//! .unwrap();
//!
//! let prediction = classifier.predict("How do I get refund?").unwrap();
//! assert!(matches!(prediction.label(), Some(Label::Entry(_))));
//! ```

#[cfg(feature = "bert")]
pub mod bert;
pub mod classifier;
pub mod embedder;

#[cfg(feature = "bert")]
pub use bert::{MiniLmEmbedder, MINILM_DIM, MINILM_REPO};
pub use classifier::{Label, Prediction, SimilarityClassifier, Unclassifiable};
pub use embedder::{Embedder, HashEmbedder, DEFAULT_HASH_DIM};

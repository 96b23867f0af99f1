//! # faqx Core
//!
//! Core types shared by every faqx crate.
//!
//! - [`Vector`] - Dense embedding with cosine similarity
//! - [`Normalizer`] / [`clean`] - Deterministic text cleaning against [`FillWords`]
//! - [`MessageFilter`] - Word count / word length gate in front of the classifier
//! - [`FaqEntry`] - A canonical answer with its example phrasings and votes
//! - [`ThresholdPolicy`] - Vote history to required confidence
//! - [`Config`] - Deployment configuration
//!
//! ## Example
//!
//! ```rust
//! use faqx_core::{clean, FaqEntry, FillWords, ThresholdPolicy};
//!
//! let fill_words = FillWords::new(["the", "a"]);
//! assert_eq!(clean("Where is THE log file?", &fill_words), "where is log file");
//!
//! let mut entry = FaqEntry::new("logs", "Logs live in the launcher folder.");
//! let policy = ThresholdPolicy::new(0.3, 0.7).unwrap();
//! assert!((policy.threshold_for(&entry) - 0.5).abs() < 1e-6);
//!
//! entry.up_votes = 5;
//! assert!((policy.threshold_for(&entry) - 0.3).abs() < 1e-6);
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod threshold;
pub mod vector;

pub use config::{Config, EngineConfig};
pub use entry::{normalize_short, validate_answer, validate_short, EntryId, FaqEntry, Vote, RESERVED_SHORT};
pub use error::{Error, Result};
pub use filter::{MessageFilter, Rejection};
pub use normalize::{clean, FillWords, Normalizer};
pub use threshold::ThresholdPolicy;
pub use vector::Vector;

//! Sentence embedders
//!
//! The classifier only needs "text in, fixed-length vector out". The model
//! behind it is swappable: [`HashEmbedder`] works offline and is fully
//! deterministic, the `bert` feature adds a pretrained sentence-transformer.

use faqx_core::{Error, Result, Vector};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Default dimension for hashed embeddings
pub const DEFAULT_HASH_DIM: usize = 256;

/// Turns text into fixed-length vectors. Shared read-only across topics.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dim(&self) -> usize;

    /// One vector per input, in input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>>;

    fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("embedder returned no vector".to_string()))
    }
}

/// Character-trigram and word hashing into a fixed number of buckets.
///
/// Shares surface form, not meaning: "refund" and "money back" land far
/// apart. Good enough for tests, benches and small deployments without a
/// model download.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vector {
        let mut vector = vec![0.0f32; self.dim];
        let normalized = text.to_lowercase();

        for trigram in generate_trigrams(&normalized) {
            vector[self.bucket(&trigram)] += 1.0;
        }

        // Words contribute more than their trigrams
        for word in normalized.split_whitespace() {
            vector[self.bucket(word)] += 2.0;
        }

        let mut vector = Vector::new(vector);
        vector.normalize();
        vector
    }

    fn bucket<T: Hash + ?Sized>(&self, value: &T) -> usize {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        (hasher.finish() % self.dim as u64) as usize
    }
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "trigram-hash"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Character trigrams of a space-padded string
fn generate_trigrams(s: &str) -> HashSet<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();

    chars
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

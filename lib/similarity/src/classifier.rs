//! Nearest-phrase classifier over one topic's corpus.
//!
//! Every nonsense phrase and every entry phrase is embedded once at build
//! time. A prediction is the label of the single most similar phrase, with
//! that cosine similarity as confidence. The classifier is immutable: any
//! corpus change means building a new one.

use crate::embedder::Embedder;
use faqx_core::{EntryId, FaqEntry, MessageFilter, Normalizer, Rejection, Result, Vector};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// What a stored phrase stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Known nonsense
    NoMatch,
    Entry(EntryId),
}

/// Why no label could be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unclassifiable {
    /// Cleaned text failed the validity filter
    Rejected(Rejection),
    /// Nothing to compare against
    EmptyCorpus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Unclassifiable { reason: Unclassifiable },
    /// Closest phrase is nonsense. Confidence is kept for near-miss logging.
    NoMatch { confidence: f32 },
    Match { entry: EntryId, confidence: f32 },
}

impl Prediction {
    pub fn label(&self) -> Option<Label> {
        match self {
            Prediction::Unclassifiable { .. } => None,
            Prediction::NoMatch { .. } => Some(Label::NoMatch),
            Prediction::Match { entry, .. } => Some(Label::Entry(*entry)),
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self {
            Prediction::Unclassifiable { .. } => None,
            Prediction::NoMatch { confidence } | Prediction::Match { confidence, .. } => {
                Some(*confidence)
            }
        }
    }

    pub fn entry(&self) -> Option<EntryId> {
        match self {
            Prediction::Match { entry, .. } => Some(*entry),
            _ => None,
        }
    }
}

pub struct SimilarityClassifier {
    embedder: Arc<dyn Embedder>,
    normalizer: Normalizer,
    filter: MessageFilter,
    labels: Vec<Label>,
    embeddings: Vec<Vector>,
}

impl SimilarityClassifier {
    /// Embed the whole corpus. Nonsense phrases come first, then each
    /// entry's phrases in entry order, so ties resolve to nonsense.
    pub fn build(
        entries: &[FaqEntry],
        nonsense: &[String],
        embedder: Arc<dyn Embedder>,
        normalizer: Normalizer,
        filter: MessageFilter,
    ) -> Result<Self> {
        let mut labels = Vec::with_capacity(nonsense.len());
        let mut phrases: Vec<&str> = Vec::with_capacity(nonsense.len());

        for phrase in nonsense {
            labels.push(Label::NoMatch);
            phrases.push(phrase);
        }
        for (i, entry) in entries.iter().enumerate() {
            for phrase in &entry.messages {
                labels.push(Label::Entry(EntryId(i)));
                phrases.push(phrase);
            }
        }

        let embeddings = if phrases.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&phrases)?
        };

        if embeddings.len() != labels.len() {
            return Err(faqx_core::Error::Embedding(format!(
                "{} returned {} vectors for {} phrases",
                embedder.model_name(),
                embeddings.len(),
                labels.len()
            )));
        }

        debug!(
            "Built classifier over {} phrases ({} nonsense) with {}",
            labels.len(),
            nonsense.len(),
            embedder.model_name()
        );

        Ok(Self {
            embedder,
            normalizer,
            filter,
            labels,
            embeddings,
        })
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let cleaned = self.normalizer.clean(text);

        if let Some(rejection) = self.filter.rejection(&cleaned) {
            return Ok(Prediction::Unclassifiable {
                reason: Unclassifiable::Rejected(rejection),
            });
        }

        if self.embeddings.is_empty() {
            return Ok(Prediction::Unclassifiable {
                reason: Unclassifiable::EmptyCorpus,
            });
        }

        let query = self.embedder.embed(&cleaned)?;

        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (i, stored) in self.embeddings.iter().enumerate() {
            let score = query.cosine_similarity(stored);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }

        Ok(match self.labels[best] {
            Label::NoMatch => Prediction::NoMatch {
                confidence: best_score,
            },
            Label::Entry(entry) => Prediction::Match {
                entry,
                confidence: best_score,
            },
        })
    }

    /// Number of embedded phrases
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}

impl std::fmt::Debug for SimilarityClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityClassifier")
            .field("model", &self.embedder.model_name())
            .field("phrases", &self.labels.len())
            .finish()
    }
}

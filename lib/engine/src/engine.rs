//! Per-topic matching engine
//!
//! Ties the corpus store, the similarity classifier and the threshold policy
//! together. The engine owns exactly one classifier at a time and replaces it
//! only once a rebuild has fully succeeded, so a prediction never runs
//! against a half-built index.
//!
//! Corpus mutations mark the engine dirty. Operations that change the trained
//! phrase set refit before they return; deferred edits (dataset expansion)
//! leave the engine dirty and the next prediction refits first.

use crate::expand::ExpandSession;
use crate::feedback::{FeedbackTicket, Settlement};
use faqx_core::{
    validate_answer, validate_short, EngineConfig, EntryId, Error, FaqEntry, Normalizer,
    Rejection, Result, Vote, RESERVED_SHORT,
};
use faqx_similarity::{Embedder, Label, Prediction, SimilarityClassifier, Unclassifiable};
use faqx_storage::{Change, CorpusStore, DocumentStore};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Longest `short + answer` shown in an entry listing
pub const PREVIEW_WIDTH: usize = 70;

/// What to do with an incoming chat message
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Raw message failed the word filter, nothing was embedded
    Rejected { reason: Rejection },
    Unclassifiable { reason: Unclassifiable },
    NoMatch { confidence: f32 },
    /// Best entry was not confident enough
    Suppressed {
        entry: EntryId,
        short: String,
        confidence: f32,
        threshold: f32,
    },
    Answer {
        answer: String,
        confidence: f32,
        threshold: f32,
        ticket: FeedbackTicket,
    },
}

impl Decision {
    pub fn is_answer(&self) -> bool {
        matches!(self, Decision::Answer { .. })
    }
}

/// Result of teaching the engine what a message was about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "taught", rename_all = "snake_case")]
pub enum TeachOutcome {
    Ignored { added: bool },
    Linked {
        entry: EntryId,
        short: String,
        answer: String,
        added: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryInfo {
    pub id: EntryId,
    pub short: String,
    pub answer: String,
    pub up_votes: u64,
    pub down_votes: u64,
    pub messages: usize,
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPreview {
    pub short: String,
    pub preview: String,
}

/// Prediction with the entry resolved, for operators testing the corpus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub prediction: Prediction,
    pub short: Option<String>,
    pub answer: Option<String>,
    pub threshold: Option<f32>,
}

pub struct MatchingEngine {
    corpus: CorpusStore,
    embedder: Arc<dyn Embedder>,
    config: EngineConfig,
    classifier: Arc<SimilarityClassifier>,
    dirty: bool,
    expanding: Arc<AtomicBool>,
}

impl MatchingEngine {
    /// Load and repair a topic, then fit its first classifier
    pub fn new(
        topic: &str,
        store: Arc<DocumentStore>,
        embedder: Arc<dyn Embedder>,
        normalizer: Normalizer,
        config: EngineConfig,
    ) -> Result<Self> {
        let corpus = CorpusStore::load(topic, store, normalizer)?;
        let classifier = Arc::new(build_classifier(&corpus, &embedder, &config)?);

        info!(
            "Topic '{}' ready: {} entries, {} phrases",
            topic,
            corpus.entries().len(),
            classifier.len()
        );

        Ok(Self {
            corpus,
            embedder,
            config,
            classifier,
            dirty: false,
            expanding: Arc::new(AtomicBool::new(false)),
        })
    }

    #[inline]
    pub fn topic(&self) -> &str {
        self.corpus.topic()
    }

    #[inline]
    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The classifier currently in service
    pub fn classifier(&self) -> Arc<SimilarityClassifier> {
        Arc::clone(&self.classifier)
    }

    /// Whether the corpus changed since the last fit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild the classifier from the current corpus and swap it in
    pub fn refit(&mut self) -> Result<()> {
        let classifier = build_classifier(&self.corpus, &self.embedder, &self.config)?;
        self.classifier = Arc::new(classifier);
        self.dirty = false;
        debug!("Refit topic '{}' ({} phrases)", self.topic(), self.classifier.len());
        Ok(())
    }

    pub fn predict(&mut self, text: &str) -> Result<Prediction> {
        if self.dirty {
            self.refit()?;
        }
        self.classifier.predict(text)
    }

    /// Full per-message pipeline: raw filter, classify, threshold gate.
    #[instrument(skip(self, text), fields(topic = %self.corpus.topic()))]
    pub fn check_message(&mut self, text: &str, author: &str) -> Result<Decision> {
        if let Some(reason) = self.config.filter.rejection(text) {
            debug!("Ignoring message: {}", reason);
            return Ok(Decision::Rejected { reason });
        }

        let prediction = self.predict(text)?;
        let cleaned = self.corpus.normalizer().clean(text);

        let (entry, confidence) = match prediction {
            Prediction::Unclassifiable { reason } => {
                info!("Incoming message: {} (unclassifiable: {:?})", cleaned, reason);
                return Ok(Decision::Unclassifiable { reason });
            }
            Prediction::NoMatch { confidence } => {
                info!("Incoming message: {} (nonsense, {:.4})", cleaned, confidence);
                return Ok(Decision::NoMatch { confidence });
            }
            Prediction::Match { entry, confidence } => (entry, confidence),
        };

        let faq = self.require(entry)?;
        let threshold = self.config.thresholds.threshold_for(faq);
        let fires = confidence >= threshold;

        info!(
            "Incoming message: {} ({}, p={:.4}, threshold={:.4}, {})",
            cleaned, faq.short, confidence, threshold, fires
        );

        if fires {
            Ok(Decision::Answer {
                answer: faq.answer.clone(),
                confidence,
                threshold,
                ticket: FeedbackTicket::new(entry, &faq.short, author),
            })
        } else {
            Ok(Decision::Suppressed {
                entry,
                short: faq.short.clone(),
                confidence,
                threshold,
            })
        }
    }

    pub fn answer_for(&self, label: Label) -> Option<&str> {
        match label {
            Label::Entry(id) => self.corpus.entry(id).map(|e| e.answer.as_str()),
            Label::NoMatch => None,
        }
    }

    pub fn threshold_for(&self, id: EntryId) -> Result<f32> {
        Ok(self.config.thresholds.threshold_for(self.require(id)?))
    }

    /// Count a vote. Votes move the threshold only, so no refit.
    pub fn apply_vote(&mut self, id: EntryId, vote: Vote) -> Result<()> {
        self.corpus.vote(id, vote)?;
        debug!("Recorded {:?} vote for {} in topic '{}'", vote, id, self.topic());
        Ok(())
    }

    /// Settle a feedback ticket on behalf of `voter`
    pub fn settle(
        &mut self,
        ticket: &mut FeedbackTicket,
        voter: &str,
        vote: Vote,
    ) -> Result<Settlement> {
        if let Some(refusal) = ticket.refusal(voter) {
            return Ok(refusal);
        }

        let id = self.resolve(ticket.entry(), ticket.short())?;
        self.apply_vote(id, vote)?;
        ticket.mark_settled(vote);
        Ok(Settlement::Recorded(vote))
    }

    /// Attach a past message to an entry, or to nonsense with `ignore`.
    pub fn teach(&mut self, prior_text: &str, label: &str) -> Result<TeachOutcome> {
        let label = label.trim().to_lowercase();

        let outcome = if label == RESERVED_SHORT {
            let added = self.corpus.add_nonsense(prior_text)?;
            if added {
                info!(
                    "The message '{}' was added to the nonsense dataset of '{}'",
                    prior_text,
                    self.topic()
                );
            }
            TeachOutcome::Ignored { added }
        } else {
            let (id, _) = self.corpus.entry_by_short(&label).ok_or_else(|| {
                Error::EntryNotFound(format!("'{}' in topic '{}'", label, self.topic()))
            })?;
            let added = self.corpus.append_message(id, prior_text)?;
            let entry = self.require(id)?;
            if added {
                info!(
                    "The message '{}' was added to the '{}' dataset",
                    prior_text, entry.short
                );
            }
            TeachOutcome::Linked {
                entry: id,
                short: entry.short.clone(),
                answer: entry.answer.clone(),
                added,
            }
        };

        self.dirty = true;
        self.refit()?;
        Ok(outcome)
    }

    pub fn create_entry(&mut self, answer: &str, short: &str) -> Result<Change<EntryId>> {
        let short = validate_short(short)?;
        let answer = validate_answer(answer)?;

        let change = self.corpus.add_entry(&answer, &short)?;
        if change.is_applied() {
            self.dirty = true;
            self.refit()?;
        }
        Ok(change)
    }

    /// Rename and/or reword an entry. The phrase set is untouched, so no refit.
    pub fn edit_entry(
        &mut self,
        short: &str,
        new_short: Option<&str>,
        new_answer: Option<&str>,
    ) -> Result<Change<()>> {
        let id = self.id_by_short(short)?;
        let new_short = new_short.map(validate_short).transpose()?;
        let new_answer = new_answer.map(validate_answer).transpose()?;

        self.corpus
            .edit_entry(id, new_short.as_deref(), new_answer.as_deref())
    }

    /// Delete by short. Later entries shift down, see [`EntryId`].
    pub fn delete_entry(&mut self, short: &str) -> Result<(EntryId, FaqEntry)> {
        let id = self.id_by_short(short)?;
        let removed = self.corpus.delete_entry(id)?;
        self.dirty = true;
        self.refit()?;
        Ok((id, removed))
    }

    /// Undo a delete, putting the entry back at its old position
    pub fn restore_entry(&mut self, id: EntryId, entry: FaqEntry) -> Result<Change<EntryId>> {
        let change = self.corpus.restore_entry(id, entry)?;
        if change.is_applied() {
            self.dirty = true;
            self.refit()?;
        }
        Ok(change)
    }

    /// Re-run repair on the loaded corpus, refitting if it changed anything
    pub fn repair(&mut self) -> Result<bool> {
        let changed = self.corpus.repair()?;
        if changed {
            self.dirty = true;
            self.refit()?;
        }
        Ok(changed)
    }

    pub fn answer_by_short(&self, short: &str) -> Option<&str> {
        self.corpus
            .entry_by_short(short)
            .map(|(_, entry)| entry.answer.as_str())
    }

    pub fn entry_info(&self, short: &str) -> Result<EntryInfo> {
        let id = self.id_by_short(short)?;
        let entry = self.require(id)?;
        Ok(EntryInfo {
            id,
            short: entry.short.clone(),
            answer: entry.answer.clone(),
            up_votes: entry.up_votes,
            down_votes: entry.down_votes,
            messages: entry.messages.len(),
            threshold: self.config.thresholds.threshold_for(entry),
        })
    }

    /// Every entry as `(short, shortened answer)`, sorted by short
    pub fn list_entries(&self) -> Vec<EntryPreview> {
        let mut previews: Vec<EntryPreview> = self
            .corpus
            .entries()
            .iter()
            .map(|entry| EntryPreview {
                short: entry.short.clone(),
                preview: preview(&entry.short, &entry.answer),
            })
            .collect();
        previews.sort_by(|a, b| a.short.cmp(&b.short));
        previews
    }

    /// Predict without any side effects on votes or corpus
    pub fn test_message(&mut self, text: &str) -> Result<TestReport> {
        let prediction = self.predict(text)?;
        let entry = prediction.entry().and_then(|id| self.corpus.entry(id));

        Ok(TestReport {
            prediction,
            short: entry.map(|e| e.short.clone()),
            answer: entry.map(|e| e.answer.clone()),
            threshold: entry.map(|e| self.config.thresholds.threshold_for(e)),
        })
    }

    /// Start walking a chat history batch. One session per topic at a time.
    pub fn begin_expand<I, S>(&mut self, history: I) -> Result<ExpandSession>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self
            .expanding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Validation(format!(
                "an expansion is already running for topic '{}'",
                self.topic()
            )));
        }

        let guard = Arc::clone(&self.expanding);
        ExpandSession::triage(self, history, guard)
    }

    pub fn is_expanding(&self) -> bool {
        self.expanding.load(Ordering::Acquire)
    }

    /// Append without refitting. The engine stays dirty until the next refit.
    pub(crate) fn append_deferred(&mut self, id: EntryId, text: &str) -> Result<bool> {
        let added = self.corpus.append_message(id, text)?;
        self.dirty |= added;
        Ok(added)
    }

    pub(crate) fn ignore_deferred(&mut self, text: &str) -> Result<bool> {
        let added = self.corpus.add_nonsense(text)?;
        self.dirty |= added;
        Ok(added)
    }

    /// Current id of an entry last seen at `id` with `short`
    pub(crate) fn resolve(&self, id: EntryId, short: &str) -> Result<EntryId> {
        match self.corpus.entry(id) {
            Some(entry) if entry.has_short(short) => Ok(id),
            _ => {
                let resolved = self.id_by_short(short)?;
                warn!(
                    "Entry '{}' moved from {} to {} in topic '{}'",
                    short,
                    id,
                    resolved,
                    self.topic()
                );
                Ok(resolved)
            }
        }
    }

    fn id_by_short(&self, short: &str) -> Result<EntryId> {
        self.corpus
            .entry_by_short(short)
            .map(|(id, _)| id)
            .ok_or_else(|| {
                Error::EntryNotFound(format!("'{}' in topic '{}'", short.trim(), self.topic()))
            })
    }

    fn require(&self, id: EntryId) -> Result<&FaqEntry> {
        self.corpus
            .entry(id)
            .ok_or_else(|| Error::EntryNotFound(format!("{} in topic '{}'", id, self.topic())))
    }
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("topic", &self.topic())
            .field("entries", &self.corpus.entries().len())
            .field("classifier", &self.classifier)
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn build_classifier(
    corpus: &CorpusStore,
    embedder: &Arc<dyn Embedder>,
    config: &EngineConfig,
) -> Result<SimilarityClassifier> {
    SimilarityClassifier::build(
        corpus.entries(),
        corpus.nonsense(),
        Arc::clone(embedder),
        corpus.normalizer().clone(),
        config.filter,
    )
}

fn preview(short: &str, answer: &str) -> String {
    let answer: String = answer
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || " .,;:äüöÄÜÖ".contains(*c))
        .collect();

    let short_len = short.chars().count();
    if short_len + answer.chars().count() <= PREVIEW_WIDTH {
        answer
    } else {
        let keep = PREVIEW_WIDTH.saturating_sub(short_len);
        format!("{}...", answer.chars().take(keep).collect::<String>())
    }
}

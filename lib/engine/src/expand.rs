//! Dataset expansion
//!
//! Walks a batch of chat history, proposing every message the classifier
//! links to an entry (threshold ignored) so an operator can confirm it,
//! mark it as nonsense or skip it. Decisions are written to the corpus right
//! away but the classifier is refit only once, when the session finishes.

use crate::engine::MatchingEngine;
use faqx_core::{EntryId, Error, Result};
use faqx_similarity::Prediction;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Operator verdict on a proposed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandDecision {
    /// Add to the predicted entry's phrases
    Add,
    /// Add to nonsense
    Ignore,
    Skip,
}

/// A history message the classifier linked to an entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub entry: EntryId,
    pub short: String,
    pub message: String,
    pub confidence: f32,
}

/// Releases the topic's expansion slot when dropped
struct ExpandLock(Arc<AtomicBool>);

impl Drop for ExpandLock {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ExpandSession {
    topic: String,
    candidates: Vec<Candidate>,
    position: usize,
    processed: usize,
    _lock: ExpandLock,
}

impl ExpandSession {
    /// `slot` must already be claimed by the caller; it is released when the
    /// session (or a failed triage) is dropped.
    pub(crate) fn triage<I, S>(
        engine: &mut MatchingEngine,
        history: I,
        slot: Arc<AtomicBool>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lock = ExpandLock(slot);

        let mut seen = HashSet::new();
        let mut groups: Vec<(EntryId, Vec<Candidate>)> = Vec::new();
        let mut read = 0usize;

        for raw in history {
            read += 1;
            let raw = raw.as_ref();
            let cleaned = engine.corpus().normalizer().clean(raw);

            if cleaned.is_empty()
                || engine.corpus().is_known_message(&cleaned)
                || !seen.insert(cleaned)
            {
                continue;
            }

            let Prediction::Match { entry, confidence } = engine.predict(raw)? else {
                continue;
            };
            let short = engine
                .corpus()
                .entry(entry)
                .map(|e| e.short.clone())
                .unwrap_or_default();

            let candidate = Candidate {
                entry,
                short,
                message: raw.to_string(),
                confidence,
            };
            match groups.iter_mut().find(|(id, _)| *id == entry) {
                Some((_, group)) => group.push(candidate),
                None => groups.push((entry, vec![candidate])),
            }
        }

        let candidates: Vec<Candidate> = groups.into_iter().flat_map(|(_, group)| group).collect();
        info!(
            "Expansion of '{}': read {} messages, {} possible",
            engine.topic(),
            read,
            candidates.len()
        );

        Ok(Self {
            topic: engine.topic().to_string(),
            candidates,
            position: 0,
            processed: 0,
            _lock: lock,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Number of proposed messages
    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    /// Decisions made so far, skips included
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len() - self.position
    }

    pub fn current(&self) -> Option<&Candidate> {
        self.candidates.get(self.position)
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.candidates.len()
    }

    /// Apply a decision to the current candidate and move on
    pub fn decide(
        &mut self,
        engine: &mut MatchingEngine,
        decision: ExpandDecision,
    ) -> Result<Option<&Candidate>> {
        if engine.topic() != self.topic {
            return Err(Error::Validation(format!(
                "expansion session belongs to topic '{}', not '{}'",
                self.topic,
                engine.topic()
            )));
        }

        let Some(candidate) = self.candidates.get(self.position) else {
            return Ok(None);
        };

        match decision {
            ExpandDecision::Add => {
                let id = engine.resolve(candidate.entry, &candidate.short)?;
                if engine.append_deferred(id, &candidate.message)? {
                    info!(
                        "The message '{}' was added to the '{}' dataset",
                        candidate.message, candidate.short
                    );
                }
            }
            ExpandDecision::Ignore => {
                if engine.ignore_deferred(&candidate.message)? {
                    info!(
                        "The message '{}' was added to the nonsense dataset of '{}'",
                        candidate.message, self.topic
                    );
                }
            }
            ExpandDecision::Skip => {
                debug!("Skipped '{}'", candidate.message);
            }
        }

        self.position += 1;
        self.processed += 1;
        Ok(self.current())
    }

    /// Refit once with every accepted decision and release the topic.
    /// Returns the number of processed messages.
    pub fn finish(self, engine: &mut MatchingEngine) -> Result<usize> {
        if engine.topic() != self.topic {
            return Err(Error::Validation(format!(
                "expansion session belongs to topic '{}', not '{}'",
                self.topic,
                engine.topic()
            )));
        }

        if engine.is_dirty() {
            engine.refit()?;
        }
        info!(
            "Expansion of '{}' done, {} message(s) processed",
            self.topic, self.processed
        );
        Ok(self.processed)
    }
}

impl std::fmt::Debug for ExpandSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpandSession")
            .field("topic", &self.topic)
            .field("position", &self.position)
            .field("total", &self.candidates.len())
            .finish()
    }
}

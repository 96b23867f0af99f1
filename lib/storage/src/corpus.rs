//! Per-topic FAQ corpus
//!
//! A [`CorpusStore`] owns one topic's entries and nonsense set. Every
//! mutation is persisted through the shared [`DocumentStore`] before it
//! returns; if the write fails the in-memory state is rolled back, so the
//! store never drifts away from what is on disk.

use crate::document::TopicCorpus;
use crate::manager::DocumentStore;
use faqx_core::{normalize_short, EntryId, Error, FaqEntry, Normalizer, Result, Vote};
use std::sync::Arc;
use tracing::{debug, info};

/// Why an entry operation was declined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Another entry already uses this short
    Short(EntryId),
    /// Another entry already has this exact answer
    Answer(EntryId),
}

/// Result of an operation that can be declined on a uniqueness conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Applied(T),
    Declined(Conflict),
}

impl<T> Change<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Change::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Change::Applied(value) => Some(value),
            Change::Declined(_) => None,
        }
    }
}

pub struct CorpusStore {
    topic: String,
    corpus: TopicCorpus,
    normalizer: Normalizer,
    store: Arc<DocumentStore>,
}

impl CorpusStore {
    /// Load a topic and repair its message lists
    pub fn load(topic: &str, store: Arc<DocumentStore>, normalizer: Normalizer) -> Result<Self> {
        let mut corpus_store = Self {
            topic: topic.to_string(),
            corpus: store.topic(topic),
            normalizer,
            store,
        };
        corpus_store.repair()?;
        Ok(corpus_store)
    }

    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[inline]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    #[inline]
    pub fn corpus(&self) -> &TopicCorpus {
        &self.corpus
    }

    #[inline]
    pub fn entries(&self) -> &[FaqEntry] {
        &self.corpus.entries
    }

    #[inline]
    pub fn nonsense(&self) -> &[String] {
        &self.corpus.nonsense
    }

    pub fn entry(&self, id: EntryId) -> Option<&FaqEntry> {
        self.corpus.entries.get(id.index())
    }

    /// Case-insensitive, trimmed
    pub fn entry_by_short(&self, short: &str) -> Option<(EntryId, &FaqEntry)> {
        let short = normalize_short(short);
        self.corpus
            .entries
            .iter()
            .enumerate()
            .find(|(_, e)| normalize_short(&e.short) == short)
            .map(|(i, e)| (EntryId(i), e))
    }

    /// Exact match
    pub fn entry_by_answer(&self, answer: &str) -> Option<(EntryId, &FaqEntry)> {
        self.corpus
            .entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.answer == answer)
            .map(|(i, e)| (EntryId(i), e))
    }

    /// Whether a cleaned message is already part of any entry or of the nonsense set
    pub fn is_known_message(&self, cleaned: &str) -> bool {
        self.corpus.nonsense.iter().any(|m| m == cleaned)
            || self.corpus.entries.iter().any(|e| e.contains_message(cleaned))
    }

    pub fn add_entry(&mut self, answer: &str, short: &str) -> Result<Change<EntryId>> {
        let entry = FaqEntry::new(short, answer);
        if let Some(conflict) = self.conflict(&entry, None) {
            debug!("Declined new entry '{}' in '{}': {:?}", entry.short, self.topic, conflict);
            return Ok(Change::Declined(conflict));
        }

        let id = EntryId(self.corpus.entries.len());
        let short = entry.short.clone();
        self.commit(|corpus| corpus.entries.push(entry))?;
        info!("Created entry '{}' ({}) in topic '{}'", short, id, self.topic);
        Ok(Change::Applied(id))
    }

    /// Remove an entry. Every later entry's id shifts down by one.
    pub fn delete_entry(&mut self, id: EntryId) -> Result<FaqEntry> {
        self.require(id)?;
        let removed = self.commit(|corpus| corpus.entries.remove(id.index()))?;
        info!("Deleted entry '{}' ({}) from topic '{}'", removed.short, id, self.topic);
        Ok(removed)
    }

    /// Put a previously deleted entry back at its old position
    pub fn restore_entry(&mut self, id: EntryId, entry: FaqEntry) -> Result<Change<EntryId>> {
        if let Some(conflict) = self.conflict(&entry, None) {
            return Ok(Change::Declined(conflict));
        }

        let index = id.index().min(self.corpus.entries.len());
        let short = entry.short.clone();
        self.commit(|corpus| corpus.entries.insert(index, entry))?;
        info!("Restored entry '{}' at {} in topic '{}'", short, EntryId(index), self.topic);
        Ok(Change::Applied(EntryId(index)))
    }

    /// Change an entry's short and/or answer. Messages and votes are kept.
    pub fn edit_entry(
        &mut self,
        id: EntryId,
        short: Option<&str>,
        answer: Option<&str>,
    ) -> Result<Change<()>> {
        let mut edited = self.require(id)?.clone();
        if let Some(short) = short {
            edited.short = normalize_short(short);
        }
        if let Some(answer) = answer {
            edited.answer = answer.to_string();
        }

        if let Some(conflict) = self.conflict(&edited, Some(id)) {
            return Ok(Change::Declined(conflict));
        }
        if self.entry(id) == Some(&edited) {
            return Ok(Change::Applied(()));
        }

        let short = edited.short.clone();
        self.commit(|corpus| corpus.entries[id.index()] = edited)?;
        info!("Edited entry '{}' ({}) in topic '{}'", short, id, self.topic);
        Ok(Change::Applied(()))
    }

    /// Add an example phrasing to an entry. Returns `false` if it was already there.
    pub fn append_message(&mut self, id: EntryId, text: &str) -> Result<bool> {
        self.require(id)?;
        let message = self.clean_required(text)?;

        if self.corpus.entries[id.index()].contains_message(&message) {
            return Ok(false);
        }

        self.commit(|corpus| corpus.entries[id.index()].messages.push(message))?;
        Ok(true)
    }

    /// Add a phrase known to match nothing. Returns `false` if it was already there.
    pub fn add_nonsense(&mut self, text: &str) -> Result<bool> {
        let message = self.clean_required(text)?;

        if self.corpus.nonsense.contains(&message) {
            return Ok(false);
        }

        self.commit(|corpus| corpus.nonsense.push(message))?;
        Ok(true)
    }

    pub fn vote(&mut self, id: EntryId, vote: Vote) -> Result<()> {
        self.require(id)?;
        self.commit(|corpus| corpus.entries[id.index()].apply_vote(vote))
    }

    /// Normalize every stored message, drop empties and duplicates.
    ///
    /// Persists only if something changed. Running it twice is the same as once.
    pub fn repair(&mut self) -> Result<bool> {
        let mut repaired = self.corpus.clone();
        let mut changed = false;

        for entry in &mut repaired.entries {
            changed |= repair_messages(&mut entry.messages, &self.normalizer);
        }
        changed |= repair_messages(&mut repaired.nonsense, &self.normalizer);

        if changed {
            self.commit(|corpus| *corpus = repaired)?;
            info!("Repaired message lists of topic '{}'", self.topic);
        }
        Ok(changed)
    }

    fn require(&self, id: EntryId) -> Result<&FaqEntry> {
        self.entry(id).ok_or_else(|| {
            Error::EntryNotFound(format!("{} in topic '{}'", id, self.topic))
        })
    }

    fn clean_required(&self, text: &str) -> Result<String> {
        let message = self.normalizer.clean(text);
        if message.is_empty() {
            return Err(Error::Validation(
                "message is empty after normalization".to_string(),
            ));
        }
        Ok(message)
    }

    fn conflict(&self, candidate: &FaqEntry, ignore: Option<EntryId>) -> Option<Conflict> {
        let short = normalize_short(&candidate.short);
        let others = self
            .corpus
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(EntryId(*i)) != ignore);

        for (i, entry) in others {
            if normalize_short(&entry.short) == short {
                return Some(Conflict::Short(EntryId(i)));
            }
            if entry.answer == candidate.answer {
                return Some(Conflict::Answer(EntryId(i)));
            }
        }
        None
    }

    /// Apply a mutation and persist it, restoring the previous state if the write fails
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut TopicCorpus) -> T) -> Result<T> {
        let previous = self.corpus.clone();
        let output = mutate(&mut self.corpus);

        if let Err(e) = self.store.commit_topic(&self.topic, &self.corpus) {
            self.corpus = previous;
            return Err(e);
        }
        Ok(output)
    }
}

fn repair_messages(messages: &mut Vec<String>, normalizer: &Normalizer) -> bool {
    let mut repaired: Vec<String> = Vec::with_capacity(messages.len());

    for message in messages.iter() {
        let cleaned = normalizer.clean(message);
        if !cleaned.is_empty() && !repaired.contains(&cleaned) {
            repaired.push(cleaned);
        }
    }

    if repaired != *messages {
        *messages = repaired;
        true
    } else {
        false
    }
}

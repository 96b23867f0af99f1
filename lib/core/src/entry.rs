use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Word reserved for "this message matches nothing" when teaching
pub const RESERVED_SHORT: &str = "ignore";

pub const SHORT_MIN_LEN: usize = 2;
pub const SHORT_MAX_LEN: usize = 15;
pub const ANSWER_MIN_LEN: usize = 10;
pub const ANSWER_MAX_LEN: usize = 500;

/// Position of an entry in its topic's entry list.
///
/// Ids are positional so that existing documents keep working: deleting an
/// entry shifts every later entry down by one. An id obtained before a delete
/// may point at a different entry, or at nothing, afterwards. Resolve by
/// [`FaqEntry::short`] when an id has to outlive a corpus edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

impl EntryId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for EntryId {
    fn from(i: usize) -> Self {
        EntryId(i)
    }
}

/// A canonical answer, its label and the example phrasings that trigger it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default)]
    pub messages: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub up_votes: u64,
    #[serde(default)]
    pub down_votes: u64,
    pub short: String,
}

impl FaqEntry {
    /// A fresh entry: no messages, no votes.
    #[must_use]
    pub fn new(short: &str, answer: &str) -> Self {
        Self {
            messages: Vec::new(),
            answer: answer.to_string(),
            up_votes: 0,
            down_votes: 0,
            short: normalize_short(short),
        }
    }

    #[inline]
    pub fn votes(&self) -> u64 {
        self.up_votes + self.down_votes
    }

    #[inline]
    pub fn contains_message(&self, message: &str) -> bool {
        self.messages.iter().any(|m| m == message)
    }

    /// Case-insensitive, whitespace-insensitive short comparison
    #[inline]
    pub fn has_short(&self, short: &str) -> bool {
        normalize_short(&self.short) == normalize_short(short)
    }

    pub fn apply_vote(&mut self, vote: Vote) {
        match vote {
            Vote::Up => self.up_votes += 1,
            Vote::Down => self.down_votes += 1,
        }
    }
}

/// Binary feedback on a delivered answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}


#[inline]
pub fn normalize_short(short: &str) -> String {
    short.trim().to_lowercase()
}

/// Check a short as typed by an operator, returning its stored form.
pub fn validate_short(short: &str) -> Result<String> {
    let short = normalize_short(short);
    let length = short.chars().count();

    if short.split_whitespace().count() != 1 {
        return Err(Error::Validation(
            "the short must be exactly one word".to_string(),
        ));
    }
    if !(SHORT_MIN_LEN..=SHORT_MAX_LEN).contains(&length) {
        return Err(Error::Validation(format!(
            "the short must be {}-{} characters long",
            SHORT_MIN_LEN, SHORT_MAX_LEN
        )));
    }
    if short == RESERVED_SHORT {
        return Err(Error::Validation(format!(
            "the short '{}' is reserved",
            RESERVED_SHORT
        )));
    }

    Ok(short)
}

pub fn validate_answer(answer: &str) -> Result<String> {
    let answer = answer.trim();
    let length = answer.chars().count();

    if !(ANSWER_MIN_LEN..=ANSWER_MAX_LEN).contains(&length) {
        return Err(Error::Validation(format!(
            "the answer must be {}-{} characters long",
            ANSWER_MIN_LEN, ANSWER_MAX_LEN
        )));
    }

    Ok(answer.to_string())
}

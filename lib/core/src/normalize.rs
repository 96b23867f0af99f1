//! Text normalization
//!
//! Every piece of text that enters the corpus or gets compared against it goes
//! through [`clean`]. The steps, in order:
//!
//! 1. lower-case
//! 2. strip every character outside `[a-z0-9 ]`
//! 3. drop tokens made only of digits (mention ids and the like)
//! 4. drop tokens equal to a fill word
//! 5. collapse runs of spaces and trim
//!
//! The result may be empty, which callers treat as "not classifiable".

use ahash::AHashSet;
use std::sync::Arc;
use tracing::warn;

/// Process-wide stop-word list, shared read-only by every topic
#[derive(Debug, Clone, Default)]
pub struct FillWords {
    ordered: Vec<String>,
    lookup: AHashSet<String>,
}

impl FillWords {
    /// Build the list, running each word through the same character filter as messages.
    ///
    /// Words that clean to nothing or to more than one token can never match a
    /// single token and are skipped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fill_words = Self::default();

        for raw in words {
            let raw = raw.as_ref();
            let word = filter_chars(raw);
            let word = word.trim();

            if word.is_empty() {
                warn!("Ignoring fill word {:?}: nothing left after cleaning", raw);
                continue;
            }
            if word.contains(' ') {
                warn!("Ignoring fill word {:?}: fill words must be a single token", raw);
                continue;
            }
            if fill_words.lookup.insert(word.to_string()) {
                fill_words.ordered.push(word.to_string());
            }
        }

        fill_words
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.lookup.contains(token)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

/// Normalize `text` against `fill_words`.
pub fn clean(text: &str, fill_words: &FillWords) -> String {
    let filtered = filter_chars(text);
    let mut out = String::with_capacity(filtered.len());

    for token in filtered.split(' ').filter(|t| !t.is_empty()) {
        if is_number(token) || fill_words.contains(token) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }

    out
}

/// Cheap handle around the shared fill-word list
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fill_words: Arc<FillWords>,
}

impl Normalizer {
    pub fn new(fill_words: Arc<FillWords>) -> Self {
        Self { fill_words }
    }

    #[inline]
    pub fn clean(&self, text: &str) -> String {
        clean(text, &self.fill_words)
    }
}

fn filter_chars(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

#[inline]
fn is_number(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_digit())
}

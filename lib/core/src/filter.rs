// Cheap validity filter applied before anything gets embedded
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_WORD_COUNT: usize = 3;
pub const MAX_WORD_COUNT: usize = 20;
pub const MAX_WORD_LENGTH: usize = 30;

/// Why a message was not worth classifying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    TooFewWords { count: usize, min: usize },
    TooManyWords { count: usize, max: usize },
    WordTooLong { length: usize, max: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooFewWords { count, min } => {
                write!(f, "too few words ({} < {})", count, min)
            }
            Rejection::TooManyWords { count, max } => {
                write!(f, "too many words ({} > {})", count, max)
            }
            Rejection::WordTooLong { length, max } => {
                write!(f, "word too long ({} > {} characters)", length, max)
            }
        }
    }
}

/// Word count and word length bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MessageFilter {
    pub min_word_count: usize,
    pub max_word_count: usize,
    pub max_word_length: usize,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            min_word_count: MIN_WORD_COUNT,
            max_word_count: MAX_WORD_COUNT,
            max_word_length: MAX_WORD_LENGTH,
        }
    }
}

impl MessageFilter {
    /// Tokens are whitespace separated, lengths are counted in characters.
    pub fn rejection(&self, text: &str) -> Option<Rejection> {
        let mut count = 0;
        let mut longest = 0;

        for word in text.split_whitespace() {
            count += 1;
            longest = longest.max(word.chars().count());
        }

        if count < self.min_word_count {
            Some(Rejection::TooFewWords {
                count,
                min: self.min_word_count,
            })
        } else if count > self.max_word_count {
            Some(Rejection::TooManyWords {
                count,
                max: self.max_word_count,
            })
        } else if longest > self.max_word_length {
            Some(Rejection::WordTooLong {
                length: longest,
                max: self.max_word_length,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(&self, text: &str) -> bool {
        self.rejection(text).is_none()
    }
}

//! Vote-driven confidence thresholds
//!
//! An entry with no votes needs the midpoint of `[min, max]` to fire. Once
//! votes come in, the observed approval ratio is blended with a neutral 0.5
//! prior, weighted by `min(ln(votes), 1)`, so the prior stops mattering from
//! the third vote on. The blended ratio then maps *inversely* onto the range:
//! an entry everybody liked needs only `min` confidence, an entry everybody
//! disliked needs `max`.

use crate::{Error, FaqEntry, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_THRESHOLD: f32 = 0.3;
pub const DEFAULT_MAX_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    min: f32,
    max: f32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_THRESHOLD,
            max: DEFAULT_MAX_THRESHOLD,
        }
    }
}

impl ThresholdPolicy {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::InvalidConfig(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        if min > max {
            return Err(Error::InvalidConfig(format!(
                "min_threshold ({}) must not exceed max_threshold ({})",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[inline]
    pub fn neutral(&self) -> f32 {
        0.5 * self.min + 0.5 * self.max
    }

    /// Weight of the observed ratio against the neutral prior
    #[inline]
    pub fn importance(votes: u64) -> f32 {
        if votes == 0 {
            return 0.0;
        }
        (votes as f32).ln().min(1.0)
    }

    /// Blended approval ratio in [0, 1]; 1 is "always helpful"
    pub fn ratio(up_votes: u64, down_votes: u64) -> f32 {
        let votes = up_votes + down_votes;
        if votes == 0 {
            return 0.5;
        }
        let importance = Self::importance(votes);
        importance * (up_votes as f32 / votes as f32) + (1.0 - importance) * 0.5
    }

    pub fn threshold(&self, up_votes: u64, down_votes: u64) -> f32 {
        if up_votes + down_votes == 0 {
            return self.neutral();
        }
        let ratio = Self::ratio(up_votes, down_votes);
        let threshold = ratio * self.min + (1.0 - ratio) * self.max;
        threshold.clamp(self.min, self.max)
    }

    #[inline]
    pub fn threshold_for(&self, entry: &FaqEntry) -> f32 {
        self.threshold(entry.up_votes, entry.down_votes)
    }
}

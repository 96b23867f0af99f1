//! Deployment configuration
//!
//! Loaded from a JSON document (`config.json`). Every field has a default, so
//! an empty object is a valid configuration.

use crate::filter::{MessageFilter, MAX_WORD_COUNT, MAX_WORD_LENGTH, MIN_WORD_COUNT};
use crate::threshold::{ThresholdPolicy, DEFAULT_MAX_THRESHOLD, DEFAULT_MIN_THRESHOLD};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Settings every topic engine is built with
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub thresholds: ThresholdPolicy,
    pub filter: MessageFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub min_threshold: f32,
    pub max_threshold: f32,
    pub min_word_count: usize,
    pub max_word_count: usize,
    pub max_word_length: usize,
    /// Location of the corpus document, relative paths resolve against the config file
    pub data_file: PathBuf,
    /// guild id -> channel id -> topic
    pub activated_channels: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_threshold: DEFAULT_MIN_THRESHOLD,
            max_threshold: DEFAULT_MAX_THRESHOLD,
            min_word_count: MIN_WORD_COUNT,
            max_word_count: MAX_WORD_COUNT,
            max_word_length: MAX_WORD_LENGTH,
            data_file: PathBuf::from("data.json"),
            activated_channels: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&raw)?;

        if config.data_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.data_file = dir.join(&config.data_file);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_threshold) || !(0.0..=1.0).contains(&self.max_threshold) {
            return Err(Error::InvalidConfig(format!(
                "thresholds must lie in [0, 1], got [{}, {}]",
                self.min_threshold, self.max_threshold
            )));
        }
        ThresholdPolicy::new(self.min_threshold, self.max_threshold)?;

        if self.min_word_count == 0 || self.min_word_count > self.max_word_count {
            return Err(Error::InvalidConfig(format!(
                "word count bounds [{}, {}] are not a valid range",
                self.min_word_count, self.max_word_count
            )));
        }
        if self.max_word_length == 0 {
            return Err(Error::InvalidConfig(
                "max_word_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        self.validate()?;
        Ok(EngineConfig {
            thresholds: ThresholdPolicy::new(self.min_threshold, self.max_threshold)?,
            filter: MessageFilter {
                min_word_count: self.min_word_count,
                max_word_count: self.max_word_count,
                max_word_length: self.max_word_length,
            },
        })
    }

    /// Distinct topics across all activated channels, sorted
    pub fn topics(&self) -> Vec<String> {
        self.activated_channels
            .values()
            .flat_map(|channels| channels.values().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn topic_for(&self, guild: &str, channel: &str) -> Option<&str> {
        self.activated_channels
            .get(guild)
            .and_then(|channels| channels.get(channel))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        let engine = config.engine_config().unwrap();
        assert!((engine.thresholds.neutral() - 0.5).abs() < 1e-6);
        assert_eq!(engine.filter, MessageFilter::default());
    }

    #[test]
    fn test_topic_routing() {
        let config: Config = serde_json::from_str(
            r#"{
                "activated_channels": {
                    "100": {"1": "support", "2": "modding"},
                    "200": {"3": "support"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.topics(), vec!["modding", "support"]);
        assert_eq!(config.topic_for("100", "2"), Some("modding"));
        assert_eq!(config.topic_for("200", "1"), None);
        assert_eq!(config.topic_for("300", "1"), None);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = Config {
            min_threshold: 0.9,
            max_threshold: 0.1,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            max_threshold: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_word_bounds() {
        let config = Config {
            min_word_count: 10,
            max_word_count: 5,
            ..Config::default()
        };
        assert!(config.engine_config().is_err());
    }

    #[test]
    fn test_load_resolves_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"data_file": "corpus.json", "min_threshold": 0.2}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_file, dir.path().join("corpus.json"));
        assert!((config.min_threshold - 0.2).abs() < 1e-6);
    }
}

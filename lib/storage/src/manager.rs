use crate::document::{CorpusDocument, TopicCorpus};
use crate::persistence::DocumentBackend;
use faqx_core::{FillWords, Result};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Owns the single in-memory corpus document shared by every topic.
///
/// Topics commit only their own slice; the whole document is written under
/// the lock so that concurrent topics never clobber each other's edits.
pub struct DocumentStore {
    backend: Box<dyn DocumentBackend>,
    document: RwLock<CorpusDocument>,
}

impl DocumentStore {
    pub fn open(backend: Box<dyn DocumentBackend>) -> Result<Self> {
        let document = match backend.load()? {
            Some(document) => {
                info!(
                    "Loaded corpus document from {} ({} topics)",
                    backend.describe(),
                    document.topics().len()
                );
                document
            }
            None => {
                warn!("No corpus document at {}, starting empty", backend.describe());
                CorpusDocument::default()
            }
        };

        Ok(Self {
            backend,
            document: RwLock::new(document),
        })
    }

    /// Re-read the document from the backend, dropping in-memory state
    pub fn reload(&self) -> Result<()> {
        let document = self.backend.load()?.unwrap_or_default();
        *self.document.write() = document;
        info!("Reloaded corpus document from {}", self.backend.describe());
        Ok(())
    }

    pub fn fill_words(&self) -> FillWords {
        FillWords::new(&self.document.read().fill_words)
    }

    pub fn topic(&self, topic: &str) -> TopicCorpus {
        self.document.read().topic(topic)
    }

    pub fn topics(&self) -> Vec<String> {
        self.document.read().topics()
    }

    /// The stored spelling of `name`, matched case-insensitively.
    /// An exact match wins over a case-folded one.
    pub fn find_topic(&self, name: &str) -> Option<String> {
        let document = self.document.read();
        if document.contains_topic(name) {
            return Some(name.to_string());
        }
        let folded = name.to_lowercase();
        document
            .topics()
            .into_iter()
            .find(|topic| topic.to_lowercase() == folded)
    }

    pub fn snapshot(&self) -> CorpusDocument {
        self.document.read().clone()
    }

    /// Persist one topic's slice. On failure the in-memory document keeps
    /// the last successfully written state.
    pub fn commit_topic(&self, topic: &str, corpus: &TopicCorpus) -> Result<()> {
        let mut document = self.document.write();
        let previous = document.replace_topic(topic, corpus.clone());

        if let Err(e) = self.backend.save(&document) {
            match previous {
                Some(previous) => {
                    document.replace_topic(topic, previous);
                }
                None => document.remove_topic(topic),
            }
            warn!("Failed to persist topic '{}': {}", topic, e);
            return Err(e);
        }

        debug!("Persisted topic '{}' to {}", topic, self.backend.describe());
        Ok(())
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("backend", &self.backend.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use std::sync::Arc;
    use faqx_core::{Error, FaqEntry};

    fn corpus(short: &str) -> TopicCorpus {
        TopicCorpus {
            entries: vec![FaqEntry::new(short, "Some answer that is long enough.")],
            nonsense: Vec::new(),
        }
    }

    #[test]
    fn test_topics_do_not_clobber_each_other() {
        let store = DocumentStore::open(Box::new(MemoryBackend::new())).unwrap();
        store.commit_topic("support", &corpus("refund")).unwrap();
        store.commit_topic("modding", &corpus("mods")).unwrap();

        assert_eq!(store.topic("support"), corpus("refund"));
        assert_eq!(store.topic("modding"), corpus("mods"));
        assert_eq!(store.topics(), vec!["modding", "support"]);
    }

    #[test]
    fn test_failed_commit_keeps_previous_state() {
        let backend = Arc::new(MemoryBackend::new());
        let store = DocumentStore::open(Box::new(backend.clone())).unwrap();
        store.commit_topic("support", &corpus("refund")).unwrap();

        backend.set_fail_writes(true);
        let err = store.commit_topic("support", &corpus("other")).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(store.topic("support"), corpus("refund"));
    }

    #[test]
    fn test_failed_first_write_leaves_no_topic_behind() {
        let backend = Arc::new(MemoryBackend::new());
        let store = DocumentStore::open(Box::new(Arc::clone(&backend))).unwrap();

        backend.set_fail_writes(true);
        assert!(store.commit_topic("support", &corpus("refund")).is_err());
        assert!(store.topics().is_empty());

        backend.set_fail_writes(false);
        store.commit_topic("modding", &corpus("mods")).unwrap();
        let saved = backend.snapshot().unwrap();
        assert!(!saved.faq.contains_key("support"));
        assert!(!saved.nonsense.contains_key("support"));
    }

    #[test]
    fn test_find_topic_keeps_stored_spelling() {
        let store = DocumentStore::open(Box::new(MemoryBackend::new())).unwrap();
        store.commit_topic("Minecraft", &corpus("mods")).unwrap();

        assert_eq!(store.find_topic("minecraft").as_deref(), Some("Minecraft"));
        assert_eq!(store.find_topic("Minecraft").as_deref(), Some("Minecraft"));
        assert_eq!(store.find_topic("terraria"), None);
    }

    #[test]
    fn test_fill_words_come_from_document() {
        let document = CorpusDocument {
            fill_words: vec!["The".to_string(), "uh".to_string()],
            ..Default::default()
        };
        let store = DocumentStore::open(Box::new(MemoryBackend::with_document(document))).unwrap();
        let fill_words = store.fill_words();
        assert!(fill_words.contains("the"));
        assert!(fill_words.contains("uh"));
    }
}

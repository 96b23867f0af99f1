use faqx_core::FaqEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The persisted corpus document, keyed by topic
///
/// Entry order inside a topic is significant: entry ids are positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct CorpusDocument {
    pub fill_words: Vec<String>,
    pub faq: BTreeMap<String, Vec<FaqEntry>>,
    pub nonsense: BTreeMap<String, Vec<String>>,
}

/// Older documents keep one nonsense list for the whole deployment
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNonsense {
    PerTopic(BTreeMap<String, Vec<String>>),
    Shared(Vec<String>),
}

impl Default for RawNonsense {
    fn default() -> Self {
        RawNonsense::PerTopic(BTreeMap::new())
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    fill_words: Vec<String>,
    #[serde(default)]
    faq: BTreeMap<String, Vec<FaqEntry>>,
    #[serde(default)]
    nonsense: RawNonsense,
}

impl From<RawDocument> for CorpusDocument {
    fn from(raw: RawDocument) -> Self {
        let nonsense = match raw.nonsense {
            RawNonsense::PerTopic(nonsense) => nonsense,
            // every topic starts from the shared list
            RawNonsense::Shared(shared) => raw
                .faq
                .keys()
                .map(|topic| (topic.clone(), shared.clone()))
                .collect(),
        };

        Self {
            fill_words: raw.fill_words,
            faq: raw.faq,
            nonsense,
        }
    }
}

/// One topic's slice of the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicCorpus {
    pub entries: Vec<FaqEntry>,
    pub nonsense: Vec<String>,
}

impl TopicCorpus {
    pub fn message_count(&self) -> usize {
        self.nonsense.len() + self.entries.iter().map(|e| e.messages.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.message_count() == 0
    }
}

impl CorpusDocument {
    pub fn topic(&self, topic: &str) -> TopicCorpus {
        TopicCorpus {
            entries: self.faq.get(topic).cloned().unwrap_or_default(),
            nonsense: self.nonsense.get(topic).cloned().unwrap_or_default(),
        }
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.faq.contains_key(topic) || self.nonsense.contains_key(topic)
    }

    /// Replace a topic's slice, returning the previous one if the topic existed
    pub fn replace_topic(&mut self, topic: &str, corpus: TopicCorpus) -> Option<TopicCorpus> {
        let previous = self.contains_topic(topic).then(|| self.topic(topic));
        self.faq.insert(topic.to_string(), corpus.entries);
        self.nonsense.insert(topic.to_string(), corpus.nonsense);
        previous
    }

    pub fn remove_topic(&mut self, topic: &str) {
        self.faq.remove(topic);
        self.nonsense.remove(topic);
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.faq.keys().chain(self.nonsense.keys()).cloned().collect();
        topics.sort();
        topics.dedup();
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_round_trip_keeps_entry_order() {
        let raw = r#"{
            "fill_words": ["the"],
            "faq": {
                "support": [
                    {"messages": ["how refund"], "answer": "Refunds take five days.", "up_votes": 2, "down_votes": 1, "short": "refund"},
                    {"messages": [], "answer": "Restart the launcher.", "up_votes": 0, "down_votes": 0, "short": "restart"}
                ]
            },
            "nonsense": {"support": ["good morning everyone"]}
        }"#;

        let doc: CorpusDocument = serde_json::from_str(raw).unwrap();
        let again: CorpusDocument =
            serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(doc, again);

        let support = doc.topic("support");
        assert_eq!(support.entries[0].short, "refund");
        assert_eq!(support.entries[1].short, "restart");
        assert_eq!(support.message_count(), 2);
    }

    #[test]
    fn test_missing_topic_is_empty() {
        let doc = CorpusDocument::default();
        assert!(doc.topic("nowhere").is_empty());
    }

    #[test]
    fn test_replace_topic() {
        let mut doc = CorpusDocument::default();
        let corpus = TopicCorpus {
            entries: vec![FaqEntry::new("refund", "Refunds take five days.")],
            nonsense: vec!["hello there friends".to_string()],
        };
        let previous = doc.replace_topic("support", corpus.clone());
        assert!(previous.is_none());
        assert_eq!(doc.topic("support"), corpus);
        assert_eq!(doc.topics(), vec!["support"]);

        let previous = doc.replace_topic("support", TopicCorpus::default());
        assert_eq!(previous, Some(corpus));

        doc.remove_topic("support");
        assert!(!doc.contains_topic("support"));
        assert!(doc.topics().is_empty());
    }

    #[test]
    fn test_shared_nonsense_list_is_copied_to_every_topic() {
        let raw = r#"{
            "fill_words": [],
            "faq": {
                "Minecraft": [{"messages": [], "answer": "Mods go in the mods folder.", "up_votes": 0, "down_votes": 0, "short": "mods"}],
                "support": []
            },
            "nonsense": ["good morning everyone", "who is online"]
        }"#;

        let doc: CorpusDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.topic("Minecraft").nonsense, vec!["good morning everyone", "who is online"]);
        assert_eq!(doc.topic("support").nonsense.len(), 2);

        // written back in the per-topic form
        let written = serde_json::to_value(&doc).unwrap();
        assert!(written["nonsense"].is_object());
        assert_eq!(written["nonsense"]["support"][1], "who is online");
    }
}

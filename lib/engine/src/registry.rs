use crate::engine::MatchingEngine;
use faqx_core::{Config, EngineConfig, Error, Normalizer, Result};
use faqx_similarity::Embedder;
use faqx_storage::{DocumentStore, JsonFileBackend};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// One topic's engine. Work on a topic is serialized through its mutex;
/// different topics proceed independently.
pub type SharedEngine = Arc<Mutex<MatchingEngine>>;

struct TopicSlot {
    /// Spelling used as the document key
    name: String,
    engine: SharedEngine,
}

/// Owns every topic engine of a deployment.
///
/// Built once by the host and passed to whatever handles messages and
/// operator commands. The corpus document and the embedding model are
/// shared read-only across topics.
///
/// Topic names are matched case-insensitively. A topic that already exists in
/// the document keeps its stored spelling.
pub struct TopicRegistry {
    store: Arc<DocumentStore>,
    embedder: Arc<dyn Embedder>,
    config: EngineConfig,
    engines: RwLock<HashMap<String, TopicSlot>>,
}

impl TopicRegistry {
    /// An empty registry; call [`TopicRegistry::load`] to build engines
    pub fn new(store: Arc<DocumentStore>, embedder: Arc<dyn Embedder>, config: EngineConfig) -> Self {
        Self {
            store,
            embedder,
            config,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Open the configured data file and build an engine for every topic
    /// that is either routed to in `config` or present in the document.
    pub fn open(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let engine_config = config.engine_config()?;
        let backend = JsonFileBackend::new(&config.data_file);
        let store = Arc::new(DocumentStore::open(Box::new(backend))?);

        let topics: Vec<String> = store.topics().into_iter().chain(config.topics()).collect();

        let registry = Self::new(store, embedder, engine_config);
        registry.load(topics)?;
        Ok(registry)
    }

    /// Build (or rebuild) engines for `topics`, fitted in parallel.
    ///
    /// A topic that is already loaded is rebuilt in place, so handles
    /// obtained from [`TopicRegistry::engine`] stay valid.
    pub fn load<I, S>(&self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut wanted: BTreeMap<String, String> = BTreeMap::new();
        for topic in topics {
            let name = self.resolve_name(topic.as_ref());
            if !name.is_empty() {
                wanted.entry(fold(&name)).or_insert(name);
            }
        }
        let normalizer = Normalizer::new(Arc::new(self.store.fill_words()));

        let built = wanted
            .par_iter()
            .map(|(key, name)| -> Result<(String, String, MatchingEngine)> {
                let engine = self.build_engine(name, normalizer.clone())?;
                Ok((key.clone(), name.clone(), engine))
            })
            .collect::<Result<Vec<_>>>()?;

        let count = built.len();
        let mut rebuilt = Vec::new();
        {
            let mut engines = self.engines.write();
            for (key, name, engine) in built {
                match engines.get_mut(&key) {
                    Some(slot) => {
                        slot.name = name;
                        rebuilt.push((Arc::clone(&slot.engine), engine));
                    }
                    None => {
                        let engine = Arc::new(Mutex::new(engine));
                        engines.insert(key, TopicSlot { name, engine });
                    }
                }
            }
        }
        // the map lock is released first, a host may hold an engine while looking up another
        for (shared, engine) in rebuilt {
            *shared.lock() = engine;
        }

        info!("Loaded {} topics with {}", count, self.embedder.model_name());
        Ok(())
    }

    /// Re-read the document from disk, then repair and refit every loaded
    /// topic and every topic the document now contains
    pub fn reload(&self) -> Result<()> {
        self.store.reload()?;
        let topics: Vec<String> = self.topics().into_iter().chain(self.store.topics()).collect();
        self.load(topics)
    }

    pub fn engine(&self, topic: &str) -> Result<SharedEngine> {
        self.engines
            .read()
            .get(&fold(topic))
            .map(|slot| Arc::clone(&slot.engine))
            .ok_or_else(|| Error::TopicNotFound(topic.trim().to_string()))
    }

    /// Like [`TopicRegistry::engine`], creating an empty topic if it does not exist yet
    pub fn ensure_topic(&self, topic: &str) -> Result<SharedEngine> {
        let name = self.resolve_name(topic);
        if name.is_empty() {
            return Err(Error::Validation("topic name is empty".to_string()));
        }
        let key = fold(&name);
        if let Some(slot) = self.engines.read().get(&key) {
            return Ok(Arc::clone(&slot.engine));
        }

        let normalizer = Normalizer::new(Arc::new(self.store.fill_words()));
        let engine = Arc::new(Mutex::new(self.build_engine(&name, normalizer)?));

        let mut engines = self.engines.write();
        let slot = engines.entry(key).or_insert_with(|| {
            info!("Created topic '{}'", name);
            TopicSlot { name, engine }
        });
        Ok(Arc::clone(&slot.engine))
    }

    /// Loaded topics as stored, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.engines.read().values().map(|s| s.name.clone()).collect();
        topics.sort();
        topics
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Trimmed, and spelled the way the document already stores it
    fn resolve_name(&self, topic: &str) -> String {
        let topic = topic.trim();
        self.store
            .find_topic(topic)
            .unwrap_or_else(|| topic.to_string())
    }

    fn build_engine(&self, topic: &str, normalizer: Normalizer) -> Result<MatchingEngine> {
        MatchingEngine::new(
            topic,
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            normalizer,
            self.config,
        )
    }
}

impl std::fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("store", &self.store)
            .field("embedder", &self.embedder.model_name())
            .field("topics", &self.topics())
            .finish()
    }
}

#[inline]
fn fold(topic: &str) -> String {
    topic.trim().to_lowercase()
}

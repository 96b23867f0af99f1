// Integration tests for faqx
use faqx::{
    clean, Change, Config, CorpusDocument, Decision, DocumentBackend, DocumentStore, Embedder,
    EngineConfig, EntryId, Error, ExpandDecision, FaqEntry, FillWords, HashEmbedder,
    JsonFileBackend, Label, MatchingEngine, MemoryBackend, Normalizer, Result, Settlement,
    TopicRegistry, Vector, Vote,
};
use rand::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const DIM: usize = 8;

/// Returns fixed vectors for known texts and hashed vectors for everything else
struct FixedEmbedder {
    fixed: HashMap<String, Vector>,
    fallback: HashEmbedder,
}

impl FixedEmbedder {
    fn new(fixed: &[(&str, Vec<f32>)]) -> Self {
        Self {
            fixed: fixed
                .iter()
                .map(|(text, data)| (text.to_string(), Vector::new(data.clone())))
                .collect(),
            fallback: HashEmbedder::new(DIM),
        }
    }
}

impl Embedder for FixedEmbedder {
    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dim(&self) -> usize {
        DIM
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        texts
            .iter()
            .map(|text| match self.fixed.get(*text) {
                Some(vector) => Ok(vector.clone()),
                None => self.fallback.embed(text),
            })
            .collect()
    }
}

/// Unit vector whose cosine with `axis(0)` is `cos`
fn at_angle(cos: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[0] = cos;
    v[1] = (1.0 - cos * cos).sqrt();
    v
}

fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i] = 1.0;
    v
}

fn entry(short: &str, answer: &str, messages: &[&str]) -> FaqEntry {
    let mut entry = FaqEntry::new(short, answer);
    entry.messages = messages.iter().map(|m| m.to_string()).collect();
    entry
}

fn engine(entries: Vec<FaqEntry>, embedder: Arc<dyn Embedder>) -> (MatchingEngine, Arc<MemoryBackend>) {
    let mut document = CorpusDocument::default();
    document.faq.insert("support".to_string(), entries);

    let backend = Arc::new(MemoryBackend::with_document(document));
    let store = Arc::new(DocumentStore::open(Box::new(backend.clone())).unwrap());
    let engine = MatchingEngine::new(
        "support",
        store,
        embedder,
        Normalizer::default(),
        EngineConfig::default(),
    )
    .unwrap();
    (engine, backend)
}

fn refund_embedder() -> Arc<dyn Embedder> {
    Arc::new(FixedEmbedder::new(&[
        ("how do i get refund", axis(0)),
        ("i want refund for this thing please", at_angle(0.82)),
        ("can i have my money back", at_angle(0.45)),
        ("is refund possible for me", at_angle(0.6)),
    ]))
}

#[test]
fn test_confident_match_is_answered() {
    let (mut engine, _) = engine(
        vec![entry("refund", "Refunds take five business days.", &["how do i get refund"])],
        refund_embedder(),
    );

    let decision = engine
        .check_message("I want refund for this thing please", "alice")
        .unwrap();
    let Decision::Answer {
        answer,
        confidence,
        threshold,
        ticket,
    } = decision
    else {
        panic!("expected an answer");
    };

    assert_eq!(answer, "Refunds take five business days.");
    assert!((confidence - 0.82).abs() < 1e-4);
    assert!((threshold - 0.5).abs() < 1e-6);
    assert_eq!(ticket.entry(), EntryId(0));
}

#[test]
fn test_up_votes_lower_the_bar() {
    let (mut engine, backend) = engine(
        vec![entry("refund", "Refunds take five business days.", &["how do i get refund"])],
        refund_embedder(),
    );

    let decision = engine.check_message("can I have my money back", "bob").unwrap();
    let Decision::Suppressed { confidence, threshold, .. } = decision else {
        panic!("expected suppression");
    };
    assert!((confidence - 0.45).abs() < 1e-4);
    assert!((threshold - 0.5).abs() < 1e-6);

    for _ in 0..5 {
        engine.apply_vote(EntryId(0), Vote::Up).unwrap();
    }
    assert!((engine.threshold_for(EntryId(0)).unwrap() - 0.3).abs() < 1e-6);

    let decision = engine.check_message("can I have my money back", "bob").unwrap();
    let Decision::Answer { mut ticket, .. } = decision else {
        panic!("expected an answer");
    };
    assert_eq!(
        engine.settle(&mut ticket, "bob", Vote::Up).unwrap(),
        Settlement::Recorded(Vote::Up)
    );

    let snapshot = backend.snapshot().unwrap();
    let stored = &snapshot.faq["support"][0];
    assert_eq!((stored.up_votes, stored.down_votes), (6, 0));
}

#[test]
fn test_down_votes_raise_the_bar() {
    let (mut engine, _) = engine(
        vec![entry("refund", "Refunds take five business days.", &["how do i get refund"])],
        refund_embedder(),
    );

    assert!(engine
        .check_message("is refund possible for me", "alice")
        .unwrap()
        .is_answer());

    for _ in 0..3 {
        engine.apply_vote(EntryId(0), Vote::Down).unwrap();
    }
    assert!((engine.threshold_for(EntryId(0)).unwrap() - 0.7).abs() < 1e-6);
    assert!(matches!(
        engine.check_message("is refund possible for me", "alice").unwrap(),
        Decision::Suppressed { .. }
    ));
}

#[test]
fn test_teach_ignore_turns_message_into_no_match() {
    let (mut engine, _) = engine(
        vec![entry("refund", "Refunds take five business days.", &["how do i get refund"])],
        refund_embedder(),
    );
    let before = engine.classifier();

    engine.teach("Hello there, how are you?", "ignore").unwrap();

    assert!(!Arc::ptr_eq(&before, &engine.classifier()));
    assert_eq!(engine.corpus().nonsense(), ["hello there how are you"]);
    let prediction = engine.predict("hello there how are you").unwrap();
    assert_eq!(prediction.label(), Some(Label::NoMatch));
    assert!(prediction.confidence().unwrap() > 0.99);
    assert_eq!(
        engine.check_message("hello there how are you", "alice").unwrap(),
        Decision::NoMatch {
            confidence: prediction.confidence().unwrap()
        }
    );
}

#[test]
fn test_delete_shifts_ids() {
    let embedder: Arc<dyn Embedder> = Arc::new(FixedEmbedder::new(&[
        ("first entry phrase here", axis(0)),
        ("second entry phrase here", axis(1)),
        ("third entry phrase here", axis(2)),
    ]));
    let (mut engine, _) = engine(
        vec![
            entry("first", "The first answer text.", &["first entry phrase here"]),
            entry("second", "The second answer text.", &["second entry phrase here"]),
            entry("third", "The third answer text.", &["third entry phrase here"]),
        ],
        embedder,
    );
    let stale = EntryId(2);
    assert_eq!(engine.predict("third entry phrase here").unwrap().entry(), Some(stale));

    let (id, _) = engine.delete_entry("first").unwrap();
    assert_eq!(id, EntryId(0));

    assert_eq!(engine.corpus().entry(EntryId(0)).unwrap().short, "second");
    assert_eq!(engine.corpus().entry(EntryId(1)).unwrap().short, "third");
    assert_eq!(
        engine.predict("third entry phrase here").unwrap().entry(),
        Some(EntryId(1))
    );

    assert!(matches!(engine.threshold_for(stale), Err(Error::EntryNotFound(_))));
    assert!(matches!(
        engine.apply_vote(stale, Vote::Up),
        Err(Error::EntryNotFound(_))
    ));
}

#[test]
fn test_duplicate_short_or_answer_is_declined() {
    let (mut engine, backend) = engine(
        vec![entry("refund", "Refunds take five business days.", &["how do i get refund"])],
        refund_embedder(),
    );
    let before = backend.snapshot();

    let same_short = engine.create_entry("A completely different answer.", "Refund").unwrap();
    let same_answer = engine.create_entry("Refunds take five business days.", "money").unwrap();

    assert!(matches!(same_short, Change::Declined(_)));
    assert!(matches!(same_answer, Change::Declined(_)));
    assert_eq!(backend.snapshot(), before);
    assert_eq!(engine.corpus().entries().len(), 1);
}

#[test]
fn test_failed_write_rolls_back() {
    let (mut engine, backend) = engine(
        vec![entry("refund", "Refunds take five business days.", &["how do i get refund"])],
        refund_embedder(),
    );

    backend.set_fail_writes(true);
    assert!(matches!(
        engine.apply_vote(EntryId(0), Vote::Up),
        Err(Error::Persistence(_))
    ));
    assert!(matches!(
        engine.create_entry("Updates install overnight.", "update"),
        Err(Error::Persistence(_))
    ));
    assert_eq!(engine.corpus().entries().len(), 1);
    assert_eq!(engine.corpus().entries()[0].up_votes, 0);

    backend.set_fail_writes(false);
    engine.apply_vote(EntryId(0), Vote::Up).unwrap();
    assert_eq!(backend.snapshot().unwrap().faq["support"][0].up_votes, 1);
}

#[test]
fn test_json_document_round_trip_and_repair() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("data.json");
    std::fs::write(
        &data_file,
        r#"{
            "fill_words": ["the", "a"],
            "faq": {
                "support": [
                    {"short": "refund", "answer": "Refunds take five business days.",
                     "messages": ["How do I get THE refund?", "how do i get refund", "", "<@1234>"],
                     "up_votes": 3, "down_votes": 1},
                    {"short": "logs", "answer": "Logs live in the launcher folder.",
                     "messages": ["where are the log files"]}
                ]
            },
            "nonsense": {"support": ["Good morning!", "good   morning"]}
        }"#,
    )
    .unwrap();

    let config = Config {
        data_file: data_file.clone(),
        ..Config::default()
    };
    let registry = TopicRegistry::open(&config, Arc::new(HashEmbedder::default())).unwrap();
    let engine = registry.engine("support").unwrap();

    {
        let engine = engine.lock();
        let refund = engine.corpus().entry(EntryId(0)).unwrap();
        assert_eq!(refund.messages, vec!["how do i get refund"]);
        assert_eq!((refund.up_votes, refund.down_votes), (3, 1));
        assert_eq!(engine.corpus().entries()[1].messages, vec!["where are log files"]);
        assert_eq!(engine.corpus().nonsense(), ["good morning"]);
    }

    let repaired = std::fs::read_to_string(&data_file).unwrap();
    assert!(!engine.lock().repair().unwrap());
    assert_eq!(std::fs::read_to_string(&data_file).unwrap(), repaired);

    let on_disk = JsonFileBackend::new(&data_file).load().unwrap().unwrap();
    assert_eq!(on_disk, registry.store().snapshot());
    assert_eq!(on_disk.faq["support"][0].short, "refund");
    assert_eq!(on_disk.faq["support"][1].short, "logs");
}

#[test]
fn test_open_document_with_shared_nonsense_and_mixed_case_topic() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("data.json");
    std::fs::write(
        &data_file,
        r#"{
            "fill_words": ["the"],
            "faq": {
                "Minecraft": [
                    {"messages": ["how do i get refund"], "answer": "Refunds take five business days.",
                     "up_votes": 0, "down_votes": 0, "short": "refund"}
                ]
            },
            "nonsense": ["good morning everyone"]
        }"#,
    )
    .unwrap();

    let config: Config = serde_json::from_str(
        r#"{"activated_channels": {"100": {"1": "Minecraft"}}}"#,
    )
    .unwrap();
    let config = Config {
        data_file: data_file.clone(),
        ..config
    };
    let registry = TopicRegistry::open(&config, Arc::new(HashEmbedder::default())).unwrap();
    assert_eq!(registry.topics(), vec!["Minecraft"]);

    let topic = config.topic_for("100", "1").unwrap();
    let engine = registry.engine(topic).unwrap();
    let mut engine = engine.lock();
    assert_eq!(engine.corpus().entries().len(), 1);
    assert_eq!(engine.corpus().nonsense(), ["good morning everyone"]);
    assert!(engine.check_message("how do i get refund", "alice").unwrap().is_answer());
    assert!(matches!(
        engine.check_message("good morning everyone", "alice").unwrap(),
        Decision::NoMatch { .. }
    ));

    engine.teach("my refund never arrived", "refund").unwrap();
    let on_disk = JsonFileBackend::new(&data_file).load().unwrap().unwrap();
    assert_eq!(on_disk.faq.keys().collect::<Vec<_>>(), vec!["Minecraft"]);
    assert_eq!(on_disk.faq["Minecraft"][0].messages.len(), 2);
    assert_eq!(on_disk.nonsense["Minecraft"], vec!["good morning everyone"]);
}

#[test]
fn test_expansion_round() {
    let (mut engine, _) = engine(
        vec![
            entry("refund", "Refunds take five business days.", &["how do i get refund"]),
            entry("crash", "Delete the mods folder and restart.", &["game crashes on startup"]),
        ],
        Arc::new(HashEmbedder::default()),
    );

    let mut session = engine
        .begin_expand([
            "how do i get refund",
            "game crashes on startup every time",
            "how do i get refund today",
        ])
        .unwrap();
    assert_eq!(session.total(), 2);

    while let Some(candidate) = session.current().cloned() {
        let decision = if candidate.short == "crash" {
            ExpandDecision::Add
        } else {
            ExpandDecision::Skip
        };
        session.decide(&mut engine, decision).unwrap();
    }
    assert_eq!(session.finish(&mut engine).unwrap(), 2);

    assert_eq!(
        engine.corpus().entry(EntryId(1)).unwrap().messages,
        vec!["game crashes on startup", "game crashes on startup every time"]
    );
    assert_eq!(engine.corpus().entry(EntryId(0)).unwrap().messages.len(), 1);
}

#[test]
fn test_clean_is_idempotent() {
    const ALPHABET: &[char] = &[
        'a', 'B', 'z', 'Q', '0', '7', ' ', ' ', '\t', '!', '?', '<', '@', '>', '-', '_', 'É', 'ß',
        'İ', 'e', 'h', 't',
    ];
    let fill_words = FillWords::new(["the", "a", "eh"]);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..500 {
        let len = rng.random_range(0..40);
        let text: String = (0..len)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
            .collect();

        let once = clean(&text, &fill_words);
        assert_eq!(clean(&once, &fill_words), once, "input {:?}", text);
        assert!(!once.starts_with(' ') && !once.ends_with(' ') && !once.contains("  "));
    }
}

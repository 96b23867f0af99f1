use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use faqx::{Config, Embedder, HashEmbedder, TopicRegistry, Vote};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Operator tool for a faqx corpus
#[derive(Parser, Debug)]
#[command(name = "faqx")]
#[command(about = "Self-calibrating FAQ auto-responder", long_about = None)]
struct Args {
    /// Path to config.json (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Corpus document, overrides `data_file` from the config
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// Sentence embedder
    #[arg(long, value_enum, default_value_t = EmbedderKind::Hash)]
    embedder: EmbedderKind,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Character-trigram hashing, no download
    Hash,
    /// all-MiniLM-L6-v2 (needs the `bert` feature)
    Minilm,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded topics
    Topics,
    /// List the entries of a topic
    List {
        #[arg(long)]
        topic: String,
    },
    /// Show one entry with its votes and current threshold
    Info {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        short: String,
    },
    /// Show the raw prediction for a message
    Test {
        #[arg(long)]
        topic: String,
        message: String,
    },
    /// Run a message through the full pipeline, threshold included
    Check {
        #[arg(long)]
        topic: String,
        message: String,
    },
    /// Create an entry
    Add {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        short: String,
        #[arg(long)]
        answer: String,
    },
    /// Change an entry's short and/or answer
    Edit {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        short: String,
        #[arg(long)]
        new_short: Option<String>,
        #[arg(long)]
        answer: Option<String>,
    },
    /// Delete an entry
    Delete {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        short: String,
    },
    /// Attach a message to an entry, or to nonsense with `--label ignore`
    Teach {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        label: String,
        message: String,
    },
    /// Record a vote for an entry
    Vote {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        short: String,
        #[arg(long, conflicts_with = "down", required_unless_present = "down")]
        up: bool,
        #[arg(long)]
        down: bool,
    },
    /// Repair every topic's message lists (loading already repairs and saves)
    Repair,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = if args.config.exists() {
        Config::load(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?
    } else {
        info!("No config at {}, using defaults", args.config.display());
        Config::default()
    };
    if let Some(data_file) = args.data_file {
        config.data_file = data_file;
    }
    config.validate()?;

    info!("Starting faqx v{}", env!("CARGO_PKG_VERSION"));
    info!("Data file: {:?}", config.data_file);

    let embedder_kind = args.embedder;
    let command = args.command;

    // Embedding and JSON I/O are blocking
    let output = tokio::task::spawn_blocking(move || -> anyhow::Result<serde_json::Value> {
        let embedder = load_embedder(embedder_kind)?;
        let registry = TopicRegistry::open(&config, embedder)?;
        run(&registry, command)
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_embedder(kind: EmbedderKind) -> anyhow::Result<Arc<dyn Embedder>> {
    match kind {
        EmbedderKind::Hash => Ok(Arc::new(HashEmbedder::default())),
        #[cfg(feature = "bert")]
        EmbedderKind::Minilm => Ok(Arc::new(faqx::MiniLmEmbedder::new()?)),
        #[cfg(not(feature = "bert"))]
        EmbedderKind::Minilm => bail!("faqx was built without the `bert` feature"),
    }
}

fn run(registry: &TopicRegistry, command: Command) -> anyhow::Result<serde_json::Value> {
    use serde_json::{json, to_value};

    let value = match command {
        Command::Topics => to_value(registry.topics())?,
        Command::List { topic } => {
            let engine = registry.engine(&topic)?;
            let entries = engine.lock().list_entries();
            to_value(entries)?
        }
        Command::Info { topic, short } => {
            let engine = registry.engine(&topic)?;
            let info = engine.lock().entry_info(&short)?;
            to_value(info)?
        }
        Command::Test { topic, message } => {
            let engine = registry.engine(&topic)?;
            let report = engine.lock().test_message(&message)?;
            to_value(report)?
        }
        Command::Check { topic, message } => {
            let engine = registry.engine(&topic)?;
            let decision = engine.lock().check_message(&message, "cli")?;
            to_value(decision)?
        }
        Command::Add {
            topic,
            short,
            answer,
        } => {
            let engine = registry.ensure_topic(&topic)?;
            let change = engine.lock().create_entry(&answer, &short)?;
            match change.applied() {
                Some(id) => json!({ "created": id, "short": short.trim().to_lowercase() }),
                None => bail!("the short or the answer is already registered in '{}'", topic),
            }
        }
        Command::Edit {
            topic,
            short,
            new_short,
            answer,
        } => {
            if new_short.is_none() && answer.is_none() {
                bail!("nothing to change, pass --new-short and/or --answer");
            }
            let engine = registry.engine(&topic)?;
            let change = engine
                .lock()
                .edit_entry(&short, new_short.as_deref(), answer.as_deref())?;
            if !change.is_applied() {
                bail!("the new short or answer is already registered in '{}'", topic);
            }
            let info = engine
                .lock()
                .entry_info(new_short.as_deref().unwrap_or(&short))?;
            to_value(info)?
        }
        Command::Delete { topic, short } => {
            let engine = registry.engine(&topic)?;
            let (id, entry) = engine.lock().delete_entry(&short)?;
            json!({ "deleted": id, "entry": entry })
        }
        Command::Teach {
            topic,
            label,
            message,
        } => {
            let engine = registry.engine(&topic)?;
            let outcome = engine.lock().teach(&message, &label)?;
            to_value(outcome)?
        }
        Command::Vote {
            topic,
            short,
            up,
            down: _,
        } => {
            let vote = if up { Vote::Up } else { Vote::Down };
            let engine = registry.engine(&topic)?;
            let mut engine = engine.lock();
            let info = engine.entry_info(&short)?;
            engine.apply_vote(info.id, vote)?;
            to_value(engine.entry_info(&short)?)?
        }
        Command::Repair => {
            let mut repaired = Vec::new();
            for topic in registry.topics() {
                let engine = registry.engine(&topic)?;
                if engine.lock().repair()? {
                    repaired.push(topic);
                }
            }
            json!({ "topics": registry.topics(), "repaired": repaired })
        }
    };

    Ok(value)
}

use crate::document::CorpusDocument;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use faqx_core::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Where the corpus document lives
pub trait DocumentBackend: Send + Sync {
    /// `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<CorpusDocument>>;

    fn save(&self, document: &CorpusDocument) -> Result<()>;

    fn describe(&self) -> String;
}

impl<T: DocumentBackend + ?Sized> DocumentBackend for Arc<T> {
    fn load(&self) -> Result<Option<CorpusDocument>> {
        (**self).load()
    }

    fn save(&self, document: &CorpusDocument) -> Result<()> {
        (**self).save(document)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// JSON file, replaced atomically on every save
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<CorpusDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = std::fs::read(&self.path)?;
        let document: CorpusDocument = serde_json::from_slice(&data)
            .map_err(|e| Error::Serialization(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(document))
    }

    fn save(&self, document: &CorpusDocument) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let file = AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite);
        file.write(|f| {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(f, formatter);
            document.serialize(&mut serializer)
        })
        .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the document in memory. Writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryBackend {
    document: Mutex<Option<CorpusDocument>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: CorpusDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Option<CorpusDocument> {
        self.document.lock().clone()
    }
}

impl DocumentBackend for MemoryBackend {
    fn load(&self) -> Result<Option<CorpusDocument>> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &CorpusDocument) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(Error::Persistence("write rejected by memory backend".to_string()));
        }
        *self.document.lock() = Some(document.clone());
        self.saves.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

use std::path::{Path, PathBuf};

use formats::{EventDocument, Stats};
use tokio::sync::Mutex;

pub const EVENTS_FILE: &str = "earthquakes.json";
pub const POINTS_FILE: &str = "earthquakes.bin";
pub const STATS_FILE: &str = "earthquakes-stats.json";

#[derive(Debug)]
pub enum ArchiveError {
    Io { source: String },
    Json { source: String },
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::Io { source } => write!(f, "archive I/O error: {source}"),
            ArchiveError::Json { source } => write!(f, "archive JSON error: {source}"),
        }
    }
}

impl std::error::Error for ArchiveError {}

fn io_err(e: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Io {
        source: e.to_string(),
    }
}

/// The persisted historical corpus: the raw event document plus the two
/// derived artifacts (point binary and stats JSON).
///
/// All mutation runs behind one async lock and every file write is atomic
/// (tmp + rename), so readers only ever observe complete artifacts. The
/// stats document is always written last; a crash between binary and stats
/// leaves a detectable mismatch that `quakes restat` repairs.
pub struct ArchiveStore {
    root: PathBuf,
    pub(crate) lock: Mutex<()>,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events_path(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub fn points_path(&self) -> PathBuf {
        self.root.join(POINTS_FILE)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.root.join(STATS_FILE)
    }

    /// Read the historical document. A missing file reads as an empty
    /// document so a fresh data directory bootstraps on first refresh.
    pub async fn load_document(&self) -> Result<EventDocument, ArchiveError> {
        let _g = self.lock.lock().await;
        self.load_document_unlocked().await
    }

    pub async fn load_stats(&self) -> Result<Option<Stats>, ArchiveError> {
        match tokio::fs::read(self.stats_path()).await {
            Ok(bytes) => {
                let stats = serde_json::from_slice(&bytes).map_err(|e| ArchiveError::Json {
                    source: e.to_string(),
                })?;
                Ok(Some(stats))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(e)),
        }
    }

    pub(crate) async fn load_document_unlocked(&self) -> Result<EventDocument, ArchiveError> {
        match tokio::fs::read_to_string(self.events_path()).await {
            Ok(s) => EventDocument::from_json_str(&s).map_err(|e| ArchiveError::Json {
                source: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EventDocument::empty()),
            Err(e) => Err(io_err(e)),
        }
    }

    pub(crate) async fn save_document_unlocked(
        &self,
        doc: &EventDocument,
    ) -> Result<(), ArchiveError> {
        let text = doc.to_json_string().map_err(|e| ArchiveError::Json {
            source: e.to_string(),
        })?;
        self.write_atomic(&self.events_path(), text.as_bytes()).await
    }

    pub(crate) async fn save_points_unlocked(&self, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.write_atomic(&self.points_path(), bytes).await
    }

    pub(crate) async fn save_stats_unlocked(&self, stats: &Stats) -> Result<(), ArchiveError> {
        let text = serde_json::to_string_pretty(stats).map_err(|e| ArchiveError::Json {
            source: e.to_string(),
        })?;
        self.write_atomic(&self.stats_path(), text.as_bytes()).await
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Append rather than replace the extension so sibling artifacts
        // (earthquakes.json / earthquakes.bin) never share a tmp name.
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io_err(format!("invalid artifact path: {path:?}")))?;
        let tmp = path.with_file_name(format!("{file_name}.tmp"));

        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ArchiveStore;

    #[tokio::test]
    async fn missing_document_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArchiveStore::new(dir.path());

        let doc = store.load_document().await.expect("load");
        assert!(doc.events().is_empty());
    }

    #[tokio::test]
    async fn missing_stats_read_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArchiveStore::new(dir.path());
        assert!(store.load_stats().await.expect("load").is_none());
    }
}

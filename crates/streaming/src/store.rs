use std::sync::Arc;

use formats::{Stats, decode_point_bytes};
use tracing::debug;

use crate::cell::CoalescedCell;
use crate::fetch::{Fetch, LoadError};

/// Default artifact locations on the serving endpoint.
pub const POINTS_ARTIFACT_PATH: &str = "/data/earthquakes.bin";
pub const STATS_ARTIFACT_PATH: &str = "/data/earthquakes-stats.json";

/// Session-scoped cache for the historical point buffer and its stats.
///
/// One instance per process, constructed empty and passed by reference to
/// consumers — never an ambient global. Each artifact is fetched at most
/// once per session regardless of caller concurrency; a failed load is
/// retryable on the next call.
pub struct HistoricStore {
    fetch: Arc<dyn Fetch>,
    points_path: String,
    stats_path: String,
    points: CoalescedCell<Vec<f32>>,
    stats: CoalescedCell<Stats>,
}

impl HistoricStore {
    pub fn new(fetch: Arc<dyn Fetch>) -> Self {
        Self::with_paths(fetch, POINTS_ARTIFACT_PATH, STATS_ARTIFACT_PATH)
    }

    pub fn with_paths(
        fetch: Arc<dyn Fetch>,
        points_path: impl Into<String>,
        stats_path: impl Into<String>,
    ) -> Self {
        Self {
            fetch,
            points_path: points_path.into(),
            stats_path: stats_path.into(),
            points: CoalescedCell::new(),
            stats: CoalescedCell::new(),
        }
    }

    /// Already-loaded point buffer, if any.
    pub fn peek_points(&self) -> Option<Arc<Vec<f32>>> {
        self.points.peek()
    }

    /// Already-loaded stats, if any.
    pub fn peek_stats(&self) -> Option<Arc<Stats>> {
        self.stats.peek()
    }

    /// Fetch and decode the historical point buffer (once per session).
    pub async fn load_points(&self) -> Result<Arc<Vec<f32>>, LoadError> {
        let fetch = Arc::clone(&self.fetch);
        let path = self.points_path.clone();

        self.points
            .get_or_load(async move {
                let bytes = fetch.fetch(&path).await?;
                let data = decode_point_bytes(&bytes)
                    .map_err(|e| LoadError::new(format!("decode {path}: {e}")))?;
                debug!(path = %path, rows = data.len() / formats::POINT_STRIDE, "point buffer loaded");
                Ok(data)
            })
            .await
    }

    /// Fetch and parse the stats artifact (once per session).
    pub async fn load_stats(&self) -> Result<Arc<Stats>, LoadError> {
        let fetch = Arc::clone(&self.fetch);
        let path = self.stats_path.clone();

        self.stats
            .get_or_load(async move {
                let bytes = fetch.fetch(&path).await?;
                serde_json::from_slice::<Stats>(&bytes)
                    .map_err(|e| LoadError::new(format!("parse {path}: {e}")))
            })
            .await
    }
}

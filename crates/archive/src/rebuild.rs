use formats::{RawEvent, TimeRangePolicy, encode_points, normalize, point_bytes};
use foundation::math::POINT_RADIUS;
use serde::Serialize;
use tracing::{debug, info};

use crate::merge::merge;
use crate::store::{ArchiveError, ArchiveStore};

/// Operator-facing result of one refresh run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub added: usize,
    pub skipped: usize,
    pub total: u64,
    pub content_hash: String,
}

impl ArchiveStore {
    /// Merge an already-fetched recent record set into the archive and
    /// rebuild the derived artifacts.
    ///
    /// Callers fetch the feed *before* invoking this, so any fetch failure
    /// aborts with the archive untouched. Within the run, persist order is
    /// document, binary, stats — stats last. The time range is re-derived
    /// from the merged set on every run, never cached.
    pub async fn refresh(&self, recent: Vec<RawEvent>) -> Result<RefreshReport, ArchiveError> {
        let _g = self.lock.lock().await;

        let mut doc = self.load_document_unlocked().await?;
        let outcome = merge(doc.events(), recent);

        let normalized = normalize(&outcome.events);
        if normalized.dropped > 0 {
            debug!(dropped = normalized.dropped, "invalid records excluded from encoding");
        }

        let buffer = encode_points(&normalized.events, POINT_RADIUS, TimeRangePolicy::Derived);
        let bytes = point_bytes(&buffer.data);
        let content_hash = blake3::hash(&bytes).to_hex().to_string();

        let report = RefreshReport {
            added: outcome.added,
            skipped: outcome.skipped,
            total: buffer.stats.total_count,
            content_hash,
        };

        doc.set_events(outcome.events);
        self.save_document_unlocked(&doc).await?;
        self.save_points_unlocked(&bytes).await?;
        self.save_stats_unlocked(&buffer.stats).await?;

        info!(
            added = report.added,
            skipped = report.skipped,
            total = report.total,
            hash = %report.content_hash,
            bytes = bytes.len(),
            "archive refreshed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use formats::RawEvent;
    use serde_json::json;

    use crate::store::ArchiveStore;

    fn recent_event(id: &str, mag: f64, time: f64) -> RawEvent {
        RawEvent::from_feature(json!({
            "id": id,
            "geometry": { "coordinates": [10.0, 20.0, 5.0] },
            "properties": { "mag": mag, "time": time, "place": "test region" }
        }))
    }

    #[tokio::test]
    async fn refresh_writes_all_three_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArchiveStore::new(dir.path());

        let report = store
            .refresh(vec![recent_event("a", 4.0, 1_000.0), recent_event("b", 5.0, 2_000.0)])
            .await
            .expect("refresh");

        assert_eq!(report.added, 2);
        assert_eq!(report.total, 2);

        assert!(store.events_path().exists());
        assert!(store.points_path().exists());
        assert!(store.stats_path().exists());

        // Atomic writes leave no tmp residue behind.
        let residue: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(residue.is_empty());

        let stats = store.load_stats().await.expect("load").expect("present");
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.start_year, 1970);

        let bytes = std::fs::read(store.points_path()).expect("read bin");
        assert_eq!(bytes.len(), 2 * formats::POINT_ROW_BYTES);
    }

    #[tokio::test]
    async fn second_refresh_with_same_feed_adds_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArchiveStore::new(dir.path());
        let feed = vec![recent_event("a", 4.0, 1_000.0)];

        let first = store.refresh(feed.clone()).await.expect("first");
        assert_eq!(first.added, 1);
        let doc_after_first = std::fs::read(store.events_path()).expect("read");

        let second = store.refresh(feed).await.expect("second");
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.total, first.total);
        assert_eq!(second.content_hash, first.content_hash);

        let doc_after_second = std::fs::read(store.events_path()).expect("read");
        assert_eq!(doc_after_first, doc_after_second);
    }

    #[tokio::test]
    async fn empty_feed_still_rebuilds_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArchiveStore::new(dir.path());

        store
            .refresh(vec![recent_event("a", 4.0, 1_000.0)])
            .await
            .expect("seed");

        // Corrupt the stats artifact, then refresh with nothing new: the
        // rebuild must restore it even though no record was added.
        std::fs::write(store.stats_path(), b"{}").expect("clobber");

        let report = store.refresh(Vec::new()).await.expect("refresh");
        assert_eq!(report.added, 0);
        let stats = store.load_stats().await.expect("load").expect("present");
        assert_eq!(stats.total_count, 1);
    }
}

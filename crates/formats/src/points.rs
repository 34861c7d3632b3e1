use crate::event::NormalizedEvent;
use crate::stats::{Stats, StatsAccumulator, year_span};
use foundation::math::project_lat_lon;

/// Fields per encoded point row: `[x, y, z, mag, depth, normalized_time]`.
pub const POINT_STRIDE: usize = 6;

/// Bytes per encoded point row (stride × f32).
pub const POINT_ROW_BYTES: usize = POINT_STRIDE * 4;

/// 1900-01-01T00:00:00Z, the fixed lower bound of the historical corpus.
pub const HISTORIC_RANGE_START_MS: f64 = -2_208_988_800_000.0;

/// 2026-12-31T00:00:00Z, the fixed upper bound of the historical corpus.
pub const HISTORIC_RANGE_END_MS: f64 = 1_798_675_200_000.0;

/// How the time axis is normalized into `[0, 1]`.
///
/// The two policies are an explicit choice, never inferred: the one-shot
/// corpus conversion uses the fixed dataset-wide bounds, incremental
/// rebuilds derive bounds from the records actually present. Mixing them
/// silently would shift every point's time coordinate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TimeRangePolicy {
    Fixed { start_ms: f64, end_ms: f64 },
    Derived,
}

impl TimeRangePolicy {
    /// The fixed historical corpus bounds (1900 through 2026).
    pub fn historic() -> Self {
        Self::Fixed {
            start_ms: HISTORIC_RANGE_START_MS,
            end_ms: HISTORIC_RANGE_END_MS,
        }
    }
}

/// An encoded point set with its aggregate stats and the time range the
/// normalization actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBuffer {
    pub data: Vec<f32>,
    pub stats: Stats,
    pub range_ms: (f64, f64),
}

/// Pack validated events into the flat stride-6 f32 layout.
///
/// Deterministic: the same event list (including order), radius and policy
/// always produce byte-identical output. Empty input yields an empty buffer
/// and neutral stats rather than infinities.
pub fn encode_points(
    events: &[NormalizedEvent],
    radius: f64,
    policy: TimeRangePolicy,
) -> PointBuffer {
    let range_ms = resolve_range(events, policy);
    let (start_ms, end_ms) = range_ms;
    let duration = end_ms - start_ms;

    let mut data = Vec::with_capacity(events.len() * POINT_STRIDE);
    let mut acc = StatsAccumulator::new();

    for event in events {
        let v = project_lat_lon(event.lat, event.lon, radius);

        // A degenerate range (single instant, or empty derived input)
        // collapses every point to t = 0 instead of dividing by zero.
        let t = if duration > 0.0 {
            ((event.time_ms - start_ms) / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        data.push(v.x as f32);
        data.push(v.y as f32);
        data.push(v.z as f32);
        data.push(event.mag as f32);
        data.push(event.depth_km as f32);
        data.push(t as f32);

        acc.add(event.mag, event.depth_km);
    }

    let years = if events.is_empty() && matches!(policy, TimeRangePolicy::Derived) {
        (0, 0)
    } else {
        year_span(range_ms)
    };

    PointBuffer {
        data,
        stats: acc.finish(years),
        range_ms,
    }
}

fn resolve_range(events: &[NormalizedEvent], policy: TimeRangePolicy) -> (f64, f64) {
    match policy {
        TimeRangePolicy::Fixed { start_ms, end_ms } => (start_ms, end_ms),
        TimeRangePolicy::Derived => {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for e in events {
                min = min.min(e.time_ms);
                max = max.max(e.time_ms);
            }
            if min.is_finite() { (min, max) } else { (0.0, 0.0) }
        }
    }
}

/// Serialize a point buffer to the raw little-endian artifact: no header,
/// no length prefix, row count implied by `len / 24`.
pub fn point_bytes(data: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 4);
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsError {
    TruncatedBuffer { len: usize },
}

impl std::fmt::Display for PointsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointsError::TruncatedBuffer { len } => {
                write!(
                    f,
                    "point buffer length {len} is not a multiple of {POINT_ROW_BYTES} bytes"
                )
            }
        }
    }
}

impl std::error::Error for PointsError {}

/// Decode a persisted point artifact back into f32 rows.
pub fn decode_point_bytes(bytes: &[u8]) -> Result<Vec<f32>, PointsError> {
    if bytes.len() % POINT_ROW_BYTES != 0 {
        return Err(PointsError::TruncatedBuffer { len: bytes.len() });
    }

    let mut out = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

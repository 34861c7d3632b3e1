use serde::{Deserialize, Serialize};

use crate::points::{POINT_STRIDE, PointsError};
use foundation::time::utc_year;

/// Aggregate statistics persisted next to the point binary.
///
/// Pretty-printed JSON artifact; the camelCase field names are the wire
/// contract. Extrema are rounded to two decimals for display use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_count: u64,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub min_depth: f64,
    pub max_depth: f64,
    pub start_year: i32,
    pub end_year: i32,
}

impl Stats {
    /// Re-derive stats from an already-decoded point buffer.
    ///
    /// Recovery path for a stats artifact that went stale relative to the
    /// binary: magnitude/depth extrema and the count come straight from the
    /// rows, years from the supplied time range (the binary itself only
    /// stores normalized time).
    pub fn from_point_rows(data: &[f32], range_ms: (f64, f64)) -> Result<Self, PointsError> {
        if data.len() % POINT_STRIDE != 0 {
            return Err(PointsError::TruncatedBuffer {
                len: data.len() * 4,
            });
        }

        let mut acc = StatsAccumulator::new();
        for row in data.chunks_exact(POINT_STRIDE) {
            acc.add(row[3] as f64, row[4] as f64);
        }
        Ok(acc.finish(year_span(range_ms)))
    }
}

/// UTC year bounds of a millisecond time range.
pub fn year_span(range_ms: (f64, f64)) -> (i32, i32) {
    (utc_year(range_ms.0 as i64), utc_year(range_ms.1 as i64))
}

/// Running min/max over magnitudes and known depths.
///
/// Unknown-depth rows (sentinel −1) never touch the depth extrema. If
/// nothing was accumulated the finished extrema are 0, never infinities —
/// unresolved floats must not reach persisted output.
#[derive(Debug)]
pub struct StatsAccumulator {
    count: u64,
    min_mag: f64,
    max_mag: f64,
    min_depth: f64,
    max_depth: f64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self {
            count: 0,
            min_mag: f64::INFINITY,
            max_mag: f64::NEG_INFINITY,
            min_depth: f64::INFINITY,
            max_depth: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, mag: f64, depth_km: f64) {
        self.count += 1;
        self.min_mag = self.min_mag.min(mag);
        self.max_mag = self.max_mag.max(mag);
        if depth_km >= 0.0 {
            self.min_depth = self.min_depth.min(depth_km);
            self.max_depth = self.max_depth.max(depth_km);
        }
    }

    pub fn finish(self, (start_year, end_year): (i32, i32)) -> Stats {
        Stats {
            total_count: self.count,
            min_magnitude: round2(neutral(self.min_mag)),
            max_magnitude: round2(neutral(self.max_mag)),
            min_depth: round2(neutral(self.min_depth)),
            max_depth: round2(neutral(self.max_depth)),
            start_year,
            end_year,
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn neutral(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

use formats::{
    DEPTH_UNKNOWN, NormalizedEvent, POINT_STRIDE, Stats, StatsAccumulator, year_span,
};
use foundation::math::{POINT_RADIUS, project_lat_lon};
use foundation::time::{DAY_MS, start_of_utc_day};
use serde::Serialize;
use serde_json::Value;

/// Full UTC days preceding the anchor day in the rolling window.
pub const WINDOW_PRECEDING_DAYS: i64 = 6;

/// Depth used to scale radial displacement when the observed maximum is
/// shallower. Keeps shallow-only weeks from exaggerating depth visually.
const DEPTH_FLOOR_KM: f64 = 700.0;

/// Maximum inward displacement of a point at full normalized depth.
const DEPTH_DISPLACEMENT: f64 = 0.35;

/// Easing exponent applied to normalized depth.
const DEPTH_EASING: f64 = 0.6;

/// UTC day bounds of the derived window. `end_ms` is the start of the
/// anchor day; events up to (not including) `end_ms + 1 day` are in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// The rolling 7-day view over the live feed.
///
/// An empty feed is a valid terminal state (`stats`/`range` both `None`),
/// not a fault: consumers render a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekWindow {
    pub events: Vec<NormalizedEvent>,
    pub stats: Option<Stats>,
    pub range: Option<WindowRange>,
}

impl WeekWindow {
    fn empty() -> Self {
        Self {
            events: Vec::new(),
            stats: None,
            range: None,
        }
    }
}

/// Normalize a raw live-feed document into the rolling week view.
///
/// Per-feature extraction is lenient and applies the same admission filter
/// as the merge engine (numeric magnitude >= 2.5); records without usable
/// coordinates or timestamp are silently dropped. Runs fresh against the
/// feed on every request — nothing here is cached.
pub fn normalize_week_feed(raw: &Value) -> WeekWindow {
    let Some(features) = raw.get("features").and_then(|v| v.as_array()) else {
        return WeekWindow::empty();
    };

    let mut events = Vec::with_capacity(features.len());
    for feature in features {
        let r = formats::RawEvent::from_feature(feature.clone());
        if !r.passes_admission() {
            continue;
        }
        let (Some(lat), Some(lon), Some(mag), Some(time_ms)) = (r.lat, r.lon, r.mag, r.time_ms)
        else {
            continue;
        };

        events.push(NormalizedEvent {
            lat,
            lon,
            depth_km: r.depth_km.unwrap_or(DEPTH_UNKNOWN),
            mag,
            time_ms,
            place: r.place.unwrap_or_else(|| "Unknown".to_string()),
        });
    }

    build_week_window(events)
}

/// Derive the trailing 7-day window from validated events.
///
/// The window is anchored to the most recent event's UTC day, not to
/// wall-clock now: `[anchor_day_start - 6 days, anchor_day_start + 1 day)`.
/// Events are sorted ascending by time first.
pub fn build_week_window(mut events: Vec<NormalizedEvent>) -> WeekWindow {
    events.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

    let Some(latest) = events.last() else {
        return WeekWindow::empty();
    };

    let end_day_ms = start_of_utc_day(latest.time_ms as i64);
    let start_ms = end_day_ms - WINDOW_PRECEDING_DAYS * DAY_MS;
    let next_day_ms = end_day_ms + DAY_MS;

    let events: Vec<NormalizedEvent> = events
        .into_iter()
        .filter(|e| e.time_ms >= start_ms as f64 && e.time_ms < next_day_ms as f64)
        .collect();

    let stats = window_stats(&events);
    WeekWindow {
        events,
        stats,
        range: Some(WindowRange {
            start_ms,
            end_ms: end_day_ms,
        }),
    }
}

fn window_stats(events: &[NormalizedEvent]) -> Option<Stats> {
    let first = events.first()?;
    let last = events.last()?;

    let mut acc = StatsAccumulator::new();
    for e in events {
        acc.add(e.mag, e.depth_km);
    }
    Some(acc.finish(year_span((first.time_ms, last.time_ms))))
}

/// A packed week view: stride-6 rows plus the depth scale used for the
/// radial displacement.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekPoints {
    pub data: Vec<f32>,
    pub max_depth_km: f64,
}

/// Pack week events into the stride-6 layout used by the point renderer.
///
/// Unlike the historical encoding, known depth displaces the point inward
/// from the shell (eased, capped at [`DEPTH_DISPLACEMENT`]); unknown depth
/// stays on the base radius. The time field is 0 for the whole window.
pub fn pack_week_points(events: &[NormalizedEvent]) -> WeekPoints {
    let mut observed_max_depth = 0.0f64;
    for e in events {
        if e.depth_km >= 0.0 {
            observed_max_depth = observed_max_depth.max(e.depth_km);
        }
    }
    let max_depth_km = observed_max_depth.max(DEPTH_FLOOR_KM);

    let mut data = Vec::with_capacity(events.len() * POINT_STRIDE);
    for e in events {
        let radius = if e.depth_km >= 0.0 {
            let depth_norm = (e.depth_km / max_depth_km).min(1.0).powf(DEPTH_EASING);
            POINT_RADIUS - depth_norm * DEPTH_DISPLACEMENT
        } else {
            POINT_RADIUS
        };

        let v = project_lat_lon(e.lat, e.lon, radius);
        data.push(v.x as f32);
        data.push(v.y as f32);
        data.push(v.z as f32);
        data.push(e.mag as f32);
        data.push(e.depth_km as f32);
        data.push(0.0);
    }

    WeekPoints { data, max_depth_km }
}

#[cfg(test)]
mod tests {
    use super::{WINDOW_PRECEDING_DAYS, build_week_window, normalize_week_feed, pack_week_points};
    use formats::NormalizedEvent;
    use foundation::math::POINT_RADIUS;
    use foundation::time::DAY_MS;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn event(time_ms: f64) -> NormalizedEvent {
        NormalizedEvent {
            lat: 10.0,
            lon: 20.0,
            depth_km: 5.0,
            mag: 3.0,
            time_ms,
            place: "test".to_string(),
        }
    }

    fn event_with_depth(depth_km: f64) -> NormalizedEvent {
        NormalizedEvent {
            lat: 0.0,
            lon: 0.0,
            depth_km,
            mag: 3.0,
            time_ms: 0.0,
            place: "test".to_string(),
        }
    }

    #[test]
    fn window_boundary_is_inclusive_at_start() {
        // Anchor the window to some mid-morning event on UTC day 20_000.
        let anchor_day = 20_000 * DAY_MS;
        let latest = anchor_day + 9 * 60 * 60 * 1000;
        let window_start = anchor_day - WINDOW_PRECEDING_DAYS * DAY_MS;

        let events = vec![
            event(latest as f64),
            event(window_start as f64),           // exactly on the boundary
            event((window_start - 1) as f64),     // one millisecond too old
            event((anchor_day - 10 * DAY_MS) as f64),
        ];

        let window = build_week_window(events);
        let times: Vec<f64> = window.events.iter().map(|e| e.time_ms).collect();
        assert_eq!(times, vec![window_start as f64, latest as f64]);

        let range = window.range.expect("range");
        assert_eq!(range.start_ms, window_start);
        assert_eq!(range.end_ms, anchor_day);
    }

    #[test]
    fn events_on_the_anchor_day_are_included_up_to_midnight() {
        let anchor_day = 20_000 * DAY_MS;
        let late = anchor_day + DAY_MS - 1;

        let window = build_week_window(vec![event(anchor_day as f64), event(late as f64)]);
        assert_eq!(window.events.len(), 2);
        assert_eq!(window.range.expect("range").end_ms, anchor_day);
    }

    #[test]
    fn empty_input_is_a_valid_terminal_state() {
        let window = build_week_window(Vec::new());
        assert!(window.events.is_empty());
        assert_eq!(window.stats, None);
        assert_eq!(window.range, None);
    }

    #[test]
    fn feed_normalization_applies_admission_filter() {
        let raw = json!({
            "features": [
                { "id": "weak",
                  "geometry": { "coordinates": [10.0, 20.0, 5.0] },
                  "properties": { "mag": 2.4, "time": 1_000.0 } },
                { "id": "kept",
                  "geometry": { "coordinates": [10.0, 20.0] },
                  "properties": { "mag": 2.5, "time": 2_000.0 } },
                { "id": "no-mag",
                  "geometry": { "coordinates": [10.0, 20.0] },
                  "properties": { "time": 3_000.0 } }
            ]
        });

        let window = normalize_week_feed(&raw);
        assert_eq!(window.events.len(), 1);
        assert_eq!(window.events[0].mag, 2.5);
        assert_eq!(window.events[0].depth_km, -1.0);
        assert_eq!(window.events[0].place, "Unknown");

        let stats = window.stats.expect("stats");
        assert_eq!(stats.total_count, 1);
        // The only event has unknown depth.
        assert_eq!(stats.min_depth, 0.0);
        assert_eq!(stats.max_depth, 0.0);
    }

    #[test]
    fn feed_without_features_yields_empty_window() {
        let window = normalize_week_feed(&json!({ "metadata": {} }));
        assert!(window.events.is_empty());
        assert_eq!(window.range, None);
    }

    #[test]
    fn packing_displaces_known_depth_inward_only() {
        let events = vec![event_with_depth(-1.0), event_with_depth(700.0)];
        let packed = pack_week_points(&events);
        assert_eq!(packed.data.len(), 12);
        assert_eq!(packed.max_depth_km, 700.0);

        // Unknown depth stays on the shell: the row's x is the full radius
        // at (lat 0, lon 0).
        assert_eq!(packed.data[0], POINT_RADIUS as f32);
        // Full-depth point sits 0.35 inside the shell.
        let expected = (POINT_RADIUS - 0.35) as f32;
        assert!((packed.data[6] - expected).abs() < 1e-6);

        // Time field is zero for the whole window.
        assert_eq!(packed.data[5], 0.0);
        assert_eq!(packed.data[11], 0.0);
    }

    #[test]
    fn packing_scales_depth_against_observed_maximum() {
        let events = vec![event_with_depth(1400.0)];
        let packed = pack_week_points(&events);
        assert_eq!(packed.max_depth_km, 1400.0);
        let expected = (POINT_RADIUS - 0.35) as f32;
        assert!((packed.data[0] - expected).abs() < 1e-6);
    }
}

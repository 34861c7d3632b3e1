use serde::Serialize;
use serde_json::{Map, Value};

/// Magnitude substituted when a record carries none. Historical catalogs
/// predating instrumental magnitudes are assumed to be significant events.
pub const MAG_FALLBACK: f64 = 6.0;

/// Sentinel for "depth unknown". Never clamped to 0 and always excluded
/// from depth statistics.
pub const DEPTH_UNKNOWN: f64 = -1.0;

/// Minimum magnitude a live-feed record must carry to be admitted into the
/// merge set or the recent-window view. Boundary inclusive.
pub const ADMISSION_MIN_MAG: f64 = 2.5;

const PLACE_FALLBACK: &str = "Unknown";

/// One untrusted event record, as found in a GeoJSON-like feature.
///
/// Extraction is lenient: every field is optional and nothing here fails.
/// The original feature value is retained untouched so a merged document
/// writes historical records back exactly as they were stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub id: Option<String>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub depth_km: Option<f64>,
    pub mag: Option<f64>,
    pub time_ms: Option<f64>,
    pub place: Option<String>,
    feature: Value,
}

impl RawEvent {
    pub fn from_feature(feature: Value) -> Self {
        let obj = feature.as_object();

        let id = match obj.and_then(|o| o.get("id")) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let coords = obj
            .and_then(|o| o.get("geometry"))
            .and_then(|g| g.get("coordinates"))
            .and_then(|c| c.as_array());

        let lon = coords.and_then(|c| c.first()).and_then(finite_f64);
        let lat = coords.and_then(|c| c.get(1)).and_then(finite_f64);
        let depth_km = coords.and_then(|c| c.get(2)).and_then(finite_f64);

        let props = obj.and_then(|o| o.get("properties"));
        let mag = props.and_then(|p| p.get("mag")).and_then(finite_f64);
        let time_ms = props.and_then(|p| p.get("time")).and_then(finite_f64);
        let place = props
            .and_then(|p| p.get("place"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Self {
            id,
            lon,
            lat,
            depth_km,
            mag,
            time_ms,
            place,
            feature,
        }
    }

    /// Coordinates and timestamp usable for encoding.
    pub fn is_valid(&self) -> bool {
        self.lon.is_some() && self.lat.is_some() && self.time_ms.is_some()
    }

    /// The live-feed admission filter: numeric magnitude at or above
    /// [`ADMISSION_MIN_MAG`] and both horizontal coordinates present.
    pub fn passes_admission(&self) -> bool {
        matches!(self.mag, Some(m) if m >= ADMISSION_MIN_MAG)
            && self.lon.is_some()
            && self.lat.is_some()
    }

    pub fn into_feature(self) -> Value {
        self.feature
    }

    pub fn feature(&self) -> &Value {
        &self.feature
    }
}

fn finite_f64(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

/// A validated record ready for encoding.
///
/// Invariants: `lat`, `lon`, `mag`, `time_ms` finite; `depth_km >= -1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEvent {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "depth")]
    pub depth_km: f64,
    pub mag: f64,
    #[serde(rename = "time")]
    pub time_ms: f64,
    pub place: String,
}

/// Result of validating a raw record set. Drops are silent by design; the
/// count is surfaced so callers can report it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub events: Vec<NormalizedEvent>,
    pub dropped: usize,
}

/// Validate and normalize raw records, preserving input order.
///
/// A record without numeric coordinates or timestamp is dropped. Missing
/// magnitude becomes [`MAG_FALLBACK`], missing depth [`DEPTH_UNKNOWN`].
/// Sorting is the merge engine's job, not this one's.
pub fn normalize(raw: &[RawEvent]) -> Normalized {
    let mut events = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for r in raw {
        let (Some(lon), Some(lat), Some(time_ms)) = (r.lon, r.lat, r.time_ms) else {
            dropped += 1;
            continue;
        };

        events.push(NormalizedEvent {
            lat,
            lon,
            depth_km: r.depth_km.unwrap_or(DEPTH_UNKNOWN),
            mag: r.mag.unwrap_or(MAG_FALLBACK),
            time_ms,
            place: r.place.clone().unwrap_or_else(|| PLACE_FALLBACK.to_string()),
        });
    }

    Normalized { events, dropped }
}

#[derive(Debug)]
pub enum EventError {
    InvalidJson { reason: String },
    NotAnObject,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::InvalidJson { reason } => write!(f, "invalid event JSON: {reason}"),
            EventError::NotAnObject => write!(f, "event document root must be an object"),
        }
    }
}

impl std::error::Error for EventError {}

/// The persisted GeoJSON-like historical document: `{ "features": [...] }`
/// plus whatever other top-level keys the corpus carries, preserved as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDocument {
    root: Map<String, Value>,
}

impl EventDocument {
    pub fn empty() -> Self {
        let mut root = Map::new();
        root.insert("features".to_string(), Value::Array(Vec::new()));
        Self { root }
    }

    pub fn from_json_str(payload: &str) -> Result<Self, EventError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| EventError::InvalidJson {
                reason: e.to_string(),
            })?;
        let root = value.as_object().cloned().ok_or(EventError::NotAnObject)?;
        Ok(Self { root })
    }

    /// Lenient like the feed itself: a missing or non-array `features` key
    /// reads as an empty set.
    pub fn events(&self) -> Vec<RawEvent> {
        match self.root.get("features").and_then(|v| v.as_array()) {
            Some(features) => features
                .iter()
                .map(|f| RawEvent::from_feature(f.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Replace the feature set, keeping all other top-level keys.
    pub fn set_events(&mut self, events: Vec<RawEvent>) {
        let features: Vec<Value> = events.into_iter().map(RawEvent::into_feature).collect();
        self.root
            .insert("features".to_string(), Value::Array(features));
    }

    pub fn to_json_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Compact serialization; the historical document is large and machine
    /// read, so no pretty printing.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

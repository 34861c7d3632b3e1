use std::collections::HashMap;

use formats::RawEvent;
use tracing::debug;

/// Result of merging a recent feed into the historical set.
///
/// `added`/`skipped` count admitted recent records that were inserted or
/// found already present; `dropped_unidentified` counts records (either
/// side) that carry no stable id and therefore cannot participate in
/// dedup — a documented limitation of id-keyed merging.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub events: Vec<RawEvent>,
    pub added: usize,
    pub skipped: usize,
    pub dropped_unidentified: usize,
}

/// Merge `recent` into `historical`, deduplicating by id.
///
/// Historical data wins: a recent record whose id is already present is
/// skipped, existing fields stay authoritative. Recent records must pass
/// the admission filter (numeric magnitude >= 2.5, both horizontal
/// coordinates present) before they are even considered. The output is
/// sorted ascending by time with id as tiebreak, so the merged set is
/// deterministic for identical inputs.
pub fn merge(historical: Vec<RawEvent>, recent: Vec<RawEvent>) -> MergeOutcome {
    let mut by_id: HashMap<String, RawEvent> = HashMap::with_capacity(historical.len());
    let mut dropped_unidentified = 0usize;

    for event in historical {
        match &event.id {
            Some(id) => {
                // A duplicate id inside the historical set itself keeps the
                // last occurrence, matching map-insert semantics.
                by_id.insert(id.clone(), event);
            }
            None => dropped_unidentified += 1,
        }
    }

    let mut added = 0usize;
    let mut skipped = 0usize;

    for event in recent {
        if !event.passes_admission() {
            continue;
        }
        let Some(id) = event.id.clone() else {
            dropped_unidentified += 1;
            continue;
        };

        if by_id.contains_key(&id) {
            skipped += 1;
        } else {
            by_id.insert(id, event);
            added += 1;
        }
    }

    if dropped_unidentified > 0 {
        debug!(count = dropped_unidentified, "dropped records without id from merge set");
    }

    let mut events: Vec<RawEvent> = by_id.into_values().collect();
    events.sort_by(|a, b| {
        time_key(a)
            .total_cmp(&time_key(b))
            .then_with(|| a.id.cmp(&b.id))
    });

    MergeOutcome {
        events,
        added,
        skipped,
        dropped_unidentified,
    }
}

fn time_key(event: &RawEvent) -> f64 {
    event.time_ms.unwrap_or(f64::NEG_INFINITY)
}

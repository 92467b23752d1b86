//! Event grouping: a sailor's dated rows → one assignment per ship.

use crate::output::{RawEvent, ShipAssignment};
use crate::pipeline::normalize::clean_ship_name;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

/// Collapse `(date, ship text)` events into `(ship, first date, last date)`.
///
/// Ship text is normalised here (normalisation is idempotent, so already
/// clean names pass through unchanged) and events whose name normalises to
/// nothing are dropped. Output is sorted by start date, then ship, but only
/// membership is meaningful.
pub fn group_by_ship(events: &[RawEvent]) -> Vec<ShipAssignment> {
    let mut spans: HashMap<String, (NaiveDate, NaiveDate)> = HashMap::new();

    for event in events {
        let ship = clean_ship_name(&event.text);
        if ship.is_empty() {
            debug!("Dropping {} event with empty ship name: {:?}", event.date, event.text);
            continue;
        }
        spans
            .entry(ship)
            .and_modify(|(start, end)| {
                *start = (*start).min(event.date);
                *end = (*end).max(event.date);
            })
            .or_insert((event.date, event.date));
    }

    let mut grouped: Vec<ShipAssignment> = spans
        .into_iter()
        .map(|(ship, (start, end))| ShipAssignment { ship, start, end })
        .collect();
    grouped.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.ship.cmp(&b.ship)));
    grouped
}

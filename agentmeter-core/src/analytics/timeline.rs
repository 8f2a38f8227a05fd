//! Hourly activity buckets for heatmaps and history charts.
//!
//! The representation is sparse: only (date, hour) cells with at least one
//! billable message are emitted.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use super::classify::Contribution;
use super::windows::local_date_hour;

/// Activity in one local (date, hour) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    /// 0-23
    pub hour: u32,
    pub cost: f64,
    pub messages: u64,
}

/// Buckets billable messages by local creation date and hour.
#[derive(Debug)]
pub struct TimelineBuilder<Tz: TimeZone> {
    tz: Tz,
    cells: BTreeMap<(NaiveDate, u32), (f64, u64)>,
}

impl<Tz: TimeZone> TimelineBuilder<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            cells: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, c: &Contribution<'_>) {
        let key = local_date_hour(&self.tz, c.message.created_at);
        let cell = self.cells.entry(key).or_insert((0.0, 0));
        cell.0 += c.message.cost;
        cell.1 += 1;
    }

    /// Entries in (date, hour) order.
    pub fn finish(self) -> Vec<TimelineEntry> {
        self.cells
            .into_iter()
            .map(|((date, hour), (cost, messages))| TimelineEntry {
                date: date.format("%Y-%m-%d").to_string(),
                hour,
                cost,
                messages,
            })
            .collect()
    }
}

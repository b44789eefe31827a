//! Reconciling sparse daily series onto a contiguous calendar grid.

use std::collections::{BTreeSet, HashMap};

use chrono::Duration;
use serde_json::Number;

use crate::date_range::DateWindow;
use crate::record::{CategoryBreakdown, DateKey, MetricRecord};

/// One [`DateKey`] per consecutive day, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    days: Vec<DateKey>,
}

impl CalendarGrid {
    pub fn for_window(window: &DateWindow) -> Self {
        let len = window.days().max(0);
        let days = (0..len)
            .map(|offset| DateKey::from_date(window.start + Duration::days(offset)))
            .collect();
        Self { days }
    }

    pub fn days(&self) -> &[DateKey] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// The gap-filled chart series and the metric fields each one carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSeriesKind {
    Users,
    Comments,
    Orders,
    Sales,
}

impl ChartSeriesKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChartSeriesKind::Users => "users",
            ChartSeriesKind::Comments => "comments",
            ChartSeriesKind::Orders => "orders",
            ChartSeriesKind::Sales => "sales",
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            ChartSeriesKind::Users => &["signUps", "firstBuys"],
            ChartSeriesKind::Comments => &["comments"],
            ChartSeriesKind::Orders => &["orders"],
            ChartSeriesKind::Sales => &["revenue", "amount"],
        }
    }
}

/// Metric field names every record of a filled series must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet(BTreeSet<String>);

impl FieldSet {
    /// Union of the metric names present in `records`.
    pub fn discover(records: &[MetricRecord]) -> Self {
        Self(
            records
                .iter()
                .flat_map(|r| r.metrics.keys().cloned())
                .collect(),
        )
    }

    /// The declared schema of `kind`, plus any extra names found in
    /// `records`. Extra names are kept but logged.
    pub fn for_series(kind: ChartSeriesKind, records: &[MetricRecord]) -> Self {
        let mut fields: BTreeSet<String> = kind.fields().iter().map(|f| f.to_string()).collect();
        for name in Self::discover(records).0 {
            if !fields.contains(&name) {
                tracing::warn!(
                    series = kind.name(),
                    field = %name,
                    "aggregation returned an undeclared metric field"
                );
                fields.insert(name);
            }
        }
        Self(fields)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Produce exactly one record per grid day, in grid order.
///
/// Days with no record get a synthesized all-zero record; existing records
/// gain a zero for every field of `fields` they lack. Records whose key is
/// not on the grid are dropped.
pub fn fill_gaps(
    records: Vec<MetricRecord>,
    grid: &CalendarGrid,
    fields: &FieldSet,
) -> Vec<MetricRecord> {
    let mut by_key: HashMap<DateKey, MetricRecord> = HashMap::with_capacity(records.len());
    for record in records {
        by_key.entry(record.key).or_insert(record);
    }

    grid.days()
        .iter()
        .map(|key| match by_key.remove(key) {
            None => MetricRecord::zeroed(*key, fields.iter()),
            Some(mut record) => {
                for field in fields.iter() {
                    record
                        .metrics
                        .entry(field.to_string())
                        .or_insert_with(|| Number::from(0));
                }
                record
            }
        })
        .collect()
}

/// Shape the category series for the chart payload.
///
/// Categories are grouped by period rather than by day, so they are not
/// reconciled against the grid. The chart view shows a single breakdown,
/// and the UI expects that leading entry to carry no `year`/`month`; they
/// are removed from the first element only.
pub fn shape_category_payload(mut categories: Vec<CategoryBreakdown>) -> Vec<CategoryBreakdown> {
    if let Some(first) = categories.first_mut() {
        first.year = None;
        first.month = None;
    }
    categories
}

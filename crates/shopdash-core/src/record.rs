//! Typed views over aggregation results.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::CoreError;
use crate::pipeline::Document;

/// Calendar bucket identifier. `day` is absent for monthly buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateKey {
    pub year: i32,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: Some(date.day()),
        }
    }
}

/// One grouped time-series row: the `_id` date key, the day of month for
/// daily rows, and the numeric metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(rename = "_id")]
    pub key: DateKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Number>,
}

impl MetricRecord {
    /// A record for `key` with every listed field set to zero.
    pub fn zeroed<'a>(key: DateKey, fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            key,
            day: key.day,
            metrics: fields
                .into_iter()
                .map(|f| (f.to_string(), Number::from(0)))
                .collect(),
        }
    }

    pub fn metric(&self, name: &str) -> Option<&Number> {
        self.metrics.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: Number,
}

/// Revenue and unit counts per product category for one period.
///
/// `key` is the grouping `_id` exactly as the aggregation produced it:
/// `{year, month}` for monthly buckets, `null` for the single daily bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    #[serde(rename = "_id", default)]
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub revenue: Vec<CategoryRevenue>,
    pub amount: Vec<CategoryAmount>,
}

/// Decode raw result documents into `T`.
pub fn decode<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>, CoreError> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(Value::Object(doc)).map_err(CoreError::from))
        .collect()
}

/// Numeric `field` of the first result row, or zero when there is no row
/// (count and group-all stages emit nothing for empty input).
pub fn first_number(docs: &[Document], field: &str) -> Number {
    docs.first()
        .and_then(|doc| doc.get(field))
        .and_then(|v| match v {
            Value::Number(n) => Some(n.clone()),
            _ => None,
        })
        .unwrap_or_else(|| Number::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn metric_record_round_trips_wire_shape() {
        let raw = doc(json!({
            "_id": {"year": 2024, "month": 3, "day": 2},
            "day": 2,
            "signUps": 4
        }));
        let records: Vec<MetricRecord> = decode(vec![raw]).expect("decode");
        assert_eq!(records[0].key, DateKey { year: 2024, month: 3, day: Some(2) });
        assert_eq!(records[0].metric("signUps"), Some(&Number::from(4)));

        let back = serde_json::to_value(&records[0]).expect("serialize");
        assert_eq!(back["_id"]["day"], 2);
        assert_eq!(back["signUps"], 4);
    }

    #[test]
    fn first_number_defaults_to_zero_on_empty_results() {
        assert_eq!(first_number(&[], "count"), Number::from(0));
        let rows = vec![doc(json!({"total": 7.5}))];
        assert_eq!(first_number(&rows, "total").as_f64(), Some(7.5));
        assert_eq!(first_number(&rows, "missing"), Number::from(0));
    }

    #[test]
    fn category_breakdown_keeps_grouping_id() {
        let raw = doc(json!({
            "_id": {"year": 2024, "month": 3},
            "year": 2024,
            "month": 3,
            "revenue": [{"category": "books", "revenue": 12.5}],
            "amount": [{"category": "books", "amount": 2}]
        }));
        let months: Vec<CategoryBreakdown> = decode(vec![raw]).expect("decode");
        assert_eq!(months[0].key, json!({"year": 2024, "month": 3}));

        let back = serde_json::to_value(&months[0]).expect("serialize");
        assert_eq!(back["_id"], json!({"year": 2024, "month": 3}));
        assert_eq!(back["amount"][0]["amount"], 2);

        let daily = doc(json!({"_id": null, "revenue": [], "amount": []}));
        let days: Vec<CategoryBreakdown> = decode(vec![daily]).expect("decode");
        let back = serde_json::to_value(&days[0]).expect("serialize");
        assert_eq!(back.get("_id"), Some(&Value::Null));
        assert!(back.get("year").is_none());
    }

    #[test]
    fn date_keys_order_chronologically() {
        let a = DateKey::from_date(NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"));
        let b = DateKey::from_date(NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"));
        assert!(a < b);
    }
}

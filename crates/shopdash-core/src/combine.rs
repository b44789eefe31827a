//! Joining two independently aggregated series on their date key.

use std::collections::BTreeMap;
use std::future::Future;

use crate::record::{DateKey, MetricRecord};

/// Await both series concurrently, then full-outer-join them by date key.
///
/// The first failure aborts the whole combination.
pub async fn combine_chart_data<A, B, E>(left: A, right: B) -> Result<Vec<MetricRecord>, E>
where
    A: Future<Output = Result<Vec<MetricRecord>, E>>,
    B: Future<Output = Result<Vec<MetricRecord>, E>>,
{
    let (left, right) = tokio::try_join!(left, right)?;
    Ok(join_by_date(&left, &right))
}

/// Full outer join keyed by [`DateKey`].
///
/// Each distinct key yields one new record holding the metrics of both
/// sides. Keys present on one side only keep just that side's metrics; the
/// gap-filler zeroes the rest. When both sides carry the same metric name
/// the left value wins. Output is sorted by key, but callers must not rely
/// on any particular order.
pub fn join_by_date(left: &[MetricRecord], right: &[MetricRecord]) -> Vec<MetricRecord> {
    let mut joined: BTreeMap<DateKey, MetricRecord> = BTreeMap::new();

    for record in left.iter().chain(right.iter()) {
        let entry = joined.entry(record.key).or_insert_with(|| MetricRecord {
            key: record.key,
            day: record.day,
            metrics: BTreeMap::new(),
        });
        if entry.day.is_none() {
            entry.day = record.day;
        }
        for (name, value) in &record.metrics {
            entry
                .metrics
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    joined.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;
    use std::collections::BTreeSet;

    fn record(day: u32, field: &str, value: i64) -> MetricRecord {
        MetricRecord {
            key: DateKey {
                year: 2024,
                month: 3,
                day: Some(day),
            },
            day: Some(day),
            metrics: [(field.to_string(), Number::from(value))].into_iter().collect(),
        }
    }

    #[test]
    fn outer_join_merges_matching_days_and_keeps_singletons() {
        let signups = vec![record(1, "signUps", 3), record(2, "signUps", 1)];
        let buys = vec![record(2, "firstBuys", 5), record(4, "firstBuys", 2)];

        let joined = join_by_date(&signups, &buys);
        assert_eq!(joined.len(), 3);

        let day2 = joined
            .iter()
            .find(|r| r.key.day == Some(2))
            .expect("day 2 present");
        assert_eq!(day2.metric("signUps"), Some(&Number::from(1)));
        assert_eq!(day2.metric("firstBuys"), Some(&Number::from(5)));

        let day4 = joined
            .iter()
            .find(|r| r.key.day == Some(4))
            .expect("day 4 present");
        assert_eq!(day4.metric("signUps"), None);
    }

    #[test]
    fn join_is_commutative_over_field_sets() {
        let a = vec![record(1, "revenue", 10), record(3, "revenue", 7)];
        let b = vec![record(3, "amount", 2), record(5, "amount", 9)];

        let summarize = |records: Vec<MetricRecord>| -> BTreeSet<(DateKey, Vec<String>)> {
            records
                .into_iter()
                .map(|r| (r.key, r.metrics.keys().cloned().collect()))
                .collect()
        };

        assert_eq!(
            summarize(join_by_date(&a, &b)),
            summarize(join_by_date(&b, &a))
        );
    }

    #[test]
    fn join_does_not_mutate_inputs() {
        let a = vec![record(1, "revenue", 10)];
        let b = vec![record(1, "amount", 2)];
        let before = (a.clone(), b.clone());
        let _ = join_by_date(&a, &b);
        assert_eq!((a, b), before);
    }

    #[tokio::test]
    async fn combine_awaits_both_series() {
        let left = async { Ok::<_, String>(vec![record(1, "orders", 1)]) };
        let right = async { Ok::<_, String>(vec![record(1, "comments", 4)]) };
        let joined = combine_chart_data(left, right).await.expect("combine");
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].metrics.len(), 2);
    }

    #[tokio::test]
    async fn combine_fails_when_either_side_fails() {
        let left = async { Ok::<_, String>(vec![record(1, "orders", 1)]) };
        let right = async { Err::<Vec<MetricRecord>, _>("boom".to_string()) };
        let err = combine_chart_data(left, right).await.expect_err("should fail");
        assert_eq!(err, "boom");
    }
}

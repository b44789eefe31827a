//! Dashboard views: totals snapshot, 30-day comparison and 30-day charts.
//!
//! Each view fans its independent read-only queries out concurrently and
//! fails as a whole if any one of them fails; no partial payload is ever
//! returned.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Number;

use crate::clock::Clock;
use crate::combine::combine_chart_data;
use crate::date_range::{ComparisonWindows, DateWindow};
use crate::error::CoreError;
use crate::executor::AggregationExecutor;
use crate::fragments;
use crate::gap_fill::{fill_gaps, shape_category_payload, CalendarGrid, ChartSeriesKind, FieldSet};
use crate::pipeline::{Collection, Document, Filter, Granularity, Stage};
use crate::record::{decode, first_number, CategoryBreakdown, MetricRecord};

/// Length of the chart grid and of each comparison window.
pub const WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_revenue: Number,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_users: u64,
    pub total_amounts: Number,
    pub total_comments: u64,
    pub total_customers: u64,
    pub user_to_customer_rate: String,
}

/// `[previous period, current period]`.
pub type ComparisonPair = [Number; 2];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    #[serde(rename = "last30DaysUsers")]
    pub users: ComparisonPair,
    #[serde(rename = "last30DaysCustomers")]
    pub customers: ComparisonPair,
    #[serde(rename = "last30DaysOrders")]
    pub orders: ComparisonPair,
    #[serde(rename = "last30DaysComments")]
    pub comments: ComparisonPair,
    #[serde(rename = "last30DaysRevenue")]
    pub revenue: ComparisonPair,
    #[serde(rename = "last30DaysAmounts")]
    pub amounts: ComparisonPair,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub users: Vec<MetricRecord>,
    pub comments: Vec<MetricRecord>,
    pub orders: Vec<MetricRecord>,
    pub sales: Vec<MetricRecord>,
    pub categories: Vec<CategoryBreakdown>,
}

/// `customers / users` as a percentage with two decimals.
pub fn user_to_customer_rate(customers: u64, users: u64) -> String {
    if users == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", customers as f64 / users as f64 * 100.0)
}

/// Builds dashboard payloads on top of an [`AggregationExecutor`].
#[derive(Clone)]
pub struct Dashboard {
    executor: Arc<dyn AggregationExecutor>,
    clock: Arc<dyn Clock>,
}

impl Dashboard {
    pub fn new(executor: Arc<dyn AggregationExecutor>, clock: Arc<dyn Clock>) -> Self {
        Self { executor, clock }
    }

    async fn count(&self, collection: Collection, filter: Option<Filter>) -> Result<u64, CoreError> {
        self.executor
            .count_documents(collection, filter.as_ref())
            .await
            .map_err(CoreError::Storage)
    }

    async fn aggregate(
        &self,
        collection: Collection,
        stages: Vec<Stage>,
    ) -> Result<Vec<Document>, CoreError> {
        tracing::debug!(
            collection = collection.as_str(),
            stages = stages.len(),
            "running aggregation"
        );
        self.executor
            .aggregate(collection, &stages)
            .await
            .map_err(CoreError::Storage)
    }

    async fn windowed(
        &self,
        collection: Collection,
        window: &DateWindow,
        fragment: Vec<Stage>,
    ) -> Result<Vec<Document>, CoreError> {
        let mut stages = window.to_stages();
        stages.extend(fragment);
        self.aggregate(collection, stages).await
    }

    async fn series(
        &self,
        collection: Collection,
        window: &DateWindow,
        fragment: Vec<Stage>,
    ) -> Result<Vec<MetricRecord>, CoreError> {
        decode(self.windowed(collection, window, fragment).await?)
    }

    /// Run `tail` in both comparison windows and read `field` from each.
    async fn compare(
        &self,
        collection: Collection,
        windows: &ComparisonWindows,
        tail: Vec<Stage>,
        field: &str,
    ) -> Result<ComparisonPair, CoreError> {
        let (previous, current) = tokio::try_join!(
            self.windowed(collection, &windows.previous, tail.clone()),
            self.windowed(collection, &windows.current, tail),
        )?;
        Ok([first_number(&previous, field), first_number(&current, field)])
    }

    /// All-time counts and sums. Empty collections yield zeros.
    #[tracing::instrument(skip(self))]
    pub async fn totals(&self) -> Result<Totals, CoreError> {
        let (users, orders, customers, products, comments, revenue, amounts) = tokio::try_join!(
            self.count(Collection::Users, None),
            self.count(Collection::Orders, None),
            self.count(Collection::Users, Some(fragments::has_orders())),
            self.count(Collection::Products, None),
            self.count(Collection::Comments, None),
            self.aggregate(Collection::Orders, fragments::revenue_sum("totalRevenue")),
            self.aggregate(Collection::Orders, fragments::amount_sum("totalAmounts")),
        )?;

        Ok(Totals {
            total_revenue: first_number(&revenue, "totalRevenue"),
            total_products: products,
            total_orders: orders,
            total_users: users,
            total_amounts: first_number(&amounts, "totalAmounts"),
            total_comments: comments,
            total_customers: customers,
            user_to_customer_rate: user_to_customer_rate(customers, users),
        })
    }

    /// Six metrics over the last 30 days against the 30 days before.
    #[tracing::instrument(skip(self))]
    pub async fn last_30_days(&self) -> Result<PeriodComparison, CoreError> {
        let windows = ComparisonWindows::ending_on(self.clock.today(), WINDOW_DAYS);
        tracing::debug!(
            current_start = %windows.current.start,
            previous_start = %windows.previous.start,
            previous_end = %windows.previous.end,
            "comparison windows"
        );

        let mut customers = fragments::first_buy_filter();
        customers.extend(fragments::count("count"));

        let (users, customers, orders, comments, revenue, amounts) = tokio::try_join!(
            self.compare(Collection::Users, &windows, fragments::count("count"), "count"),
            self.compare(Collection::Orders, &windows, customers, "count"),
            self.compare(Collection::Orders, &windows, fragments::count("count"), "count"),
            self.compare(Collection::Comments, &windows, fragments::count("count"), "count"),
            self.compare(Collection::Orders, &windows, fragments::revenue_sum("total"), "total"),
            self.compare(Collection::Orders, &windows, fragments::amount_sum("total"), "total"),
        )?;

        Ok(PeriodComparison {
            users,
            customers,
            orders,
            comments,
            revenue,
            amounts,
        })
    }

    /// Daily series for the last 30 days, gap-filled onto the calendar.
    #[tracing::instrument(skip(self))]
    pub async fn charts(&self) -> Result<ChartSet, CoreError> {
        let window = DateWindow::ending_on(self.clock.today(), WINDOW_DAYS);
        let daily = Granularity::Daily;

        let (users, comments, orders, sales, categories) = tokio::try_join!(
            combine_chart_data(
                self.series(Collection::Users, &window, fragments::sign_ups(daily)),
                self.series(Collection::Orders, &window, fragments::first_buys(daily)),
            ),
            self.series(Collection::Comments, &window, fragments::comments_created(daily)),
            self.series(Collection::Orders, &window, fragments::orders_created(daily)),
            combine_chart_data(
                self.series(Collection::Orders, &window, fragments::revenue(daily)),
                self.series(Collection::Orders, &window, fragments::amount(daily)),
            ),
            self.windowed(Collection::Orders, &window, fragments::category(daily)),
        )?;
        let categories: Vec<CategoryBreakdown> = decode(categories)?;

        let grid = CalendarGrid::for_window(&window);
        let fill = |kind: ChartSeriesKind, records: Vec<MetricRecord>| {
            let fields = FieldSet::for_series(kind, &records);
            fill_gaps(records, &grid, &fields)
        };

        Ok(ChartSet {
            users: fill(ChartSeriesKind::Users, users),
            comments: fill(ChartSeriesKind::Comments, comments),
            orders: fill(ChartSeriesKind::Orders, orders),
            sales: fill(ChartSeriesKind::Sales, sales),
            categories: shape_category_payload(categories),
        })
    }

    /// Category breakdown over every order, bucketed by `granularity`.
    #[tracing::instrument(skip(self))]
    pub async fn category_chart(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<CategoryBreakdown>, CoreError> {
        let rows = self
            .aggregate(Collection::Orders, fragments::category(granularity))
            .await?;
        decode(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns nothing for every query and remembers what it was asked.
    #[derive(Default)]
    struct EmptyExecutor {
        seen: Mutex<Vec<(Collection, Vec<Stage>)>>,
    }

    #[async_trait]
    impl AggregationExecutor for EmptyExecutor {
        async fn count_documents(
            &self,
            _collection: Collection,
            _filter: Option<&Filter>,
        ) -> anyhow::Result<u64> {
            Ok(0)
        }

        async fn aggregate(
            &self,
            collection: Collection,
            stages: &[Stage],
        ) -> anyhow::Result<Vec<Document>> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push((collection, stages.to_vec()));
            }
            Ok(Vec::new())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl AggregationExecutor for FailingExecutor {
        async fn count_documents(
            &self,
            _collection: Collection,
            _filter: Option<&Filter>,
        ) -> anyhow::Result<u64> {
            Ok(3)
        }

        async fn aggregate(
            &self,
            _collection: Collection,
            _stages: &[Stage],
        ) -> anyhow::Result<Vec<Document>> {
            Err(anyhow::anyhow!("connection reset"))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).expect("date")
    }

    fn dashboard(executor: Arc<dyn AggregationExecutor>) -> Dashboard {
        Dashboard::new(executor, Arc::new(FixedClock(today())))
    }

    #[test]
    fn rate_formats_two_decimals() {
        assert_eq!(user_to_customer_rate(1, 3), "33.33%");
        assert_eq!(user_to_customer_rate(2, 2), "100.00%");
        assert_eq!(user_to_customer_rate(0, 0), "0.00%");
    }

    #[tokio::test]
    async fn totals_default_to_zero_on_empty_store() {
        let totals = dashboard(Arc::new(EmptyExecutor::default()))
            .totals()
            .await
            .expect("totals");
        assert_eq!(totals.total_revenue, Number::from(0));
        assert_eq!(totals.total_amounts, Number::from(0));
        assert_eq!(totals.user_to_customer_rate, "0.00%");

        let json = serde_json::to_value(&totals).expect("serialize");
        assert_eq!(json["totalRevenue"], 0);
        assert_eq!(json["userToCustomerRate"], "0.00%");
    }

    #[tokio::test]
    async fn comparison_defaults_to_zero_pairs() {
        let comparison = dashboard(Arc::new(EmptyExecutor::default()))
            .last_30_days()
            .await
            .expect("comparison");
        let json = serde_json::to_value(&comparison).expect("serialize");
        for key in [
            "last30DaysUsers",
            "last30DaysCustomers",
            "last30DaysOrders",
            "last30DaysComments",
            "last30DaysRevenue",
            "last30DaysAmounts",
        ] {
            assert_eq!(json[key], json!([0, 0]), "{key}");
        }
    }

    #[tokio::test]
    async fn comparison_queries_both_windows() {
        let executor = Arc::new(EmptyExecutor::default());
        dashboard(executor.clone())
            .last_30_days()
            .await
            .expect("comparison");

        let seen = executor.seen.lock().expect("lock");
        assert_eq!(seen.len(), 12);
        let starts: std::collections::BTreeSet<NaiveDate> = seen
            .iter()
            .map(|(_, stages)| match &stages[0] {
                Stage::Match(Filter::DateRange { start, .. }) => start.date_naive(),
                other => panic!("expected date range, got {other:?}"),
            })
            .collect();
        let expected: std::collections::BTreeSet<NaiveDate> = [
            NaiveDate::from_ymd_opt(2024, 2, 1).expect("date"),
            NaiveDate::from_ymd_opt(2024, 3, 2).expect("date"),
        ]
        .into_iter()
        .collect();
        assert_eq!(starts, expected);
    }

    #[tokio::test]
    async fn charts_fill_every_series_to_thirty_days() {
        let charts = dashboard(Arc::new(EmptyExecutor::default()))
            .charts()
            .await
            .expect("charts");

        for (series, fields) in [
            (&charts.users, ChartSeriesKind::Users.fields()),
            (&charts.comments, ChartSeriesKind::Comments.fields()),
            (&charts.orders, ChartSeriesKind::Orders.fields()),
            (&charts.sales, ChartSeriesKind::Sales.fields()),
        ] {
            assert_eq!(series.len(), 30);
            assert_eq!(series[0].key.day, Some(2));
            assert_eq!(series[0].key.month, 3);
            assert_eq!(series[29].key.day, Some(31));
            for record in series.iter() {
                for field in fields {
                    assert_eq!(record.metric(field), Some(&Number::from(0)));
                }
            }
        }
        assert!(charts.categories.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_fails_the_whole_view() {
        let dash = dashboard(Arc::new(FailingExecutor));
        assert!(matches!(dash.totals().await, Err(CoreError::Storage(_))));
        assert!(matches!(dash.last_30_days().await, Err(CoreError::Storage(_))));
        assert!(matches!(dash.charts().await, Err(CoreError::Storage(_))));
    }
}

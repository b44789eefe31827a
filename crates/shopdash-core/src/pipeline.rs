//! Declarative aggregation stages.
//!
//! A pipeline is a plain `Vec<Stage>` handed unmodified to an
//! [`AggregationExecutor`](crate::executor::AggregationExecutor). Nothing in
//! this module performs I/O; stages only describe what the storage engine
//! should do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// A single result record as returned by the storage engine.
pub type Document = serde_json::Map<String, Value>;

/// The collections the dashboard reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Orders,
    Products,
    Comments,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Orders,
        Collection::Products,
        Collection::Comments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Orders => "orders",
            Collection::Products => "products",
            Collection::Comments => "comments",
        }
    }
}

/// Grouping resolution for a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    #[default]
    Monthly,
}

impl Granularity {
    /// Parse a granularity name. Anything other than `daily` or `monthly`
    /// is rejected with [`CoreError::InvalidArgument`].
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim() {
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            other => Err(CoreError::InvalidArgument(format!(
                "granularity must be one of: daily, monthly (got {other:?})"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }
}

/// A value expression evaluated against one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Dotted field path, e.g. `items.amount` or `_id.year`.
    Field(String),
    Literal(Value),
    Year(Box<Expr>),
    Month(Box<Expr>),
    DayOfMonth(Box<Expr>),
    Multiply(Vec<Expr>),
    /// Element `index` of an array-valued expression.
    ArrayElemAt(Box<Expr>, usize),
}

impl Expr {
    pub fn field(path: &str) -> Self {
        Expr::Field(path.to_string())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn year(inner: Expr) -> Self {
        Expr::Year(Box::new(inner))
    }

    pub fn month(inner: Expr) -> Self {
        Expr::Month(Box::new(inner))
    }

    pub fn day_of_month(inner: Expr) -> Self {
        Expr::DayOfMonth(Box::new(inner))
    }
}

/// Document predicate for [`Stage::Match`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    /// True when the field differs from `value`, including when it is absent.
    Ne { field: String, value: Value },
    /// Half-open instant range: `start <= field < end`.
    DateRange {
        field: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The field is an array with at least one element.
    NonEmptyArray { field: String },
    /// Both expressions evaluate to equal, present values.
    ExprEq(Expr, Expr),
    And(Vec<Filter>),
}

/// Per-group accumulator for [`Stage::Group`].
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Expr),
    First(Expr),
    /// Push one object per input document, built from the listed fields.
    Push(Vec<(String, Expr)>),
}

/// Group key. `Null` collapses every input document into one group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    Null,
    Fields(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// Emit one document per element of the named top-level array field.
    /// Documents whose field is missing or empty are dropped.
    Unwind(String),
    /// Attach every document of `from` whose `foreign_field` equals this
    /// document's `local_field` as an array under `as_field`.
    Lookup {
        from: Collection,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// Replace each document with exactly the listed computed fields.
    Project(Vec<(String, Expr)>),
    Group {
        key: GroupKey,
        accumulators: Vec<(String, Accumulator)>,
    },
    /// Replace the stream with a single `{name: n}` document, or with
    /// nothing at all when the input is empty.
    Count(String),
}

impl Stage {
    /// Short stage name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::Unwind(_) => "unwind",
            Stage::Lookup { .. } => "lookup",
            Stage::Project(_) => "project",
            Stage::Group { .. } => "group",
            Stage::Count(_) => "count",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_parses_known_values() {
        assert_eq!(Granularity::parse("daily").expect("daily"), Granularity::Daily);
        assert_eq!(Granularity::parse(" monthly ").expect("monthly"), Granularity::Monthly);
    }

    #[test]
    fn granularity_rejects_unknown_values() {
        let err = Granularity::parse("weekly").expect_err("weekly");
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(Granularity::parse("").is_err());
    }
}

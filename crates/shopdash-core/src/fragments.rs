//! Pipeline fragments for every dashboard metric.
//!
//! Each function returns stages to splice after an optional
//! [`date_range`](crate::date_range::date_range) match. Fragments are pure and
//! cheap to build; a new `Vec` is returned on every call.

use serde_json::Value;

use crate::date_range::CREATED_AT;
use crate::model::OrderStatus;
use crate::pipeline::{Accumulator, Collection, Expr, Filter, Granularity, GroupKey, Stage};

pub const SIGN_UPS: &str = "signUps";
pub const FIRST_BUYS: &str = "firstBuys";
pub const COMMENTS: &str = "comments";
pub const ORDERS: &str = "orders";
pub const REVENUE: &str = "revenue";
pub const AMOUNT: &str = "amount";

fn created_at() -> Expr {
    Expr::field(CREATED_AT)
}

fn one() -> Expr {
    Expr::literal(1)
}

/// `_id` for a time bucket: year and month, plus day for daily buckets.
fn period_key(granularity: Granularity) -> Vec<(String, Expr)> {
    let mut key = vec![
        ("year".to_string(), Expr::year(created_at())),
        ("month".to_string(), Expr::month(created_at())),
    ];
    if granularity == Granularity::Daily {
        key.push(("day".to_string(), Expr::day_of_month(created_at())));
    }
    key
}

/// Group by time bucket and accumulate one metric. Daily buckets also
/// carry a top-level `day` field for the chart axis.
fn group_by_period(granularity: Granularity, metric: &str, acc: Accumulator) -> Stage {
    let mut accumulators = vec![(metric.to_string(), acc)];
    if granularity == Granularity::Daily {
        accumulators.push((
            "day".to_string(),
            Accumulator::First(Expr::day_of_month(created_at())),
        ));
    }
    Stage::Group {
        key: GroupKey::Fields(period_key(granularity)),
        accumulators,
    }
}

/// Drop canceled orders. Every financial metric starts with this stage.
pub fn not_canceled() -> Stage {
    Stage::Match(Filter::Ne {
        field: "status".to_string(),
        value: Value::from(OrderStatus::Canceled.as_str()),
    })
}

/// Users that have placed at least one order.
pub fn has_orders() -> Filter {
    Filter::NonEmptyArray {
        field: "orders".to_string(),
    }
}

pub fn count(name: &str) -> Vec<Stage> {
    vec![Stage::Count(name.to_string())]
}

/// Sum `field` across all input into a single `{output: total}` row.
pub fn sum_into(field: &str, output: &str) -> Vec<Stage> {
    vec![
        Stage::Group {
            key: GroupKey::Null,
            accumulators: vec![(output.to_string(), Accumulator::Sum(Expr::field(field)))],
        },
        Stage::Project(vec![(output.to_string(), Expr::field(output))]),
    ]
}

/// Total order value of non-canceled orders, as `{output}`.
pub fn revenue_sum(output: &str) -> Vec<Stage> {
    let mut stages = vec![not_canceled()];
    stages.extend(sum_into("totalPrice", output));
    stages
}

/// Total units sold in non-canceled orders, as `{output}`.
pub fn amount_sum(output: &str) -> Vec<Stage> {
    let mut stages = vec![not_canceled(), Stage::Unwind("items".to_string())];
    stages.extend(sum_into("items.amount", output));
    stages
}

/// Keep only orders that are their buyer's first-ever order.
///
/// "First-ever" is global: the buyer's `orders[0]`, regardless of any date
/// window applied before this fragment.
pub fn first_buy_filter() -> Vec<Stage> {
    vec![
        Stage::Lookup {
            from: Collection::Users,
            local_field: "user".to_string(),
            foreign_field: "_id".to_string(),
            as_field: "buyer".to_string(),
        },
        Stage::Unwind("buyer".to_string()),
        Stage::Match(Filter::ExprEq(
            Expr::field("_id"),
            Expr::ArrayElemAt(Box::new(Expr::field("buyer.orders")), 0),
        )),
    ]
}

/// Users collection: new accounts per bucket.
pub fn sign_ups(granularity: Granularity) -> Vec<Stage> {
    vec![group_by_period(
        granularity,
        SIGN_UPS,
        Accumulator::Sum(one()),
    )]
}

/// Orders collection: buyers placing their first order per bucket.
pub fn first_buys(granularity: Granularity) -> Vec<Stage> {
    let mut stages = first_buy_filter();
    stages.push(group_by_period(
        granularity,
        FIRST_BUYS,
        Accumulator::Sum(one()),
    ));
    stages
}

/// Comments collection: comments written per bucket.
pub fn comments_created(granularity: Granularity) -> Vec<Stage> {
    vec![group_by_period(
        granularity,
        COMMENTS,
        Accumulator::Sum(one()),
    )]
}

/// Orders collection: orders placed per bucket, canceled ones included.
pub fn orders_created(granularity: Granularity) -> Vec<Stage> {
    vec![group_by_period(granularity, ORDERS, Accumulator::Sum(one()))]
}

/// Orders collection: non-canceled order value per bucket.
pub fn revenue(granularity: Granularity) -> Vec<Stage> {
    vec![
        not_canceled(),
        group_by_period(
            granularity,
            REVENUE,
            Accumulator::Sum(Expr::field("totalPrice")),
        ),
    ]
}

/// Orders collection: non-canceled units sold per bucket.
pub fn amount(granularity: Granularity) -> Vec<Stage> {
    vec![
        not_canceled(),
        Stage::Unwind("items".to_string()),
        group_by_period(
            granularity,
            AMOUNT,
            Accumulator::Sum(Expr::field("items.amount")),
        ),
    ]
}

/// Orders collection: revenue and units per product category.
///
/// Line items are joined to their product to learn the category, grouped
/// by (period, category), then regrouped by period into two parallel
/// arrays `revenue: [{category, revenue}]` and `amount: [{category, amount}]`.
///
/// `Monthly` buckets by year and month. `Daily` has no period key and
/// yields a single breakdown for the whole input, which is what the
/// 30-day chart shows.
pub fn category(granularity: Granularity) -> Vec<Stage> {
    let monthly = granularity == Granularity::Monthly;

    let mut projection = vec![(
        "category".to_string(),
        Expr::field("product.category"),
    )];
    if monthly {
        projection.push(("year".to_string(), Expr::year(created_at())));
        projection.push(("month".to_string(), Expr::month(created_at())));
    }
    projection.push((
        "totalRevenue".to_string(),
        Expr::Multiply(vec![
            Expr::field("items.amount"),
            Expr::field("items.price"),
        ]),
    ));
    projection.push(("totalAmount".to_string(), Expr::field("items.amount")));

    let mut category_key = Vec::new();
    if monthly {
        category_key.push(("year".to_string(), Expr::field("year")));
        category_key.push(("month".to_string(), Expr::field("month")));
    }
    category_key.push(("category".to_string(), Expr::field("category")));

    let (period_key, mut accumulators) = if monthly {
        (
            GroupKey::Fields(vec![
                ("year".to_string(), Expr::field("_id.year")),
                ("month".to_string(), Expr::field("_id.month")),
            ]),
            vec![
                ("year".to_string(), Accumulator::First(Expr::field("_id.year"))),
                ("month".to_string(), Accumulator::First(Expr::field("_id.month"))),
            ],
        )
    } else {
        (GroupKey::Null, Vec::new())
    };
    accumulators.push((
        REVENUE.to_string(),
        Accumulator::Push(vec![
            ("category".to_string(), Expr::field("_id.category")),
            ("revenue".to_string(), Expr::field("totalRevenue")),
        ]),
    ));
    accumulators.push((
        AMOUNT.to_string(),
        Accumulator::Push(vec![
            ("category".to_string(), Expr::field("_id.category")),
            ("amount".to_string(), Expr::field("totalAmount")),
        ]),
    ));

    vec![
        not_canceled(),
        Stage::Unwind("items".to_string()),
        Stage::Lookup {
            from: Collection::Products,
            local_field: "items._id".to_string(),
            foreign_field: "_id".to_string(),
            as_field: "product".to_string(),
        },
        Stage::Unwind("product".to_string()),
        Stage::Project(projection),
        Stage::Group {
            key: GroupKey::Fields(category_key),
            accumulators: vec![
                (
                    "totalRevenue".to_string(),
                    Accumulator::Sum(Expr::field("totalRevenue")),
                ),
                (
                    "totalAmount".to_string(),
                    Accumulator::Sum(Expr::field("totalAmount")),
                ),
            ],
        },
        Stage::Group {
            key: period_key,
            accumulators,
        },
    ]
}

//! Compiles [`Stage`] pipelines into a single DuckDB query.
//!
//! Every stage becomes one CTE over `(created_at, doc)` rows, where `doc` is
//! the JSON document as it stands after that stage. Expressions compile to
//! JSON-typed SQL values, so stages compose without knowing each other's
//! shape and the final CTE is read back as JSON text.
//!
//! Values are bound through `?` placeholders in the order they appear in the
//! SQL text. Field paths and output names come from code and are inlined as
//! quoted literals.

use shopdash_core::date_range::CREATED_AT;
use shopdash_core::pipeline::{Accumulator, Collection, Expr, Filter, GroupKey, Stage};

use crate::backend::sql_timestamp;

/// `json_type` results that `SUM` accepts. Anything else is skipped.
const NUMERIC_TYPES: &str = "('BIGINT', 'UBIGINT', 'DOUBLE')";
const INTEGRAL_TYPES: &str = "('BIGINT', 'UBIGINT')";

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Compile `stages` over `collection` into one query returning a single
/// `VARCHAR` column of result documents.
pub fn compile(collection: Collection, stages: &[Stage]) -> PipelineQuery {
    let mut builder = Builder::default();
    let mut ctes = vec![format!(
        "s0 AS (SELECT created_at, doc FROM {})",
        collection.as_str()
    )];
    for (i, stage) in stages.iter().enumerate() {
        let body = builder.stage(stage, &format!("s{i}"));
        ctes.push(format!("s{} AS ({body})", i + 1));
    }

    PipelineQuery {
        sql: format!(
            "WITH {}\nSELECT CAST(doc AS VARCHAR) FROM s{}",
            ctes.join(",\n"),
            stages.len()
        ),
        params: builder.params,
    }
}

/// Compile a document count over `collection`, optionally filtered.
pub fn compile_count(collection: Collection, filter: Option<&Filter>) -> PipelineQuery {
    let mut builder = Builder::default();
    let mut sql = format!("SELECT COUNT(*) FROM {}", collection.as_str());
    if let Some(filter) = filter {
        let condition = builder.filter(filter);
        sql.push_str(&format!(" WHERE {condition}"));
    }
    PipelineQuery {
        sql,
        params: builder.params,
    }
}

fn quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

fn json_path(path: &str) -> String {
    quote(&format!("$.{path}"))
}

/// A field as comparable JSON text; `NULL` when the field is missing.
fn field_text(path: &str) -> String {
    format!("CAST(json_extract(doc, {}) AS VARCHAR)", json_path(path))
}

/// `SUM` over a JSON column that stays integral until a float shows up.
fn sum_json(column: &str) -> String {
    let numeric = format!("FILTER (WHERE json_type({column}) IN {NUMERIC_TYPES})");
    format!(
        "COALESCE(CASE WHEN bool_and(json_type({column}) IN {INTEGRAL_TYPES}) {numeric} \
         THEN to_json(CAST(SUM(TRY_CAST({column} AS BIGINT)) {numeric} AS BIGINT)) \
         ELSE to_json(SUM(TRY_CAST({column} AS DOUBLE)) {numeric}) END, to_json(0))"
    )
}

#[derive(Default)]
struct Builder {
    params: Vec<String>,
}

impl Builder {
    fn bind(&mut self, value: String) -> &'static str {
        self.params.push(value);
        "?"
    }

    fn stage(&mut self, stage: &Stage, prev: &str) -> String {
        match stage {
            Stage::Match(filter) => {
                let condition = self.filter(filter);
                format!("SELECT created_at, doc FROM {prev} WHERE {condition}")
            }
            Stage::Unwind(field) => {
                let path = json_path(field);
                format!(
                    "SELECT created_at, json_merge_patch(doc, json_object({}, item)) AS doc \
                     FROM (SELECT created_at, doc, \
                     unnest(CAST(json_extract(doc, {path}) AS JSON[])) AS item \
                     FROM {prev} WHERE json_type(doc, {path}) = 'ARRAY')",
                    quote(field)
                )
            }
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => format!(
                "SELECT p.created_at, json_merge_patch(p.doc, json_object({}, \
                 COALESCE(m.matches, CAST('[]' AS JSON)))) AS doc \
                 FROM {prev} p \
                 LEFT JOIN (SELECT CAST(json_extract(doc, {}) AS VARCHAR) AS lookup_key, \
                 json_group_array(doc) AS matches FROM {} GROUP BY lookup_key) m \
                 ON CAST(json_extract(p.doc, {}) AS VARCHAR) = m.lookup_key",
                quote(as_field),
                json_path(foreign_field),
                from.as_str(),
                json_path(local_field),
            ),
            Stage::Project(fields) => {
                let object = self.object(fields);
                // Merging into `{}` drops fields that evaluated to null.
                format!(
                    "SELECT created_at, json_merge_patch(CAST('{{}}' AS JSON), {object}) AS doc \
                     FROM {prev}"
                )
            }
            Stage::Group { key, accumulators } => self.group(key, accumulators, prev),
            Stage::Count(name) => format!(
                "SELECT CAST(NULL AS TIMESTAMP) AS created_at, json_object({}, n) AS doc \
                 FROM (SELECT COUNT(*) AS n FROM {prev}) WHERE n > 0",
                quote(name)
            ),
        }
    }

    /// Per-row key and accumulator inputs are computed first, then grouped.
    /// Grouping a constant key still yields no row for empty input.
    fn group(&mut self, key: &GroupKey, accumulators: &[(String, Accumulator)], prev: &str) -> String {
        let key_sql = match key {
            GroupKey::Null => "CAST('null' AS JSON)".to_string(),
            GroupKey::Fields(fields) => self.object(fields),
        };

        let mut inputs = vec![format!("{key_sql} AS group_key")];
        let mut outputs = vec!["'_id', group_key".to_string()];
        for (i, (name, acc)) in accumulators.iter().enumerate() {
            let column = format!("acc_{i}");
            let (input, output) = match acc {
                Accumulator::Sum(expr) => (self.expr(expr), sum_json(&column)),
                Accumulator::First(expr) => (self.expr(expr), format!("first({column})")),
                Accumulator::Push(fields) => {
                    (self.object(fields), format!("json_group_array({column})"))
                }
            };
            inputs.push(format!("{input} AS {column}"));
            outputs.push(format!("{}, {output}", quote(name)));
        }

        format!(
            "SELECT CAST(NULL AS TIMESTAMP) AS created_at, json_object({}) AS doc \
             FROM (SELECT {} FROM {prev}) GROUP BY group_key",
            outputs.join(", "),
            inputs.join(", ")
        )
    }

    fn object(&mut self, fields: &[(String, Expr)]) -> String {
        let pairs: Vec<String> = fields
            .iter()
            .map(|(name, expr)| format!("{}, {}", quote(name), self.expr(expr)))
            .collect();
        format!("json_object({})", pairs.join(", "))
    }

    fn filter(&mut self, filter: &Filter) -> String {
        match filter {
            Filter::Eq { field, value } => {
                let bound = self.bind(value.to_string());
                format!(
                    "{} = CAST(CAST({bound} AS JSON) AS VARCHAR)",
                    field_text(field)
                )
            }
            Filter::Ne { field, value } => {
                let text = field_text(field);
                let bound = self.bind(value.to_string());
                format!("({text} IS NULL OR {text} <> CAST(CAST({bound} AS JSON) AS VARCHAR))")
            }
            Filter::DateRange { field, start, end } => {
                let column = self.timestamp(&Expr::field(field));
                let start = self.bind(sql_timestamp(start));
                let end = self.bind(sql_timestamp(end));
                format!(
                    "({column} >= CAST({start} AS TIMESTAMP) AND {column} < CAST({end} AS TIMESTAMP))"
                )
            }
            Filter::NonEmptyArray { field } => format!(
                "COALESCE(json_array_length(doc, {}) > 0, false)",
                json_path(field)
            ),
            Filter::ExprEq(left, right) => {
                let left = self.expr(left);
                let right = self.expr(right);
                format!("CAST({left} AS VARCHAR) = CAST({right} AS VARCHAR)")
            }
            Filter::And(filters) if filters.is_empty() => "true".to_string(),
            Filter::And(filters) => {
                let parts: Vec<String> = filters
                    .iter()
                    .map(|f| format!("({})", self.filter(f)))
                    .collect();
                parts.join(" AND ")
            }
        }
    }

    /// `createdAt` reads the typed column; other fields parse the JSON text.
    fn timestamp(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Field(path) if path == CREATED_AT => "created_at".to_string(),
            other => format!(
                "TRY_CAST(json_extract_string({}, '$') AS TIMESTAMP)",
                self.expr(other)
            ),
        }
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Field(path) => format!("json_extract(doc, {})", json_path(path)),
            Expr::Literal(value) => {
                let bound = self.bind(value.to_string());
                format!("CAST({bound} AS JSON)")
            }
            Expr::Year(inner) => format!("to_json(year({}))", self.timestamp(inner)),
            Expr::Month(inner) => format!("to_json(month({}))", self.timestamp(inner)),
            Expr::DayOfMonth(inner) => format!("to_json(day({}))", self.timestamp(inner)),
            Expr::Multiply(factors) if factors.is_empty() => "to_json(1)".to_string(),
            Expr::Multiply(factors) => {
                let parts: Vec<String> = factors
                    .iter()
                    .map(|f| format!("TRY_CAST({} AS DOUBLE)", self.expr(f)))
                    .collect();
                format!("to_json({})", parts.join(" * "))
            }
            Expr::ArrayElemAt(inner, index) => {
                format!("json_extract({}, '$[{index}]')", self.expr(inner))
            }
        }
    }
}

/// DuckDB initialization SQL.
///
/// Executed once at open time via `Connection::execute_batch`. Every
/// statement uses `IF NOT EXISTS` so re-running on each startup is safe.
///
/// Each collection is one table holding the document as DuckDB `JSON`
/// alongside its id and a typed `created_at` column. Pipelines read fields
/// with `json_extract`; date windows and date parts use the typed column,
/// which DuckDB prunes with its per-segment min/max statistics.
///
/// No secondary index on `created_at`: DuckDB rejects `INSERT OR REPLACE`
/// that rewrites an indexed column.
///
/// Always set an explicit memory limit; the DuckDB default (80% of system
/// RAM) is not acceptable for a server process.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

CREATE TABLE IF NOT EXISTS users (
    id              VARCHAR PRIMARY KEY,
    created_at      TIMESTAMP NOT NULL,
    doc             JSON NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id              VARCHAR PRIMARY KEY,
    created_at      TIMESTAMP NOT NULL,
    doc             JSON NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id              VARCHAR PRIMARY KEY,
    created_at      TIMESTAMP NOT NULL,
    doc             JSON NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id              VARCHAR PRIMARY KEY,
    created_at      TIMESTAMP NOT NULL,
    doc             JSON NOT NULL
);
"#
    )
}

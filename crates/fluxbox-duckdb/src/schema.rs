/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `FLUXBOX_DUCKDB_MEMORY`, default `"512MB"`). The account tables are
/// tiny; the explicit limit keeps DuckDB from sizing itself to host RAM.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- USER PLANS
-- ===========================================
-- One row per user who ever changed plan. No row = free plan.
CREATE TABLE IF NOT EXISTS user_plans (
    user_id         VARCHAR PRIMARY KEY,           -- identity provider subject
    plan_id         VARCHAR NOT NULL,              -- id from the static plan table
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- PAYMENT INTENTS
-- ===========================================
-- status: 'pending' -> 'confirmed' (exactly once; duplicate confirmations
-- are no-ops keyed by id).
CREATE TABLE IF NOT EXISTS payment_intents (
    id                  VARCHAR PRIMARY KEY,       -- 'pi_' + 24 hex chars
    user_id             VARCHAR NOT NULL,
    plan_id             VARCHAR NOT NULL,
    amount_minor_units  BIGINT NOT NULL,
    currency            VARCHAR(3) NOT NULL,
    status              VARCHAR NOT NULL DEFAULT 'pending',
    created_at          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    confirmed_at        TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_payment_intents_user ON payment_intents(user_id);
"#
    )
}

pub const MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    id          VARCHAR PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

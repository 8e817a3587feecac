//! Hosted Postgres access over the Supabase SQL-over-HTTP endpoint.
//!
//! Every statement goes through [`Db::query`]; values interpolated into
//! SQL must pass through [`quote_literal`] / [`opt_num`] first.

use crate::config::DatabaseConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Database layer errors.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// SQL-over-HTTP client for the hosted project database.
#[derive(Debug, Clone)]
pub struct Db {
    client: reqwest::Client,
    query_url: String,
    pat: String,
}

impl Db {
    pub fn new(cfg: &DatabaseConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            query_url: format!(
                "{}/v1/projects/{}/database/query",
                cfg.api_base, cfg.project
            ),
            pat: cfg.pat.clone(),
        }
    }

    /// Run a statement and return the result rows.
    pub async fn query(&self, sql: &str) -> Result<Vec<Value>, DbError> {
        let resp = self
            .client
            .post(&self.query_url)
            .bearer_auth(&self.pat)
            .json(&serde_json::json!({ "query": sql }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DbError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = resp.json().await?;
        Ok(match value {
            Value::Array(rows) => rows,
            // DDL and UPDATE statements come back as a bare object
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    /// Alias for statements run for their side effect.
    pub async fn execute(&self, sql: &str) -> Result<Vec<Value>, DbError> {
        self.query(sql).await
    }

    /// Create all tables if missing. Idempotent; the service runs
    /// without a database, so failures are reported, not fatal.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        self.execute(
            "CREATE TABLE IF NOT EXISTS dagens_kamp (
                id SERIAL PRIMARY KEY,
                dato DATE NOT NULL DEFAULT CURRENT_DATE,
                league TEXT,
                league_flag TEXT,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                commence_time TIMESTAMPTZ,
                pick TEXT,
                odds NUMERIC(6,3),
                ev_pct NUMERIC(6,2),
                confidence INTEGER,
                home_win_pct NUMERIC(5,1),
                draw_pct NUMERIC(5,1),
                away_win_pct NUMERIC(5,1),
                over25_pct NUMERIC(5,1),
                btts_pct NUMERIC(5,1),
                kelly_stake NUMERIC(5,2),
                simulation_data JSONB,
                rationale TEXT,
                resultat TEXT,
                home_score INTEGER,
                away_score INTEGER,
                result_source TEXT,
                result_checked_at TIMESTAMPTZ,
                posted_telegram BOOLEAN DEFAULT FALSE,
                result_posted_telegram BOOLEAN DEFAULT FALSE,
                matches_analyzed INTEGER DEFAULT 0,
                created_at TIMESTAMPTZ DEFAULT NOW(),
                UNIQUE(dato)
            )",
        )
        .await?;

        self.execute(
            "CREATE TABLE IF NOT EXISTS picks (
                pick_id SERIAL PRIMARY KEY,
                dato DATE NOT NULL,
                kamp TEXT NOT NULL,
                liga TEXT,
                pick TEXT NOT NULL,
                odds NUMERIC(6,3) NOT NULL,
                kickoff_odds NUMERIC(6,3),
                closing_odds NUMERIC(6,3),
                clv_beregnet NUMERIC(8,4),
                bookie TEXT,
                stake_planlagt NUMERIC(5,2),
                ev_prosent NUMERIC(6,2),
                tier INTEGER,
                resultat TEXT,
                pl_beregnet NUMERIC(8,4),
                created_at TIMESTAMPTZ DEFAULT NOW(),
                updated_at TIMESTAMPTZ
            )",
        )
        .await?;

        self.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ DEFAULT NOW()
            )",
        )
        .await?;

        self.execute(
            "CREATE TABLE IF NOT EXISTS bankroll (
                id SERIAL PRIMARY KEY,
                timestamp TIMESTAMPTZ DEFAULT NOW(),
                balance NUMERIC(12,2) DEFAULT 100.00,
                change NUMERIC(12,2) DEFAULT 0,
                source TEXT DEFAULT 'initial'
            )",
        )
        .await?;

        // Seed the starting balance exactly once
        self.execute(
            "INSERT INTO bankroll (balance, change, source)
             SELECT 100.00, 0, 'initial'
             WHERE NOT EXISTS (SELECT 1 FROM bankroll LIMIT 1)",
        )
        .await?;

        Ok(())
    }
}

/// Quote a string for SQL interpolation, doubling embedded quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render an optional number as a SQL literal or NULL.
pub fn opt_num(v: Option<f64>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "NULL".to_string(),
    }
}

// Row accessors. The SQL endpoint serializes NUMERIC columns as JSON
// strings, so the numeric getters accept both encodings.

pub fn row_str(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub fn row_f64(row: &Value, key: &str) -> f64 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn row_i64(row: &Value, key: &str) -> i64 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn row_bool(row: &Value, key: &str) -> bool {
    match row.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "t" || s == "true",
        _ => false,
    }
}

/// Log a schema failure without taking the daemon down.
pub fn log_schema_error(e: &DbError) {
    warn!("[DB] Schema initialization warning: {}", e);
    warn!("[DB] Continuing without database");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("Arsenal"), "'Arsenal'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal("a'; DROP TABLE picks; --"), "'a''; DROP TABLE picks; --'");
    }

    #[test]
    fn test_opt_num() {
        assert_eq!(opt_num(Some(1.95)), "1.95");
        assert_eq!(opt_num(None), "NULL");
    }

    #[test]
    fn test_row_accessors_handle_string_numerics() {
        let row = json!({
            "odds": "1.850",
            "confidence": 72,
            "home_team": "Arsenal",
            "posted_telegram": "t",
            "result_posted_telegram": false,
        });
        assert_eq!(row_f64(&row, "odds"), 1.85);
        assert_eq!(row_i64(&row, "confidence"), 72);
        assert_eq!(row_str(&row, "home_team"), "Arsenal");
        assert!(row_bool(&row, "posted_telegram"));
        assert!(!row_bool(&row, "result_posted_telegram"));
        assert_eq!(row_f64(&row, "missing"), 0.0);
    }
}

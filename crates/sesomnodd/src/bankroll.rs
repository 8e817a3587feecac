//! Play-money bankroll ledger.
//!
//! The ledger is append-only: every settlement inserts a new row with
//! the resulting balance, so the history doubles as an equity curve.

use crate::db::{quote_literal, row_f64, row_str, Db, DbError};
use serde_json::Value;
use sesomnod_common::{progress_bar, Outcome, BANKROLL_GOAL, BANKROLL_START, RESULT_DISCLAIMER};
use tracing::info;

/// Balance before and after a settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankrollDelta {
    pub before: f64,
    pub after: f64,
}

/// One ledger row, oldest last (query orders descending).
#[derive(Debug, Clone, serde::Serialize)]
pub struct BankrollEntry {
    pub timestamp: String,
    pub balance: f64,
    pub change: f64,
    pub source: String,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Current balance; the starting amount if the ledger is empty.
pub async fn current(db: &Db) -> Result<f64, DbError> {
    let rows = db
        .query("SELECT balance FROM bankroll ORDER BY timestamp DESC LIMIT 1")
        .await?;
    Ok(rows
        .first()
        .map(|row| row_f64(row, "balance"))
        .unwrap_or(BANKROLL_START))
}

/// Recent ledger rows, newest first.
pub async fn history(db: &Db, limit: u32) -> Result<Vec<BankrollEntry>, DbError> {
    let rows = db
        .query(&format!(
            "SELECT timestamp, balance, change, source FROM bankroll \
             ORDER BY timestamp DESC LIMIT {}",
            limit
        ))
        .await?;
    Ok(rows.iter().map(entry_from_row).collect())
}

fn entry_from_row(row: &Value) -> BankrollEntry {
    BankrollEntry {
        timestamp: row_str(row, "timestamp"),
        balance: row_f64(row, "balance"),
        change: row_f64(row, "change"),
        source: row_str(row, "source"),
    }
}

fn append_sql(balance: f64, change: f64, source: &str) -> String {
    format!(
        "INSERT INTO bankroll (balance, change, source) VALUES ({}, {}, {})",
        round2(balance),
        round2(change),
        quote_literal(source)
    )
}

async fn append(db: &Db, balance: f64, change: f64, source: &str) -> Result<(), DbError> {
    db.execute(&append_sql(balance, change, source)).await?;
    Ok(())
}

/// Planned stake in kroner for a stake percentage of the balance.
pub fn stake_amount(balance: f64, stake_pct: f64) -> f64 {
    round2(balance * stake_pct / 100.0)
}

/// Settle a winning pick: stake stays, profit is stake times (odds-1).
pub async fn apply_win(db: &Db, odds: f64, stake_pct: f64) -> Result<BankrollDelta, DbError> {
    let before = current(db).await?;
    let profit = round2(stake_amount(before, stake_pct) * (odds - 1.0));
    let after = round2(before + profit);
    append(db, after, profit, "win").await?;
    info!("[Bankroll] Win settled: {} -> {} (+{})", before, after, profit);
    Ok(BankrollDelta { before, after })
}

/// Settle a losing pick: the planned stake is deducted.
pub async fn apply_loss(db: &Db, stake_pct: f64) -> Result<BankrollDelta, DbError> {
    let before = current(db).await?;
    let stake = stake_amount(before, stake_pct);
    let after = round2(before - stake);
    append(db, after, -stake, "loss").await?;
    info!("[Bankroll] Loss settled: {} -> {} (-{})", before, after, stake);
    Ok(BankrollDelta { before, after })
}

/// Settle a push: the stake is returned, a zero-change row records it.
pub async fn apply_push(db: &Db) -> Result<BankrollDelta, DbError> {
    let before = current(db).await?;
    append(db, before, 0.0, "push").await?;
    Ok(BankrollDelta {
        before,
        after: before,
    })
}

/// Reset the ledger to the starting balance.
pub async fn reset(db: &Db) -> Result<f64, DbError> {
    append(db, BANKROLL_START, 0.0, "manual reset").await?;
    Ok(BANKROLL_START)
}

/// Apply a settled outcome to the ledger.
pub async fn apply_outcome(
    db: &Db,
    outcome: Outcome,
    odds: f64,
    stake_pct: f64,
) -> Result<BankrollDelta, DbError> {
    match outcome {
        Outcome::Win => apply_win(db, odds, stake_pct).await,
        Outcome::Loss => apply_loss(db, stake_pct).await,
        Outcome::Push => apply_push(db).await,
    }
}

/// The 23:00 daily summary Telegram message.
pub fn format_daily_summary(
    balance: f64,
    todays_match: Option<&str>,
    todays_result: Option<Outcome>,
    total_settled: u32,
    wins: u32,
    losses: u32,
) -> String {
    let pct = (balance / BANKROLL_GOAL * 100.0).min(100.0);
    let bar = progress_bar(pct, 10);

    let match_line = match (todays_match, todays_result) {
        (Some(m), Some(r)) => format!("{} <b>{}</b> — {}", r.emoji(), m, r.as_str()),
        (Some(m), None) => format!("⏳ <b>{}</b> — resultat ventes", m),
        _ => "Ingen kamp analysert i dag.".to_string(),
    };

    let winrate = if wins + losses > 0 {
        (wins as f64 / (wins + losses) as f64 * 100.0 * 10.0).round() / 10.0
    } else {
        0.0
    };

    format!(
        "🌙 <b>DAGENS OPPSUMMERING</b>\n\n\
         {match_line}\n\n\
         📊 <b>Totalt:</b> {total_settled} kamper | {wins}W – {losses}L | {winrate:.1}% treff\n\n\
         💰 <b>Bankroll: {balance:.0}kr</b>\n\
         {bar} {pct:.1}% av målet på {goal:.0}kr\n\n\
         📅 Neste analyse: I morgen kl. 06:00\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>SesomNod Engine · Daglig oppsummering</i>",
        goal = BANKROLL_GOAL,
        disclaimer = RESULT_DISCLAIMER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_amount() {
        assert_eq!(stake_amount(100.0, 2.5), 2.5);
        assert_eq!(stake_amount(1000.0, 5.0), 50.0);
        assert_eq!(stake_amount(333.33, 3.0), 10.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(99.994999), 99.99);
        assert_eq!(round2(-3.456), -3.46);
    }

    #[test]
    fn test_append_sql_escapes_source() {
        let sql = append_sql(102.5, 2.5, "win");
        assert_eq!(
            sql,
            "INSERT INTO bankroll (balance, change, source) VALUES (102.5, 2.5, 'win')"
        );

        let sql = append_sql(100.0, 0.0, "ledger'; DROP TABLE bankroll; --");
        assert!(sql.contains("'ledger''; DROP TABLE bankroll; --'"));
    }

    #[test]
    fn test_daily_summary_with_result() {
        let msg = format_daily_summary(
            250.0,
            Some("Arsenal vs Chelsea"),
            Some(Outcome::Win),
            10,
            6,
            4,
        );
        assert!(msg.contains("Arsenal vs Chelsea"));
        assert!(msg.contains("60.0% treff"));
        assert!(msg.contains("250kr"));
        assert!(msg.contains("2.5% av målet"));
    }

    #[test]
    fn test_daily_summary_pending_and_empty() {
        let pending = format_daily_summary(100.0, Some("A vs B"), None, 0, 0, 0);
        assert!(pending.contains("resultat ventes"));
        assert!(pending.contains("0.0% treff"));

        let empty = format_daily_summary(100.0, None, None, 0, 0, 0);
        assert!(empty.contains("Ingen kamp analysert i dag."));
    }
}

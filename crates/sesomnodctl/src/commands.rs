//! Command handlers for sesomnodctl.

use crate::client::EngineClient;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::Value;
use sesomnod_common::progress_bar;

const KW: usize = 16; // key column width

fn print_kv(key: &str, value: &str) {
    // Pad before styling so the ANSI codes don't skew the column
    println!("{} {}", format!("{:width$}", key, width = KW).dimmed(), value);
}

fn s(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn f(v: &Value, key: &str) -> f64 {
    match v.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(st)) => st.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub async fn status(client: &EngineClient) -> Result<()> {
    let health = client.get("/health").await?;
    println!();
    println!("{}", format!("sesomnodctl · {}", s(&health, "service")).bold());
    print_kv("status", &s(&health, "status"));
    print_kv("version", &s(&health, "version"));
    print_kv("uptime", &format!("{}s", f(&health, "uptime_seconds")));

    match client.get("/stats").await {
        Ok(stats) => {
            println!();
            print_kv(
                "picks",
                &format!(
                    "{} total · {}W {}L {}P · {} pending",
                    f(&stats, "total_picks"),
                    f(&stats, "wins"),
                    f(&stats, "losses"),
                    f(&stats, "pushes"),
                    f(&stats, "pending"),
                ),
            );
            print_kv("winrate", &format!("{:.1}%", f(&stats, "winrate")));
            print_kv("roi", &format!("{:.2}%", f(&stats, "roi")));
            print_kv("avg CLV", &format!("{:+.2}%", f(&stats, "avg_clv")));
        }
        Err(e) => println!("\n{} {}", "stats unavailable:".yellow(), e),
    }
    Ok(())
}

pub async fn analyze(client: &EngineClient, background: bool) -> Result<()> {
    if background {
        let resp = client.post("/dagens-kamp/analyze").await?;
        println!("{} {}", "→".cyan(), s(&resp, "message"));
        return Ok(());
    }
    println!("{}", "Analyserer dagens kamper...".dimmed());
    let resp = client.post("/dagens-kamp/analyze/sync").await?;
    if !s(&resp, "error").is_empty() {
        println!("{} {}", "✗".red(), s(&resp, "error"));
        return Ok(());
    }
    print_analysis(&resp);
    Ok(())
}

pub async fn today(client: &EngineClient) -> Result<()> {
    let resp = client.get("/dagens-kamp").await?;
    if !s(&resp, "error").is_empty() {
        println!("{} {}", "✗".red(), s(&resp, "error"));
        return Ok(());
    }
    print_analysis(&resp);
    Ok(())
}

fn print_analysis(resp: &Value) {
    let m = &resp["match"];
    let probs = &resp["probabilities"];
    let rec = &resp["recommendation"];

    println!();
    println!(
        "{} {}",
        s(m, "league_flag"),
        s(m, "league").bold()
    );
    println!(
        "{}",
        format!("{} vs {}", s(m, "home_team"), s(m, "away_team")).bold()
    );
    print_kv("kickoff", &s(m, "kickoff_display"));
    println!();
    print_kv("home win", &format!("{:.0}%", f(probs, "home_win")));
    print_kv("draw", &format!("{:.0}%", f(probs, "draw")));
    print_kv("away win", &format!("{:.0}%", f(probs, "away_win")));
    print_kv("over 2.5", &format!("{:.0}%", f(probs, "over25")));
    print_kv("btts", &format!("{:.0}%", f(probs, "btts")));
    println!();
    println!(
        "{} {} @ {:.2}",
        "pick:".dimmed(),
        s(rec, "pick").green().bold(),
        f(rec, "odds")
    );
    print_kv("EV", &format!("{:+.1}%", f(rec, "ev_pct")));
    print_kv("confidence", &format!("{:.0}%", f(rec, "confidence")));
    print_kv("kelly stake", &format!("{:.1}%", f(rec, "kelly_stake_pct")));

    let rationale = s(resp, "rationale");
    if !rationale.is_empty() {
        println!("\n{}", rationale.dimmed());
    }

    let resultat = s(resp, "resultat");
    if !resultat.is_empty() {
        println!(
            "\n{} {} ({}-{})",
            "resultat:".dimmed(),
            resultat.bold(),
            s(resp, "home_score"),
            s(resp, "away_score")
        );
    }
}

pub async fn history(client: &EngineClient, days: u32) -> Result<()> {
    let rows = client
        .get(&format!("/dagens-kamp/history?days={}", days))
        .await?;
    let Some(rows) = rows.as_array() else {
        println!("no history");
        return Ok(());
    };
    if rows.is_empty() {
        println!("no analyzed matches in the last {} days", days);
        return Ok(());
    }
    for row in rows {
        let result = s(row, "resultat");
        let marker = match result.as_str() {
            "W" => "✅".to_string(),
            "L" => "❌".to_string(),
            "P" => "↩️".to_string(),
            _ => "⏳".to_string(),
        };
        println!(
            "{} {}  {} {} vs {}  {} @ {:.2}",
            marker,
            s(row, "dato").dimmed(),
            s(row, "league_flag"),
            s(row, "home_team"),
            s(row, "away_team"),
            s(row, "pick"),
            f(row, "odds"),
        );
    }
    Ok(())
}

pub async fn summary(client: &EngineClient) -> Result<()> {
    let resp = client.post("/telegram/summary").await?;
    ack("daily summary", &resp);
    Ok(())
}

pub async fn test_telegram(client: &EngineClient) -> Result<()> {
    let resp = client.post("/telegram/test").await?;
    ack("test message", &resp);
    Ok(())
}

fn ack(what: &str, resp: &Value) {
    if resp["success"].as_bool().unwrap_or(false) {
        println!("{} {} sent to Telegram", "✓".green(), what);
    } else {
        println!("{} {} not sent (check daemon logs)", "✗".red(), what);
    }
}

pub async fn check_result(client: &EngineClient) -> Result<()> {
    let resp = client.post("/dagens-kamp/check-result").await?;
    if s(&resp, "status") == "found" {
        let result = &resp["result"];
        println!(
            "{} result: {} ({}-{})",
            "✓".green(),
            s(result, "resultat").bold(),
            s(result, "home_score"),
            s(result, "away_score"),
        );
    } else {
        println!("{}", s(&resp, "message").yellow());
    }
    Ok(())
}

pub async fn bankroll(client: &EngineClient, show_history: bool) -> Result<()> {
    let resp = client.get("/bankroll").await?;
    let current = f(&resp, "current");
    let goal = f(&resp, "goal");
    let pct = f(&resp, "progress_pct");

    println!();
    println!("{}", format!("bankroll: {:.0} kr", current).bold());
    print_kv("start", &format!("{:.0} kr", f(&resp, "start")));
    print_kv("goal", &format!("{:.0} kr", goal));
    println!("{} {:.1}%", progress_bar(pct, 20), pct);

    if show_history {
        if let Some(entries) = resp["history"].as_array() {
            println!();
            for e in entries {
                let change = f(e, "change");
                let sign = if change > 0.0 {
                    format!("+{:.2}", change).green().to_string()
                } else if change < 0.0 {
                    format!("{:.2}", change).red().to_string()
                } else {
                    format!("{:.2}", change)
                };
                println!(
                    "{}  {:>10.2} kr  {:>10}  {}",
                    s(e, "timestamp").dimmed(),
                    f(e, "balance"),
                    sign,
                    s(e, "source"),
                );
            }
        }
    }
    Ok(())
}

pub async fn kelly(
    client: &EngineClient,
    odds: f64,
    prob: f64,
    bankroll: f64,
    fraction: f64,
) -> Result<()> {
    let resp = client
        .get(&format!(
            "/kelly?odds={}&prob={}&bankroll={}&fraction={}",
            odds, prob, bankroll, fraction
        ))
        .await?;
    println!();
    print_kv("full kelly", &format!("{:.2}%", f(&resp, "kelly_full")));
    print_kv("fractional", &format!("{:.2}%", f(&resp, "kelly_fractional")));
    print_kv("stake", &format!("{:.2}% = {:.2} kr", f(&resp, "stake_pct"), f(&resp, "stake_amount")));
    print_kv("EV", &format!("{:+.2}%", f(&resp, "ev_pct")));
    print_kv("tier", &format!("{}", f(&resp, "recommended_tier")));
    Ok(())
}

//! Telegram delivery.
//!
//! All outbound posts go through [`Telegram::send`], which uses the Bot
//! API sendMessage endpoint with HTML parse mode. Delivery is
//! best-effort: failures are logged and reported as `false` so callers
//! can retry on the next scheduler tick instead of aborting.

use crate::config::TelegramConfig;
use crate::db::{row_f64, row_i64, row_str};
use chrono::Utc;
use serde_json::Value;
use sesomnod_common::DISCLAIMER;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Telegram {
    client: reqwest::Client,
    cfg: TelegramConfig,
}

impl Telegram {
    pub fn new(cfg: &TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            cfg: cfg.clone(),
        }
    }

    /// Token and chat id are both present.
    pub fn enabled(&self) -> bool {
        !self.cfg.token.is_empty() && !self.cfg.chat_id.is_empty()
    }

    /// Send an HTML message to the configured chat.
    pub async fn send(&self, text: &str) -> bool {
        if !self.enabled() {
            warn!("[Telegram] Not configured, dropping message");
            return false;
        }
        let url = format!("{}/bot{}/sendMessage", self.cfg.api_base, self.cfg.token);
        let result = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.cfg.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!("[Telegram] Message sent ({} chars)", text.chars().count());
                true
            }
            Ok(resp) => {
                warn!("[Telegram] Send failed with status {}", resp.status());
                false
            }
            Err(e) => {
                warn!("[Telegram] Send error: {}", e);
                false
            }
        }
    }
}

fn tier_emoji(tier: i64) -> &'static str {
    match tier {
        1 => "🔥",
        2 => "⚡",
        _ => "📊",
    }
}

fn today_display() -> String {
    Utc::now().format("%d.%m.%Y").to_string()
}

/// Message for a manually tracked pick (picks table row).
pub fn format_pick_post(pick: &Value, safe_mode: bool) -> String {
    let tier = row_i64(pick, "tier");
    let mode_tag = if safe_mode { "🔒 SAFE MODE" } else { "🚀 LIVE PICK" };
    format!(
        "<b>⚽ SESOMNOD ENGINE</b>\n\
         {mode_tag} {emoji} TIER {tier}\n\n\
         <b>Kamp:</b> {kamp}\n\
         <b>Liga:</b> {liga}\n\
         <b>Pick:</b> {pick_label}\n\
         <b>Odds:</b> {odds:.2}\n\
         <b>Bookie:</b> {bookie}\n\
         <b>Stake:</b> {stake:.1}%\n\n\
         📈 <b>EV:</b> +{ev:.1}%\n\
         📊 <b>Est. CLV:</b> +{clv:.1}%\n\n\
         <i>⚠️ {disclaimer}</i>\n\n\
         <i>SesomNod Engine · {date}</i>",
        emoji = tier_emoji(tier),
        kamp = row_str(pick, "kamp"),
        liga = row_str(pick, "liga"),
        pick_label = row_str(pick, "pick"),
        odds = row_f64(pick, "odds"),
        bookie = row_str(pick, "bookie"),
        stake = row_f64(pick, "stake_planlagt"),
        ev = row_f64(pick, "ev_prosent"),
        clv = row_f64(pick, "clv_beregnet"),
        disclaimer = DISCLAIMER,
        date = today_display(),
    )
}

/// Message for a settled pick (picks table row with resultat set).
pub fn format_result_post(pick: &Value) -> String {
    let result = row_str(pick, "resultat");
    let result_emoji = match result.as_str() {
        "W" => "✅",
        "L" => "❌",
        "P" => "↩️",
        _ => "❓",
    };
    let pl = row_f64(pick, "pl_beregnet");
    let pl_str = if pl > 0.0 {
        format!("+{:.2}%", pl)
    } else {
        format!("{:.2}%", pl)
    };
    format!(
        "<b>📋 RESULTAT REGISTRERT</b>\n\n\
         <b>Kamp:</b> {kamp}\n\
         <b>Pick:</b> {pick_label} @ {odds:.2}\n\
         <b>Resultat:</b> {result_emoji} {result}\n\
         <b>P/L:</b> {pl_str}\n\
         <b>CLV:</b> {clv:+.2}%\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>SesomNod Engine · {date}</i>",
        kamp = row_str(pick, "kamp"),
        pick_label = row_str(pick, "pick"),
        odds = row_f64(pick, "odds"),
        clv = row_f64(pick, "clv_beregnet"),
        disclaimer = DISCLAIMER,
        date = today_display(),
    )
}

/// Connectivity test message.
pub fn format_test_post(bankroll: f64, goal: f64) -> String {
    let pct = (bankroll / goal * 100.0).min(100.0);
    format!(
        "<b>🔧 SESOMNOD ENGINE v3.0 — TEST</b>\n\n\
         ✅ Backend API tilkoblet\n\
         ✅ Database aktiv\n\
         ✅ Telegram-integrasjon fungerer\n\
         ✅ Dagens Kamp-motor klar\n\
         ✅ Automatisk resultat-sjekk aktiv\n\
         ✅ Bankroll-tracker aktiv\n\n\
         💰 Bankroll: {bankroll:.0}kr ({pct:.1}% av {goal:.0}kr)\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>Alt er klart for full automatisering!</i>",
        disclaimer = DISCLAIMER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_pick() -> Value {
        json!({
            "pick_id": 1,
            "kamp": "Arsenal vs Chelsea",
            "liga": "Premier League",
            "pick": "Arsenal vinner",
            "odds": "1.850",
            "bookie": "Pinnacle",
            "stake_planlagt": 2.5,
            "ev_prosent": 4.2,
            "clv_beregnet": 1.3,
            "tier": 1,
            "resultat": "W",
            "pl_beregnet": 2.13,
        })
    }

    #[test]
    fn test_pick_post_modes_and_tier() {
        let safe = format_pick_post(&sample_pick(), true);
        assert!(safe.contains("🔒 SAFE MODE"));
        assert!(safe.contains("🔥 TIER 1"));
        assert!(safe.contains("Arsenal vs Chelsea"));
        assert!(safe.contains("Odds:</b> 1.85"));

        let live = format_pick_post(&sample_pick(), false);
        assert!(live.contains("🚀 LIVE PICK"));
    }

    #[test]
    fn test_result_post_sign_formatting() {
        let msg = format_result_post(&sample_pick());
        assert!(msg.contains("✅ W"));
        assert!(msg.contains("+2.13%"));
        assert!(msg.contains("+1.30%"));

        let mut lost = sample_pick();
        lost["resultat"] = json!("L");
        lost["pl_beregnet"] = json!(-2.5);
        let msg = format_result_post(&lost);
        assert!(msg.contains("❌ L"));
        assert!(msg.contains("-2.50%"));
    }

    #[test]
    fn test_test_post_progress() {
        let msg = format_test_post(500.0, 10_000.0);
        assert!(msg.contains("500kr"));
        assert!(msg.contains("5.0% av 10000kr"));
    }

    #[test]
    fn test_disabled_without_credentials() {
        let tg = Telegram::new(&crate::config::TelegramConfig::default());
        assert!(!tg.enabled());
    }
}

//! API request/response types shared between the daemon and the CLI.
//!
//! Field names mirror the hosted database schema (Norwegian column
//! names like `dato`, `kamp`, `liga`, `resultat`) so JSON payloads stay
//! compatible with existing rows and dashboard consumers.

use crate::Outcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `GET /health` response, polled by the container health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// `POST /picks` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickCreate {
    /// ISO date the pick is for.
    pub dato: String,
    /// Match label, e.g. "Arsenal vs Chelsea".
    pub kamp: String,
    pub liga: String,
    pub pick: String,
    pub odds: f64,
    pub bookie: String,
    /// Planned stake as percent of bankroll.
    pub stake_planlagt: f64,
    /// Tier 1 (strongest) to 3.
    pub tier: u8,
    #[serde(default)]
    pub ev_prosent: Option<f64>,
    #[serde(default)]
    pub kickoff_odds: Option<f64>,
    #[serde(default)]
    pub closing_odds: Option<f64>,
}

/// `PUT /picks/:id/result` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultUpdate {
    pub resultat: Outcome,
    #[serde(default)]
    pub closing_odds: Option<f64>,
}

/// `PUT /settings` request body (upsert).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingUpdate {
    pub key: String,
    pub value: String,
}

/// Aggregate pick statistics (`GET /stats`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_picks: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
    pub pending: i64,
    /// Winrate in percent over settled (non-push) picks.
    pub winrate: f64,
    pub total_pl: f64,
    pub roi: f64,
    pub avg_clv: f64,
    pub avg_ev: f64,
}

/// Kelly calculator output (`GET /kelly`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyResponse {
    /// Full Kelly as percent of bankroll.
    pub kelly_full: f64,
    /// Fractional Kelly as percent of bankroll.
    pub kelly_fractional: f64,
    pub stake_pct: f64,
    pub stake_amount: f64,
    pub ev_pct: f64,
    pub recommended_tier: u8,
}

/// Current bankroll and goal progress (`GET /bankroll`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollResponse {
    pub current: f64,
    pub goal: f64,
    pub start: f64,
    pub progress_pct: f64,
    pub history: Vec<serde_json::Value>,
}

/// Generic acknowledgement for Telegram send endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Acknowledgement for background analysis trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub message: String,
}

/// The selected match of the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub league: String,
    pub league_flag: String,
    pub home_team: String,
    pub away_team: String,
    /// RFC 3339 kickoff time (UTC).
    pub commence_time: String,
    #[serde(default)]
    pub hours_to_kickoff: f64,
    /// Human kickoff display in CET, e.g. "4. okt kl. 18:30".
    pub kickoff_display: String,
}

/// Consensus 1X2 odds for the selected match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Most relevant Asian handicap line derived from 1X2 probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsianHandicap {
    pub line: String,
    pub home_ah: f64,
    pub away_ah: f64,
    pub label: String,
}

/// Market-derived probabilities, all in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub over25: f64,
    pub btts: f64,
    pub asian_handicap: AsianHandicap,
}

/// The recommended bet for the selected match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub pick: String,
    pub odds: f64,
    pub market: String,
    pub ev_pct: f64,
    /// Match confidence score, 45..=99.
    pub confidence: u8,
    pub kelly_stake_pct: f64,
}

/// One simulated scoreline and how often it occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCount {
    pub score: String,
    pub count: u32,
    pub pct: f64,
}

/// Monte Carlo simulation summary for the selected match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub simulations: u32,
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
    pub home_win_pct: f64,
    pub draw_pct: f64,
    pub away_win_pct: f64,
    pub over25_pct: f64,
    pub btts_pct: f64,
    pub home_xg: f64,
    pub away_xg: f64,
    pub top_scores: Vec<ScoreCount>,
    /// Total-goals histogram keyed "0".."6" (6 buckets 6+).
    pub goal_histogram: BTreeMap<String, u32>,
}

/// Runner-up candidate shown alongside the selected match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopAlternative {
    pub league: String,
    #[serde(rename = "match")]
    pub match_label: String,
    pub pick: String,
    pub odds: f64,
    pub ev: f64,
    pub confidence: u8,
}

/// Full analysis payload (`POST /dagens-kamp/analyze/sync`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub analyzed_at: String,
    pub matches_analyzed: usize,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
    pub odds: MatchOdds,
    pub probabilities: Probabilities,
    pub recommendation: Recommendation,
    pub simulations: SimulationSummary,
    pub rationale: String,
    pub disclaimer: String,
    pub top_alternatives: Vec<TopAlternative>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_rename_on_wire() {
        let alt = TopAlternative {
            league: "🏴 Premier League".to_string(),
            match_label: "Arsenal – Chelsea".to_string(),
            pick: "Arsenal vinner".to_string(),
            odds: 1.85,
            ev: 4.2,
            confidence: 78,
        };
        let json = serde_json::to_value(&alt).unwrap();
        assert!(json.get("match").is_some());
        assert!(json.get("match_label").is_none());
    }

    #[test]
    fn test_pick_create_optional_fields_default() {
        let body = r#"{
            "dato": "2026-08-23",
            "kamp": "Arsenal vs Chelsea",
            "liga": "Premier League",
            "pick": "Over 2.5 mål",
            "odds": 1.9,
            "bookie": "bet365",
            "stake_planlagt": 2.0,
            "tier": 2
        }"#;
        let pick: PickCreate = serde_json::from_str(body).unwrap();
        assert!(pick.ev_prosent.is_none());
        assert!(pick.closing_odds.is_none());
        assert_eq!(pick.tier, 2);
    }
}

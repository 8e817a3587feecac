//! Dagens Kamp analysis engine.
//!
//! Strategy:
//! 1. Fetch upcoming matches from the top five leagues via The Odds API
//! 2. Extract vig-free probabilities from consensus bookmaker odds
//! 3. Score each match by EV potential, market consensus and confidence
//! 4. Run Monte Carlo simulations for the top candidate
//! 5. Return the full analysis with probabilities and confidence score

use crate::config::OddsConfig;
use crate::simulation;
use chrono::{DateTime, Timelike, Utc};
use serde::Deserialize;
use sesomnod_common::{
    AnalysisResponse, AsianHandicap, MatchInfo, MatchOdds, Probabilities, Recommendation,
    SimulationSummary, TopAlternative, DISCLAIMER,
};
use std::time::Duration;
use tracing::warn;

/// A league tracked by the engine.
pub struct League {
    /// The Odds API sport key.
    pub key: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

pub const TOP5_LEAGUES: [League; 5] = [
    League { key: "soccer_epl", name: "Premier League", flag: "🏴󠁧󠁢󠁥󠁮󠁧󠁿" },
    League { key: "soccer_spain_la_liga", name: "La Liga", flag: "🇪🇸" },
    League { key: "soccer_italy_serie_a", name: "Serie A", flag: "🇮🇹" },
    League { key: "soccer_germany_bundesliga", name: "Bundesliga", flag: "🇩🇪" },
    League { key: "soccer_france_ligue_one", name: "Ligue 1", flag: "🇫🇷" },
];

/// Analysis failures surfaced to handlers.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// No candidate matches inside the kickoff window.
    #[error("ingen kamper funnet")]
    NoMatches,

    #[error("odds fetch failed: {0}")]
    Http(#[from] reqwest::Error),
}

// ── The Odds API wire types ──────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    pub commence_time: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomePrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomePrice {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub point: Option<f64>,
}

// ── Probability helpers ──────────────────────────────────────

/// Vig-free 1X2 probabilities plus the bookmaker margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrueProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    /// Bookmaker margin in percent.
    pub vig: f64,
}

/// Remove the bookmaker margin to get true probabilities.
pub fn remove_vig(home_odds: f64, draw_odds: f64, away_odds: f64) -> TrueProbs {
    let raw_home = 1.0 / home_odds;
    let raw_draw = 1.0 / draw_odds;
    let raw_away = 1.0 / away_odds;
    let total = raw_home + raw_draw + raw_away;

    TrueProbs {
        home: round4(raw_home / total),
        draw: round4(raw_draw / total),
        away: round4(raw_away / total),
        vig: round2((total - 1.0) * 100.0),
    }
}

/// Estimate Over 2.5 probability from 1X2 probabilities.
///
/// Decisive results correlate with more goals; a high draw probability
/// means a low-scoring match is expected.
pub fn implied_over25(home_prob: f64, draw_prob: f64, away_prob: f64) -> f64 {
    let decisive = home_prob + away_prob;
    let base = 0.35 + decisive * 0.42 - draw_prob * 0.15;
    round4(base.clamp(0.28, 0.88))
}

/// Estimate Both Teams To Score probability.
///
/// BTTS correlates with competitive matches where neither side
/// dominates; draws are often 1-1 or 2-2.
pub fn implied_btts(home_prob: f64, draw_prob: f64, away_prob: f64) -> f64 {
    let competitiveness = 1.0 - (home_prob - away_prob).abs();
    let base = 0.30 + competitiveness * 0.35 + draw_prob * 0.3;
    round4(base.clamp(0.25, 0.82))
}

/// Derive the most relevant Asian handicap line.
pub fn implied_asian_handicap(home_prob: f64, away_prob: f64) -> AsianHandicap {
    let diff = home_prob - away_prob;

    if diff.abs() < 0.08 {
        // Very even match: draw no bet
        let total = home_prob + away_prob;
        AsianHandicap {
            line: "0".to_string(),
            home_ah: round4(home_prob / total),
            away_ah: round4(away_prob / total),
            label: "Draw No Bet".to_string(),
        }
    } else if diff > 0.0 {
        let line = if diff < 0.20 { "-0.5" } else { "-1" };
        let adj_home = home_prob * (1.0 - diff.abs() * 0.3);
        AsianHandicap {
            line: format!("Home {}", line),
            home_ah: round4(adj_home),
            away_ah: round4(1.0 - adj_home),
            label: format!("Home {} AH", line),
        }
    } else {
        let line = if diff.abs() < 0.20 { "+0.5" } else { "+1" };
        let adj_away = away_prob * (1.0 - diff.abs() * 0.3);
        AsianHandicap {
            line: format!("Away {}", line),
            home_ah: round4(1.0 - adj_away),
            away_ah: round4(adj_away),
            label: format!("Away {} AH", line),
        }
    }
}

/// Expected value in percent for a bet at `offered_odds`.
pub fn expected_value(true_prob: f64, offered_odds: f64) -> f64 {
    round2((true_prob * offered_odds - 1.0) * 100.0)
}

/// Match confidence score, clamped 45..=99.
pub fn confidence_score(
    market_consensus: f64,
    ev: f64,
    vig: f64,
    num_bookmakers: usize,
    hours_to_kickoff: f64,
) -> u8 {
    let mut score = 50.0;

    score += (market_consensus * 20.0).min(15.0);

    if ev > 5.0 {
        score += 15.0;
    } else if ev > 2.0 {
        score += 8.0;
    } else if ev > 0.0 {
        score += 3.0;
    }

    // Low vig means an efficient, reliable market
    if vig < 4.0 {
        score += 10.0;
    } else if vig < 6.0 {
        score += 5.0;
    }

    score += (num_bookmakers as f64 * 1.5).min(10.0);

    if (12.0..=48.0).contains(&hours_to_kickoff) {
        score += 5.0;
    }

    (score as i64).clamp(45, 99) as u8
}

/// Fractional Kelly stake in percent of bankroll, capped at 5%.
pub fn kelly_stake(prob: f64, odds: f64, fraction: f64) -> f64 {
    let b = odds - 1.0;
    let q = 1.0 - prob;
    let kelly = (b * prob - q) / b;
    round2((kelly * fraction * 100.0).clamp(0.0, 5.0))
}

// ── Candidate selection ──────────────────────────────────────

/// Market recommended for a candidate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMarket {
    H2h,
    Totals,
}

impl PickMarket {
    pub fn label(&self) -> &'static str {
        match self {
            Self::H2h => "1X2",
            Self::Totals => "Totals",
        }
    }
}

/// A match with everything needed to rank it for selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub league_name: &'static str,
    pub league_flag: &'static str,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    pub hours_to_kickoff: f64,
    pub home_odds: f64,
    pub draw_odds: f64,
    pub away_odds: f64,
    pub true_probs: TrueProbs,
    pub over25_prob: f64,
    pub btts_prob: f64,
    pub best_ev: f64,
    pub best_pick: String,
    pub best_odds: f64,
    pub best_market: PickMarket,
    pub confidence: u8,
    pub num_bookmakers: usize,
}

/// Score a candidate for selection; higher is better.
pub fn selection_score(c: &Candidate) -> f64 {
    let mut score = 0.0;

    // EV is king
    score += c.best_ev.max(0.0) * 3.0;
    score += c.confidence as f64 * 0.5;
    score += c.num_bookmakers as f64 * 2.0;

    if (6.0..=72.0).contains(&c.hours_to_kickoff) {
        score += 20.0;
    } else if c.hours_to_kickoff < 6.0 {
        // Too close, odds may be locked
        score -= 30.0;
    }

    if c.true_probs.home.max(c.true_probs.away) > 0.55 {
        score += 10.0;
    }

    score
}

/// Median consensus 1X2 odds across bookmakers.
#[derive(Debug, Clone, Copy)]
pub struct H2hOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Mean consensus odds for the 2.5 totals line.
#[derive(Debug, Clone, Copy)]
pub struct TotalsOdds {
    pub over: f64,
    pub under: f64,
}

/// Extract median h2h odds, matching outcomes by team name.
pub fn consensus_h2h(
    bookmakers: &[Bookmaker],
    home_team: &str,
    away_team: &str,
) -> Option<H2hOdds> {
    let mut home = Vec::new();
    let mut draw = Vec::new();
    let mut away = Vec::new();

    for bk in bookmakers {
        for market in &bk.markets {
            if market.key != "h2h" {
                continue;
            }
            for outcome in &market.outcomes {
                if outcome.name == home_team {
                    home.push(outcome.price);
                } else if outcome.name == away_team {
                    away.push(outcome.price);
                } else if outcome.name == "Draw" {
                    draw.push(outcome.price);
                }
            }
        }
    }

    if home.is_empty() || away.is_empty() {
        return None;
    }

    Some(H2hOdds {
        home: round3(median(&mut home)),
        draw: if draw.is_empty() { 3.4 } else { round3(median(&mut draw)) },
        away: round3(median(&mut away)),
    })
}

/// Extract mean Over/Under odds for the 2.5 goals line.
pub fn consensus_totals(bookmakers: &[Bookmaker]) -> Option<TotalsOdds> {
    let mut over = Vec::new();
    let mut under = Vec::new();

    for bk in bookmakers {
        for market in &bk.markets {
            if market.key != "totals" {
                continue;
            }
            for outcome in &market.outcomes {
                let point = outcome.point.unwrap_or(0.0);
                if (point - 2.5).abs() < 0.1 {
                    match outcome.name.as_str() {
                        "Over" => over.push(outcome.price),
                        "Under" => under.push(outcome.price),
                        _ => {}
                    }
                }
            }
        }
    }

    if over.is_empty() {
        return None;
    }

    let mean = |v: &[f64]| round3(v.iter().sum::<f64>() / v.len() as f64);
    Some(TotalsOdds {
        over: mean(&over),
        under: if under.is_empty() { 1.9 } else { mean(&under) },
    })
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Build a candidate from one Odds API event, or skip it.
pub fn build_candidate(
    event: &OddsEvent,
    league: &League,
    now: DateTime<Utc>,
) -> Option<Candidate> {
    let commence = DateTime::parse_from_rfc3339(&event.commence_time).ok()?;
    let hours_to_kickoff = (commence.with_timezone(&Utc) - now).num_seconds() as f64 / 3600.0;
    if !(6.0..=96.0).contains(&hours_to_kickoff) {
        return None;
    }

    let h2h = consensus_h2h(&event.bookmakers, &event.home_team, &event.away_team)?;
    let true_probs = remove_vig(h2h.home, h2h.draw, h2h.away);

    // Best EV across 1X2
    let mut best_ev = 0.0;
    let mut best_pick = String::new();
    let mut best_odds = 0.0;
    let mut best_market = PickMarket::H2h;

    let h2h_options = [
        (true_probs.home, h2h.home, format!("{} vinner", event.home_team)),
        (true_probs.draw, h2h.draw, "Uavgjort".to_string()),
        (true_probs.away, h2h.away, format!("{} vinner", event.away_team)),
    ];
    for (prob, odds, label) in h2h_options {
        let ev = expected_value(prob, odds);
        if ev > best_ev {
            best_ev = ev;
            best_pick = label;
            best_odds = odds;
        }
    }

    let over25_prob = implied_over25(true_probs.home, true_probs.draw, true_probs.away);
    if let Some(totals) = consensus_totals(&event.bookmakers) {
        let over_ev = expected_value(over25_prob, totals.over);
        if over_ev > best_ev {
            best_ev = over_ev;
            best_pick = "Over 2.5 mål".to_string();
            best_odds = totals.over;
            best_market = PickMarket::Totals;
        }
    }

    if best_pick.is_empty() {
        return None;
    }

    let num_bookmakers = event.bookmakers.len();
    let confidence = confidence_score(
        true_probs.home.max(true_probs.away),
        best_ev,
        true_probs.vig,
        num_bookmakers,
        hours_to_kickoff,
    );

    Some(Candidate {
        id: event.id.clone(),
        league_name: league.name,
        league_flag: league.flag,
        home_team: event.home_team.clone(),
        away_team: event.away_team.clone(),
        commence_time: event.commence_time.clone(),
        hours_to_kickoff: round1(hours_to_kickoff),
        home_odds: h2h.home,
        draw_odds: h2h.draw,
        away_odds: h2h.away,
        true_probs,
        over25_prob,
        btts_prob: implied_btts(true_probs.home, true_probs.draw, true_probs.away),
        best_ev: round2(best_ev),
        best_pick,
        best_odds: round2(best_odds),
        best_market,
        confidence,
        num_bookmakers,
    })
}

// ── Analyzer ─────────────────────────────────────────────────

/// Fetches odds and produces the daily analysis.
#[derive(Debug, Clone)]
pub struct Analyzer {
    client: reqwest::Client,
    cfg: OddsConfig,
}

impl Analyzer {
    pub fn new(cfg: &OddsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            client,
            cfg: cfg.clone(),
        }
    }

    /// Fetch upcoming odds for one league.
    async fn fetch_league(&self, sport_key: &str) -> Result<Vec<OddsEvent>, reqwest::Error> {
        self.client
            .get(format!(
                "{}/v4/sports/{}/odds/",
                self.cfg.odds_api_base, sport_key
            ))
            .query(&[
                ("apiKey", self.cfg.api_key.as_str()),
                ("regions", self.cfg.regions.as_str()),
                ("markets", "h2h,totals"),
                ("oddsFormat", "decimal"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Raw odds passthrough for the live-odds proxy endpoint.
    pub async fn raw_odds(
        &self,
        sport: &str,
        regions: &str,
    ) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .get(format!("{}/v4/sports/{}/odds/", self.cfg.odds_api_base, sport))
            .query(&[
                ("apiKey", self.cfg.api_key.as_str()),
                ("regions", regions),
                ("markets", "h2h,totals"),
                ("oddsFormat", "decimal"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Run the full analysis: fetch, rank, simulate, recommend.
    pub async fn analyze(&self) -> Result<AnalysisResponse, AnalysisError> {
        let now = Utc::now();
        let mut candidates = Vec::new();
        let mut fetch_failures = 0;
        let mut last_fetch_err = None;

        for league in &TOP5_LEAGUES {
            match self.fetch_league(league.key).await {
                Ok(events) => {
                    for event in &events {
                        if let Some(c) = build_candidate(event, league, now) {
                            candidates.push(c);
                        }
                    }
                }
                Err(e) => {
                    warn!("[DagensKamp] Error fetching {}: {}", league.key, e);
                    fetch_failures += 1;
                    last_fetch_err = Some(e);
                }
            }
        }

        if candidates.is_empty() {
            // Every league fetch failing means the feed is down, which is
            // a different answer than an empty kickoff window.
            if fetch_failures == TOP5_LEAGUES.len() {
                if let Some(e) = last_fetch_err {
                    return Err(AnalysisError::Http(e));
                }
            }
            return Err(AnalysisError::NoMatches);
        }

        candidates.sort_by(|a, b| {
            selection_score(b)
                .partial_cmp(&selection_score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let matches_analyzed = candidates.len();
        let best = candidates[0].clone();

        let mut rng = rand::thread_rng();
        let sims = simulation::run_simulation(
            &mut rng,
            best.true_probs.home,
            best.true_probs.away,
            simulation::DEFAULT_RUNS,
        );

        let pick_prob = match best.best_market {
            PickMarket::Totals => best.over25_prob,
            PickMarket::H2h => {
                if best.best_pick.starts_with(&best.home_team) {
                    best.true_probs.home
                } else if best.best_pick.starts_with(&best.away_team) {
                    best.true_probs.away
                } else {
                    best.true_probs.draw
                }
            }
        };
        let kelly = kelly_stake(pick_prob, best.best_odds, 0.25);
        let rationale = build_rationale(&best, &sims);

        let top_alternatives = candidates
            .iter()
            .skip(1)
            .take(3)
            .map(|c| TopAlternative {
                league: format!("{} {}", c.league_flag, c.league_name),
                match_label: format!("{} – {}", c.home_team, c.away_team),
                pick: c.best_pick.clone(),
                odds: c.best_odds,
                ev: c.best_ev,
                confidence: c.confidence,
            })
            .collect();

        Ok(AnalysisResponse {
            status: "ok".to_string(),
            analyzed_at: now.to_rfc3339(),
            matches_analyzed,
            match_info: MatchInfo {
                id: Some(best.id.clone()),
                league: best.league_name.to_string(),
                league_flag: best.league_flag.to_string(),
                home_team: best.home_team.clone(),
                away_team: best.away_team.clone(),
                commence_time: best.commence_time.clone(),
                hours_to_kickoff: best.hours_to_kickoff,
                kickoff_display: format_kickoff(&best.commence_time),
            },
            odds: MatchOdds {
                home: best.home_odds,
                draw: best.draw_odds,
                away: best.away_odds,
            },
            probabilities: Probabilities {
                home_win: round1(best.true_probs.home * 100.0),
                draw: round1(best.true_probs.draw * 100.0),
                away_win: round1(best.true_probs.away * 100.0),
                over25: round1(best.over25_prob * 100.0),
                btts: round1(best.btts_prob * 100.0),
                asian_handicap: implied_asian_handicap(best.true_probs.home, best.true_probs.away),
            },
            recommendation: Recommendation {
                pick: best.best_pick.clone(),
                odds: best.best_odds,
                market: best.best_market.label().to_string(),
                ev_pct: best.best_ev,
                confidence: best.confidence,
                kelly_stake_pct: kelly,
            },
            simulations: sims,
            rationale,
            disclaimer: DISCLAIMER.to_string(),
            top_alternatives,
        })
    }
}

/// Build the Norwegian analysis rationale.
pub fn build_rationale(c: &Candidate, sims: &SimulationSummary) -> String {
    let probs = &c.true_probs;
    let favourite = if probs.home > probs.away { &c.home_team } else { &c.away_team };
    let fav_prob = probs.home.max(probs.away);

    let mut lines = Vec::new();

    if fav_prob > 0.55 {
        lines.push(format!(
            "{} er klar favoritt med {:.0}% sannsynlighet ifølge markedsodds.",
            favourite,
            fav_prob * 100.0
        ));
    } else {
        lines.push(format!(
            "Jevn kamp mellom {} og {} — markedet ser dette som en åpen affære.",
            c.home_team, c.away_team
        ));
    }

    if c.over25_prob > 0.65 {
        lines.push(format!(
            "Høy målsannsynlighet: {:.0}% sjanse for Over 2.5 mål basert på odds-modell.",
            c.over25_prob * 100.0
        ));
    } else if c.over25_prob < 0.45 {
        lines.push(format!(
            "Lav-scoring kamp forventet: kun {:.0}% sjanse for Over 2.5 mål.",
            c.over25_prob * 100.0
        ));
    }

    if c.btts_prob > 0.60 {
        lines.push(format!(
            "Begge lag scorer i {:.0}% av simuleringene — offensiv kamp forventet.",
            c.btts_prob * 100.0
        ));
    }

    if let Some(top) = sims.top_scores.first() {
        lines.push(format!(
            "Mest sannsynlig resultat fra {} simuleringer: {} ({}%).",
            sims.simulations, top.score, top.pct
        ));
    }

    if c.best_ev > 3.0 {
        lines.push(format!(
            "Modellen finner positiv EV på {} @ {:.2} (+{:.1}% EV).",
            c.best_pick, c.best_odds, c.best_ev
        ));
    }

    lines.push(
        "Analysen er basert på markedsodds og statistisk modellering — ikke garantert utfall."
            .to_string(),
    );

    lines.join(" ")
}

const NOR_MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "mai", "jun", "jul", "aug", "sep", "okt", "nov", "des",
];

/// Format a kickoff timestamp for Norwegian display (CET = UTC+1).
pub fn format_kickoff(commence_time: &str) -> String {
    match DateTime::parse_from_rfc3339(commence_time) {
        Ok(dt) => {
            let cet = dt.with_timezone(&Utc) + chrono::Duration::hours(1);
            use chrono::Datelike;
            format!(
                "{}. {} kl. {:02}:{:02}",
                cet.day(),
                NOR_MONTHS[cet.month0() as usize],
                cet.hour(),
                cet.minute()
            )
        }
        Err(_) => commence_time.to_string(),
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bookmaker(h2h: &[(&str, f64)], totals: &[(&str, f64, f64)]) -> Bookmaker {
        let mut markets = Vec::new();
        if !h2h.is_empty() {
            markets.push(Market {
                key: "h2h".to_string(),
                outcomes: h2h
                    .iter()
                    .map(|(name, price)| OutcomePrice {
                        name: name.to_string(),
                        price: *price,
                        point: None,
                    })
                    .collect(),
            });
        }
        if !totals.is_empty() {
            markets.push(Market {
                key: "totals".to_string(),
                outcomes: totals
                    .iter()
                    .map(|(name, price, point)| OutcomePrice {
                        name: name.to_string(),
                        price: *price,
                        point: Some(*point),
                    })
                    .collect(),
            });
        }
        Bookmaker { markets }
    }

    #[test]
    fn test_remove_vig_sums_to_one() {
        let probs = remove_vig(2.0, 3.4, 3.8);
        assert_relative_eq!(probs.home + probs.draw + probs.away, 1.0, epsilon = 1e-3);
        assert!(probs.vig > 0.0);
        assert!(probs.home > probs.draw && probs.home > probs.away);
    }

    #[test]
    fn test_implied_over25_clamps_and_direction() {
        // Very decisive match: higher over probability
        let decisive = implied_over25(0.70, 0.12, 0.18);
        let even = implied_over25(0.30, 0.40, 0.30);
        assert!(decisive > even);
        assert!((0.28..=0.88).contains(&decisive));
        assert!((0.28..=0.88).contains(&even));
    }

    #[test]
    fn test_implied_btts_clamps() {
        let competitive = implied_btts(0.38, 0.27, 0.35);
        let one_sided = implied_btts(0.80, 0.12, 0.08);
        assert!(competitive > one_sided);
        assert!((0.25..=0.82).contains(&competitive));
        assert!((0.25..=0.82).contains(&one_sided));
    }

    #[test]
    fn test_asian_handicap_branches() {
        let dnb = implied_asian_handicap(0.40, 0.37);
        assert_eq!(dnb.label, "Draw No Bet");
        assert_relative_eq!(dnb.home_ah + dnb.away_ah, 1.0, epsilon = 1e-3);

        let home_half = implied_asian_handicap(0.50, 0.35);
        assert_eq!(home_half.line, "Home -0.5");

        let home_one = implied_asian_handicap(0.60, 0.18);
        assert_eq!(home_one.line, "Home -1");

        let away_half = implied_asian_handicap(0.30, 0.42);
        assert_eq!(away_half.line, "Away +0.5");

        let away_one = implied_asian_handicap(0.20, 0.55);
        assert_eq!(away_one.line, "Away +1");
    }

    #[test]
    fn test_expected_value() {
        assert_relative_eq!(expected_value(0.55, 2.0), 10.0, epsilon = 1e-9);
        assert_relative_eq!(expected_value(0.50, 2.0), 0.0, epsilon = 1e-9);
        assert!(expected_value(0.40, 2.0) < 0.0);
    }

    #[test]
    fn test_confidence_score_bounds() {
        assert!(confidence_score(0.0, -10.0, 12.0, 0, 200.0) >= 45);
        assert!(confidence_score(0.9, 8.0, 2.0, 20, 24.0) <= 99);
        // Better inputs never lower the score
        let low = confidence_score(0.4, 1.0, 7.0, 3, 2.0);
        let high = confidence_score(0.7, 6.0, 3.0, 12, 24.0);
        assert!(high > low);
    }

    #[test]
    fn test_kelly_stake_clamped() {
        assert_eq!(kelly_stake(0.30, 2.0, 0.25), 0.0);
        let stake = kelly_stake(0.60, 2.2, 0.25);
        assert!(stake > 0.0 && stake <= 5.0);
        assert_eq!(kelly_stake(0.95, 10.0, 1.0), 5.0);
    }

    #[test]
    fn test_consensus_h2h_median() {
        let bookmakers = vec![
            bookmaker(&[("Arsenal", 1.80), ("Chelsea", 4.20), ("Draw", 3.60)], &[]),
            bookmaker(&[("Arsenal", 1.85), ("Chelsea", 4.00), ("Draw", 3.50)], &[]),
            bookmaker(&[("Arsenal", 1.90), ("Chelsea", 4.40), ("Draw", 3.70)], &[]),
        ];
        let odds = consensus_h2h(&bookmakers, "Arsenal", "Chelsea").unwrap();
        assert_relative_eq!(odds.home, 1.85, epsilon = 1e-9);
        assert_relative_eq!(odds.away, 4.20, epsilon = 1e-9);
        assert_relative_eq!(odds.draw, 3.60, epsilon = 1e-9);
    }

    #[test]
    fn test_consensus_h2h_missing_draw_defaults() {
        let bookmakers = vec![bookmaker(&[("Arsenal", 1.80), ("Chelsea", 4.20)], &[])];
        let odds = consensus_h2h(&bookmakers, "Arsenal", "Chelsea").unwrap();
        assert_relative_eq!(odds.draw, 3.4, epsilon = 1e-9);
    }

    #[test]
    fn test_consensus_h2h_none_without_prices() {
        assert!(consensus_h2h(&[], "A", "B").is_none());
    }

    #[test]
    fn test_consensus_totals_filters_line() {
        let bookmakers = vec![
            bookmaker(&[], &[("Over", 1.90, 2.5), ("Under", 1.95, 2.5)]),
            bookmaker(&[], &[("Over", 2.00, 2.5), ("Under", 1.85, 2.5)]),
            // Wrong line, ignored
            bookmaker(&[], &[("Over", 1.40, 1.5), ("Under", 2.90, 1.5)]),
        ];
        let totals = consensus_totals(&bookmakers).unwrap();
        assert_relative_eq!(totals.over, 1.95, epsilon = 1e-9);
        assert_relative_eq!(totals.under, 1.90, epsilon = 1e-9);
    }

    #[test]
    fn test_build_candidate_window_filter() {
        let now = Utc::now();
        let league = &TOP5_LEAGUES[0];

        let make_event = |hours: i64| OddsEvent {
            id: "evt1".to_string(),
            commence_time: (now + chrono::Duration::hours(hours)).to_rfc3339(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            bookmakers: vec![bookmaker(
                &[("Arsenal", 1.85), ("Chelsea", 4.20), ("Draw", 3.60)],
                &[("Over", 1.90, 2.5), ("Under", 1.95, 2.5)],
            )],
        };

        assert!(build_candidate(&make_event(2), league, now).is_none());
        assert!(build_candidate(&make_event(120), league, now).is_none());
        let c = build_candidate(&make_event(24), league, now).unwrap();
        assert_eq!(c.home_team, "Arsenal");
        assert!(c.confidence >= 45);
        assert!(!c.best_pick.is_empty());
    }

    #[test]
    fn test_selection_score_prefers_ev_and_window() {
        let now = Utc::now();
        let league = &TOP5_LEAGUES[0];
        let event = OddsEvent {
            id: "evt".to_string(),
            commence_time: (now + chrono::Duration::hours(24)).to_rfc3339(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            bookmakers: vec![bookmaker(
                &[("Arsenal", 1.85), ("Chelsea", 4.20), ("Draw", 3.60)],
                &[],
            )],
        };
        let base = build_candidate(&event, league, now).unwrap();

        let mut better = base.clone();
        better.best_ev = base.best_ev + 5.0;
        assert!(selection_score(&better) > selection_score(&base));

        let mut late = base.clone();
        late.hours_to_kickoff = 3.0;
        assert!(selection_score(&late) < selection_score(&base));
    }

    #[test]
    fn test_format_kickoff_cet_display() {
        assert_eq!(format_kickoff("2026-08-23T17:30:00Z"), "23. aug kl. 18:30");
        // Unparseable input passes through
        assert_eq!(format_kickoff("snart"), "snart");
    }

    #[test]
    fn test_build_rationale_mentions_pick_on_high_ev() {
        let now = Utc::now();
        let league = &TOP5_LEAGUES[0];
        let event = OddsEvent {
            id: "evt".to_string(),
            commence_time: (now + chrono::Duration::hours(24)).to_rfc3339(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            bookmakers: vec![bookmaker(
                &[("Arsenal", 1.85), ("Chelsea", 4.20), ("Draw", 3.60)],
                &[],
            )],
        };
        let mut c = build_candidate(&event, league, now).unwrap();
        c.best_ev = 4.5;
        let mut rng = rand::rngs::mock::StepRng::new(2, 1);
        let sims = crate::simulation::run_simulation(&mut rng, 0.5, 0.3, 10);
        let rationale = build_rationale(&c, &sims);
        assert!(rationale.contains(&c.best_pick));
        assert!(rationale.contains("markedsodds"));
    }

    #[tokio::test]
    async fn test_analyze_surfaces_feed_outage() {
        // Unroutable base: every league fetch fails, which must come back
        // as an HTTP error rather than "no matches".
        let cfg = crate::config::OddsConfig {
            api_key: "test-key".to_string(),
            football_data_key: String::new(),
            odds_api_base: "http://127.0.0.1:1".to_string(),
            football_data_base: String::new(),
            regions: "eu".to_string(),
        };
        let analyzer = Analyzer::new(&cfg);
        match analyzer.analyze().await {
            Err(AnalysisError::Http(_)) => {}
            other => panic!("expected upstream error, got {:?}", other),
        }
    }
}

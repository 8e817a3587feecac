//! Automatic result checking.
//!
//! Final scores come from Football-Data.org (primary) with The Odds API
//! scores endpoint as fallback. Grading maps a pick string and the final
//! score to W/L/P.

use crate::config::OddsConfig;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::Value;
use sesomnod_common::{progress_bar, Outcome, RESULT_DISCLAIMER};
use std::time::Duration;
use tracing::warn;

/// Football-Data.org competition codes for the tracked leagues.
const COMPETITION_MAP: [(&str, &str); 5] = [
    ("Premier League", "PL"),
    ("La Liga", "PD"),
    ("Serie A", "SA"),
    ("Bundesliga", "BL1"),
    ("Ligue 1", "FL1"),
];

/// The Odds API sport keys, used by the scores fallback.
const SPORT_MAP: [(&str, &str); 5] = [
    ("Premier League", "soccer_epl"),
    ("La Liga", "soccer_spain_la_liga"),
    ("Serie A", "soccer_italy_serie_a"),
    ("Bundesliga", "soccer_germany_bundesliga"),
    ("Ligue 1", "soccer_france_ligue_one"),
];

/// A settled final score and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub home_score: u32,
    pub away_score: u32,
    pub source: &'static str,
}

// ── Football-Data.org wire types ─────────────────────────────

#[derive(Debug, Deserialize)]
struct FdMatchesResponse {
    #[serde(default)]
    matches: Vec<FdMatch>,
}

#[derive(Debug, Deserialize)]
struct FdMatch {
    #[serde(rename = "homeTeam")]
    home_team: FdTeam,
    #[serde(rename = "awayTeam")]
    away_team: FdTeam,
    #[serde(default)]
    score: FdScore,
}

#[derive(Debug, Default, Deserialize)]
struct FdTeam {
    #[serde(default)]
    name: String,
    #[serde(rename = "shortName", default)]
    short_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct FdScore {
    #[serde(rename = "fullTime", default)]
    full_time: FdFullTime,
}

#[derive(Debug, Default, Deserialize)]
struct FdFullTime {
    home: Option<i64>,
    away: Option<i64>,
}

// ── The Odds API scores wire types ───────────────────────────

#[derive(Debug, Deserialize)]
struct ScoreEvent {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    home_team: String,
    #[serde(default)]
    away_team: String,
    #[serde(default)]
    scores: Option<Vec<ScoreEntry>>,
}

#[derive(Debug, Deserialize)]
struct ScoreEntry {
    #[serde(default)]
    name: String,
    // The API serializes scores as strings
    #[serde(default)]
    score: Value,
}

fn score_as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Case-insensitive bidirectional substring match for team names.
fn teams_match(ours: &str, theirs: &str) -> bool {
    if ours.is_empty() || theirs.is_empty() {
        return false;
    }
    let a = ours.to_lowercase();
    let b = theirs.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Fetches settled results from the external score providers.
#[derive(Debug, Clone)]
pub struct ResultChecker {
    client: reqwest::Client,
    cfg: OddsConfig,
}

impl ResultChecker {
    pub fn new(cfg: &OddsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            cfg: cfg.clone(),
        }
    }

    /// Look up a final score, preferring Football-Data.org.
    pub async fn check(
        &self,
        home_team: &str,
        away_team: &str,
        league: &str,
        kickoff_time: &str,
    ) -> Option<MatchResult> {
        if let Some(result) = self
            .check_football_data(home_team, away_team, league, kickoff_time)
            .await
        {
            return Some(result);
        }
        self.check_odds_api(home_team, away_team, league).await
    }

    async fn check_football_data(
        &self,
        home_team: &str,
        away_team: &str,
        league: &str,
        kickoff_time: &str,
    ) -> Option<MatchResult> {
        if self.cfg.football_data_key.is_empty() {
            return None;
        }
        let competition = COMPETITION_MAP
            .iter()
            .find(|(name, _)| *name == league)
            .map(|(_, code)| *code)?;

        let (date_from, date_to) = match DateTime::parse_from_rfc3339(kickoff_time) {
            Ok(dt) => {
                let dt = dt.with_timezone(&Utc);
                (
                    dt.format("%Y-%m-%d").to_string(),
                    (dt + ChronoDuration::days(1)).format("%Y-%m-%d").to_string(),
                )
            }
            Err(_) => {
                let today = Utc::now().format("%Y-%m-%d").to_string();
                (today.clone(), today)
            }
        };

        let resp = self
            .client
            .get(format!(
                "{}/v4/competitions/{}/matches",
                self.cfg.football_data_base, competition
            ))
            .header("X-Auth-Token", &self.cfg.football_data_key)
            .query(&[
                ("dateFrom", date_from.as_str()),
                ("dateTo", date_to.as_str()),
                ("status", "FINISHED"),
            ])
            .send()
            .await;

        let data: FdMatchesResponse = match resp {
            Ok(r) if r.status().is_success() => r.json().await.ok()?,
            Ok(r) => {
                warn!("[FootballData] API error {}", r.status());
                return None;
            }
            Err(e) => {
                warn!("[FootballData] Error: {}", e);
                return None;
            }
        };

        for m in &data.matches {
            let home_hit =
                teams_match(home_team, &m.home_team.name) || teams_match(home_team, &m.home_team.short_name);
            let away_hit =
                teams_match(away_team, &m.away_team.name) || teams_match(away_team, &m.away_team.short_name);
            if home_hit && away_hit {
                if let (Some(h), Some(a)) = (m.score.full_time.home, m.score.full_time.away) {
                    return Some(MatchResult {
                        home_score: h.max(0) as u32,
                        away_score: a.max(0) as u32,
                        source: "football-data.org",
                    });
                }
            }
        }
        None
    }

    async fn check_odds_api(
        &self,
        home_team: &str,
        away_team: &str,
        league: &str,
    ) -> Option<MatchResult> {
        let sport = SPORT_MAP
            .iter()
            .find(|(name, _)| league.to_lowercase().contains(&name.to_lowercase()))
            .map(|(_, key)| *key)
            .unwrap_or("soccer_epl");

        let resp = self
            .client
            .get(format!(
                "{}/v4/sports/{}/scores/",
                self.cfg.odds_api_base, sport
            ))
            .query(&[("apiKey", self.cfg.api_key.as_str()), ("daysFrom", "1")])
            .send()
            .await;

        let games: Vec<ScoreEvent> = match resp {
            Ok(r) if r.status().is_success() => r.json().await.ok()?,
            Ok(r) => {
                warn!("[OddsAPI Scores] Error {}", r.status());
                return None;
            }
            Err(e) => {
                warn!("[OddsAPI Scores] Error: {}", e);
                return None;
            }
        };

        for game in &games {
            if !game.completed {
                continue;
            }
            if !teams_match(home_team, &game.home_team) || !teams_match(away_team, &game.away_team)
            {
                continue;
            }
            let scores = game.scores.as_deref().unwrap_or_default();
            let mut home_score = None;
            let mut away_score = None;
            for s in scores {
                if s.name.eq_ignore_ascii_case(&game.home_team) {
                    home_score = score_as_u32(&s.score);
                } else if s.name.eq_ignore_ascii_case(&game.away_team) {
                    away_score = score_as_u32(&s.score);
                }
            }
            if let (Some(h), Some(a)) = (home_score, away_score) {
                return Some(MatchResult {
                    home_score: h,
                    away_score: a,
                    source: "the-odds-api",
                });
            }
        }
        None
    }
}

/// First parseable float in a string, for Over/Under and AH lines.
fn first_number(s: &str) -> Option<f64> {
    s.split_whitespace().find_map(|tok| {
        tok.trim_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-' && c != '+')
            .parse()
            .ok()
    })
}

/// Whole-word containment: `needle` must appear in `haystack` with
/// non-alphanumeric characters (or the string edges) on both sides.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let left_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }
        from = start + needle.chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Grade a pick against the final score.
///
/// Handles Over/Under (push on exact line), BTTS ja/nei, team-name win
/// picks, Uavgjort, 1X2 and double-chance codes, and home Asian
/// handicap lines. Unknown picks grade as Push so they never move the
/// bankroll.
pub fn grade_pick(
    pick: &str,
    home_team: &str,
    away_team: &str,
    home_score: u32,
    away_score: u32,
) -> Outcome {
    let total = (home_score + away_score) as f64;
    let pick_lower = pick.trim().to_lowercase();
    let home_lower = home_team.to_lowercase();
    let away_lower = away_team.to_lowercase();

    // Over/Under
    if pick_lower.contains("over") {
        if let Some(line) = first_number(&pick_lower) {
            return if total > line {
                Outcome::Win
            } else if (total - line).abs() < f64::EPSILON {
                Outcome::Push
            } else {
                Outcome::Loss
            };
        }
    }
    if pick_lower.contains("under") {
        if let Some(line) = first_number(&pick_lower) {
            return if total < line {
                Outcome::Win
            } else if (total - line).abs() < f64::EPSILON {
                Outcome::Push
            } else {
                Outcome::Loss
            };
        }
    }

    // Both teams to score
    if pick_lower.contains("btts")
        || pick_lower.contains("begge lag scorer")
        || pick_lower.contains("both teams")
    {
        let both = home_score > 0 && away_score > 0;
        let yes = !(pick_lower.contains("nei") || pick_lower.ends_with(" no"));
        return if both == yes { Outcome::Win } else { Outcome::Loss };
    }

    let actual_home = home_score > away_score;
    let actual_draw = home_score == away_score;
    let actual_away = away_score > home_score;

    // Draw picks before team names, so a team name that happens to sit
    // inside "uavgjort" cannot claim the pick.
    if contains_word(&pick_lower, "uavgjort") || pick_lower == "draw" {
        return if actual_draw { Outcome::Win } else { Outcome::Loss };
    }

    // Team-name picks ("Arsenal vinner"). Whole-word matching only:
    // short names like "B" must not match inside unrelated words, and
    // anything that names neither team falls through to Push.
    if contains_word(&pick_lower, &home_lower) {
        if pick_lower.contains("handicap") || pick_lower.contains(" -") {
            // fall through to AH handling below
        } else {
            return if actual_home { Outcome::Win } else { Outcome::Loss };
        }
    } else if contains_word(&pick_lower, &away_lower) {
        return if actual_away { Outcome::Win } else { Outcome::Loss };
    }

    // Short 1X2 and double-chance codes
    match pick_lower.as_str() {
        "1" => return if actual_home { Outcome::Win } else { Outcome::Loss },
        "x" => return if actual_draw { Outcome::Win } else { Outcome::Loss },
        "2" => return if actual_away { Outcome::Win } else { Outcome::Loss },
        "1x" => return if !actual_away { Outcome::Win } else { Outcome::Loss },
        "x2" => return if !actual_home { Outcome::Win } else { Outcome::Loss },
        "12" => return if !actual_draw { Outcome::Win } else { Outcome::Loss },
        _ => {}
    }

    // Home Asian handicap ("Home -1", "Arsenal -0.5")
    if pick_lower.contains('-')
        && (contains_word(&pick_lower, "home") || contains_word(&pick_lower, &home_lower))
    {
        if let Some(pos) = pick_lower.find('-') {
            if let Some(handicap) = first_number(&pick_lower[pos..]) {
                let adj = home_score as f64 + handicap; // handicap is negative
                let away = away_score as f64;
                return if adj > away {
                    Outcome::Win
                } else if (adj - away).abs() < f64::EPSILON {
                    Outcome::Push
                } else {
                    Outcome::Loss
                };
            }
        }
    }

    Outcome::Push
}

// ── Telegram result posts ────────────────────────────────────

fn fmt_kr(v: f64) -> String {
    let whole = v.round() as i64;
    let s = whole.abs().to_string();
    let mut out = String::new();
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    if whole < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

fn goal_progress(balance: f64, goal: f64) -> (String, f64) {
    let pct = (balance / goal * 100.0).min(100.0);
    (progress_bar(pct, 10), pct)
}

pub fn format_win_post(
    home_team: &str,
    away_team: &str,
    home_score: u32,
    away_score: u32,
    pick: &str,
    odds: f64,
    bankroll_before: f64,
    bankroll_after: f64,
    goal: f64,
) -> String {
    let profit = bankroll_after - bankroll_before;
    let (bar, pct) = goal_progress(bankroll_after, goal);
    format!(
        "🎯✅ <b>RIKTIG! SesomNod Engine leverte!</b>\n\n\
         <b>{home_team} {home_score} – {away_score} {away_team}</b>\n\
         <b>{pick}</b> @ {odds:.2} ✅\n\n\
         Gratulerer! Med riktig system, matematikk og\n\
         sannsynlighetsberegning kommer du nærmere\n\
         målet ditt på {goal}kr!\n\n\
         💰 <b>Din bankroll: {after}kr</b> (+{profit}kr)\n\
         {bar} {pct:.1}% av målet\n\n\
         📅 Neste analyse: I morgen kl. 06:00\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>SesomNod Engine · Automatisk resultat</i>",
        goal = fmt_kr(goal),
        after = fmt_kr(bankroll_after),
        profit = fmt_kr(profit),
        disclaimer = RESULT_DISCLAIMER,
    )
}

pub fn format_loss_post(
    home_team: &str,
    away_team: &str,
    home_score: u32,
    away_score: u32,
    pick: &str,
    bankroll: f64,
    goal: f64,
) -> String {
    let (bar, pct) = goal_progress(bankroll, goal);
    format!(
        "❌ <b>Denne gangen gikk det ikke.</b>\n\n\
         <b>{home_team} {home_score} – {away_score} {away_team}</b>\n\
         Kampen endte {home_score}-{away_score} — {pick} gikk ikke inn.\n\n\
         💰 <b>Din bankroll: {balance}kr</b>\n\
         {bar} {pct:.1}% av målet\n\n\
         Statistikk er på vår side over tid!\n\
         📅 Neste analyse: I morgen kl. 06:00\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>SesomNod Engine · Automatisk resultat</i>",
        balance = fmt_kr(bankroll),
        disclaimer = RESULT_DISCLAIMER,
    )
}

pub fn format_push_post(
    home_team: &str,
    away_team: &str,
    home_score: u32,
    away_score: u32,
    pick: &str,
    bankroll: f64,
    goal: f64,
) -> String {
    let (bar, pct) = goal_progress(bankroll, goal);
    format!(
        "↩️ <b>Kampen endte uavgjort (Push).</b>\n\n\
         <b>{home_team} {home_score} – {away_score} {away_team}</b>\n\
         {pick} — Innsats returnert.\n\n\
         💰 <b>Din bankroll: {balance}kr</b> (uendret)\n\
         {bar} {pct:.1}% av målet\n\n\
         📅 Neste analyse: I morgen kl. 06:00\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>SesomNod Engine · Automatisk resultat</i>",
        balance = fmt_kr(bankroll),
        disclaimer = RESULT_DISCLAIMER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teams_match_partial() {
        assert!(teams_match("Arsenal", "Arsenal FC"));
        assert!(teams_match("Arsenal FC", "Arsenal"));
        assert!(teams_match("wolves", "Wolves"));
        assert!(!teams_match("Arsenal", "Chelsea"));
        assert!(!teams_match("", "Arsenal"));
    }

    #[test]
    fn test_grade_over_under() {
        assert_eq!(grade_pick("Over 2.5 mål", "A", "B", 2, 1), Outcome::Win);
        assert_eq!(grade_pick("Over 2.5 mål", "A", "B", 1, 1), Outcome::Loss);
        assert_eq!(grade_pick("Over 2", "A", "B", 1, 1), Outcome::Push);
        assert_eq!(grade_pick("Under 2.5", "A", "B", 1, 0), Outcome::Win);
        assert_eq!(grade_pick("Under 3", "A", "B", 2, 1), Outcome::Push);
        assert_eq!(grade_pick("Under 2.5", "A", "B", 2, 2), Outcome::Loss);
    }

    #[test]
    fn test_grade_btts() {
        assert_eq!(grade_pick("Begge lag scorer", "A", "B", 1, 1), Outcome::Win);
        assert_eq!(grade_pick("BTTS", "A", "B", 2, 0), Outcome::Loss);
        assert_eq!(grade_pick("Begge lag scorer nei", "A", "B", 2, 0), Outcome::Win);
        assert_eq!(grade_pick("BTTS nei", "A", "B", 1, 3), Outcome::Loss);
    }

    #[test]
    fn test_grade_team_name_picks() {
        assert_eq!(
            grade_pick("Arsenal vinner", "Arsenal", "Chelsea", 2, 0),
            Outcome::Win
        );
        assert_eq!(
            grade_pick("Arsenal vinner", "Arsenal", "Chelsea", 1, 1),
            Outcome::Loss
        );
        assert_eq!(
            grade_pick("Chelsea vinner", "Arsenal", "Chelsea", 0, 1),
            Outcome::Win
        );
        assert_eq!(grade_pick("Uavgjort", "Arsenal", "Chelsea", 2, 2), Outcome::Win);
        assert_eq!(grade_pick("Uavgjort", "Arsenal", "Chelsea", 2, 1), Outcome::Loss);
    }

    #[test]
    fn test_grade_short_codes() {
        assert_eq!(grade_pick("1", "A", "B", 2, 0), Outcome::Win);
        assert_eq!(grade_pick("X", "A", "B", 1, 1), Outcome::Win);
        assert_eq!(grade_pick("2", "A", "B", 0, 3), Outcome::Win);
        assert_eq!(grade_pick("1X", "A", "B", 1, 1), Outcome::Win);
        assert_eq!(grade_pick("1X", "A", "B", 0, 1), Outcome::Loss);
        assert_eq!(grade_pick("X2", "A", "B", 2, 0), Outcome::Loss);
        assert_eq!(grade_pick("12", "A", "B", 1, 1), Outcome::Loss);
    }

    #[test]
    fn test_grade_asian_handicap() {
        assert_eq!(grade_pick("Home -1", "Arsenal", "Chelsea", 3, 1), Outcome::Win);
        assert_eq!(grade_pick("Home -1", "Arsenal", "Chelsea", 2, 1), Outcome::Push);
        assert_eq!(grade_pick("Home -1", "Arsenal", "Chelsea", 1, 1), Outcome::Loss);
        assert_eq!(
            grade_pick("Arsenal -0.5", "Arsenal", "Chelsea", 1, 0),
            Outcome::Win
        );
    }

    #[test]
    fn test_grade_unknown_is_push() {
        assert_eq!(grade_pick("noe rart", "A", "B", 1, 0), Outcome::Push);
        assert_eq!(grade_pick("", "A", "B", 1, 0), Outcome::Push);
    }

    #[test]
    fn test_grade_team_match_is_whole_word() {
        // Short team names must not match inside unrelated words.
        assert_eq!(grade_pick("noe rart", "Ra", "B", 1, 0), Outcome::Push);
        assert_eq!(grade_pick("kampvurdering", "Kamp", "Vurd", 1, 0), Outcome::Push);
        // Whole words still grade.
        assert_eq!(grade_pick("B vinner", "A", "B", 0, 2), Outcome::Win);
        assert_eq!(grade_pick("A vinner", "A", "B", 0, 2), Outcome::Loss);
        // A team name inside "uavgjort" must not hijack the draw pick.
        assert_eq!(grade_pick("Uavgjort", "Gjort", "B", 1, 1), Outcome::Win);
        assert_eq!(grade_pick("Uavgjort", "Gjort", "B", 2, 1), Outcome::Loss);
    }

    #[test]
    fn test_contains_word_boundaries() {
        assert!(contains_word("arsenal vinner", "arsenal"));
        assert!(contains_word("manchester united vinner", "manchester united"));
        assert!(contains_word("over 2.5 - arsenal", "arsenal"));
        assert!(!contains_word("arsenalen vinner", "arsenal"));
        assert!(!contains_word("noe rart", "a"));
        assert!(!contains_word("uavgjort", "gjort"));
        assert!(!contains_word("kamp", ""));
    }

    #[test]
    fn test_fmt_kr_thousands() {
        assert_eq!(fmt_kr(100.0), "100");
        assert_eq!(fmt_kr(10_000.0), "10 000");
        assert_eq!(fmt_kr(1_234_567.0), "1 234 567");
        assert_eq!(fmt_kr(-2500.0), "-2 500");
    }

    #[test]
    fn test_win_post_contents() {
        let msg = format_win_post("Arsenal", "Chelsea", 2, 0, "Arsenal vinner", 1.85, 100.0, 108.5, 10_000.0);
        assert!(msg.contains("Arsenal 2 – 0 Chelsea"));
        assert!(msg.contains("@ 1.85"));
        assert!(msg.contains("Din bankroll"));
        assert!(msg.contains(RESULT_DISCLAIMER));
    }

    #[test]
    fn test_loss_post_contents() {
        let msg = format_loss_post("Arsenal", "Chelsea", 0, 2, "Arsenal vinner", 95.0, 10_000.0);
        assert!(msg.contains("endte 0-2"));
        assert!(msg.contains("gikk ikke inn"));
    }

    #[test]
    fn test_push_post_contents() {
        let msg = format_push_post("Arsenal", "Chelsea", 1, 1, "Home -0", 100.0, 10_000.0);
        assert!(msg.contains("Innsats returnert"));
        assert!(msg.contains("(uendret)"));
        assert!(msg.contains("1.0% av målet"));
    }

    #[test]
    fn test_score_as_u32_both_encodings() {
        assert_eq!(score_as_u32(&serde_json::json!("3")), Some(3));
        assert_eq!(score_as_u32(&serde_json::json!(2)), Some(2));
        assert_eq!(score_as_u32(&serde_json::json!(null)), None);
    }
}

//! Core operations shared by the HTTP handlers and the scheduler:
//! analyze-and-store, the Telegram analysis post, result settlement and
//! the daily summary.

use crate::analysis::{format_kickoff, AnalysisError};
use crate::bankroll;
use crate::db::{quote_literal, row_bool, row_f64, row_i64, row_str, DbError};
use crate::results::{format_loss_post, format_push_post, format_win_post, grade_pick};
use crate::state::AppState;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde_json::{json, Value};
use sesomnod_common::{AnalysisResponse, Outcome, BANKROLL_GOAL, DISCLAIMER};
use tracing::{info, warn};

/// Engine-local date, CET approximated as UTC+1.
pub fn today_cet() -> NaiveDate {
    (Utc::now() + ChronoDuration::hours(1)).date_naive()
}

/// Parse a timestamp as stored by the database or The Odds API.
/// Accepts RFC 3339 and the Postgres `YYYY-MM-DD HH:MM:SS+00` form.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let candidates = [
        s.to_string(),
        s.replacen(' ', "T", 1),
        format!("{}:00", s.replacen(' ', "T", 1)),
    ];
    for c in &candidates {
        if let Ok(dt) = DateTime::parse_from_rfc3339(c) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

/// Run the analysis and upsert today's row. Storage failures are
/// logged; the analysis is still returned so the API works without a
/// database.
pub async fn analyze_and_store(state: &AppState) -> Result<AnalysisResponse, AnalysisError> {
    let analysis = state.analyzer.analyze().await?;

    let m = &analysis.match_info;
    let probs = &analysis.probabilities;
    let rec = &analysis.recommendation;
    let sim_json = serde_json::to_string(&analysis.simulations).unwrap_or_default();

    let sql = format!(
        "INSERT INTO dagens_kamp (
            dato, league, league_flag, home_team, away_team, commence_time,
            pick, odds, ev_pct, confidence,
            home_win_pct, draw_pct, away_win_pct, over25_pct, btts_pct,
            kelly_stake, simulation_data, rationale, matches_analyzed
        ) VALUES (
            '{dato}', {league}, {flag}, {home}, {away}, {commence},
            {pick}, {odds}, {ev}, {confidence},
            {home_win}, {draw}, {away_win}, {over25}, {btts},
            {kelly}, {sim}::jsonb, {rationale}, {analyzed}
        )
        ON CONFLICT (dato) DO UPDATE SET
            league = EXCLUDED.league,
            league_flag = EXCLUDED.league_flag,
            home_team = EXCLUDED.home_team,
            away_team = EXCLUDED.away_team,
            commence_time = EXCLUDED.commence_time,
            pick = EXCLUDED.pick,
            odds = EXCLUDED.odds,
            ev_pct = EXCLUDED.ev_pct,
            confidence = EXCLUDED.confidence,
            home_win_pct = EXCLUDED.home_win_pct,
            draw_pct = EXCLUDED.draw_pct,
            away_win_pct = EXCLUDED.away_win_pct,
            over25_pct = EXCLUDED.over25_pct,
            btts_pct = EXCLUDED.btts_pct,
            kelly_stake = EXCLUDED.kelly_stake,
            simulation_data = EXCLUDED.simulation_data,
            rationale = EXCLUDED.rationale,
            matches_analyzed = EXCLUDED.matches_analyzed,
            created_at = NOW()",
        dato = today_cet(),
        league = quote_literal(&m.league),
        flag = quote_literal(&m.league_flag),
        home = quote_literal(&m.home_team),
        away = quote_literal(&m.away_team),
        commence = quote_literal(&m.commence_time),
        pick = quote_literal(&rec.pick),
        odds = rec.odds,
        ev = rec.ev_pct,
        confidence = rec.confidence,
        home_win = probs.home_win,
        draw = probs.draw,
        away_win = probs.away_win,
        over25 = probs.over25,
        btts = probs.btts,
        kelly = rec.kelly_stake_pct,
        sim = quote_literal(&sim_json),
        rationale = quote_literal(&analysis.rationale),
        analyzed = analysis.matches_analyzed,
    );

    if let Err(e) = state.db.execute(&sql).await {
        warn!("[DagensKamp] DB store error: {}", e);
    }

    Ok(analysis)
}

/// Today's dagens_kamp row, if stored.
pub async fn todays_row(state: &AppState) -> Result<Option<Value>, DbError> {
    let rows = state
        .db
        .query(&format!(
            "SELECT * FROM dagens_kamp WHERE dato = '{}'",
            today_cet()
        ))
        .await?;
    Ok(rows.into_iter().next())
}

/// Rebuild the analysis response shape from a stored row.
pub fn cached_response(row: &Value) -> Value {
    let sim_data = match row.get("simulation_data") {
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or(Value::Null),
        Some(v) => v.clone(),
        None => Value::Null,
    };
    let commence = row_str(row, "commence_time");
    json!({
        "status": "cached",
        "analyzed_at": row_str(row, "created_at"),
        "match": {
            "league": row_str(row, "league"),
            "league_flag": row_str(row, "league_flag"),
            "home_team": row_str(row, "home_team"),
            "away_team": row_str(row, "away_team"),
            "commence_time": commence,
            "kickoff_display": format_kickoff(&commence),
        },
        "probabilities": {
            "home_win": row_f64(row, "home_win_pct"),
            "draw": row_f64(row, "draw_pct"),
            "away_win": row_f64(row, "away_win_pct"),
            "over25": row_f64(row, "over25_pct"),
            "btts": row_f64(row, "btts_pct"),
        },
        "recommendation": {
            "pick": row_str(row, "pick"),
            "odds": row_f64(row, "odds"),
            "ev_pct": row_f64(row, "ev_pct"),
            "confidence": row_i64(row, "confidence"),
            "kelly_stake_pct": row_f64(row, "kelly_stake"),
        },
        "simulations": sim_data,
        "rationale": row_str(row, "rationale"),
        "disclaimer": DISCLAIMER,
        "matches_analyzed": row_i64(row, "matches_analyzed"),
        "resultat": row.get("resultat").cloned().unwrap_or(Value::Null),
        "home_score": row.get("home_score").cloned().unwrap_or(Value::Null),
        "away_score": row.get("away_score").cloned().unwrap_or(Value::Null),
    })
}

/// The morning analysis Telegram post, built from the stored row.
pub fn format_analysis_post(row: &Value) -> String {
    let commence = row_str(row, "commence_time");
    format!(
        "🎯 <b>DAGENS KAMP FUNNET!</b>\n\n\
         <b>{flag} {league}</b>\n\
         <b>{home} vs {away}</b>\n\
         Kickoff: {kickoff}\n\n\
         📊 <b>Sannsynligheter:</b>\n\
         • Over 2.5 mål: <b>{over25:.0}%</b>\n\
         • Begge lag scorer: <b>{btts:.0}%</b>\n\
         • {home} vinner: {home_win:.0}%\n\
         • Uavgjort: {draw:.0}%\n\
         • {away} vinner: {away_win:.0}%\n\n\
         🎯 <b>Anbefalt pick:</b> {pick} @ {odds:.2}\n\
         📈 EV: +{ev:.1}% | Stake: {kelly:.1}%\n\n\
         🔬 <b>Match Confidence: {confidence}%</b>\n\
         Basert på 100 scenario-simuleringer\n\n\
         <i>⚠️ {disclaimer}</i>\n\
         <i>SesomNod Engine · Se full analyse i app</i>",
        flag = row_str(row, "league_flag"),
        league = row_str(row, "league"),
        home = row_str(row, "home_team"),
        away = row_str(row, "away_team"),
        kickoff = format_kickoff(&commence),
        over25 = row_f64(row, "over25_pct"),
        btts = row_f64(row, "btts_pct"),
        home_win = row_f64(row, "home_win_pct"),
        draw = row_f64(row, "draw_pct"),
        away_win = row_f64(row, "away_win_pct"),
        pick = row_str(row, "pick"),
        odds = row_f64(row, "odds"),
        ev = row_f64(row, "ev_pct"),
        kelly = row_f64(row, "kelly_stake"),
        confidence = row_i64(row, "confidence"),
        disclaimer = DISCLAIMER,
    )
}

/// Post today's analysis to Telegram and mark it as posted.
pub async fn post_analysis_to_telegram(state: &AppState) -> Result<bool> {
    let Some(row) = todays_row(state).await? else {
        return Ok(false);
    };
    let msg = format_analysis_post(&row);
    let sent = state.telegram.send(&msg).await;
    if sent {
        state
            .db
            .execute(&format!(
                "UPDATE dagens_kamp SET posted_telegram = TRUE WHERE dato = '{}'",
                today_cet()
            ))
            .await?;
    }
    Ok(sent)
}

/// Check whether today's match has finished, grade it, settle the
/// bankroll and post the result. Safe to call every tick.
pub async fn check_pending_results(state: &AppState) -> Result<()> {
    let rows = state
        .db
        .query(&format!(
            "SELECT * FROM dagens_kamp \
             WHERE dato = '{}' AND resultat IS NULL AND commence_time IS NOT NULL",
            today_cet()
        ))
        .await?;
    let Some(row) = rows.first() else {
        return Ok(());
    };

    let kickoff = row_str(row, "commence_time");
    if let Some(kickoff_dt) = parse_timestamp(&kickoff) {
        // Regular time plus stoppage; scores are rarely final before this
        let match_end_estimate = kickoff_dt + ChronoDuration::minutes(150);
        if Utc::now() < match_end_estimate {
            return Ok(());
        }
    } else {
        warn!("[ResultCheck] Unparseable kickoff '{}', checking anyway", kickoff);
    }

    let home_team = row_str(row, "home_team");
    let away_team = row_str(row, "away_team");
    let league = row_str(row, "league");
    let pick = row_str(row, "pick");
    let odds = row_f64(row, "odds");
    let stake_pct = row_f64(row, "kelly_stake");
    let dk_id = row_i64(row, "id");

    info!("[ResultCheck] Checking result for {} vs {}", home_team, away_team);

    let Some(result) = state
        .results
        .check(&home_team, &away_team, &league, &kickoff)
        .await
    else {
        info!("[ResultCheck] No result found yet for {} vs {}", home_team, away_team);
        return Ok(());
    };

    let outcome = grade_pick(&pick, &home_team, &away_team, result.home_score, result.away_score);
    info!(
        "[ResultCheck] Result: {} {}-{} {} -> {}",
        home_team, result.home_score, result.away_score, away_team, outcome
    );

    state
        .db
        .execute(&format!(
            "UPDATE dagens_kamp SET \
                resultat = '{}', home_score = {}, away_score = {}, \
                result_source = {}, result_checked_at = NOW() \
             WHERE id = {}",
            outcome,
            result.home_score,
            result.away_score,
            quote_literal(result.source),
            dk_id
        ))
        .await?;

    let delta = bankroll::apply_outcome(&state.db, outcome, odds, stake_pct).await?;

    if !row_bool(row, "result_posted_telegram") {
        let msg = match outcome {
            Outcome::Win => format_win_post(
                &home_team,
                &away_team,
                result.home_score,
                result.away_score,
                &pick,
                odds,
                delta.before,
                delta.after,
                BANKROLL_GOAL,
            ),
            Outcome::Loss => format_loss_post(
                &home_team,
                &away_team,
                result.home_score,
                result.away_score,
                &pick,
                delta.after,
                BANKROLL_GOAL,
            ),
            Outcome::Push => format_push_post(
                &home_team,
                &away_team,
                result.home_score,
                result.away_score,
                &pick,
                delta.after,
                BANKROLL_GOAL,
            ),
        };
        if state.telegram.send(&msg).await {
            state
                .db
                .execute(&format!(
                    "UPDATE dagens_kamp SET result_posted_telegram = TRUE WHERE id = {}",
                    dk_id
                ))
                .await?;
            info!("[ResultCheck] Telegram result posted: {}", outcome);
        }
    }

    Ok(())
}

/// Lifetime W/L tallies from the dagens_kamp table.
pub async fn settled_tally(state: &AppState) -> Result<(u32, u32, u32), DbError> {
    let rows = state
        .db
        .query(
            "SELECT COUNT(*) as total, \
                COUNT(CASE WHEN resultat = 'W' THEN 1 END) as wins, \
                COUNT(CASE WHEN resultat = 'L' THEN 1 END) as losses \
             FROM dagens_kamp WHERE resultat IS NOT NULL",
        )
        .await?;
    let stats = rows.first().cloned().unwrap_or(Value::Null);
    Ok((
        row_i64(&stats, "total") as u32,
        row_i64(&stats, "wins") as u32,
        row_i64(&stats, "losses") as u32,
    ))
}

/// Build and send the 23:00 daily summary.
pub async fn send_daily_summary(state: &AppState) -> Result<bool> {
    let (todays_match, todays_result) = match todays_row(state).await? {
        Some(row) => {
            let label = format!("{} vs {}", row_str(&row, "home_team"), row_str(&row, "away_team"));
            let result = row_str(&row, "resultat").parse::<Outcome>().ok();
            (Some(label), result)
        }
        None => (None, None),
    };

    let (total, wins, losses) = settled_tally(state).await?;
    let balance = bankroll::current(&state.db).await?;

    let msg = bankroll::format_daily_summary(
        balance,
        todays_match.as_deref(),
        todays_result,
        total,
        wins,
        losses,
    );
    let sent = state.telegram.send(&msg).await;
    if sent {
        info!("[Summary] Daily summary sent");
    }
    Ok(sent)
}

/// Error payload returned when no candidate matches exist.
pub fn no_matches_response() -> Value {
    json!({
        "error": "Ingen kamper funnet",
        "message": "Ingen kamper i toppligaene innenfor analysevinduet",
        "matches_analyzed": 0,
    })
}

/// Map an analysis outcome to the HTTP response body.
pub fn analysis_to_body(result: Result<AnalysisResponse, AnalysisError>) -> Result<Value, AnalysisError> {
    match result {
        Ok(analysis) => Ok(serde_json::to_value(analysis).unwrap_or(Value::Null)),
        Err(AnalysisError::NoMatches) => Ok(no_matches_response()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2026-08-23T17:30:00Z").is_some());
        assert!(parse_timestamp("2026-08-23T17:30:00+00:00").is_some());
        assert!(parse_timestamp("2026-08-23 17:30:00+00:00").is_some());
        assert!(parse_timestamp("ikke en dato").is_none());
    }

    #[test]
    fn test_cached_response_shape() {
        let row = serde_json::json!({
            "created_at": "2026-08-23T05:00:00+00:00",
            "league": "Premier League",
            "league_flag": "🏴󠁧󠁢󠁥󠁮󠁧󠁿",
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "commence_time": "2026-08-23T17:30:00Z",
            "home_win_pct": "52.1",
            "draw_pct": 24.3,
            "away_win_pct": 23.6,
            "over25_pct": 61.0,
            "btts_pct": 55.0,
            "pick": "Arsenal vinner",
            "odds": "1.850",
            "ev_pct": 4.2,
            "confidence": 78,
            "kelly_stake": 2.1,
            "simulation_data": "{\"simulations\":100}",
            "rationale": "Arsenal er klar favoritt.",
            "matches_analyzed": 14,
            "resultat": null,
        });
        let body = cached_response(&row);
        assert_eq!(body["status"], "cached");
        assert_eq!(body["probabilities"]["home_win"], 52.1);
        assert_eq!(body["recommendation"]["odds"], 1.85);
        assert_eq!(body["simulations"]["simulations"], 100);
        assert_eq!(body["match"]["kickoff_display"], "23. aug kl. 18:30");
        assert!(body["resultat"].is_null());
    }

    #[test]
    fn test_analysis_post_lists_probabilities() {
        let row = serde_json::json!({
            "league": "Serie A",
            "league_flag": "🇮🇹",
            "home_team": "Inter",
            "away_team": "Milan",
            "commence_time": "2026-08-23T19:45:00Z",
            "over25_pct": 58.0,
            "btts_pct": 52.0,
            "home_win_pct": 48.0,
            "draw_pct": 27.0,
            "away_win_pct": 25.0,
            "pick": "Inter vinner",
            "odds": 2.05,
            "ev_pct": 3.1,
            "kelly_stake": 1.8,
            "confidence": 71,
        });
        let msg = format_analysis_post(&row);
        assert!(msg.contains("DAGENS KAMP FUNNET"));
        assert!(msg.contains("Inter vs Milan"));
        assert!(msg.contains("Over 2.5 mål: <b>58%</b>"));
        assert!(msg.contains("Inter vinner @ 2.05"));
        assert!(msg.contains("Match Confidence: 71%"));
    }

    #[test]
    fn test_no_matches_body() {
        let body = no_matches_response();
        assert_eq!(body["error"], "Ingen kamper funnet");
        assert_eq!(body["matches_analyzed"], 0);
    }
}

//! HTTP API surface.
//!
//! Handlers stay thin: request parsing, SQL via the db helpers, and the
//! shared engine operations. Everything returns JSON; errors map to
//! `(StatusCode, String)`.

use crate::bankroll;
use crate::db::{opt_num, quote_literal, row_f64, row_str, DbError};
use crate::engine;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sesomnod_common::{
    BankrollResponse, HealthResponse, KellyResponse, Outcome, PickCreate, ResultUpdate,
    SendResponse, SettingUpdate, StatsResponse, TriggerResponse, BANKROLL_GOAL, BANKROLL_START,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

type ApiError = (StatusCode, String);

fn db_err(e: DbError) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {}", e))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(pick_routes())
        .merge(stats_routes())
        .merge(settings_routes())
        .merge(bankroll_routes())
        .merge(telegram_routes())
        .merge(dagens_kamp_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

fn pick_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/picks", get(list_picks).post(create_pick))
        .route("/picks/:pick_id", get(get_pick))
        .route("/picks/:pick_id/result", put(update_result))
}

fn stats_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/stats/daily", get(get_daily_stats))
        .route("/kelly", get(kelly_calculator))
}

fn settings_routes() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings).put(update_setting))
}

fn bankroll_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bankroll", get(get_bankroll))
        .route("/bankroll/history", get(get_bankroll_history))
        .route("/bankroll/reset", post(reset_bankroll))
}

fn telegram_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/telegram/pick/:pick_id", post(post_pick_to_telegram))
        .route("/telegram/result/:pick_id", post(post_result_to_telegram))
        .route("/telegram/summary", post(post_daily_summary))
        .route("/telegram/test", post(test_telegram))
}

fn dagens_kamp_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dagens-kamp", get(get_dagens_kamp))
        .route("/dagens-kamp/analyze", post(trigger_analysis))
        .route("/dagens-kamp/analyze/sync", post(trigger_analysis_sync))
        .route("/dagens-kamp/check-result", post(manual_check_result))
        .route("/dagens-kamp/telegram", post(post_dagens_kamp_telegram))
        .route("/dagens-kamp/history", get(get_dagens_kamp_history))
        .route("/odds/live", get(get_live_odds))
}

// ── Health ───────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "sesomnod-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

// ── Picks ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PicksQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
    resultat: Option<String>,
}

fn default_limit() -> u32 {
    50
}

async fn list_picks(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PicksQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let filter = match &q.resultat {
        Some(r) => format!("WHERE resultat = {}", quote_literal(r)),
        None => String::new(),
    };
    let rows = state
        .db
        .query(&format!(
            "SELECT * FROM picks {} ORDER BY dato DESC, created_at DESC LIMIT {} OFFSET {}",
            filter, q.limit, q.offset
        ))
        .await
        .map_err(db_err)?;
    Ok(Json(rows))
}

async fn fetch_pick(state: &AppState, pick_id: i64) -> Result<Value, ApiError> {
    let rows = state
        .db
        .query(&format!("SELECT * FROM picks WHERE pick_id = {}", pick_id))
        .await
        .map_err(db_err)?;
    rows.into_iter()
        .next()
        .ok_or((StatusCode::NOT_FOUND, "Pick not found".to_string()))
}

async fn get_pick(
    State(state): State<Arc<AppState>>,
    Path(pick_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(fetch_pick(&state, pick_id).await?))
}

/// Closing line value in percent, rounded to 4 decimals.
fn clv_pct(opening: f64, closing: f64) -> f64 {
    ((closing - opening) / opening * 100.0 * 10_000.0).round() / 10_000.0
}

async fn create_pick(
    State(state): State<Arc<AppState>>,
    Json(pick): Json<PickCreate>,
) -> Result<Json<Value>, ApiError> {
    if !(1..=3).contains(&pick.tier) {
        return Err((StatusCode::BAD_REQUEST, "tier must be 1..=3".to_string()));
    }
    let clv = match pick.closing_odds {
        Some(closing) if pick.odds > 0.0 => clv_pct(pick.odds, closing).to_string(),
        _ => "NULL".to_string(),
    };
    let sql = format!(
        "INSERT INTO picks (dato, kamp, liga, pick, odds, kickoff_odds, closing_odds, \
                            clv_beregnet, bookie, stake_planlagt, ev_prosent, tier) \
         VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}) RETURNING *",
        quote_literal(&pick.dato),
        quote_literal(&pick.kamp),
        quote_literal(&pick.liga),
        quote_literal(&pick.pick),
        pick.odds,
        opt_num(pick.kickoff_odds),
        opt_num(pick.closing_odds),
        clv,
        quote_literal(&pick.bookie),
        pick.stake_planlagt,
        pick.ev_prosent.unwrap_or(0.0),
        pick.tier,
    );
    let rows = state.db.execute(&sql).await.map_err(db_err)?;
    Ok(Json(rows.into_iter().next().unwrap_or(json!({"status": "created"}))))
}

/// P/L in stake-percent units for a settled pick.
fn settle_pl(outcome: Outcome, odds: f64, stake: f64) -> f64 {
    match outcome {
        Outcome::Win => (((odds - 1.0) * stake) * 10_000.0).round() / 10_000.0,
        Outcome::Loss => -stake,
        Outcome::Push => 0.0,
    }
}

async fn update_result(
    State(state): State<Arc<AppState>>,
    Path(pick_id): Path<i64>,
    Json(update): Json<ResultUpdate>,
) -> Result<Json<Value>, ApiError> {
    let pick = fetch_pick(&state, pick_id).await?;
    let odds = row_f64(&pick, "odds");
    let stake = row_f64(&pick, "stake_planlagt");
    let pl = settle_pl(update.resultat, odds, stake);

    let mut extra = String::new();
    if let Some(closing) = update.closing_odds {
        extra.push_str(&format!(", closing_odds = {}", closing));
        if odds > 0.0 {
            extra.push_str(&format!(", clv_beregnet = {}", clv_pct(odds, closing)));
        }
    }
    let sql = format!(
        "UPDATE picks SET resultat = '{}', pl_beregnet = {}, updated_at = NOW(){} \
         WHERE pick_id = {} RETURNING *",
        update.resultat, pl, extra, pick_id
    );
    let rows = state.db.execute(&sql).await.map_err(db_err)?;
    Ok(Json(rows.into_iter().next().unwrap_or(json!({"status": "updated"}))))
}

// ── Stats ────────────────────────────────────────────────────

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let rows = state
        .db
        .query(
            "SELECT \
                COUNT(*) as total_picks, \
                COUNT(CASE WHEN resultat = 'W' THEN 1 END) as wins, \
                COUNT(CASE WHEN resultat = 'L' THEN 1 END) as losses, \
                COUNT(CASE WHEN resultat = 'P' THEN 1 END) as pushes, \
                COUNT(CASE WHEN resultat IS NULL THEN 1 END) as pending, \
                COALESCE(SUM(pl_beregnet), 0) as total_pl, \
                COALESCE(AVG(CASE WHEN resultat IS NOT NULL AND resultat != 'P' \
                    THEN clv_beregnet END), 0) as avg_clv, \
                COALESCE(AVG(ev_prosent), 0) as avg_ev \
             FROM picks",
        )
        .await
        .map_err(db_err)?;
    let row = rows.first().cloned().unwrap_or(Value::Null);
    Ok(Json(stats_from_row(&row)))
}

fn stats_from_row(row: &Value) -> StatsResponse {
    let total = crate::db::row_i64(row, "total_picks");
    let wins = crate::db::row_i64(row, "wins");
    let losses = crate::db::row_i64(row, "losses");
    let total_pl = row_f64(row, "total_pl");
    let settled = wins + losses;
    let winrate = if settled > 0 {
        (wins as f64 / settled as f64 * 100.0 * 10.0).round() / 10.0
    } else {
        0.0
    };
    // ROI against an assumed average 2% stake per settled pick
    let roi = if settled > 0 {
        (total_pl / (settled as f64 * 2.0) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };
    StatsResponse {
        total_picks: total,
        wins,
        losses,
        pushes: crate::db::row_i64(row, "pushes"),
        pending: crate::db::row_i64(row, "pending"),
        winrate,
        total_pl,
        roi,
        avg_clv: row_f64(row, "avg_clv"),
        avg_ev: row_f64(row, "avg_ev"),
    }
}

#[derive(Debug, Deserialize)]
struct DaysQuery {
    #[serde(default = "default_days")]
    days: u32,
}

fn default_days() -> u32 {
    30
}

async fn get_daily_stats(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DaysQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let cutoff = (engine::today_cet() - chrono::Duration::days(q.days as i64)).to_string();
    let rows = state
        .db
        .query(&format!(
            "SELECT dato, COUNT(*) as picks, \
                COUNT(CASE WHEN resultat = 'W' THEN 1 END) as wins, \
                COALESCE(SUM(pl_beregnet), 0) as pl \
             FROM picks WHERE dato >= '{}' AND resultat IS NOT NULL \
             GROUP BY dato ORDER BY dato ASC",
            cutoff
        ))
        .await
        .map_err(db_err)?;
    Ok(Json(rows))
}

// ── Kelly calculator ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct KellyQuery {
    odds: f64,
    prob: f64,
    #[serde(default = "default_kelly_bankroll")]
    bankroll: f64,
    #[serde(default = "default_kelly_fraction")]
    fraction: f64,
}

fn default_kelly_bankroll() -> f64 {
    10_000.0
}

fn default_kelly_fraction() -> f64 {
    0.25
}

fn compute_kelly(odds: f64, prob: f64, bankroll: f64, fraction: f64) -> KellyResponse {
    let b = odds - 1.0;
    let q = 1.0 - prob;
    let kelly_full = (b * prob - q) / b;
    let kelly_fractional = kelly_full * fraction;
    let stake_pct = (kelly_fractional * 100.0).max(0.0);
    let round2 = |v: f64| (v * 100.0).round() / 100.0;
    KellyResponse {
        kelly_full: round2(kelly_full * 100.0),
        kelly_fractional: round2(kelly_fractional * 100.0),
        stake_pct: round2(stake_pct),
        stake_amount: round2(bankroll * kelly_fractional.max(0.0)),
        ev_pct: round2((b * prob - q) * 100.0),
        recommended_tier: if stake_pct >= 3.0 {
            1
        } else if stake_pct >= 1.5 {
            2
        } else {
            3
        },
    }
}

async fn kelly_calculator(Query(q): Query<KellyQuery>) -> Result<Json<KellyResponse>, ApiError> {
    if q.odds <= 1.0 || q.prob <= 0.0 || q.prob >= 1.0 {
        return Err((StatusCode::BAD_REQUEST, "Invalid parameters".to_string()));
    }
    Ok(Json(compute_kelly(q.odds, q.prob, q.bankroll, q.fraction)))
}

// ── Settings ─────────────────────────────────────────────────

async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let rows = state
        .db
        .query("SELECT key, value FROM settings ORDER BY key")
        .await
        .map_err(db_err)?;
    let mut map = serde_json::Map::new();
    for row in &rows {
        map.insert(row_str(row, "key"), Value::String(row_str(row, "value")));
    }
    Ok(Json(Value::Object(map)))
}

async fn update_setting(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingUpdate>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .execute(&format!(
            "INSERT INTO settings (key, value) VALUES ({k}, {v}) \
             ON CONFLICT (key) DO UPDATE SET value = {v}, updated_at = NOW()",
            k = quote_literal(&update.key),
            v = quote_literal(&update.value),
        ))
        .await
        .map_err(db_err)?;
    Ok(Json(json!({
        "status": "updated",
        "key": update.key,
        "value": update.value,
    })))
}

// ── Bankroll ─────────────────────────────────────────────────

async fn get_bankroll(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BankrollResponse>, ApiError> {
    let current = bankroll::current(&state.db).await.map_err(db_err)?;
    let history = bankroll::history(&state.db, 50).await.map_err(db_err)?;
    let progress_pct = ((current / BANKROLL_GOAL * 100.0).min(100.0) * 100.0).round() / 100.0;
    Ok(Json(BankrollResponse {
        current,
        goal: BANKROLL_GOAL,
        start: BANKROLL_START,
        progress_pct,
        history: history
            .into_iter()
            .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    days: u32,
}

fn default_history_limit() -> u32 {
    90
}

async fn get_bankroll_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let history = bankroll::history(&state.db, q.days).await.map_err(db_err)?;
    Ok(Json(
        history
            .into_iter()
            .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
            .collect(),
    ))
}

async fn reset_bankroll(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let amount = bankroll::reset(&state.db).await.map_err(db_err)?;
    Ok(Json(json!({"status": "reset", "amount": amount})))
}

// ── Telegram ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SafeModeQuery {
    #[serde(default = "default_safe_mode")]
    safe_mode: bool,
}

fn default_safe_mode() -> bool {
    true
}

async fn post_pick_to_telegram(
    State(state): State<Arc<AppState>>,
    Path(pick_id): Path<i64>,
    Query(q): Query<SafeModeQuery>,
) -> Result<Json<SendResponse>, ApiError> {
    let pick = fetch_pick(&state, pick_id).await?;
    let message = crate::telegram::format_pick_post(&pick, q.safe_mode);
    let success = state.telegram.send(&message).await;
    let preview: String = message.chars().take(100).collect();
    Ok(Json(SendResponse {
        success,
        message: Some(format!("{}...", preview)),
    }))
}

async fn post_result_to_telegram(
    State(state): State<Arc<AppState>>,
    Path(pick_id): Path<i64>,
) -> Result<Json<SendResponse>, ApiError> {
    let pick = fetch_pick(&state, pick_id).await?;
    if row_str(&pick, "resultat").is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "No result registered yet".to_string(),
        ));
    }
    let message = crate::telegram::format_result_post(&pick);
    let success = state.telegram.send(&message).await;
    Ok(Json(SendResponse {
        success,
        message: None,
    }))
}

async fn post_daily_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SendResponse>, ApiError> {
    let success = engine::send_daily_summary(&state).await.map_err(internal)?;
    Ok(Json(SendResponse {
        success,
        message: None,
    }))
}

async fn test_telegram(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SendResponse>, ApiError> {
    let balance = bankroll::current(&state.db).await.unwrap_or(BANKROLL_START);
    let msg = crate::telegram::format_test_post(balance, BANKROLL_GOAL);
    let success = state.telegram.send(&msg).await;
    Ok(Json(SendResponse {
        success,
        message: None,
    }))
}

// ── Dagens Kamp ──────────────────────────────────────────────

async fn get_dagens_kamp(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    match engine::todays_row(&state).await {
        Ok(Some(row)) => return Ok(Json(engine::cached_response(&row))),
        Ok(None) => {}
        Err(e) => warn!("[DagensKamp] Cache lookup failed: {}", e),
    }
    run_sync_analysis(&state).await
}

async fn run_sync_analysis(state: &AppState) -> Result<Json<Value>, ApiError> {
    // NoMatches becomes the Norwegian error body with a 200 status;
    // only upstream fetch failures surface as errors.
    engine::analysis_to_body(engine::analyze_and_store(state).await)
        .map(Json)
        .map_err(internal)
}

async fn trigger_analysis(State(state): State<Arc<AppState>>) -> Json<TriggerResponse> {
    tokio::spawn(async move {
        if let Err(e) = engine::analyze_and_store(&state).await {
            warn!("[DagensKamp] Background analysis error: {}", e);
        }
    });
    Json(TriggerResponse {
        status: "analyzing".to_string(),
        message: "Analyse startet — sjekk /dagens-kamp om 10-15 sekunder".to_string(),
    })
}

async fn trigger_analysis_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    run_sync_analysis(&state).await
}

async fn manual_check_result(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    engine::check_pending_results(&state).await.map_err(internal)?;
    let rows = state
        .db
        .query(&format!(
            "SELECT resultat, home_score, away_score FROM dagens_kamp WHERE dato = '{}'",
            engine::today_cet()
        ))
        .await
        .map_err(db_err)?;
    if let Some(row) = rows.first() {
        if !row_str(row, "resultat").is_empty() {
            return Ok(Json(json!({"status": "found", "result": row})));
        }
    }
    Ok(Json(json!({
        "status": "pending",
        "message": "Ingen resultat funnet ennå",
    })))
}

async fn post_dagens_kamp_telegram(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SendResponse>, ApiError> {
    let success = engine::post_analysis_to_telegram(&state)
        .await
        .map_err(internal)?;
    Ok(Json(SendResponse {
        success,
        message: None,
    }))
}

async fn get_dagens_kamp_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DaysQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let cutoff = (engine::today_cet() - chrono::Duration::days(q.days as i64)).to_string();
    let rows = state
        .db
        .query(&format!(
            "SELECT dato, league, league_flag, home_team, away_team, pick, odds, \
                    ev_pct, confidence, over25_pct, btts_pct, resultat, \
                    home_score, away_score, posted_telegram, result_posted_telegram \
             FROM dagens_kamp WHERE dato >= '{}' ORDER BY dato DESC",
            cutoff
        ))
        .await
        .map_err(db_err)?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct LiveOddsQuery {
    #[serde(default = "default_sport")]
    sport: String,
    #[serde(default = "default_regions")]
    regions: String,
}

fn default_sport() -> String {
    "soccer_epl".to_string()
}

fn default_regions() -> String {
    "eu".to_string()
}

async fn get_live_odds(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LiveOddsQuery>,
) -> Result<Json<Value>, ApiError> {
    match state.analyzer.raw_odds(&q.sport, &q.regions).await {
        Ok(body) => Ok(Json(body)),
        Err(e) => Ok(Json(json!({
            "error": "Failed to fetch odds",
            "detail": e.to_string(),
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(Arc::new(AppState::new(Config::default())))
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let resp = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "sesomnod-api");
        assert!(body["uptime_seconds"].is_number());
    }

    #[tokio::test]
    async fn test_kelly_endpoint_valid() {
        let resp = test_router()
            .oneshot(
                Request::builder()
                    .uri("/kelly?odds=2.0&prob=0.55")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["kelly_full"], 10.0);
        assert_eq!(body["kelly_fractional"], 2.5);
        assert_eq!(body["ev_pct"], 10.0);
        assert_eq!(body["recommended_tier"], 2);
    }

    #[tokio::test]
    async fn test_kelly_endpoint_rejects_bad_params() {
        for uri in [
            "/kelly?odds=1.0&prob=0.5",
            "/kelly?odds=2.0&prob=0.0",
            "/kelly?odds=2.0&prob=1.0",
        ] {
            let resp = test_router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);
        }
    }

    #[test]
    fn test_compute_kelly_tiers() {
        assert_eq!(compute_kelly(2.2, 0.60, 10_000.0, 0.25).recommended_tier, 1);
        assert_eq!(compute_kelly(2.0, 0.54, 10_000.0, 0.25).recommended_tier, 2);
        assert_eq!(compute_kelly(2.0, 0.51, 10_000.0, 0.25).recommended_tier, 3);
    }

    #[test]
    fn test_compute_kelly_negative_edge_stakes_zero() {
        let k = compute_kelly(2.0, 0.40, 10_000.0, 0.25);
        assert!(k.kelly_full < 0.0);
        assert_eq!(k.stake_pct, 0.0);
        assert_eq!(k.stake_amount, 0.0);
    }

    #[test]
    fn test_settle_pl() {
        assert_eq!(settle_pl(Outcome::Win, 1.85, 2.0), 1.7);
        assert_eq!(settle_pl(Outcome::Loss, 1.85, 2.0), -2.0);
        assert_eq!(settle_pl(Outcome::Push, 1.85, 2.0), 0.0);
    }

    #[test]
    fn test_clv_pct() {
        assert_eq!(clv_pct(2.0, 2.1), 5.0);
        assert_eq!(clv_pct(2.0, 1.9), -5.0);
    }

    #[test]
    fn test_stats_from_row_winrate_and_roi() {
        let row = json!({
            "total_picks": 10,
            "wins": 6,
            "losses": 3,
            "pushes": 1,
            "pending": 0,
            "total_pl": "4.5",
            "avg_clv": 1.2,
            "avg_ev": 3.4,
        });
        let stats = stats_from_row(&row);
        assert_eq!(stats.winrate, 66.7);
        assert_eq!(stats.roi, 25.0);
        assert_eq!(stats.total_pl, 4.5);
    }

    #[test]
    fn test_stats_from_row_empty() {
        let stats = stats_from_row(&Value::Null);
        assert_eq!(stats.total_picks, 0);
        assert_eq!(stats.winrate, 0.0);
        assert_eq!(stats.roi, 0.0);
    }
}

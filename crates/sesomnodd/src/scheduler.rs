//! Background scheduler.
//!
//! A single loop ticks every 30 minutes (configurable) and drives the
//! three automated jobs: the morning analysis, result checking after
//! kickoff, and the evening summary. Daily jobs fire in the first tick
//! window of their hour and are latched per date so a long tick never
//! double-runs them.

use crate::engine;
use crate::state::AppState;
use chrono::{Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A daily job fires when the CET clock is inside the first half hour
/// of its target hour and it has not already run today.
fn due(hour: u32, minute: u32, target_hour: u32, last_run: Option<NaiveDate>, today: NaiveDate) -> bool {
    hour == target_hour && minute < 30 && last_run != Some(today)
}

pub async fn run(state: Arc<AppState>) {
    let cfg = state.config.scheduler.clone();
    info!(
        "[Scheduler] Started (tick every {} min, analysis {:02}:00, summary {:02}:00 CET)",
        cfg.tick_minutes, cfg.analysis_hour, cfg.summary_hour
    );

    let mut last_analysis_date: Option<NaiveDate> = None;
    let mut last_summary_date: Option<NaiveDate> = None;

    loop {
        let now_cet = Utc::now() + ChronoDuration::hours(1);
        let today = now_cet.date_naive();
        let hour = now_cet.hour();
        let minute = now_cet.minute();

        if due(hour, minute, cfg.analysis_hour, last_analysis_date, today) {
            info!(
                "[Scheduler] {:02}:00 — Running Dagens Kamp analysis for {}",
                cfg.analysis_hour,
                today.format("%Y-%m-%d")
            );
            match engine::analyze_and_store(&state).await {
                Ok(_) => {
                    if let Err(e) = engine::post_analysis_to_telegram(&state).await {
                        warn!("[Scheduler] Analysis post error: {}", e);
                    }
                    last_analysis_date = Some(today);
                    info!("[Scheduler] Analysis complete and posted to Telegram");
                }
                Err(e) => error!("[Scheduler] Analysis error: {}", e),
            }
        }

        if let Err(e) = engine::check_pending_results(&state).await {
            warn!("[Scheduler] Result check error: {}", e);
        }

        if due(hour, minute, cfg.summary_hour, last_summary_date, today) {
            info!("[Scheduler] {:02}:00 — Sending daily summary", cfg.summary_hour);
            match engine::send_daily_summary(&state).await {
                Ok(_) => last_summary_date = Some(today),
                Err(e) => error!("[Scheduler] Summary error: {}", e),
            }
        }

        tokio::time::sleep(Duration::from_secs(cfg.tick_minutes * 60)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_due_only_in_first_half_hour() {
        let today = d(2026, 8, 23);
        assert!(due(6, 0, 6, None, today));
        assert!(due(6, 29, 6, None, today));
        assert!(!due(6, 30, 6, None, today));
        assert!(!due(7, 0, 6, None, today));
        assert!(!due(5, 59, 6, None, today));
    }

    #[test]
    fn test_due_latches_per_day() {
        let today = d(2026, 8, 23);
        assert!(!due(6, 10, 6, Some(today), today));
        // A new day resets the latch
        assert!(due(6, 10, 6, Some(d(2026, 8, 22)), today));
    }
}

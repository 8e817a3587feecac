//! Shared daemon state handed to every request handler.

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::db::Db;
use crate::results::ResultChecker;
use crate::telegram::Telegram;
use std::time::Instant;

pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub analyzer: Analyzer,
    pub results: ResultChecker,
    pub telegram: Telegram,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let db = Db::new(&config.database);
        let analyzer = Analyzer::new(&config.odds);
        let results = ResultChecker::new(&config.odds);
        let telegram = Telegram::new(&config.telegram);
        Self {
            config,
            db,
            analyzer,
            results,
            telegram,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

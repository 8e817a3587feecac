//! SesomNod Engine daemon.
//!
//! An odds-analysis backend: it finds the best-value match of the day
//! across the top five European leagues, simulates it, posts the
//! recommendation to Telegram, settles the result automatically and
//! tracks a play-money bankroll.

pub mod analysis;
pub mod bankroll;
pub mod config;
pub mod db;
pub mod engine;
pub mod results;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod simulation;
pub mod state;
pub mod telegram;

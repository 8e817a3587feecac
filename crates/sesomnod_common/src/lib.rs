//! Shared types and constants for the SesomNod engine.
//!
//! Everything the daemon and the CLI both need: API request/response
//! structs, the W/L/P outcome type, bankroll constants, and the
//! responsible-gambling disclaimer that every outbound message carries.

pub mod api;

pub use api::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Play-money bankroll starting balance (NOK).
pub const BANKROLL_START: f64 = 100.0;

/// Bankroll goal (NOK) used for progress reporting.
pub const BANKROLL_GOAL: f64 = 10_000.0;

/// Disclaimer attached to analysis posts.
pub const DISCLAIMER: &str = "⚠️ Dette er statistisk analyse basert på historiske data og markedsodds. \
     Vi garanterer ikke resultater. Alle beslutninger er ditt eget ansvar. Spill ansvarlig.";

/// Shorter disclaimer used on result and summary posts.
pub const RESULT_DISCLAIMER: &str =
    "Dette er underholdning og analyse. Gamble aldri mer enn du har råd til å tape.";

/// Settled outcome of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "P")]
    Push,
}

impl Outcome {
    /// Single-letter database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "W",
            Self::Loss => "L",
            Self::Push => "P",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Win => "✅",
            Self::Loss => "❌",
            Self::Push => "↩️",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid outcome: {0} (expected W, L or P)")]
pub struct ParseOutcomeError(String);

impl FromStr for Outcome {
    type Err = ParseOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "W" => Ok(Self::Win),
            "L" => Ok(Self::Loss),
            "P" => Ok(Self::Push),
            other => Err(ParseOutcomeError(other.to_string())),
        }
    }
}

/// Text progress bar for bankroll goal tracking, e.g. `[███░░░░░░░]`.
pub fn progress_bar(pct: f64, length: usize) -> String {
    let clamped = pct.clamp(0.0, 100.0);
    let filled = (clamped / 100.0 * length as f64) as usize;
    let filled = filled.min(length);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(length - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_roundtrip() {
        for (s, o) in [("W", Outcome::Win), ("L", Outcome::Loss), ("P", Outcome::Push)] {
            assert_eq!(s.parse::<Outcome>().unwrap(), o);
            assert_eq!(o.to_string(), s);
        }
        assert!("X".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_outcome_serde_single_letter() {
        assert_eq!(serde_json::to_string(&Outcome::Win).unwrap(), "\"W\"");
        let o: Outcome = serde_json::from_str("\"P\"").unwrap();
        assert_eq!(o, Outcome::Push);
    }

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0.0, 10), "[░░░░░░░░░░]");
        assert_eq!(progress_bar(100.0, 10), "[██████████]");
        assert_eq!(progress_bar(250.0, 10), "[██████████]");
        assert_eq!(progress_bar(-5.0, 10), "[░░░░░░░░░░]");
        assert_eq!(progress_bar(50.0, 10), "[█████░░░░░]");
    }
}

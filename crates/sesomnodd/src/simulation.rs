//! Monte Carlo match simulation.
//!
//! Goals per team are Poisson-sampled from an xG estimate derived from
//! the vig-free 1X2 probabilities. The RNG is passed in so tests run
//! seeded.

use rand::Rng;
use sesomnod_common::{ScoreCount, SimulationSummary};
use std::collections::{BTreeMap, HashMap};

/// Default number of scenario simulations per match.
pub const DEFAULT_RUNS: u32 = 100;

/// Sample from a Poisson distribution (Knuth's algorithm).
pub fn poisson_sample(rng: &mut impl Rng, lambda: f64) -> u32 {
    let l = (-lambda).exp();
    let mut k: u32 = 0;
    let mut p = 1.0;
    loop {
        p *= rng.gen::<f64>();
        if p <= l {
            return k;
        }
        k += 1;
    }
}

/// Estimate expected goals from win probabilities.
///
/// Home side carries the stronger baseline; both sides are clamped to
/// keep degenerate odds from producing absurd scorelines.
fn expected_goals(home_prob: f64, away_prob: f64) -> (f64, f64) {
    let home_xg = (1.2 + (home_prob - 0.33) * 2.5).clamp(0.3, 3.5);
    let away_xg = (0.9 + (away_prob - 0.33) * 2.5).clamp(0.3, 3.0);
    (home_xg, away_xg)
}

/// Run `n` simulations of a match and tally the outcomes.
pub fn run_simulation(
    rng: &mut impl Rng,
    home_prob: f64,
    away_prob: f64,
    n: u32,
) -> SimulationSummary {
    let (home_xg, away_xg) = expected_goals(home_prob, away_prob);

    let mut home_wins = 0u32;
    let mut draws = 0u32;
    let mut away_wins = 0u32;
    let mut over25 = 0u32;
    let mut btts = 0u32;
    let mut score_counts: HashMap<String, u32> = HashMap::new();
    let mut goal_histogram: BTreeMap<String, u32> = BTreeMap::new();

    for _ in 0..n {
        let home_goals = poisson_sample(rng, home_xg);
        let away_goals = poisson_sample(rng, away_xg);

        if home_goals > away_goals {
            home_wins += 1;
        } else if home_goals == away_goals {
            draws += 1;
        } else {
            away_wins += 1;
        }

        let total = home_goals + away_goals;
        if total >= 3 {
            over25 += 1;
        }
        if home_goals > 0 && away_goals > 0 {
            btts += 1;
        }

        *score_counts
            .entry(format!("{}-{}", home_goals, away_goals))
            .or_insert(0) += 1;
        *goal_histogram
            .entry(total.min(6).to_string())
            .or_insert(0) += 1;
    }

    let pct = |count: u32| round1(count as f64 / n as f64 * 100.0);

    // Most frequent scorelines; score string breaks count ties so the
    // ordering is stable.
    let mut scores: Vec<(String, u32)> = score_counts.into_iter().collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_scores = scores
        .into_iter()
        .take(5)
        .map(|(score, count)| ScoreCount {
            score,
            count,
            pct: pct(count),
        })
        .collect();

    SimulationSummary {
        simulations: n,
        home_wins,
        draws,
        away_wins,
        home_win_pct: pct(home_wins),
        draw_pct: pct(draws),
        away_win_pct: pct(away_wins),
        over25_pct: pct(over25),
        btts_pct: pct(btts),
        home_xg: round2(home_xg),
        away_xg: round2(away_xg),
        top_scores,
        goal_histogram,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_poisson_sample_mean_close_to_lambda() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let sum: u64 = (0..n).map(|_| poisson_sample(&mut rng, 1.7) as u64).sum();
        let mean = sum as f64 / n as f64;
        assert!((mean - 1.7).abs() < 0.05, "mean {} too far from 1.7", mean);
    }

    #[test]
    fn test_expected_goals_clamped() {
        let (h, a) = expected_goals(0.99, 0.005);
        assert!(h <= 3.5);
        assert!(a >= 0.3);
        let (h, a) = expected_goals(0.01, 0.95);
        assert!(h >= 0.3);
        assert!(a <= 3.0);
    }

    #[test]
    fn test_simulation_tallies_consistent() {
        let mut rng = StdRng::seed_from_u64(42);
        let sim = run_simulation(&mut rng, 0.45, 0.28, 100);

        assert_eq!(sim.simulations, 100);
        assert_eq!(sim.home_wins + sim.draws + sim.away_wins, 100);
        let hist_total: u32 = sim.goal_histogram.values().sum();
        assert_eq!(hist_total, 100);
        assert!(sim.top_scores.len() <= 5);
        assert!(!sim.top_scores.is_empty());
        // Frequencies sorted descending
        for pair in sim.top_scores.windows(2) {
            assert!(pair[0].count >= pair[1].count);
        }
        assert!(sim.over25_pct >= 0.0 && sim.over25_pct <= 100.0);
        assert!(sim.btts_pct >= 0.0 && sim.btts_pct <= 100.0);
    }

    #[test]
    fn test_simulation_seeded_reproducible() {
        let a = run_simulation(&mut StdRng::seed_from_u64(9), 0.5, 0.25, 100);
        let b = run_simulation(&mut StdRng::seed_from_u64(9), 0.5, 0.25, 100);
        assert_eq!(a.home_wins, b.home_wins);
        assert_eq!(a.goal_histogram, b.goal_histogram);
    }

    #[test]
    fn test_strong_favourite_wins_more() {
        let mut rng = StdRng::seed_from_u64(3);
        let sim = run_simulation(&mut rng, 0.75, 0.10, 2_000);
        assert!(sim.home_wins > sim.away_wins * 2);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PloError, PloResult};

/// Two-sided 95% z-score.
pub const Z_95: f64 = 1.96;

/// When a simulation may stop. All three conditions must hold at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoppingRule {
    pub min_trials: u64,
    pub max_sigma: f64,
    pub max_half_width: f64,
}

impl Default for StoppingRule {
    fn default() -> Self {
        StoppingRule {
            min_trials: 100,
            max_sigma: 0.005,
            max_half_width: 0.01,
        }
    }
}

impl StoppingRule {
    pub fn is_satisfied(&self, estimate: &Estimate) -> bool {
        estimate.trials >= self.min_trials
            && estimate.standard_deviation <= self.max_sigma
            && estimate.half_width <= self.max_half_width
    }

    pub fn validate(&self) -> PloResult<()> {
        if !(self.max_sigma.is_finite() && self.max_sigma > 0.0) {
            return Err(PloError::InvalidValue(format!(
                "max_sigma must be a positive number, got {}",
                self.max_sigma
            )));
        }
        if !(self.max_half_width.is_finite() && self.max_half_width > 0.0) {
            return Err(PloError::InvalidValue(format!(
                "max_half_width must be a positive number, got {}",
                self.max_half_width
            )));
        }
        Ok(())
    }
}

/// Running trial and win counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub trials: u64,
    pub wins: u64,
}

impl Tally {
    pub fn record(&mut self, won: bool) {
        self.trials += 1;
        if won {
            self.wins += 1;
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.trials += other.trials;
        self.wins += other.wins;
    }

    pub fn estimate(&self) -> Estimate {
        Estimate::from_counts(self.wins, self.trials)
    }
}

/// Win rate with its binomial standard error and 95% half-width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub win_rate: f64,
    pub standard_deviation: f64,
    pub half_width: f64,
    pub trials: u64,
}

impl Estimate {
    pub fn from_counts(wins: u64, trials: u64) -> Estimate {
        if trials == 0 {
            return Estimate {
                win_rate: 0.0,
                standard_deviation: 0.0,
                half_width: 0.0,
                trials: 0,
            };
        }
        let win_rate = wins as f64 / trials as f64;
        let standard_deviation = standard_error(win_rate, trials);
        Estimate {
            win_rate,
            standard_deviation,
            half_width: Z_95 * standard_deviation,
            trials,
        }
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}% (SD {:.4}%, CI {:.4}%) after {} trials",
            self.win_rate * 100.0,
            self.standard_deviation * 100.0,
            self.half_width * 100.0,
            self.trials,
        )
    }
}

pub fn standard_error(win_rate: f64, trials: u64) -> f64 {
    (win_rate * (1.0 - win_rate) / trials as f64).sqrt()
}

/// Spacing between checkpoints at a given trial count: every 100 trials up to
/// 1,000, every 1,000 up to 10,000, and so on, capped at 1,000,000.
pub fn checkpoint_interval(trials: u64) -> u64 {
    match trials {
        0..=1_000 => 100,
        1_001..=10_000 => 1_000,
        10_001..=100_000 => 10_000,
        100_001..=1_000_000 => 100_000,
        _ => 1_000_000,
    }
}

pub fn is_checkpoint(trials: u64) -> bool {
    trials > 0 && trials % checkpoint_interval(trials) == 0
}

/// First checkpoint strictly after `trials`.
pub fn next_checkpoint(trials: u64) -> u64 {
    let interval = checkpoint_interval(trials + 1);
    (trials / interval + 1) * interval
}

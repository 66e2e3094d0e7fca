//! Tunable policy parameters for the four engines and the run configuration.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{Paygrade, PERFORMANCE_MAX, PERFORMANCE_MIN};

/// Invalid option or policy value, detected before any simulation work.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// A per-paygrade tick count with a fallback value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSchedule {
    /// Value used for grades without an override.
    pub default: u32,
    /// Overrides keyed by paygrade level.
    #[serde(default)]
    pub overrides: BTreeMap<u8, u32>,
}

impl GradeSchedule {
    /// Same value for every paygrade.
    pub fn uniform(value: u32) -> Self {
        Self {
            default: value,
            overrides: BTreeMap::new(),
        }
    }

    /// Value for the given paygrade.
    pub fn for_grade(&self, grade: Paygrade) -> u32 {
        self.overrides
            .get(&grade.level())
            .copied()
            .unwrap_or(self.default)
    }
}

/// When the clock may stop before the tick horizon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// Always run the full horizon.
    #[default]
    Never,
    /// Stop once the roster is empty and a tick brought in no accessions.
    RosterEmpty,
}

/// Career policy shared by the engines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Paygrade at which recruits enter.
    pub entry_paygrade: Paygrade,
    /// Highest paygrade anyone may be promoted to.
    pub max_paygrade: Paygrade,
    /// Ticks a recruit spends in training before becoming assignable.
    pub training_lag: u32,
    /// Maximum accessions per tick.
    pub intake_cap: u32,
    /// Minimum time in current grade before promotion eligibility.
    pub min_time_in_grade: GradeSchedule,
    /// Minimum performance score to compete for promotion.
    pub promotion_cutoff: Decimal,
    /// Scales the promotion budget derived from vacancies.
    pub promotion_multiplier: f64,
    /// Ticks in an assignment before a person may be moved.
    pub min_tour_length: u32,
    /// Ticks in an assignment after which a person rotates (projected rotation date).
    pub rotation_tour_length: u32,
    /// High-year tenure: time in service ceiling per paygrade.
    pub service_ceiling: GradeSchedule,
    /// Probability a person past the service ceiling is approved to re-enlist.
    pub retention_rate: f64,
    /// Base per-tick probability of voluntary separation.
    pub voluntary_attrition_rate: f64,
    /// Time in service at which retirement becomes possible.
    pub retirement_eligibility: u32,
    /// Per-tick retirement probability on first becoming eligible.
    pub retirement_base_rate: f64,
    /// Added to the retirement probability for each full year past eligibility.
    pub retirement_rate_growth: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            entry_paygrade: Paygrade(3),
            max_paygrade: Paygrade::MAX,
            training_lag: 3,
            intake_cap: 10,
            min_time_in_grade: GradeSchedule {
                default: 36,
                overrides: BTreeMap::from([(1, 9), (2, 9), (3, 6), (4, 12)]),
            },
            promotion_cutoff: Decimal::new(300, 2),
            promotion_multiplier: 1.0,
            min_tour_length: 24,
            rotation_tour_length: 36,
            service_ceiling: GradeSchedule {
                default: 60,
                overrides: BTreeMap::from([
                    (4, 96),
                    (5, 168),
                    (6, 240),
                    (7, 288),
                    (8, 312),
                    (9, 360),
                ]),
            },
            retention_rate: 0.6,
            voluntary_attrition_rate: 0.002,
            retirement_eligibility: 240,
            retirement_base_rate: 0.05,
            retirement_rate_growth: 0.02,
        }
    }
}

fn check_probability(name: &str, p: f64) -> Result<(), ConfigError> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{name} must be a probability in [0, 1], got {p}"
        )));
    }
    Ok(())
}

impl Policy {
    /// Reject out-of-range parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.promotion_cutoff < PERFORMANCE_MIN || self.promotion_cutoff > PERFORMANCE_MAX {
            return Err(ConfigError::InvalidConfiguration(format!(
                "promotion cutoff must be within [0, 5], got {}",
                self.promotion_cutoff
            )));
        }
        if !self.promotion_multiplier.is_finite() || self.promotion_multiplier < 0.0 {
            return Err(ConfigError::InvalidConfiguration(format!(
                "promotion multiplier must be finite and >= 0, got {}",
                self.promotion_multiplier
            )));
        }
        if self.entry_paygrade > self.max_paygrade {
            return Err(ConfigError::InvalidConfiguration(format!(
                "entry paygrade {} is above maximum paygrade {}",
                self.entry_paygrade, self.max_paygrade
            )));
        }
        if self.rotation_tour_length < self.min_tour_length {
            return Err(ConfigError::InvalidConfiguration(format!(
                "rotation tour length {} is shorter than minimum tour length {}",
                self.rotation_tour_length, self.min_tour_length
            )));
        }
        check_probability("retention rate", self.retention_rate)?;
        check_probability("voluntary attrition rate", self.voluntary_attrition_rate)?;
        check_probability("retirement base rate", self.retirement_base_rate)?;
        check_probability("retirement rate growth", self.retirement_rate_growth)?;
        Ok(())
    }
}

/// Run-level configuration for the clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of ticks to run; negative values are rejected.
    pub ticks: i64,
    /// Seed for the run's single RNG.
    pub rng_seed: u64,
    /// Calendar month of tick 1 (each tick is one month).
    pub start_month: NaiveDate,
    /// Early stop rule.
    pub stop: StopCondition,
}

impl SimConfig {
    /// Configuration with the default start month and no early stop.
    pub fn new(ticks: i64, rng_seed: u64) -> Self {
        Self {
            ticks,
            rng_seed,
            start_month: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            stop: StopCondition::Never,
        }
    }

    /// Tick horizon as an unsigned count.
    pub fn tick_count(&self) -> Result<u32, ConfigError> {
        u32::try_from(self.ticks).map_err(|_| {
            ConfigError::InvalidConfiguration(format!(
                "tick count must be between 0 and {}, got {}",
                u32::MAX,
                self.ticks
            ))
        })
    }
}

//! The simulation clock: owns the ledger and the run's RNG and drives the engines.

use chrono::{Months, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::info;
use torso_core::{
    ConfigError, Ledger, LedgerError, Policy, SimConfig, StopCondition, ValidationError,
};
use torso_engines::{run_accession, run_advancement, run_distribution, run_separation};

use crate::metrics::{RunSummary, TickMetrics, TickReports};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Policy or run configuration rejected before the first tick.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An engine misused a ledger primitive.
    #[error("ledger update failed: {0}")]
    Ledger(#[from] LedgerError),
    /// The ledger failed its end-of-tick consistency check.
    #[error("ledger invariant broken after tick {tick}: {source}")]
    Invariant {
        /// Tick that produced the broken state.
        tick: u32,
        /// What was broken.
        source: ValidationError,
    },
}

/// Final ledger plus the metrics sequence of a run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// Ledger after the last simulated tick.
    pub ledger: Ledger,
    /// One snapshot per simulated tick.
    pub metrics: Vec<TickMetrics>,
}

impl RunOutcome {
    /// Totals over the run.
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_metrics(&self.metrics)
    }
}

/// Steps a ledger through time.
#[derive(Debug)]
pub struct Clock {
    ledger: Ledger,
    policy: Policy,
    config: SimConfig,
    rng: ChaCha8Rng,
}

impl Clock {
    /// Validate the configuration and seed the run's generator.
    pub fn new(ledger: Ledger, policy: Policy, config: SimConfig) -> Result<Self, SimError> {
        policy.validate()?;
        config.tick_count()?;
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Ok(Self {
            ledger,
            policy,
            config,
            rng,
        })
    }

    /// Read-only view of the ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Calendar month of the given tick.
    pub fn month_of(&self, tick: u32) -> NaiveDate {
        let start = self.config.start_month;
        start
            .checked_add_months(Months::new(tick.saturating_sub(1)))
            .unwrap_or(start)
    }

    /// Run one tick: age, then accession, advancement, distribution, separation.
    pub fn step(&mut self) -> Result<TickMetrics, SimError> {
        let opening_roster = u32::try_from(self.ledger.roster_size()).unwrap_or(u32::MAX);
        self.ledger.advance_tick();
        let tick = self.ledger.tick();

        let reports = TickReports {
            accession: run_accession(&mut self.ledger, &self.policy, &mut self.rng)?,
            advancement: run_advancement(&mut self.ledger, &self.policy)?,
            distribution: run_distribution(&mut self.ledger, &self.policy)?,
            separation: run_separation(&mut self.ledger, &self.policy, &mut self.rng)?,
        };
        self.ledger
            .check_invariants()
            .map_err(|source| SimError::Invariant { tick, source })?;

        let m = TickMetrics::collect(&self.ledger, self.month_of(tick), opening_roster, &reports);
        info!(
            tick,
            month = %m.month,
            roster = m.roster_size,
            accessions = m.accessions,
            promotions = m.promotions,
            assignments = m.assignments,
            separations = m.separations,
            retirements = m.retirements,
            vacancies = m.vacant_positions,
            unassigned = m.unassigned_people,
            "tick complete"
        );
        Ok(m)
    }

    /// Run to the tick horizon or until the stop condition fires.
    pub fn run(mut self) -> Result<RunOutcome, SimError> {
        let ticks = self.config.tick_count()?;
        let mut metrics = Vec::new();
        for _ in 0..ticks {
            let m = self.step()?;
            let stop = self.config.stop == StopCondition::RosterEmpty
                && m.roster_size == 0
                && m.accessions == 0;
            metrics.push(m);
            if stop {
                info!(tick = self.ledger.tick(), "roster empty, stopping early");
                break;
            }
        }
        Ok(RunOutcome {
            ledger: self.ledger,
            metrics,
        })
    }
}

/// Run `tick_count` ticks from `ledger` with a generator seeded by `seed`.
pub fn run(ledger: Ledger, policy: &Policy, tick_count: i64, seed: u64) -> Result<RunOutcome, SimError> {
    Clock::new(ledger, policy.clone(), SimConfig::new(tick_count, seed))?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_tick_count_is_rejected_up_front() {
        let err = run(Ledger::default(), &Policy::default(), -1, 42).unwrap_err();
        assert!(matches!(err, SimError::Config(ConfigError::InvalidConfiguration(_))));
    }

    #[test]
    fn invalid_policy_is_rejected_up_front() {
        let policy = Policy {
            retention_rate: 2.0,
            ..Policy::default()
        };
        assert!(matches!(
            run(Ledger::default(), &policy, 5, 42),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn zero_ticks_yields_no_metrics() {
        let out = run(Ledger::default(), &Policy::default(), 0, 42).unwrap();
        assert!(out.metrics.is_empty());
        assert_eq!(out.ledger.tick(), 0);
    }

    #[test]
    fn months_follow_ticks() {
        let mut config = SimConfig::new(3, 1);
        config.start_month = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        let clock = Clock::new(Ledger::default(), Policy::default(), config).unwrap();
        assert_eq!(clock.month_of(1), NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
        assert_eq!(clock.month_of(3), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn empty_roster_stops_early_when_configured() {
        let mut config = SimConfig::new(10, 1);
        config.stop = StopCondition::RosterEmpty;
        let out = Clock::new(Ledger::default(), Policy::default(), config)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(out.metrics.len(), 1);
    }

    #[test]
    fn huge_horizon_still_stops_on_empty_roster() {
        let mut config = SimConfig::new(u32::MAX as i64, 1);
        config.stop = StopCondition::RosterEmpty;
        let out = Clock::new(Ledger::default(), Policy::default(), config)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(out.metrics.len(), 1);
        assert_eq!(out.ledger.tick(), 1);
    }
}

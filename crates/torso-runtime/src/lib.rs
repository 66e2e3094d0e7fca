#![deny(warnings)]

//! Tick loop for TORSO.
//!
//! The [`Clock`] owns the population ledger and a single seeded RNG, runs the
//! four engines in fixed order each tick and emits a [`TickMetrics`] snapshot
//! after every tick. Identical ledger, policy, tick count and seed always give
//! identical snapshots.

mod clock;
mod metrics;

pub use clock::{run, Clock, RunOutcome, SimError};
pub use metrics::{RunSummary, TickMetrics, TickReports};

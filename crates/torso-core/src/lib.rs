#![deny(warnings)]

//! Core domain model for TORSO.
//!
//! This crate defines the person and position records, the population
//! ledger that owns them, and the policy parameters that drive the career
//! engines. Every mutation of the ledger goes through a primitive that keeps
//! the person/position pairing consistent.

mod error;
mod ledger;
mod model;
mod policy;

pub use error::{LedgerError, ValidationError};
pub use ledger::Ledger;
pub use model::{
    validate_performance, Paygrade, Person, PersonId, Position, PositionId, Rating, Status,
    PERFORMANCE_MAX, PERFORMANCE_MIN,
};
pub use policy::{ConfigError, GradeSchedule, Policy, SimConfig, StopCondition};

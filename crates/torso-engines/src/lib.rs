#![deny(warnings)]

//! Career-event engines for TORSO.
//!
//! Each engine is a function over `(ledger, policy[, rng])` that performs one
//! full pass over the population and returns a report of what it did:
//! - Accession: graduate trainees and recruit against unmet entry-level demand
//! - Advancement: promote within the vacancy budget of the next paygrade
//! - Distribution: match people to vacant positions and move rotators
//! - Separation: mandatory separation, voluntary attrition and retirement
//!
//! Stochastic engines draw from the caller's RNG and never create their own.

pub mod accession;
pub mod advancement;
pub mod distribution;
pub mod separation;

pub use accession::{run_accession, AccessionReport};
pub use advancement::{run_advancement, AdvancementReport};
pub use distribution::{run_distribution, DistributionReport};
pub use separation::{
    retirement_probability, run_separation, voluntary_attrition_probability, SeparationReport,
};

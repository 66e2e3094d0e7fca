#![deny(warnings)]

//! Datasets for TORSO: CSV position and personnel files, YAML policy files
//! and seeded synthetic generators for both datasets.
//!
//! Every record is validated as it is read. The first bad record aborts the
//! load with [`LoadError::MalformedInputRecord`] naming the dataset, the line
//! and the reason; nothing is skipped.

mod dataset;
mod error;
mod policy_file;
pub mod synth;

pub use dataset::{
    assemble_ledger, load_ledger, read_people, read_positions, read_positions_path, write_people,
    write_people_path, write_positions, write_positions_path,
};
pub use error::{Dataset, LoadError};
pub use policy_file::{load_policy, parse_policy};
pub use synth::{GenerateError, Synth};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{PersonId, PositionId, Status};

/// Record-level and ledger-level invariant violations found while validating data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Paygrade outside E-1..E-9 or not parseable.
    #[error("unknown paygrade {0:?}")]
    UnknownPaygrade(String),
    /// Rating code is not 1-5 upper-case letters/digits.
    #[error("unknown rating {0:?}")]
    UnknownRating(String),
    /// Status is not one of the five career statuses.
    #[error("unknown status {0:?}")]
    UnknownStatus(String),
    /// Performance must be within [0, 5].
    #[error("performance score {0} is outside [0, 5]")]
    PerformanceOutOfRange(Decimal),
    /// Time in grade cannot exceed time in service.
    #[error("person {person}: time in grade {time_in_grade} exceeds time in service {time_in_service}")]
    GradeExceedsService {
        /// Offending person.
        person: PersonId,
        /// Recorded time in grade.
        time_in_grade: u32,
        /// Recorded time in service.
        time_in_service: u32,
    },
    /// Two people share an id.
    #[error("duplicate person id {0}")]
    DuplicatePerson(PersonId),
    /// Two positions share an id.
    #[error("duplicate position id {0}")]
    DuplicatePosition(PositionId),
    /// A person points at a position the ledger does not hold.
    #[error("person {person} references unknown position {position}")]
    UnknownPosition {
        /// Offending person.
        person: PersonId,
        /// Missing position.
        position: PositionId,
    },
    /// Two people claim the same position.
    #[error("position {position} is held by both {first} and {second}")]
    DoubleBooked {
        /// Contested position.
        position: PositionId,
        /// First claimant.
        first: PersonId,
        /// Second claimant.
        second: PersonId,
    },
    /// Occupant does not match the position's rating/paygrade.
    #[error("person {person} does not satisfy the requirement of position {position}")]
    RequirementMismatch {
        /// Occupant.
        person: PersonId,
        /// Position.
        position: PositionId,
    },
    /// Status and position reference disagree (e.g. `assigned` with no position).
    #[error("person {0} has status {1} inconsistent with its position reference")]
    StatusMismatch(PersonId, Status),
    /// Position names an occupant who does not point back at it.
    #[error("position {position} names occupant {person} who does not hold it")]
    BrokenPairing {
        /// Position.
        position: PositionId,
        /// Named occupant.
        person: PersonId,
    },
    /// The highest loaded id leaves no room to allocate new ones.
    #[error("person id {0} leaves no room for new ids")]
    IdSpaceExhausted(PersonId),
}

/// Misuse of a ledger mutation primitive. Always an engine bug; aborts the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// No person with this id.
    #[error("unknown person {0}")]
    UnknownPerson(PersonId),
    /// No position with this id.
    #[error("unknown position {0}")]
    UnknownPosition(PositionId),
    /// Position already has an occupant.
    #[error("position {position} is already held by {occupant}")]
    PositionOccupied {
        /// Position.
        position: PositionId,
        /// Current occupant.
        occupant: PersonId,
    },
    /// Person is in the wrong status for the requested transition.
    #[error("person {person} is {status}, which does not allow this transition")]
    InvalidTransition {
        /// Person.
        person: PersonId,
        /// Current status.
        status: Status,
    },
    /// Person does not satisfy the position requirement.
    #[error("person {person} does not satisfy the requirement of position {position}")]
    RequirementMismatch {
        /// Person.
        person: PersonId,
        /// Position.
        position: PositionId,
    },
    /// Already at E-9.
    #[error("person {0} is already at the highest paygrade")]
    AtMaximumGrade(PersonId),
    /// Discharge requires a terminal status.
    #[error("{0} is not a terminal status")]
    NotTerminal(Status),
    /// Every person id has been handed out.
    #[error("no person ids left to allocate")]
    IdsExhausted,
}

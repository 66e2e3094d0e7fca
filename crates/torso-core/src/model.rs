//! Person and position records plus the small value types they are built from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Lowest performance score a person can carry.
pub const PERFORMANCE_MIN: Decimal = Decimal::ZERO;
/// Highest performance score a person can carry.
pub const PERFORMANCE_MAX: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Unique identifier of a person (the DoD id in personnel files).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a position, e.g. "B10234567".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub String);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Occupational specialty code such as "HM" or "STG".
///
/// Codes are one to five upper-case ASCII letters or digits, starting with a letter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rating(String);

impl Rating {
    /// Parse and validate a rating code.
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        let well_formed = (1..=5).contains(&code.len())
            && code.starts_with(|c: char| c.is_ascii_uppercase())
            && code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !well_formed {
            return Err(ValidationError::UnknownRating(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    /// The rating code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Rating {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rating::parse(&value)
    }
}

impl From<Rating> for String {
    fn from(r: Rating) -> Self {
        r.0
    }
}

/// Enlisted paygrade on the E-1..E-9 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Paygrade(pub(crate) u8);

impl Paygrade {
    /// Most junior paygrade.
    pub const MIN: Paygrade = Paygrade(1);
    /// Most senior paygrade.
    pub const MAX: Paygrade = Paygrade(9);

    /// Build a paygrade from its level, rejecting anything outside 1..=9.
    pub fn new(level: u8) -> Result<Self, ValidationError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ValidationError::UnknownPaygrade(level.to_string()))
        }
    }

    /// Numeric level (3 for E-3).
    pub fn level(self) -> u8 {
        self.0
    }

    /// The next paygrade up, if any.
    pub fn next(self) -> Option<Paygrade> {
        Paygrade::new(self.0 + 1).ok()
    }
}

impl fmt::Display for Paygrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

impl FromStr for Paygrade {
    type Err = ValidationError;

    /// Accepts "E-3", "E3" and "3".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let digits = t
            .strip_prefix("E-")
            .or_else(|| t.strip_prefix('E'))
            .unwrap_or(t);
        digits
            .parse::<u8>()
            .ok()
            .and_then(|level| Paygrade::new(level).ok())
            .ok_or_else(|| ValidationError::UnknownPaygrade(t.to_string()))
    }
}

impl TryFrom<String> for Paygrade {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Paygrade> for String {
    fn from(p: Paygrade) -> Self {
        p.to_string()
    }
}

/// Career status of a person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Accessed but still in the training pipeline.
    InTraining,
    /// Available for distribution.
    Assignable,
    /// Holding a position.
    Assigned,
    /// Left service before retirement.
    Separated,
    /// Retired.
    Retired,
}

impl Status {
    /// Whether the person still takes part in ticks.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Separated and retired people are frozen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Separated | Status::Retired)
    }

    /// Dataset spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::InTraining => "in_training",
            Status::Assignable => "assignable",
            Status::Assigned => "assigned",
            Status::Separated => "separated",
            Status::Retired => "retired",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "in_training" => Ok(Status::InTraining),
            "assignable" => Ok(Status::Assignable),
            "assigned" => Ok(Status::Assigned),
            "separated" => Ok(Status::Separated),
            "retired" => Ok(Status::Retired),
            _ => Err(ValidationError::UnknownStatus(s.trim().to_string())),
        }
    }
}

/// Check a performance score against the [0, 5] scale.
pub fn validate_performance(score: Decimal) -> Result<(), ValidationError> {
    if score < PERFORMANCE_MIN || score > PERFORMANCE_MAX {
        return Err(ValidationError::PerformanceOutOfRange(score));
    }
    Ok(())
}

/// An enlisted service member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Unique id.
    pub id: PersonId,
    /// Optional display name.
    pub name: Option<String>,
    /// Occupational specialty.
    pub rating: Rating,
    /// Current paygrade. Never decreases.
    pub paygrade: Paygrade,
    /// Ticks since accession.
    pub time_in_service: u32,
    /// Ticks since last promotion (or accession).
    pub time_in_grade: u32,
    /// Performance score in [0, 5].
    pub performance: Decimal,
    /// Career status.
    pub status: Status,
    /// Position currently held.
    pub position: Option<PositionId>,
    /// Ticks spent in the current assignment.
    pub tour_ticks: u32,
    /// Position most recently detached from.
    pub last_position: Option<PositionId>,
    /// Tick on which a terminal status was entered.
    pub exit_tick: Option<u32>,
}

impl Person {
    /// A fresh, unassigned person with no service history.
    pub fn new(id: PersonId, rating: Rating, paygrade: Paygrade, performance: Decimal) -> Self {
        Self {
            id,
            name: None,
            rating,
            paygrade,
            time_in_service: 0,
            time_in_grade: 0,
            performance,
            status: Status::Assignable,
            position: None,
            tour_ticks: 0,
            last_position: None,
            exit_tick: None,
        }
    }

    /// Active and waiting for a position.
    pub fn is_unassigned(&self) -> bool {
        self.status == Status::Assignable && self.position.is_none()
    }

    /// Validate the record on its own, without reference to positions.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_performance(self.performance)?;
        if self.time_in_grade > self.time_in_service {
            return Err(ValidationError::GradeExceedsService {
                person: self.id,
                time_in_grade: self.time_in_grade,
                time_in_service: self.time_in_service,
            });
        }
        let holds_position = self.position.is_some();
        if holds_position != (self.status == Status::Assigned) {
            return Err(ValidationError::StatusMismatch(self.id, self.status));
        }
        Ok(())
    }
}

/// A billet: a structural slot for one person of a given rating and paygrade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Unique id (BIN).
    pub id: PositionId,
    /// Required rating.
    pub rating: Rating,
    /// Required paygrade.
    pub paygrade: Paygrade,
    /// Location tag (UIC).
    pub location: String,
    /// Sea or shore duty type.
    pub billet_type: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Current occupant.
    pub occupant: Option<PersonId>,
}

impl Position {
    /// A vacant position with no optional tags.
    pub fn new(id: PositionId, rating: Rating, paygrade: Paygrade, location: impl Into<String>) -> Self {
        Self {
            id,
            rating,
            paygrade,
            location: location.into(),
            billet_type: None,
            title: None,
            occupant: None,
        }
    }

    /// No one holds this position.
    pub fn is_vacant(&self) -> bool {
        self.occupant.is_none()
    }

    /// Whether the person satisfies the rating and paygrade requirement.
    pub fn accepts(&self, person: &Person) -> bool {
        person.rating == self.rating && person.paygrade == self.paygrade
    }
}

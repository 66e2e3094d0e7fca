//! Seeded synthetic datasets.
//!
//! Positions are drawn from fixed rating and paygrade weight tables. People
//! are either drawn free-standing from the same tables, seated one per
//! position, or drawn toward the demand a position dataset describes.
//! A given seed always yields the same records.

use rand::distributions::{WeightedError, WeightedIndex};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;
use torso_core::{Paygrade, Person, PersonId, Position, PositionId, Rating, Status, ValidationError};

/// Share of billets per rating, in percent.
pub const RATING_WEIGHTS: [(&str, u32); 15] = [
    ("HM", 28),
    ("MA", 17),
    ("MM", 10),
    ("YN", 10),
    ("OS", 6),
    ("CWT", 3),
    ("EMN", 4),
    ("IS", 4),
    ("PS", 2),
    ("EN", 1),
    ("CS", 5),
    ("AO", 3),
    ("PR", 2),
    ("AT", 2),
    ("STG", 3),
];

/// Share of billets per paygrade level, in percent.
pub const PAYGRADE_WEIGHTS: [(u8, u32); 7] = [(3, 35), (4, 30), (5, 18), (6, 10), (7, 4), (8, 2), (9, 1)];

const TITLES: [(&str, &str); 15] = [
    ("HM", "Hospital Corpsman"),
    ("MA", "Master-at-Arms"),
    ("MM", "Machinist's Mate"),
    ("YN", "Yeoman"),
    ("OS", "Operations Specialist"),
    ("CWT", "Cyber Warfare Technician"),
    ("EMN", "Electrician's Mate (Nuclear)"),
    ("IS", "Intelligence Specialist"),
    ("PS", "Personnel Specialist"),
    ("EN", "Engineman"),
    ("CS", "Culinary Specialist"),
    ("AO", "Aviation Ordnanceman"),
    ("PR", "Aircrew Survival Equipmentman"),
    ("AT", "Aviation Electronics Technician"),
    ("STG", "Sonar Technician (Surface)"),
];

const GIVEN_NAMES: [&str; 16] = [
    "Alex", "Jordan", "Casey", "Morgan", "Riley", "Taylor", "Jamie", "Avery", "Quinn", "Rowan",
    "Skyler", "Drew", "Reese", "Emerson", "Hayden", "Parker",
];

const FAMILY_NAMES: [&str; 16] = [
    "Nguyen", "Garcia", "Smith", "Okafor", "Kowalski", "Johnson", "Silva", "Brown", "Haddad",
    "Martinez", "Williams", "Chen", "Davis", "Patel", "Lopez", "Miller",
];

/// Plausible time in service (ticks) for someone holding each paygrade.
fn service_range(grade: Paygrade) -> std::ops::Range<u32> {
    match grade.level() {
        1 | 2 => 0..12,
        3 => 6..48,
        4 => 24..84,
        5 => 48..150,
        6 => 96..220,
        7 => 150..270,
        8 => 200..300,
        _ => 240..340,
    }
}

/// Invalid generator input.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("weight table rejected: {0}")]
    Weights(#[from] WeightedError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("filled percentage must be within 0-100, got {0}")]
    FilledPct(u32),
    #[error("reference position dataset is empty")]
    NoPositions,
    #[error("cannot issue {0} unique eight-digit ids")]
    TooMany(usize),
}

const ID_MIN: u32 = 10_000_000;
const ID_MAX: u32 = 99_999_999;
const ID_SPACE: usize = (ID_MAX - ID_MIN + 1) as usize;

/// Seeded record generator. Ids are unique across everything one instance issues.
#[derive(Debug)]
pub struct Synth {
    rng: ChaCha8Rng,
    ratings: WeightedIndex<u32>,
    grades: WeightedIndex<u32>,
    position_ids: BTreeSet<u32>,
    person_ids: BTreeSet<u32>,
}

impl Synth {
    /// Generator seeded with `seed`.
    pub fn new(seed: u64) -> Result<Self, GenerateError> {
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            ratings: WeightedIndex::new(RATING_WEIGHTS.iter().map(|(_, w)| *w))?,
            grades: WeightedIndex::new(PAYGRADE_WEIGHTS.iter().map(|(_, w)| *w))?,
            position_ids: BTreeSet::new(),
            person_ids: BTreeSet::new(),
        })
    }

    fn unique_id(rng: &mut ChaCha8Rng, issued: &mut BTreeSet<u32>) -> u32 {
        loop {
            let n = rng.gen_range(ID_MIN..=ID_MAX);
            if issued.insert(n) {
                return n;
            }
        }
    }

    fn reserve(issued: &BTreeSet<u32>, count: usize) -> Result<(), GenerateError> {
        if issued.len().saturating_add(count) > ID_SPACE {
            return Err(GenerateError::TooMany(count));
        }
        Ok(())
    }

    fn draw_rating(&mut self) -> Result<Rating, GenerateError> {
        let (code, _) = RATING_WEIGHTS[self.ratings.sample(&mut self.rng)];
        Ok(Rating::parse(code)?)
    }

    fn draw_paygrade(&mut self) -> Result<Paygrade, GenerateError> {
        let (level, _) = PAYGRADE_WEIGHTS[self.grades.sample(&mut self.rng)];
        Ok(Paygrade::new(level)?)
    }

    fn location(&mut self) -> String {
        const LAST: &[u8] = b"0123456789A";
        let digits: u32 = self.rng.gen_range(0..10_000);
        let last = LAST[self.rng.gen_range(0..LAST.len())] as char;
        format!("N{digits:04}{last}")
    }

    /// `count` positions drawn from the rating and paygrade tables.
    pub fn positions(&mut self, count: usize) -> Result<Vec<Position>, GenerateError> {
        Self::reserve(&self.position_ids, count)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let bin = Self::unique_id(&mut self.rng, &mut self.position_ids);
            let location = self.location();
            let billet_type = if self.rng.gen_bool(0.5) { "SEA" } else { "SHR" };
            let rating = self.draw_rating()?;
            let paygrade = self.draw_paygrade()?;
            let title = TITLES
                .iter()
                .find(|(code, _)| *code == rating.as_str())
                .map(|(_, t)| (*t).to_string());
            let mut pos = Position::new(PositionId(format!("B{bin}")), rating, paygrade, location);
            pos.billet_type = Some(billet_type.to_string());
            pos.title = title;
            out.push(pos);
        }
        debug!(count, "generated positions");
        Ok(out)
    }

    /// An unassigned person with a history that fits the paygrade.
    fn person(&mut self, rating: Rating, paygrade: Paygrade) -> Person {
        let id = Self::unique_id(&mut self.rng, &mut self.person_ids);
        let performance = Decimal::new(self.rng.gen_range(200..=500), 2);
        let mut p = Person::new(PersonId(u64::from(id)), rating, paygrade, performance);
        p.time_in_service = self.rng.gen_range(service_range(paygrade));
        p.time_in_grade = self.rng.gen_range(0..=p.time_in_service.min(48));
        let given = GIVEN_NAMES[self.rng.gen_range(0..GIVEN_NAMES.len())];
        let family = FAMILY_NAMES[self.rng.gen_range(0..FAMILY_NAMES.len())];
        p.name = Some(format!("{given} {family}"));
        p
    }

    /// `count` unassigned people drawn from the rating and paygrade tables.
    pub fn people(&mut self, count: usize) -> Result<Vec<Person>, GenerateError> {
        Self::reserve(&self.person_ids, count)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let rating = self.draw_rating()?;
            let paygrade = self.draw_paygrade()?;
            out.push(self.person(rating, paygrade));
        }
        debug!(count, "generated free-standing personnel");
        Ok(out)
    }

    /// Seat one person in each position with probability `filled_pct`/100.
    pub fn staff(&mut self, positions: &[Position], filled_pct: u32) -> Result<Vec<Person>, GenerateError> {
        if filled_pct > 100 {
            return Err(GenerateError::FilledPct(filled_pct));
        }
        Self::reserve(&self.person_ids, positions.len())?;
        let mut out = Vec::new();
        for pos in positions {
            if filled_pct < 100 && self.rng.gen_range(0..100) >= filled_pct {
                continue;
            }
            let mut p = self.person(pos.rating.clone(), pos.paygrade);
            p.status = Status::Assigned;
            p.position = Some(pos.id.clone());
            p.tour_ticks = self.rng.gen_range(0..36).min(p.time_in_service);
            out.push(p);
        }
        debug!(positions = positions.len(), seated = out.len(), "staffed positions");
        Ok(out)
    }

    /// `count` unassigned people whose rating and paygrade follow the position mix.
    pub fn toward_demand(&mut self, positions: &[Position], count: usize) -> Result<Vec<Person>, GenerateError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(last) = positions.len().checked_sub(1) else {
            return Err(GenerateError::NoPositions);
        };
        Self::reserve(&self.person_ids, count)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let pos = &positions[self.rng.gen_range(0..=last)];
            out.push(self.person(pos.rating.clone(), pos.paygrade));
        }
        debug!(count, "generated personnel toward demand");
        Ok(out)
    }
}

//! The population ledger: sole owner of every person and position.
//!
//! Engines read through the query methods and write only through the
//! mutation primitives, each of which keeps the person/position pairing
//! consistent on both sides in a single call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::trace;

use crate::{
    LedgerError, Paygrade, Person, PersonId, Position, PositionId, Rating, Status,
    ValidationError,
};

/// People, positions and the current tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    tick: u32,
    people: BTreeMap<PersonId, Person>,
    positions: BTreeMap<PositionId, Position>,
    next_person_id: u64,
}

impl Ledger {
    /// Build a ledger from loaded records.
    ///
    /// Occupancy is derived from each person's position reference; any
    /// occupant already set on an incoming position is discarded first.
    pub fn new(positions: Vec<Position>, people: Vec<Person>) -> Result<Self, ValidationError> {
        let mut by_id: BTreeMap<PositionId, Position> = BTreeMap::new();
        for mut pos in positions {
            pos.occupant = None;
            match by_id.entry(pos.id.clone()) {
                Entry::Occupied(e) => return Err(ValidationError::DuplicatePosition(e.key().clone())),
                Entry::Vacant(e) => {
                    e.insert(pos);
                }
            }
        }

        let mut roster: BTreeMap<PersonId, Person> = BTreeMap::new();
        for person in people {
            person.validate()?;
            if let Some(pid) = &person.position {
                let pos = by_id.get_mut(pid).ok_or_else(|| ValidationError::UnknownPosition {
                    person: person.id,
                    position: pid.clone(),
                })?;
                if let Some(first) = pos.occupant {
                    return Err(ValidationError::DoubleBooked {
                        position: pid.clone(),
                        first,
                        second: person.id,
                    });
                }
                if !pos.accepts(&person) {
                    return Err(ValidationError::RequirementMismatch {
                        person: person.id,
                        position: pid.clone(),
                    });
                }
                pos.occupant = Some(person.id);
            }
            match roster.entry(person.id) {
                Entry::Occupied(e) => return Err(ValidationError::DuplicatePerson(*e.key())),
                Entry::Vacant(e) => {
                    e.insert(person);
                }
            }
        }

        let next_person_id = match roster.keys().next_back() {
            Some(last) => last
                .0
                .checked_add(1)
                .ok_or(ValidationError::IdSpaceExhausted(*last))?,
            None => 1,
        };
        let ledger = Self {
            tick: 0,
            people: roster,
            positions: by_id,
            next_person_id,
        };
        ledger.check_invariants()?;
        Ok(ledger)
    }

    /// Current tick index (0 before the first tick runs).
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Every person ever loaded or accessed, terminal ones included, in id order.
    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    /// People still in service, in id order.
    pub fn active(&self) -> impl Iterator<Item = &Person> {
        self.people.values().filter(|p| p.status.is_active())
    }

    /// Every position, in id order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Look up a person.
    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    /// Look up a position.
    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    /// Number of people in service.
    pub fn roster_size(&self) -> usize {
        self.active().count()
    }

    /// Number of people in the given status.
    pub fn count_status(&self, status: Status) -> usize {
        self.people.values().filter(|p| p.status == status).count()
    }

    /// Vacant positions, in id order.
    pub fn vacant_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| p.is_vacant())
    }

    /// Vacant positions requiring this rating and paygrade.
    pub fn vacancies(&self, rating: &Rating, paygrade: Paygrade) -> usize {
        self.vacant_positions()
            .filter(|p| &p.rating == rating && p.paygrade == paygrade)
            .count()
    }

    /// Move to the next tick and age everyone in service by one tick.
    pub fn advance_tick(&mut self) {
        self.tick = self.tick.saturating_add(1);
        for p in self.people.values_mut().filter(|p| p.status.is_active()) {
            p.time_in_service = p.time_in_service.saturating_add(1);
            p.time_in_grade = p.time_in_grade.saturating_add(1);
            if p.position.is_some() {
                p.tour_ticks = p.tour_ticks.saturating_add(1);
            }
        }
    }

    /// Create a new person in training at the given paygrade.
    pub fn admit(
        &mut self,
        rating: Rating,
        paygrade: Paygrade,
        performance: Decimal,
    ) -> Result<PersonId, LedgerError> {
        let id = PersonId(self.next_person_id);
        self.next_person_id = self
            .next_person_id
            .checked_add(1)
            .ok_or(LedgerError::IdsExhausted)?;
        let mut person = Person::new(id, rating, paygrade, performance);
        person.status = Status::InTraining;
        trace!(person = %id, tick = self.tick, "admitted");
        self.people.insert(id, person);
        Ok(id)
    }

    /// Move a trainee into the assignable pool.
    pub fn graduate(&mut self, id: PersonId) -> Result<(), LedgerError> {
        let person = self.people.get_mut(&id).ok_or(LedgerError::UnknownPerson(id))?;
        if person.status != Status::InTraining {
            return Err(LedgerError::InvalidTransition {
                person: id,
                status: person.status,
            });
        }
        person.status = Status::Assignable;
        Ok(())
    }

    /// Advance a person one paygrade and reset their time in grade.
    pub fn promote(&mut self, id: PersonId) -> Result<Paygrade, LedgerError> {
        let person = self.people.get_mut(&id).ok_or(LedgerError::UnknownPerson(id))?;
        if !matches!(person.status, Status::Assignable | Status::Assigned) {
            return Err(LedgerError::InvalidTransition {
                person: id,
                status: person.status,
            });
        }
        let next = person.paygrade.next().ok_or(LedgerError::AtMaximumGrade(id))?;
        person.paygrade = next;
        person.time_in_grade = 0;
        Ok(next)
    }

    /// Put an unassigned person into a vacant position they qualify for.
    pub fn assign(&mut self, person_id: PersonId, position_id: &PositionId) -> Result<(), LedgerError> {
        let person = self
            .people
            .get_mut(&person_id)
            .ok_or(LedgerError::UnknownPerson(person_id))?;
        let position = self
            .positions
            .get_mut(position_id)
            .ok_or_else(|| LedgerError::UnknownPosition(position_id.clone()))?;
        if !person.is_unassigned() {
            return Err(LedgerError::InvalidTransition {
                person: person_id,
                status: person.status,
            });
        }
        if let Some(occupant) = position.occupant {
            return Err(LedgerError::PositionOccupied {
                position: position_id.clone(),
                occupant,
            });
        }
        if !position.accepts(person) {
            return Err(LedgerError::RequirementMismatch {
                person: person_id,
                position: position_id.clone(),
            });
        }
        position.occupant = Some(person_id);
        person.position = Some(position_id.clone());
        person.status = Status::Assigned;
        person.tour_ticks = 0;
        Ok(())
    }

    /// Release an assigned person from their position back into the assignable pool.
    pub fn detach(&mut self, person_id: PersonId) -> Result<PositionId, LedgerError> {
        let person = self
            .people
            .get_mut(&person_id)
            .ok_or(LedgerError::UnknownPerson(person_id))?;
        let held = match (&person.position, person.status) {
            (Some(pid), Status::Assigned) => pid.clone(),
            _ => {
                return Err(LedgerError::InvalidTransition {
                    person: person_id,
                    status: person.status,
                })
            }
        };
        let position = self
            .positions
            .get_mut(&held)
            .ok_or_else(|| LedgerError::UnknownPosition(held.clone()))?;
        position.occupant = None;
        person.position = None;
        person.status = Status::Assignable;
        person.tour_ticks = 0;
        person.last_position = Some(held.clone());
        Ok(held)
    }

    /// Move a person into a terminal status, vacating any position they hold.
    pub fn discharge(&mut self, person_id: PersonId, status: Status) -> Result<(), LedgerError> {
        if !status.is_terminal() {
            return Err(LedgerError::NotTerminal(status));
        }
        let tick = self.tick;
        let person = self
            .people
            .get_mut(&person_id)
            .ok_or(LedgerError::UnknownPerson(person_id))?;
        if person.status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                person: person_id,
                status: person.status,
            });
        }
        if let Some(held) = person.position.take() {
            let position = self
                .positions
                .get_mut(&held)
                .ok_or_else(|| LedgerError::UnknownPosition(held.clone()))?;
            position.occupant = None;
            person.last_position = Some(held);
        }
        person.status = status;
        person.exit_tick = Some(tick);
        Ok(())
    }

    /// Verify the pairing between people and positions and the per-person invariants.
    pub fn check_invariants(&self) -> Result<(), ValidationError> {
        for person in self.people.values() {
            person.validate()?;
            if let Some(pid) = &person.position {
                let pos = self
                    .positions
                    .get(pid)
                    .ok_or_else(|| ValidationError::UnknownPosition {
                        person: person.id,
                        position: pid.clone(),
                    })?;
                if pos.occupant != Some(person.id) {
                    return Err(ValidationError::StatusMismatch(person.id, person.status));
                }
                if !pos.accepts(person) {
                    return Err(ValidationError::RequirementMismatch {
                        person: person.id,
                        position: pid.clone(),
                    });
                }
            }
        }
        for pos in self.positions.values() {
            if let Some(occupant) = pos.occupant {
                let holds = self
                    .people
                    .get(&occupant)
                    .and_then(|p| p.position.as_ref())
                    .is_some_and(|held| held == &pos.id);
                if !holds {
                    return Err(ValidationError::BrokenPairing {
                        position: pos.id.clone(),
                        person: occupant,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rating(code: &str) -> Rating {
        Rating::parse(code).unwrap()
    }

    fn grade(level: u8) -> Paygrade {
        Paygrade::new(level).unwrap()
    }

    fn billet(id: &str, level: u8) -> Position {
        Position::new(PositionId(id.to_string()), rating("HM"), grade(level), "N00001")
    }

    fn sailor(id: u64, level: u8) -> Person {
        Person::new(PersonId(id), rating("HM"), grade(level), Decimal::new(350, 2))
    }

    #[test]
    fn load_derives_occupancy_from_people() {
        let mut p = sailor(7, 3);
        p.status = Status::Assigned;
        p.position = Some(PositionId("B1".into()));
        let ledger = Ledger::new(vec![billet("B1", 3), billet("B2", 3)], vec![p]).unwrap();
        assert_eq!(ledger.position(&PositionId("B1".into())).unwrap().occupant, Some(PersonId(7)));
        assert_eq!(ledger.vacancies(&rating("HM"), grade(3)), 1);
    }

    #[test]
    fn load_rejects_double_booking_and_mismatch() {
        let mut a = sailor(1, 3);
        a.status = Status::Assigned;
        a.position = Some(PositionId("B1".into()));
        let mut b = a.clone();
        b.id = PersonId(2);
        let err = Ledger::new(vec![billet("B1", 3)], vec![a.clone(), b]).unwrap_err();
        assert!(matches!(err, ValidationError::DoubleBooked { .. }));

        let err = Ledger::new(vec![billet("B1", 4)], vec![a]).unwrap_err();
        assert!(matches!(err, ValidationError::RequirementMismatch { .. }));
    }

    #[test]
    fn load_rejects_duplicates_and_dangling_refs() {
        let err = Ledger::new(vec![billet("B1", 3), billet("B1", 4)], vec![]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicatePosition(_)));

        let err = Ledger::new(vec![], vec![sailor(1, 3), sailor(1, 4)]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicatePerson(_)));

        let mut p = sailor(1, 3);
        p.status = Status::Assigned;
        p.position = Some(PositionId("B9".into()));
        let err = Ledger::new(vec![], vec![p]).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownPosition { .. }));
    }

    #[test]
    fn assign_and_detach_update_both_sides() {
        let mut ledger = Ledger::new(vec![billet("B1", 3)], vec![sailor(1, 3), sailor(2, 3)]).unwrap();
        let b1 = PositionId("B1".into());
        ledger.assign(PersonId(1), &b1).unwrap();
        assert_eq!(ledger.person(PersonId(1)).unwrap().status, Status::Assigned);
        assert!(matches!(
            ledger.assign(PersonId(2), &b1),
            Err(LedgerError::PositionOccupied { .. })
        ));
        ledger.check_invariants().unwrap();

        let released = ledger.detach(PersonId(1)).unwrap();
        assert_eq!(released, b1);
        let p = ledger.person(PersonId(1)).unwrap();
        assert!(p.is_unassigned());
        assert_eq!(p.last_position, Some(b1.clone()));
        assert!(ledger.position(&b1).unwrap().is_vacant());
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn assign_rejects_wrong_grade_and_trainees() {
        let mut ledger = Ledger::new(vec![billet("B1", 4)], vec![sailor(1, 3)]).unwrap();
        let b1 = PositionId("B1".into());
        assert!(matches!(
            ledger.assign(PersonId(1), &b1),
            Err(LedgerError::RequirementMismatch { .. })
        ));
        let id = ledger.admit(rating("HM"), grade(4), Decimal::new(4, 0)).unwrap();
        assert!(matches!(
            ledger.assign(id, &b1),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn discharge_vacates_and_freezes() {
        let mut ledger = Ledger::new(vec![billet("B1", 3)], vec![sailor(1, 3)]).unwrap();
        let b1 = PositionId("B1".into());
        ledger.assign(PersonId(1), &b1).unwrap();
        ledger.advance_tick();
        ledger.discharge(PersonId(1), Status::Retired).unwrap();
        let p = ledger.person(PersonId(1)).unwrap();
        assert_eq!(p.exit_tick, Some(1));
        assert!(p.position.is_none());
        assert!(ledger.position(&b1).unwrap().is_vacant());

        let before = p.time_in_service;
        ledger.advance_tick();
        assert_eq!(ledger.person(PersonId(1)).unwrap().time_in_service, before);
        assert!(ledger.discharge(PersonId(1), Status::Separated).is_err());
        assert!(matches!(
            ledger.discharge(PersonId(1), Status::Assigned),
            Err(LedgerError::NotTerminal(_))
        ));
        assert_eq!(ledger.roster_size(), 0);
    }

    #[test]
    fn admit_allocates_fresh_ids() {
        let mut ledger = Ledger::new(vec![], vec![sailor(41, 3)]).unwrap();
        let a = ledger.admit(rating("HM"), grade(3), Decimal::new(3, 0)).unwrap();
        let b = ledger.admit(rating("HM"), grade(3), Decimal::new(3, 0)).unwrap();
        assert_eq!(a, PersonId(42));
        assert_eq!(b, PersonId(43));
        assert_eq!(ledger.person(a).unwrap().status, Status::InTraining);
        assert!(ledger.graduate(a).is_ok());
        assert!(ledger.graduate(a).is_err());
    }

    #[test]
    fn highest_id_must_leave_room_for_admissions() {
        let err = Ledger::new(vec![], vec![sailor(u64::MAX, 3)]).unwrap_err();
        assert_eq!(err, ValidationError::IdSpaceExhausted(PersonId(u64::MAX)));

        let mut ledger = Ledger::new(vec![], vec![sailor(u64::MAX - 1, 3)]).unwrap();
        assert!(matches!(
            ledger.admit(rating("HM"), grade(3), Decimal::new(3, 0)),
            Err(LedgerError::IdsExhausted)
        ));
        assert_eq!(ledger.people().count(), 1);
    }

    #[test]
    fn promote_resets_time_in_grade() {
        let mut p = sailor(1, 8);
        p.time_in_service = 100;
        p.time_in_grade = 30;
        let mut ledger = Ledger::new(vec![], vec![p]).unwrap();
        assert_eq!(ledger.promote(PersonId(1)).unwrap(), Paygrade::MAX);
        assert_eq!(ledger.person(PersonId(1)).unwrap().time_in_grade, 0);
        assert!(matches!(
            ledger.promote(PersonId(1)),
            Err(LedgerError::AtMaximumGrade(_))
        ));
    }

    proptest! {
        #[test]
        fn ageing_keeps_grade_within_service(tis in 0u32..500, gap in 0u32..500, ticks in 0usize..50) {
            let mut p = sailor(1, 3);
            p.time_in_service = tis.saturating_add(gap);
            p.time_in_grade = tis;
            let mut ledger = Ledger::new(vec![], vec![p]).unwrap();
            for _ in 0..ticks {
                ledger.advance_tick();
            }
            let p = ledger.person(PersonId(1)).unwrap();
            prop_assert!(p.time_in_grade <= p.time_in_service);
            prop_assert_eq!(p.time_in_service - p.time_in_grade, gap);
            prop_assert!(ledger.check_invariants().is_ok());
        }
    }
}

//! Distribution: release misfits, match the assignable pool to vacancies,
//! then move rotators into whatever their bucket still has open.
//!
//! Vacancies and candidates are bucketed by (rating, paygrade). Within a
//! bucket candidates are served by seniority and take vacancies in position
//! id order, so a run is fully determined by the ledger contents.

use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace};
use torso_core::{Ledger, LedgerError, Paygrade, Person, PersonId, Policy, PositionId, Rating};

/// What the distribution pass did this tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    /// People released from their position to be moved.
    pub detachments: u32,
    /// New person/position pairings made.
    pub assignments: u32,
    /// Vacancies left open after matching.
    pub unfilled_vacancies: u32,
    /// Assignable people left without a position after matching.
    pub unassigned: u32,
}

/// Why an assigned person is ready to leave their position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Departure {
    /// No longer fits the position, typically after a promotion.
    Misfit,
    /// Reached the rotation tour length.
    Rotation,
}

#[derive(Clone, Debug)]
struct Candidate {
    id: PersonId,
    time_in_service: u32,
    performance: Decimal,
}

impl Candidate {
    fn of(person: &Person) -> Self {
        Self {
            id: person.id,
            time_in_service: person.time_in_service,
            performance: person.performance,
        }
    }
}

/// Longer service first, then higher performance, then lower id.
fn by_seniority(a: &Candidate, b: &Candidate) -> Ordering {
    b.time_in_service
        .cmp(&a.time_in_service)
        .then_with(|| b.performance.cmp(&a.performance))
        .then_with(|| a.id.cmp(&b.id))
}

type Buckets<T> = BTreeMap<(Rating, Paygrade), Vec<T>>;

fn pooled<'a>(people: impl Iterator<Item = &'a Person>) -> Buckets<Candidate> {
    let mut pools: Buckets<Candidate> = BTreeMap::new();
    for person in people {
        pools
            .entry((person.rating.clone(), person.paygrade))
            .or_default()
            .push(Candidate::of(person));
    }
    for candidates in pools.values_mut() {
        candidates.sort_by(by_seniority);
    }
    pools
}

/// Whether an assigned person is ready to leave their position this tick.
///
/// Nobody moves before the minimum tour. After that a misfit is released
/// outright, while a rotator only moves once a different billet is open.
pub fn departure(ledger: &Ledger, person: &Person, policy: &Policy) -> Option<Departure> {
    let held = person.position.as_ref()?;
    if person.tour_ticks < policy.min_tour_length {
        return None;
    }
    if ledger.position(held).map_or(true, |pos| !pos.accepts(person)) {
        Some(Departure::Misfit)
    } else if person.tour_ticks >= policy.rotation_tour_length {
        Some(Departure::Rotation)
    } else {
        None
    }
}

/// Run detachment and matching for this tick.
///
/// The assignable pool is served before rotators, so a rotator never takes
/// a billet someone waiting without one could have filled.
pub fn run_distribution(ledger: &mut Ledger, policy: &Policy) -> Result<DistributionReport, LedgerError> {
    let mut report = DistributionReport::default();

    let view: &Ledger = ledger;
    let misfits: Vec<PersonId> = view
        .active()
        .filter(|p| departure(view, p, policy) == Some(Departure::Misfit))
        .map(|p| p.id)
        .collect();
    for id in misfits {
        let from = ledger.detach(id)?;
        trace!(person = %id, position = %from, "detached misfit");
        report.detachments += 1;
    }

    let mut vacancies: Buckets<PositionId> = BTreeMap::new();
    for pos in ledger.vacant_positions() {
        vacancies
            .entry((pos.rating.clone(), pos.paygrade))
            .or_default()
            .push(pos.id.clone());
    }

    let view: &Ledger = ledger;
    let waiting = pooled(view.active().filter(|p| p.is_unassigned()));
    let rotators = pooled(
        view.active()
            .filter(|p| departure(view, p, policy) == Some(Departure::Rotation)),
    );

    for (key, candidates) in waiting {
        let Some(open) = vacancies.get_mut(&key) else {
            continue;
        };
        for c in candidates {
            if open.is_empty() {
                break;
            }
            let position = open.remove(0);
            ledger.assign(c.id, &position)?;
            trace!(person = %c.id, position = %position, "assigned");
            report.assignments += 1;
        }
    }

    // A rotator's own billet is occupied, so anything still open is elsewhere.
    for (key, candidates) in rotators {
        let Some(open) = vacancies.get_mut(&key) else {
            continue;
        };
        for c in candidates {
            if open.is_empty() {
                break;
            }
            let position = open.remove(0);
            let from = ledger.detach(c.id)?;
            ledger.assign(c.id, &position)?;
            trace!(person = %c.id, from = %from, to = %position, "rotated");
            report.detachments += 1;
            report.assignments += 1;
        }
    }

    report.unfilled_vacancies = ledger.vacant_positions().count() as u32;
    report.unassigned = ledger.active().filter(|p| p.is_unassigned()).count() as u32;
    debug!(tick = ledger.tick(), ?report, "distribution pass");
    Ok(report)
}

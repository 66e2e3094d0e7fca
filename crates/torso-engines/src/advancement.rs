//! Advancement: promotion against the vacancy budget at the next paygrade.

use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace};
use torso_core::{Ledger, LedgerError, Paygrade, Person, PersonId, Policy, Rating, Status};

/// What the advancement pass did this tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdvancementReport {
    /// People promoted this tick.
    pub promotions: u32,
    /// Eligible people held back by the budget.
    pub deferred: u32,
}

#[derive(Clone, Debug)]
struct Candidate {
    id: PersonId,
    performance: Decimal,
    time_in_grade: u32,
}

/// Higher performance first, then longer time in grade, then lower id.
fn by_merit(a: &Candidate, b: &Candidate) -> Ordering {
    b.performance
        .cmp(&a.performance)
        .then_with(|| b.time_in_grade.cmp(&a.time_in_grade))
        .then_with(|| a.id.cmp(&b.id))
}

/// Whether a person meets every individual promotion requirement.
///
/// The vacancy budget is applied separately per (rating, next paygrade) pool.
pub fn is_eligible(person: &Person, policy: &Policy) -> bool {
    let seated_long_enough = match person.status {
        Status::Assignable => true,
        Status::Assigned => person.tour_ticks >= policy.min_tour_length,
        _ => false,
    };
    seated_long_enough
        && person.paygrade < policy.max_paygrade
        && person.time_in_grade >= policy.min_time_in_grade.for_grade(person.paygrade)
        && person.performance >= policy.promotion_cutoff
}

/// Promote the top of each eligible pool, up to the pool's vacancy budget.
pub fn run_advancement(ledger: &mut Ledger, policy: &Policy) -> Result<AdvancementReport, LedgerError> {
    let mut pools: BTreeMap<(Rating, Paygrade), Vec<Candidate>> = BTreeMap::new();
    for person in ledger.active().filter(|p| is_eligible(p, policy)) {
        let Some(next) = person.paygrade.next() else {
            continue;
        };
        pools
            .entry((person.rating.clone(), next))
            .or_default()
            .push(Candidate {
                id: person.id,
                performance: person.performance,
                time_in_grade: person.time_in_grade,
            });
    }

    let budgets: BTreeMap<(Rating, Paygrade), usize> = pools
        .keys()
        .map(|(rating, next)| {
            let vacant = ledger.vacancies(rating, *next) as f64;
            let budget = (vacant * policy.promotion_multiplier).floor() as usize;
            ((rating.clone(), *next), budget)
        })
        .collect();

    let mut report = AdvancementReport::default();
    for (key, mut candidates) in pools {
        candidates.sort_by(by_merit);
        let budget = budgets.get(&key).copied().unwrap_or(0).min(candidates.len());
        for c in &candidates[..budget] {
            ledger.promote(c.id)?;
            trace!(person = %c.id, rating = %key.0, to = %key.1, "promoted");
        }
        report.promotions += budget as u32;
        report.deferred += (candidates.len() - budget) as u32;
    }

    debug!(tick = ledger.tick(), ?report, "advancement pass");
    Ok(report)
}

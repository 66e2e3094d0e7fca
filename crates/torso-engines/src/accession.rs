//! Accession: training pipeline and recruiting against entry-level demand.

use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use torso_core::{Ledger, LedgerError, PersonId, Policy, Rating, Status};

use crate::separation::voluntary_attrition_probability;

/// What the accession pass did this tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccessionReport {
    /// Recruiting goal before the intake cap.
    pub goal: u32,
    /// People created this tick.
    pub accessions: u32,
    /// Trainees moved to the assignable pool.
    pub graduations: u32,
}

/// Recruiting goal per rating at the entry paygrade.
///
/// Unmet demand is entry-grade positions minus entry-grade people in service
/// (trainees included); the projected attrition of those people over the
/// training lag is then subtracted. Ratings with no entry-grade positions
/// have no goal.
pub fn recruiting_goals(ledger: &Ledger, policy: &Policy) -> BTreeMap<Rating, u32> {
    let entry = policy.entry_paygrade;
    let horizon = f64::from(policy.training_lag.max(1));

    let mut billets: BTreeMap<&Rating, i64> = BTreeMap::new();
    for pos in ledger.positions().filter(|p| p.paygrade == entry) {
        *billets.entry(&pos.rating).or_default() += 1;
    }

    let mut inventory: BTreeMap<&Rating, (i64, f64)> = BTreeMap::new();
    for person in ledger.active().filter(|p| p.paygrade == entry) {
        let slot = inventory.entry(&person.rating).or_default();
        slot.0 += 1;
        slot.1 += voluntary_attrition_probability(person, policy);
    }

    billets
        .into_iter()
        .map(|(rating, demand)| {
            let (on_hand, risk) = inventory.get(rating).copied().unwrap_or_default();
            let unmet = demand - on_hand;
            let projected_attrition = (risk * horizon).round() as i64;
            let goal = (unmet - projected_attrition).max(0);
            (rating.clone(), u32::try_from(goal).unwrap_or(u32::MAX))
        })
        .collect()
}

/// Spread at most `cap` intake slots over the goals.
///
/// Ratings are served one slot at a time in descending goal order (ties by
/// rating code) so that a large rating cannot starve the rest.
pub fn allocate_intake(goals: &BTreeMap<Rating, u32>, cap: u32) -> Vec<(Rating, u32)> {
    let mut order: Vec<(&Rating, u32)> = goals
        .iter()
        .filter(|(_, g)| **g > 0)
        .map(|(r, g)| (r, *g))
        .collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut plan = vec![0u32; order.len()];
    let mut remaining = cap;
    while remaining > 0 {
        let mut progressed = false;
        for (slot, (_, goal)) in plan.iter_mut().zip(&order) {
            if remaining == 0 {
                break;
            }
            if *slot < *goal {
                *slot += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    order
        .into_iter()
        .zip(plan)
        .filter(|(_, n)| *n > 0)
        .map(|((r, _), n)| (r.clone(), n))
        .collect()
}

/// Performance score of a new recruit, uniform over [2.00, 5.00].
fn draw_recruit_performance<R: Rng + ?Sized>(rng: &mut R) -> Decimal {
    Decimal::new(rng.gen_range(200..=500), 2)
}

/// Graduate trainees whose lag has elapsed, then recruit this tick's intake.
pub fn run_accession<R: Rng + ?Sized>(
    ledger: &mut Ledger,
    policy: &Policy,
    rng: &mut R,
) -> Result<AccessionReport, LedgerError> {
    let ready: Vec<PersonId> = ledger
        .active()
        .filter(|p| p.status == Status::InTraining && p.time_in_service >= policy.training_lag)
        .map(|p| p.id)
        .collect();
    for id in &ready {
        ledger.graduate(*id)?;
    }

    let goals = recruiting_goals(ledger, policy);
    let goal = goals.values().fold(0u32, |acc, g| acc.saturating_add(*g));
    let mut accessions = 0u32;
    for (rating, count) in allocate_intake(&goals, policy.intake_cap) {
        for _ in 0..count {
            let performance = draw_recruit_performance(rng);
            ledger.admit(rating.clone(), policy.entry_paygrade, performance)?;
            accessions += 1;
        }
    }

    let report = AccessionReport {
        goal,
        accessions,
        graduations: ready.len() as u32,
    };
    debug!(tick = ledger.tick(), ?report, "accession pass");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use torso_core::PERFORMANCE_MAX;

    fn quiet_policy() -> Policy {
        Policy {
            voluntary_attrition_rate: 0.0,
            ..Policy::default()
        }
    }

    #[test]
    fn goal_is_entry_billets_minus_inventory() {
        let positions = (0..5).map(|i| billet(&format!("B{i}"), "HM", 3)).collect();
        let people = vec![sailor(1, "HM", 3, 350), sailor(2, "HM", 4, 350)];
        let ledger = Ledger::new(positions, people).unwrap();
        let goals = recruiting_goals(&ledger, &quiet_policy());
        assert_eq!(goals.get(&rating("HM")), Some(&4));
    }

    #[test]
    fn projected_attrition_reduces_goal() {
        let positions = (0..10).map(|i| billet(&format!("B{i}"), "HM", 3)).collect();
        let people = (1..=5).map(|i| sailor(i, "HM", 3, 0)).collect();
        let ledger = Ledger::new(positions, people).unwrap();
        let policy = Policy {
            voluntary_attrition_rate: 0.1,
            training_lag: 2,
            ..Policy::default()
        };
        // five people at 0.2 each over two ticks
        let goals = recruiting_goals(&ledger, &policy);
        assert_eq!(goals.get(&rating("HM")), Some(&3));
    }

    #[test]
    fn surplus_inventory_means_no_goal() {
        let positions = vec![billet("B1", "HM", 3)];
        let people = vec![sailor(1, "HM", 3, 350), sailor(2, "HM", 3, 350)];
        let ledger = Ledger::new(positions, people).unwrap();
        assert_eq!(recruiting_goals(&ledger, &quiet_policy()).get(&rating("HM")), Some(&0));
    }

    #[test]
    fn intake_cap_is_shared_round_robin() {
        let goals = BTreeMap::from([(rating("HM"), 10), (rating("MA"), 2), (rating("YN"), 0)]);
        let plan = allocate_intake(&goals, 5);
        assert_eq!(plan, vec![(rating("HM"), 3), (rating("MA"), 2)]);
        let plan = allocate_intake(&goals, 100);
        assert_eq!(plan, vec![(rating("HM"), 10), (rating("MA"), 2)]);
        assert!(allocate_intake(&goals, 0).is_empty());
    }

    #[test]
    fn recruits_start_in_training_and_graduate_after_lag() {
        let positions = (0..3).map(|i| billet(&format!("B{i}"), "HM", 3)).collect();
        let mut ledger = Ledger::new(positions, vec![]).unwrap();
        let policy = Policy {
            training_lag: 2,
            intake_cap: 2,
            ..quiet_policy()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        ledger.advance_tick();
        let r = run_accession(&mut ledger, &policy, &mut rng).unwrap();
        assert_eq!((r.goal, r.accessions, r.graduations), (3, 2, 0));
        for p in ledger.people() {
            assert_eq!(p.status, Status::InTraining);
            assert_eq!(p.time_in_service, 0);
            assert_eq!(p.paygrade, policy.entry_paygrade);
            assert!(p.performance <= PERFORMANCE_MAX);
        }

        ledger.advance_tick();
        let r = run_accession(&mut ledger, &policy, &mut rng).unwrap();
        assert_eq!((r.accessions, r.graduations), (1, 0));

        ledger.advance_tick();
        let r = run_accession(&mut ledger, &policy, &mut rng).unwrap();
        assert_eq!(r.graduations, 2);
        assert_eq!(ledger.count_status(Status::Assignable), 2);
        assert!(ledger.positions().all(|p| p.is_vacant()));
    }
}

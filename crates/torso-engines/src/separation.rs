//! Separation and retirement.
//!
//! Three policies are tried per person in a fixed order: mandatory
//! separation at the service ceiling, voluntary attrition, retirement. The
//! first one that fires wins; each decision consumes exactly one draw.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, trace};
use torso_core::{Ledger, LedgerError, Person, Policy, Status, PERFORMANCE_MAX};

/// Service length at which the voluntary attrition rate is halved.
const ATTRITION_HALVING_TICKS: f64 = 120.0;
/// Ticks per year, for the retirement curve.
const TICKS_PER_YEAR: u32 = 12;

/// What the separation pass did this tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeparationReport {
    /// Separated at the service ceiling without re-enlistment approval.
    pub mandatory: u32,
    /// Left voluntarily.
    pub voluntary: u32,
    /// Retired.
    pub retirements: u32,
}

impl SeparationReport {
    /// Mandatory plus voluntary separations.
    pub fn separations(&self) -> u32 {
        self.mandatory + self.voluntary
    }
}

/// Per-tick probability that a person chooses to leave.
///
/// Low performers and junior people leave more often: the base rate is
/// scaled by `2 - performance/5` and divided by `1 + tis/120`.
pub fn voluntary_attrition_probability(person: &Person, policy: &Policy) -> f64 {
    let perf = person.performance.to_f64().unwrap_or(0.0);
    let max = PERFORMANCE_MAX.to_f64().unwrap_or(5.0);
    let perf_factor = 2.0 - perf / max;
    let service_factor = 1.0 + f64::from(person.time_in_service) / ATTRITION_HALVING_TICKS;
    (policy.voluntary_attrition_rate * perf_factor / service_factor).clamp(0.0, 1.0)
}

/// Per-tick retirement probability, or `None` before eligibility.
pub fn retirement_probability(person: &Person, policy: &Policy) -> Option<f64> {
    let past = person.time_in_service.checked_sub(policy.retirement_eligibility)?;
    let years_past = f64::from(past / TICKS_PER_YEAR);
    Some((policy.retirement_base_rate + policy.retirement_rate_growth * years_past).clamp(0.0, 1.0))
}

/// Outcome of evaluating one person.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exit {
    Mandatory,
    Voluntary,
    Retirement,
}

fn evaluate<R: Rng + ?Sized>(person: &Person, policy: &Policy, rng: &mut R) -> Option<Exit> {
    let ceiling = policy.service_ceiling.for_grade(person.paygrade);
    if person.time_in_service > ceiling && !rng.gen_bool(policy.retention_rate) {
        return Some(Exit::Mandatory);
    }
    if rng.gen_bool(voluntary_attrition_probability(person, policy)) {
        return Some(Exit::Voluntary);
    }
    match retirement_probability(person, policy) {
        Some(p) if rng.gen_bool(p) => Some(Exit::Retirement),
        _ => None,
    }
}

/// Evaluate every person in service, in id order, and discharge those who leave.
pub fn run_separation<R: Rng + ?Sized>(
    ledger: &mut Ledger,
    policy: &Policy,
    rng: &mut R,
) -> Result<SeparationReport, LedgerError> {
    let mut exits = Vec::new();
    for person in ledger.active() {
        if let Some(exit) = evaluate(person, policy, rng) {
            exits.push((person.id, exit));
        }
    }

    let mut report = SeparationReport::default();
    for (id, exit) in exits {
        let status = match exit {
            Exit::Mandatory => {
                report.mandatory += 1;
                Status::Separated
            }
            Exit::Voluntary => {
                report.voluntary += 1;
                Status::Separated
            }
            Exit::Retirement => {
                report.retirements += 1;
                Status::Retired
            }
        };
        ledger.discharge(id, status)?;
        trace!(person = %id, ?exit, "left service");
    }

    debug!(tick = ledger.tick(), ?report, "separation pass");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use torso_core::{GradeSchedule, PersonId, PositionId};

    fn no_chance() -> Policy {
        Policy {
            retention_rate: 1.0,
            voluntary_attrition_rate: 0.0,
            retirement_base_rate: 0.0,
            retirement_rate_growth: 0.0,
            ..Policy::default()
        }
    }

    #[test]
    fn nobody_leaves_when_all_rates_are_zero() {
        let people = (1..=20).map(|i| seasoned(sailor(i, "HM", 5, 300), 400, 10)).collect();
        let mut ledger = Ledger::new(vec![], people).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let r = run_separation(&mut ledger, &no_chance(), &mut rng).unwrap();
        assert_eq!(r, SeparationReport::default());
        assert_eq!(ledger.roster_size(), 20);
    }

    #[test]
    fn ceiling_without_retention_separates_everyone_over_it() {
        let policy = Policy {
            retention_rate: 0.0,
            service_ceiling: GradeSchedule::uniform(60),
            ..no_chance()
        };
        let people = vec![
            seasoned(sailor(1, "HM", 3, 300), 61, 10),
            seasoned(sailor(2, "HM", 3, 300), 60, 10),
        ];
        let mut ledger = Ledger::new(vec![], people).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let r = run_separation(&mut ledger, &policy, &mut rng).unwrap();
        assert_eq!(r.mandatory, 1);
        assert_eq!(ledger.person(PersonId(1)).unwrap().status, Status::Separated);
        assert_eq!(ledger.person(PersonId(2)).unwrap().status, Status::Assignable);
    }

    #[test]
    fn mandatory_separation_takes_precedence_over_retirement() {
        let policy = Policy {
            retention_rate: 0.0,
            retirement_base_rate: 1.0,
            service_ceiling: GradeSchedule::uniform(200),
            retirement_eligibility: 240,
            ..no_chance()
        };
        let people = vec![seasoned(sailor(1, "HM", 6, 300), 300, 10)];
        let mut ledger = Ledger::new(vec![], people).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let r = run_separation(&mut ledger, &policy, &mut rng).unwrap();
        assert_eq!(r, SeparationReport { mandatory: 1, voluntary: 0, retirements: 0 });
    }

    #[test]
    fn certain_retirement_vacates_position() {
        let policy = Policy {
            retirement_base_rate: 1.0,
            service_ceiling: GradeSchedule::uniform(400),
            ..no_chance()
        };
        let positions = vec![billet("B1", "HM", 7)];
        let people = vec![
            seated(seasoned(sailor(1, "HM", 7, 300), 250, 30), "B1", 10),
            seasoned(sailor(2, "HM", 7, 300), 239, 30),
        ];
        let mut ledger = Ledger::new(positions, people).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let r = run_separation(&mut ledger, &policy, &mut rng).unwrap();
        assert_eq!(r.retirements, 1);
        let retiree = ledger.person(PersonId(1)).unwrap();
        assert_eq!(retiree.status, Status::Retired);
        assert_eq!(retiree.last_position, Some(PositionId("B1".into())));
        assert!(ledger.position(&PositionId("B1".into())).unwrap().is_vacant());
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn retirement_curve_rises_with_service() {
        let policy = Policy::default();
        let early = seasoned(sailor(1, "HM", 7, 300), 239, 1);
        assert_eq!(retirement_probability(&early, &policy), None);
        let at = seasoned(sailor(1, "HM", 7, 300), 240, 1);
        let later = seasoned(sailor(1, "HM", 7, 300), 276, 1);
        let p_at = retirement_probability(&at, &policy).unwrap();
        let p_later = retirement_probability(&later, &policy).unwrap();
        assert!((p_at - 0.05).abs() < 1e-12);
        assert!((p_later - 0.11).abs() < 1e-12);
    }

    #[test]
    fn attrition_falls_with_performance_and_service() {
        let policy = Policy {
            voluntary_attrition_rate: 0.01,
            ..Policy::default()
        };
        let weak = sailor(1, "HM", 3, 100);
        let strong = sailor(2, "HM", 3, 500);
        let veteran = seasoned(sailor(3, "HM", 3, 500), 120, 1);
        let pw = voluntary_attrition_probability(&weak, &policy);
        let ps = voluntary_attrition_probability(&strong, &policy);
        let pv = voluntary_attrition_probability(&veteran, &policy);
        assert!(pw > ps);
        assert!((ps - 0.01).abs() < 1e-12);
        assert!((pv - 0.005).abs() < 1e-12);
    }

    #[test]
    fn same_seed_same_exits() {
        let policy = Policy {
            voluntary_attrition_rate: 0.2,
            ..Policy::default()
        };
        let people: Vec<_> = (1..=200).map(|i| seasoned(sailor(i, "HM", 4, 300), 100, 10)).collect();
        let run = |seed| {
            let mut ledger = Ledger::new(vec![], people.clone()).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            run_separation(&mut ledger, &policy, &mut rng).unwrap();
            ledger
        };
        assert_eq!(run(11), run(11));
        assert!(run(11).roster_size() < 200);
    }
}

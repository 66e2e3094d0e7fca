//! Per-tick metrics snapshots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use torso_core::{Ledger, Paygrade, Status};
use torso_engines::{AccessionReport, AdvancementReport, DistributionReport, SeparationReport};

/// State of the population after one tick, plus what each engine did during it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickMetrics {
    /// Tick index, starting at 1.
    pub tick: u32,
    /// Calendar month the tick represents.
    pub month: NaiveDate,
    /// People in service when the tick began.
    pub opening_roster: u32,
    /// People in service after the tick.
    pub roster_size: u32,
    /// Trainees in the pipeline.
    pub in_training: u32,
    /// Assignable people without a position.
    pub assignable: u32,
    /// People holding a position.
    pub assigned: u32,
    /// Recruits created.
    pub accessions: u32,
    /// Trainees who became assignable.
    pub graduations: u32,
    /// Recruiting goal before the intake cap.
    pub accession_goal: u32,
    /// Promotions.
    pub promotions: u32,
    /// Eligible people held back by budget.
    pub deferred_promotions: u32,
    /// People released from a position to move.
    pub detachments: u32,
    /// New pairings made by the matcher.
    pub assignments: u32,
    /// Vacant positions after the tick.
    pub vacant_positions: u32,
    /// Filled positions after the tick.
    pub filled_positions: u32,
    /// Assignable people left without a position after the tick.
    pub unassigned_people: u32,
    /// Separations at the service ceiling.
    pub mandatory_separations: u32,
    /// Voluntary separations.
    pub voluntary_separations: u32,
    /// Mandatory plus voluntary separations.
    pub separations: u32,
    /// Retirements.
    pub retirements: u32,
    /// Vacancy backlog per paygrade.
    pub vacancies_by_paygrade: BTreeMap<Paygrade, u32>,
    /// Unassigned backlog per paygrade.
    pub unassigned_by_paygrade: BTreeMap<Paygrade, u32>,
}

/// Engine reports for a single tick.
#[derive(Clone, Debug, Default)]
pub struct TickReports {
    /// Accession pass.
    pub accession: AccessionReport,
    /// Advancement pass.
    pub advancement: AdvancementReport,
    /// Distribution pass.
    pub distribution: DistributionReport,
    /// Separation pass.
    pub separation: SeparationReport,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl TickMetrics {
    /// Snapshot the ledger after a tick and fold in the engine reports.
    pub fn collect(ledger: &Ledger, month: NaiveDate, opening_roster: u32, reports: &TickReports) -> Self {
        let mut vacancies_by_paygrade: BTreeMap<Paygrade, u32> = BTreeMap::new();
        let mut vacant = 0usize;
        let mut filled = 0usize;
        for pos in ledger.positions() {
            if pos.is_vacant() {
                vacant += 1;
                *vacancies_by_paygrade.entry(pos.paygrade).or_default() += 1;
            } else {
                filled += 1;
            }
        }

        let mut unassigned_by_paygrade: BTreeMap<Paygrade, u32> = BTreeMap::new();
        for p in ledger.active().filter(|p| p.is_unassigned()) {
            *unassigned_by_paygrade.entry(p.paygrade).or_default() += 1;
        }
        let assignable = count(ledger.count_status(Status::Assignable));

        Self {
            tick: ledger.tick(),
            month,
            opening_roster,
            roster_size: count(ledger.roster_size()),
            in_training: count(ledger.count_status(Status::InTraining)),
            assignable,
            assigned: count(ledger.count_status(Status::Assigned)),
            accessions: reports.accession.accessions,
            graduations: reports.accession.graduations,
            accession_goal: reports.accession.goal,
            promotions: reports.advancement.promotions,
            deferred_promotions: reports.advancement.deferred,
            detachments: reports.distribution.detachments,
            assignments: reports.distribution.assignments,
            vacant_positions: count(vacant),
            filled_positions: count(filled),
            unassigned_people: unassigned_by_paygrade.values().sum(),
            mandatory_separations: reports.separation.mandatory,
            voluntary_separations: reports.separation.voluntary,
            separations: reports.separation.separations(),
            retirements: reports.separation.retirements,
            vacancies_by_paygrade,
            unassigned_by_paygrade,
        }
    }

    /// Vacancy backlog at one paygrade.
    pub fn vacancies_at(&self, grade: Paygrade) -> u32 {
        self.vacancies_by_paygrade.get(&grade).copied().unwrap_or(0)
    }

    /// Serialize as a single JSON line.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Totals over a whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks actually simulated.
    pub ticks: u32,
    /// Total accessions.
    pub accessions: u32,
    /// Total promotions.
    pub promotions: u32,
    /// Total assignments.
    pub assignments: u32,
    /// Total separations, mandatory and voluntary.
    pub separations: u32,
    /// Total retirements.
    pub retirements: u32,
    /// Roster after the last tick.
    pub final_roster: u32,
    /// Vacancies after the last tick.
    pub final_vacancies: u32,
}

impl RunSummary {
    /// Sum a metrics sequence.
    pub fn from_metrics(metrics: &[TickMetrics]) -> Self {
        let mut s = metrics.iter().fold(RunSummary::default(), |mut s, m| {
            s.ticks += 1;
            s.accessions += m.accessions;
            s.promotions += m.promotions;
            s.assignments += m.assignments;
            s.separations += m.separations;
            s.retirements += m.retirements;
            s
        });
        if let Some(last) = metrics.last() {
            s.final_roster = last.roster_size;
            s.final_vacancies = last.vacant_positions;
        }
        s
    }
}

//! End-of-day state advancement: deliverable completion, weighted project
//! progress, completion/cancellation, assignment closure and active-count
//! bookkeeping.

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use sim_core::{
    Calendar, ConsultantId, DeliverableStatus, ProjectId, ProjectKind, ProjectStatus, SimConfig,
    SimError, SimRng,
};
use sim_workforce::WorkforceStore;

use crate::store::ProjectStore;

/// Per-day transition counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DayOutcome {
    pub completed: u32,
    pub cancelled: u32,
}

/// Enforces the project and deliverable state machines.
#[derive(Debug)]
pub struct StateAdvancer {
    calendar: Calendar,
}

impl StateAdvancer {
    pub fn new(calendar: Calendar) -> StateAdvancer {
        StateAdvancer { calendar }
    }

    /// Advance every running project at the end of a working day.
    pub fn end_of_day(
        &self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
        date: NaiveDate,
    ) -> Result<DayOutcome, SimError> {
        self.release_departed(workforce, projects, date)?;

        let mut outcome = DayOutcome::default();
        for pid in projects.project_ids() {
            let Some(p) = projects.project(pid) else { continue };
            if p.status != ProjectStatus::InProgress {
                continue;
            }
            let kind = p.kind;
            let actual_start = p.actual_start;
            let project_hours = p.actual_hours;
            let targets = p.meta.deliverable_targets.clone();
            let total_target: f64 = targets.values().sum();

            // Deliverable completion and weighted progress.
            let mut all_complete = true;
            let mut weighted = 0.0;
            for did in projects.deliverable_ids_of(pid) {
                let Some(d) = projects.deliverable(did) else { continue };
                let target = targets.get(&did.0).copied().unwrap_or(d.planned_hours);
                let done = d.actual_hours >= target && target > 0.0;
                if done && d.status != DeliverableStatus::Completed {
                    let invoiced = (kind == ProjectKind::Fixed)
                        .then(|| date + Duration::days(rng.int_in_range(1, 7)));
                    if let Some(d) = projects.deliverable_mut(did) {
                        d.status = DeliverableStatus::Completed;
                        d.submitted = Some(date);
                        d.invoiced = invoiced;
                        d.progress = 100;
                    }
                    debug!(project = %pid, deliverable = did.0, %date, "deliverable completed");
                }
                let d = projects.deliverable(did).ok_or_else(|| {
                    SimError::invariant(format!("deliverable {} vanished", did.0))
                })?;
                if d.status != DeliverableStatus::Completed {
                    all_complete = false;
                }
                if total_target > 0.0 {
                    weighted +=
                        (d.actual_hours / target.max(1.0)) * (target / total_target) * 100.0;
                }
            }
            let progress = (weighted.floor() as u8).min(100);
            if let Some(p) = projects.project_mut(pid) {
                // Progress is a floor over monotone hours; it never moves back.
                p.progress = p.progress.max(progress);
            }

            if all_complete {
                if let Some(p) = projects.project_mut(pid) {
                    p.status = ProjectStatus::Completed;
                    p.actual_end = Some(date);
                    p.progress = 100;
                }
                self.close_team(workforce, projects, pid, date)?;
                outcome.completed += 1;
                info!(project = %pid, %date, "project completed");
            } else if project_hours == 0.0
                && date > actual_start + Duration::days(cfg.projects.inactivity_cancel_days)
            {
                if let Some(p) = projects.project_mut(pid) {
                    p.status = ProjectStatus::Cancelled;
                }
                self.close_team(workforce, projects, pid, date)?;
                outcome.cancelled += 1;
                warn!(project = %pid, %date, "project cancelled after inactivity");
            }
        }
        Ok(outcome)
    }

    /// Close every open assignment on a finished project and hand the freed
    /// capacity back to the pool.
    fn close_team(
        &self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        pid: ProjectId,
        date: NaiveDate,
    ) -> Result<(), SimError> {
        let members: Vec<(ConsultantId, NaiveDate)> = projects
            .assignments_of_project(pid)
            .iter()
            .filter(|a| a.end.is_none())
            .map(|a| (a.consultant.clone(), a.start))
            .collect();
        for (member, start) in members {
            // Never extend an assignment past the member's employment.
            let end = if workforce.has_entry_on(&member, date) {
                date
            } else {
                workforce
                    .entries_for(&member)
                    .last()
                    .and_then(|e| e.end)
                    .unwrap_or(date)
                    .max(start)
            };
            projects.close_assignment(pid, &member, end)?;
            if let Some(c) = workforce.consultant_mut(&member) {
                c.meta.active_projects = c.meta.active_projects.saturating_sub(1);
            }
        }
        Ok(())
    }

    /// Close open assignments of consultants whose employment has ended.
    fn release_departed(
        &self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        date: NaiveDate,
    ) -> Result<(), SimError> {
        let stale: Vec<(ProjectId, ConsultantId, NaiveDate)> = projects
            .assignments()
            .filter(|a| a.end.is_none())
            .filter(|a| !workforce.has_entry_on(&a.consultant, date))
            .map(|a| (a.project, a.consultant.clone(), a.start))
            .collect();
        for (pid, member, start) in stale {
            let employment_end = workforce
                .entries_for(&member)
                .last()
                .and_then(|e| e.end)
                .unwrap_or(date);
            if start > employment_end {
                // Staffed before the project started, gone before it did:
                // the assignment never materialized.
                projects.void_assignment(pid, &member)?;
                if let Some(p) = projects.project_mut(pid) {
                    p.meta.team.retain(|id| id != &member);
                    p.meta.remaining_slots =
                        p.meta.target_team_size.saturating_sub(p.meta.team.len());
                }
            } else {
                projects.close_assignment(pid, &member, employment_end)?;
            }
            if let Some(c) = workforce.consultant_mut(&member) {
                c.meta.active_projects = c.meta.active_projects.saturating_sub(1);
            }
            debug!(project = %pid, consultant = %member, %date, "assignment released on departure");
        }
        Ok(())
    }

    /// Year-boundary consistency check: re-derive every consultant's active
    /// project count from the assignments, fixing and reporting drift.
    pub fn rederive_active_counts(
        &self,
        workforce: &mut WorkforceStore,
        projects: &ProjectStore,
    ) -> u32 {
        let ids: Vec<ConsultantId> = workforce.consultants().map(|c| c.id.clone()).collect();
        let mut mismatches = 0;
        for id in ids {
            let derived = projects.active_count(&id);
            if let Some(c) = workforce.consultant_mut(&id) {
                if c.meta.active_projects != derived {
                    warn!(
                        consultant = %id,
                        cached = c.meta.active_projects,
                        derived,
                        "active project count drifted; fixed"
                    );
                    c.meta.active_projects = derived;
                    mismatches += 1;
                }
            }
        }
        mismatches
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }
}

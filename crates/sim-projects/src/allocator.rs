//! Daily work allocation: start due projects, top up under-staffed teams,
//! distribute hours across deliverables under the capacity caps, and emit
//! the month's scheduled expenses.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, trace};

use sim_core::{
    round_hours, Calendar, Expense, ProjectId, ProjectStatus, SimConfig, SimError, SimRng,
    TeamAssignment, TeamRole, TimeCharge,
};
use sim_workforce::WorkforceStore;

use crate::creator::{build_pool, select_by_distribution};
use crate::store::ProjectStore;

/// The per-working-day engine.
#[derive(Debug)]
pub struct DailyWorkAllocator {
    calendar: Calendar,
}

impl DailyWorkAllocator {
    pub fn new(calendar: Calendar) -> DailyWorkAllocator {
        DailyWorkAllocator { calendar }
    }

    /// Run one working day: project starts, team top-ups, hour allocation.
    pub fn run_day(
        &self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
        date: NaiveDate,
    ) -> Result<(), SimError> {
        self.start_due_projects(projects, date)?;
        self.top_up_teams(workforce, projects, cfg, date)?;
        self.allocate_hours(workforce, projects, cfg, rng, date)?;
        Ok(())
    }

    /// Flip NotStarted projects whose actual start has arrived, inserting
    /// any missing team assignments.
    fn start_due_projects(
        &self,
        projects: &mut ProjectStore,
        date: NaiveDate,
    ) -> Result<(), SimError> {
        for id in projects.project_ids() {
            let Some(p) = projects.project(id) else { continue };
            if p.status != ProjectStatus::NotStarted || p.actual_start > date {
                continue;
            }
            let team = p.meta.team.clone();
            if let Some(p) = projects.project_mut(id) {
                p.status = ProjectStatus::InProgress;
            }
            debug!(project = %id, %date, "project started");
            let assigned: Vec<_> = projects
                .assignments_of_project(id)
                .iter()
                .map(|a| a.consultant.clone())
                .collect();
            for member in team {
                if !assigned.contains(&member) {
                    projects.add_assignment(TeamAssignment {
                        project: id,
                        consultant: member,
                        role: TeamRole::TeamMember,
                        start: date,
                        end: None,
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Fill open seats on running projects with the same distribution-driven
    /// selection used at creation, respecting concurrency caps.
    fn top_up_teams(
        &self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        cfg: &SimConfig,
        date: NaiveDate,
    ) -> Result<(), SimError> {
        for id in projects.project_ids() {
            let Some(p) = projects.project(id) else { continue };
            if p.status != ProjectStatus::InProgress {
                continue;
            }
            let target_size = p.meta.target_team_size;
            let team: Vec<_> = p.meta.team.clone();
            if team.len() >= target_size {
                continue;
            }
            let Some(pm) = projects
                .assignments_of_project(id)
                .iter()
                .find(|a| a.role == TeamRole::ProjectManager)
                .map(|a| a.consultant.clone())
            else {
                continue;
            };
            let Some(pm_title) = workforce.latest_title_id(&pm, date) else {
                continue;
            };
            let mut pool = build_pool(workforce, projects, cfg, date, pm_title, &pm);
            pool.retain(|c| !team.contains(&c.id));
            let additions = select_by_distribution(&pool, target_size - team.len(), &cfg.projects);
            if additions.is_empty() {
                continue;
            }
            for member in &additions {
                projects.add_assignment(TeamAssignment {
                    project: id,
                    consultant: member.id.clone(),
                    role: TeamRole::TeamMember,
                    start: date,
                    end: None,
                })?;
                if let Some(c) = workforce.consultant_mut(&member.id) {
                    c.meta.active_projects += 1;
                    c.meta.last_project_date = Some(date);
                }
            }
            if let Some(p) = projects.project_mut(id) {
                p.meta.team.extend(additions.iter().map(|c| c.id.clone()));
                p.meta.remaining_slots = target_size.saturating_sub(p.meta.team.len());
            }
            debug!(project = %id, added = additions.len(), %date, "team topped up");
        }
        Ok(())
    }

    /// Distribute today's hours across active projects in shuffled order.
    fn allocate_hours(
        &self,
        workforce: &WorkforceStore,
        projects: &mut ProjectStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
        date: NaiveDate,
    ) -> Result<(), SimError> {
        let mut active: Vec<ProjectId> = projects
            .project_ids()
            .into_iter()
            .filter(|id| {
                projects
                    .project(*id)
                    .map(|p| p.status == ProjectStatus::InProgress)
                    .unwrap_or(false)
            })
            .collect();
        rng.shuffle(&mut active);

        for pid in active {
            let Some(p) = projects.project(pid) else { continue };
            let team = p.meta.team.clone();
            let targets = p.meta.deliverable_targets.clone();
            let mut project_hours_added = 0.0;

            for did in projects.deliverable_ids_of(pid) {
                let Some(d) = projects.deliverable(did) else { continue };
                if d.status == sim_core::DeliverableStatus::Completed || d.planned_start > date {
                    continue;
                }
                let target = targets.get(&did.0).copied().unwrap_or(d.planned_hours);
                if d.actual_start.is_none() {
                    if let Some(d) = projects.deliverable_mut(did) {
                        d.actual_start = Some(date);
                        d.status = sim_core::DeliverableStatus::InProgress;
                    }
                }
                let mut remaining = target
                    - projects
                        .deliverable(did)
                        .map(|d| d.actual_hours)
                        .unwrap_or(0.0);
                if remaining <= 0.0 {
                    continue;
                }

                for member in &team {
                    if remaining <= 0.0 {
                        break;
                    }
                    // Only employed members with a live assignment charge.
                    let Some(entry) = workforce.entry_on(member, date) else {
                        continue;
                    };
                    if !projects
                        .open_assignments(member, date)
                        .iter()
                        .any(|a| a.project == pid)
                    {
                        continue;
                    }
                    let title = entry.title;
                    let cap = cfg.projects.daily_cap(title);
                    let charged = projects.daily_hours(member, date);
                    let available = (cap - charged).min(remaining);
                    if available <= 0.0 {
                        continue;
                    }
                    let min_charge = cfg.projects.min_daily_per_project(title);
                    if available < min_charge {
                        trace!(consultant = %member, %date, available, min_charge, "draw clipped to remaining capacity");
                    }
                    let drawn = rng.uniform(min_charge.min(available), available);
                    let mut hours = round_hours(drawn);
                    if hours > available {
                        hours = (available * 10.0).floor() / 10.0;
                    }
                    if hours <= 0.0 {
                        continue;
                    }
                    projects.add_time_charge(TimeCharge {
                        consultant: member.clone(),
                        deliverable: did,
                        date,
                        hours,
                    })?;
                    remaining -= hours;
                    project_hours_added += hours;
                    if let Some(d) = projects.deliverable_mut(did) {
                        d.actual_hours = round_hours(d.actual_hours + hours);
                    }
                }
                if let Some(d) = projects.deliverable_mut(did) {
                    let pct = (d.actual_hours / target.max(1.0) * 100.0).round();
                    d.progress = (pct as u8).min(100);
                }
            }

            if project_hours_added > 0.0 {
                if let Some(p) = projects.project_mut(pid) {
                    p.actual_hours = round_hours(p.actual_hours + project_hours_added);
                }
            }
        }
        Ok(())
    }

    /// Emit the pre-generated expense rows scheduled for this month, dated
    /// inside each project's active window.
    pub fn emit_monthly_expenses(
        &self,
        projects: &mut ProjectStore,
        year: i32,
        month: u32,
    ) -> Result<usize, SimError> {
        let month_first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| SimError::ConfigError(format!("invalid month {year}-{month}")))?;
        let mut emitted = 0;
        for pid in projects.project_ids() {
            let Some(p) = projects.project(pid) else { continue };
            if matches!(p.status, ProjectStatus::NotStarted | ProjectStatus::Cancelled) {
                continue;
            }
            // A project finished before this month emits nothing further.
            if p.actual_end.map_or(false, |end| end < month_first) {
                continue;
            }
            let window_end = p.actual_end.unwrap_or(self.calendar.end()).min(self.calendar.end());
            let nominal_day = p.planned_start.day().min(28);
            let rows: Vec<Expense> = p
                .meta
                .scheduled_expenses
                .iter()
                .filter(|s| s.year == year && s.month == month)
                .filter_map(|s| {
                    let nominal = NaiveDate::from_ymd_opt(year, month, nominal_day)?;
                    let date = nominal.max(p.actual_start).min(window_end);
                    Some(Expense {
                        project: pid,
                        deliverable: s.deliverable,
                        date,
                        amount: s.amount,
                        description: s.description.clone(),
                        category: s.category.clone(),
                        billable: s.billable,
                    })
                })
                .collect();
            for row in rows {
                projects.add_expense(row)?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }
}

//! In-memory project store: projects, teams, deliverables, time charges,
//! billing rates and expenses, with the query helpers the daily loop needs.
//!
//! Hard invariants (charges without an open assignment, expenses outside the
//! active window, negative hours) are enforced at the write boundary and
//! abort the run.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use sim_core::{
    domain::validate_time_charge, is_working_day, BillingRate, ConsultantId, Deliverable,
    DeliverableId, Expense, Project, ProjectId, ProjectStatus, SimError, TeamAssignment,
    TimeCharge, UnitId,
};

/// Owner of everything project-shaped.
#[derive(Debug, Default)]
pub struct ProjectStore {
    projects: Vec<Project>,
    project_idx: HashMap<ProjectId, usize>,
    assignments: Vec<TeamAssignment>,
    by_consultant: HashMap<ConsultantId, Vec<usize>>,
    by_project: HashMap<ProjectId, Vec<usize>>,
    deliverables: Vec<Deliverable>,
    deliverable_idx: HashMap<DeliverableId, usize>,
    project_deliverables: HashMap<ProjectId, Vec<usize>>,
    time_charges: Vec<TimeCharge>,
    charged_by_day: HashMap<(ConsultantId, NaiveDate), f64>,
    billing_rates: Vec<BillingRate>,
    expenses: Vec<Expense>,
    created_per_month: HashMap<(i32, u32), u32>,
    next_project: u32,
    next_deliverable: u32,
}

impl ProjectStore {
    pub fn new() -> ProjectStore {
        ProjectStore::default()
    }

    pub fn next_project_id(&mut self) -> ProjectId {
        self.next_project += 1;
        ProjectId(self.next_project)
    }

    pub fn next_deliverable_id(&mut self) -> DeliverableId {
        self.next_deliverable += 1;
        DeliverableId(self.next_deliverable)
    }

    pub fn add_project(&mut self, p: Project) -> Result<(), SimError> {
        if self.project_idx.contains_key(&p.id) {
            return Err(SimError::invariant(format!("duplicate project id {}", p.id)));
        }
        self.created_per_month
            .entry((p.created_at.year(), p.created_at.month()))
            .and_modify(|n| *n += 1)
            .or_insert(1);
        self.project_idx.insert(p.id, self.projects.len());
        self.projects.push(p);
        Ok(())
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.project_idx.get(&id).map(|i| &self.projects[*i])
    }

    pub fn project_mut(&mut self, id: ProjectId) -> Option<&mut Project> {
        self.project_idx.get(&id).map(|i| &mut self.projects[*i])
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.projects.iter().map(|p| p.id).collect()
    }

    /// Projects created in the given calendar month.
    pub fn created_in_month(&self, year: i32, month: u32) -> u32 {
        self.created_per_month
            .get(&(year, month))
            .copied()
            .unwrap_or(0)
    }

    /// Projects counted per business unit for a planned-start year.
    pub fn projects_per_unit_in_year(&self, year: i32) -> HashMap<UnitId, u32> {
        let mut counts = HashMap::new();
        for p in &self.projects {
            if p.planned_start.year() == year {
                *counts.entry(p.unit).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Append an open or closed team assignment.
    pub fn add_assignment(&mut self, a: TeamAssignment) -> Result<(), SimError> {
        let Some(project) = self.project(a.project) else {
            return Err(SimError::invariant(format!(
                "assignment references unknown project {}",
                a.project
            )));
        };
        let window_start = project.actual_start.min(project.planned_start);
        if a.start < window_start {
            return Err(SimError::invariant(format!(
                "assignment for {} on {} starts {} before project window {}",
                a.consultant, a.project, a.start, window_start
            )));
        }
        let idx = self.assignments.len();
        self.by_consultant
            .entry(a.consultant.clone())
            .or_default()
            .push(idx);
        self.by_project.entry(a.project).or_default().push(idx);
        self.assignments.push(a);
        Ok(())
    }

    /// Close the open assignment of `consultant` on `project`.
    pub fn close_assignment(
        &mut self,
        project: ProjectId,
        consultant: &ConsultantId,
        end: NaiveDate,
    ) -> Result<(), SimError> {
        let indices = self.by_project.get(&project).cloned().unwrap_or_default();
        for i in indices {
            let a = &mut self.assignments[i];
            if &a.consultant == consultant && a.end.is_none() {
                a.end = Some(end.max(a.start));
                return Ok(());
            }
        }
        Err(SimError::invariant(format!(
            "no open assignment for {consultant} on {project}"
        )))
    }

    /// Remove an open assignment that never materialized (the consultant
    /// left before the project's actual start).
    pub fn void_assignment(
        &mut self,
        project: ProjectId,
        consultant: &ConsultantId,
    ) -> Result<(), SimError> {
        let Some(pos) = self
            .assignments
            .iter()
            .position(|a| a.project == project && &a.consultant == consultant && a.end.is_none())
        else {
            return Err(SimError::invariant(format!(
                "no open assignment to void for {consultant} on {project}"
            )));
        };
        self.assignments.remove(pos);
        self.by_consultant.clear();
        self.by_project.clear();
        for (i, a) in self.assignments.iter().enumerate() {
            self.by_consultant
                .entry(a.consultant.clone())
                .or_default()
                .push(i);
            self.by_project.entry(a.project).or_default().push(i);
        }
        Ok(())
    }

    pub fn assignments(&self) -> impl Iterator<Item = &TeamAssignment> {
        self.assignments.iter()
    }

    pub fn assignments_of_project(&self, project: ProjectId) -> Vec<&TeamAssignment> {
        self.by_project
            .get(&project)
            .map(|v| v.iter().map(|i| &self.assignments[*i]).collect())
            .unwrap_or_default()
    }

    /// Assignments open for the consultant on `date`.
    pub fn open_assignments(&self, consultant: &ConsultantId, date: NaiveDate) -> Vec<&TeamAssignment> {
        self.by_consultant
            .get(consultant)
            .map(|v| {
                v.iter()
                    .map(|i| &self.assignments[*i])
                    .filter(|a| a.start <= date && a.end.map_or(true, |e| e >= date))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count of distinct not-yet-closed projects the consultant holds an
    /// open-ended assignment on.
    pub fn active_count(&self, consultant: &ConsultantId) -> u32 {
        let mut seen = Vec::new();
        if let Some(v) = self.by_consultant.get(consultant) {
            for i in v {
                let a = &self.assignments[*i];
                if a.end.is_none() && !seen.contains(&a.project) {
                    let closed = self
                        .project(a.project)
                        .map(|p| p.status.is_closed())
                        .unwrap_or(true);
                    if !closed {
                        seen.push(a.project);
                    }
                }
            }
        }
        seen.len() as u32
    }

    pub fn add_deliverable(&mut self, d: Deliverable) -> Result<(), SimError> {
        if self.deliverable_idx.contains_key(&d.id) {
            return Err(SimError::invariant(format!(
                "duplicate deliverable id {}",
                d.id.0
            )));
        }
        if self.project(d.project).is_none() {
            return Err(SimError::invariant(format!(
                "deliverable references unknown project {}",
                d.project
            )));
        }
        self.deliverable_idx.insert(d.id, self.deliverables.len());
        self.project_deliverables
            .entry(d.project)
            .or_default()
            .push(self.deliverables.len());
        self.deliverables.push(d);
        Ok(())
    }

    pub fn deliverable(&self, id: DeliverableId) -> Option<&Deliverable> {
        self.deliverable_idx.get(&id).map(|i| &self.deliverables[*i])
    }

    pub fn deliverable_mut(&mut self, id: DeliverableId) -> Option<&mut Deliverable> {
        self.deliverable_idx
            .get(&id)
            .map(|i| &mut self.deliverables[*i])
    }

    pub fn deliverables(&self) -> impl Iterator<Item = &Deliverable> {
        self.deliverables.iter()
    }

    pub fn deliverables_of(&self, project: ProjectId) -> Vec<&Deliverable> {
        self.project_deliverables
            .get(&project)
            .map(|v| v.iter().map(|i| &self.deliverables[*i]).collect())
            .unwrap_or_default()
    }

    pub fn deliverable_ids_of(&self, project: ProjectId) -> Vec<DeliverableId> {
        self.project_deliverables
            .get(&project)
            .map(|v| v.iter().map(|i| self.deliverables[*i].id).collect())
            .unwrap_or_default()
    }

    /// Append a time charge. The consultant must hold an open assignment on
    /// the referenced project that day, the day must be a weekday inside the
    /// project's actual window, and hours must be positive.
    pub fn add_time_charge(&mut self, c: TimeCharge) -> Result<(), SimError> {
        validate_time_charge(&c)?;
        if !is_working_day(c.date) {
            return Err(SimError::invariant(format!(
                "time charge on non-working day {} by {}",
                c.date, c.consultant
            )));
        }
        let Some(deliverable) = self.deliverable(c.deliverable) else {
            return Err(SimError::invariant(format!(
                "time charge references unknown deliverable {}",
                c.deliverable.0
            )));
        };
        let project_id = deliverable.project;
        let Some(project) = self.project(project_id) else {
            return Err(SimError::invariant(format!(
                "deliverable {} references unknown project",
                c.deliverable.0
            )));
        };
        if c.date < project.actual_start {
            return Err(SimError::invariant(format!(
                "time charge by {} on {} predates {} start {}",
                c.consultant, c.date, project_id, project.actual_start
            )));
        }
        let on_team = self
            .open_assignments(&c.consultant, c.date)
            .iter()
            .any(|a| a.project == project_id);
        if !on_team {
            return Err(SimError::invariant(format!(
                "time charge by {} on {} without open assignment on {}",
                c.consultant, c.date, project_id
            )));
        }
        *self
            .charged_by_day
            .entry((c.consultant.clone(), c.date))
            .or_insert(0.0) += c.hours;
        self.time_charges.push(c);
        Ok(())
    }

    pub fn time_charges(&self) -> impl Iterator<Item = &TimeCharge> {
        self.time_charges.iter()
    }

    /// Hours the consultant has already charged on `date`, across projects.
    pub fn daily_hours(&self, consultant: &ConsultantId, date: NaiveDate) -> f64 {
        self.charged_by_day
            .get(&(consultant.clone(), date))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn add_billing_rate(&mut self, r: BillingRate) -> Result<(), SimError> {
        if self
            .billing_rates
            .iter()
            .any(|b| b.project == r.project && b.title == r.title)
        {
            return Err(SimError::invariant(format!(
                "duplicate billing rate for {} title {}",
                r.project, r.title
            )));
        }
        self.billing_rates.push(r);
        Ok(())
    }

    pub fn billing_rates(&self) -> impl Iterator<Item = &BillingRate> {
        self.billing_rates.iter()
    }

    pub fn billing_rates_of(&self, project: ProjectId) -> Vec<&BillingRate> {
        self.billing_rates
            .iter()
            .filter(|b| b.project == project)
            .collect()
    }

    /// Append an expense; its date must sit inside the project's active
    /// window.
    pub fn add_expense(&mut self, e: Expense) -> Result<(), SimError> {
        let Some(project) = self.project(e.project) else {
            return Err(SimError::invariant(format!(
                "expense references unknown project {}",
                e.project
            )));
        };
        if e.date < project.actual_start
            || project.actual_end.map_or(false, |end| e.date > end)
        {
            return Err(SimError::invariant(format!(
                "expense dated {} outside active window of {}",
                e.date, e.project
            )));
        }
        self.expenses.push(e);
        Ok(())
    }

    pub fn expenses(&self) -> impl Iterator<Item = &Expense> {
        self.expenses.iter()
    }

    /// Projects workable on `date`: in progress, or due to start.
    pub fn active_projects_on(&self, date: NaiveDate) -> Vec<ProjectId> {
        self.projects
            .iter()
            .filter(|p| match p.status {
                ProjectStatus::InProgress => true,
                ProjectStatus::NotStarted => p.actual_start <= date,
                _ => false,
            })
            .map(|p| p.id)
            .collect()
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            projects: self.projects.len(),
            assignments: self.assignments.len(),
            deliverables: self.deliverables.len(),
            time_charges: self.time_charges.len(),
            billing_rates: self.billing_rates.len(),
            expenses: self.expenses.len(),
        }
    }
}

/// Row counts for summaries and reproducibility checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreCounts {
    pub projects: usize,
    pub assignments: usize,
    pub deliverables: usize,
    pub time_charges: usize,
    pub billing_rates: usize,
    pub expenses: usize,
}

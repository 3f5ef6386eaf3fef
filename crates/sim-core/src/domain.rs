//! Domain entities for the consulting-firm simulation.
//!
//! Everything here is a plain serializable value type. The workforce store
//! owns consultants and title-history entries; the project store owns the
//! rest. Mutation is confined to open-ended fields (end dates, actual dates,
//! status, progress, accumulated hours, per-entity metadata).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SimError;

/// Opaque consultant identifier, e.g. "C0042".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConsultantId(pub String);

impl std::fmt::Display for ConsultantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Title rank 1..6. Determines billing rate, daily hour cap, concurrency cap
/// and promotion interval.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TitleId(pub u8);

impl TitleId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// All title ids in ascending order.
    pub fn all() -> impl Iterator<Item = TitleId> {
        (Self::MIN..=Self::MAX).map(TitleId)
    }

    pub fn next_up(self) -> Option<TitleId> {
        if self.0 < Self::MAX {
            Some(TitleId(self.0 + 1))
        } else {
            None
        }
    }
}

impl std::fmt::Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Business-unit identifier (1 = North America, activated progressively).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

/// Client identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ClientId(pub u32);

/// Location identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LocationId(pub u32);

/// Project identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProjectId(pub u32);

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Deliverable identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DeliverableId(pub u32);

/// Kind of title-history event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Hire,
    Promotion,
    Continuation,
    Attrition,
    Layoff,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Hire => "Hire",
            EventKind::Promotion => "Promotion",
            EventKind::Continuation => "Continuation",
            EventKind::Attrition => "Attrition",
            EventKind::Layoff => "Layoff",
        }
    }

    /// Attrition and layoff entries terminate a consultant's history.
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::Attrition | EventKind::Layoff)
    }
}

/// Contract kind of a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectKind {
    /// Carries a price, no estimated budget.
    Fixed,
    /// Carries an estimated budget and per-title billing rates, no price.
    TimeAndMaterial,
}

impl ProjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::Fixed => "Fixed",
            ProjectKind::TimeAndMaterial => "Time and Material",
        }
    }
}

/// Project lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "Not Started",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }
}

/// Deliverable lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliverableStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl DeliverableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliverableStatus::NotStarted => "Not Started",
            DeliverableStatus::InProgress => "In Progress",
            DeliverableStatus::Completed => "Completed",
        }
    }
}

/// Role of a consultant on a project team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamRole {
    ProjectManager,
    TeamLead,
    TeamMember,
}

impl TeamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::ProjectManager => "Project Manager",
            TeamRole::TeamLead => "Team Lead",
            TeamRole::TeamMember => "Team Member",
        }
    }
}

/// Mutable simulation metadata carried by each consultant.
///
/// Persisted as a sidecar JSON document, never queried from the database
/// during the run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConsultantMeta {
    /// Current title id (mirrors the open title-history entry).
    pub title: Option<TitleId>,
    /// Count of team assignments with an open end date.
    pub active_projects: u32,
    /// Date of the most recent project assignment.
    pub last_project_date: Option<NaiveDate>,
}

/// A simulated employee. Created by the workforce simulator and never
/// destroyed; attrition and layoff live in the title history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Consultant {
    pub id: ConsultantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub business_unit: UnitId,
    pub hire_year: i32,
    pub meta: ConsultantMeta,
}

/// One window of a consultant's title history.
///
/// For any consultant the entries form a gapless, non-overlapping
/// chronological sequence with at most one open entry; `Hire` is always the
/// first entry and `Attrition`/`Layoff` are always the last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TitleHistoryEntry {
    pub consultant: ConsultantId,
    pub title: TitleId,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub event: EventKind,
    /// Annual salary in whole currency units.
    pub salary: i64,
}

/// A monthly payroll payment derived from the title history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub consultant: ConsultantId,
    pub amount: Decimal,
    pub effective: NaiveDate,
}

/// A scheduled monthly expense computed once at project creation and emitted
/// month by month while the project is active.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledExpense {
    pub deliverable: DeliverableId,
    pub year: i32,
    pub month: u32,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub billable: bool,
}

/// Mutable simulation metadata carried by each project.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Current team member ids, project manager first.
    pub team: Vec<ConsultantId>,
    /// Per-deliverable target hours (planned hours scaled by the
    /// overrun/underrun factor).
    pub deliverable_targets: BTreeMap<u32, f64>,
    /// Total target hours the allocator drives toward.
    pub target_hours: f64,
    /// Planned team size.
    pub target_team_size: usize,
    /// Slots that could not be filled at creation; fillable while running.
    pub remaining_slots: usize,
    /// Expense schedule computed at creation.
    pub scheduled_expenses: Vec<ScheduledExpense>,
    pub estimated_cost: Decimal,
    pub estimated_revenue: Decimal,
}

/// A time-bounded engagement for a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub client: ClientId,
    pub unit: UnitId,
    pub name: String,
    pub kind: ProjectKind,
    pub status: ProjectStatus,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub actual_start: NaiveDate,
    pub actual_end: Option<NaiveDate>,
    /// Set for Fixed projects only.
    pub price: Option<Decimal>,
    /// Set for Time-and-Material projects only.
    pub estimated_budget: Option<Decimal>,
    pub planned_hours: f64,
    pub actual_hours: f64,
    /// Percent complete, 0..=100.
    pub progress: u8,
    pub created_at: NaiveDate,
    pub meta: ProjectMeta,
}

/// Membership of a consultant on a project team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub project: ProjectId,
    pub consultant: ConsultantId,
    pub role: TeamRole,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// A sub-unit of a project with its own planned window and hours.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: DeliverableId,
    pub project: ProjectId,
    pub name: String,
    pub planned_start: NaiveDate,
    pub actual_start: Option<NaiveDate>,
    pub due: NaiveDate,
    pub submitted: Option<NaiveDate>,
    /// Fixed projects only: when the deliverable was invoiced.
    pub invoiced: Option<NaiveDate>,
    pub status: DeliverableStatus,
    pub planned_hours: f64,
    pub actual_hours: f64,
    pub progress: u8,
    /// Fixed projects only: share of the project price.
    pub price: Option<Decimal>,
}

/// A daily time charge of a consultant against a deliverable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeCharge {
    pub consultant: ConsultantId,
    pub deliverable: DeliverableId,
    pub date: NaiveDate,
    pub hours: f64,
}

/// Hourly billing rate for one title on a Time-and-Material project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingRate {
    pub project: ProjectId,
    pub title: TitleId,
    pub rate: Decimal,
}

/// A disbursed project expense row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub project: ProjectId,
    pub deliverable: DeliverableId,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub billable: bool,
}

/// Reference-data row: a title name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: TitleId,
    pub name: String,
}

/// Reference-data row: a business unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BusinessUnit {
    pub id: UnitId,
    pub name: String,
}

/// Reference-data row: a city the firm or its clients operate from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub state: String,
    pub city: String,
}

/// Reference-data row: a client of the firm.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub location: LocationId,
    pub phone: String,
    pub email: String,
}

/// Validate a single title-history entry in isolation.
pub fn validate_title_entry(e: &TitleHistoryEntry) -> Result<(), SimError> {
    if !(TitleId::MIN..=TitleId::MAX).contains(&e.title.0) {
        return Err(SimError::invariant(format!(
            "title {} out of range for consultant {}",
            e.title, e.consultant
        )));
    }
    if let Some(end) = e.end {
        if end < e.start {
            return Err(SimError::BadHistoryWrite {
                consultant: e.consultant.0.clone(),
                date: e.start,
                reason: format!("end {end} precedes start"),
            });
        }
    }
    if e.salary <= 0 {
        return Err(SimError::invariant(format!(
            "non-positive salary for consultant {}",
            e.consultant
        )));
    }
    Ok(())
}

/// Validate a time charge in isolation (positivity and date sanity); the
/// cap-related checks need store context and live with the allocator.
pub fn validate_time_charge(c: &TimeCharge) -> Result<(), SimError> {
    if c.hours <= 0.0 || !c.hours.is_finite() {
        return Err(SimError::invariant(format!(
            "non-positive hours {} charged by {} on {}",
            c.hours, c.consultant, c.date
        )));
    }
    Ok(())
}

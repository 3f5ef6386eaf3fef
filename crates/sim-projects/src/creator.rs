//! Monthly project creation: yearly headcount-driven targets, PM selection,
//! date and team planning, deliverable partitioning and financial setup.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use sim_core::{
    add_working_days, round_hours, working_days_between, Calendar, ConsultantId, Deliverable,
    DeliverableStatus, Project, ProjectId, ProjectKind, ProjectMeta, ProjectStatus, RefData,
    SimConfig, SimError, SimRng, TeamAssignment, TeamRole, TitleId, UnitId,
};
use sim_workforce::WorkforceStore;

use crate::capacity::CapacityOracle;
use crate::store::ProjectStore;

/// Minimum current title for project-manager eligibility.
const PM_TITLE_THRESHOLD: u8 = 4;
/// TeamLead slots handed to senior members after the manager.
const MAX_TEAM_LEADS: usize = 3;
const TEAM_LEAD_TITLE_THRESHOLD: u8 = 3;

/// A staffable consultant snapshot used during selection.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub id: ConsultantId,
    pub title: TitleId,
    pub active: u32,
    pub salary: i64,
}

/// The monthly project-creation engine.
#[derive(Debug)]
pub struct ProjectCreator {
    calendar: Calendar,
    /// Compounded consultant count driving yearly project targets.
    compound_count: f64,
    monthly_targets: [u32; 12],
}

impl ProjectCreator {
    pub fn new(cfg: &SimConfig, calendar: Calendar) -> ProjectCreator {
        ProjectCreator {
            calendar,
            compound_count: cfg.initial_consultants as f64,
            monthly_targets: [0; 12],
        }
    }

    /// Compute this year's project target and spread it over the months,
    /// with the remainder landing in the configured mid-year months.
    pub fn begin_year(&mut self, cfg: &SimConfig, year: i32, rng: &mut SimRng) -> u32 {
        self.compound_count *= 1.0 + cfg.growth_rate(year);
        let yearly_target = (self.compound_count / 2.0).ceil() as u32;
        let base = yearly_target / 12;
        let extra = yearly_target % 12;
        self.monthly_targets = [base; 12];
        for _ in 0..extra {
            let month = *rng.choose(&cfg.projects.extra_project_months);
            self.monthly_targets[month] += 1;
        }
        info!(year, yearly_target, "project targets distributed");
        yearly_target
    }

    /// Create up to the jittered monthly target of projects, capacity
    /// permitting. Returns the number actually created.
    pub fn run_month(
        &mut self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        refdata: &RefData,
        cfg: &SimConfig,
        rng: &mut SimRng,
        month_start: NaiveDate,
    ) -> Result<u32, SimError> {
        let oracle = CapacityOracle::new(&cfg.projects);
        let (year, month) = (month_start.year(), month_start.month());

        let mut managers: Vec<Candidate> = workforce
            .consultants_employed_on(month_start)
            .into_iter()
            .filter_map(|c| {
                let title = workforce.latest_title_id(&c.id, month_start)?;
                if title.0 < PM_TITLE_THRESHOLD {
                    return None;
                }
                let open = workforce.open_entry(&c.id)?;
                Some(Candidate {
                    id: c.id.clone(),
                    title,
                    active: projects.active_count(&c.id),
                    salary: open.salary,
                })
            })
            .collect();
        sort_candidates(&mut managers);

        let capacity: u32 = managers
            .iter()
            .map(|m| oracle.free_slots(m.title, m.active))
            .sum();
        let target = self.monthly_targets[(month - 1) as usize];
        let adjusted = target.min(capacity);
        let mut to_create = if adjusted > 0 {
            let mean = adjusted as f64;
            rng.normal(mean, (mean * 0.2).max(0.1)).round().max(0.0) as u32
        } else {
            0
        };
        to_create = to_create.saturating_sub(projects.created_in_month(year, month));
        debug!(
            year,
            month, target, capacity, to_create, "monthly creation plan"
        );

        let mut created = 0;
        for manager in &managers {
            if created >= to_create {
                break;
            }
            if oracle.free_slots(manager.title, projects.active_count(&manager.id)) == 0 {
                continue;
            }
            self.create_project(workforce, projects, refdata, cfg, rng, month_start, manager)?;
            created += 1;
        }
        if created < to_create {
            // Recovered locally: this month simply produces fewer projects.
            warn!(
                year,
                month,
                created,
                wanted = to_create,
                "{}",
                SimError::CapacityExhausted {
                    year,
                    month,
                    what: "no eligible project manager with free capacity".into(),
                }
            );
        }
        Ok(created)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_project(
        &mut self,
        workforce: &mut WorkforceStore,
        projects: &mut ProjectStore,
        refdata: &RefData,
        cfg: &SimConfig,
        rng: &mut SimRng,
        today: NaiveDate,
        manager: &Candidate,
    ) -> Result<ProjectId, SimError> {
        let p = &cfg.projects;
        let kind = if rng.chance(p.fixed_kind_weight) {
            ProjectKind::Fixed
        } else {
            ProjectKind::TimeAndMaterial
        };
        let created_at = (today - Duration::days(rng.int_in_range(0, 15)))
            .max(self.calendar.start());
        let client = refdata.pick_client(rng)?;

        // Dates hang off the manager's earliest availability.
        let availability = manager_availability(projects, &manager.id, today);
        let planned_start = self
            .calendar
            .clamp(availability + Duration::days(rng.int_in_range(0, 14)));
        let actual_start = self
            .calendar
            .clamp(planned_start + Duration::days(rng.int_in_range(0, 7)));
        let months = draw_duration_months(p, rng);
        let planned_end = add_working_days(planned_start, months * p.working_days_per_month);

        let team_size = rng.int_in_range(p.min_team_size as i64, p.max_team_size as i64) as usize;
        let planned_hours = (working_days_between(planned_start, planned_end) as f64
            * team_size as f64
            * p.average_working_hours_per_day)
            .round();
        let target_hours = (planned_hours * target_factor(p, rng)).round();

        // Team: the manager plus a distribution-driven mix capped by title.
        let pool = build_pool(workforce, projects, cfg, today, manager.title, &manager.id);
        let members = select_by_distribution(&pool, team_size.saturating_sub(1), p);
        let remaining_slots = team_size.saturating_sub(1 + members.len());

        let unit = assign_unit(workforce, projects, today)?;
        let id = projects.next_project_id();
        let name = format!("Project{}{:04}", today.year(), rng.int_in_range(1000, 9999));

        let (deliverables, targets) = plan_deliverables(
            projects,
            id,
            planned_start,
            planned_end,
            planned_hours,
            target_hours,
            p,
            rng,
        );

        let mut team: Vec<&Candidate> = vec![manager];
        team.extend(members.iter());
        let rate_team: Vec<(TitleId, i64)> = team.iter().map(|c| (c.title, c.salary)).collect();
        let financials = crate::financials::plan_financials(
            p,
            workforce,
            kind,
            today,
            planned_hours,
            &rate_team,
            &deliverables,
            rng,
        );

        let meta = ProjectMeta {
            team: team.iter().map(|c| c.id.clone()).collect(),
            deliverable_targets: targets,
            target_hours,
            target_team_size: team_size,
            remaining_slots,
            scheduled_expenses: financials.scheduled_expenses.clone(),
            estimated_cost: financials.estimated_cost,
            estimated_revenue: financials.estimated_revenue,
        };
        projects.add_project(Project {
            id,
            client,
            unit,
            name,
            kind,
            status: ProjectStatus::NotStarted,
            planned_start,
            planned_end,
            actual_start,
            actual_end: None,
            price: financials.price,
            estimated_budget: financials.estimated_budget,
            planned_hours,
            actual_hours: 0.0,
            progress: 0,
            created_at,
            meta,
        })?;

        let prices = match financials.price {
            Some(price) => crate::financials::distribute_price(price, &deliverables),
            None => Vec::new(),
        };
        for (i, mut d) in deliverables.into_iter().enumerate() {
            if let Some(share) = prices.get(i) {
                d.price = Some(*share);
            }
            projects.add_deliverable(d)?;
        }
        if kind == ProjectKind::TimeAndMaterial {
            for (title, rate) in &financials.rates {
                projects.add_billing_rate(sim_core::BillingRate {
                    project: id,
                    title: TitleId(*title),
                    rate: *rate,
                })?;
            }
        }

        // Roles: manager first, then up to three senior leads in pool order.
        let mut leads = 0;
        for (i, member) in team.iter().enumerate() {
            let role = if i == 0 {
                TeamRole::ProjectManager
            } else if leads < MAX_TEAM_LEADS && member.title.0 >= TEAM_LEAD_TITLE_THRESHOLD {
                leads += 1;
                TeamRole::TeamLead
            } else {
                TeamRole::TeamMember
            };
            projects.add_assignment(TeamAssignment {
                project: id,
                consultant: member.id.clone(),
                role,
                start: actual_start,
                end: None,
            })?;
            if let Some(c) = workforce.consultant_mut(&member.id) {
                c.meta.active_projects += 1;
                c.meta.last_project_date = Some(today);
            }
        }

        debug!(
            project = %id,
            manager = %manager.id,
            kind = kind.as_str(),
            team = team.len(),
            %planned_start,
            %planned_end,
            "project created"
        );
        Ok(id)
    }
}

/// Rank candidates by load, then seniority, then id for determinism.
pub(crate) fn sort_candidates(pool: &mut [Candidate]) {
    pool.sort_by(|a, b| {
        a.active
            .cmp(&b.active)
            .then_with(|| b.title.cmp(&a.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Staffable consultants whose title does not exceed the manager's and who
/// still have a free project slot.
pub(crate) fn build_pool(
    workforce: &WorkforceStore,
    projects: &ProjectStore,
    cfg: &SimConfig,
    date: NaiveDate,
    max_title: TitleId,
    exclude: &ConsultantId,
) -> Vec<Candidate> {
    let oracle = CapacityOracle::new(&cfg.projects);
    let mut pool: Vec<Candidate> = workforce
        .consultants_employed_on(date)
        .into_iter()
        .filter(|c| &c.id != exclude)
        .filter_map(|c| {
            let title = workforce.latest_title_id(&c.id, date)?;
            if title > max_title {
                return None;
            }
            let active = projects.active_count(&c.id);
            if oracle.free_slots(title, active) == 0 {
                return None;
            }
            let open = workforce.open_entry(&c.id)?;
            Some(Candidate {
                id: c.id.clone(),
                title,
                active,
                salary: open.salary,
            })
        })
        .collect();
    sort_candidates(&mut pool);
    pool
}

/// Fill `slots` seats following the per-title team distribution; unfilled
/// seats stay open for the daily top-up.
pub(crate) fn select_by_distribution(
    pool: &[Candidate],
    slots: usize,
    cfg: &sim_core::ProjectsConfig,
) -> Vec<Candidate> {
    let mut picked: Vec<Candidate> = Vec::new();
    for title in TitleId::all() {
        if picked.len() >= slots {
            break;
        }
        let want = (slots as f64 * cfg.team_share(title)).round() as usize;
        let take = want.min(slots - picked.len());
        let chosen: Vec<Candidate> = pool
            .iter()
            .filter(|c| c.title == title)
            .take(take)
            .cloned()
            .collect();
        picked.extend(chosen);
    }
    picked
}

/// Earliest day the manager can take a new project: the day after their
/// latest closed assignment, never before today.
fn manager_availability(
    projects: &ProjectStore,
    manager: &ConsultantId,
    today: NaiveDate,
) -> NaiveDate {
    projects
        .assignments()
        .filter(|a| &a.consultant == manager)
        .filter_map(|a| a.end)
        .max()
        .map(|end| (end + Duration::days(1)).max(today))
        .unwrap_or(today)
}

fn draw_duration_months(cfg: &sim_core::ProjectsConfig, rng: &mut SimRng) -> u32 {
    let weights: Vec<f64> = cfg.duration_buckets.iter().map(|b| b.weight).collect();
    let bucket = *rng.weighted_choice(&cfg.duration_buckets, &weights);
    rng.int_in_range(bucket.min_months as i64, bucket.max_months as i64) as u32
}

/// Overrun most of the time, occasionally an early finish.
fn target_factor(cfg: &sim_core::ProjectsConfig, rng: &mut SimRng) -> f64 {
    if rng.chance(cfg.underrun_chance) {
        rng.uniform(cfg.underrun_range.0, cfg.underrun_range.1)
    } else {
        rng.uniform(cfg.overrun_range.0, cfg.overrun_range.1)
    }
}

/// Pick the unit with the widest gap between its share of employed
/// consultants and its share of this year's projects.
fn assign_unit(
    workforce: &WorkforceStore,
    projects: &ProjectStore,
    today: NaiveDate,
) -> Result<UnitId, SimError> {
    let employed = workforce.consultants_employed_on(today);
    if employed.is_empty() {
        return Err(SimError::EmptyPool("Consultant"));
    }
    let mut unit_counts: HashMap<UnitId, u32> = HashMap::new();
    for c in &employed {
        *unit_counts.entry(c.business_unit).or_insert(0) += 1;
    }
    let total = employed.len() as f64;
    let project_counts = projects.projects_per_unit_in_year(today.year());
    let total_projects: u32 = project_counts.values().sum();

    let mut best: Option<(UnitId, f64)> = None;
    let mut units: Vec<UnitId> = unit_counts.keys().copied().collect();
    units.sort();
    for unit in units {
        let target_share = unit_counts[&unit] as f64 / total;
        // First project of the year: no unit has a share yet, so the gap
        // reduces to the employed share alone.
        let current_share = if total_projects == 0 {
            0.0
        } else {
            project_counts.get(&unit).copied().unwrap_or(0) as f64 / total_projects as f64
        };
        let gap = target_share - current_share;
        if best.map_or(true, |(_, g)| gap > g) {
            best = Some((unit, gap));
        }
    }
    Ok(best.map(|(u, _)| u).unwrap_or(UnitId(1)))
}

/// Partition the target hours over 3..=7 deliverables; the last takes the
/// remainder, due dates follow each deliverable's share of the window, and
/// planned hours are scaled back so they sum exactly to the project's
/// planned hours.
#[allow(clippy::too_many_arguments)]
fn plan_deliverables(
    projects: &mut ProjectStore,
    project: ProjectId,
    planned_start: NaiveDate,
    planned_end: NaiveDate,
    planned_hours: f64,
    target_hours: f64,
    cfg: &sim_core::ProjectsConfig,
    rng: &mut SimRng,
) -> (Vec<Deliverable>, BTreeMap<u32, f64>) {
    let count = rng.int_in_range(
        cfg.deliverable_count_range.0 as i64,
        cfg.deliverable_count_range.1 as i64,
    ) as usize;
    let min_hours = cfg.min_deliverable_hours;

    let mut shares = Vec::with_capacity(count);
    let mut remaining = target_hours;
    for i in 0..count {
        if i == count - 1 {
            shares.push(remaining.max(min_hours));
        } else {
            let reserve = (count - i - 1) as f64 * min_hours;
            let max_hours = (remaining - reserve).max(min_hours);
            let share =
                rng.int_in_range(min_hours as i64, max_hours.floor() as i64) as f64;
            let share = share.min(remaining.max(min_hours));
            shares.push(share);
            remaining -= share;
        }
    }

    let duration_days = (planned_end - planned_start).num_days().max(1);
    let ratio = planned_hours / target_hours.max(1.0);
    let mut deliverables = Vec::with_capacity(count);
    let mut targets = BTreeMap::new();
    let mut start = planned_start;
    let mut cumulative = 0.0;
    let mut planned_assigned = 0.0;
    for (i, share) in shares.iter().enumerate() {
        cumulative += share;
        let id = projects.next_deliverable_id();
        let due = if i == count - 1 {
            planned_end
        } else {
            let fraction = cumulative / target_hours.max(1.0);
            let proportional =
                planned_start + Duration::days((fraction * duration_days as f64) as i64);
            let reserve = Duration::days((count - 1 - i) as i64);
            proportional.min(planned_end - reserve).max(start)
        };
        let planned = if i == count - 1 {
            round_hours(planned_hours - planned_assigned)
        } else {
            let p = round_hours(share * ratio);
            planned_assigned += p;
            p
        };
        targets.insert(id.0, *share);
        deliverables.push(Deliverable {
            id,
            project,
            name: format!("Deliverable {}", i + 1),
            planned_start: start,
            actual_start: None,
            due,
            submitted: None,
            invoiced: None,
            status: DeliverableStatus::NotStarted,
            planned_hours: planned,
            actual_hours: 0.0,
            progress: 0,
            price: None,
        });
        start = due + Duration::days(1);
    }
    (deliverables, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::SimConfig;
    use sim_workforce::WorkforceSimulator;

    fn setup(initial: u32, seed: u64) -> (SimConfig, WorkforceStore, SimRng, RefData) {
        let mut cfg = SimConfig::from_default_yaml().unwrap();
        cfg.initial_consultants = initial;
        cfg.horizon_start_year = 2015;
        cfg.horizon_end_year = 2016;
        let mut rng = SimRng::seed_from(seed);
        let refdata = RefData::generate(&cfg, &mut rng).unwrap();
        let mut workforce = WorkforceStore::new();
        let mut sim = WorkforceSimulator::new(2015);
        sim.seed_initial_roster(&mut workforce, &cfg, &mut rng).unwrap();
        sim.run_year(&mut workforce, &cfg, &mut rng, 2015).unwrap();
        (cfg, workforce, rng, refdata)
    }

    #[test]
    fn monthly_run_creates_projects_with_full_shape() {
        let (cfg, mut workforce, mut rng, refdata) = setup(60, 42);
        let mut projects = ProjectStore::new();
        let calendar = Calendar::new(2015, 2016).unwrap();
        let mut creator = ProjectCreator::new(&cfg, calendar);
        creator.begin_year(&cfg, 2015, &mut rng);
        let created = creator
            .run_month(
                &mut workforce,
                &mut projects,
                &refdata,
                &cfg,
                &mut rng,
                NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            )
            .unwrap();
        assert!(created > 0, "expected projects in month one");
        for p in projects.projects() {
            assert_eq!(p.status, ProjectStatus::NotStarted);
            assert!(p.planned_end > p.planned_start);
            assert!(p.actual_start >= p.planned_start);
            assert!(p.created_at >= calendar.start());
            let ds = projects.deliverables_of(p.id);
            assert!((3..=7).contains(&ds.len()));
            // Deliverable planned hours partition the project's.
            let total: f64 = ds.iter().map(|d| d.planned_hours).sum();
            assert!(
                (total - p.planned_hours).abs() < 0.5,
                "partition {total} vs {}",
                p.planned_hours
            );
            // Contiguous windows covering the planned range.
            assert_eq!(ds[0].planned_start, p.planned_start);
            assert_eq!(ds.last().unwrap().due, p.planned_end);
            for pair in ds.windows(2) {
                assert_eq!(pair[1].planned_start, pair[0].due + Duration::days(1));
            }
            match p.kind {
                ProjectKind::Fixed => {
                    assert!(p.price.is_some());
                    assert!(p.estimated_budget.is_none());
                    let total: rust_decimal::Decimal =
                        ds.iter().filter_map(|d| d.price).sum();
                    assert_eq!(total, p.price.unwrap());
                }
                ProjectKind::TimeAndMaterial => {
                    assert!(p.price.is_none());
                    assert!(p.estimated_budget.is_some());
                    assert_eq!(projects.billing_rates_of(p.id).len(), 6);
                }
            }
            // Exactly one manager, assignments open at actual start.
            let team = projects.assignments_of_project(p.id);
            assert_eq!(
                team.iter()
                    .filter(|a| a.role == TeamRole::ProjectManager)
                    .count(),
                1
            );
            assert!(team.iter().all(|a| a.start == p.actual_start && a.end.is_none()));
            assert!(team.len() <= cfg.projects.max_team_size);
        }
    }

    #[test]
    fn pm_concurrency_caps_are_respected() {
        let (cfg, mut workforce, mut rng, refdata) = setup(40, 7);
        let mut projects = ProjectStore::new();
        let calendar = Calendar::new(2015, 2016).unwrap();
        let mut creator = ProjectCreator::new(&cfg, calendar);
        creator.begin_year(&cfg, 2015, &mut rng);
        for month in 1..=6 {
            let d = NaiveDate::from_ymd_opt(2015, month, 1).unwrap();
            creator
                .run_month(&mut workforce, &mut projects, &refdata, &cfg, &mut rng, d)
                .unwrap();
        }
        let date = NaiveDate::from_ymd_opt(2015, 6, 30).unwrap();
        for c in workforce.consultants_employed_on(date) {
            let title = workforce.latest_title_id(&c.id, date).unwrap();
            assert!(
                projects.active_count(&c.id) <= cfg.projects.max_projects(title),
                "{} exceeds concurrency cap",
                c.id
            );
        }
    }

    #[test]
    fn team_members_never_outrank_their_manager() {
        let (cfg, mut workforce, mut rng, refdata) = setup(60, 11);
        let mut projects = ProjectStore::new();
        let calendar = Calendar::new(2015, 2016).unwrap();
        let mut creator = ProjectCreator::new(&cfg, calendar);
        creator.begin_year(&cfg, 2015, &mut rng);
        let d = NaiveDate::from_ymd_opt(2015, 3, 2).unwrap();
        creator
            .run_month(&mut workforce, &mut projects, &refdata, &cfg, &mut rng, d)
            .unwrap();
        for p in projects.projects() {
            let team = projects.assignments_of_project(p.id);
            let pm_title = team
                .iter()
                .find(|a| a.role == TeamRole::ProjectManager)
                .and_then(|a| workforce.latest_title_id(&a.consultant, d))
                .unwrap();
            for a in team {
                let t = workforce.latest_title_id(&a.consultant, d).unwrap();
                assert!(t <= pm_title, "member {} outranks manager", a.consultant);
            }
        }
    }
}

//! Quantified invariants verified over a complete three-year run.

use chrono::{Duration, NaiveDate};
use std::sync::OnceLock;

use sim_core::{Calendar, DeliverableStatus, ProjectKind, ProjectStatus, RefData, SimConfig, SimRng};
use sim_projects::{DailyWorkAllocator, ProjectCreator, ProjectStore, StateAdvancer};
use sim_runtime::{run, SimulationOutput};
use sim_workforce::{WorkforceSimulator, WorkforceStore};

fn output() -> &'static SimulationOutput {
    static OUT: OnceLock<SimulationOutput> = OnceLock::new();
    OUT.get_or_init(|| {
        let mut cfg = SimConfig::from_default_yaml().unwrap();
        cfg.horizon_start_year = 2015;
        cfg.horizon_end_year = 2017;
        cfg.initial_consultants = 20;
        cfg.seed = 42;
        run(&cfg).unwrap()
    })
}

fn cfg() -> SimConfig {
    let mut cfg = SimConfig::from_default_yaml().unwrap();
    cfg.horizon_start_year = 2015;
    cfg.horizon_end_year = 2017;
    cfg.initial_consultants = 20;
    cfg.seed = 42;
    cfg
}

#[test]
fn title_histories_are_well_formed() {
    let out = output();
    // Gapless, non-overlapping, Hire first, terminal last, single open entry.
    out.workforce.validate().unwrap();
    for c in out.workforce.consultants() {
        let entries = out.workforce.entries_for(&c.id);
        let open_count = entries.iter().filter(|e| e.end.is_none()).count();
        let employed_at_end = out.workforce.entry_on(&c.id, out.calendar.end()).is_some()
            && !entries.last().unwrap().event.is_terminal();
        assert_eq!(
            open_count == 1,
            employed_at_end,
            "{}: open entry iff employed at horizon end",
            c.id
        );
    }
}

#[test]
fn team_assignments_stay_within_employment() {
    let out = output();
    for a in out.projects.assignments() {
        let project = out.projects.project(a.project).unwrap();
        let mut end = a.end.unwrap_or(out.calendar.end());
        if let Some(project_end) = project.actual_end {
            end = end.min(project_end);
        }
        end = end.min(out.calendar.end());
        let mut day = a.start;
        while day <= end {
            assert!(
                out.workforce.entry_on(&a.consultant, day).is_some(),
                "{} assigned to {} on {} while not employed",
                a.consultant,
                a.project,
                day
            );
            day += Duration::days(1);
        }
    }
}

#[test]
fn every_time_charge_is_reachable_and_dated_sanely() {
    let out = output();
    for charge in out.projects.time_charges() {
        assert!(charge.hours > 0.0);
        assert!(sim_core::is_working_day(charge.date));
        assert!(
            out.workforce.entry_on(&charge.consultant, charge.date).is_some(),
            "{} charged while not employed",
            charge.consultant
        );
        let deliverable = out.projects.deliverable(charge.deliverable).unwrap();
        let project = out.projects.project(deliverable.project).unwrap();
        assert!(charge.date >= project.actual_start);
        assert!(charge.date <= project.actual_end.unwrap_or(out.calendar.end()));
    }
}

#[test]
fn daily_hour_caps_hold() {
    let out = output();
    let cfg = cfg();
    use std::collections::HashMap;
    let mut by_day: HashMap<(String, NaiveDate), f64> = HashMap::new();
    for c in out.projects.time_charges() {
        *by_day
            .entry((c.consultant.0.clone(), c.date))
            .or_insert(0.0) += c.hours;
    }
    for ((id, date), hours) in by_day {
        let cid = sim_core::ConsultantId(id);
        let title = out.workforce.latest_title_id(&cid, date).unwrap();
        assert!(hours <= cfg.projects.daily_cap(title) + 1e-6);
    }
}

#[test]
fn concurrency_caps_hold_at_every_month_start() {
    let out = output();
    let cfg = cfg();
    for (year, month) in out.calendar.months() {
        let d = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        for c in out.workforce.consultants() {
            let Some(title) = out.workforce.latest_title_id(&c.id, d) else {
                continue;
            };
            let mut seen: Vec<sim_core::ProjectId> = Vec::new();
            for a in out.projects.open_assignments(&c.id, d) {
                if !seen.contains(&a.project) {
                    seen.push(a.project);
                }
            }
            assert!(
                seen.len() as u32 <= cfg.projects.max_projects(title),
                "{} holds {} projects on {} at title {}",
                c.id,
                seen.len(),
                d,
                title
            );
        }
    }
}

#[test]
fn deliverables_partition_planned_time_and_hours() {
    let out = output();
    for p in out.projects.projects() {
        let ds = out.projects.deliverables_of(p.id);
        assert!(!ds.is_empty());
        let total: f64 = ds.iter().map(|d| d.planned_hours).sum();
        assert!(
            (total - p.planned_hours).abs() < 0.5,
            "{}: deliverable hours {} vs planned {}",
            p.id,
            total,
            p.planned_hours
        );
        assert_eq!(ds[0].planned_start, p.planned_start);
        assert_eq!(ds.last().unwrap().due, p.planned_end);
        for pair in ds.windows(2) {
            assert_eq!(
                pair[1].planned_start,
                pair[0].due + Duration::days(1),
                "{}: deliverable windows must be contiguous",
                p.id
            );
            assert!(pair[0].due >= pair[0].planned_start);
        }
    }
}

#[test]
fn fixed_prices_partition_and_tm_rates_cover() {
    let out = output();
    for p in out.projects.projects() {
        match p.kind {
            ProjectKind::Fixed => {
                let price = p.price.expect("fixed projects carry a price");
                assert!(p.estimated_budget.is_none());
                let total: rust_decimal::Decimal = out
                    .projects
                    .deliverables_of(p.id)
                    .iter()
                    .filter_map(|d| d.price)
                    .sum();
                assert_eq!(total, price, "{}: deliverable prices drift", p.id);
            }
            ProjectKind::TimeAndMaterial => {
                assert!(p.price.is_none());
                assert!(p.estimated_budget.is_some());
                let mut titles: Vec<u8> = out
                    .projects
                    .billing_rates_of(p.id)
                    .iter()
                    .map(|r| r.title.0)
                    .collect();
                titles.sort_unstable();
                assert_eq!(titles, vec![1, 2, 3, 4, 5, 6]);
            }
        }
    }
}

#[test]
fn progress_is_monotone_across_the_run() {
    use std::collections::HashMap;

    // Replay the driver loop by hand so progress can be sampled after every
    // working day's state advancement.
    let mut cfg = SimConfig::from_default_yaml().unwrap();
    cfg.horizon_start_year = 2015;
    cfg.horizon_end_year = 2015;
    cfg.initial_consultants = 30;
    cfg.seed = 42;
    cfg.validate().unwrap();
    let calendar = Calendar::new(2015, 2015).unwrap();
    let mut rng = SimRng::seed_from(cfg.seed);
    let refdata = RefData::generate(&cfg, &mut rng).unwrap();
    let mut workforce = WorkforceStore::new();
    let mut projects = ProjectStore::new();
    let mut workforce_sim = WorkforceSimulator::new(2015);
    workforce_sim
        .seed_initial_roster(&mut workforce, &cfg, &mut rng)
        .unwrap();
    let mut creator = ProjectCreator::new(&cfg, calendar);
    let allocator = DailyWorkAllocator::new(calendar);
    let advancer = StateAdvancer::new(calendar);

    let mut histories: HashMap<u32, Vec<u8>> = HashMap::new();
    for year in calendar.years() {
        workforce_sim
            .run_year(&mut workforce, &cfg, &mut rng, year)
            .unwrap();
        creator.begin_year(&cfg, year, &mut rng);
        for month in 1..=12u32 {
            let month_start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            creator
                .run_month(&mut workforce, &mut projects, &refdata, &cfg, &mut rng, month_start)
                .unwrap();
            for day in calendar.working_days_in_month(year, month) {
                allocator
                    .run_day(&mut workforce, &mut projects, &cfg, &mut rng, day)
                    .unwrap();
                advancer
                    .end_of_day(&mut workforce, &mut projects, &cfg, &mut rng, day)
                    .unwrap();
                for p in projects.projects() {
                    histories.entry(p.id.0).or_default().push(p.progress);
                }
            }
            allocator.emit_monthly_expenses(&mut projects, year, month).unwrap();
        }
    }

    assert!(!histories.is_empty(), "the run produced no projects");
    let mut advanced = false;
    for (pid, samples) in &histories {
        assert!(
            samples.windows(2).all(|w| w[0] <= w[1]),
            "project {pid} progress regressed: {samples:?}"
        );
        if samples.windows(2).any(|w| w[1] > w[0]) {
            advanced = true;
        }
    }
    assert!(advanced, "no project ever gained progress");
}

#[test]
fn expenses_are_dated_inside_active_windows() {
    let out = output();
    for e in out.projects.expenses() {
        let p = out.projects.project(e.project).unwrap();
        assert!(e.date >= p.actual_start, "{}: expense predates start", p.id);
        let window_end = p.actual_end.unwrap_or(out.calendar.end()).min(out.calendar.end());
        assert!(e.date <= window_end, "{}: expense after window", p.id);
        assert!(e.amount > rust_decimal::Decimal::ZERO);
    }
}

#[test]
fn state_closure_holds() {
    let out = output();
    for p in out.projects.projects() {
        match p.status {
            ProjectStatus::Completed => {
                assert!(p.actual_end.is_some());
                assert_eq!(p.progress, 100);
                for d in out.projects.deliverables_of(p.id) {
                    assert_eq!(d.status, DeliverableStatus::Completed);
                    assert!(d.submitted.is_some());
                    if p.kind == ProjectKind::Fixed {
                        assert!(d.invoiced.is_some());
                    }
                }
            }
            ProjectStatus::Cancelled => {
                assert!(p.actual_end.is_none());
                assert_eq!(p.actual_hours, 0.0);
            }
            ProjectStatus::NotStarted => {
                assert!(p.actual_start <= out.calendar.end());
            }
            ProjectStatus::InProgress => {}
        }
        // Closed projects leave no open assignments behind.
        if p.status.is_closed() {
            assert!(out
                .projects
                .assignments_of_project(p.id)
                .iter()
                .all(|a| a.end.is_some()));
        }
    }
}

#[test]
fn exactly_one_manager_per_project() {
    let out = output();
    for p in out.projects.projects() {
        let managers = out
            .projects
            .assignments_of_project(p.id)
            .iter()
            .filter(|a| a.role == sim_core::TeamRole::ProjectManager)
            .count();
        assert_eq!(managers, 1, "{} has {} managers", p.id, managers);
    }
}

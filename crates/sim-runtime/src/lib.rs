#![deny(warnings)]

//! Batch driver for the consulting-firm data factory.
//!
//! Steps time in a strict outer loop (years, then months, then working
//! days). The workforce simulator runs once per year before any project
//! work; the project creator runs at each month start; the allocator and
//! state advancer run on every working day; expenses flush at month end and
//! payroll derives once at the end of the horizon.

use chrono::NaiveDate;
use tracing::info;

use sim_core::{Calendar, PayrollRecord, RefData, SimConfig, SimError, SimRng};
use sim_projects::{DailyWorkAllocator, ProjectCreator, ProjectStore, StateAdvancer, StoreCounts};
use sim_workforce::{generate_payroll, WorkforceSimulator, WorkforceStore, YearStats};

/// One simulated year's outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct YearSummary {
    pub workforce: YearStats,
    pub projects_created: u32,
    pub projects_completed: u32,
    pub projects_cancelled: u32,
}

/// Structured result of a full run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub years: Vec<YearSummary>,
    pub counts: Option<StoreCounts>,
    pub consultants: usize,
    pub payroll_records: usize,
}

impl RunSummary {
    pub fn total_projects_created(&self) -> u32 {
        self.years.iter().map(|y| y.projects_created).sum()
    }

    pub fn total_promotions(&self) -> u32 {
        self.years.iter().map(|y| y.workforce.promotions).sum()
    }
}

/// The completed stores plus the run summary.
#[derive(Debug)]
pub struct SimulationOutput {
    pub calendar: Calendar,
    pub refdata: RefData,
    pub workforce: WorkforceStore,
    pub projects: ProjectStore,
    pub payroll: Vec<PayrollRecord>,
    pub summary: RunSummary,
}

/// Run the whole simulation for the configured horizon.
pub fn run(cfg: &SimConfig) -> Result<SimulationOutput, SimError> {
    cfg.validate()?;
    let calendar = Calendar::new(cfg.horizon_start_year, cfg.horizon_end_year)
        .ok_or_else(|| SimError::ConfigError("invalid horizon".into()))?;
    let mut rng = SimRng::seed_from(cfg.seed);

    // Reference data must exist before the workforce simulator runs.
    let refdata = RefData::generate(cfg, &mut rng)?;
    let mut workforce = WorkforceStore::new();
    let mut projects = ProjectStore::new();

    let mut workforce_sim = WorkforceSimulator::new(cfg.horizon_start_year);
    workforce_sim.seed_initial_roster(&mut workforce, cfg, &mut rng)?;

    let mut creator = ProjectCreator::new(cfg, calendar);
    let allocator = DailyWorkAllocator::new(calendar);
    let advancer = StateAdvancer::new(calendar);

    let mut years = Vec::new();
    for year in calendar.years() {
        // Workforce first, so the year's staffing pool exists.
        let workforce_stats = workforce_sim.run_year(&mut workforce, cfg, &mut rng, year)?;
        creator.begin_year(cfg, year, &mut rng);

        let mut summary = YearSummary {
            workforce: workforce_stats,
            ..YearSummary::default()
        };
        for month in 1..=12u32 {
            let month_start = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| SimError::ConfigError(format!("invalid month {year}-{month}")))?;
            summary.projects_created += creator.run_month(
                &mut workforce,
                &mut projects,
                &refdata,
                cfg,
                &mut rng,
                month_start,
            )?;
            for day in calendar.working_days_in_month(year, month) {
                allocator.run_day(&mut workforce, &mut projects, cfg, &mut rng, day)?;
                let outcome = advancer.end_of_day(&mut workforce, &mut projects, cfg, &mut rng, day)?;
                summary.projects_completed += outcome.completed;
                summary.projects_cancelled += outcome.cancelled;
            }
            allocator.emit_monthly_expenses(&mut projects, year, month)?;
        }
        advancer.rederive_active_counts(&mut workforce, &projects);
        years.push(summary);
    }

    // The finished history must satisfy the title-history contract.
    workforce.validate()?;
    let payroll = generate_payroll(&workforce, &calendar, &mut rng);

    let summary = RunSummary {
        consultants: workforce.len(),
        payroll_records: payroll.len(),
        counts: Some(projects.counts()),
        years,
    };
    info!(
        consultants = summary.consultants,
        projects = summary.counts.map(|c| c.projects).unwrap_or(0),
        payroll = summary.payroll_records,
        "simulation complete"
    );
    Ok(SimulationOutput {
        calendar,
        refdata,
        workforce,
        projects,
        payroll,
        summary,
    })
}

#![deny(warnings)]

//! Command-line wrapper: runs the simulation, flushes the SQLite database
//! and writes the report artifacts.
//!
//! Usage: `consultsim generate --start YEAR --end YEAR --consultants N
//! [--seed S] [--out PATH]`

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use sim_core::{SimConfig, SimRng};

struct Args {
    start: i32,
    end: i32,
    consultants: u32,
    seed: Option<u64>,
    out: PathBuf,
}

const USAGE: &str =
    "usage: consultsim generate --start YEAR --end YEAR --consultants N [--seed S] [--out PATH]";

fn parse_args() -> Result<Args> {
    let mut it = std::env::args().skip(1);
    match it.next().as_deref() {
        Some("generate") => {}
        _ => bail!("{USAGE}"),
    }
    let mut start = None;
    let mut end = None;
    let mut consultants = None;
    let mut seed = None;
    let mut out = None;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--start" => start = it.next().and_then(|s| s.parse().ok()),
            "--end" => end = it.next().and_then(|s| s.parse().ok()),
            "--consultants" => consultants = it.next().and_then(|s| s.parse().ok()),
            "--seed" => seed = it.next().and_then(|s| s.parse().ok()),
            "--out" => out = it.next().map(PathBuf::from),
            other => bail!("unknown argument `{other}`\n{USAGE}"),
        }
    }
    let (Some(start), Some(end), Some(consultants)) = (start, end, consultants) else {
        bail!("{USAGE}");
    };
    Ok(Args {
        start,
        end,
        consultants,
        seed,
        out: out.unwrap_or_else(|| PathBuf::from("./saves/consultfirm.db")),
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    let mut cfg = SimConfig::from_default_yaml().context("loading default configuration")?;
    cfg.horizon_start_year = args.start;
    cfg.horizon_end_year = args.end;
    cfg.initial_consultants = args.consultants;
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    info!(
        start = cfg.horizon_start_year,
        end = cfg.horizon_end_year,
        consultants = cfg.initial_consultants,
        seed = cfg.seed,
        "starting generation"
    );

    let output = sim_runtime::run(&cfg)?;
    for year in &output.summary.years {
        println!(
            "Year {} | headcount: {} | hires: {} | promotions: {} | attrition: {} | layoffs: {} | projects: {} created, {} completed, {} cancelled",
            year.workforce.year,
            year.workforce.ending_headcount,
            year.workforce.hires,
            year.workforce.promotions,
            year.workforce.attritions,
            year.workforce.layoffs,
            year.projects_created,
            year.projects_completed,
            year.projects_cancelled
        );
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent).context("creating output directory")?;
    }
    let url = persistence::file_url(&args.out);
    let rt = tokio::runtime::Runtime::new()?;
    let rows = rt.block_on(async {
        let pool = persistence::init_db(&url).await?;
        persistence::flush_run(
            &pool,
            &output.refdata,
            &output.workforce,
            &output.projects,
            &output.payroll,
        )
        .await
    })?;
    println!("Database written: {} | rows: {}", args.out.display(), rows);

    let report_dir = args.out.parent().unwrap_or_else(|| std::path::Path::new("."));
    let indirect = reports::generate_indirect_costs(
        &output.projects,
        &reports::IndirectCostParams {
            seed: cfg.seed,
            ..reports::IndirectCostParams::default()
        },
    );
    reports::write_indirect_costs(report_dir.join("indirect_costs.parquet"), &indirect)?;

    let non_billable = reports::generate_non_billable_time(
        &output.workforce,
        &output.projects,
        &output.payroll,
        cfg.projects.working_hours_per_month,
    );
    reports::write_non_billable_time(
        report_dir.join("non_billable_time.parquet"),
        &non_billable,
    )?;

    let mut feedback_rng = SimRng::seed_from(cfg.seed);
    let feedback = reports::generate_client_feedback(&output.projects, &mut feedback_rng);
    reports::write_client_feedback(report_dir.join("client_feedback.json"), &feedback)?;

    let (project_count, charge_count) = output
        .summary
        .counts
        .map(|c| (c.projects, c.time_charges))
        .unwrap_or((0, 0));
    println!(
        "Artifacts | indirect-cost rows: {} | non-billable rows: {} | feedback records: {} | projects: {} | time charges: {}",
        indirect.len(),
        non_billable.len(),
        feedback.len(),
        project_count,
        charge_count
    );
    Ok(())
}

//! Indirect-cost table: per business unit per month, non-project labor and
//! other expense costs with inflation drift, seasonality, month-to-month
//! dependency and rare outliers.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use sim_core::{month_end, SimRng, UnitId};
use sim_projects::ProjectStore;

use crate::parquet_out::{open_writer, write_f64, write_i64, write_utf8, Column};

/// Tunables for the indirect-cost model; defaults mirror the firm's
/// historical cost profile.
#[derive(Clone, Debug)]
pub struct IndirectCostParams {
    pub mean_labor_cost: f64,
    pub stddev_labor_cost: f64,
    pub mean_other_expense: f64,
    pub stddev_other_expense: f64,
    pub outlier_probability: f64,
    pub outlier_multiplier_range: (f64, f64),
    pub base_inflation_rate: f64,
    pub inflation_fluctuation_range: (f64, f64),
    pub seasonality_amplitude: f64,
    pub dependency_factor: f64,
    pub initial_cost_multiplier: f64,
    pub business_unit_buffer_days: i64,
    pub seed: u64,
}

impl Default for IndirectCostParams {
    fn default() -> Self {
        IndirectCostParams {
            mean_labor_cost: 125_000.0,
            stddev_labor_cost: 5_000.0,
            mean_other_expense: 30_000.0,
            stddev_other_expense: 3_000.0,
            outlier_probability: 0.01,
            outlier_multiplier_range: (1.1, 1.3),
            base_inflation_rate: 0.005,
            inflation_fluctuation_range: (-0.0005, 0.0005),
            seasonality_amplitude: 0.05,
            dependency_factor: 0.5,
            initial_cost_multiplier: 2.0,
            business_unit_buffer_days: 30,
            seed: 42,
        }
    }
}

/// One output row.
#[derive(Clone, Debug, PartialEq)]
pub struct IndirectCostRow {
    pub month: String,
    pub unit: UnitId,
    pub labor_cost: f64,
    pub other_expense: f64,
    pub total: f64,
}

/// Generate the table over [earliest planned start, latest planned end].
pub fn generate_indirect_costs(
    projects: &ProjectStore,
    params: &IndirectCostParams,
) -> Vec<IndirectCostRow> {
    let mut rng = SimRng::seed_from(params.seed);
    let Some(earliest) = projects.projects().map(|p| p.planned_start).min() else {
        return Vec::new();
    };
    let latest = projects
        .projects()
        .map(|p| p.planned_end)
        .max()
        .unwrap_or(earliest);

    // A unit joins the table a buffer ahead of its first project.
    let mut unit_starts: BTreeMap<UnitId, NaiveDate> = BTreeMap::new();
    for p in projects.projects() {
        unit_starts
            .entry(p.unit)
            .and_modify(|d| *d = (*d).min(p.planned_start))
            .or_insert(p.planned_start);
    }
    for start in unit_starts.values_mut() {
        *start = *start - Duration::days(params.business_unit_buffer_days);
    }

    let months = month_sequence(earliest, latest);
    let mut inflation = params.base_inflation_rate;
    let mut prev_labor: BTreeMap<UnitId, f64> =
        unit_starts.keys().map(|u| (*u, params.mean_labor_cost)).collect();
    let mut prev_other: BTreeMap<UnitId, f64> = unit_starts
        .keys()
        .map(|u| (*u, params.mean_other_expense))
        .collect();

    let mut rows = Vec::new();
    for (i, month_start) in months.iter().enumerate() {
        inflation += rng.uniform(
            params.inflation_fluctuation_range.0,
            params.inflation_fluctuation_range.1,
        );
        let labor_mean = params.mean_labor_cost * (1.0 + inflation);
        let other_mean = params.mean_other_expense * (1.0 + inflation);
        let seasonality =
            1.0 + params.seasonality_amplitude * (std::f64::consts::PI * i as f64 / 12.0).sin();

        for (unit, unit_start) in &unit_starts {
            if month_start < unit_start {
                continue;
            }
            let mut labor = rng.normal(labor_mean, params.stddev_labor_cost).max(0.0);
            let mut other = rng.normal(other_mean, params.stddev_other_expense).max(0.0);
            labor *= seasonality;
            other *= seasonality;

            let first_month_for_unit =
                i == 0 || (month_start.year(), month_start.month()) == (unit_start.year(), unit_start.month());
            if first_month_for_unit {
                labor *= params.initial_cost_multiplier;
                other *= params.initial_cost_multiplier;
            } else {
                labor += params.dependency_factor * prev_labor[unit];
                other += params.dependency_factor * prev_other[unit];
            }
            if rng.chance(params.outlier_probability) {
                let mult = rng.uniform(
                    params.outlier_multiplier_range.0,
                    params.outlier_multiplier_range.1,
                );
                labor *= mult;
                other *= mult;
            }

            labor = (labor * 100.0).round() / 100.0;
            other = (other * 100.0).round() / 100.0;
            rows.push(IndirectCostRow {
                month: month_start.format("%b-%y").to_string(),
                unit: *unit,
                labor_cost: labor,
                other_expense: other,
                total: labor + other,
            });
            prev_labor.insert(*unit, labor);
            prev_other.insert(*unit, other);
        }
    }
    rows
}

/// Write the table to a parquet file.
pub fn write_indirect_costs<P: AsRef<Path>>(path: P, rows: &[IndirectCostRow]) -> Result<()> {
    let mut writer = open_writer(
        &path,
        "indirect_costs",
        &[
            Column::Utf8("month"),
            Column::Int64("business_unit_id"),
            Column::Double("non_project_labor_cost"),
            Column::Double("other_expense_cost"),
            Column::Double("total_indirect_cost"),
        ],
    )?;
    let mut group = writer.next_row_group()?;
    write_utf8(&mut group, &rows.iter().map(|r| r.month.clone()).collect::<Vec<_>>())?;
    write_i64(&mut group, &rows.iter().map(|r| r.unit.0 as i64).collect::<Vec<_>>())?;
    write_f64(&mut group, &rows.iter().map(|r| r.labor_cost).collect::<Vec<_>>())?;
    write_f64(&mut group, &rows.iter().map(|r| r.other_expense).collect::<Vec<_>>())?;
    write_f64(&mut group, &rows.iter().map(|r| r.total).collect::<Vec<_>>())?;
    group.close()?;
    writer.close()?;
    info!(rows = rows.len(), "indirect-cost parquet written");
    Ok(())
}

fn month_sequence(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let Some(mut current) = NaiveDate::from_ymd_opt(from.year(), from.month(), 1) else {
        return months;
    };
    while current <= to {
        months.push(current);
        current = month_end(current.year(), current.month()) + Duration::days(1);
    }
    months
}

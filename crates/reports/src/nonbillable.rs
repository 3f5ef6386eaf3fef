//! Non-billable-time table: for every payroll month of every consultant,
//! the gap between the monthly working-hour budget and the hours charged.

use anyhow::Result;
use chrono::Datelike;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use sim_core::PayrollRecord;
use sim_projects::ProjectStore;
use sim_workforce::WorkforceStore;

use crate::parquet_out::{open_writer, write_f64, write_utf8, Column};

/// One output row.
#[derive(Clone, Debug, PartialEq)]
pub struct NonBillableRow {
    pub consultant: String,
    pub first_name: String,
    pub last_name: String,
    pub year_month: String,
    pub charged_hours: f64,
    pub non_billable_hours: f64,
}

/// Compute non-billable hours per (consultant, payroll month).
pub fn generate_non_billable_time(
    workforce: &WorkforceStore,
    projects: &ProjectStore,
    payroll: &[PayrollRecord],
    working_hours_per_month: f64,
) -> Vec<NonBillableRow> {
    let mut charged: HashMap<(String, i32, u32), f64> = HashMap::new();
    for c in projects.time_charges() {
        *charged
            .entry((c.consultant.0.clone(), c.date.year(), c.date.month()))
            .or_insert(0.0) += c.hours;
    }

    let mut rows = Vec::new();
    for record in payroll {
        let Some(consultant) = workforce.consultant(&record.consultant) else {
            continue;
        };
        let (year, month) = (record.effective.year(), record.effective.month());
        let hours = charged
            .get(&(record.consultant.0.clone(), year, month))
            .copied()
            .unwrap_or(0.0);
        rows.push(NonBillableRow {
            consultant: record.consultant.0.clone(),
            first_name: consultant.first_name.clone(),
            last_name: consultant.last_name.clone(),
            year_month: format!("{year}-{month:02}"),
            charged_hours: hours,
            non_billable_hours: (working_hours_per_month - hours).max(0.0),
        });
    }
    rows
}

/// Write the table to a parquet file.
pub fn write_non_billable_time<P: AsRef<Path>>(path: P, rows: &[NonBillableRow]) -> Result<()> {
    let mut writer = open_writer(
        &path,
        "non_billable_time",
        &[
            Column::Utf8("consultant_id"),
            Column::Utf8("first_name"),
            Column::Utf8("last_name"),
            Column::Utf8("year_month"),
            Column::Double("charged_hours"),
            Column::Double("non_billable_hours"),
        ],
    )?;
    let mut group = writer.next_row_group()?;
    write_utf8(&mut group, &rows.iter().map(|r| r.consultant.clone()).collect::<Vec<_>>())?;
    write_utf8(&mut group, &rows.iter().map(|r| r.first_name.clone()).collect::<Vec<_>>())?;
    write_utf8(&mut group, &rows.iter().map(|r| r.last_name.clone()).collect::<Vec<_>>())?;
    write_utf8(&mut group, &rows.iter().map(|r| r.year_month.clone()).collect::<Vec<_>>())?;
    write_f64(&mut group, &rows.iter().map(|r| r.charged_hours).collect::<Vec<_>>())?;
    write_f64(&mut group, &rows.iter().map(|r| r.non_billable_hours).collect::<Vec<_>>())?;
    group.close()?;
    writer.close()?;
    info!(rows = rows.len(), "non-billable-time parquet written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sim_core::{Consultant, ConsultantId, ConsultantMeta, EventKind, TitleHistoryEntry, TitleId, UnitId};

    #[test]
    fn gap_is_floored_at_zero() {
        let mut workforce = WorkforceStore::new();
        workforce
            .add_consultant(Consultant {
                id: ConsultantId("C0001".into()),
                first_name: "Iris".into(),
                last_name: "Vale".into(),
                email: "ivale0001@example.com".into(),
                phone: "+1-555-000-0000".into(),
                business_unit: UnitId(1),
                hire_year: 2015,
                meta: ConsultantMeta::default(),
            })
            .unwrap();
        workforce
            .add_title_entry(TitleHistoryEntry {
                consultant: ConsultantId("C0001".into()),
                title: TitleId(1),
                start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                end: None,
                event: EventKind::Hire,
                salary: 55_000,
            })
            .unwrap();
        let projects = ProjectStore::new();
        let payroll = vec![PayrollRecord {
            consultant: ConsultantId("C0001".into()),
            amount: Decimal::new(458333, 2),
            effective: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
        }];
        let rows = generate_non_billable_time(&workforce, &projects, &payroll, 160.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].charged_hours, 0.0);
        assert_eq!(rows[0].non_billable_hours, 160.0);
        assert_eq!(rows[0].year_month, "2015-01");
    }
}

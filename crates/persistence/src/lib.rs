#![deny(warnings)]

//! Persistence layer: SQLite schema migrations and the end-of-run flush of
//! the completed stores.
//!
//! The simulation never touches the database on its hot path; everything is
//! written here in one transaction, in dependency order (reference tables,
//! consultants, title history, payroll, projects, teams, deliverables,
//! billing rates, time charges, expenses, sidecar metadata).

use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{migrate::Migrator, Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::info;

use sim_core::{PayrollRecord, RefData};
use sim_projects::ProjectStore;
use sim_workforce::WorkforceStore;

/// Default SQLite URL used by the CLI.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/consultfirm.db"
}

static MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// URL for a database file, created on first open.
pub fn file_url<P: AsRef<Path>>(path: P) -> String {
    format!("sqlite://{}?mode=rwc", path.as_ref().display())
}

/// Connect and run migrations.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let pool = SqlitePool::connect(url).await?;
    MIGRATIONS.run(&pool).await?;
    Ok(pool)
}

fn money(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Write the finished stores. Returns the total row count.
pub async fn flush_run(
    pool: &Pool<Sqlite>,
    refdata: &RefData,
    workforce: &WorkforceStore,
    projects: &ProjectStore,
    payroll: &[PayrollRecord],
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut rows: u64 = 0;

    for t in &refdata.titles {
        sqlx::query("INSERT INTO Title (TitleID, Title) VALUES (?1, ?2)")
            .bind(t.id.0 as i64)
            .bind(&t.name)
            .execute(&mut *tx)
            .await?;
        rows += 1;
    }
    for u in &refdata.business_units {
        sqlx::query("INSERT INTO BusinessUnit (BusinessUnitID, BusinessUnitName) VALUES (?1, ?2)")
            .bind(u.id.0 as i64)
            .bind(&u.name)
            .execute(&mut *tx)
            .await?;
        rows += 1;
    }
    for l in &refdata.locations {
        sqlx::query("INSERT INTO Location (LocationID, State, City) VALUES (?1, ?2, ?3)")
            .bind(l.id.0 as i64)
            .bind(&l.state)
            .bind(&l.city)
            .execute(&mut *tx)
            .await?;
        rows += 1;
    }
    for c in &refdata.clients {
        sqlx::query(
            "INSERT INTO Client (ClientID, ClientName, LocationID, PhoneNumber, Email)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(c.id.0 as i64)
        .bind(&c.name)
        .bind(c.location.0 as i64)
        .bind(&c.phone)
        .bind(&c.email)
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }

    for c in workforce.consultants() {
        sqlx::query(
            "INSERT INTO Consultant
               (ConsultantID, BusinessUnitID, FirstName, LastName, Email, Contact, HireYear)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&c.id.0)
        .bind(c.business_unit.0 as i64)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(c.hire_year as i64)
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }
    for e in workforce.entries() {
        sqlx::query(
            "INSERT INTO ConsultantTitleHistory
               (ConsultantID, TitleID, StartDate, EndDate, EventType, Salary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&e.consultant.0)
        .bind(e.title.0 as i64)
        .bind(e.start.to_string())
        .bind(e.end.map(|d| d.to_string()))
        .bind(e.event.as_str())
        .bind(e.salary)
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }
    for r in payroll {
        sqlx::query(
            "INSERT INTO Payroll (ConsultantID, Amount, EffectiveDate) VALUES (?1, ?2, ?3)",
        )
        .bind(&r.consultant.0)
        .bind(money(r.amount))
        .bind(r.effective.to_string())
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }

    for p in projects.projects() {
        sqlx::query(
            "INSERT INTO Project
               (ProjectID, ClientID, UnitID, Name, Type, Status,
                PlannedStartDate, PlannedEndDate, ActualStartDate, ActualEndDate,
                Price, EstimatedBudget, PlannedHours, ActualHours, Progress, CreatedAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(p.id.0 as i64)
        .bind(p.client.0 as i64)
        .bind(p.unit.0 as i64)
        .bind(&p.name)
        .bind(p.kind.as_str())
        .bind(p.status.as_str())
        .bind(p.planned_start.to_string())
        .bind(p.planned_end.to_string())
        .bind(p.actual_start.to_string())
        .bind(p.actual_end.map(|d| d.to_string()))
        .bind(p.price.map(money))
        .bind(p.estimated_budget.map(money))
        .bind(p.planned_hours)
        .bind(p.actual_hours)
        .bind(p.progress as i64)
        .bind(p.created_at.to_string())
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }
    for a in projects.assignments() {
        sqlx::query(
            "INSERT INTO ProjectTeam (ProjectID, ConsultantID, Role, StartDate, EndDate)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(a.project.0 as i64)
        .bind(&a.consultant.0)
        .bind(a.role.as_str())
        .bind(a.start.to_string())
        .bind(a.end.map(|d| d.to_string()))
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }
    for d in projects.deliverables() {
        sqlx::query(
            "INSERT INTO Deliverable
               (DeliverableID, ProjectID, Name, PlannedStartDate, ActualStartDate, DueDate,
                SubmissionDate, InvoicedDate, Status, PlannedHours, ActualHours, Progress, Price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(d.id.0 as i64)
        .bind(d.project.0 as i64)
        .bind(&d.name)
        .bind(d.planned_start.to_string())
        .bind(d.actual_start.map(|x| x.to_string()))
        .bind(d.due.to_string())
        .bind(d.submitted.map(|x| x.to_string()))
        .bind(d.invoiced.map(|x| x.to_string()))
        .bind(d.status.as_str())
        .bind(d.planned_hours)
        .bind(d.actual_hours)
        .bind(d.progress as i64)
        .bind(d.price.map(money))
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }
    for r in projects.billing_rates() {
        sqlx::query("INSERT INTO ProjectBillingRate (ProjectID, TitleID, Rate) VALUES (?1, ?2, ?3)")
            .bind(r.project.0 as i64)
            .bind(r.title.0 as i64)
            .bind(money(r.rate))
            .execute(&mut *tx)
            .await?;
        rows += 1;
    }
    for c in projects.time_charges() {
        sqlx::query(
            "INSERT INTO ConsultantDeliverable (ConsultantID, DeliverableID, Date, Hours)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&c.consultant.0)
        .bind(c.deliverable.0 as i64)
        .bind(c.date.to_string())
        .bind(c.hours)
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }
    for e in projects.expenses() {
        sqlx::query(
            "INSERT INTO ProjectExpense
               (ProjectID, DeliverableID, Date, Amount, Description, Category, IsBillable)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(e.project.0 as i64)
        .bind(e.deliverable.0 as i64)
        .bind(e.date.to_string())
        .bind(money(e.amount))
        .bind(&e.description)
        .bind(&e.category)
        .bind(e.billable as i64)
        .execute(&mut *tx)
        .await?;
        rows += 1;
    }

    // Sidecar metadata documents; not part of the external contract.
    for c in workforce.consultants() {
        sqlx::query("INSERT INTO ConsultantCustomData (ConsultantID, CustomData) VALUES (?1, ?2)")
            .bind(&c.id.0)
            .bind(serde_json::to_string(&c.meta)?)
            .execute(&mut *tx)
            .await?;
        rows += 1;
    }
    for p in projects.projects() {
        sqlx::query("INSERT INTO ProjectCustomData (ProjectID, CustomData) VALUES (?1, ?2)")
            .bind(p.id.0 as i64)
            .bind(serde_json::to_string(&p.meta)?)
            .execute(&mut *tx)
            .await?;
        rows += 1;
    }

    tx.commit().await?;
    info!(rows, "database flush complete");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::SimConfig;
    use tokio::runtime::Runtime;

    #[test]
    fn url_is_sqlite() {
        assert!(default_sqlite_url().starts_with("sqlite://"));
        assert!(file_url("saves/x.db").ends_with("mode=rwc"));
    }

    #[test]
    fn flush_roundtrip_in_memory() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async move {
            let mut cfg = SimConfig::from_default_yaml().unwrap();
            cfg.horizon_start_year = 2015;
            cfg.horizon_end_year = 2015;
            cfg.initial_consultants = 10;
            cfg.seed = 42;
            let out = sim_runtime::run(&cfg).unwrap();

            let pool = init_db("sqlite::memory:").await.unwrap();
            let rows = flush_run(&pool, &out.refdata, &out.workforce, &out.projects, &out.payroll)
                .await
                .unwrap();
            assert!(rows > 0);

            let (consultants,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Consultant")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(consultants as usize, out.workforce.len());

            let (titles,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Title")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(titles, 6);

            let (charges,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM ConsultantDeliverable")
                    .fetch_one(&pool)
                    .await
                    .unwrap();
            assert_eq!(charges as usize, out.projects.counts().time_charges);

            // Open-ended history windows survive as NULL end dates.
            let (open,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM ConsultantTitleHistory WHERE EndDate IS NULL",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            assert!(open > 0);
        });
    }
}

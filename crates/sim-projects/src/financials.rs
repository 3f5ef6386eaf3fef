//! Project financial planning: billing rates, hourly costs, estimated cost
//! and revenue, fixed-price distribution and the predefined expense
//! schedule.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use std::collections::BTreeMap;

use sim_core::{
    round_to_nearest_thousand, Deliverable, ProjectKind, ProjectsConfig, ScheduledExpense,
    SimRng, TitleId,
};
use sim_workforce::WorkforceStore;

/// Outcome of the financial planning step for a new project.
#[derive(Clone, Debug)]
pub struct Financials {
    pub estimated_cost: Decimal,
    pub estimated_revenue: Decimal,
    /// Fixed projects only.
    pub price: Option<Decimal>,
    /// Time-and-Material projects only.
    pub estimated_budget: Option<Decimal>,
    /// Per-title rates; covers 1..6 for T&M, team titles for Fixed.
    pub rates: BTreeMap<u8, Decimal>,
    pub scheduled_expenses: Vec<ScheduledExpense>,
}

/// Billing rate for a title: base range interpolated by a capped experience
/// factor, discounted for fixed-price work, with a small jitter.
pub fn billing_rate(
    cfg: &ProjectsConfig,
    title: TitleId,
    kind: ProjectKind,
    experience_years: f64,
    rng: &mut SimRng,
) -> Decimal {
    let (lo, hi) = cfg.rate_range(title);
    let factor = (experience_years / 10.0).min(1.0);
    let mut rate = lo as f64 + (hi - lo) as f64 * factor;
    if kind == ProjectKind::Fixed {
        rate *= 1.0 - cfg.fixed_rate_discount;
    }
    rate *= rng.uniform(1.0 - cfg.rate_jitter, 1.0 + cfg.rate_jitter);
    Decimal::from_f64(rate).unwrap_or(Decimal::ZERO).round_dp(2)
}

/// Mean years since hire over consultants currently at `title`.
pub fn average_experience(workforce: &WorkforceStore, title: TitleId, date: NaiveDate) -> f64 {
    let years: Vec<f64> = workforce
        .consultants_employed_on(date)
        .into_iter()
        .filter(|c| workforce.latest_title_id(&c.id, date) == Some(title))
        .map(|c| (date.year() - c.hire_year) as f64)
        .collect();
    if years.is_empty() {
        5.0
    } else {
        years.iter().sum::<f64>() / years.len() as f64
    }
}

/// Loaded hourly cost of a consultant given their annual salary.
pub fn hourly_cost(cfg: &ProjectsConfig, annual_salary: i64) -> Decimal {
    let monthly = Decimal::from(annual_salary) / Decimal::from(12u32);
    let hourly = monthly / Decimal::from(52u32 * 40);
    let overhead = Decimal::from_f64(1.0 + cfg.overhead_percentage).unwrap_or(Decimal::ONE);
    hourly * overhead
}

/// Plan a new project's money: rates, cost/revenue estimates, the expense
/// schedule, and either a price (Fixed) or a budget (T&M).
#[allow(clippy::too_many_arguments)]
pub fn plan_financials(
    cfg: &ProjectsConfig,
    workforce: &WorkforceStore,
    kind: ProjectKind,
    today: NaiveDate,
    planned_hours: f64,
    team: &[(TitleId, i64)],
    deliverables: &[Deliverable],
    rng: &mut SimRng,
) -> Financials {
    let mut rates: BTreeMap<u8, Decimal> = BTreeMap::new();
    for (title, _) in team {
        rates.entry(title.0).or_insert_with(|| {
            let exp = average_experience(workforce, *title, today);
            billing_rate(cfg, *title, kind, exp, rng)
        });
    }
    if kind == ProjectKind::TimeAndMaterial {
        for title in TitleId::all() {
            rates.entry(title.0).or_insert_with(|| {
                let exp = average_experience(workforce, title, today);
                billing_rate(cfg, title, kind, exp, rng)
            });
        }
    }

    let member_hours = if team.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from_f64(planned_hours).unwrap_or(Decimal::ZERO)
            / Decimal::from(team.len() as u32)
    };
    let mut labor_cost = Decimal::ZERO;
    let mut labor_revenue = Decimal::ZERO;
    for (title, salary) in team {
        labor_cost += hourly_cost(cfg, *salary) * member_hours;
        labor_revenue += rates.get(&title.0).copied().unwrap_or(Decimal::ZERO) * member_hours;
    }

    let scheduled_expenses = schedule_expenses(cfg, deliverables, labor_cost, rng);
    let expense_total: Decimal = scheduled_expenses.iter().map(|e| e.amount).sum();
    let billable_total: Decimal = scheduled_expenses
        .iter()
        .filter(|e| e.billable)
        .map(|e| e.amount)
        .sum();

    let estimated_cost = (labor_cost + expense_total).round_dp(2);
    let estimated_revenue = (labor_revenue + billable_total).round_dp(2);
    let (price, estimated_budget) = match kind {
        ProjectKind::Fixed => (
            Some(round_to_nearest_thousand(labor_cost + billable_total)),
            None,
        ),
        ProjectKind::TimeAndMaterial => {
            let factor = rng.uniform(cfg.budget_factor_range.0, cfg.budget_factor_range.1);
            let factor = Decimal::from_f64(factor).unwrap_or(Decimal::ONE);
            (None, Some(round_to_nearest_thousand(estimated_cost * factor)))
        }
    };

    Financials {
        estimated_cost,
        estimated_revenue,
        price,
        estimated_budget,
        rates,
        scheduled_expenses,
    }
}

/// Split a fixed price across deliverables proportionally to planned hours;
/// the last deliverable absorbs the rounding remainder.
pub fn distribute_price(price: Decimal, deliverables: &[Deliverable]) -> Vec<Decimal> {
    let total_hours: f64 = deliverables.iter().map(|d| d.planned_hours).sum();
    if deliverables.is_empty() || total_hours <= 0.0 {
        return vec![Decimal::ZERO; deliverables.len()];
    }
    let mut shares = Vec::with_capacity(deliverables.len());
    let mut assigned = Decimal::ZERO;
    for d in &deliverables[..deliverables.len() - 1] {
        let ratio = Decimal::from_f64(d.planned_hours / total_hours).unwrap_or(Decimal::ZERO);
        let share = (price * ratio).round_dp(2);
        assigned += share;
        shares.push(share);
    }
    shares.push((price - assigned).round_dp(2));
    shares
}

/// Pre-generate the per-deliverable per-category monthly expense schedule.
///
/// Each deliverable takes its planned-hours share of the labor cost, each
/// category its configured percentage of that, spread uniformly over the
/// deliverable's calendar months with 20% jitter; billability is drawn per
/// monthly entry.
pub fn schedule_expenses(
    cfg: &ProjectsConfig,
    deliverables: &[Deliverable],
    labor_cost: Decimal,
    rng: &mut SimRng,
) -> Vec<ScheduledExpense> {
    let total_hours: f64 = deliverables.iter().map(|d| d.planned_hours).sum();
    if total_hours <= 0.0 {
        return Vec::new();
    }
    let mut schedule = Vec::new();
    for d in deliverables {
        let ratio = Decimal::from_f64(d.planned_hours / total_hours).unwrap_or(Decimal::ZERO);
        let deliverable_cost = labor_cost * ratio;
        let months = months_between(d.planned_start, d.due);
        let month_count = Decimal::from(months.len().max(1) as u32);
        for category in &cfg.expense_categories {
            let pct = Decimal::from_f64(category.percentage).unwrap_or(Decimal::ZERO);
            let base = deliverable_cost * pct;
            for &(year, month) in &months {
                let jitter = Decimal::from_f64(rng.uniform(0.8, 1.2)).unwrap_or(Decimal::ONE);
                let amount = (base / month_count * jitter).round_dp(2);
                let billable = rng.chance(0.5);
                if amount > Decimal::ZERO {
                    schedule.push(ScheduledExpense {
                        deliverable: d.id,
                        year,
                        month,
                        amount,
                        category: category.name.clone(),
                        description: format!("{} expense for {}", category.name, d.name),
                        billable,
                    });
                }
            }
        }
    }
    schedule
}

/// Inclusive `(year, month)` pairs covering the window.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    if to < from {
        return months;
    }
    let (mut y, mut m) = (from.year(), from.month());
    loop {
        months.push((y, m));
        if y == to.year() && m == to.month() {
            break;
        }
        (y, m) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
    }
    months
}

//! Yearly workforce step: attrition, layoffs, promotions, hiring,
//! continuation and geographic expansion, in that order.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, info};

use sim_core::{
    Consultant, ConsultantId, ConsultantMeta, EventKind, SimConfig, SimError, SimRng,
    TitleHistoryEntry, TitleId, UnitId, WorkforceConfig,
};

use crate::names;
use crate::store::WorkforceStore;

/// Per-year outcome counters for the run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct YearStats {
    pub year: i32,
    pub target_headcount: u32,
    pub hires: u32,
    pub promotions: u32,
    pub attritions: u32,
    pub layoffs: u32,
    pub ending_headcount: u32,
}

/// An employed consultant inside the yearly step's working pool.
#[derive(Clone, Debug)]
struct Member {
    id: ConsultantId,
    years_in_role: f64,
    tenure: f64,
}

/// The workforce engine. Holds the progressive-expansion state and the
/// consultant id sequence across years.
#[derive(Debug)]
pub struct WorkforceSimulator {
    start_year: i32,
    next_seq: u32,
    active_units: Vec<UnitId>,
}

impl WorkforceSimulator {
    pub fn new(start_year: i32) -> WorkforceSimulator {
        WorkforceSimulator {
            start_year,
            next_seq: 1,
            // Unit 1 (North America) is always active.
            active_units: vec![UnitId(1)],
        }
    }

    pub fn active_units(&self) -> &[UnitId] {
        &self.active_units
    }

    /// Create the initial roster on Jan 1 of the start year, highest titles
    /// first, all in unit 1.
    pub fn seed_initial_roster(
        &mut self,
        store: &mut WorkforceStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
    ) -> Result<u32, SimError> {
        let slots = title_slots(&cfg.workforce, cfg.initial_consultants);
        let start = NaiveDate::from_ymd_opt(self.start_year, 1, 1)
            .ok_or_else(|| SimError::ConfigError("invalid start year".into()))?;
        let mut created = 0;
        for (&title, &count) in slots.iter().rev() {
            for _ in 0..count {
                self.create_consultant(store, cfg, rng, UnitId(1), TitleId(title), start)?;
                created += 1;
            }
        }
        info!(year = self.start_year, created, "seeded initial roster");
        Ok(created)
    }

    /// Run the yearly step for `year`.
    pub fn run_year(
        &mut self,
        store: &mut WorkforceStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
        year: i32,
    ) -> Result<YearStats, SimError> {
        let w = &cfg.workforce;
        let growth = cfg.growth_rate(year);
        let target = self.target_headcount(cfg, year);
        let slots = title_slots(w, target);
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| SimError::ConfigError(format!("invalid year {year}")))?;

        let mut stats = YearStats {
            year,
            target_headcount: target,
            ..YearStats::default()
        };

        // Attrition, building the active pool as we go.
        let mut active: BTreeMap<u8, Vec<Member>> =
            TitleId::all().map(|t| (t.0, Vec::new())).collect();
        let ids: Vec<ConsultantId> = store.consultants().map(|c| c.id.clone()).collect();
        for id in &ids {
            let Some(open) = store.open_entry(id) else {
                continue;
            };
            let title = open.title;
            let years_in_role = store.years_in_role(id, title, jan1);
            let tenure = store
                .consultant(id)
                .map(|c| (year - c.hire_year) as f64)
                .unwrap_or(0.0);
            if rng.chance(w.attrition_rate(title)) {
                let leave = random_day_in_year(rng, year);
                self.terminal_close(store, id, EventKind::Attrition, year, leave)?;
                stats.attritions += 1;
            } else {
                active.entry(title.0).or_default().push(Member {
                    id: id.clone(),
                    years_in_role,
                    tenure,
                });
            }
        }

        // Layoffs only in contraction years.
        if growth < 0.0 {
            let fraction = growth.abs().min(w.max_layoff_fraction);
            let headcount: usize = active.values().map(Vec::len).sum();
            let total_layoffs = (headcount as f64 * fraction) as u32;
            let quotas = largest_remainder(total_layoffs, &w.layoff_weights);
            for t in TitleId::all() {
                let quota = quotas.get(&t.0).copied().unwrap_or(0) as usize;
                let pool = active.entry(t.0).or_default();
                // Fewest years in role go first.
                pool.sort_by(|a, b| {
                    a.years_in_role
                        .partial_cmp(&b.years_in_role)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                });
                let victims: Vec<Member> = pool.drain(..quota.min(pool.len())).collect();
                for v in victims {
                    let day = random_day_in_year(rng, year);
                    self.terminal_close(store, &v.id, EventKind::Layoff, year, day)?;
                    stats.layoffs += 1;
                }
            }
            info!(year, layoffs = stats.layoffs, "contraction year layoffs");
        }

        // Promotions, title by title from the bottom.
        for t in 1..TitleId::MAX {
            let mut pool = active.remove(&t).unwrap_or_default();
            pool.sort_by(|a, b| {
                b.years_in_role
                    .partial_cmp(&a.years_in_role)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        b.tenure
                            .partial_cmp(&a.tenure)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| a.id.cmp(&b.id))
            });
            let next = t + 1;
            let slot_cap = slots.get(&next).copied().unwrap_or(0) as usize;
            let mut kept = Vec::new();
            for m in pool {
                let filled = active.get(&next).map(Vec::len).unwrap_or(0);
                let eligible = m.years_in_role >= w.min_promotion_years(TitleId(t));
                if eligible
                    && filled < slot_cap
                    && rng.chance(promotion_chance(w, TitleId(t), &m))
                {
                    let tenure = m.tenure;
                    self.promote(store, cfg, rng, &m.id, TitleId(next), year)?;
                    active.entry(next).or_default().push(Member {
                        id: m.id,
                        years_in_role: 0.0,
                        tenure,
                    });
                    stats.promotions += 1;
                } else {
                    kept.push(m);
                }
            }
            active.insert(t, kept);
        }

        // New hires fill the remaining slots at each title.
        for t in TitleId::all() {
            let have = active.get(&t.0).map(Vec::len).unwrap_or(0) as u32;
            let want = slots.get(&t.0).copied().unwrap_or(0);
            for _ in have..want {
                let unit = self.draw_unit(w, rng);
                let hired = hire_date(w, rng, year);
                let id = self.create_consultant(store, cfg, rng, unit, t, hired)?;
                active.entry(t.0).or_default().push(Member {
                    id,
                    years_in_role: 0.0,
                    tenure: 0.0,
                });
                stats.hires += 1;
            }
        }

        // Continuation records for everyone whose open entry predates the year.
        for members in active.values() {
            for m in members {
                let Some(open) = store.open_entry(&m.id) else {
                    continue;
                };
                if open.start >= jan1 {
                    continue;
                }
                let title = open.title;
                let raise = rng.uniform(w.continuation_raise_range.0, w.continuation_raise_range.1);
                let new_salary = (open.salary as f64 * (1.0 + raise)) as i64;
                store.close_open_entry(&m.id, jan1 - Duration::days(1))?;
                store.add_title_entry(TitleHistoryEntry {
                    consultant: m.id.clone(),
                    title,
                    start: jan1,
                    end: None,
                    event: EventKind::Continuation,
                    salary: new_salary,
                })?;
            }
        }

        // Geographic expansion once thresholds are crossed.
        stats.ending_headcount = active.values().map(Vec::len).sum::<usize>() as u32;
        for (&threshold, &unit) in &w.expansion_thresholds {
            let unit = UnitId(unit);
            if stats.ending_headcount >= threshold && !self.active_units.contains(&unit) {
                self.active_units.push(unit);
                info!(year, unit = unit.0, threshold, "expanded into new business unit");
            }
        }

        info!(
            year,
            headcount = stats.ending_headcount,
            hires = stats.hires,
            promotions = stats.promotions,
            attritions = stats.attritions,
            layoffs = stats.layoffs,
            "workforce year complete"
        );
        Ok(stats)
    }

    /// Target headcount for `year`: initial count compounded through `year`.
    pub fn target_headcount(&self, cfg: &SimConfig, year: i32) -> u32 {
        let mut n = cfg.initial_consultants as f64;
        for y in self.start_year..=year {
            n *= 1.0 + cfg.growth_rate(y);
        }
        n as u32
    }

    fn draw_unit(&self, w: &WorkforceConfig, rng: &mut SimRng) -> UnitId {
        let weights: Vec<f64> = self
            .active_units
            .iter()
            .map(|u| w.business_unit_distribution.get(&u.0).copied().unwrap_or(0.0))
            .collect();
        *rng.weighted_choice(&self.active_units, &weights)
    }

    fn create_consultant(
        &mut self,
        store: &mut WorkforceStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
        unit: UnitId,
        title: TitleId,
        hired: NaiveDate,
    ) -> Result<ConsultantId, SimError> {
        let id = ConsultantId(format!("C{:04}", self.next_seq));
        self.next_seq += 1;
        let identity = names::generate_identity(unit, rng);
        let email = names::make_email(&identity.first_name, &identity.last_name, &id);
        store.add_consultant(Consultant {
            id: id.clone(),
            first_name: identity.first_name,
            last_name: identity.last_name,
            email,
            phone: identity.phone,
            business_unit: unit,
            hire_year: hired.year(),
            meta: ConsultantMeta {
                title: Some(title),
                active_projects: 0,
                last_project_date: None,
            },
        })?;
        let (lo, hi) = cfg.workforce.salary_range(title);
        store.add_title_entry(TitleHistoryEntry {
            consultant: id.clone(),
            title,
            start: hired,
            end: None,
            event: EventKind::Hire,
            salary: rng.int_in_range(lo, hi),
        })?;
        debug!(consultant = %id, title = %title, unit = unit.0, %hired, "hired");
        Ok(id)
    }

    fn promote(
        &mut self,
        store: &mut WorkforceStore,
        cfg: &SimConfig,
        rng: &mut SimRng,
        id: &ConsultantId,
        new_title: TitleId,
        year: i32,
    ) -> Result<(), SimError> {
        let open = store
            .open_entry(id)
            .cloned()
            .ok_or_else(|| SimError::invariant(format!("promoting {id} without open entry")))?;
        let drawn = random_day_in_year(rng, year);
        let promo_date = drawn.max(open.start + Duration::days(1));
        let (lo, hi) = cfg.workforce.salary_range(new_title);
        let new_salary = rng
            .int_in_range(lo, hi)
            .max((open.salary as f64 * 1.1) as i64);
        store.close_open_entry(id, promo_date - Duration::days(1))?;
        store.add_title_entry(TitleHistoryEntry {
            consultant: id.clone(),
            title: new_title,
            start: promo_date,
            end: None,
            event: EventKind::Promotion,
            salary: new_salary,
        })?;
        if let Some(c) = store.consultant_mut(id) {
            c.meta.title = Some(new_title);
        }
        debug!(consultant = %id, title = %new_title, %promo_date, "promoted");
        Ok(())
    }

    /// Close a career with an Attrition or Layoff entry covering the window
    /// of the final active year.
    fn terminal_close(
        &mut self,
        store: &mut WorkforceStore,
        id: &ConsultantId,
        kind: EventKind,
        year: i32,
        leave: NaiveDate,
    ) -> Result<(), SimError> {
        let open = store
            .open_entry(id)
            .cloned()
            .ok_or_else(|| SimError::invariant(format!("terminating {id} without open entry")))?;
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| SimError::ConfigError(format!("invalid year {year}")))?;
        let term_start = if open.start < jan1 {
            store.close_open_entry(id, jan1 - Duration::days(1))?;
            jan1
        } else {
            store.close_open_entry(id, open.start)?;
            open.start + Duration::days(1)
        };
        store.add_title_entry(TitleHistoryEntry {
            consultant: id.clone(),
            title: open.title,
            start: term_start,
            end: Some(leave.max(term_start)),
            event: kind,
            salary: open.salary,
        })?;
        debug!(consultant = %id, event = kind.as_str(), %leave, "career closed");
        Ok(())
    }
}

/// Largest-remainder apportionment of `total` across per-title weights, so
/// the per-title counts sum exactly to `total`. Ties favor lower titles.
fn largest_remainder(total: u32, weights: &BTreeMap<u8, f64>) -> BTreeMap<u8, u32> {
    let weight_sum: f64 = weights.values().filter(|v| **v > 0.0).sum();
    let mut counts: BTreeMap<u8, u32> = BTreeMap::new();
    let mut remainders: Vec<(f64, u8)> = Vec::new();
    let mut assigned = 0u32;
    for (&t, &weight) in weights {
        let exact = if weight_sum > 0.0 {
            total as f64 * weight.max(0.0) / weight_sum
        } else {
            0.0
        };
        let floor = exact.floor() as u32;
        counts.insert(t, floor);
        assigned += floor;
        remainders.push((exact - exact.floor(), t));
    }
    remainders.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
    let mut leftover = total.saturating_sub(assigned);
    for (_, t) in remainders {
        if leftover == 0 {
            break;
        }
        *counts.entry(t).or_default() += 1;
        leftover -= 1;
    }
    counts
}

/// Apportion the title distribution over a target headcount so the per-title
/// counts sum exactly to the target, then make sure every title keeps at
/// least the configured share of the slots of the title below it.
pub fn title_slots(w: &WorkforceConfig, target: u32) -> BTreeMap<u8, u32> {
    let mut slots = largest_remainder(target, &w.title_distribution);
    for t in 2..=TitleId::MAX {
        let below = slots.get(&(t - 1)).copied().unwrap_or(0);
        let floor = (below as f64 * w.min_title_share_of_lower) as u32;
        let entry = slots.entry(t).or_default();
        *entry = (*entry).max(floor);
    }
    slots
}

/// Promotion probability: base chance raised by title, excess years in role
/// and total tenure, capped by configuration.
fn promotion_chance(w: &WorkforceConfig, title: TitleId, m: &Member) -> f64 {
    let extra_years = (m.years_in_role - w.min_promotion_years(title)).max(0.0);
    let chance = w.promotion_base_chance
        + (title.0 - 1) as f64 * 0.05
        + (extra_years * 0.1).min(0.4)
        + (m.tenure * 0.02).min(0.2);
    chance.min(w.promotion_chance_cap)
}

fn random_day_in_year(rng: &mut SimRng, year: i32) -> NaiveDate {
    let month = rng.int_in_range(1, 12) as u32;
    // Day <= 28 keeps every month valid.
    let day = rng.int_in_range(1, 28) as u32;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Weighted seasonal hire date: spring, fall, or the rest of the year.
fn hire_date(w: &WorkforceConfig, rng: &mut SimRng, year: i32) -> NaiveDate {
    let seasons = ["spring", "fall", "other"];
    let weights = [
        w.hiring_season_weights.spring,
        w.hiring_season_weights.fall,
        w.hiring_season_weights.other,
    ];
    let month = match *rng.weighted_choice(&seasons, &weights) {
        "spring" => rng.int_in_range(3, 5) as u32,
        "fall" => rng.int_in_range(9, 11) as u32,
        _ => *rng.choose(&[1u32, 2, 6, 7, 8, 12]),
    };
    let day = rng.int_in_range(1, 28) as u32;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

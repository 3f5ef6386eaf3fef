//! Static configuration bundle. All constants of the two engines live here,
//! with defaults baked in from the assets directory; the bundle is read once
//! at startup and never re-read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::TitleId;
use crate::error::SimError;

/// Default YAML baked in from the assets directory.
pub const SIM_DEFAULTS_YAML: &str = include_str!("../../../assets/data/sim_defaults.yaml");

/// Seasonal hiring weights.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SeasonWeights {
    pub spring: f64,
    pub fall: f64,
    pub other: f64,
}

/// One project-duration bucket, in months.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DurationBucket {
    pub min_months: u32,
    pub max_months: u32,
    pub weight: f64,
}

/// One expense category with its share of deliverable cost.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub name: String,
    pub percentage: f64,
}

/// Workforce-simulator constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkforceConfig {
    /// Growth applied to years absent from `growth_rates`.
    pub default_growth_rate: f64,
    /// Named per-year growth overrides; negative values trigger layoffs.
    pub growth_rates: BTreeMap<i32, f64>,
    pub attrition_rates: BTreeMap<u8, f64>,
    pub title_distribution: BTreeMap<u8, f64>,
    /// Each title keeps at least this share of the slots of the title below.
    pub min_title_share_of_lower: f64,
    pub salary_ranges: BTreeMap<u8, (i64, i64)>,
    pub min_promotion_years: BTreeMap<u8, f64>,
    pub promotion_base_chance: f64,
    pub promotion_chance_cap: f64,
    pub hiring_season_weights: SeasonWeights,
    pub business_unit_distribution: BTreeMap<u32, f64>,
    /// Headcount threshold -> unit id activated once reached.
    pub expansion_thresholds: BTreeMap<u32, u32>,
    pub layoff_weights: BTreeMap<u8, f64>,
    pub max_layoff_fraction: f64,
    pub continuation_raise_range: (f64, f64),
}

/// Project- and work-simulator constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectsConfig {
    pub max_projects_per_consultant: BTreeMap<u8, u32>,
    pub max_daily_hours_per_title: BTreeMap<u8, f64>,
    pub min_daily_hours_per_project: BTreeMap<u8, f64>,
    pub team_title_distribution: BTreeMap<u8, f64>,
    pub min_team_size: usize,
    pub max_team_size: usize,
    /// Probability that a new project is Fixed (rest are T&M).
    pub fixed_kind_weight: f64,
    pub duration_buckets: Vec<DurationBucket>,
    pub deliverable_count_range: (u32, u32),
    pub min_deliverable_hours: f64,
    pub average_working_hours_per_day: f64,
    pub working_days_per_month: u32,
    pub hourly_rate_ranges: BTreeMap<u8, (i64, i64)>,
    /// Rate discount applied to Fixed projects.
    pub fixed_rate_discount: f64,
    /// Symmetric multiplicative jitter applied to billing rates.
    pub rate_jitter: f64,
    pub overhead_percentage: f64,
    /// Per-project T&M budget factor range.
    pub budget_factor_range: (f64, f64),
    pub underrun_chance: f64,
    pub underrun_range: (f64, f64),
    pub overrun_range: (f64, f64),
    /// Zero-based month indices receiving the yearly target remainder.
    pub extra_project_months: Vec<usize>,
    pub working_hours_per_month: f64,
    /// Days of zero charged hours after which a started project cancels.
    pub inactivity_cancel_days: i64,
    pub expense_categories: Vec<ExpenseCategory>,
}

/// The full configuration bundle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    pub horizon_start_year: i32,
    pub horizon_end_year: i32,
    pub initial_consultants: u32,
    pub seed: u64,
    pub client_count: u32,
    pub workforce: WorkforceConfig,
    pub projects: ProjectsConfig,
}

impl SimConfig {
    /// Load the baked-in defaults.
    pub fn from_default_yaml() -> Result<SimConfig, serde_yaml::Error> {
        serde_yaml::from_str(SIM_DEFAULTS_YAML)
    }

    /// Growth rate for a year, falling back to the default.
    pub fn growth_rate(&self, year: i32) -> f64 {
        self.workforce
            .growth_rates
            .get(&year)
            .copied()
            .unwrap_or(self.workforce.default_growth_rate)
    }

    /// Check every constant once at startup.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.horizon_end_year < self.horizon_start_year {
            return Err(SimError::ConfigError(format!(
                "horizon end {} precedes start {}",
                self.horizon_end_year, self.horizon_start_year
            )));
        }
        if self.initial_consultants == 0 {
            return Err(SimError::ConfigError("initial_consultants must be > 0".into()));
        }
        if self.client_count == 0 {
            return Err(SimError::ConfigError("client_count must be > 0".into()));
        }

        let w = &self.workforce;
        for map_name in per_title_maps(&self.workforce, &self.projects) {
            let (name, covered) = map_name;
            if !covered {
                return Err(SimError::ConfigError(format!(
                    "per-title table `{name}` must cover titles 1..6"
                )));
            }
        }
        let dist_sum: f64 = w.title_distribution.values().sum();
        if (dist_sum - 1.0).abs() > 1e-6 {
            return Err(SimError::ConfigError(format!(
                "title_distribution sums to {dist_sum}, expected 1.0"
            )));
        }
        for (t, (lo, hi)) in &w.salary_ranges {
            if lo > hi || *lo <= 0 {
                return Err(SimError::ConfigError(format!(
                    "salary range for title {t} is not ordered"
                )));
            }
        }
        if !(0.0..=1.0).contains(&w.promotion_base_chance)
            || !(0.0..=1.0).contains(&w.promotion_chance_cap)
        {
            return Err(SimError::ConfigError("promotion chances out of [0,1]".into()));
        }
        if w.max_layoff_fraction <= 0.0 || w.max_layoff_fraction > 1.0 {
            return Err(SimError::ConfigError("max_layoff_fraction out of (0,1]".into()));
        }
        ordered_range("continuation_raise_range", w.continuation_raise_range)?;
        for unit in w.expansion_thresholds.values() {
            if !w.business_unit_distribution.contains_key(unit) {
                return Err(SimError::ConfigError(format!(
                    "expansion threshold activates unknown unit {unit}"
                )));
            }
        }

        let p = &self.projects;
        if p.min_team_size == 0 || p.max_team_size < p.min_team_size {
            return Err(SimError::ConfigError("team size bounds are not ordered".into()));
        }
        if p.duration_buckets.is_empty()
            || p.duration_buckets
                .iter()
                .any(|b| b.weight <= 0.0 || b.max_months < b.min_months || b.min_months == 0)
        {
            return Err(SimError::ConfigError("invalid duration buckets".into()));
        }
        if p.deliverable_count_range.0 == 0 || p.deliverable_count_range.1 < p.deliverable_count_range.0 {
            return Err(SimError::ConfigError("deliverable_count_range is not ordered".into()));
        }
        if p.average_working_hours_per_day <= 0.0 || p.working_hours_per_month <= 0.0 {
            return Err(SimError::ConfigError("working-hour constants must be positive".into()));
        }
        ordered_range("budget_factor_range", p.budget_factor_range)?;
        ordered_range("underrun_range", p.underrun_range)?;
        ordered_range("overrun_range", p.overrun_range)?;
        if !(0.0..=1.0).contains(&p.fixed_kind_weight) || !(0.0..=1.0).contains(&p.underrun_chance) {
            return Err(SimError::ConfigError("kind/underrun weights out of [0,1]".into()));
        }
        if p.expense_categories.is_empty()
            || p.expense_categories.iter().any(|c| c.percentage <= 0.0)
        {
            return Err(SimError::ConfigError("invalid expense categories".into()));
        }
        if p.extra_project_months.is_empty() || p.extra_project_months.iter().any(|m| *m > 11) {
            return Err(SimError::ConfigError(
                "extra_project_months must name month indices 0..=11".into(),
            ));
        }
        Ok(())
    }
}

fn ordered_range(name: &str, (lo, hi): (f64, f64)) -> Result<(), SimError> {
    if lo > hi {
        return Err(SimError::ConfigError(format!("{name} is not ordered")));
    }
    Ok(())
}

fn covers_titles<V>(m: &BTreeMap<u8, V>) -> bool {
    (TitleId::MIN..=TitleId::MAX).all(|t| m.contains_key(&t))
}

fn per_title_maps(w: &WorkforceConfig, p: &ProjectsConfig) -> Vec<(&'static str, bool)> {
    vec![
        ("attrition_rates", covers_titles(&w.attrition_rates)),
        ("title_distribution", covers_titles(&w.title_distribution)),
        ("salary_ranges", covers_titles(&w.salary_ranges)),
        ("min_promotion_years", covers_titles(&w.min_promotion_years)),
        ("layoff_weights", covers_titles(&w.layoff_weights)),
        (
            "max_projects_per_consultant",
            covers_titles(&p.max_projects_per_consultant),
        ),
        (
            "max_daily_hours_per_title",
            covers_titles(&p.max_daily_hours_per_title),
        ),
        (
            "min_daily_hours_per_project",
            covers_titles(&p.min_daily_hours_per_project),
        ),
        (
            "team_title_distribution",
            covers_titles(&p.team_title_distribution),
        ),
        ("hourly_rate_ranges", covers_titles(&p.hourly_rate_ranges)),
    ]
}

// Per-title accessors. Coverage is checked by `validate`, so the fallbacks
// only matter for maps bypassing it in tests.
impl ProjectsConfig {
    pub fn daily_cap(&self, t: TitleId) -> f64 {
        self.max_daily_hours_per_title.get(&t.0).copied().unwrap_or(8.0)
    }

    pub fn min_daily_per_project(&self, t: TitleId) -> f64 {
        self.min_daily_hours_per_project.get(&t.0).copied().unwrap_or(2.0)
    }

    pub fn max_projects(&self, t: TitleId) -> u32 {
        self.max_projects_per_consultant.get(&t.0).copied().unwrap_or(1)
    }

    pub fn team_share(&self, t: TitleId) -> f64 {
        self.team_title_distribution.get(&t.0).copied().unwrap_or(0.0)
    }

    pub fn rate_range(&self, t: TitleId) -> (i64, i64) {
        self.hourly_rate_ranges.get(&t.0).copied().unwrap_or((100, 200))
    }
}

impl WorkforceConfig {
    pub fn attrition_rate(&self, t: TitleId) -> f64 {
        self.attrition_rates.get(&t.0).copied().unwrap_or(0.0)
    }

    pub fn salary_range(&self, t: TitleId) -> (i64, i64) {
        self.salary_ranges.get(&t.0).copied().unwrap_or((50_000, 60_000))
    }

    pub fn min_promotion_years(&self, t: TitleId) -> f64 {
        self.min_promotion_years.get(&t.0).copied().unwrap_or(f64::MAX)
    }

    pub fn layoff_weight(&self, t: TitleId) -> f64 {
        self.layoff_weights.get(&t.0).copied().unwrap_or(0.0)
    }

    pub fn title_fraction(&self, t: TitleId) -> f64 {
        self.title_distribution.get(&t.0).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_validate() {
        let cfg = SimConfig::from_default_yaml().unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.projects.max_projects_per_consultant[&6], 6);
        assert_eq!(cfg.workforce.expansion_thresholds[&200], 2);
        assert_eq!(cfg.projects.expense_categories.len(), 10);
    }

    #[test]
    fn default_growth_applies_to_unlisted_years() {
        let cfg = SimConfig::from_default_yaml().unwrap();
        assert!((cfg.growth_rate(2015) - 0.05).abs() < 1e-12);
        let mut cfg = cfg;
        cfg.workforce.growth_rates.insert(2016, -0.15);
        assert!((cfg.growth_rate(2016) + 0.15).abs() < 1e-12);
    }

    #[test]
    fn validation_rejects_partial_title_map() {
        let mut cfg = SimConfig::from_default_yaml().unwrap();
        cfg.workforce.attrition_rates.remove(&3);
        assert!(matches!(cfg.validate(), Err(SimError::ConfigError(_))));
    }

    #[test]
    fn validation_rejects_reversed_horizon() {
        let mut cfg = SimConfig::from_default_yaml().unwrap();
        cfg.horizon_end_year = cfg.horizon_start_year - 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn expense_percentages_match_contract() {
        let cfg = SimConfig::from_default_yaml().unwrap();
        let total: f64 = cfg
            .projects
            .expense_categories
            .iter()
            .map(|c| c.percentage)
            .sum();
        assert!((total - 0.75).abs() < 1e-9);
    }
}

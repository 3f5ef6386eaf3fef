//! Capacity oracle: per-title daily hour caps, per-project minimum charges
//! and concurrency limits, derived over the two stores.

use chrono::NaiveDate;

use sim_core::{ConsultantId, ProjectsConfig, TitleId};
use sim_workforce::WorkforceStore;

use crate::store::ProjectStore;

/// Read-only view answering "how much more can this consultant take on".
pub struct CapacityOracle<'a> {
    cfg: &'a ProjectsConfig,
}

impl<'a> CapacityOracle<'a> {
    pub fn new(cfg: &'a ProjectsConfig) -> CapacityOracle<'a> {
        CapacityOracle { cfg }
    }

    /// Daily hour cap for a title.
    pub fn daily_cap(&self, title: TitleId) -> f64 {
        self.cfg.daily_cap(title)
    }

    /// Minimum hours charged to a single project on a working day.
    pub fn min_charge(&self, title: TitleId) -> f64 {
        self.cfg.min_daily_per_project(title)
    }

    /// Concurrent-project ceiling for a title.
    pub fn max_concurrent(&self, title: TitleId) -> u32 {
        self.cfg.max_projects(title)
    }

    /// Hours the consultant can still charge on `date` before hitting the
    /// title cap.
    pub fn remaining_daily_hours(
        &self,
        workforce: &WorkforceStore,
        projects: &ProjectStore,
        consultant: &ConsultantId,
        date: NaiveDate,
    ) -> f64 {
        let Some(title) = workforce.latest_title_id(consultant, date) else {
            return 0.0;
        };
        (self.daily_cap(title) - projects.daily_hours(consultant, date)).max(0.0)
    }

    /// Whether the consultant can join one more project.
    pub fn has_free_slot(
        &self,
        workforce: &WorkforceStore,
        projects: &ProjectStore,
        consultant: &ConsultantId,
        date: NaiveDate,
    ) -> bool {
        match workforce.latest_title_id(consultant, date) {
            Some(title) => projects.active_count(consultant) < self.max_concurrent(title),
            None => false,
        }
    }

    /// Free project slots the consultant still has, zero when over cap.
    pub fn free_slots(&self, title: TitleId, active: u32) -> u32 {
        self.max_concurrent(title).saturating_sub(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::SimConfig;

    #[test]
    fn caps_follow_title_tables() {
        let cfg = SimConfig::from_default_yaml().unwrap();
        let oracle = CapacityOracle::new(&cfg.projects);
        assert_eq!(oracle.daily_cap(TitleId(1)), 8.0);
        assert_eq!(oracle.daily_cap(TitleId(6)), 5.0);
        assert_eq!(oracle.min_charge(TitleId(4)), 2.5);
        assert_eq!(oracle.max_concurrent(TitleId(1)), 1);
        assert_eq!(oracle.max_concurrent(TitleId(6)), 6);
        assert_eq!(oracle.free_slots(TitleId(3), 2), 1);
        assert_eq!(oracle.free_slots(TitleId(3), 5), 0);
    }
}

#![deny(warnings)]

//! Post-simulation artifacts derived from the completed stores: the
//! indirect-cost and non-billable-time tables (parquet) and the
//! client-feedback survey (JSON).

pub mod feedback;
pub mod indirect;
pub mod nonbillable;
mod parquet_out;

pub use feedback::{generate_client_feedback, write_client_feedback, FeedbackRecord};
pub use indirect::{generate_indirect_costs, write_indirect_costs, IndirectCostParams, IndirectCostRow};
pub use nonbillable::{generate_non_billable_time, write_non_billable_time, NonBillableRow};

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{SimConfig, SimRng};

    #[test]
    fn artifacts_from_a_real_run() {
        let mut cfg = SimConfig::from_default_yaml().unwrap();
        cfg.horizon_start_year = 2015;
        cfg.horizon_end_year = 2015;
        cfg.initial_consultants = 30;
        cfg.seed = 42;
        let out = sim_runtime::run(&cfg).unwrap();

        let rows = generate_indirect_costs(&out.projects, &IndirectCostParams::default());
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.total >= 0.0));

        let nb = generate_non_billable_time(
            &out.workforce,
            &out.projects,
            &out.payroll,
            cfg.projects.working_hours_per_month,
        );
        assert_eq!(nb.len(), out.payroll.len());
        assert!(nb.iter().all(|r| r.non_billable_hours >= 0.0));

        let mut rng = SimRng::seed_from(cfg.seed);
        let feedback = generate_client_feedback(&out.projects, &mut rng);
        let completed = out
            .projects
            .projects()
            .filter(|p| p.status == sim_core::ProjectStatus::Completed)
            .count();
        assert_eq!(feedback.len(), completed);
        for f in &feedback {
            let overall: f64 = f.overall_satisfaction.parse().unwrap();
            assert!((1.0..=5.0).contains(&overall));
        }
    }
}

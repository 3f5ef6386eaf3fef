#![deny(warnings)]

//! Workforce engine: the consultant roster, the year-by-year hiring,
//! promotion, attrition, layoff and continuation model, and the payroll
//! derivation over the finished title history.

pub mod names;
pub mod payroll;
pub mod simulator;
pub mod store;

pub use payroll::generate_payroll;
pub use simulator::{title_slots, WorkforceSimulator, YearStats};
pub use store::WorkforceStore;

#![deny(warnings)]

//! Core domain models, configuration, clock and random source for the
//! consulting-firm data factory.
//!
//! This crate defines the serializable types shared by the workforce and
//! project simulators, the seeded PRNG facade every stochastic decision
//! routes through, and the calendar all date arithmetic flows from.

pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod refdata;
pub mod rng;

pub use calendar::{add_working_days, is_working_day, month_end, working_days_between, Calendar};
pub use config::{ProjectsConfig, SimConfig, WorkforceConfig};
pub use domain::*;
pub use error::SimError;
pub use refdata::RefData;
pub use rng::SimRng;

/// Round hours to one decimal place, the resolution of all charged time.
pub fn round_hours(h: f64) -> f64 {
    (h * 10.0).round() / 10.0
}

/// Round a monetary value to the nearest thousand.
pub fn round_to_nearest_thousand(d: rust_decimal::Decimal) -> rust_decimal::Decimal {
    use rust_decimal::{Decimal, RoundingStrategy};
    let thousand = Decimal::from(1000u32);
    (d / thousand).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * thousand
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn hours_round_to_tenths() {
        assert_eq!(round_hours(3.14), 3.1);
        assert_eq!(round_hours(3.15), 3.2);
        assert_eq!(round_hours(0.04), 0.0);
    }

    #[test]
    fn thousand_rounding() {
        assert_eq!(
            round_to_nearest_thousand(Decimal::new(1499, 0)),
            Decimal::from(1000u32)
        );
        assert_eq!(
            round_to_nearest_thousand(Decimal::new(1500, 0)),
            Decimal::from(2000u32)
        );
    }
}

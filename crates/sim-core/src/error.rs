//! Error taxonomy shared by both simulation engines.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// Fatal variants abort the run; `CapacityExhausted` is recovered locally by
/// the project creator and only reaches callers through logs and summary
/// counters.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// A write would break a stated data-model invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// A title-history insert would create a gap, an overlap, or a second
    /// open entry for the named consultant.
    #[error("bad title history write for consultant {consultant} at {date}: {reason}")]
    BadHistoryWrite {
        consultant: String,
        date: NaiveDate,
        reason: String,
    },
    /// No project manager or team member with free capacity was available.
    #[error("capacity exhausted in {year}-{month:02}: {what}")]
    CapacityExhausted {
        year: i32,
        month: u32,
        what: String,
    },
    /// A reference table was empty when the simulation needed to draw from it.
    #[error("reference pool `{0}` is empty")]
    EmptyPool(&'static str),
    /// An out-of-range or missing configuration constant.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl SimError {
    /// Shorthand for an `InvariantViolation` naming the offending entity.
    pub fn invariant(msg: impl Into<String>) -> Self {
        SimError::InvariantViolation(msg.into())
    }
}

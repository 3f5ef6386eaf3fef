#![deny(warnings)]

//! Project & work engine: the project store, the capacity oracle, the
//! monthly project creator, the daily work allocator and the state
//! advancer.

pub mod advancer;
pub mod allocator;
pub mod capacity;
pub mod creator;
pub mod financials;
pub mod store;

pub use advancer::{DayOutcome, StateAdvancer};
pub use allocator::DailyWorkAllocator;
pub use capacity::CapacityOracle;
pub use creator::ProjectCreator;
pub use store::{ProjectStore, StoreCounts};

//! Step-table DVFS governor.
//!
//! Pure decision logic (`selector`, `hysteresis`) works on an owned
//! [`GovernorState`]; hardware side effects go through [`StepApplier`].

pub mod applier;
pub mod governor;
pub mod hysteresis;
pub mod selector;
pub mod state;
pub mod table;
pub mod time_in_state;

pub use applier::{ApplierConfig, ApplyReport, StepApplier};
pub use governor::{Governor, GovernorConfig, TickOutcome};
pub use hysteresis::{Commit, Direction};
pub use state::GovernorState;
pub use table::{DvfsTable, OperatingPoint};
pub use time_in_state::TimeInState;

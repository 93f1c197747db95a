//! # PeriodicTimer
//! A background timer that invokes a callback every interval from its own
//! worker thread, until it is stopped, run once, or dropped.

pub mod errors;
pub mod timer;
mod worker;

pub use errors::TimerError;
pub use timer::{PeriodicTimer, TimerBuilder, TimerCallback, TimerState, TimerStatistics};

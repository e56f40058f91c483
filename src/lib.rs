pub mod error;
pub mod math;
pub mod replenishment;

pub use error::{Error, Result, SolveStage};
pub use replenishment::{generate_instance, solve, solve_with, Instance, Schedule, ScheduleEntry};

//! Multi-period store replenishment planned by column generation.
//!
//! Every (store, product) pair is planned through whole ordering plans
//! ("columns"). A restricted master problem picks a cost-minimal combination
//! of the plans found so far, and its duals drive one pricing subproblem per
//! pair that proposes cheaper plans. Once no pair can improve, the master is
//! re-solved with integral weights and turned into a day-by-day schedule.

pub mod column;
pub mod column_generation;
pub mod generator;
pub mod instance;
pub mod inventory;
pub mod master;
pub mod monolithic;
pub mod pool;
pub mod pricing;
pub mod schedule;

pub use column::{Column, ColumnOrigin};
pub use column_generation::{
    solve, solve_with, ColumnGeneration, ColumnGenerationConfig, IterationRecord, LoopState,
    RelaxationDomain, Termination,
};
pub use generator::{generate_instance, GeneratorConfig};
pub use instance::{Config, Demand, InitialInventory, Instance, Pair, Product};
pub use master::{solve_master, DemandKey, Duals, MasterDomain, MasterProblem, MasterSolution};
pub use monolithic::{solve_monolithic, MonolithicSolution};
pub use pool::{ColumnId, ColumnPool};
pub use pricing::{PricingEngine, PricingRound};
pub use schedule::{Schedule, ScheduleBuilder, ScheduleEntry};

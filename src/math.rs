pub mod integer_linear;
pub mod optimization;

pub use optimization::{simplex::LinearProgram, simplex_minimize, OptimizationConfig};

pub use integer_linear::{
    BranchAndBoundSolver, ILPSolution, ILPSolver, ILPStatus, IntegerLinearProgram, SolverOptions,
};

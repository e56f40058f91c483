//! Mixed-integer linear programming.
//!
//! This module is the single solving surface the replenishment planner needs:
//! a model made of typed variables, a linear minimization objective and linear
//! constraints, plus a solver trait that returns a status, the objective
//! value, per-variable values and, for purely continuous models, one dual value
//! per constraint.
//!
//! Any backend that implements [`ILPSolver`] can be handed to the planner. The
//! bundled [`BranchAndBoundSolver`] runs a depth-first branch and bound on top
//! of the two-phase simplex in [`crate::math::optimization::simplex`].

use std::error::Error;
use std::time::Duration;

pub mod branch_and_bound;

pub use crate::math::optimization::simplex::Sense;
pub use branch_and_bound::BranchAndBoundSolver;

/// Domain annotation of a decision variable. All variables are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Continuous,
    Integer,
    Binary,
}

impl VarType {
    pub fn is_integral(self) -> bool {
        !matches!(self, VarType::Continuous)
    }
}

/// Handle to a variable of an [`IntegerLinearProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a constraint of an [`IntegerLinearProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsId(usize);

impl ConsId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A sparse linear constraint `Σ coef·var (sense) rhs`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

/// A minimization problem over non-negative variables.
#[derive(Debug, Clone, Default)]
pub struct IntegerLinearProgram {
    objective: Vec<f64>,
    var_types: Vec<VarType>,
    constraints: Vec<Constraint>,
}

impl IntegerLinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the given domain and objective coefficient.
    pub fn add_var(&mut self, var_type: VarType, objective: f64) -> VarId {
        self.objective.push(objective);
        self.var_types.push(var_type);
        VarId(self.objective.len() - 1)
    }

    /// Adds `Σ terms (sense) rhs`. Terms with a zero coefficient are dropped.
    pub fn add_cons(&mut self, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) -> ConsId {
        let terms = terms.into_iter().filter(|&(_, c)| c != 0.0).collect();
        self.constraints.push(Constraint { terms, sense, rhs });
        ConsId(self.constraints.len() - 1)
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn var_types(&self) -> &[VarType] {
        &self.var_types
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn has_integer_vars(&self) -> bool {
        self.var_types.iter().any(|t| t.is_integral())
    }
}

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ILPStatus {
    /// Proven optimal.
    Optimal,
    /// A feasible incumbent was found but a limit stopped the search.
    Feasible,
    Infeasible,
    Unbounded,
    /// Pivot or node limit reached without a usable solution.
    MaxIterationsReached,
    /// Deadline reached without a usable solution.
    TimeLimitReached,
}

#[derive(Debug, Clone)]
pub struct ILPSolution {
    pub status: ILPStatus,
    pub objective_value: f64,
    pub values: Vec<f64>,
    /// One entry per constraint, only reported for continuous models.
    pub duals: Option<Vec<f64>>,
}

impl ILPSolution {
    pub fn without_point(status: ILPStatus) -> Self {
        Self {
            status,
            objective_value: f64::NAN,
            values: vec![],
            duals: None,
        }
    }

    /// True when `values` holds a solution that satisfies every constraint.
    pub fn has_solution(&self) -> bool {
        matches!(self.status, ILPStatus::Optimal | ILPStatus::Feasible)
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    pub fn dual(&self, cons: ConsId) -> Option<f64> {
        self.duals.as_ref().and_then(|d| d.get(cons.index()).copied())
    }
}

/// Limits handed to a solver for a single call.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Simplex pivots allowed per LP relaxation.
    pub max_pivots: usize,
    /// Branch-and-bound nodes allowed per call.
    pub max_nodes: usize,
    pub integrality_tolerance: f64,
    /// Wall-clock deadline per call.
    pub time_limit: Option<Duration>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_pivots: 50_000,
            max_nodes: 100_000,
            integrality_tolerance: 1e-6,
            time_limit: None,
        }
    }
}

pub type BackendError = Box<dyn Error + Send + Sync>;

/// A linear / mixed-integer solving backend.
///
/// Implementations must be shareable across threads: pricing subproblems are
/// solved concurrently against the same backend.
pub trait ILPSolver: Send + Sync {
    fn solve(&self, problem: &IntegerLinearProgram) -> Result<ILPSolution, BackendError>;
}

impl<S: ILPSolver + ?Sized> ILPSolver for &S {
    fn solve(&self, problem: &IntegerLinearProgram) -> Result<ILPSolution, BackendError> {
        (**self).solve(problem)
    }
}

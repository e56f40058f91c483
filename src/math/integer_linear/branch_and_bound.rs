use std::time::Instant;

use log::{debug, warn};

use crate::math::integer_linear::{
    BackendError, ILPSolution, ILPSolver, ILPStatus, IntegerLinearProgram, SolverOptions,
    VarType,
};
use crate::math::optimization::simplex::{minimize, LinearProgram, LpResult, LpStatus, Sense};
use crate::math::optimization::OptimizationConfig;

/// Depth-first branch and bound over LP relaxations solved with the simplex.
///
/// Continuous models are solved with a single LP and report duals. Models with
/// integer or binary variables branch on the most fractional variable; the
/// search stops at `max_nodes` or at the deadline, returning the incumbent (if
/// any) with status `Feasible`.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver {
    options: SolverOptions,
}

/// Variable bounds active at one node of the search tree.
#[derive(Debug, Clone)]
struct Node {
    lower: Vec<f64>,
    upper: Vec<Option<f64>>,
}

impl BranchAndBoundSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    fn is_integer(&self, value: f64) -> bool {
        (value - value.round()).abs() < self.options.integrality_tolerance
    }

    fn root(problem: &IntegerLinearProgram) -> Node {
        Node {
            lower: vec![0.0; problem.num_vars()],
            upper: problem
                .var_types()
                .iter()
                .map(|t| match t {
                    VarType::Binary => Some(1.0),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Dense LP for a node: the model rows first, then one row per active
    /// bound, so that `duals[..num_constraints]` line up with the model.
    fn relaxation(problem: &IntegerLinearProgram, node: &Node) -> LinearProgram {
        let n = problem.num_vars();
        let mut constraints = Vec::with_capacity(problem.num_constraints());
        let mut senses = Vec::with_capacity(problem.num_constraints());
        let mut rhs = Vec::with_capacity(problem.num_constraints());

        for constraint in problem.constraints() {
            let mut row = vec![0.0; n];
            for &(var, coef) in &constraint.terms {
                row[var.index()] += coef;
            }
            constraints.push(row);
            senses.push(constraint.sense);
            rhs.push(constraint.rhs);
        }

        for j in 0..n {
            if node.lower[j] > 0.0 {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                constraints.push(row);
                senses.push(Sense::GreaterEqual);
                rhs.push(node.lower[j]);
            }
            if let Some(upper) = node.upper[j] {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                constraints.push(row);
                senses.push(Sense::LessEqual);
                rhs.push(upper);
            }
        }

        LinearProgram {
            objective: problem.objective().to_vec(),
            constraints,
            senses,
            rhs,
        }
    }

    fn solve_node(&self, problem: &IntegerLinearProgram, node: &Node) -> LpResult {
        let config = OptimizationConfig {
            max_iterations: self.options.max_pivots,
            ..OptimizationConfig::default()
        };
        minimize(&Self::relaxation(problem, node), &config)
    }

    fn most_fractional(&self, problem: &IntegerLinearProgram, point: &[f64]) -> Option<usize> {
        problem
            .var_types()
            .iter()
            .enumerate()
            .filter(|(j, t)| t.is_integral() && !self.is_integer(point[*j]))
            .map(|(j, _)| (j, (point[j] - point[j].floor() - 0.5).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(j, _)| j)
    }

    fn branch(node: &Node, var: usize, value: f64) -> (Node, Node) {
        let mut lower_branch = node.clone();
        let mut upper_branch = node.clone();

        // x_var <= floor(value)
        lower_branch.upper[var] = Some(value.floor());
        // x_var >= ceil(value)
        upper_branch.lower[var] = value.ceil();

        (lower_branch, upper_branch)
    }

    fn snap(&self, problem: &IntegerLinearProgram, mut point: Vec<f64>) -> (Vec<f64>, f64) {
        for (x, t) in point.iter_mut().zip(problem.var_types()) {
            if t.is_integral() {
                *x = x.round();
            }
        }
        let value = point
            .iter()
            .zip(problem.objective())
            .map(|(&x, &c)| x * c)
            .sum();
        (point, value)
    }

    fn solve_continuous(&self, problem: &IntegerLinearProgram) -> ILPSolution {
        let result = self.solve_node(problem, &Self::root(problem));
        match result.status {
            LpStatus::Optimal => ILPSolution {
                status: ILPStatus::Optimal,
                objective_value: result.optimal_value,
                duals: Some(result.duals[..problem.num_constraints()].to_vec()),
                values: result.optimal_point,
            },
            LpStatus::Infeasible => ILPSolution::without_point(ILPStatus::Infeasible),
            LpStatus::Unbounded => ILPSolution::without_point(ILPStatus::Unbounded),
            LpStatus::IterationLimit => {
                ILPSolution::without_point(ILPStatus::MaxIterationsReached)
            }
        }
    }
}

impl ILPSolver for BranchAndBoundSolver {
    fn solve(&self, problem: &IntegerLinearProgram) -> Result<ILPSolution, BackendError> {
        if !problem.has_integer_vars() {
            return Ok(self.solve_continuous(problem));
        }

        let started = Instant::now();
        let mut incumbent: Option<(f64, Vec<f64>)> = None;
        let mut nodes = vec![Self::root(problem)];
        let mut explored = 0;
        let mut interrupted = None;

        while let Some(current) = nodes.pop() {
            if explored >= self.options.max_nodes {
                interrupted = Some(ILPStatus::MaxIterationsReached);
                break;
            }
            if let Some(limit) = self.options.time_limit {
                if started.elapsed() >= limit {
                    interrupted = Some(ILPStatus::TimeLimitReached);
                    break;
                }
            }
            explored += 1;

            let relaxation = self.solve_node(problem, &current);
            match relaxation.status {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => continue,
                LpStatus::Unbounded if explored == 1 => {
                    return Ok(ILPSolution::without_point(ILPStatus::Unbounded));
                }
                LpStatus::Unbounded => continue,
                LpStatus::IterationLimit => {
                    interrupted = Some(ILPStatus::MaxIterationsReached);
                    continue;
                }
            }

            if let Some((best, _)) = &incumbent {
                if relaxation.optimal_value >= best - 1e-9 {
                    continue;
                }
            }

            match self.most_fractional(problem, &relaxation.optimal_point) {
                None => {
                    let (point, value) = self.snap(problem, relaxation.optimal_point);
                    incumbent = Some((value, point));
                }
                Some(var) => {
                    let value = relaxation.optimal_point[var];
                    let (lower, upper) = Self::branch(&current, var, value);
                    // Push upper branch first so the lower branch is explored first
                    nodes.push(upper);
                    nodes.push(lower);
                }
            }
        }

        debug!(
            "branch and bound explored {} nodes over {} variables",
            explored,
            problem.num_vars()
        );

        Ok(match (incumbent, interrupted) {
            (Some((value, point)), None) => ILPSolution {
                status: ILPStatus::Optimal,
                objective_value: value,
                values: point,
                duals: None,
            },
            (Some((value, point)), Some(limit)) => {
                warn!(
                    "branch and bound stopped early ({:?}); returning incumbent {}",
                    limit, value
                );
                ILPSolution {
                    status: ILPStatus::Feasible,
                    objective_value: value,
                    values: point,
                    duals: None,
                }
            }
            (None, Some(limit)) => ILPSolution::without_point(limit),
            (None, None) => ILPSolution::without_point(ILPStatus::Infeasible),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::integer_linear::VarId;
    use approx::assert_abs_diff_eq;
    use std::error::Error;

    #[test]
    fn test_simple_ilp() -> Result<(), Box<dyn Error + Send + Sync>> {
        // minimize -x - y subject to:
        // 2x + 2y <= 5
        // x, y integer
        let mut problem = IntegerLinearProgram::new();
        let x = problem.add_var(VarType::Integer, -1.0);
        let y = problem.add_var(VarType::Integer, -1.0);
        problem.add_cons(vec![(x, 2.0), (y, 2.0)], Sense::LessEqual, 5.0);

        let solver = BranchAndBoundSolver::default();
        let solution = solver.solve(&problem)?;

        assert_eq!(solution.status, ILPStatus::Optimal);
        assert_abs_diff_eq!(solution.objective_value, -2.0, epsilon = 1e-6);
        assert!(solution.duals.is_none());
        for value in &solution.values {
            assert_abs_diff_eq!(*value, value.round(), epsilon = 1e-9);
        }

        Ok(())
    }

    #[test]
    fn test_fixed_charge() -> Result<(), Box<dyn Error + Send + Sync>> {
        // Order at least 7 units with a 10-unit setup charge; the order size
        // is capped at 100 when the trigger is on and at least 2.
        let mut problem = IntegerLinearProgram::new();
        let x = problem.add_var(VarType::Integer, 1.0);
        let y = problem.add_var(VarType::Binary, 10.0);
        problem.add_cons(vec![(x, 1.0), (y, -100.0)], Sense::LessEqual, 0.0);
        problem.add_cons(vec![(x, 1.0), (y, -2.0)], Sense::GreaterEqual, 0.0);
        problem.add_cons(vec![(x, 1.0)], Sense::GreaterEqual, 7.0);

        let solution = BranchAndBoundSolver::default().solve(&problem)?;

        assert_eq!(solution.status, ILPStatus::Optimal);
        assert_abs_diff_eq!(solution.value(x), 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.value(y), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.objective_value, 17.0, epsilon = 1e-9);

        Ok(())
    }

    #[test]
    fn test_infeasible_ilp() -> Result<(), Box<dyn Error + Send + Sync>> {
        // x + y <= 5 and x + y >= 6
        let mut problem = IntegerLinearProgram::new();
        let x = problem.add_var(VarType::Integer, 1.0);
        let y = problem.add_var(VarType::Integer, 1.0);
        problem.add_cons(vec![(x, 1.0), (y, 1.0)], Sense::LessEqual, 5.0);
        problem.add_cons(vec![(x, 1.0), (y, 1.0)], Sense::GreaterEqual, 6.0);

        let solution = BranchAndBoundSolver::default().solve(&problem)?;

        assert_eq!(solution.status, ILPStatus::Infeasible);
        Ok(())
    }

    #[test]
    fn test_integrality_gap_infeasible() -> Result<(), Box<dyn Error + Send + Sync>> {
        // 2x = 1 has an LP solution but no integer one.
        let mut problem = IntegerLinearProgram::new();
        let x = problem.add_var(VarType::Integer, 1.0);
        problem.add_cons(vec![(x, 2.0)], Sense::Equal, 1.0);

        let solution = BranchAndBoundSolver::default().solve(&problem)?;

        assert_eq!(solution.status, ILPStatus::Infeasible);
        Ok(())
    }

    #[test]
    fn test_continuous_reports_duals() -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut problem = IntegerLinearProgram::new();
        let x = problem.add_var(VarType::Continuous, 4.0);
        let cover = problem.add_cons(vec![(x, 2.0)], Sense::GreaterEqual, 6.0);

        let solution = BranchAndBoundSolver::default().solve(&problem)?;

        assert_eq!(solution.status, ILPStatus::Optimal);
        assert_abs_diff_eq!(solution.value(x), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.dual(cover).unwrap_or(f64::NAN), 2.0, epsilon = 1e-9);
        assert_eq!(solution.value(VarId(7)), 0.0);
        Ok(())
    }

    #[test]
    fn test_node_limit_without_incumbent() -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut problem = IntegerLinearProgram::new();
        let x = problem.add_var(VarType::Integer, 1.0);
        problem.add_cons(vec![(x, 2.0)], Sense::GreaterEqual, 1.0);

        let solver = BranchAndBoundSolver::new(SolverOptions {
            max_nodes: 1,
            ..SolverOptions::default()
        });
        let solution = solver.solve(&problem)?;

        assert_eq!(solution.status, ILPStatus::MaxIterationsReached);
        Ok(())
    }
}

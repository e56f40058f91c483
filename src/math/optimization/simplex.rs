use ndarray::{Array1, Array2, Axis};

use crate::math::optimization::OptimizationConfig;

/// Direction of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEqual,
    GreaterEqual,
    Equal,
}

/// A linear program over non-negative variables.
///
/// minimize c^T x
/// subject to a_i^T x (sense_i) b_i for every row i
///            x ≥ 0
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// The objective function coefficients (c in min c^T x)
    pub objective: Vec<f64>,
    /// Dense constraint rows, each of length `objective.len()`
    pub constraints: Vec<Vec<f64>>,
    /// Direction of each constraint row
    pub senses: Vec<Sense>,
    /// The right-hand side vector
    pub rhs: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
}

/// Result of a simplex run.
#[derive(Debug, Clone)]
pub struct LpResult {
    pub status: LpStatus,
    /// The optimal point, empty unless `status` is `Optimal`
    pub optimal_point: Vec<f64>,
    pub optimal_value: f64,
    /// Shadow price of every constraint row, in the row's original orientation
    pub duals: Vec<f64>,
    /// Number of pivots performed
    pub iterations: usize,
}

impl LpResult {
    fn without_point(status: LpStatus, iterations: usize) -> Self {
        Self {
            status,
            optimal_point: vec![],
            optimal_value: f64::NAN,
            duals: vec![],
            iterations,
        }
    }
}

const EPSILON: f64 = 1e-9;

enum Phase {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// Dense simplex tableau. Row `m` holds reduced costs; the last column holds
/// the right-hand side (and `-z` in the cost row).
struct Tableau {
    cells: Array2<f64>,
    basis: Vec<usize>,
    rows: usize,
    structural: usize,
    artificial_start: usize,
}

impl Tableau {
    /// Builds the phase-one tableau: one slack or surplus per inequality and one
    /// artificial per row, with every right-hand side made non-negative.
    /// Returns the tableau and the sign each row was multiplied by.
    fn new(lp: &LinearProgram) -> (Self, Vec<f64>) {
        let m = lp.constraints.len();
        let n = lp.objective.len();
        let slack_count = lp.senses.iter().filter(|&&s| s != Sense::Equal).count();
        let artificial_start = n + slack_count;
        let width = artificial_start + m;

        let mut cells = Array2::<f64>::zeros((m + 1, width + 1));
        let mut signs = Vec::with_capacity(m);
        let mut next_slack = n;

        for (i, row) in lp.constraints.iter().enumerate() {
            let sign = if lp.rhs[i] < 0.0 { -1.0 } else { 1.0 };
            for (j, &a) in row.iter().enumerate().take(n) {
                cells[[i, j]] = sign * a;
            }
            match lp.senses[i] {
                Sense::LessEqual => {
                    cells[[i, next_slack]] = sign;
                    next_slack += 1;
                }
                Sense::GreaterEqual => {
                    cells[[i, next_slack]] = -sign;
                    next_slack += 1;
                }
                Sense::Equal => {}
            }
            cells[[i, artificial_start + i]] = 1.0;
            cells[[i, width]] = sign * lp.rhs[i];
            signs.push(sign);
        }

        let tableau = Self {
            cells,
            basis: (artificial_start..width).collect(),
            rows: m,
            structural: n,
            artificial_start,
        };
        (tableau, signs)
    }

    fn width(&self) -> usize {
        self.cells.ncols() - 1
    }

    /// Rewrites the cost row as reduced costs of `costs` for the current basis.
    fn price_out(&mut self, costs: &[f64]) {
        let width = self.width();
        let mut cost_row = Array1::<f64>::zeros(width + 1);
        for (j, &c) in costs.iter().enumerate() {
            cost_row[j] = c;
        }
        for (i, &b) in self.basis.iter().enumerate() {
            let cb = costs[b];
            if cb != 0.0 {
                cost_row.scaled_add(-cb, &self.cells.row(i));
            }
        }
        self.cells.row_mut(self.rows).assign(&cost_row);
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let pivot_element = self.cells[[row, col]];
        self.cells
            .row_mut(row)
            .mapv_inplace(|v| clean(v / pivot_element));
        let pivot_row = self.cells.row(row).to_owned();

        for (i, mut current) in self.cells.axis_iter_mut(Axis(0)).enumerate() {
            if i == row {
                continue;
            }
            let factor = current[col];
            if factor.abs() > EPSILON {
                current.scaled_add(-factor, &pivot_row);
                current.mapv_inplace(clean);
                current[col] = 0.0;
            }
        }
        self.cells[[row, col]] = 1.0;
        self.basis[row] = col;
    }

    /// Runs primal simplex with Bland's rule. Only columns below
    /// `entering_limit` may enter the basis.
    fn iterate(
        &mut self,
        entering_limit: usize,
        config: &OptimizationConfig,
        iterations: &mut usize,
    ) -> Phase {
        let rhs = self.width();
        loop {
            let entering = (0..entering_limit).find(|&j| self.cells[[self.rows, j]] < -EPSILON);
            let Some(col) = entering else {
                return Phase::Optimal;
            };
            if *iterations >= config.max_iterations {
                return Phase::IterationLimit;
            }

            let mut leaving: Option<(usize, f64)> = None;
            for i in 0..self.rows {
                let a = self.cells[[i, col]];
                if a <= EPSILON {
                    continue;
                }
                let ratio = self.cells[[i, rhs]] / a;
                let better = match leaving {
                    None => true,
                    Some((r, best)) => {
                        ratio < best - EPSILON
                            || (ratio <= best + EPSILON && self.basis[i] < self.basis[r])
                    }
                };
                if better {
                    leaving = Some((i, ratio));
                }
            }
            let Some((row, _)) = leaving else {
                return Phase::Unbounded;
            };

            self.pivot(row, col);
            *iterations += 1;
        }
    }

    /// Pivots artificials that stayed basic at zero level onto a structural or
    /// slack column. Rows without such a column are redundant and keep their
    /// artificial.
    fn drive_out_artificials(&mut self) {
        for i in 0..self.rows {
            if self.basis[i] < self.artificial_start {
                continue;
            }
            if let Some(col) =
                (0..self.artificial_start).find(|&j| self.cells[[i, j]].abs() > EPSILON)
            {
                self.pivot(i, col);
            }
        }
    }

    fn point(&self) -> Vec<f64> {
        let rhs = self.width();
        let mut x = vec![0.0; self.structural];
        for (i, &b) in self.basis.iter().enumerate() {
            if b < self.structural {
                x[b] = self.cells[[i, rhs]].max(0.0);
            }
        }
        x
    }

    /// y_i = c_B^T B^{-1} e_i, read off the artificial block which started as
    /// the identity.
    fn duals(&self, costs: &[f64], signs: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|i| {
                let col = self.artificial_start + i;
                let y: f64 = self
                    .basis
                    .iter()
                    .enumerate()
                    .map(|(k, &b)| costs[b] * self.cells[[k, col]])
                    .sum();
                signs[i] * y
            })
            .collect()
    }
}

fn clean(v: f64) -> f64 {
    if v.abs() < EPSILON {
        0.0
    } else {
        v
    }
}

/// Minimizes a linear program with the two-phase simplex method.
///
/// Phase one minimizes the sum of artificial variables to find a basic
/// feasible solution; phase two optimizes the real objective from there.
/// Bland's rule is used throughout, so degenerate problems cannot cycle.
///
/// # Arguments
///
/// * `lp` - The linear program to solve
/// * `config` - Pivot limit and feasibility tolerance
///
/// # Returns
///
/// An `LpResult`. For optimal results `duals[i]` is the shadow price of row
/// `i`: non-negative for `≥` rows and non-positive for `≤` rows.
///
/// # Examples
///
/// ```
/// use replenish::math::optimization::OptimizationConfig;
/// use replenish::math::optimization::simplex::{minimize, LinearProgram, LpStatus, Sense};
///
/// // minimize x + y subject to x + 2y ≥ 4
/// let lp = LinearProgram {
///     objective: vec![1.0, 1.0],
///     constraints: vec![vec![1.0, 2.0]],
///     senses: vec![Sense::GreaterEqual],
///     rhs: vec![4.0],
/// };
///
/// let result = minimize(&lp, &OptimizationConfig::default());
/// assert_eq!(result.status, LpStatus::Optimal);
/// assert!((result.optimal_value - 2.0).abs() < 1e-9);
/// ```
pub fn minimize(lp: &LinearProgram, config: &OptimizationConfig) -> LpResult {
    let (mut tableau, signs) = Tableau::new(lp);
    let width = tableau.width();
    let mut iterations = 0;

    let mut phase_one_costs = vec![0.0; width];
    for c in phase_one_costs.iter_mut().skip(tableau.artificial_start) {
        *c = 1.0;
    }
    tableau.price_out(&phase_one_costs);

    match tableau.iterate(tableau.artificial_start, config, &mut iterations) {
        Phase::Optimal => {}
        Phase::IterationLimit => {
            return LpResult::without_point(LpStatus::IterationLimit, iterations)
        }
        // The phase-one objective is bounded below by zero.
        Phase::Unbounded => return LpResult::without_point(LpStatus::Infeasible, iterations),
    }

    let infeasibility = -tableau.cells[[tableau.rows, width]];
    let scale = lp.rhs.iter().map(|b| b.abs()).sum::<f64>().max(1.0);
    if infeasibility > config.tolerance * scale {
        return LpResult::without_point(LpStatus::Infeasible, iterations);
    }
    tableau.drive_out_artificials();

    let mut costs = vec![0.0; width];
    costs[..lp.objective.len()].copy_from_slice(&lp.objective);
    tableau.price_out(&costs);

    match tableau.iterate(tableau.artificial_start, config, &mut iterations) {
        Phase::Optimal => {}
        Phase::Unbounded => return LpResult::without_point(LpStatus::Unbounded, iterations),
        Phase::IterationLimit => {
            return LpResult::without_point(LpStatus::IterationLimit, iterations)
        }
    }

    let optimal_point = tableau.point();
    let optimal_value = optimal_point
        .iter()
        .zip(lp.objective.iter())
        .map(|(&x, &c)| x * c)
        .sum();

    LpResult {
        status: LpStatus::Optimal,
        duals: tableau.duals(&costs, &signs),
        optimal_point,
        optimal_value,
        iterations,
    }
}

pub mod simplex;

pub use simplex::minimize as simplex_minimize;

/// Configuration options for the simplex method.
#[derive(Debug, Clone)]
pub struct OptimizationConfig {
    /// Maximum number of pivots across both phases
    pub max_iterations: usize,
    /// Feasibility tolerance applied to the phase-one objective
    pub tolerance: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-7,
        }
    }
}

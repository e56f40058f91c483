use thiserror::Error;

use crate::math::integer_linear::ILPStatus;

/// The solve step in which a failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStage {
    /// Continuous restricted master problem solved once per iteration.
    RestrictedMaster,
    /// Integer re-solve of the master problem over the final column pool.
    FinalMaster,
    /// Per-(store, product) pricing subproblem.
    Pricing,
    /// Time-indexed reference formulation.
    Monolithic,
}

impl std::fmt::Display for SolveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolveStage::RestrictedMaster => "restricted master problem",
            SolveStage::FinalMaster => "final integer master problem",
            SolveStage::Pricing => "pricing subproblem",
            SolveStage::Monolithic => "monolithic model",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the replenishment planner.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    #[error("{stage} has no feasible solution")]
    InfeasibleProblem { stage: SolveStage },

    #[error("solver stopped on the {stage} with status {status:?}")]
    SolverFailure { stage: SolveStage, status: ILPStatus },

    #[error("solver backend failed on the {stage}: {message}")]
    Backend { stage: SolveStage, message: String },
}

impl Error {
    pub fn invalid_instance<S: Into<String>>(message: S) -> Self {
        Error::InvalidInstance(message.into())
    }

    /// Maps a non-optimal solver status onto the error taxonomy.
    pub fn from_status(stage: SolveStage, status: ILPStatus) -> Self {
        match status {
            ILPStatus::Infeasible => Error::InfeasibleProblem { stage },
            status => Error::SolverFailure { stage, status },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            Error::from_status(SolveStage::FinalMaster, ILPStatus::Infeasible),
            Error::InfeasibleProblem {
                stage: SolveStage::FinalMaster
            }
        ));
        assert!(matches!(
            Error::from_status(SolveStage::RestrictedMaster, ILPStatus::Unbounded),
            Error::SolverFailure {
                stage: SolveStage::RestrictedMaster,
                status: ILPStatus::Unbounded
            }
        ));
    }

    #[test]
    fn test_display() {
        let err = Error::InfeasibleProblem {
            stage: SolveStage::FinalMaster,
        };
        assert_eq!(
            err.to_string(),
            "final integer master problem has no feasible solution"
        );
    }
}

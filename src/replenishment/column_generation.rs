//! The loop that alternates the continuous master problem with pricing until
//! no pair can improve, then re-solves the master over integers and turns the
//! result into a schedule.

use log::{info, warn};

use crate::error::{Error, Result, SolveStage};
use crate::math::integer_linear::{BranchAndBoundSolver, ILPSolver, SolverOptions};
use crate::replenishment::instance::Instance;
use crate::replenishment::master::{solve_master, Duals, MasterDomain};
use crate::replenishment::pool::ColumnPool;
use crate::replenishment::pricing::{PricingEngine, BIG_M, REDUCED_COST_TOLERANCE};
use crate::replenishment::schedule::{Schedule, ScheduleBuilder};

/// Domain of the column weights in the final master solve. Iterations always
/// solve the continuous relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationDomain {
    /// Any non-negative integer number of copies of a plan
    Integer,
    /// Each plan is used at most once
    Binary,
}

impl RelaxationDomain {
    fn master_domain(self) -> MasterDomain {
        match self {
            RelaxationDomain::Integer => MasterDomain::Integer,
            RelaxationDomain::Binary => MasterDomain::Binary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnGenerationConfig {
    pub max_iterations: usize,
    /// Stop once the relative improvement over the best earlier relaxed
    /// objective falls below this value. `None` disables the check.
    pub optimality_gap_threshold: Option<f64>,
    pub relaxation_domain: RelaxationDomain,
    pub reduced_cost_tolerance: f64,
    /// Largest order, in case packs, the pricing subproblem may place on a day
    pub big_m: f64,
    pub parallel_pricing: bool,
    pub solver: SolverOptions,
}

impl Default for ColumnGenerationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            optimality_gap_threshold: None,
            relaxation_domain: RelaxationDomain::Integer,
            reduced_cost_tolerance: REDUCED_COST_TOLERANCE,
            big_m: BIG_M,
            parallel_pricing: true,
            solver: SolverOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Iterating,
    Converged,
    MaxIterReached,
    FinalizeIntegerSolve,
    Done,
}

/// Why the loop stopped iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Pricing found no column with negative reduced cost
    NoImprovingColumn,
    /// Relative improvement fell below the configured threshold
    GapThreshold,
    /// Iteration cap hit first; the result is not proven converged
    MaxIterations,
}

/// Summary of one master/pricing round.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub objective: f64,
    /// Relative improvement over the best earlier objective, from iteration 1 on
    pub gap: Option<f64>,
    pub columns_added: usize,
    pub pricing_failures: usize,
}

/// Column-generation session over one instance. The pool lives as long as the
/// session and only grows.
pub struct ColumnGeneration<'a, S: ILPSolver + ?Sized> {
    instance: &'a Instance,
    solver: &'a S,
    config: ColumnGenerationConfig,
    pricing: PricingEngine,
    pool: ColumnPool,
    state: LoopState,
    history: Vec<IterationRecord>,
    termination: Option<Termination>,
    best_objective: Option<f64>,
    last_duals: Option<Duals>,
    schedule: Option<Schedule>,
}

impl<'a, S: ILPSolver + ?Sized> ColumnGeneration<'a, S> {
    pub fn new(instance: &'a Instance, solver: &'a S, config: ColumnGenerationConfig) -> Self {
        let pricing = PricingEngine::new(config.big_m, config.reduced_cost_tolerance);
        Self {
            instance,
            solver,
            pricing,
            pool: ColumnPool::new(instance),
            config,
            state: LoopState::Init,
            history: Vec::new(),
            termination: None,
            best_objective: None,
            last_duals: None,
            schedule: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn pool(&self) -> &ColumnPool {
        &self.pool
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn config(&self) -> &ColumnGenerationConfig {
        &self.config
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Duals of the most recent continuous master solve.
    pub fn last_duals(&self) -> Option<&Duals> {
        self.last_duals.as_ref()
    }

    /// Seeds the pool with the heuristic columns. Does nothing once seeded.
    pub fn initialize(&mut self) {
        if self.state != LoopState::Init {
            return;
        }
        self.pool = ColumnPool::seeded(self.instance);
        self.state = LoopState::Iterating;
    }

    /// Advances the state machine by one transition. While iterating, one
    /// transition is one master solve followed by one pricing round.
    /// `FinalizeIntegerSolve` and `Done` are left by `finalize` only.
    pub fn step(&mut self) -> Result<LoopState> {
        match self.state {
            LoopState::Init => self.initialize(),
            LoopState::Iterating => self.iterate()?,
            LoopState::Converged | LoopState::MaxIterReached => {
                self.state = LoopState::FinalizeIntegerSolve;
            }
            LoopState::FinalizeIntegerSolve | LoopState::Done => {}
        }
        Ok(self.state)
    }

    /// Steps until the loop is ready for the final integer solve.
    pub fn run(&mut self) -> Result<LoopState> {
        if self.state == LoopState::Init {
            info!(
                "column generation: {} stores, {} products, {} days",
                self.instance.config().num_stores,
                self.instance.config().num_products,
                self.instance.time_horizon()
            );
        }
        while !matches!(
            self.state,
            LoopState::FinalizeIntegerSolve | LoopState::Done
        ) {
            self.step()?;
        }
        Ok(self.state)
    }

    fn iterate(&mut self) -> Result<()> {
        let iteration = self.history.len();
        if iteration >= self.config.max_iterations {
            warn!(
                "column generation stopped at the iteration cap ({}) before converging",
                self.config.max_iterations
            );
            self.termination = Some(Termination::MaxIterations);
            self.state = LoopState::MaxIterReached;
            return Ok(());
        }

        let relaxed = solve_master(
            self.instance,
            &self.pool,
            MasterDomain::Continuous,
            self.solver,
        )?;
        let duals = relaxed.duals.ok_or_else(|| Error::Backend {
            stage: SolveStage::RestrictedMaster,
            message: "continuous solve returned no duals".to_string(),
        })?;
        let objective = relaxed.objective;

        let gap = self
            .best_objective
            .map(|best| (best - objective) / objective.abs().max(f64::EPSILON));
        self.best_objective = Some(self.best_objective.map_or(objective, |b| b.min(objective)));

        let mut record = IterationRecord {
            iteration,
            objective,
            gap,
            columns_added: 0,
            pricing_failures: 0,
        };

        let gap_reached = match (gap, self.config.optimality_gap_threshold) {
            (Some(gap), Some(threshold)) => gap < threshold,
            _ => false,
        };
        if gap_reached {
            self.finish_iterating(Termination::GapThreshold);
        } else {
            let round = self.pricing.price_all(
                self.instance,
                &duals,
                self.solver,
                iteration,
                self.config.parallel_pricing,
            );
            record.columns_added = round.columns.len();
            record.pricing_failures = round.failures;
            if round.columns.is_empty() {
                self.finish_iterating(Termination::NoImprovingColumn);
            } else {
                self.pool.extend(round.columns);
            }
        }

        info!(
            "iteration {}: objective {:.4}, gap {}, {} columns added, pool size {}",
            iteration,
            objective,
            gap.map_or_else(|| "-".to_string(), |g| format!("{g:.2e}")),
            record.columns_added,
            self.pool.len()
        );
        self.history.push(record);
        self.last_duals = Some(duals);
        Ok(())
    }

    fn finish_iterating(&mut self, termination: Termination) {
        self.termination = Some(termination);
        self.state = LoopState::Converged;
    }

    /// Runs the loop to completion if needed, then solves the master with
    /// integral weights and reconstructs the schedule. Once `Done`, returns the
    /// same schedule without solving again.
    pub fn finalize(&mut self) -> Result<Schedule> {
        if let Some(schedule) = &self.schedule {
            return Ok(schedule.clone());
        }
        self.run()?;
        self.state = LoopState::FinalizeIntegerSolve;

        let domain = self.config.relaxation_domain.master_domain();
        let solution = solve_master(self.instance, &self.pool, domain, self.solver)?;
        let (entries, total_cost) =
            ScheduleBuilder::new(self.instance).build(&self.pool, &solution.weights);
        let termination = self.termination.unwrap_or(Termination::MaxIterations);

        info!(
            "final master objective {:.4} ({:?}), {} order lines, {} columns",
            solution.objective,
            termination,
            entries.len(),
            self.pool.len()
        );
        let schedule = Schedule {
            entries,
            objective: solution.objective,
            relaxed_objective: self.history.last().map(|r| r.objective),
            total_cost,
            iterations: self.history.len(),
            termination,
            pool_size: self.pool.len(),
        };
        self.schedule = Some(schedule.clone());
        self.state = LoopState::Done;
        Ok(schedule)
    }

    pub fn solve(mut self) -> Result<Schedule> {
        self.finalize()
    }
}

/// Plans `instance` with the default configuration and the bundled
/// branch-and-bound backend.
pub fn solve(instance: &Instance) -> Result<Schedule> {
    solve_with(instance, ColumnGenerationConfig::default())
}

pub fn solve_with(instance: &Instance, config: ColumnGenerationConfig) -> Result<Schedule> {
    let solver = BranchAndBoundSolver::new(config.solver.clone());
    ColumnGeneration::new(instance, &solver, config).solve()
}

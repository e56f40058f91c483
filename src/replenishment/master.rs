//! Restricted master problem: pick a weighted combination of pool columns that
//! covers every (store, product, day) requirement at minimum cost, within each
//! product's warehouse capacity.
//!
//! A column covers, per day, the demand its own orders serve. The continuous
//! master also carries one shortage variable per row, priced at the product's
//! shortage cost, so it is feasible on any pool and its demand duals never
//! exceed the shortage cost. The integer master has no shortage variables:
//! the chosen plans must serve the whole requirement.

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result, SolveStage};
use crate::math::integer_linear::{ConsId, ILPSolver, ILPStatus, IntegerLinearProgram, Sense, VarType};
use crate::replenishment::instance::Instance;
use crate::replenishment::inventory::net_requirement;
use crate::replenishment::pool::ColumnPool;

/// Identity of one demand-covering row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DemandKey {
    pub store: usize,
    pub product: usize,
    pub day: usize,
}

/// Shadow prices of one continuous master solve.
///
/// Demand duals are per unit of covered requirement and non-negative; capacity
/// duals are per unit shipped and non-positive. Missing entries read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Duals {
    demand: HashMap<DemandKey, f64>,
    capacity: Vec<f64>,
}

impl Duals {
    pub fn new(num_products: usize) -> Self {
        Self {
            demand: HashMap::new(),
            capacity: vec![0.0; num_products],
        }
    }

    pub fn demand(&self, store: usize, product: usize, day: usize) -> f64 {
        self.demand
            .get(&DemandKey {
                store,
                product,
                day,
            })
            .copied()
            .unwrap_or(0.0)
    }

    pub fn capacity(&self, product: usize) -> f64 {
        self.capacity.get(product).copied().unwrap_or(0.0)
    }

    pub fn set_demand(&mut self, store: usize, product: usize, day: usize, value: f64) {
        self.demand.insert(
            DemandKey {
                store,
                product,
                day,
            },
            value,
        );
    }

    pub fn set_capacity(&mut self, product: usize, value: f64) {
        self.capacity[product] = value;
    }

    pub fn iter_demand(&self) -> impl Iterator<Item = (&DemandKey, &f64)> {
        self.demand.iter()
    }
}

/// Domain of the column weights λ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterDomain {
    /// Continuous relaxation with shortage variables; duals are reported.
    Continuous,
    /// Non-negative integers; demand must be served by orders.
    Integer,
    /// Zero or one per column; demand must be served by orders.
    Binary,
}

impl MasterDomain {
    fn var_type(self) -> VarType {
        match self {
            MasterDomain::Continuous => VarType::Continuous,
            MasterDomain::Integer => VarType::Integer,
            MasterDomain::Binary => VarType::Binary,
        }
    }

    fn stage(self) -> SolveStage {
        match self {
            MasterDomain::Continuous => SolveStage::RestrictedMaster,
            _ => SolveStage::FinalMaster,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MasterSolution {
    pub status: ILPStatus,
    pub objective: f64,
    /// λ per column, indexed like the pool; shortage variables are dropped
    pub weights: Vec<f64>,
    /// Present for continuous solves only
    pub duals: Option<Duals>,
}

/// The master model over a column pool, with the row bookkeeping needed to
/// read duals back by key.
pub struct MasterProblem {
    model: IntegerLinearProgram,
    demand_rows: Vec<(DemandKey, ConsId)>,
    capacity_rows: Vec<(usize, ConsId)>,
    domain: MasterDomain,
    num_products: usize,
    num_columns: usize,
}

impl MasterProblem {
    pub fn build(instance: &Instance, pool: &ColumnPool, domain: MasterDomain) -> Self {
        let mut model = IntegerLinearProgram::new();
        let lambda: Vec<_> = pool
            .columns()
            .iter()
            .map(|column| model.add_var(domain.var_type(), column.supply_cost()))
            .collect();

        let mut demand_rows = Vec::with_capacity(instance.num_pairs() * instance.time_horizon());
        for pair in instance.pairs() {
            let requirement = net_requirement(instance, pair);
            let shortage_cost = instance.product(pair.product).shortage_cost;
            let ids = pool.ids_for(pair);
            for (day, &needed) in requirement.iter().enumerate() {
                if needed == 0 {
                    continue;
                }
                let mut terms: Vec<_> = ids
                    .iter()
                    .map(|&id| (lambda[id.index()], pool.get(id).coverage(day) as f64))
                    .collect();
                if domain == MasterDomain::Continuous {
                    terms.push((model.add_var(VarType::Continuous, shortage_cost), 1.0));
                }
                let row = model.add_cons(terms, Sense::GreaterEqual, needed as f64);
                let key = DemandKey {
                    store: pair.store,
                    product: pair.product,
                    day,
                };
                demand_rows.push((key, row));
            }
        }

        let num_products = instance.config().num_products;
        let mut shipped: Vec<Vec<_>> = vec![Vec::new(); num_products];
        for (id, column) in pool.iter() {
            if column.units() > 0 {
                shipped[column.pair().product].push((lambda[id.index()], column.units() as f64));
            }
        }
        let capacity_rows = shipped
            .into_iter()
            .enumerate()
            .map(|(product, terms)| {
                let capacity = instance.product(product).warehouse_capacity as f64;
                (product, model.add_cons(terms, Sense::LessEqual, capacity))
            })
            .collect();

        Self {
            model,
            demand_rows,
            capacity_rows,
            domain,
            num_products,
            num_columns: pool.len(),
        }
    }

    pub fn model(&self) -> &IntegerLinearProgram {
        &self.model
    }

    pub fn solve<S: ILPSolver + ?Sized>(&self, solver: &S) -> Result<MasterSolution> {
        let stage = self.domain.stage();
        let solution = solver.solve(&self.model).map_err(|e| Error::Backend {
            stage,
            message: e.to_string(),
        })?;
        if !solution.has_solution() {
            return Err(Error::from_status(stage, solution.status));
        }

        let duals = match self.domain {
            MasterDomain::Continuous => Some(self.collect_duals(&solution.duals).ok_or_else(
                || Error::Backend {
                    stage,
                    message: "continuous solve returned no duals".to_string(),
                },
            )?),
            _ => None,
        };
        debug!(
            "{} solved: {} columns, objective {:.4}",
            stage,
            self.model.num_vars(),
            solution.objective_value
        );

        Ok(MasterSolution {
            status: solution.status,
            objective: solution.objective_value,
            weights: solution.values[..self.num_columns.min(solution.values.len())].to_vec(),
            duals,
        })
    }

    fn collect_duals(&self, values: &Option<Vec<f64>>) -> Option<Duals> {
        let values = values.as_ref()?;
        let mut duals = Duals::new(self.num_products);
        for (key, row) in &self.demand_rows {
            duals.set_demand(key.store, key.product, key.day, *values.get(row.index())?);
        }
        for (product, row) in &self.capacity_rows {
            duals.set_capacity(*product, *values.get(row.index())?);
        }
        Some(duals)
    }
}

/// Builds and solves the master over `pool` in one call.
pub fn solve_master<S: ILPSolver + ?Sized>(
    instance: &Instance,
    pool: &ColumnPool,
    domain: MasterDomain,
    solver: &S,
) -> Result<MasterSolution> {
    MasterProblem::build(instance, pool, domain).solve(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::integer_linear::BranchAndBoundSolver;
    use crate::replenishment::column::{Column, ColumnOrigin};
    use crate::replenishment::instance::{Config, Demand, InitialInventory, Pair, Product};
    use approx::assert_abs_diff_eq;

    fn instance(capacity: u64) -> Instance {
        let config = Config {
            num_stores: 1,
            num_products: 1,
            time_horizon: 3,
            products: vec![Product {
                ordering_cost: 10.0,
                holding_cost: 1.0,
                shortage_cost: 100.0,
                case_pack_size: 5,
                min_order_qty: 1,
                warehouse_capacity: capacity,
            }],
        };
        let demand = Demand::from_fn(1, 1, 3, |_, _, t| [10, 0, 5][t]);
        Instance::new(config, demand, InitialInventory::zeros(1, 1)).unwrap()
    }

    #[test]
    fn test_relaxed_master_picks_greedy() -> Result<()> {
        let instance = instance(1_000);
        let pool = ColumnPool::seeded(&instance);
        let solver = BranchAndBoundSolver::default();

        let solution = solve_master(&instance, &pool, MasterDomain::Continuous, &solver)?;

        assert_abs_diff_eq!(solution.objective, 20.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.weights[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.weights[1], 0.0, epsilon = 1e-6);

        // Strong duality over the demand rows (capacity is slack).
        let duals = solution.duals.expect("continuous solve reports duals");
        let requirement = [10.0, 0.0, 5.0];
        let dual_value: f64 = (0..3).map(|t| duals.demand(0, 0, t) * requirement[t]).sum();
        assert_abs_diff_eq!(dual_value, 20.0, epsilon = 1e-6);
        assert_abs_diff_eq!(duals.capacity(0), 0.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_zero_capacity_relaxation_falls_back_to_shortage() -> Result<()> {
        let instance = instance(0);
        let pool = ColumnPool::seeded(&instance);
        let solver = BranchAndBoundSolver::default();

        let solution = solve_master(&instance, &pool, MasterDomain::Continuous, &solver)?;

        assert_abs_diff_eq!(solution.objective, 1_500.0, epsilon = 1e-6);
        assert_eq!(solution.weights.len(), pool.len());
        assert_abs_diff_eq!(solution.weights[0], 0.0, epsilon = 1e-6);
        // Shortage variables are basic, so each covered unit is worth its shortage cost.
        let duals = solution.duals.expect("continuous solve reports duals");
        assert_abs_diff_eq!(duals.demand(0, 0, 0), 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(duals.demand(0, 0, 2), 100.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_zero_capacity_integer_master_is_infeasible() {
        let instance = instance(0);
        let pool = ColumnPool::seeded(&instance);
        let solver = BranchAndBoundSolver::default();

        let result = solve_master(&instance, &pool, MasterDomain::Integer, &solver);

        assert!(matches!(
            result,
            Err(Error::InfeasibleProblem {
                stage: SolveStage::FinalMaster
            })
        ));
    }

    #[test]
    fn test_coverage_depends_on_orders() -> Result<()> {
        // A plan ordering only on day 0 enters the day-0 row and nothing else.
        let instance = instance(1_000);
        let mut pool = ColumnPool::seeded(&instance);
        let early = pool.push(Column::new(
            &instance,
            Pair {
                store: 0,
                product: 0,
            },
            vec![2, 0, 0],
            ColumnOrigin::Pricing { iteration: 0 },
        ));
        let master = MasterProblem::build(&instance, &pool, MasterDomain::Continuous);

        let day0 = &master.model().constraints()[0];
        let day2 = &master.model().constraints()[1];
        assert!(day0.terms.iter().any(|&(v, c)| v.index() == early.index() && c == 10.0));
        assert!(day2.terms.iter().all(|&(v, _)| v.index() != early.index()));

        let solution = master.solve(&BranchAndBoundSolver::default())?;
        assert_abs_diff_eq!(solution.objective, 20.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_row_layout() {
        let instance = instance(1_000);
        let pool = ColumnPool::seeded(&instance);
        let master = MasterProblem::build(&instance, &pool, MasterDomain::Integer);

        // Day 1 has no requirement: 2 demand rows + 1 capacity row, one λ per column.
        assert_eq!(master.model().num_constraints(), 3);
        assert_eq!(master.model().num_vars(), pool.len());

        // The continuous master adds one shortage variable per demand row.
        let relaxed = MasterProblem::build(&instance, &pool, MasterDomain::Continuous);
        assert_eq!(relaxed.model().num_vars(), pool.len() + 2);
        let ids = pool.ids_for(Pair {
            store: 0,
            product: 0,
        });
        assert_eq!(ids.len(), 2);
    }
}

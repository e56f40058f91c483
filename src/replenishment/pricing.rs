//! Pricing: one small lot-sizing problem per (store, product) pair that looks
//! for an ordering plan with negative reduced cost under the current master
//! duals.
//!
//! The subproblem tracks the inventory balance day by day, so it charges
//! holding on stock actually carried and earns a demand dual only on units
//! actually sold that day. Its optimum is the reduced cost of the best plan,
//! up to the constant value of what starting stock sells on its own. Each
//! candidate is still simulated into a column and admitted only when its exact
//! reduced cost is negative.

use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{Error, Result, SolveStage};
use crate::math::integer_linear::{ILPSolver, IntegerLinearProgram, Sense, VarId, VarType};
use crate::replenishment::column::{Column, ColumnOrigin};
use crate::replenishment::instance::{Instance, Pair};
use crate::replenishment::inventory::net_requirement;
use crate::replenishment::master::Duals;

/// Case packs a single day may order in the subproblem.
pub const BIG_M: f64 = 100.0;

/// Reduced cost below which a plan counts as improving.
pub const REDUCED_COST_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct PricingEngine {
    big_m: f64,
    tolerance: f64,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(BIG_M, REDUCED_COST_TOLERANCE)
    }
}

/// Columns found by one pricing round, in pair enumeration order.
#[derive(Debug, Clone, Default)]
pub struct PricingRound {
    pub columns: Vec<Column>,
    /// Pairs whose subproblem could not be solved this round
    pub failures: usize,
}

/// Subproblem for one pair: order quantities `x_t`, order triggers `y_t`,
/// end-of-day stock and units sold.
struct Subproblem {
    model: IntegerLinearProgram,
    orders: Vec<VarId>,
    /// Dual value of the sales starting stock makes without any order
    baseline: f64,
}

impl PricingEngine {
    pub fn new(big_m: f64, tolerance: f64) -> Self {
        Self { big_m, tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn subproblem(&self, instance: &Instance, pair: Pair, duals: &Duals) -> Subproblem {
        let product = instance.product(pair.product);
        let pack = f64::from(product.case_pack_size);
        let moq = f64::from(product.min_order_qty);
        let capacity_dual = duals.capacity(pair.product);
        let demand = instance.demand_series(pair);
        let requirement = net_requirement(instance, pair);

        let mut model = IntegerLinearProgram::new();
        let mut orders = Vec::with_capacity(demand.len());
        let mut previous_stock: Option<VarId> = None;
        let mut baseline = 0.0;
        let mut remaining: u64 = requirement.iter().sum();

        for (day, &wanted) in demand.iter().enumerate() {
            let dual = duals.demand(pair.store, pair.product, day);
            baseline += dual * (wanted - requirement[day]) as f64;

            // Ordering past the remaining requirement only adds cost.
            let limit = (remaining as f64 / pack).ceil().max(moq).min(self.big_m.max(moq));
            remaining -= requirement[day];

            let x = model.add_var(VarType::Integer, -capacity_dual * pack);
            let y = model.add_var(VarType::Binary, product.ordering_cost);
            let stock = model.add_var(VarType::Continuous, product.holding_cost);
            let sold = model.add_var(VarType::Continuous, -dual);

            // stock[t-1] + pack * x - sold - stock[t] = 0
            let mut balance = vec![(x, pack), (sold, -1.0), (stock, -1.0)];
            let rhs = match previous_stock {
                Some(prev) => {
                    balance.push((prev, 1.0));
                    0.0
                }
                None => -(instance.starting_stock(pair) as f64),
            };
            model.add_cons(balance, Sense::Equal, rhs);
            model.add_cons(vec![(sold, 1.0)], Sense::LessEqual, wanted as f64);
            model.add_cons(vec![(x, 1.0), (y, -limit)], Sense::LessEqual, 0.0);
            model.add_cons(vec![(x, 1.0), (y, -moq)], Sense::GreaterEqual, 0.0);

            orders.push(x);
            previous_stock = Some(stock);
        }
        Subproblem {
            model,
            orders,
            baseline,
        }
    }

    /// Solves the subproblem of one pair. Returns `Ok(None)` when the pair has
    /// no improving plan under `duals`.
    pub fn price_pair<S: ILPSolver + ?Sized>(
        &self,
        instance: &Instance,
        pair: Pair,
        duals: &Duals,
        solver: &S,
        iteration: usize,
    ) -> Result<Option<Column>> {
        let subproblem = self.subproblem(instance, pair, duals);
        let solution = solver
            .solve(&subproblem.model)
            .map_err(|e| Error::Backend {
                stage: SolveStage::Pricing,
                message: e.to_string(),
            })?;
        if !solution.has_solution() {
            return Err(Error::from_status(SolveStage::Pricing, solution.status));
        }
        let value = solution.objective_value + subproblem.baseline;
        if value >= -self.tolerance {
            return Ok(None);
        }

        let orders = subproblem
            .orders
            .iter()
            .map(|&x| solution.value(x).round().max(0.0) as u64)
            .collect();
        let column = Column::new(instance, pair, orders, ColumnOrigin::Pricing { iteration });
        let reduced_cost = column.reduced_cost(duals);
        if reduced_cost >= -self.tolerance {
            debug!(
                "pair ({}, {}): subproblem value {:.4} but plan reduced cost {:.4}; rejected",
                pair.store, pair.product, value, reduced_cost
            );
            return Ok(None);
        }
        Ok(Some(column))
    }

    /// Prices every pair against the same duals. Pairs are independent; with
    /// `parallel` they are evaluated on the rayon pool, and the result order is
    /// the pair enumeration order either way.
    pub fn price_all<S: ILPSolver + ?Sized>(
        &self,
        instance: &Instance,
        duals: &Duals,
        solver: &S,
        iteration: usize,
        parallel: bool,
    ) -> PricingRound {
        let pairs: Vec<Pair> = instance.pairs().collect();
        let price = |&pair: &Pair| (pair, self.price_pair(instance, pair, duals, solver, iteration));
        let results: Vec<_> = if parallel {
            pairs.par_iter().map(price).collect()
        } else {
            pairs.iter().map(price).collect()
        };

        let mut round = PricingRound::default();
        for (pair, result) in results {
            match result {
                Ok(Some(column)) => round.columns.push(column),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "pricing failed for store {} product {}: {}",
                        pair.store, pair.product, e
                    );
                    round.failures += 1;
                }
            }
        }
        round
    }
}

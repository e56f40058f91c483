//! Time-indexed reference model over all pairs at once. Exact but grows with
//! the whole network, so it is only practical on small instances, where it
//! serves as a check on the decomposition.

use log::debug;

use crate::error::{Error, Result, SolveStage};
use crate::math::integer_linear::{ILPSolver, IntegerLinearProgram, Sense, VarId, VarType};
use crate::replenishment::instance::Instance;

/// Case packs a single day may order in the reference model.
pub const MONOLITHIC_BIG_M: f64 = 1000.0;

#[derive(Debug, Clone)]
pub struct MonolithicSolution {
    pub objective: f64,
    /// Case packs per day, one plan per pair in pair enumeration order
    pub orders: Vec<Vec<u64>>,
}

struct DayVars {
    packs: VarId,
    ordered: VarId,
    inventory: VarId,
    shortage: VarId,
}

/// Builds and solves the reference model:
///
/// * `inv[t-1] + case_pack * x[t] + short[t] - inv[t] = demand[t]`
/// * `moq * y[t] <= x[t] <= M * y[t]`
/// * `sum over stores and days of case_pack * x <= warehouse_capacity` per product
///
/// minimizing ordering, holding and shortage cost.
pub fn solve_monolithic<S: ILPSolver + ?Sized>(
    instance: &Instance,
    solver: &S,
) -> Result<MonolithicSolution> {
    let num_products = instance.config().num_products;
    let mut model = IntegerLinearProgram::new();
    let mut shipped: Vec<Vec<(VarId, f64)>> = vec![Vec::new(); num_products];
    let mut plans = Vec::with_capacity(instance.num_pairs());

    for pair in instance.pairs() {
        let product = instance.product(pair.product);
        let pack = f64::from(product.case_pack_size);
        let demand = instance.demand_series(pair);

        let mut days: Vec<DayVars> = Vec::with_capacity(demand.len());
        for (t, &wanted) in demand.iter().enumerate() {
            let vars = DayVars {
                packs: model.add_var(VarType::Integer, 0.0),
                ordered: model.add_var(VarType::Binary, product.ordering_cost),
                inventory: model.add_var(VarType::Continuous, product.holding_cost),
                shortage: model.add_var(VarType::Continuous, product.shortage_cost),
            };

            let mut balance = vec![
                (vars.packs, pack),
                (vars.shortage, 1.0),
                (vars.inventory, -1.0),
            ];
            let mut rhs = wanted as f64;
            match t {
                0 => rhs -= instance.starting_stock(pair) as f64,
                _ => balance.push((days[t - 1].inventory, 1.0)),
            }
            model.add_cons(balance, Sense::Equal, rhs);
            model.add_cons(
                vec![(vars.packs, 1.0), (vars.ordered, -MONOLITHIC_BIG_M)],
                Sense::LessEqual,
                0.0,
            );
            model.add_cons(
                vec![(vars.packs, 1.0), (vars.ordered, -f64::from(product.min_order_qty))],
                Sense::GreaterEqual,
                0.0,
            );
            shipped[pair.product].push((vars.packs, pack));
            days.push(vars);
        }
        plans.push(days);
    }

    for (p, terms) in shipped.into_iter().enumerate() {
        let capacity = instance.product(p).warehouse_capacity as f64;
        model.add_cons(terms, Sense::LessEqual, capacity);
    }

    debug!(
        "monolithic model: {} variables, {} constraints",
        model.num_vars(),
        model.num_constraints()
    );
    let solution = solver.solve(&model).map_err(|e| Error::Backend {
        stage: SolveStage::Monolithic,
        message: e.to_string(),
    })?;
    if !solution.has_solution() {
        return Err(Error::from_status(SolveStage::Monolithic, solution.status));
    }

    let orders = plans
        .iter()
        .map(|days| {
            days.iter()
                .map(|vars| solution.value(vars.packs).round().max(0.0) as u64)
                .collect()
        })
        .collect();

    Ok(MonolithicSolution {
        objective: solution.objective_value,
        orders,
    })
}

//! Forward inventory simulation of a day-by-day order plan.

use crate::replenishment::instance::{Instance, Pair, Product};

/// Day-by-day trace of one plan for one (store, product) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub starting: Vec<u64>,
    pub served: Vec<u64>,
    pub shortage: Vec<u64>,
    pub ending: Vec<u64>,
    /// Ordering + holding + shortage cost of the plan
    pub cost: f64,
}

/// Applies `orders` (case packs per day) against `demand`, clipping inventory
/// at zero and recording unmet demand as shortage.
///
/// Holding cost is charged on end-of-day stock.
pub fn simulate(orders: &[u64], demand: &[u64], initial: u64, product: &Product) -> Simulation {
    let horizon = demand.len();
    let mut trace = Simulation {
        starting: Vec::with_capacity(horizon),
        served: Vec::with_capacity(horizon),
        shortage: Vec::with_capacity(horizon),
        ending: Vec::with_capacity(horizon),
        cost: 0.0,
    };

    let mut inventory = initial;
    for (t, &wanted) in demand.iter().enumerate() {
        let packs = orders.get(t).copied().unwrap_or(0);
        trace.starting.push(inventory);

        let available = inventory + product.units(packs);
        let served = available.min(wanted);
        let short = wanted - served;
        inventory = available - served;

        if packs > 0 {
            trace.cost += product.ordering_cost;
        }
        trace.cost += product.holding_cost * inventory as f64;
        trace.cost += product.shortage_cost * short as f64;

        trace.served.push(served);
        trace.shortage.push(short);
        trace.ending.push(inventory);
    }
    trace
}

/// Simulates `orders` for `pair` against the instance's demand and stock.
pub fn simulate_pair(instance: &Instance, pair: Pair, orders: &[u64]) -> Simulation {
    simulate(
        orders,
        instance.demand_series(pair),
        instance.starting_stock(pair),
        instance.product(pair.product),
    )
}

/// Demand left after the starting stock has been drawn down in day order:
/// the units that have to come from orders or be written off as shortage.
pub fn net_requirement(instance: &Instance, pair: Pair) -> Vec<u64> {
    simulate_pair(instance, pair, &[]).shortage
}

/// Days the stock on hand after `day` lasts at the average remaining daily
/// demand, capped at the days left in the horizon.
pub fn days_of_inventory_left(ending: u64, demand: &[u64], day: usize) -> f64 {
    let remaining_days = demand.len().saturating_sub(day + 1);
    let future: u64 = demand.iter().skip(day + 1).sum();
    if future == 0 {
        return remaining_days as f64;
    }
    let daily = future as f64 / remaining_days as f64;
    (ending as f64 / daily).min(remaining_days as f64)
}

use crate::replenishment::instance::{Instance, Pair};
use crate::replenishment::inventory::{net_requirement, simulate_pair};
use crate::replenishment::master::Duals;

/// How a column entered the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// Orders just enough, respecting MOQ, whenever demand exceeds stock
    GreedyCover,
    /// Never orders; all uncovered demand is shortage
    ZeroOrder,
    /// Produced by the pricing subproblem in the given iteration
    Pricing { iteration: usize },
}

/// A complete ordering plan for one (store, product) pair.
///
/// The plan is simulated once on creation. `served_by_orders[t]` is the part of
/// day `t` demand served thanks to the plan's orders, on top of what starting
/// stock alone would serve; together with `shortage[t]` it always adds up to
/// the pair's net requirement for that day.
///
/// In the master problem a column is charged its supply cost (ordering plus
/// holding) and covers `served_by_orders`; its shortage is left to the master's
/// per-day shortage variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pair: Pair,
    origin: ColumnOrigin,
    orders: Vec<u64>,
    served_by_orders: Vec<u64>,
    shortage: Vec<u64>,
    units: u64,
    cost: f64,
    supply_cost: f64,
}

impl Column {
    /// Builds a column from per-day case-pack orders. `orders` must have one
    /// entry per day of the horizon.
    pub fn new(instance: &Instance, pair: Pair, orders: Vec<u64>, origin: ColumnOrigin) -> Self {
        debug_assert_eq!(orders.len(), instance.time_horizon());
        let trace = simulate_pair(instance, pair, &orders);
        let baseline = net_requirement(instance, pair);
        let served_by_orders = baseline
            .iter()
            .zip(&trace.shortage)
            .map(|(&needed, &short)| needed.saturating_sub(short))
            .collect();
        let product = instance.product(pair.product);
        let units = orders.iter().map(|&packs| product.units(packs)).sum();
        let short: u64 = trace.shortage.iter().sum();
        let supply_cost = trace.cost - product.shortage_cost * short as f64;

        Self {
            pair,
            origin,
            served_by_orders,
            shortage: trace.shortage,
            units,
            cost: trace.cost,
            supply_cost,
            orders,
        }
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    pub fn origin(&self) -> ColumnOrigin {
        self.origin
    }

    /// Case packs ordered per day.
    pub fn orders(&self) -> &[u64] {
        &self.orders
    }

    pub fn served_by_orders(&self) -> &[u64] {
        &self.served_by_orders
    }

    pub fn shortage(&self) -> &[u64] {
        &self.shortage
    }

    /// Total units ordered over the horizon.
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Ordering + holding + shortage cost of the plan on its own.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Ordering + holding cost; the objective coefficient in the master.
    pub fn supply_cost(&self) -> f64 {
        self.supply_cost
    }

    /// Requirement of day `day` this plan meets from its own orders.
    pub fn coverage(&self, day: usize) -> u64 {
        self.served_by_orders[day]
    }

    /// Reduced cost against the duals of the continuous master.
    pub fn reduced_cost(&self, duals: &Duals) -> f64 {
        let Pair { store, product } = self.pair;
        let covered: f64 = (0..self.orders.len())
            .map(|t| duals.demand(store, product, t) * self.coverage(t) as f64)
            .sum();
        self.supply_cost - covered - duals.capacity(product) * self.units as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replenishment::instance::{Config, Demand, InitialInventory, Product};
    use approx::assert_abs_diff_eq;

    fn instance(initial: u64) -> Instance {
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
                warehouse_capacity: 1_000,
            }],
        };
        let demand = Demand::from_fn(1, 1, 3, |_, _, t| [10, 0, 5][t]);
        Instance::new(config, demand, InitialInventory::from_fn(1, 1, |_, _| initial)).unwrap()
    }

    const PAIR: Pair = Pair {
        store: 0,
        product: 0,
    };

    #[test]
    fn test_coverage_adds_up_to_requirement() {
        let instance = instance(4);
        let column = Column::new(&instance, PAIR, vec![1, 0, 0], ColumnOrigin::GreedyCover);

        // Stock serves 4 of day 0; the order covers 5 more; 1 unit short.
        assert_eq!(column.served_by_orders(), &[5, 0, 0]);
        assert_eq!(column.shortage(), &[1, 0, 5]);
        let requirement = net_requirement(&instance, PAIR);
        for t in 0..3 {
            assert_eq!(column.coverage(t) + column.shortage()[t], requirement[t]);
        }
        assert_eq!(column.units(), 5);
        assert_abs_diff_eq!(column.cost(), 10.0 + 600.0, epsilon = 1e-9);
        assert_abs_diff_eq!(column.supply_cost(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reduced_cost() {
        let instance = instance(0);
        let column = Column::new(&instance, PAIR, vec![2, 0, 1], ColumnOrigin::GreedyCover);
        assert_abs_diff_eq!(column.cost(), 20.0, epsilon = 1e-9);

        let mut duals = Duals::new(1);
        duals.set_demand(0, 0, 0, 1.5);
        duals.set_demand(0, 0, 2, 2.0);
        duals.set_capacity(0, -0.1);

        // 20 - (1.5 * 10 + 2 * 5) + 0.1 * 15
        assert_abs_diff_eq!(column.reduced_cost(&duals), -3.5, epsilon = 1e-9);
    }

    #[test]
    fn test_coverage_follows_orders() {
        let instance = instance(0);
        let early = Column::new(&instance, PAIR, vec![2, 0, 0], ColumnOrigin::GreedyCover);
        let late = Column::new(&instance, PAIR, vec![0, 0, 1], ColumnOrigin::GreedyCover);

        assert_eq!(early.served_by_orders(), &[10, 0, 0]);
        assert_eq!(late.served_by_orders(), &[0, 0, 5]);

        // Only the day the plan serves earns its dual.
        let mut duals = Duals::new(1);
        duals.set_demand(0, 0, 0, 3.0);
        assert_abs_diff_eq!(early.reduced_cost(&duals), 10.0 - 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(late.reduced_cost(&duals), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_order_cost_counts_only_net_requirement() {
        // 8 units of starting stock serve day 0 in part; only the remaining
        // 2 + 5 units are charged as shortage.
        let stocked = instance(8);
        let column = Column::new(&stocked, PAIR, vec![0; 3], ColumnOrigin::ZeroOrder);

        assert_eq!(column.shortage(), &[2, 0, 5]);
        assert_eq!(column.served_by_orders(), &[0, 0, 0]);
        assert_abs_diff_eq!(column.cost(), 700.0, epsilon = 1e-9);
        assert_abs_diff_eq!(column.supply_cost(), 0.0, epsilon = 1e-9);

        let unstocked = instance(0);
        let empty = Column::new(&unstocked, PAIR, vec![0; 3], ColumnOrigin::ZeroOrder);
        assert_abs_diff_eq!(empty.cost(), 1_500.0, epsilon = 1e-9);
    }
}

//! Turns the integer master solution into an implementable day-by-day order
//! plan with inventory metrics.

use crate::replenishment::column_generation::Termination;
use crate::replenishment::instance::Instance;
use crate::replenishment::inventory::{days_of_inventory_left, simulate_pair};
use crate::replenishment::pool::{ColumnId, ColumnPool};

/// Weights at or below this value count as unselected.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One order line of the final plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub store: usize,
    pub product: usize,
    pub day: usize,
    pub case_packs: u64,
    pub units: u64,
    pub demand: u64,
    /// Stock at the start of the day, before the order arrives
    pub starting_inventory: u64,
    pub ending_inventory: u64,
    pub shortage: u64,
    pub days_of_inventory_left: f64,
}

/// The planner's output.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
    /// Objective of the integer master problem
    pub objective: f64,
    /// Last continuous master objective, if any iteration ran
    pub relaxed_objective: Option<f64>,
    /// Simulated ordering + holding + shortage cost of the combined plan
    pub total_cost: f64,
    pub iterations: usize,
    pub termination: Termination,
    pub pool_size: usize,
}

impl Schedule {
    /// True when the loop hit its iteration cap before converging.
    pub fn is_degraded(&self) -> bool {
        self.termination == Termination::MaxIterations
    }

    pub fn entries_for(&self, store: usize, product: usize) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries
            .iter()
            .filter(move |e| e.store == store && e.product == product)
    }

    pub fn total_units(&self) -> u64 {
        self.entries.iter().map(|e| e.units).sum()
    }
}

pub struct ScheduleBuilder<'a> {
    instance: &'a Instance,
}

impl<'a> ScheduleBuilder<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Emits one entry per selected column and ordering day, with inventory
    /// simulated per pair over the combined orders of all selected columns.
    /// Returns the entries and the simulated cost of the combined plan.
    pub fn build(&self, pool: &ColumnPool, weights: &[f64]) -> (Vec<ScheduleEntry>, f64) {
        let horizon = self.instance.time_horizon();
        let mut entries = Vec::new();
        let mut total_cost = 0.0;

        for pair in self.instance.pairs() {
            let selected: Vec<(ColumnId, u64)> = pool
                .ids_for(pair)
                .iter()
                .filter_map(|&id| {
                    let weight = weights.get(id.index()).copied().unwrap_or(0.0);
                    (weight > WEIGHT_TOLERANCE).then(|| (id, weight.round().max(1.0) as u64))
                })
                .collect();

            let mut combined = vec![0; horizon];
            for &(id, multiplier) in &selected {
                for (total, &packs) in combined.iter_mut().zip(pool.get(id).orders()) {
                    *total += packs * multiplier;
                }
            }
            let trace = simulate_pair(self.instance, pair, &combined);
            total_cost += trace.cost;

            let demand = self.instance.demand_series(pair);
            let product = self.instance.product(pair.product);
            for day in 0..horizon {
                for &(id, multiplier) in &selected {
                    let packs = pool.get(id).orders()[day];
                    if packs == 0 {
                        continue;
                    }
                    let case_packs = packs * multiplier;
                    entries.push(ScheduleEntry {
                        store: pair.store,
                        product: pair.product,
                        day,
                        case_packs,
                        units: product.units(case_packs),
                        demand: demand[day],
                        starting_inventory: trace.starting[day],
                        ending_inventory: trace.ending[day],
                        shortage: trace.shortage[day],
                        days_of_inventory_left: days_of_inventory_left(
                            trace.ending[day],
                            demand,
                            day,
                        ),
                    });
                }
            }
        }

        (entries, total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replenishment::column::{Column, ColumnOrigin};
    use crate::replenishment::instance::{Config, Demand, InitialInventory, Pair, Product};
    use approx::assert_abs_diff_eq;

    fn instance() -> Instance {
        let config = Config {
            num_stores: 1,
            num_products: 1,
            time_horizon: 4,
            products: vec![Product {
                ordering_cost: 10.0,
                holding_cost: 1.0,
                shortage_cost: 100.0,
                case_pack_size: 5,
                min_order_qty: 1,
                warehouse_capacity: 1_000,
            }],
        };
        let demand = Demand::from_fn(1, 1, 4, |_, _, t| [5, 5, 2, 2][t]);
        Instance::new(config, demand, InitialInventory::zeros(1, 1)).unwrap()
    }

    const PAIR: Pair = Pair {
        store: 0,
        product: 0,
    };

    #[test]
    fn test_blend_is_simulated_jointly() {
        let instance = instance();
        let mut pool = ColumnPool::new(&instance);
        pool.push(Column::new(&instance, PAIR, vec![1, 0, 0, 0], ColumnOrigin::GreedyCover));
        pool.push(Column::new(&instance, PAIR, vec![0; 4], ColumnOrigin::ZeroOrder));
        pool.push(Column::new(
            &instance,
            PAIR,
            vec![0, 1, 0, 1],
            ColumnOrigin::Pricing { iteration: 0 },
        ));

        let (entries, total_cost) = ScheduleBuilder::new(&instance).build(&pool, &[1.0, 0.0, 1.0]);

        let days: Vec<_> = entries.iter().map(|e| (e.day, e.case_packs, e.units)).collect();
        assert_eq!(days, vec![(0, 1, 5), (1, 1, 5), (3, 1, 5)]);
        // Day 2 is short 2 units; day 3 ends with 3.
        assert_eq!(entries[2].starting_inventory, 0);
        assert_eq!(entries[2].ending_inventory, 3);
        assert_abs_diff_eq!(total_cost, 30.0 + 3.0 + 200.0, epsilon = 1e-9);
        assert!(entries.iter().all(|e| e.shortage == 0));
    }

    #[test]
    fn test_integer_weights_multiply_orders() {
        let instance = instance();
        let mut pool = ColumnPool::new(&instance);
        pool.push(Column::new(&instance, PAIR, vec![1, 0, 0, 0], ColumnOrigin::GreedyCover));

        let (entries, _) = ScheduleBuilder::new(&instance).build(&pool, &[3.0]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].case_packs, 3);
        assert_eq!(entries[0].units, 15);
        assert_eq!(entries[0].ending_inventory, 10);
        // 10 units against 3 remaining days averaging 3 per day
        assert_abs_diff_eq!(entries[0].days_of_inventory_left, 3.0, epsilon = 1e-9);
    }
}

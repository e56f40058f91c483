//! Append-only store of candidate plans, and the heuristic seeding that makes
//! the first master problem feasible.

use log::info;

use crate::replenishment::column::{Column, ColumnOrigin};
use crate::replenishment::instance::{Instance, Pair, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(usize);

impl ColumnId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Columns for every pair, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ColumnPool {
    columns: Vec<Column>,
    by_pair: Vec<Vec<ColumnId>>,
    num_products: usize,
}

impl ColumnPool {
    pub fn new(instance: &Instance) -> Self {
        Self {
            columns: Vec::new(),
            by_pair: vec![Vec::new(); instance.num_pairs()],
            num_products: instance.config().num_products,
        }
    }

    /// A pool holding the greedy-cover and zero-order column of every pair,
    /// in store-then-product order.
    pub fn seeded(instance: &Instance) -> Self {
        let mut pool = Self::new(instance);
        for pair in instance.pairs() {
            let demand = instance.demand_series(pair);
            let orders = greedy_cover_orders(
                demand,
                instance.starting_stock(pair),
                instance.product(pair.product),
            );
            pool.push(Column::new(instance, pair, orders, ColumnOrigin::GreedyCover));
            pool.push(Column::new(
                instance,
                pair,
                vec![0; demand.len()],
                ColumnOrigin::ZeroOrder,
            ));
        }
        info!(
            "seeded column pool with {} columns for {} pairs",
            pool.len(),
            instance.num_pairs()
        );
        pool
    }

    pub fn push(&mut self, column: Column) -> ColumnId {
        let id = ColumnId(self.columns.len());
        let pair = column.pair();
        self.by_pair[pair.store * self.num_products + pair.product].push(id);
        self.columns.push(column);
        id
    }

    pub fn extend<I: IntoIterator<Item = Column>>(&mut self, columns: I) {
        for column in columns {
            self.push(column);
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, id: ColumnId) -> &Column {
        &self.columns[id.0]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| (ColumnId(i), column))
    }

    /// Ids of the columns of one pair, oldest first.
    pub fn ids_for(&self, pair: Pair) -> &[ColumnId] {
        &self.by_pair[pair.store * self.num_products + pair.product]
    }
}

/// Walks the horizon and, whenever demand exceeds stock on hand, orders the
/// fewest case packs that cover the gap and satisfy the minimum order.
pub fn greedy_cover_orders(demand: &[u64], initial: u64, product: &Product) -> Vec<u64> {
    let mut orders = vec![0; demand.len()];
    let mut inventory = initial;
    for (t, &wanted) in demand.iter().enumerate() {
        if wanted > inventory {
            let packs = product.packs_to_cover(wanted - inventory);
            orders[t] = packs;
            inventory += product.units(packs);
        }
        inventory = inventory.saturating_sub(wanted);
    }
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replenishment::instance::{Config, Demand, InitialInventory};
    use approx::assert_abs_diff_eq;

    fn product(case_pack_size: u32, min_order_qty: u32) -> Product {
        Product {
            ordering_cost: 10.0,
            holding_cost: 1.0,
            shortage_cost: 100.0,
            case_pack_size,
            min_order_qty,
            warehouse_capacity: 1_000,
        }
    }

    #[test]
    fn test_greedy_cover_orders() {
        assert_eq!(greedy_cover_orders(&[10, 0, 5], 0, &product(5, 1)), vec![2, 0, 1]);
        // leftover from a rounded-up order carries forward
        assert_eq!(greedy_cover_orders(&[3, 3, 3], 0, &product(5, 1)), vec![1, 1, 0]);
        // MOQ forces a bigger first order
        assert_eq!(greedy_cover_orders(&[5, 5, 5], 0, &product(5, 3)), vec![3, 0, 0]);
        // starting stock is used first
        assert_eq!(greedy_cover_orders(&[4, 4, 4], 6, &product(5, 1)), vec![0, 1, 1]);
    }

    #[test]
    fn test_seeded_pool() {
        let config = Config {
            num_stores: 2,
            num_products: 3,
            time_horizon: 4,
            products: vec![product(5, 1); 3],
        };
        let demand = Demand::from_fn(2, 3, 4, |s, p, t| (s + p + t) as u64);
        let instance = Instance::new(config, demand, InitialInventory::zeros(2, 3)).unwrap();

        let pool = ColumnPool::seeded(&instance);

        assert_eq!(pool.len(), 2 * 2 * 3);
        for pair in instance.pairs() {
            let ids = pool.ids_for(pair);
            assert_eq!(ids.len(), 2);
            let greedy = pool.get(ids[0]);
            let zero = pool.get(ids[1]);
            assert_eq!(greedy.origin(), ColumnOrigin::GreedyCover);
            assert_eq!(zero.origin(), ColumnOrigin::ZeroOrder);
            assert!(zero.orders().iter().all(|&x| x == 0));
            assert!(greedy.shortage().iter().all(|&s| s == 0));

            let demand: u64 = instance.demand_series(pair).iter().sum();
            assert_abs_diff_eq!(zero.cost(), 100.0 * demand as f64, epsilon = 1e-9);
        }
        // Store 0 comes before store 1.
        assert_eq!(pool.columns()[0].pair(), Pair { store: 0, product: 0 });
        assert_eq!(pool.columns()[6].pair(), Pair { store: 1, product: 0 });
    }
}

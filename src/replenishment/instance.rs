//! Static problem data: network dimensions, per-product parameters, demand and
//! starting stock.

use crate::error::{Error, Result};

/// Cost and supplier parameters of one product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Fixed cost charged on every day an order is placed
    pub ordering_cost: f64,
    /// Cost per unit held at the end of a day
    pub holding_cost: f64,
    /// Cost per unit of unmet demand
    pub shortage_cost: f64,
    /// Units per case pack
    pub case_pack_size: u32,
    /// Minimum order, in case packs, whenever an order is placed
    pub min_order_qty: u32,
    /// Units of this product the warehouse can ship over the horizon
    pub warehouse_capacity: u64,
}

impl Product {
    /// Units delivered by `packs` case packs.
    pub fn units(&self, packs: u64) -> u64 {
        packs * u64::from(self.case_pack_size)
    }

    /// Smallest admissible order covering `needed` units.
    pub fn packs_to_cover(&self, needed: u64) -> u64 {
        needed
            .div_ceil(u64::from(self.case_pack_size))
            .max(u64::from(self.min_order_qty))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub num_stores: usize,
    pub num_products: usize,
    pub time_horizon: usize,
    /// One entry per product
    pub products: Vec<Product>,
}

impl Config {
    pub fn product(&self, product: usize) -> &Product {
        &self.products[product]
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_stores == 0 || self.num_products == 0 || self.time_horizon == 0 {
            return Err(Error::invalid_instance(
                "stores, products and horizon must all be positive",
            ));
        }
        if self.products.len() != self.num_products {
            return Err(Error::invalid_instance(format!(
                "expected {} product definitions, got {}",
                self.num_products,
                self.products.len()
            )));
        }
        for (p, product) in self.products.iter().enumerate() {
            let costs = [
                product.ordering_cost,
                product.holding_cost,
                product.shortage_cost,
            ];
            if costs.iter().any(|c| !c.is_finite() || *c <= 0.0) {
                return Err(Error::invalid_instance(format!(
                    "product {p} needs positive, finite costs"
                )));
            }
            if product.case_pack_size == 0 || product.min_order_qty == 0 {
                return Err(Error::invalid_instance(format!(
                    "product {p} needs a positive case pack size and minimum order"
                )));
            }
        }
        Ok(())
    }
}

/// One (store, product) pair; the unit of decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    pub store: usize,
    pub product: usize,
}

/// Units demanded per (store, product, day), stored densely by store, then
/// product, then day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demand {
    num_products: usize,
    time_horizon: usize,
    units: Vec<u64>,
}

impl Demand {
    pub fn zeros(num_stores: usize, num_products: usize, time_horizon: usize) -> Self {
        Self {
            num_products,
            time_horizon,
            units: vec![0; num_stores * num_products * time_horizon],
        }
    }

    pub fn from_fn<F>(num_stores: usize, num_products: usize, time_horizon: usize, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> u64,
    {
        let mut demand = Self::zeros(num_stores, num_products, time_horizon);
        for s in 0..num_stores {
            for p in 0..num_products {
                for t in 0..time_horizon {
                    demand.set(s, p, t, f(s, p, t));
                }
            }
        }
        demand
    }

    fn index(&self, store: usize, product: usize, day: usize) -> usize {
        (store * self.num_products + product) * self.time_horizon + day
    }

    pub fn get(&self, store: usize, product: usize, day: usize) -> u64 {
        self.units[self.index(store, product, day)]
    }

    pub fn set(&mut self, store: usize, product: usize, day: usize, units: u64) {
        let i = self.index(store, product, day);
        self.units[i] = units;
    }

    /// Day-ordered demand of one pair.
    pub fn series(&self, pair: Pair) -> &[u64] {
        let start = self.index(pair.store, pair.product, 0);
        &self.units[start..start + self.time_horizon]
    }

    fn len(&self) -> usize {
        self.units.len()
    }
}

/// Units on hand per (store, product) before day 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialInventory {
    num_products: usize,
    units: Vec<u64>,
}

impl InitialInventory {
    pub fn zeros(num_stores: usize, num_products: usize) -> Self {
        Self {
            num_products,
            units: vec![0; num_stores * num_products],
        }
    }

    pub fn from_fn<F>(num_stores: usize, num_products: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> u64,
    {
        let mut inventory = Self::zeros(num_stores, num_products);
        for s in 0..num_stores {
            for p in 0..num_products {
                inventory.set(s, p, f(s, p));
            }
        }
        inventory
    }

    pub fn get(&self, store: usize, product: usize) -> u64 {
        self.units[store * self.num_products + product]
    }

    pub fn set(&mut self, store: usize, product: usize, units: u64) {
        self.units[store * self.num_products + product] = units;
    }
}

/// A validated, immutable planning instance.
#[derive(Debug, Clone)]
pub struct Instance {
    config: Config,
    demand: Demand,
    initial_inventory: InitialInventory,
}

impl Instance {
    pub fn new(config: Config, demand: Demand, initial_inventory: InitialInventory) -> Result<Self> {
        config.validate()?;
        let cells = config.num_stores * config.num_products;
        if demand.len() != cells * config.time_horizon
            || demand.num_products != config.num_products
            || demand.time_horizon != config.time_horizon
        {
            return Err(Error::invalid_instance(
                "demand table does not match the configured dimensions",
            ));
        }
        if initial_inventory.units.len() != cells
            || initial_inventory.num_products != config.num_products
        {
            return Err(Error::invalid_instance(
                "initial inventory table does not match the configured dimensions",
            ));
        }
        Ok(Self {
            config,
            demand,
            initial_inventory,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn demand(&self) -> &Demand {
        &self.demand
    }

    pub fn initial_inventory(&self) -> &InitialInventory {
        &self.initial_inventory
    }

    pub fn time_horizon(&self) -> usize {
        self.config.time_horizon
    }

    pub fn product(&self, product: usize) -> &Product {
        self.config.product(product)
    }

    pub fn num_pairs(&self) -> usize {
        self.config.num_stores * self.config.num_products
    }

    /// Position of a pair in the fixed store-then-product enumeration.
    pub fn pair_index(&self, pair: Pair) -> usize {
        pair.store * self.config.num_products + pair.product
    }

    /// All pairs, stores outermost.
    pub fn pairs(&self) -> impl Iterator<Item = Pair> + '_ {
        (0..self.config.num_stores).flat_map(move |store| {
            (0..self.config.num_products).map(move |product| Pair { store, product })
        })
    }

    pub fn demand_series(&self, pair: Pair) -> &[u64] {
        self.demand.series(pair)
    }

    pub fn starting_stock(&self, pair: Pair) -> u64 {
        self.initial_inventory.get(pair.store, pair.product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            ordering_cost: 10.0,
            holding_cost: 1.0,
            shortage_cost: 100.0,
            case_pack_size: 5,
            min_order_qty: 2,
            warehouse_capacity: 1_000,
        }
    }

    fn config(num_stores: usize, num_products: usize, time_horizon: usize) -> Config {
        Config {
            num_stores,
            num_products,
            time_horizon,
            products: vec![product(); num_products],
        }
    }

    #[test]
    fn test_packs_to_cover_respects_moq() {
        let p = product();
        assert_eq!(p.packs_to_cover(1), 2);
        assert_eq!(p.packs_to_cover(11), 3);
        assert_eq!(p.units(3), 15);
    }

    #[test]
    fn test_demand_layout() {
        let demand = Demand::from_fn(2, 3, 4, |s, p, t| (s * 100 + p * 10 + t) as u64);
        assert_eq!(demand.get(1, 2, 3), 123);
        assert_eq!(
            demand.series(Pair {
                store: 1,
                product: 0
            }),
            &[100, 101, 102, 103]
        );
    }

    #[test]
    fn test_pairs_enumerate_stores_first() {
        let instance = Instance::new(
            config(2, 2, 1),
            Demand::zeros(2, 2, 1),
            InitialInventory::zeros(2, 2),
        )
        .unwrap();
        let pairs: Vec<_> = instance
            .pairs()
            .map(|pair| (pair.store, pair.product))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(
            instance.pair_index(Pair {
                store: 1,
                product: 0
            }),
            2
        );
    }

    #[test]
    fn test_validation() {
        let mut bad = config(1, 1, 3);
        bad.products[0].case_pack_size = 0;
        assert!(matches!(bad.validate(), Err(Error::InvalidInstance(_))));

        let mut bad = config(1, 1, 3);
        bad.products[0].holding_cost = f64::NAN;
        assert!(matches!(bad.validate(), Err(Error::InvalidInstance(_))));

        let mut bad = config(1, 1, 3);
        bad.products[0].shortage_cost = 0.0;
        assert!(matches!(bad.validate(), Err(Error::InvalidInstance(_))));

        let mut bad = config(1, 1, 3);
        bad.products[0].ordering_cost = -1.0;
        assert!(matches!(bad.validate(), Err(Error::InvalidInstance(_))));

        assert!(matches!(
            config(0, 1, 3).validate(),
            Err(Error::InvalidInstance(_))
        ));

        let mismatched = Instance::new(
            config(1, 1, 3),
            Demand::zeros(1, 1, 2),
            InitialInventory::zeros(1, 1),
        );
        assert!(matches!(mismatched, Err(Error::InvalidInstance(_))));
    }
}

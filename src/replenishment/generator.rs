//! Seeded synthetic instances for tests and benchmarks.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Poisson};

use crate::error::{Error, Result};
use crate::replenishment::instance::{Config, Demand, InitialInventory, Instance, Product};

const MOQ_CHOICES: [u32; 3] = [1, 5, 10];

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub num_stores: usize,
    pub num_products: usize,
    pub time_horizon: usize,
    pub seed: u64,
    /// Relative spread of the daily Poisson mean around the product's base demand
    pub demand_variance: f64,
    /// Warehouse capacity as a multiple of what the greedy plans can ship
    pub capacity_headroom: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_stores: 5,
            num_products: 10,
            time_horizon: 7,
            seed: 42,
            demand_variance: 0.3,
            capacity_headroom: 1.0,
        }
    }
}

/// Draws a complete instance from `config.seed`. The same configuration always
/// yields the same instance.
pub fn generate_instance(config: &GeneratorConfig) -> Result<Instance> {
    if !(0.0..1.0).contains(&config.demand_variance) {
        return Err(Error::invalid_instance(format!(
            "demand variance {} must lie in [0, 1)",
            config.demand_variance
        )));
    }
    if !config.capacity_headroom.is_finite() || config.capacity_headroom < 0.0 {
        return Err(Error::invalid_instance(
            "capacity headroom must be finite and non-negative",
        ));
    }

    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    let (stores, products, horizon) = (config.num_stores, config.num_products, config.time_horizon);

    let mut catalog: Vec<Product> = (0..products)
        .map(|_| Product {
            ordering_cost: round_cents(rng.gen_range(5.0..=20.0)),
            holding_cost: round_cents(rng.gen_range(0.1..=1.5)),
            shortage_cost: round_cents(rng.gen_range(3.0..=10.0)),
            case_pack_size: rng.gen_range(5..=25),
            min_order_qty: MOQ_CHOICES[rng.gen_range(0..MOQ_CHOICES.len())],
            warehouse_capacity: 0,
        })
        .collect();
    let base_demand: Vec<f64> = (0..products).map(|_| rng.gen_range(5..=30) as f64).collect();

    let mut demand = Demand::zeros(stores, products, horizon);
    for s in 0..stores {
        for (p, &base) in base_demand.iter().enumerate() {
            for t in 0..horizon {
                let spread = rng.gen_range(1.0 - config.demand_variance..=1.0 + config.demand_variance);
                let poisson = Poisson::new(base * spread)
                    .map_err(|e| Error::invalid_instance(format!("demand distribution: {e}")))?;
                demand.set(s, p, t, poisson.sample(&mut rng) as u64);
            }
        }
    }
    let mut initial = InitialInventory::zeros(stores, products);
    for s in 0..stores {
        for p in 0..products {
            initial.set(s, p, rng.gen_range(0..=20));
        }
    }

    // Every greedy order is at most the day's demand plus one minimum order.
    for (p, product) in catalog.iter_mut().enumerate() {
        let moq_units = product.units(u64::from(product.min_order_qty));
        let reach: u64 = (0..stores)
            .flat_map(|s| (0..horizon).map(move |t| (s, t)))
            .map(|(s, t)| demand.get(s, p, t) + moq_units)
            .sum();
        product.warehouse_capacity = (reach as f64 * config.capacity_headroom).ceil() as u64;
    }

    Instance::new(
        Config {
            num_stores: stores,
            num_products: products,
            time_horizon: horizon,
            products: catalog,
        },
        demand,
        initial,
    )
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

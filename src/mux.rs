//! Bounded-width stochastic multiplexing of slice generators

use crate::catalog::Catalog;
use crate::error::{Result, SampleError};
use crate::slices::{Observation, SlicePlan, Slices};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};

/// One live generator and the number of draws left before retirement
struct Slot {
    stream: Slices,
    remaining: u64,
}

/// Merged, unbounded stream over a rotating working subset of candidates.
///
/// At most `working_size` generators are live at once (capped by the number
/// of candidates). Each slot's lifetime is Poisson-distributed around `lam`;
/// a spent slot is replaced in full by a fresh generator over a
/// with-replacement random candidate, so no single entry dominates a long
/// run of output while every candidate stays reachable.
pub struct Mux<'a> {
    catalog: &'a Catalog,
    name: String,
    candidates: Vec<String>,
    plan: SlicePlan,
    lifetimes: Poisson<f64>,
    slots: Vec<Slot>,
    rng: StdRng,
}

impl<'a> Mux<'a> {
    pub fn new(
        catalog: &'a Catalog,
        name: &str,
        candidates: Vec<String>,
        plan: SlicePlan,
        working_size: usize,
        lam: f64,
        rng: StdRng,
    ) -> Result<Self> {
        if candidates.is_empty() {
            return Err(SampleError::EmptyNeighborhood(name.to_string()));
        }
        let lifetimes = Poisson::new(lam).map_err(|err| {
            SampleError::InvalidConfigParameter(format!("lam={}: {}", lam, err))
        })?;

        let width = working_size.min(candidates.len());
        let mut mux = Self {
            catalog,
            name: name.to_string(),
            candidates,
            plan,
            lifetimes,
            slots: Vec::with_capacity(width),
            rng,
        };
        for _ in 0..width {
            let slot = mux.spawn_slot()?;
            mux.slots.push(slot);
        }
        Ok(mux)
    }

    /// Draw from a uniformly chosen live slot, then retire the slot if its
    /// lifetime is spent.
    ///
    /// A failing slot still consumes lifetime, so a broken candidate is
    /// eventually rotated out even though the failing draw itself errors.
    pub fn draw(&mut self) -> Result<Observation> {
        let i = self.rng.random_range(0..self.slots.len());
        let result = self.slots[i].stream.draw();
        if self.slots[i].remaining <= 1 {
            let fresh = self.spawn_slot()?;
            self.slots[i] = fresh;
        } else {
            self.slots[i].remaining -= 1;
        }
        result
    }

    /// Number of concurrently live generators
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /// Seed a fresh generator over a with-replacement random candidate
    fn spawn_slot(&mut self) -> Result<Slot> {
        let key = self
            .candidates
            .choose(&mut self.rng)
            .ok_or_else(|| SampleError::EmptyNeighborhood(self.name.clone()))?
            .clone();
        let entry = self.catalog.get(&key)?;
        let stream = Slices::open(entry, self.plan.clone(), StdRng::from_rng(&mut self.rng))?;
        let remaining = (self.lifetimes.sample(&mut self.rng).round() as u64).max(1);
        Ok(Slot { stream, remaining })
    }
}

//! Top-level sampling policies, batch assembly, and noise augmentation

use crate::catalog::Catalog;
use crate::config::{validate_config, NoiseConfig, StreamConfig};
use crate::error::{Result, SampleError};
use crate::mux::Mux;
use crate::neighbors::{build_neighbors, Neighborhoods};
use crate::slices::{ObsMeta, SlicePlan};
use ndarray::{ArrayD, ArrayViewD, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

/// One draw from a sampling policy: named tensors plus optional label/metadata
#[derive(Debug)]
pub struct Sample {
    pub tensors: BTreeMap<String, ArrayD<f32>>,
    /// Bucket key, for classification-style streams
    pub label: Option<String>,
    pub meta: Option<BTreeMap<String, ObsMeta>>,
}

/// A fixed count of consecutive samples stacked along a new leading axis
#[derive(Debug)]
pub struct Batch {
    pub tensors: BTreeMap<String, ArrayD<f32>>,
    pub labels: Option<Vec<String>>,
    pub meta: Option<Vec<BTreeMap<String, ObsMeta>>>,
}

/// A pull-based, unbounded producer of samples
pub trait SampleStream {
    fn draw(&mut self) -> Result<Sample>;
}

/// Endless generator of anchor/positive/negative triplets.
///
/// Anchor and positive come from one uniformly chosen bucket's multiplexed
/// stream; the negative comes from a second bucket chosen uniformly from the
/// remainder. Bucket choices are independent across draws.
pub struct NeighborStream<'a> {
    buckets: Vec<(String, Mux<'a>)>,
    with_meta: bool,
    rng: StdRng,
}

impl<'a> NeighborStream<'a> {
    /// Build one multiplexed stream per non-empty bucket.
    ///
    /// Fewer than two non-empty buckets makes the negative draw undefined,
    /// so that is rejected here rather than at first use.
    pub fn new(
        catalog: &'a Catalog,
        neighbors: &Neighborhoods,
        plan: SlicePlan,
        working_size: usize,
        lam: f64,
        with_meta: bool,
        mut rng: StdRng,
    ) -> Result<Self> {
        let populated: Vec<(&String, &Vec<String>)> = neighbors
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .collect();
        if populated.len() < 2 {
            return Err(SampleError::InsufficientNeighborhoods(populated.len()));
        }

        let mut buckets = Vec::with_capacity(populated.len());
        for (key, members) in populated {
            let mux = Mux::new(
                catalog,
                key,
                members.clone(),
                plan.clone(),
                working_size,
                lam,
                StdRng::from_rng(&mut rng),
            )?;
            buckets.push((key.clone(), mux));
        }
        Ok(Self {
            buckets,
            with_meta,
            rng,
        })
    }
}

impl SampleStream for NeighborStream<'_> {
    fn draw(&mut self) -> Result<Sample> {
        let i = self.rng.random_range(0..self.buckets.len());
        // Negative bucket is drawn from the remaining keys
        let mut j = self.rng.random_range(0..self.buckets.len() - 1);
        if j >= i {
            j += 1;
        }

        let x_in = self.buckets[i].1.draw()?;
        let x_same = self.buckets[i].1.draw()?;
        let x_diff = self.buckets[j].1.draw()?;

        let mut tensors = BTreeMap::new();
        tensors.insert("x_in".to_string(), x_in.data);
        tensors.insert("x_same".to_string(), x_same.data);
        tensors.insert("x_diff".to_string(), x_diff.data);

        let meta = self.with_meta.then(|| {
            let mut m = BTreeMap::new();
            m.insert("y_in".to_string(), x_in.meta);
            m.insert("y_same".to_string(), x_same.meta);
            m.insert("y_diff".to_string(), x_diff.meta);
            m
        });

        Ok(Sample {
            tensors,
            label: None,
            meta,
        })
    }
}

/// Endless generator of single observations labeled by bucket key
pub struct ClassStream<'a> {
    buckets: Vec<(String, Mux<'a>)>,
    with_meta: bool,
    rng: StdRng,
}

impl<'a> ClassStream<'a> {
    pub fn new(
        catalog: &'a Catalog,
        neighbors: &Neighborhoods,
        plan: SlicePlan,
        working_size: usize,
        lam: f64,
        with_meta: bool,
        mut rng: StdRng,
    ) -> Result<Self> {
        let populated: Vec<(&String, &Vec<String>)> = neighbors
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .collect();
        if populated.is_empty() {
            return Err(SampleError::InsufficientNeighborhoods(0));
        }

        let mut buckets = Vec::with_capacity(populated.len());
        for (key, members) in populated {
            let mux = Mux::new(
                catalog,
                key,
                members.clone(),
                plan.clone(),
                working_size,
                lam,
                StdRng::from_rng(&mut rng),
            )?;
            buckets.push((key.clone(), mux));
        }
        Ok(Self {
            buckets,
            with_meta,
            rng,
        })
    }
}

impl SampleStream for ClassStream<'_> {
    fn draw(&mut self) -> Result<Sample> {
        let i = self.rng.random_range(0..self.buckets.len());
        let obs = self.buckets[i].1.draw()?;

        let mut tensors = BTreeMap::new();
        tensors.insert("x_in".to_string(), obs.data);

        let meta = self.with_meta.then(|| {
            let mut m = BTreeMap::new();
            m.insert("y".to_string(), obs.meta);
            m
        });

        Ok(Sample {
            tensors,
            label: Some(self.buckets[i].0.clone()),
            meta,
        })
    }
}

/// Accumulates consecutive draws into fixed-size batches.
///
/// Batch `i` always holds draws `[i * batch_size, (i + 1) * batch_size)` of
/// the underlying stream in arrival order.
pub struct Batcher<S: SampleStream> {
    source: S,
    batch_size: usize,
}

impl<S: SampleStream> Batcher<S> {
    pub fn new(source: S, batch_size: usize) -> Self {
        Self { source, batch_size }
    }

    /// Pull `batch_size` samples and stack each tensor along a new leading axis
    pub fn next_batch(&mut self) -> Result<Batch> {
        let mut parts: BTreeMap<String, Vec<ArrayD<f32>>> = BTreeMap::new();
        let mut labels = Vec::new();
        let mut metas = Vec::new();

        for _ in 0..self.batch_size {
            let sample = self.source.draw()?;
            for (name, tensor) in sample.tensors {
                parts.entry(name).or_default().push(tensor);
            }
            if let Some(label) = sample.label {
                labels.push(label);
            }
            if let Some(meta) = sample.meta {
                metas.push(meta);
            }
        }

        let mut tensors = BTreeMap::new();
        for (name, arrays) in parts {
            let views: Vec<ArrayViewD<f32>> = arrays.iter().map(|a| a.view()).collect();
            tensors.insert(name, ndarray::stack(Axis(0), &views)?);
        }

        Ok(Batch {
            tensors,
            labels: (!labels.is_empty()).then_some(labels),
            meta: (!metas.is_empty()).then_some(metas),
        })
    }
}

/// Add independent Gaussian noise element-wise to every tensor in the batch
pub fn awgn(batch: &mut Batch, noise: &NoiseConfig, rng: &mut StdRng) -> Result<()> {
    let normal = Normal::new(noise.loc, noise.scale).map_err(|err| {
        SampleError::InvalidConfigParameter(format!("noise scale={}: {}", noise.scale, err))
    })?;
    for tensor in batch.tensors.values_mut() {
        tensor.mapv_inplace(|x| x + normal.sample(&mut *rng) as f32);
    }
    Ok(())
}

/// Batched triplet stream with optional noise augmentation
pub struct TrainingStream<'a> {
    batcher: Batcher<NeighborStream<'a>>,
    noise: Option<NoiseConfig>,
    rng: StdRng,
}

impl TrainingStream<'_> {
    pub fn next_batch(&mut self) -> Result<Batch> {
        let mut batch = self.batcher.next_batch()?;
        if let Some(noise) = &self.noise {
            awgn(&mut batch, noise, &mut self.rng)?;
        }
        Ok(batch)
    }
}

/// Seed a session RNG explicitly or from OS entropy
pub fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Assemble the full training pipeline: neighborhoods, per-bucket muxes,
/// triplet policy, batcher, and optional noise stage.
pub fn create_stream<'a>(catalog: &'a Catalog, config: &StreamConfig) -> Result<TrainingStream<'a>> {
    validate_config(config)?;
    let mut rng = session_rng(config.seed);

    let neighbors = build_neighbors(catalog, &config.neighbor_mode);
    let plan = SlicePlan::Cqt {
        mode: config.sample_mode,
        window_length: config.window_length,
    };
    let stream = NeighborStream::new(
        catalog,
        &neighbors,
        plan,
        config.working_size,
        config.lam,
        config.with_meta,
        StdRng::from_rng(&mut rng),
    )?;

    Ok(TrainingStream {
        batcher: Batcher::new(stream, config.batch_size),
        noise: config.noise,
        rng,
    })
}

//! Infinite slice generators over single feature archives

use crate::catalog::CatalogEntry;
use crate::config::SliceMode;
use crate::error::{Result, SampleError};
use ndarray::{s, Array2, ArrayD, Axis};
use ndarray_npy::NpzReader;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Metadata attached to every emitted observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObsMeta {
    pub instrument: String,
    pub note_number: i32,
    pub fcode: String,
    /// Position the observation was sampled from
    pub idx: usize,
}

/// One observation: an array slice plus its provenance
#[derive(Debug, Clone)]
pub struct Observation {
    pub data: ArrayD<f32>,
    pub meta: ObsMeta,
}

/// What a generator slices and how
#[derive(Debug, Clone)]
pub enum SlicePlan {
    /// Fixed-length time windows from a (bins x frames) CQT array
    Cqt {
        mode: SliceMode,
        window_length: usize,
    },
    /// Contiguous runs of embedding-coordinate rows
    Embedding { n_length: usize },
}

impl SlicePlan {
    /// Name of the archive array this plan reads
    fn array_name(&self) -> &'static str {
        match self {
            SlicePlan::Cqt { .. } => "cqt",
            SlicePlan::Embedding { .. } => "z_out",
        }
    }
}

/// Position-selection state, fixed once the archive is loaded
enum Schedule {
    /// Shuffled order over all positions; reshuffled on exhaustion
    Permutation { order: Vec<usize>, cursor: usize },
    /// Static amplitude-proportional categorical; independent draws
    Categorical(WeightedIndex<f32>),
}

struct Loaded {
    data: Array2<f32>,
    schedule: Schedule,
}

/// Unbounded, restartable generator of observations from one catalog entry.
///
/// The archive is read on the first draw and owned exclusively by this
/// generator afterwards. Read failures and degenerate shapes fail the
/// failing draw; there are no retries.
pub struct Slices {
    path: PathBuf,
    identity: String,
    instrument: String,
    note_number: i32,
    fcode: String,
    plan: SlicePlan,
    rng: StdRng,
    loaded: Option<Loaded>,
}

impl Slices {
    /// Create a lazy generator over a catalog entry's archive.
    ///
    /// Embedding plans require the entry to carry a prediction archive.
    pub fn open(entry: &CatalogEntry, plan: SlicePlan, rng: StdRng) -> Result<Self> {
        let path = match &plan {
            SlicePlan::Cqt { .. } => entry.features.clone(),
            SlicePlan::Embedding { .. } => entry.prediction.clone().ok_or_else(|| {
                SampleError::ArchiveReadError(format!(
                    "no prediction archive for '{}'",
                    entry.key()
                ))
            })?,
        };
        Ok(Self {
            path,
            identity: entry.key(),
            instrument: entry.instrument.clone(),
            note_number: entry.note_number,
            fcode: entry.fcode.clone(),
            plan,
            rng,
            loaded: None,
        })
    }

    /// Create a generator over an in-memory array, skipping archive I/O
    pub fn from_array(
        data: Array2<f32>,
        instrument: &str,
        note_number: i32,
        fcode: &str,
        plan: SlicePlan,
        mut rng: StdRng,
    ) -> Result<Self> {
        let identity = format!("{}_{}_{}", instrument, note_number, fcode);
        let schedule = init_schedule(&data, &plan, &identity, &mut rng)?;
        Ok(Self {
            path: PathBuf::new(),
            identity,
            instrument: instrument.to_string(),
            note_number,
            fcode: fcode.to_string(),
            plan,
            rng,
            loaded: Some(Loaded { data, schedule }),
        })
    }

    /// Produce the next observation.
    ///
    /// Uniform mode visits every position exactly once per epoch; weighted
    /// mode draws positions independently, favoring high-amplitude frames.
    pub fn draw(&mut self) -> Result<Observation> {
        self.ensure_loaded()?;
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| SampleError::ArchiveReadError(self.identity.clone()))?;

        let position = match &mut loaded.schedule {
            Schedule::Permutation { order, cursor } => {
                let n = order[*cursor];
                *cursor += 1;
                if *cursor >= order.len() {
                    order.shuffle(&mut self.rng);
                    *cursor = 0;
                }
                n
            }
            Schedule::Categorical(weights) => weights.sample(&mut self.rng),
        };

        let data = match &self.plan {
            SlicePlan::Cqt { window_length, .. } => {
                padded_window(&loaded.data, position, *window_length)
                    .insert_axis(Axis(0))
                    .into_dyn()
            }
            SlicePlan::Embedding { n_length } => loaded
                .data
                .slice(s![position..position + *n_length, ..])
                .to_owned()
                .into_dyn(),
        };

        Ok(Observation {
            data,
            meta: ObsMeta {
                instrument: self.instrument.clone(),
                note_number: self.note_number,
                fcode: self.fcode.clone(),
                idx: position,
            },
        })
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded.is_some() {
            return Ok(());
        }
        let data = read_named_array(&self.path, self.plan.array_name(), &self.identity)?;
        let schedule = init_schedule(&data, &self.plan, &self.identity, &mut self.rng)?;
        self.loaded = Some(Loaded { data, schedule });
        Ok(())
    }
}

/// Read one named 2-D array out of an `.npz` archive
fn read_named_array(path: &Path, name: &str, identity: &str) -> Result<Array2<f32>> {
    let file = File::open(path).map_err(|err| {
        SampleError::ArchiveReadError(format!(
            "failed reading '{}' at {}: {}",
            identity,
            path.display(),
            err
        ))
    })?;
    let mut npz = NpzReader::new(file).map_err(|err| {
        SampleError::ArchiveReadError(format!(
            "failed reading '{}' at {}: {}",
            identity,
            path.display(),
            err
        ))
    })?;
    npz.by_name(name).map_err(|err| {
        SampleError::ArchiveReadError(format!(
            "missing or corrupt array '{}' for '{}' at {}: {}",
            name,
            identity,
            path.display(),
            err
        ))
    })
}

fn init_schedule(
    data: &Array2<f32>,
    plan: &SlicePlan,
    identity: &str,
    rng: &mut StdRng,
) -> Result<Schedule> {
    let num_obs = match plan {
        SlicePlan::Cqt { .. } => data.ncols() as isize,
        SlicePlan::Embedding { n_length } => data.nrows() as isize + 1 - *n_length as isize,
    };
    if num_obs <= 0 {
        return Err(SampleError::MisshapenArchive(format!(
            "shape {:?} yields no usable positions - {}",
            data.dim(),
            identity
        )));
    }

    match plan {
        SlicePlan::Cqt {
            mode: SliceMode::Weighted,
            ..
        } => {
            // Per-frame likelihood proportional to aggregate amplitude
            let weights: Vec<f32> = data.sum_axis(Axis(0)).to_vec();
            let categorical = WeightedIndex::new(weights).map_err(|err| {
                SampleError::MisshapenArchive(format!(
                    "unusable amplitude weights ({}) - {}",
                    err, identity
                ))
            })?;
            Ok(Schedule::Categorical(categorical))
        }
        _ => {
            let mut order: Vec<usize> = (0..num_obs as usize).collect();
            order.shuffle(rng);
            Ok(Schedule::Permutation { order, cursor: 0 })
        }
    }
}

/// Extract a `window_length`-frame window starting at `position` along the
/// time axis, zero-padding past the array boundary.
pub fn padded_window(data: &Array2<f32>, position: usize, window_length: usize) -> Array2<f32> {
    let (bins, frames) = data.dim();
    let mut window = Array2::<f32>::zeros((bins, window_length));
    let take = window_length.min(frames.saturating_sub(position));
    if take > 0 {
        window
            .slice_mut(s![.., ..take])
            .assign(&data.slice(s![.., position..position + take]));
    }
    window
}

//! Configuration surface for the sampling engine

use crate::error::{Result, SampleError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Neighborhood grouping policy.
///
/// A closed set of strategies; `InstrumentPitch` carries its own window and
/// population parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "neighbor_mode", rename_all = "kebab-case")]
pub enum NeighborMode {
    /// One bucket per distinct instrument code
    Instrument,
    /// One bucket per distinct note number
    Pitch,
    /// One bucket per (instrument, note-number window) pair
    InstrumentPitch {
        /// Note numbers within +/- `pitch_delta` (inclusive) of the bucket
        /// center are members
        #[serde(default)]
        pitch_delta: i32,
        /// Buckets with a population strictly greater than this are kept.
        /// Note this is a strict threshold, unlike `population_filter`.
        #[serde(default)]
        min_population: usize,
    },
}

/// Slice position-selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SliceMode {
    /// Shuffled permutation over positions; every position once per epoch
    Uniform,
    /// Independent draws from an amplitude-proportional categorical
    Weighted,
}

/// Additive Gaussian noise parameters for batch augmentation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub loc: f64,
    pub scale: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            loc: 0.0,
            scale: 0.0,
        }
    }
}

/// Main configuration for training streams
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    #[serde(flatten)]
    pub neighbor_mode: NeighborMode,
    pub sample_mode: SliceMode,
    /// Number of datapoints stacked into each batch
    pub batch_size: usize,
    /// Number of time frames per observation window
    pub window_length: usize,
    /// Number of live slice generators per neighborhood
    pub working_size: usize,
    /// Expected generator lifetime (Poisson refresh parameter)
    pub lam: f64,
    /// If true, batches carry per-sample metadata
    pub with_meta: bool,
    /// Session seed; omit for entropy-based seeding
    pub seed: Option<u64>,
    /// Optional additive Gaussian noise applied to every batch
    pub noise: Option<NoiseConfig>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            neighbor_mode: NeighborMode::Instrument,
            sample_mode: SliceMode::Uniform,
            batch_size: 32,
            window_length: 20,
            working_size: 25,
            lam: 25.0,
            with_meta: false,
            seed: None,
            noise: None,
        }
    }
}

/// Configuration for embedding-coordinate streams
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Number of contiguous coordinate rows per observation
    pub n_length: usize,
    pub working_size: usize,
    pub lam: f64,
    pub seed: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            n_length: 1,
            working_size: 100,
            lam: 5.0,
            seed: None,
        }
    }
}

/// Load a stream configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StreamConfig> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
        SampleError::ConfigValidationFailed(format!(
            "cannot read {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    let config: StreamConfig = serde_json::from_str(&text)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate parameter ranges before a sampling session starts
pub fn validate_config(config: &StreamConfig) -> Result<()> {
    if config.batch_size == 0 {
        return Err(SampleError::InvalidConfigParameter(
            "batch_size must be positive".to_string(),
        ));
    }
    if config.window_length == 0 {
        return Err(SampleError::InvalidConfigParameter(
            "window_length must be positive".to_string(),
        ));
    }
    if config.working_size == 0 {
        return Err(SampleError::InvalidConfigParameter(
            "working_size must be positive".to_string(),
        ));
    }
    if !(config.lam > 0.0 && config.lam.is_finite()) {
        return Err(SampleError::InvalidConfigParameter(format!(
            "lam must be a positive finite number, got {}",
            config.lam
        )));
    }
    if let NeighborMode::InstrumentPitch { pitch_delta, .. } = config.neighbor_mode {
        if pitch_delta < 0 {
            return Err(SampleError::InvalidConfigParameter(format!(
                "pitch_delta must be non-negative, got {}",
                pitch_delta
            )));
        }
    }
    if let Some(noise) = &config.noise {
        if !(noise.scale >= 0.0 && noise.scale.is_finite()) {
            return Err(SampleError::InvalidConfigParameter(format!(
                "noise scale must be non-negative, got {}",
                noise.scale
            )));
        }
    }
    Ok(())
}

//! Timbre-Stream
//!
//! An online sampling engine for metric-learning training data drawn from
//! precomputed CQT feature archives, one archive per recorded note. Given a
//! labeled catalog grouped into neighborhoods, it continuously produces
//! randomized anchor/positive/negative triplets (or single labeled
//! observations) without materializing the dataset in memory.
//!
//! Data flow: catalog -> neighborhoods -> per-entry slice generators ->
//! bounded stream multiplexer per bucket -> triplet/class policy -> batch
//! assembler -> optional noise augmentation.

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod mux;
pub mod neighbors;
pub mod slices;
pub mod stream;

pub use catalog::{index_directory, parse_filename, Catalog, CatalogEntry};
pub use config::{
    load_config, validate_config, EmbeddingConfig, NeighborMode, NoiseConfig, SliceMode,
    StreamConfig,
};
pub use embedding::{create_embedding_stream, sample_embeddings};
pub use error::{Result as SampleResult, SampleError};
pub use slices::{ObsMeta, Observation};
pub use stream::{create_stream, Batch, Sample, TrainingStream};

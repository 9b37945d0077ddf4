//! Error types for the timbre sampling engine

use std::fmt;

/// Custom error type for sampling-pipeline failures
#[derive(Debug, Clone)]
pub enum SampleError {
    /// E001: Feature archive could not be read (missing or corrupt)
    ArchiveReadError(String),
    /// E002: Archive array has no usable positions along the sampled axis
    MisshapenArchive(String),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Invalid configuration parameter
    InvalidConfigParameter(String),
    /// E005: Filename does not match the expected ICODE_NOTE_FCODE layout
    FilenameParseError(String),
    /// E006: Catalog entry lookup failed
    UnknownCatalogEntry(String),
    /// E007: Neighborhood has no candidate entries
    EmptyNeighborhood(String),
    /// E008: Too few neighborhoods for the requested sampling policy
    InsufficientNeighborhoods(usize),
    /// E009: Batch assembly error (tensor stacking failed)
    BatchAssemblyError(String),
    /// E010: Catalog indexing error
    CatalogIndexError(String),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::ArchiveReadError(msg) => {
                write!(f, "E001: Archive read error - {}", msg)
            }
            SampleError::MisshapenArchive(msg) => {
                write!(f, "E002: Misshapen archive - {}", msg)
            }
            SampleError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            SampleError::InvalidConfigParameter(msg) => {
                write!(f, "E004: Invalid configuration parameter - {}", msg)
            }
            SampleError::FilenameParseError(msg) => {
                write!(f, "E005: Filename parse error - {}", msg)
            }
            SampleError::UnknownCatalogEntry(key) => {
                write!(f, "E006: Unknown catalog entry '{}'", key)
            }
            SampleError::EmptyNeighborhood(key) => {
                write!(f, "E007: Neighborhood '{}' has no candidates", key)
            }
            SampleError::InsufficientNeighborhoods(count) => {
                write!(
                    f,
                    "E008: Triplet sampling requires at least 2 neighborhoods, found {}",
                    count
                )
            }
            SampleError::BatchAssemblyError(msg) => {
                write!(f, "E009: Batch assembly error - {}", msg)
            }
            SampleError::CatalogIndexError(msg) => {
                write!(f, "E010: Catalog indexing error - {}", msg)
            }
        }
    }
}

impl std::error::Error for SampleError {}

// From implementations for common error types
impl From<std::io::Error> for SampleError {
    fn from(err: std::io::Error) -> Self {
        SampleError::ArchiveReadError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for SampleError {
    fn from(err: serde_json::Error) -> Self {
        SampleError::ConfigValidationFailed(format!("JSON error: {}", err))
    }
}

impl From<ndarray::ShapeError> for SampleError {
    fn from(err: ndarray::ShapeError) -> Self {
        SampleError::BatchAssemblyError(format!("Shape error: {}", err))
    }
}

/// Result type alias for sampling operations
pub type Result<T> = std::result::Result<T, SampleError>;

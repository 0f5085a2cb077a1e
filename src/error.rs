//! Error types for the map finder.
//!
//! Image content never produces an error: a noisy or empty symbol
//! collection is a normal outcome of heuristic analysis. The variants
//! below cover I/O around the image and invalid analysis configuration.

use thiserror::Error;

/// Primary error type for the map finder.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A masked signature whose pattern and mask disagree in length.
    #[error("Invalid signature {name}: pattern has {pattern_len} bytes, mask has {mask_len}")]
    InvalidSignature {
        name: String,
        pattern_len: usize,
        mask_len: usize,
    },

    /// Code-bank thresholds that do not describe increasing regions.
    #[error("Invalid bank layout: low threshold 0x{low:X} above high threshold 0x{high:X}")]
    InvalidBankLayout { low: usize, high: usize },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type alias for map finder operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

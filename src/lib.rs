//! ECU Map Finder - Calibration Table Discovery for Engine-Control Firmware
//!
//! This library locates calibration tables ("maps") in raw firmware images
//! dumped from diesel engine-control units. The images carry no directory
//! or type information, so tables are found from structural regularities
//! in the byte stream and then named from their shape and value ranges.
//!
//! # Features
//!
//! - **Structural Discovery**: Finds axis-header/axis/data layouts without any format information
//! - **Deduplication**: At most one symbol per data address, oversized candidates rejected
//! - **Anchored Values**: Locates scalar limiters through masked byte signatures
//! - **Semantic Classification**: Names tables and attaches units and scaling
//! - **Identification**: Extracts part and software numbers from the ASCII ident block
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ecu_map_finder::{analyze_file, analyze_bytes};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Analyze a file
//!     let analysis = analyze_file("path/to/dump.bin")?;
//!     println!("Symbols: {}", analysis.symbols.len());
//!     println!("Classified: {}", analysis.classified_count());
//!
//!     // Analyze raw bytes
//!     let bytes = std::fs::read("path/to/dump.bin")?;
//!     let analysis = analyze_bytes(&bytes)?;
//!     for symbol in &analysis.symbols {
//!         println!("{symbol}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! 1. The structural scanner proposes table candidates and admission keeps
//!    the first candidate per data address below the size limit.
//! 2. The anchor locator adds singleton values found by signature.
//! 3. The collection is sorted by data address.
//! 4. The classifier visits every structural symbol once, in address order.
//!
//! # Supported Families
//!
//! - Bosch EDC16C / EDC16CP (VAG diesel)

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

pub mod anchors;
pub mod axis;
pub mod bank;
pub mod classifier;
pub mod error;
pub mod family;
pub mod formatter;
pub mod heuristics;
pub mod ident;
pub mod signature;
pub mod types;

pub use axis::{AxisDescriptor, AxisRegistry, Quantity};
pub use bank::{BankLayout, CodeBank};
pub use classifier::{Classifier, MapKind};
pub use error::{AnalyzerError, Result};
pub use family::FamilyProfile;
pub use ident::FirmwareIdent;
pub use signature::Signature;
pub use types::{
    Analysis, AnalyzerOptions, AxisRef, Shape, SortField, SortOrder, Symbol, SymbolCollection,
    SymbolOrigin, TableKind,
};

use std::path::Path;

/// Analyze a firmware image by path.
///
/// Reads the whole file and runs [`analyze_bytes`] on it.
///
/// # Errors
///
/// Returns [`AnalyzerError::Io`] if the file cannot be read.
///
/// # Example
///
/// ```rust,no_run
/// use ecu_map_finder::analyze_file;
///
/// let analysis = analyze_file("dump.bin")?;
/// println!("{} symbols", analysis.symbols.len());
/// # Ok::<(), ecu_map_finder::AnalyzerError>(())
/// ```
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<Analysis> {
    let data = std::fs::read(path)?;
    analyze_bytes(&data)
}

/// Analyze an in-memory image with the default EDC16C options.
///
/// Image content never causes an error; an image without tables yields an
/// empty collection.
///
/// # Example
///
/// ```rust
/// use ecu_map_finder::analyze_bytes;
///
/// let image = vec![0xFFu8; 0x1000];
/// let analysis = analyze_bytes(&image).unwrap();
/// assert!(analysis.symbols.is_empty());
/// ```
pub fn analyze_bytes(data: &[u8]) -> Result<Analysis> {
    analyze_bytes_with_options(data, &AnalyzerOptions::new())
}

/// Analyze an in-memory image with custom options.
///
/// # Errors
///
/// Returns a configuration error if `options` fail validation.
///
/// # Example
///
/// ```rust
/// use ecu_map_finder::{analyze_bytes_with_options, AnalyzerOptions};
///
/// let options = AnalyzerOptions::scan_only();
/// let analysis = analyze_bytes_with_options(&[0u8; 64], &options).unwrap();
/// assert_eq!(analysis.classified_count(), 0);
/// ```
pub fn analyze_bytes_with_options(data: &[u8], options: &AnalyzerOptions) -> Result<Analysis> {
    options.validate()?;
    let profile = &options.profile;

    let mut symbols = heuristics::discover(data, profile);
    if options.locate_anchors {
        anchors::locate(data, profile, &mut symbols);
    }
    symbols.sort_by(SortField::DataAddress, SortOrder::Ascending);

    if options.classify {
        let classified = Classifier::new(data).classify(&mut symbols);
        tracing::debug!(classified, total = symbols.len(), "classification finished");
    }

    let ident = if options.extract_ident {
        ident::extract(data, &profile.ident)
    } else {
        FirmwareIdent::default()
    };

    Ok(Analysis {
        profile: profile.name.to_string(),
        image_len: data.len(),
        ident,
        symbols,
    })
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

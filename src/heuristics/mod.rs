//! Structural discovery of calibration tables.
//!
//! This module finds table candidates in a raw image without any format
//! information and admits them into a symbol collection. The scanner accepts
//! any plausible header, so most admitted symbols in a real image are noise
//! that the classifier leaves generic.

pub mod admission;
pub mod sampling;
pub mod scanner;

pub use admission::{Admission, Admitter};
pub use sampling::{is_flat, is_monotonic, max_value, samples, Plane};
pub use scanner::{scan, Scanner};

use crate::family::FamilyProfile;
use crate::types::SymbolCollection;

/// Counters from one discovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Candidates proposed by the scanner
    pub candidates: usize,
    /// Candidates admitted
    pub admitted: usize,
    /// Rejected for size
    pub oversized: usize,
    /// Rejected as duplicate address
    pub duplicates: usize,
}

/// Scan `data` and admit every acceptable candidate, in scan order.
pub fn discover(data: &[u8], profile: &FamilyProfile) -> SymbolCollection {
    discover_with_stats(data, profile).0
}

/// Like [`discover`], also returning pass counters.
pub fn discover_with_stats(data: &[u8], profile: &FamilyProfile) -> (SymbolCollection, DiscoveryStats) {
    let admitter = Admitter::new(profile.banks, profile.max_table_bytes);
    let mut symbols = SymbolCollection::new();
    let mut stats = DiscoveryStats::default();

    for candidate in Scanner::new(data, profile.max_axis_len) {
        stats.candidates += 1;
        match admitter.admit(&mut symbols, candidate) {
            Admission::Admitted => stats.admitted += 1,
            Admission::Oversized => stats.oversized += 1,
            Admission::Duplicate => stats.duplicates += 1,
        }
    }

    tracing::debug!(
        candidates = stats.candidates,
        admitted = stats.admitted,
        oversized = stats.oversized,
        duplicates = stats.duplicates,
        "structural discovery finished"
    );
    (symbols, stats)
}

//! Candidate admission: size limit, address dedup and bank tagging.

use crate::bank::BankLayout;
use crate::types::{Symbol, SymbolCollection};

/// What happened to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Appended to the collection
    Admitted,
    /// Data block at or above the size limit
    Oversized,
    /// Another symbol already owns the data address
    Duplicate,
}

/// Gate between the scanner and the symbol collection.
#[derive(Debug, Clone, Copy)]
pub struct Admitter {
    banks: BankLayout,
    max_table_bytes: usize,
}

impl Admitter {
    /// Create an admitter for a bank layout and table size limit.
    pub fn new(banks: BankLayout, max_table_bytes: usize) -> Self {
        Self {
            banks,
            max_table_bytes,
        }
    }

    /// Admit a candidate into `symbols`. The first symbol at an address wins.
    pub fn admit(&self, symbols: &mut SymbolCollection, mut candidate: Symbol) -> Admission {
        if candidate.length >= self.max_table_bytes {
            tracing::trace!(
                address = candidate.data_address,
                length = candidate.length,
                "rejected oversized candidate"
            );
            return Admission::Oversized;
        }
        if symbols.contains_address(candidate.data_address) {
            tracing::trace!(address = candidate.data_address, "rejected duplicate candidate");
            return Admission::Duplicate;
        }
        candidate.code_bank = self.banks.resolve(candidate.data_address);
        symbols.insert(candidate);
        Admission::Admitted
    }
}

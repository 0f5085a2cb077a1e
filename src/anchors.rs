//! Anchored singleton values.
//!
//! A few scalar calibration values sit at fixed offsets from byte sequences
//! that are stable across software versions. They are found by signature
//! rather than by structure and added straight to the collection.

use crate::bank::BankLayout;
use crate::family::{AnchorSpec, CompanionSpec, FamilyProfile};
use crate::types::{Symbol, SymbolCollection, SymbolOrigin};

/// Add every anchored singleton of `profile` found in `data`.
///
/// Returns the number of symbols added.
pub fn locate(data: &[u8], profile: &FamilyProfile, symbols: &mut SymbolCollection) -> usize {
    let boost = locate_with_companion(
        data,
        &profile.boost_limiter,
        &profile.map_maf_switch,
        profile.banks,
        symbols,
    );
    let rev = locate_singleton(data, &profile.rev_limiter, profile.banks, symbols);
    tracing::debug!(boost, rev, "anchor location finished");
    boost + rev
}

/// Add one symbol per match of `spec`.
pub fn locate_singleton(
    data: &[u8],
    spec: &AnchorSpec,
    banks: BankLayout,
    symbols: &mut SymbolCollection,
) -> usize {
    let mut added = 0;
    for hit in spec.signature.find_iter(data) {
        if let Some(symbol) = anchored(data, spec, hit, banks) {
            if push(symbols, symbol) {
                added += 1;
            }
        }
    }
    added
}

/// Add one symbol per match of `spec`, plus the companion switch preceding
/// each match when present.
pub fn locate_with_companion(
    data: &[u8],
    spec: &AnchorSpec,
    companion: &CompanionSpec,
    banks: BankLayout,
    symbols: &mut SymbolCollection,
) -> usize {
    let mut added = 0;
    for hit in spec.signature.find_iter(data) {
        let Some(symbol) = anchored(data, spec, hit, banks) else {
            continue;
        };
        let bank = symbol.code_bank;
        if push(symbols, symbol) {
            added += 1;
        }

        let Some(switch_hit) = companion.signature.find_before(data, hit, companion.window) else {
            continue;
        };
        let address = switch_hit + companion.value_offset;
        if address + 2 > data.len() {
            continue;
        }
        let mut switch = Symbol::singleton(
            format!("{}{}", companion.name, bank),
            address,
            companion.category,
            companion.subcategory,
        );
        switch.code_bank = banks.resolve(address);
        tracing::debug!(address, "found {}", companion.name);
        if push(symbols, switch) {
            added += 1;
        }
    }
    added
}

fn anchored(data: &[u8], spec: &AnchorSpec, hit: usize, banks: BankLayout) -> Option<Symbol> {
    let address = hit + spec.value_offset;
    if address + 2 > data.len() {
        return None;
    }
    let mut symbol = Symbol::singleton(spec.name, address, spec.category, spec.subcategory);
    symbol.code_bank = banks.resolve(address);
    Some(symbol)
}

/// Anchored values outrank structural candidates at the same address; the
/// first anchor at an address wins.
fn push(symbols: &mut SymbolCollection, symbol: Symbol) -> bool {
    let address = symbol.data_address;
    match symbols.find_by_address(address).map(|s| s.origin) {
        None => symbols.insert(symbol),
        Some(SymbolOrigin::Structural) => {
            tracing::debug!(address, "anchored symbol replaces structural candidate");
            symbols.upsert(symbol);
            true
        }
        Some(SymbolOrigin::Anchor) => {
            tracing::trace!(address, "anchored symbol collides with existing anchor");
            false
        }
    }
}

//! Semantic classification of discovered tables.
//!
//! Each structurally discovered symbol is matched against an ordered rule
//! table keyed on its shape and on value statistics read from the image.
//! A match assigns a name, a category pair and axis descriptors.

pub mod rules;

pub use rules::{MapKind, Naming, Predicate, Probe, Rule, RULES};

use crate::axis::{AxisDescriptor, AxisRegistry};
use crate::types::{Symbol, SymbolCollection, SymbolOrigin};

/// Fields a rule writes into a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    /// Rule identity
    pub kind: MapKind,
    /// Assigned name
    pub name: String,
    /// Category
    pub category: &'static str,
    /// Subcategory
    pub subcategory: &'static str,
    /// Display size
    pub size: String,
    /// X-axis descriptor
    pub x_meta: AxisDescriptor,
    /// Y-axis descriptor
    pub y_meta: AxisDescriptor,
    /// Data descriptor
    pub z_meta: AxisDescriptor,
}

impl Stamp {
    fn apply(self, symbol: &mut Symbol) {
        symbol.name = self.name;
        symbol.category = self.category.to_string();
        symbol.subcategory = self.subcategory.to_string();
        symbol.size = self.size;
        symbol.x_meta = self.x_meta;
        symbol.y_meta = self.y_meta;
        symbol.z_meta = self.z_meta;
    }
}

/// Outcome of evaluating one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// No rule claims the shape
    Unmatched,
    /// A rule claimed the shape but its gate failed
    Rejected(MapKind),
    /// A rule claimed and accepted the symbol
    Classified(Stamp),
}

/// Applies a rule table to a symbol collection.
pub struct Classifier<'a> {
    data: &'a [u8],
    rules: &'a [Rule],
    registry: AxisRegistry,
}

impl<'a> Classifier<'a> {
    /// Classifier over `data` using the built-in rules.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_rules(data, &RULES)
    }

    /// Classifier over `data` using a custom rule table.
    pub fn with_rules(data: &'a [u8], rules: &'a [Rule]) -> Self {
        Self {
            data,
            rules,
            registry: AxisRegistry::new(),
        }
    }

    /// Evaluate one symbol against the rule table without modifying anything.
    pub fn evaluate(&self, symbol: &Symbol, symbols: &SymbolCollection) -> Verdict {
        let probe = Probe {
            data: self.data,
            symbol,
            symbols,
            registry: &self.registry,
        };
        let Some(rule) = self.rules.iter().find(|rule| rule.claims(&probe)) else {
            return Verdict::Unmatched;
        };
        if !rule.accepts(&probe) {
            return Verdict::Rejected(rule.kind);
        }

        let name = match rule.naming {
            Naming::Fixed(name) => name.to_string(),
            Naming::Counted(prefix) => {
                let n = symbols.count_named(prefix, symbol.code_bank) + 1;
                format!("{prefix} {n:02}")
            }
        };
        Verdict::Classified(Stamp {
            kind: rule.kind,
            name,
            category: rule.category,
            subcategory: rule.subcategory,
            size: symbol.shape().to_string(),
            x_meta: self.registry.get(rule.x).clone(),
            y_meta: self.registry.get(rule.y).clone(),
            z_meta: self.registry.get(rule.z).clone(),
        })
    }

    /// Classify every structural symbol in collection order.
    ///
    /// Anchored and already classified symbols are left alone. Returns the
    /// number of symbols classified.
    pub fn classify(&self, symbols: &mut SymbolCollection) -> usize {
        let mut classified = 0;
        for index in 0..symbols.len() {
            let verdict = match symbols.get(index) {
                Some(symbol) if symbol.origin == SymbolOrigin::Structural && !symbol.is_classified() => {
                    self.evaluate(symbol, symbols)
                }
                _ => continue,
            };
            match verdict {
                Verdict::Classified(stamp) => {
                    if let Some(symbol) = symbols.get_mut(index) {
                        tracing::debug!(address = symbol.data_address, "classified as {}", stamp.name);
                        stamp.apply(symbol);
                        classified += 1;
                    }
                }
                Verdict::Rejected(kind) => {
                    tracing::trace!(index, ?kind, "shape matched but acceptance failed");
                }
                Verdict::Unmatched => {}
            }
        }
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{describe, Quantity};
    use crate::bank::CodeBank;
    use pretty_assertions::assert_eq;

    /// Write a table with its header at `at`; returns the matching symbol.
    fn place(data: &mut Vec<u8>, at: usize, x: &[u16], y: &[u16], z: &[u16]) -> Symbol {
        let end = at + 4 + (x.len() + y.len() + z.len()) * 2;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[at..at + 2].copy_from_slice(&(x.len() as u16).to_be_bytes());
        data[at + 2..at + 4].copy_from_slice(&(y.len() as u16).to_be_bytes());
        let mut cursor = at + 4;
        for v in x.iter().chain(y).chain(z) {
            data[cursor..cursor + 2].copy_from_slice(&v.to_be_bytes());
            cursor += 2;
        }
        Symbol::table(at + 4, x.len(), y.len())
    }

    fn ramp(len: usize, start: u16, step: u16) -> Vec<u16> {
        (0..len as u16).map(|i| start + i * step).collect()
    }

    fn classify_one(data: &[u8], symbol: Symbol) -> Symbol {
        let mut symbols = SymbolCollection::new();
        symbols.insert(symbol);
        Classifier::new(data).classify(&mut symbols);
        symbols.into_vec().remove(0)
    }

    #[test]
    fn test_torque_limiter() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(4, 1000, 1000), &ramp(20, 800, 20), &ramp(80, 100, 5));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "Torque limiter");
        assert_eq!(sym.category, "Torque");
        assert_eq!(sym.subcategory, "Limiters");
        assert_eq!(sym.size, "[20x4]");
        assert_eq!(sym.x_meta.units, "rpm");
        assert_eq!(sym.y_meta.units, "mBar");
        assert_eq!(sym.z_meta.scale, 0.1);
    }

    #[test]
    fn test_all_zero_boost_table_stays_generic() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(10, 800, 20), &ramp(10, 1000, 400), &[0; 100]);
        let symbols = {
            let mut c = SymbolCollection::new();
            c.insert(sym.clone());
            c
        };
        let verdict = Classifier::new(&data).evaluate(&sym, &symbols);
        assert_eq!(verdict, Verdict::Rejected(MapKind::BoostLimit));

        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "3D 0000002C");
        assert!(!sym.is_classified());
    }

    #[test]
    fn test_boost_limit_map() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(10, 800, 20), &ramp(10, 1000, 400), &ramp(100, 2000, 5));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "Boost limit map");
        assert_eq!(sym.subcategory, "Limiters");
        assert_eq!(sym.z_meta.description, "Maximum boost pressure(mbar)");
    }

    #[test]
    fn test_narrow_torque_limiter_suppressed_by_wide_one() {
        let mut data = Vec::new();
        let narrow = place(&mut data, 0, &ramp(3, 1000, 1000), &ramp(21, 800, 20), &ramp(63, 1, 1));
        let wide = place(&mut data, 0x200, &ramp(4, 1000, 1000), &ramp(21, 800, 20), &ramp(84, 1, 1));

        let mut symbols = SymbolCollection::new();
        symbols.insert(narrow.clone());
        symbols.insert(wide);
        assert_eq!(Classifier::new(&data).classify(&mut symbols), 1);
        assert_eq!(symbols.get(0).unwrap().name, narrow.name);
        assert_eq!(symbols.get(1).unwrap().name, "Torque limiter");

        assert_eq!(classify_one(&data, narrow).name, "Torque limiter");
    }

    #[test]
    fn test_counted_names_per_bank() {
        let mut data = Vec::new();
        let x = ramp(19, 100, 100);
        let y = ramp(15, 1000, 500);
        let z = ramp(285, 500, 3);
        let mut symbols = SymbolCollection::new();
        for (at, bank) in [(0, CodeBank::PRIMARY), (0x300, CodeBank::PRIMARY), (0x600, CodeBank::MIRROR)] {
            let mut sym = place(&mut data, at, &x, &y, &z);
            sym.code_bank = bank;
            symbols.insert(sym);
        }

        assert_eq!(Classifier::new(&data).classify(&mut symbols), 3);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Injector duration 01", "Injector duration 02", "Injector duration 01"]
        );
        assert_eq!(symbols.get(0).unwrap().z_meta.units, "*");
    }

    #[test]
    fn test_injector_duration_rejects_uneven_rpm_axis() {
        let mut data = Vec::new();
        let mut y = ramp(15, 1000, 500);
        y[7] = y[6] + 10;
        let sym = place(&mut data, 0, &ramp(19, 100, 100), &y, &ramp(285, 500, 3));
        assert!(!classify_one(&data, sym).is_classified());
    }

    #[test]
    fn test_driver_wish() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(16, 0, 600), &ramp(8, 800, 500), &ramp(128, 0, 20));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "Driver wish 01");
        assert_eq!(sym.subcategory, "Target torque");
        assert_eq!(sym.x_meta.units, "%");
    }

    #[test]
    fn test_iq_limit_by_map_shadows_n75() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(16, 900, 100), &ramp(11, 800, 300), &[0; 176]);
        let sym = classify_one(&data, sym);
        assert!(!sym.is_classified());

        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(16, 900, 100), &ramp(11, 800, 300), &ramp(176, 3500, 10));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "IQ Limit by MAP");
    }

    #[test]
    fn test_guard_failure_falls_through() {
        let x = ramp(16, 0, 100);
        let y = ramp(13, 500, 200);

        let mut data = Vec::new();
        let sym = place(&mut data, 0, &x, &y, &ramp(208, 500, 5));
        assert_eq!(classify_one(&data, sym).name, "IQ Limit by Lambda");

        let mut data = Vec::new();
        let sym = place(&mut data, 0, &x, &y, &ramp(208, 4000, 5));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "EGR");
        assert_eq!(sym.z_meta.units, "mg/s");

        let mut data = Vec::new();
        let sym = place(&mut data, 0, &x, &ramp(13, 1000, 500), &ramp(208, 4000, 5));
        assert_eq!(classify_one(&data, sym).name, "IQ Limit by MAF");
    }

    #[test]
    fn test_start_iq_temperature_axis() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(9, 2531, 150), &ramp(9, 0, 100), &ramp(81, 10, 10));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "Start IQ");
        assert_eq!(sym.x_meta.offset, -273.1);
        assert_eq!(sym.x_meta.units, "*C");
    }

    fn verdict(data: &[u8], symbol: &Symbol) -> Verdict {
        let mut symbols = SymbolCollection::new();
        symbols.insert(symbol.clone());
        Classifier::new(data).evaluate(symbol, &symbols)
    }

    #[test]
    fn test_iq_to_torque_both_shapes() {
        for rows in [16, 18] {
            let mut data = Vec::new();
            let sym = place(&mut data, 0, &ramp(15, 0, 200), &ramp(rows, 800, 250), &ramp(15 * rows, 0, 7));
            let sym = classify_one(&data, sym);
            assert_eq!(sym.name, "IQ to Torque conversion");
            assert_eq!(sym.category, "Misc");
            assert_eq!(sym.subcategory, "Conversions/Linearizations");
            assert_eq!(sym.size, format!("[{rows}x15]"));
            assert_eq!(sym.x_meta, describe(Quantity::Torque));
            assert_eq!(sym.z_meta, describe(Quantity::InjectionQuantity));
        }
    }

    #[test]
    fn test_turbo_boost() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(16, 0, 500), &ramp(10, 1000, 300), &ramp(160, 2000, 3));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "Turbo Boost");
        assert_eq!(sym.category, "Turbo");
        assert_eq!(sym.subcategory, "Target Boost");
        assert_eq!(sym.size, "[10x16]");
        assert_eq!(sym.z_meta, describe(Quantity::BoostPressure));
    }

    #[test]
    fn test_turbo_boost_pressure_band_is_exclusive() {
        // data maxima of exactly 3000 and 1930
        for start in [2523, 1453] {
            let mut data = Vec::new();
            let sym = place(&mut data, 0, &ramp(16, 0, 500), &ramp(10, 1000, 300), &ramp(160, start, 3));
            assert_eq!(verdict(&data, &sym), Verdict::Rejected(MapKind::TurboBoost));
        }

        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(16, 0, 500), &ramp(10, 1000, 300), &ramp(160, 2522, 3));
        assert!(matches!(verdict(&data, &sym), Verdict::Classified(_)));
    }

    #[test]
    fn test_egr_hysteresis_curve() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &[0], &ramp(20, 800, 200), &ramp(20, 100, 10));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "EGR Hysteresis");
        assert_eq!(sym.category, "Misc");
        assert_eq!(sym.subcategory, "EGR");
        assert_eq!(sym.size, "[20x1]");
    }

    #[test]
    fn test_start_of_injection() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(14, 0, 400), &ramp(16, 800, 250), &ramp(224, 0, 4));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "Start of injection (SOI)");
        assert_eq!(sym.category, "Fuel");
        assert_eq!(sym.subcategory, "SOI");
        assert_eq!(sym.z_meta, describe(Quantity::InjectionStart));
    }

    #[test]
    fn test_bip_multiple_correction() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(10, 0, 100), &ramp(8, 800, 500), &ramp(80, 100, 5));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "BIP Multiple Correction");
        assert_eq!(sym.subcategory, "Corrections");
        assert_eq!(sym.x_meta, describe(Quantity::CrankAngle));
        assert_eq!(sym.z_meta, describe(Quantity::BipResolution));
    }

    #[test]
    fn test_bip_multiple_correction_needs_populated_data() {
        for fill in [0, 5] {
            let mut data = Vec::new();
            let sym = place(&mut data, 0, &ramp(10, 0, 100), &ramp(8, 800, 500), &[fill; 80]);
            assert_eq!(
                verdict(&data, &sym),
                Verdict::Rejected(MapKind::BipMultipleCorrection)
            );
        }
    }

    #[test]
    fn test_bip_basic_characteristic() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &[0], &ramp(10, 0, 100), &ramp(10, 50, 50));
        let sym = classify_one(&data, sym);
        assert_eq!(sym.name, "BIP Basic Characteristic");
        assert_eq!(sym.category, "Fuel");
        assert_eq!(sym.subcategory, "Corrections");
        assert_eq!(sym.size, "[10x1]");
    }

    #[test]
    fn test_unknown_shape_is_unmatched() {
        let mut data = Vec::new();
        let sym = place(&mut data, 0, &ramp(5, 0, 1), &ramp(7, 0, 1), &ramp(35, 0, 1));
        let mut symbols = SymbolCollection::new();
        symbols.insert(sym.clone());
        assert_eq!(Classifier::new(&data).evaluate(&sym, &symbols), Verdict::Unmatched);
    }

    #[test]
    fn test_anchored_symbols_are_skipped() {
        let data = vec![0u8; 0x40];
        let mut symbols = SymbolCollection::new();
        symbols.insert(Symbol::singleton("Single Value Rev Limiter (SVRL)", 0x10, "Misc", "Limiters"));
        assert_eq!(Classifier::new(&data).classify(&mut symbols), 0);
        assert_eq!(symbols.get(0).unwrap().name, "Single Value Rev Limiter (SVRL)");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let mut data = Vec::new();
        let mut symbols = SymbolCollection::new();
        symbols.insert(place(&mut data, 0, &ramp(16, 0, 600), &ramp(8, 800, 500), &ramp(128, 0, 20)));
        symbols.insert(place(&mut data, 0x200, &ramp(16, 0, 600), &ramp(8, 800, 500), &ramp(128, 0, 20)));
        let mut again = symbols.clone();

        let classifier = Classifier::new(&data);
        classifier.classify(&mut symbols);
        classifier.classify(&mut again);
        assert_eq!(symbols.as_slice(), again.as_slice());
        assert_eq!(symbols.get(1).unwrap().name, "Driver wish 02");

        // a second pass leaves classified symbols untouched
        let before = symbols.clone();
        assert_eq!(classifier.classify(&mut symbols), 0);
        assert_eq!(symbols.as_slice(), before.as_slice());
    }
}

//! Core types for the map finder.
//!
//! This module defines the symbol model produced by an analysis run:
//! discovered tables and anchored singletons, the ordered collection
//! holding them, and the options controlling a run.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::axis::AxisDescriptor;
use crate::bank::CodeBank;
use crate::error::Result;
use crate::family::FamilyProfile;
use crate::ident::FirmwareIdent;

/// Dimensionality tag of a structurally discovered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    /// One axis has a single breakpoint
    #[serde(rename = "2D")]
    Curve,
    /// Both axes have more than one breakpoint
    #[serde(rename = "3D")]
    Map,
}

impl TableKind {
    /// Kind of a table with the given axis lengths.
    pub fn from_lengths(x_len: usize, y_len: usize) -> Self {
        if x_len > 1 && y_len > 1 {
            TableKind::Map
        } else {
            TableKind::Curve
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Curve => write!(f, "2D"),
            TableKind::Map => write!(f, "3D"),
        }
    }
}

/// Table shape as (columns, rows) = (x-axis length, y-axis length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// X-axis element count
    pub cols: usize,
    /// Y-axis element count
    pub rows: usize,
}

impl Shape {
    /// Create a shape from column and row counts.
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    /// Number of data cells.
    pub fn cells(&self) -> usize {
        self.cols * self.rows
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}]", self.rows, self.cols)
    }
}

/// Location and element count of one axis array (16-bit elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AxisRef {
    /// Address of the first element
    pub address: usize,
    /// Element count
    pub length: usize,
}

impl AxisRef {
    /// First address past the array.
    pub fn end(&self) -> usize {
        self.address + self.length * 2
    }
}

/// Where a symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolOrigin {
    /// Found by the structural scanner
    #[default]
    Structural,
    /// Located through a byte-signature anchor
    Anchor,
}

/// One discovered table or anchored calibration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Generated or rule-assigned name
    pub name: String,
    /// Address of the data block
    pub data_address: usize,
    /// Data block length in bytes
    pub length: usize,
    /// X-axis array
    pub x_axis: AxisRef,
    /// Y-axis array
    pub y_axis: AxisRef,
    /// Resolved code bank of `data_address`
    pub code_bank: CodeBank,
    /// Discovery path
    pub origin: SymbolOrigin,
    /// Category, empty when unclassified
    pub category: String,
    /// Subcategory, empty when unclassified
    pub subcategory: String,
    /// Display size, e.g. `[20x4]` or `1x1`
    pub size: String,
    /// X-axis meaning
    pub x_meta: AxisDescriptor,
    /// Y-axis meaning
    pub y_meta: AxisDescriptor,
    /// Data block meaning
    pub z_meta: AxisDescriptor,
}

impl Symbol {
    /// A table whose x-axis starts at `x_address`, followed directly by the
    /// y-axis and then the data block.
    pub fn table(x_address: usize, x_len: usize, y_len: usize) -> Self {
        let x_axis = AxisRef {
            address: x_address,
            length: x_len,
        };
        let y_axis = AxisRef {
            address: x_axis.end(),
            length: y_len,
        };
        let data_address = y_axis.end();
        let name = format!("{} {:08X}", TableKind::from_lengths(x_len, y_len), data_address);
        Self {
            name,
            data_address,
            length: x_len * y_len * 2,
            x_axis,
            y_axis,
            code_bank: CodeBank::default(),
            origin: SymbolOrigin::Structural,
            category: String::new(),
            subcategory: String::new(),
            size: String::new(),
            x_meta: AxisDescriptor::neutral(),
            y_meta: AxisDescriptor::neutral(),
            z_meta: AxisDescriptor::neutral(),
        }
    }

    /// A single 16-bit value at `address`.
    pub fn singleton(name: impl Into<String>, address: usize, category: &str, subcategory: &str) -> Self {
        let scalar = AxisRef { address, length: 1 };
        Self {
            name: name.into(),
            data_address: address,
            length: 2,
            x_axis: scalar,
            y_axis: scalar,
            code_bank: CodeBank::default(),
            origin: SymbolOrigin::Anchor,
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            size: "1x1".to_string(),
            x_meta: AxisDescriptor::neutral(),
            y_meta: AxisDescriptor::neutral(),
            z_meta: AxisDescriptor::neutral(),
        }
    }

    /// Table kind derived from the axis lengths.
    pub fn kind(&self) -> TableKind {
        TableKind::from_lengths(self.x_axis.length, self.y_axis.length)
    }

    /// Axis lengths as a shape.
    pub fn shape(&self) -> Shape {
        Shape::new(self.x_axis.length, self.y_axis.length)
    }

    /// Whether this is a 1x1 value.
    pub fn is_singleton(&self) -> bool {
        self.x_axis.length == 1 && self.y_axis.length == 1
    }

    /// First address past the data block.
    pub fn data_end(&self) -> usize {
        self.data_address + self.length
    }

    /// Whether semantic identity has been assigned.
    pub fn is_classified(&self) -> bool {
        !self.category.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X} {} {}", self.data_address, self.shape(), self.name)
    }
}

/// Field a collection can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Data block address
    #[default]
    DataAddress,
    /// Symbol name
    Name,
    /// Code bank, then data address
    CodeBank,
    /// Data length in bytes
    Length,
}

/// Sorting direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Insertion-ordered symbols with unique data addresses.
#[derive(Debug, Clone, Default)]
pub struct SymbolCollection {
    symbols: Vec<Symbol>,
    addresses: HashSet<usize>,
}

impl SymbolCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether a symbol with this data address exists.
    pub fn contains_address(&self, address: usize) -> bool {
        self.addresses.contains(&address)
    }

    /// Append a symbol unless its data address is already taken.
    ///
    /// Returns `false` when the symbol was rejected.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if !self.addresses.insert(symbol.data_address) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    /// Put `symbol` in place of the symbol holding its data address, or
    /// append it when the address is free.
    ///
    /// Returns the displaced symbol. The displaced symbol keeps no slot, so
    /// addresses stay unique.
    pub fn upsert(&mut self, symbol: Symbol) -> Option<Symbol> {
        if self.addresses.insert(symbol.data_address) {
            self.symbols.push(symbol);
            return None;
        }
        let slot = self
            .symbols
            .iter_mut()
            .find(|s| s.data_address == symbol.data_address)?;
        Some(std::mem::replace(slot, symbol))
    }

    /// Symbol at an index.
    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    /// Mutable access for semantic fields. Address fields must not change.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Symbol> {
        self.symbols.get_mut(index)
    }

    /// Iterate in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    /// Symbols as a slice.
    pub fn as_slice(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Find the symbol with a data address.
    pub fn find_by_address(&self, address: usize) -> Option<&Symbol> {
        if !self.contains_address(address) {
            return None;
        }
        self.symbols.iter().find(|s| s.data_address == address)
    }

    /// Stable sort by a field.
    pub fn sort_by(&mut self, field: SortField, order: SortOrder) {
        self.symbols.sort_by(|a, b| {
            let ordering = match field {
                SortField::DataAddress => a.data_address.cmp(&b.data_address),
                SortField::Name => a.name.cmp(&b.name),
                SortField::CodeBank => a
                    .code_bank
                    .cmp(&b.code_bank)
                    .then(a.data_address.cmp(&b.data_address)),
                SortField::Length => a.length.cmp(&b.length),
            };
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    /// Whether any symbol has exactly this shape.
    pub fn contains_shape(&self, shape: Shape) -> bool {
        self.symbols.iter().any(|s| s.shape() == shape)
    }

    /// Count symbols in `bank` whose name starts with `prefix`.
    pub fn count_named(&self, prefix: &str, bank: CodeBank) -> usize {
        self.symbols
            .iter()
            .filter(|s| s.code_bank == bank && s.name.starts_with(prefix))
            .count()
    }

    /// Number of symbols carrying semantic identity.
    pub fn classified_count(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_classified()).count()
    }

    /// Consume into the underlying vector.
    pub fn into_vec(self) -> Vec<Symbol> {
        self.symbols
    }
}

impl<'a> IntoIterator for &'a SymbolCollection {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

impl IntoIterator for SymbolCollection {
    type Item = Symbol;
    type IntoIter = std::vec::IntoIter<Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.into_iter()
    }
}

impl Serialize for SymbolCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.symbols)
    }
}

/// Options controlling one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// ECU family data: bank thresholds, size limits, signatures
    pub profile: FamilyProfile,
    /// Run the anchor locator
    pub locate_anchors: bool,
    /// Run the semantic classifier
    pub classify: bool,
    /// Extract firmware identification strings
    pub extract_ident: bool,
}

impl AnalyzerOptions {
    /// Full pipeline for the EDC16C family.
    pub fn new() -> Self {
        Self::for_profile(FamilyProfile::edc16c())
    }

    /// Full pipeline for a given family profile.
    pub fn for_profile(profile: FamilyProfile) -> Self {
        Self {
            profile,
            locate_anchors: true,
            classify: true,
            extract_ident: true,
        }
    }

    /// Structural discovery only: no anchors, no classification.
    pub fn scan_only() -> Self {
        Self {
            locate_anchors: false,
            classify: false,
            extract_ident: false,
            ..Self::new()
        }
    }

    /// Check the options before a run.
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()
    }
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of analyzing one image.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Family profile name
    pub profile: String,
    /// Image length in bytes
    pub image_len: usize,
    /// Identification strings found in the image
    pub ident: FirmwareIdent,
    /// Symbols sorted ascending by data address
    pub symbols: SymbolCollection,
}

impl Analysis {
    /// Number of symbols with semantic identity.
    pub fn classified_count(&self) -> usize {
        self.symbols.classified_count()
    }
}

//! Output formatters for analysis reports.
//!
//! This module provides trait-based formatters for rendering an
//! [`Analysis`] in various output formats (human-readable, JSON, compact).

use crate::ident::FirmwareIdent;
use crate::types::{Analysis, Symbol};
use std::path::Path;

/// Trait for formatting analysis reports.
///
/// Implementors provide methods for rendering each component of a report,
/// plus a method to render the complete report.
pub trait ReportFormatter {
    /// Format the file path header.
    fn format_file(&self, path: &Path) -> String;

    /// Format the identification block.
    fn format_ident(&self, ident: &FirmwareIdent) -> Option<String>;

    /// Format the symbol table.
    fn format_symbols(&self, symbols: &[&Symbol]) -> Option<String>;

    /// Format the closing summary line.
    fn format_summary(&self, analysis: &Analysis) -> Option<String>;

    /// Whether unclassified symbols are left out.
    fn classified_only(&self) -> bool {
        false
    }

    /// Format the complete report.
    ///
    /// Default implementation concatenates all component outputs.
    fn format_report(&self, analysis: &Analysis, path: &Path) -> String {
        let mut parts = vec![self.format_file(path)];

        if let Some(s) = self.format_ident(&analysis.ident) {
            parts.push(s);
        }
        let symbols = visible_symbols(analysis, self.classified_only());
        if let Some(s) = self.format_symbols(&symbols) {
            parts.push(s);
        }
        if let Some(s) = self.format_summary(analysis) {
            parts.push(s);
        }

        parts.join("")
    }
}

fn visible_symbols(analysis: &Analysis, classified_only: bool) -> Vec<&Symbol> {
    analysis
        .symbols
        .iter()
        .filter(|s| !classified_only || s.is_classified())
        .collect()
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Show verbose output (axis units and scaling)
    pub verbose: bool,
    /// Quiet mode (summary line only)
    pub quiet: bool,
    /// Hide symbols without semantic identity
    pub classified_only: bool,
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    /// Create a quiet formatter.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_file(&self, path: &Path) -> String {
        if self.quiet {
            String::new()
        } else {
            format!("File: {}\n", path.display())
        }
    }

    fn format_ident(&self, ident: &FirmwareIdent) -> Option<String> {
        if self.quiet || ident.is_empty() {
            return None;
        }
        let mut s = String::new();
        let fields = [
            ("Part no.", &ident.part_number),
            ("Software", &ident.software_number),
            ("Info", &ident.info),
            ("ECU", &ident.ecu_version),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                s.push_str(&format!("  {:10}{}\n", format!("{label}:"), value));
            }
        }
        Some(s)
    }

    fn format_symbols(&self, symbols: &[&Symbol]) -> Option<String> {
        if self.quiet || symbols.is_empty() {
            return None;
        }

        let mut s = String::from("  Address     Size     Bank  Name\n");
        for symbol in symbols {
            let size = if symbol.size.is_empty() {
                symbol.shape().to_string()
            } else {
                symbol.size.clone()
            };
            s.push_str(&format!(
                "  0x{:08X}  {:<8} {:<5} {}",
                symbol.data_address, size, symbol.code_bank.0, symbol.name
            ));
            if symbol.is_classified() {
                s.push_str(&format!("  [{}/{}]", symbol.category, symbol.subcategory));
            }
            s.push('\n');

            if self.verbose && symbol.is_classified() && !symbol.is_singleton() {
                let axes = [("x", &symbol.x_meta), ("y", &symbol.y_meta), ("z", &symbol.z_meta)];
                for (axis, meta) in axes {
                    s.push_str(&format!(
                        "                {}: {} [{}] x{}",
                        axis, meta.description, meta.units, meta.scale
                    ));
                    if meta.offset != 0.0 {
                        s.push_str(&format!(" {:+}", meta.offset));
                    }
                    s.push('\n');
                }
            }
        }
        Some(s)
    }

    fn format_summary(&self, analysis: &Analysis) -> Option<String> {
        Some(format!(
            "  {} symbols, {} classified ({} bytes, {})\n",
            analysis.symbols.len(),
            analysis.classified_count(),
            analysis.image_len,
            analysis.profile
        ))
    }

    fn classified_only(&self) -> bool {
        self.classified_only
    }

    fn format_report(&self, analysis: &Analysis, path: &Path) -> String {
        if self.quiet {
            // Quiet mode: just "path: counts"
            return format!(
                "{}: {} symbols, {} classified\n",
                path.display(),
                analysis.symbols.len(),
                analysis.classified_count()
            );
        }

        let mut parts = vec![self.format_file(path)];
        if let Some(s) = self.format_ident(&analysis.ident) {
            parts.push(s);
        }
        let symbols = visible_symbols(analysis, self.classified_only);
        if let Some(s) = self.format_symbols(&symbols) {
            parts.push(s);
        }
        if let Some(s) = self.format_summary(analysis) {
            parts.push(s);
        }
        parts.push(String::from("\n")); // Trailing newline
        parts.join("")
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
    /// Hide symbols without semantic identity
    pub classified_only: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self {
            pretty: true,
            classified_only: false,
        }
    }
}

impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Self::default()
        }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_report
    }

    fn format_ident(&self, _ident: &FirmwareIdent) -> Option<String> {
        None // Handled in format_report
    }

    fn format_symbols(&self, _symbols: &[&Symbol]) -> Option<String> {
        None // Handled in format_report
    }

    fn format_summary(&self, _analysis: &Analysis) -> Option<String> {
        None // Handled in format_report
    }

    fn classified_only(&self) -> bool {
        self.classified_only
    }

    fn format_report(&self, analysis: &Analysis, path: &Path) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            file: String,
            profile: &'a str,
            image_len: usize,
            ident: &'a FirmwareIdent,
            symbol_count: usize,
            classified_count: usize,
            symbols: Vec<&'a Symbol>,
        }

        let output = JsonOutput {
            file: path.display().to_string(),
            profile: &analysis.profile,
            image_len: analysis.image_len,
            ident: &analysis.ident,
            symbol_count: analysis.symbols.len(),
            classified_count: analysis.classified_count(),
            symbols: visible_symbols(analysis, self.classified_only),
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Compact single-line output formatter.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for ShortFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_report
    }

    fn format_ident(&self, _ident: &FirmwareIdent) -> Option<String> {
        None
    }

    fn format_symbols(&self, _symbols: &[&Symbol]) -> Option<String> {
        None
    }

    fn format_summary(&self, _analysis: &Analysis) -> Option<String> {
        None
    }

    fn format_report(&self, analysis: &Analysis, path: &Path) -> String {
        format!(
            "{}\t{}\t{}\t{}\n",
            path.display(),
            analysis.symbols.len(),
            analysis.classified_count(),
            analysis.ident.software_number.as_deref().unwrap_or("-")
        )
    }
}

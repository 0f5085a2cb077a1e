//! ECU Map Finder CLI
//!
//! Command-line tool for locating calibration tables in ECU firmware dumps.

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use ecu_map_finder::formatter::{HumanFormatter, JsonFormatter, ReportFormatter, ShortFormatter};
use ecu_map_finder::{analyze_bytes_with_options, Analysis, AnalyzerOptions, BankLayout, FamilyProfile};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Calibration map finder for engine-control firmware.
///
/// Discovers axis/data tables in raw flash dumps, locates anchored limiter
/// values and names the tables it recognizes.
#[derive(Parser, Debug)]
#[command(name = "ecu-map-find")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Firmware image(s) to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// ECU family profile
    #[arg(long, default_value = "edc16c", env = "ECU_MAP_FAMILY")]
    family: String,

    /// First address of the calibration area (decimal or 0x hex)
    #[arg(long, value_parser = parse_address)]
    bank_low: Option<usize>,

    /// First address of the mirrored calibration bank (decimal or 0x hex)
    #[arg(long, value_parser = parse_address)]
    bank_high: Option<usize>,

    /// Reject tables whose data block is this many bytes or more
    #[arg(long)]
    max_table_bytes: Option<usize>,

    /// Skip the signature-anchored singleton values
    #[arg(long)]
    no_anchors: bool,

    /// Skip semantic classification
    #[arg(long)]
    no_classify: bool,

    /// Only list symbols that were recognized
    #[arg(long)]
    classified_only: bool,

    /// Walk directories and analyze every file in them
    #[cfg(feature = "batch")]
    #[arg(short, long)]
    recursive: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (only output essential info)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Compact single-line output
    Short,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ecu_map_finder=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let options = match build_options(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let formatter = make_formatter(&args);

    let paths = collect_paths(&args);
    let results = analyze_all(&paths, &options);

    let mut success = true;
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(analysis) => {
                let report = formatter.format_report(&analysis, path);
                if report.ends_with('\n') {
                    print!("{report}");
                } else {
                    println!("{report}");
                }
            }
            Err(e) => {
                if !args.quiet {
                    eprintln!("Error analyzing {}: {:#}", path.display(), e);
                }
                success = false;
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Parse an address given in decimal or `0x`-prefixed hex.
fn parse_address(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

fn build_options(args: &Args) -> anyhow::Result<AnalyzerOptions> {
    let mut profile = FamilyProfile::by_name(&args.family).ok_or_else(|| {
        anyhow!(
            "unknown family '{}', expected one of: {}",
            args.family,
            FamilyProfile::builtin_names().join(", ")
        )
    })?;

    if args.bank_low.is_some() || args.bank_high.is_some() {
        profile.banks = BankLayout::new(
            args.bank_low.unwrap_or(profile.banks.low),
            args.bank_high.unwrap_or(profile.banks.high),
        )
        .context("invalid bank thresholds")?;
    }
    if let Some(max) = args.max_table_bytes {
        profile.max_table_bytes = max;
    }

    let mut options = AnalyzerOptions::for_profile(profile);
    options.locate_anchors = !args.no_anchors;
    options.classify = !args.no_classify;
    options.validate().context("invalid analyzer options")?;
    Ok(options)
}

fn make_formatter(args: &Args) -> Box<dyn ReportFormatter> {
    match args.format {
        OutputFormat::Human => Box::new(HumanFormatter {
            verbose: args.verbose,
            quiet: args.quiet,
            classified_only: args.classified_only,
        }),
        OutputFormat::Json => Box::new(JsonFormatter {
            classified_only: args.classified_only,
            ..JsonFormatter::new()
        }),
        OutputFormat::Short => Box::new(ShortFormatter::new()),
    }
}

#[cfg(feature = "batch")]
fn collect_paths(args: &Args) -> Vec<PathBuf> {
    if !args.recursive {
        return args.files.clone();
    }
    let mut paths = Vec::new();
    for root in &args.files {
        if root.is_dir() {
            paths.extend(
                walkdir::WalkDir::new(root)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|entry| entry.file_type().is_file())
                    .map(walkdir::DirEntry::into_path),
            );
        } else {
            paths.push(root.clone());
        }
    }
    paths
}

#[cfg(not(feature = "batch"))]
fn collect_paths(args: &Args) -> Vec<PathBuf> {
    args.files.clone()
}

/// One single-threaded analysis per image; results follow input order.
#[cfg(feature = "batch")]
fn analyze_all(paths: &[PathBuf], options: &AnalyzerOptions) -> Vec<anyhow::Result<Analysis>> {
    use rayon::prelude::*;
    paths.par_iter().map(|path| analyze_path(path, options)).collect()
}

#[cfg(not(feature = "batch"))]
fn analyze_all(paths: &[PathBuf], options: &AnalyzerOptions) -> Vec<anyhow::Result<Analysis>> {
    paths.iter().map(|path| analyze_path(path, options)).collect()
}

fn analyze_path(path: &Path, options: &AnalyzerOptions) -> anyhow::Result<Analysis> {
    let data = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let analysis = analyze_bytes_with_options(&data, options)?;
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["ecu-map-find", "dump.bin"]).unwrap();
        assert_eq!(args.files.len(), 1);
        assert_eq!(args.family, "edc16c");
        assert!(!args.verbose);
        assert!(!args.no_anchors);
    }

    #[test]
    fn test_multiple_files() {
        let args = Args::try_parse_from(["ecu-map-find", "a.bin", "b.bin"]).unwrap();
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn test_format_options() {
        let args = Args::try_parse_from(["ecu-map-find", "-f", "json", "dump.bin"]).unwrap();
        assert!(matches!(args.format, OutputFormat::Json));
    }

    #[test]
    fn test_requires_a_file() {
        assert!(Args::try_parse_from(["ecu-map-find"]).is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x40000"), Ok(0x40000));
        assert_eq!(parse_address("0X1C0000"), Ok(0x1C0000));
        assert_eq!(parse_address("262144"), Ok(262_144));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_build_options_overrides() {
        let args = Args::try_parse_from([
            "ecu-map-find",
            "--bank-low",
            "0x10000",
            "--max-table-bytes",
            "400",
            "--no-classify",
            "dump.bin",
        ])
        .unwrap();
        let options = build_options(&args).unwrap();
        assert_eq!(options.profile.banks.low, 0x10000);
        assert_eq!(options.profile.banks.high, 0x1C0000);
        assert_eq!(options.profile.max_table_bytes, 400);
        assert!(!options.classify);
        assert!(options.locate_anchors);
    }

    #[test]
    fn test_build_options_rejects_bad_input() {
        let args = Args::try_parse_from(["ecu-map-find", "--family", "me7", "dump.bin"]).unwrap();
        assert!(build_options(&args).is_err());

        let args = Args::try_parse_from([
            "ecu-map-find",
            "--bank-low",
            "0x200000",
            "dump.bin",
        ])
        .unwrap();
        assert!(build_options(&args).is_err());
    }

    #[test]
    fn test_analyze_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xFF; 0x400]).unwrap();
        let args = Args::try_parse_from(["ecu-map-find", "dump.bin"]).unwrap();
        let options = build_options(&args).unwrap();
        let analysis = analyze_path(file.path(), &options).unwrap();
        assert_eq!(analysis.image_len, 0x400);
        assert!(analysis.symbols.is_empty());

        assert!(analyze_path(Path::new("/nonexistent/dump.bin"), &options).is_err());
    }
}

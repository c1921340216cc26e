use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::parse_lenient_date;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Procurement indicators from ERP purchase-order extracts",
    long_about = None
)]
pub struct Cli {
    /// YAML settings file (aliases, windows, growth policy)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Reference date anchoring every lookback window (defaults to today)
    #[arg(long = "as-of", global = true, value_parser = parse_reference_date)]
    pub as_of: Option<NaiveDate>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Headline figures: mean order value, basic-order share, supplier counts
    Summary(SummaryArgs),
    /// Highest-spend supplier per region
    TopSuppliers(TopSuppliersArgs),
    /// Order-level indicators
    Orders(OrdersArgs),
    /// Purchase volume by bimester or month
    Volume(VolumeArgs),
    /// Year-over-year and compound growth per material category
    Growth(GrowthArgs),
    /// Supplier registry indicators
    Suppliers(SuppliersArgs),
    /// Show which column each transaction field resolved to
    Columns(ColumnsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Transaction extract (one row per purchase-order line)
    #[arg(short = 't', long)]
    pub transactions: PathBuf,
    /// Basic-material reference list
    #[arg(short = 'r', long)]
    pub reference: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Supplier registry, enables the registered-supplier count
    #[arg(long)]
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TopSuppliersArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Lookback window in years
    #[arg(long)]
    pub years: Option<u32>,
    /// Use the short "recent" window from settings
    #[arg(long, conflicts_with = "years")]
    pub recent: bool,
    /// Region codes to report, in order (repeatable; defaults from settings)
    #[arg(long = "region", action = clap::ArgAction::Append)]
    pub regions: Vec<String>,
    /// Report every region present instead of the configured defaults
    #[arg(long, conflicts_with = "regions")]
    pub all_regions: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OrdersView {
    Largest,
    Smallest,
    Mean,
    BasicShare,
    LineLargest,
    LineSmallest,
}

#[derive(Debug, Args)]
pub struct OrdersArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, value_enum)]
    pub view: OrdersView,
    /// Lookback window in years for the basic-share view
    #[arg(long)]
    pub years: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum VolumePeriod {
    Bimonthly,
    Monthly,
    MonthOfYear,
}

#[derive(Debug, Args)]
pub struct VolumeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, value_enum, default_value_t = VolumePeriod::Bimonthly)]
    pub period: VolumePeriod,
    /// Lookback window in years
    #[arg(long)]
    pub years: Option<u32>,
    /// Keep only the N highest buckets (monthly views)
    #[arg(long)]
    pub top: Option<usize>,
    /// Keep bimesters in calendar order instead of ranking them
    #[arg(long)]
    pub calendar_order: bool,
}

#[derive(Debug, Args)]
pub struct GrowthArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Years of continuous sales required for compound growth
    #[arg(long)]
    pub presence_years: Option<u32>,
    /// Clip growth percentages to +/- this bound
    #[arg(long)]
    pub clip: Option<f64>,
    /// Disable clipping
    #[arg(long, conflicts_with = "clip")]
    pub no_clip: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SuppliersView {
    Registered,
    Active,
    Registrations,
    Apt,
}

#[derive(Debug, Args)]
pub struct SuppliersArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Supplier registry table
    #[arg(long)]
    pub registry: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub view: SuppliersView,
    /// Lookback window in years
    #[arg(long)]
    pub years: Option<u32>,
    /// Region code or municipality to count apt suppliers for (repeatable)
    #[arg(long = "location", action = clap::ArgAction::Append)]
    pub locations: Vec<String>,
    /// Emit one row per calendar year, zero-filled
    #[arg(long)]
    pub densify: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_reference_date(value: &str) -> Result<NaiveDate, String> {
    parse_lenient_date(value).ok_or_else(|| format!("Unrecognized date '{value}'"))
}

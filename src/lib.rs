pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod frame;
pub mod indicators;
pub mod io_utils;
pub mod loader;
pub mod matching;
pub mod registry;
pub mod report;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use crate::{
    cli::{Cli, Commands, InputArgs, OrdersView, OutputFormat, SuppliersView, VolumePeriod},
    columns::ColumnResolver,
    config::{GrowthPolicy, Settings},
    indicators::{Extreme, growth, orders, suppliers, volume, window_start},
    io_utils::CsvSource,
    loader::Transactions,
    matching::TokenOverlap,
    registry::SupplierRegistry,
    report::{Metric, TabularRow},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("supply_indicators", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Per-invocation state shared by every command handler.
struct Session {
    settings: Settings,
    resolver: ColumnResolver,
    reference: NaiveDate,
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let reference = cli
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    debug!("Reference date {reference}");
    let session = Session {
        resolver: settings.resolver(),
        settings,
        reference,
    };
    match cli.command {
        Commands::Summary(args) => handle_summary(&session, &args),
        Commands::TopSuppliers(args) => handle_top_suppliers(&session, &args),
        Commands::Orders(args) => handle_orders(&session, &args),
        Commands::Volume(args) => handle_volume(&session, &args),
        Commands::Growth(args) => handle_growth(&session, &args),
        Commands::Suppliers(args) => handle_suppliers(&session, &args),
        Commands::Columns(args) => handle_columns(&session, &args),
    }
}

fn load_transactions(session: &Session, input: &InputArgs) -> Result<Transactions> {
    info!(
        "Loading '{}' against reference '{}'",
        input.transactions.display(),
        input.reference.display()
    );
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    let transactions = CsvSource::new(&input.transactions)
        .with_delimiter(input.delimiter)
        .with_encoding(encoding);
    let reference = CsvSource::new(&input.reference)
        .with_delimiter(input.delimiter)
        .with_encoding(encoding);
    loader::load_bases(&transactions, &reference, &session.resolver)
}

fn load_registry(session: &Session, input: &InputArgs, path: &Path) -> Result<SupplierRegistry> {
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    let source = CsvSource::new(path)
        .with_delimiter(input.delimiter)
        .with_encoding(encoding);
    Ok(SupplierRegistry::load(&source)?.with_placeholders(&session.settings.placeholders))
}

fn emit<T: TabularRow>(rows: &[T], format: OutputFormat) -> Result<()> {
    let rendered = report::render(rows, format)?;
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
    Ok(())
}

/// Headline figures followed by their detail rows; JSON keeps the pair as
/// one document.
fn emit_with_headline<S, T>(
    whole: &S,
    headline: &[Metric],
    rows: &[T],
    format: OutputFormat,
) -> Result<()>
where
    S: Serialize,
    T: TabularRow,
{
    match format {
        OutputFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(whole).context("Serializing indicator to JSON")?;
            println!("{rendered}");
            Ok(())
        }
        OutputFormat::Table | OutputFormat::Csv => {
            emit(headline, format)?;
            println!();
            emit(rows, format)
        }
    }
}

fn handle_summary(session: &Session, args: &cli::SummaryArgs) -> Result<()> {
    let table = load_transactions(session, &args.input)?;
    let windows = &session.settings.windows;
    let mean = orders::mean_order_value(&table);
    let share = orders::basic_order_share(&table, session.reference, windows.basic_share_years)?;
    let active = registry::active_suppliers_per_year(
        &table,
        session.reference,
        windows.active_supplier_years,
    )?;
    let distinct = suppliers::distinct_active_suppliers(
        &table,
        &session.resolver,
        session.reference,
        windows.active_supplier_years,
    )?;

    let mut metrics = vec![
        Metric::new("mean_order_value", report::money(mean.mean)),
        Metric::new("orders", mean.orders.len()),
        Metric::new("basic_order_percent", report::money(share.percent)),
        Metric::new("active_suppliers", distinct),
    ];
    if let Some(path) = &args.registry {
        let registry = load_registry(session, &args.input, path)?;
        let registered = registry::total_registered_suppliers(&registry, &session.resolver)?;
        metrics.push(Metric::new("registered_suppliers", registered));
    }
    let summary = active.summary;
    if let (Some(first), Some(last)) = (summary.first_year, summary.last_year) {
        metrics.push(Metric::new(
            "active_suppliers_change",
            format!(
                "{first}: {} -> {last}: {} ({:+} / {}%)",
                summary.first_count,
                summary.last_count,
                summary.change_abs,
                report::money(summary.change_percent)
            ),
        ));
    }
    emit(&metrics, args.input.format)
}

fn handle_top_suppliers(session: &Session, args: &cli::TopSuppliersArgs) -> Result<()> {
    let table = load_transactions(session, &args.input)?;
    let windows = &session.settings.windows;
    let years = match (args.years, args.recent) {
        (Some(years), _) => years,
        (None, true) => windows.recent_top_supplier_years,
        (None, false) => windows.top_supplier_years,
    };
    let regions = if args.all_regions {
        Vec::new()
    } else if args.regions.is_empty() {
        session.settings.regions.clone()
    } else {
        args.regions.clone()
    };
    info!("Top supplier per region over {years} year(s)");
    let rows = suppliers::top_supplier_by_region(&table, session.reference, years, &regions)?;
    emit(&rows, args.input.format)
}

fn handle_orders(session: &Session, args: &cli::OrdersArgs) -> Result<()> {
    let table = load_transactions(session, &args.input)?;
    let format = args.input.format;
    match args.view {
        OrdersView::Largest => emit(
            &orders::largest_order(&table).into_iter().collect::<Vec<_>>(),
            format,
        ),
        OrdersView::Smallest => emit(
            &orders::smallest_order(&table).into_iter().collect::<Vec<_>>(),
            format,
        ),
        OrdersView::Mean => {
            let mean = orders::mean_order_value(&table);
            let headline = [Metric::new("mean_order_value", report::money(mean.mean))];
            emit_with_headline(&mean, &headline, &mean.orders, format)
        }
        OrdersView::BasicShare => {
            let years = args
                .years
                .unwrap_or(session.settings.windows.basic_share_years);
            let share = orders::basic_order_share(&table, session.reference, years)?;
            let headline = [Metric::new(
                "basic_order_percent",
                report::money(share.percent),
            )];
            emit_with_headline(&share, &headline, &share.breakdown, format)
        }
        OrdersView::LineLargest | OrdersView::LineSmallest => {
            let extreme = if args.view == OrdersView::LineLargest {
                Extreme::Largest
            } else {
                Extreme::Smallest
            };
            let item = orders::extreme_line_item(table.frame(), &session.resolver, extreme)?;
            emit(&item.into_iter().collect::<Vec<_>>(), format)
        }
    }
}

fn handle_volume(session: &Session, args: &cli::VolumeArgs) -> Result<()> {
    let table = load_transactions(session, &args.input)?;
    let format = args.input.format;
    let windows = &session.settings.windows;
    match args.period {
        VolumePeriod::Bimonthly => {
            let order = if args.calendar_order {
                volume::VolumeOrder::Calendar
            } else {
                volume::VolumeOrder::ByValue
            };
            let years = args.years.unwrap_or(windows.volume_years);
            let rows = volume::bimonthly_volume(&table, session.reference, years, order);
            emit(&rows, format)
        }
        VolumePeriod::Monthly => {
            let years = args.years.unwrap_or(1);
            let top = Some(args.top.unwrap_or(session.settings.top_n));
            let rows = volume::monthly_volume(&table, session.reference, years, top);
            emit(&rows, format)
        }
        VolumePeriod::MonthOfYear => {
            let top = Some(args.top.unwrap_or(session.settings.top_n));
            emit(&volume::month_of_year_volume(&table, top), format)
        }
    }
}

fn handle_growth(session: &Session, args: &cli::GrowthArgs) -> Result<()> {
    let table = load_transactions(session, &args.input)?;
    let defaults = session.settings.growth;
    let policy = GrowthPolicy {
        clip_percent: if args.no_clip {
            None
        } else {
            args.clip.or(defaults.clip_percent)
        },
        presence_years: args.presence_years.unwrap_or(defaults.presence_years),
    };
    policy.validate().context("Invalid growth options")?;
    debug!("Growth policy {policy:?}");
    let result = growth::category_growth(&table, session.reference, &policy)?;
    match args.input.format {
        OutputFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(&result).context("Serializing growth to JSON")?;
            println!("{rendered}");
            Ok(())
        }
        format => {
            emit(&result.yearly, format)?;
            println!();
            emit(&result.compound, format)
        }
    }
}

fn handle_suppliers(session: &Session, args: &cli::SuppliersArgs) -> Result<()> {
    let format = args.input.format;
    let windows = &session.settings.windows;
    let open_registry = || -> Result<SupplierRegistry> {
        let path = args
            .registry
            .as_deref()
            .ok_or_else(|| anyhow!("--registry is required for the {:?} view", args.view))?;
        load_registry(session, &args.input, path)
    };
    match args.view {
        SuppliersView::Registered => {
            let registry = open_registry()?;
            let total = registry::total_registered_suppliers(&registry, &session.resolver)?;
            emit(&[Metric::new("registered_suppliers", total)], format)
        }
        SuppliersView::Active => {
            let table = load_transactions(session, &args.input)?;
            let years = args.years.unwrap_or(windows.active_supplier_years);
            let mut active = registry::active_suppliers_per_year(&table, session.reference, years)?;
            if args.densify {
                let from = window_start(session.reference, years).year();
                active.series =
                    registry::densify_years(&active.series, from, session.reference.year());
            }
            let summary = active.summary;
            let headline = [
                Metric::new("first_year", report::optional(summary.first_year)),
                Metric::new("last_year", report::optional(summary.last_year)),
                Metric::new("change_abs", summary.change_abs),
                Metric::new("change_percent", report::money(summary.change_percent)),
            ];
            emit_with_headline(&active, &headline, &active.series, format)
        }
        SuppliersView::Registrations => {
            let registry = open_registry()?;
            let mut rows = registry::registrations_per_year(
                &registry,
                &session.resolver,
                session.reference,
                args.years,
            )?;
            if args.densify {
                let from = match args.years {
                    Some(years) => Some(window_start(session.reference, years).year()),
                    None => rows.first().map(|row| row.year),
                };
                if let Some(from) = from {
                    rows = registry::densify_years(&rows, from, session.reference.year());
                }
            }
            emit(&rows, format)
        }
        SuppliersView::Apt => {
            let table = load_transactions(session, &args.input)?;
            let registry = open_registry()?;
            let matcher = TokenOverlap {
                min_token_len: session.settings.matching.min_token_len,
            };
            let locations = if args.locations.is_empty() {
                session.settings.regions.clone()
            } else {
                args.locations.clone()
            };
            let rows = registry::apt_suppliers_by_location(
                &table,
                &registry,
                &session.resolver,
                &matcher,
                &locations,
            )?;
            emit(&rows, format)
        }
    }
}

fn handle_columns(session: &Session, args: &cli::ColumnsArgs) -> Result<()> {
    let table = load_transactions(session, &args.input)?;
    emit(&table.resolved_columns(), args.input.format)
}

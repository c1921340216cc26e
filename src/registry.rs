//! Supplier registry analytics: counts over the supplier registration table
//! and supplier activity derived from transactions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    columns::{ColumnResolver, find_column},
    data::{is_placeholder, normalize_text},
    error::{IndicatorError, Result},
    frame::Frame,
    indicators::{percent_of, window_start},
    io_utils::TableSource,
    loader::{Field, MaterialType, Transactions},
    matching::{BasicCategories, CategoryMatcher},
    report::{self, TabularRow},
};

pub const REGISTRATION_DATE_FIELD: &str = "DATA_CADASTRO";
pub const MUNICIPALITY_FIELD: &str = "MUNICIPIO";
pub const SUPPLY_CATEGORY_FIELD: &str = "CATEGORIA_FORNECIMENTO";
const TAX_ID_COLUMNS: &[&str] = &["FORN_CNPJ", "CNPJ"];

/// The supplier registration table, read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRegistry {
    frame: Frame,
    placeholders: Vec<String>,
}

impl SupplierRegistry {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            placeholders: Vec::new(),
        }
    }

    /// Identifier values treated as missing in addition to blank cells.
    pub fn with_placeholders(mut self, placeholders: &[String]) -> Self {
        self.placeholders = placeholders.to_vec();
        self
    }

    pub fn load(source: &dyn TableSource) -> anyhow::Result<Self> {
        let frame = source
            .read_frame()
            .with_context(|| format!("Loading supplier registry from {}", source.describe()))?;
        info!("Loaded {} supplier registry row(s)", frame.len());
        Ok(Self::new(frame))
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Supplier identifier column; tax-id columns are the fallback when no
    /// identifier alias resolves.
    fn id_column(&self, resolver: &ColumnResolver) -> Result<usize> {
        let headers = self.frame.headers();
        match resolver.resolve(headers, &[Field::SupplierCode.canonical()]) {
            Ok(idx) => Ok(idx),
            Err(err) => {
                let fallback = TAX_ID_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>();
                match find_column(headers, &fallback) {
                    Some(idx) => {
                        debug!("Registry identifier falls back to '{}'", headers[idx]);
                        Ok(idx)
                    }
                    None => Err(err.into_supplier_error()),
                }
            }
        }
    }

    fn supplier_id(&self, row: usize, column: usize) -> Option<String> {
        self.frame
            .text(row, column)
            .filter(|id| !is_placeholder(id, &self.placeholders))
    }
}

/// Distinct non-placeholder supplier identifiers in the registry.
pub fn total_registered_suppliers(
    registry: &SupplierRegistry,
    resolver: &ColumnResolver,
) -> Result<usize> {
    let column = registry.id_column(resolver)?;
    let ids = (0..registry.len())
        .filter_map(|row| registry.supplier_id(row, column))
        .collect::<HashSet<_>>();
    Ok(ids.len())
}

/// A per-year count that can be padded out to a full calendar range.
pub trait YearlyCount {
    fn year(&self) -> i32;
    fn count(&self) -> usize;
    fn with_count(year: i32, count: usize) -> Self;
}

/// One row per year in `from..=to`, taking counts from `series` and zero
/// elsewhere. Years of `series` outside the range are dropped.
pub fn densify_years<T: YearlyCount>(series: &[T], from: i32, to: i32) -> Vec<T> {
    let counts = series
        .iter()
        .map(|row| (row.year(), row.count()))
        .collect::<HashMap<_, _>>();
    (from..=to)
        .map(|year| T::with_count(year, counts.get(&year).copied().unwrap_or(0)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSuppliersYear {
    #[serde(rename = "ANO")]
    pub year: i32,
    #[serde(rename = "FORNECEDORES_ATIVOS")]
    pub active_suppliers: usize,
}

impl YearlyCount for ActiveSuppliersYear {
    fn year(&self) -> i32 {
        self.year
    }

    fn count(&self) -> usize {
        self.active_suppliers
    }

    fn with_count(year: i32, count: usize) -> Self {
        Self {
            year,
            active_suppliers: count,
        }
    }
}

impl TabularRow for ActiveSuppliersYear {
    fn headers() -> Vec<String> {
        report::headers(&["ANO", "FORNECEDORES_ATIVOS"])
    }

    fn cells(&self) -> Vec<String> {
        vec![self.year.to_string(), self.active_suppliers.to_string()]
    }
}

/// First year against last year of a yearly series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub first_count: usize,
    pub last_count: usize,
    pub change_abs: i64,
    /// Zero when the first year has no suppliers.
    pub change_percent: Decimal,
}

impl SeriesSummary {
    pub fn of<T: YearlyCount>(series: &[T]) -> Self {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Self::default();
        };
        let first_count = first.count();
        let last_count = last.count();
        let change_abs = last_count as i64 - first_count as i64;
        Self {
            first_year: Some(first.year()),
            last_year: Some(last.year()),
            first_count,
            last_count,
            change_abs,
            change_percent: percent_of(Decimal::from(change_abs), Decimal::from(first_count)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSupplierSeries {
    pub series: Vec<ActiveSuppliersYear>,
    pub summary: SeriesSummary,
}

/// Distinct suppliers with at least one transaction per calendar year,
/// ascending by year. Years without activity are omitted; see
/// [`densify_years`].
pub fn active_suppliers_per_year(
    table: &Transactions,
    reference: NaiveDate,
    years: u32,
) -> Result<ActiveSupplierSeries> {
    table
        .require(Field::SupplierCode)
        .map_err(IndicatorError::into_supplier_error)?;
    let start = window_start(reference, years);
    let mut per_year: BTreeMap<i32, HashSet<String>> = BTreeMap::new();
    for row in table.rows_within(start, reference) {
        let (Some(date), Some(code)) = (table.order_date(row), table.text(row, Field::SupplierCode))
        else {
            continue;
        };
        per_year.entry(date.year()).or_default().insert(code);
    }
    let series = per_year
        .into_iter()
        .map(|(year, suppliers)| ActiveSuppliersYear {
            year,
            active_suppliers: suppliers.len(),
        })
        .collect::<Vec<_>>();
    let summary = SeriesSummary::of(&series);
    Ok(ActiveSupplierSeries { series, summary })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrationsYear {
    #[serde(rename = "ANO")]
    pub year: i32,
    #[serde(rename = "FORNECEDORES_CADASTRADOS")]
    pub registered: usize,
}

impl YearlyCount for RegistrationsYear {
    fn year(&self) -> i32 {
        self.year
    }

    fn count(&self) -> usize {
        self.registered
    }

    fn with_count(year: i32, count: usize) -> Self {
        Self {
            year,
            registered: count,
        }
    }
}

impl TabularRow for RegistrationsYear {
    fn headers() -> Vec<String> {
        report::headers(&["ANO", "FORNECEDORES_CADASTRADOS"])
    }

    fn cells(&self) -> Vec<String> {
        vec![self.year.to_string(), self.registered.to_string()]
    }
}

/// Suppliers counted in the year of their earliest registration date.
///
/// With `years`, only first registrations inside the trailing window ending
/// at `reference` are counted. Rows with an unparseable date or a placeholder identifier
/// are ignored.
pub fn registrations_per_year(
    registry: &SupplierRegistry,
    resolver: &ColumnResolver,
    reference: NaiveDate,
    years: Option<u32>,
) -> Result<Vec<RegistrationsYear>> {
    let id_column = registry.id_column(resolver)?;
    let date_column = resolver.resolve(registry.frame().headers(), &[REGISTRATION_DATE_FIELD])?;
    let mut earliest: HashMap<String, NaiveDate> = HashMap::new();
    for row in 0..registry.len() {
        let (Some(id), Some(date)) = (
            registry.supplier_id(row, id_column),
            registry.frame().date(row, date_column),
        ) else {
            continue;
        };
        earliest
            .entry(id)
            .and_modify(|current| *current = (*current).min(date))
            .or_insert(date);
    }
    let start = years.map(|years| window_start(reference, years));
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for date in earliest.into_values() {
        if start.is_some_and(|start| date < start || date > reference) {
            continue;
        }
        *per_year.entry(date.year()).or_default() += 1;
    }
    Ok(per_year
        .into_iter()
        .map(|(year, registered)| RegistrationsYear { year, registered })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationAptCount {
    #[serde(rename = "LOCAL")]
    pub location: String,
    #[serde(rename = "FORNECEDORES_APTOS")]
    pub apt_suppliers: usize,
}

impl TabularRow for LocationAptCount {
    fn headers() -> Vec<String> {
        report::headers(&["LOCAL", "FORNECEDORES_APTOS"])
    }

    fn cells(&self) -> Vec<String> {
        vec![self.location.clone(), self.apt_suppliers.to_string()]
    }
}

/// Categories observed on basic-material transaction lines.
pub fn basic_categories(
    table: &Transactions,
    matcher: &dyn CategoryMatcher,
) -> Result<BasicCategories> {
    table.require(Field::Category)?;
    let texts = (0..table.len())
        .filter(|&row| table.material_type(row) == Some(MaterialType::Basic))
        .filter_map(|row| table.text(row, Field::Category));
    Ok(BasicCategories::collect(matcher, texts))
}

struct AptSupplier {
    id: String,
    region: Option<String>,
    municipality: Option<String>,
}

/// Distinct registered suppliers able to supply basic materials, per
/// location.
///
/// A location matches a registry row by region code (exact, case-insensitive)
/// or by normalized municipality name. An empty `locations` list reports every
/// region present in the registry, alphabetically.
pub fn apt_suppliers_by_location(
    table: &Transactions,
    registry: &SupplierRegistry,
    resolver: &ColumnResolver,
    matcher: &dyn CategoryMatcher,
    locations: &[String],
) -> Result<Vec<LocationAptCount>> {
    let basic = basic_categories(table, matcher)?;
    let headers = registry.frame().headers();
    let id_column = registry.id_column(resolver)?;
    let category_column = resolver.resolve(headers, &[SUPPLY_CATEGORY_FIELD])?;
    let region_column = resolver.find(headers, &[Field::SupplierRegion.canonical()]);
    let municipality_column = resolver.find(headers, &[MUNICIPALITY_FIELD]);
    if region_column.is_none() && municipality_column.is_none() {
        return Err(IndicatorError::column_not_found(
            resolver.candidates(&[Field::SupplierRegion.canonical(), MUNICIPALITY_FIELD]),
            headers,
        ));
    }

    let frame = registry.frame();
    let apt = (0..registry.len())
        .filter_map(|row| {
            let id = registry.supplier_id(row, id_column)?;
            let category = frame.text(row, category_column)?;
            matcher.is_apt(&category, &basic).then(|| AptSupplier {
                id,
                region: region_column.and_then(|col| frame.text(row, col)),
                municipality: municipality_column
                    .and_then(|col| frame.text(row, col))
                    .map(|m| normalize_text(&m)),
            })
        })
        .collect::<Vec<_>>();
    debug!(
        "{} of {} registry row(s) are apt against {} basic token(s)",
        apt.len(),
        registry.len(),
        basic.len()
    );

    let locations = if locations.is_empty() {
        apt.iter()
            .filter_map(|supplier| supplier.region.as_ref().map(|r| r.to_uppercase()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        locations.to_vec()
    };
    Ok(locations
        .into_iter()
        .map(|location| {
            let wanted = normalize_text(&location);
            let suppliers = apt
                .iter()
                .filter(|supplier| {
                    supplier
                        .region
                        .as_ref()
                        .is_some_and(|r| r.trim().eq_ignore_ascii_case(location.trim()))
                        || supplier.municipality.as_ref() == Some(&wanted)
                })
                .map(|supplier| supplier.id.as_str())
                .collect::<HashSet<_>>();
            LocationAptCount {
                apt_suppliers: suppliers.len(),
                location,
            }
        })
        .collect())
}

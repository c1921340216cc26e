use std::collections::HashSet;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    columns::ColumnResolver,
    data::normalize_text,
    error::Result,
    indicators::{Extreme, FirstSeen, keep_first, round_money, window_start},
    loader::{Field, Transactions},
    report::{self, TabularRow},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionTopSupplier {
    #[serde(rename = "UF")]
    pub region: String,
    #[serde(rename = "FORNECEDOR_CDG")]
    pub supplier_code: String,
    #[serde(rename = "FORNECEDOR_DESC")]
    pub supplier_name: Option<String>,
    #[serde(rename = "VALOR")]
    pub value: Decimal,
}

impl TabularRow for RegionTopSupplier {
    fn headers() -> Vec<String> {
        report::headers(&["UF", "FORNECEDOR_CDG", "FORNECEDOR_DESC", "VALOR"])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.region.clone(),
            self.supplier_code.clone(),
            self.supplier_name.clone().unwrap_or_default(),
            report::money(self.value),
        ]
    }
}

struct SupplierTotal {
    name: Option<String>,
    value: Decimal,
}

/// Highest-spend supplier per region among orders dated inside the trailing
/// `years` window ending at `reference`.
///
/// With an empty `regions` list every region present is reported, in
/// alphabetical order; otherwise the requested order is kept and regions
/// without transactions are omitted. Equal totals go to the supplier whose
/// first row came first.
pub fn top_supplier_by_region(
    table: &Transactions,
    reference: NaiveDate,
    years: u32,
    regions: &[String],
) -> Result<Vec<RegionTopSupplier>> {
    table.require(Field::SupplierRegion)?;
    table.require(Field::SupplierCode)?;
    let wanted = regions.iter().map(|r| normalize_text(r)).collect::<Vec<_>>();
    let start = window_start(reference, years);

    let mut groups: FirstSeen<(String, String), SupplierTotal> = FirstSeen::new();
    for row in table.rows_within(start, reference) {
        let Some(region) = table.text(row, Field::SupplierRegion).map(|r| normalize_text(&r))
        else {
            continue;
        };
        if !wanted.is_empty() && !wanted.contains(&region) {
            continue;
        }
        let Some(code) = table.text(row, Field::SupplierCode) else {
            continue;
        };
        let entry = groups.entry_or_insert_with((code, region), || SupplierTotal {
            name: None,
            value: Decimal::ZERO,
        });
        keep_first(&mut entry.name, table.text(row, Field::SupplierDescription));
        entry.value += table.line_value(row).unwrap_or_default();
    }

    let mut best: FirstSeen<String, Option<(String, SupplierTotal)>> = FirstSeen::new();
    for ((code, region), total) in groups.into_groups() {
        let slot = best.entry_or_insert_with(region, || None);
        let replace = slot
            .as_ref()
            .is_none_or(|(_, current)| Extreme::Largest.beats(total.value, current.value));
        if replace {
            *slot = Some((code, total));
        }
    }

    let mut rows = best
        .into_groups()
        .into_iter()
        .filter_map(|(region, slot)| {
            slot.map(|(code, total)| RegionTopSupplier {
                region,
                supplier_code: code,
                supplier_name: total.name,
                value: round_money(total.value),
            })
        })
        .collect::<Vec<_>>();
    if wanted.is_empty() {
        rows.sort_by(|a, b| a.region.cmp(&b.region));
    } else {
        rows.sort_by_key(|row| wanted.iter().position(|r| *r == row.region));
    }
    debug!("Top suppliers computed for {} region(s)", rows.len());
    Ok(rows)
}

/// Distinct suppliers with at least one positive-value line in the window.
///
/// The supplier column is resolved through `resolver` against the table's
/// own headers; failure is reported as [`NoSupplierColumn`].
///
/// [`NoSupplierColumn`]: crate::error::IndicatorError::NoSupplierColumn
pub fn distinct_active_suppliers(
    table: &Transactions,
    resolver: &ColumnResolver,
    reference: NaiveDate,
    years: u32,
) -> Result<usize> {
    let frame = table.frame();
    let column = resolver
        .resolve(frame.headers(), &[Field::SupplierCode.canonical()])
        .map_err(|err| err.into_supplier_error())?;
    let start = window_start(reference, years);
    let suppliers = table
        .rows_within(start, reference)
        .filter(|&row| table.line_value(row).is_some_and(|v| v > Decimal::ZERO))
        .filter_map(|row| frame.text(row, column))
        .collect::<HashSet<_>>();
    Ok(suppliers.len())
}

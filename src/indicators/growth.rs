use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;

use crate::{
    config::GrowthPolicy,
    error::Result,
    indicators::{clip_percent, round_money},
    loader::{Field, Transactions},
    report::{self, TabularRow},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryYear {
    #[serde(rename = "CATEGORIA")]
    pub category: String,
    #[serde(rename = "ANO")]
    pub year: i32,
    #[serde(rename = "VALOR_TOTAL")]
    pub total_value: Decimal,
    /// Change against the previous calendar year; absent when that year has
    /// no positive total.
    #[serde(rename = "VAR_PCT")]
    pub yoy_percent: Option<Decimal>,
}

impl TabularRow for CategoryYear {
    fn headers() -> Vec<String> {
        report::headers(&["CATEGORIA", "ANO", "VALOR_TOTAL", "VAR_PCT"])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.category.clone(),
            self.year.to_string(),
            report::money(self.total_value),
            report::optional_money(self.yoy_percent),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCompoundGrowth {
    #[serde(rename = "CATEGORIA")]
    pub category: String,
    #[serde(rename = "ANO_INICIAL")]
    pub first_year: i32,
    #[serde(rename = "ANO_FINAL")]
    pub last_year: i32,
    #[serde(rename = "VALOR_INICIAL")]
    pub first_value: Decimal,
    #[serde(rename = "VALOR_FINAL")]
    pub last_value: Decimal,
    #[serde(rename = "CAGR_PCT")]
    pub cagr_percent: Decimal,
}

impl TabularRow for CategoryCompoundGrowth {
    fn headers() -> Vec<String> {
        report::headers(&[
            "CATEGORIA",
            "ANO_INICIAL",
            "ANO_FINAL",
            "VALOR_INICIAL",
            "VALOR_FINAL",
            "CAGR_PCT",
        ])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.category.clone(),
            self.first_year.to_string(),
            self.last_year.to_string(),
            report::money(self.first_value),
            report::money(self.last_value),
            report::money(self.cagr_percent),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGrowth {
    pub yearly: Vec<CategoryYear>,
    pub compound: Vec<CategoryCompoundGrowth>,
}

/// Year-over-year and compound growth of purchase value per category.
///
/// The compound window is the `policy.presence_years` calendar years ending
/// at the latest year with data that is not after `reference`. Only
/// categories with a positive total in every year of that window get a
/// compound figure. Both kinds of percentage are clipped to
/// `policy.clip_percent`.
pub fn category_growth(
    table: &Transactions,
    reference: NaiveDate,
    policy: &GrowthPolicy,
) -> Result<CategoryGrowth> {
    table.require(Field::Category)?;
    let mut totals: BTreeMap<String, BTreeMap<i32, Decimal>> = BTreeMap::new();
    for row in 0..table.len() {
        let Some(date) = table.order_date(row) else {
            continue;
        };
        if date > reference {
            continue;
        }
        let (Some(category), Some(value)) = (table.text(row, Field::Category), table.line_value(row))
        else {
            continue;
        };
        *totals
            .entry(category)
            .or_default()
            .entry(date.year())
            .or_default() += value;
    }

    let yearly = totals
        .iter()
        .flat_map(|(category, years)| {
            years.iter().map(move |(year, value)| CategoryYear {
                category: category.clone(),
                year: *year,
                total_value: round_money(*value),
                yoy_percent: years
                    .get(&(year - 1))
                    .filter(|previous| **previous > Decimal::ZERO)
                    .and_then(|previous| (*value - *previous).checked_div(*previous))
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .map(|percent| round_money(clip_percent(percent, policy.clip_percent))),
            })
        })
        .collect::<Vec<_>>();

    let compound = match presence_window(&totals, policy.presence_years) {
        Some((first_year, last_year)) => {
            compound_growth(&totals, first_year, last_year, policy.clip_percent)
        }
        None => Vec::new(),
    };
    debug!(
        "Category growth: {} yearly row(s), {} compound row(s)",
        yearly.len(),
        compound.len()
    );
    Ok(CategoryGrowth { yearly, compound })
}

/// The `presence_years` calendar years ending at the latest year with data.
/// `None` when fewer than two years are asked for or the window reaches past
/// the earliest year on record.
fn presence_window(
    totals: &BTreeMap<String, BTreeMap<i32, Decimal>>,
    presence_years: u32,
) -> Option<(i32, i32)> {
    if presence_years < 2 {
        return None;
    }
    let years = totals.values().flat_map(|years| years.keys());
    let earliest = *years.clone().min()?;
    let last_year = *years.max()?;
    let span = i32::try_from(presence_years - 1).ok()?;
    let first_year = last_year.checked_sub(span)?;
    (first_year >= earliest).then_some((first_year, last_year))
}

fn compound_growth(
    totals: &BTreeMap<String, BTreeMap<i32, Decimal>>,
    first_year: i32,
    last_year: i32,
    clip: Option<f64>,
) -> Vec<CategoryCompoundGrowth> {
    let span = f64::from(last_year - first_year);
    let mut rows = totals
        .iter()
        .filter(|(_, years)| {
            (first_year..=last_year)
                .all(|year| years.get(&year).is_some_and(|v| *v > Decimal::ZERO))
        })
        .filter_map(|(category, years)| {
            let first_value = *years.get(&first_year)?;
            let last_value = *years.get(&last_year)?;
            let ratio = last_value.checked_div(first_value)?.to_f64()?;
            let rate = Decimal::from_f64((ratio.powf(1.0 / span) - 1.0) * 100.0)?;
            Some(CategoryCompoundGrowth {
                category: category.clone(),
                first_year,
                last_year,
                first_value: round_money(first_value),
                last_value: round_money(last_value),
                cagr_percent: round_money(clip_percent(rate, clip)),
            })
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.cagr_percent.cmp(&a.cagr_percent));
    rows
}

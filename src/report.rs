//! Rendering of indicator rows as text tables, JSON or CSV.
//!
//! Every indicator row type implements [`TabularRow`]; its headers match the
//! serialized field names so the three formats agree on column names.

use std::fmt::Display;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{cli::OutputFormat, io_utils, table};

pub trait TabularRow: Serialize {
    fn headers() -> Vec<String>;
    fn cells(&self) -> Vec<String>;
}

pub fn render<T: TabularRow>(rows: &[T], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::render_table(&T::headers(), &to_cells(rows))),
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).context("Serializing indicator rows to JSON")
        }
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            io_utils::write_csv_rows(&mut buffer, &T::headers(), &to_cells(rows))?;
            String::from_utf8(buffer).context("CSV output was not valid UTF-8")
        }
    }
}

fn to_cells<T: TabularRow>(rows: &[T]) -> Vec<Vec<String>> {
    rows.iter().map(TabularRow::cells).collect()
}

pub(crate) fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

pub fn optional<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn optional_money(value: Option<Decimal>) -> String {
    value.map(money).unwrap_or_default()
}

pub fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// A named headline figure, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    #[serde(rename = "INDICADOR")]
    pub name: String,
    #[serde(rename = "VALOR")]
    pub value: String,
}

impl Metric {
    pub fn new(name: &str, value: impl Display) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl TabularRow for Metric {
    fn headers() -> Vec<String> {
        headers(&["INDICADOR", "VALOR"])
    }

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), self.value.clone()]
    }
}

//! In-memory table of optional typed cells.
//!
//! A [`Frame`] is what the I/O layer hands to the loader and what every
//! indicator reads from. Cells are `None` when the source value was blank or
//! failed to parse. Frames are values: operations that change the shape of a
//! table consume `self` and return a new frame.

use anyhow::{Result, ensure};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::data::{Value, header_key};

pub type Cell = Option<Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == headers.len(),
                "Row {} has {} cell(s) but the table has {} column(s)",
                idx + 1,
                row.len(),
                headers.len()
            );
        }
        Ok(Self { headers, rows })
    }

    /// Builds a frame of text cells; blank strings become missing cells and
    /// short rows are padded with missing cells.
    pub fn from_text_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|raw| {
                let mut cells = raw
                    .into_iter()
                    .take(width)
                    .map(|value| {
                        let trimmed = value.trim();
                        (!trimmed.is_empty()).then(|| Value::Text(trimmed.to_string()))
                    })
                    .collect::<Vec<_>>();
                cells.resize(width, None);
                cells
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact, case-insensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = header_key(name);
        self.headers.iter().position(|h| header_key(h) == key)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// Display text of a cell, trimmed; `None` when missing or blank.
    pub fn text(&self, row: usize, column: usize) -> Option<String> {
        let rendered = self.value(row, column)?.as_display();
        let trimmed = rendered.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn number(&self, row: usize, column: usize) -> Option<Decimal> {
        self.value(row, column)?.to_number()
    }

    pub fn date(&self, row: usize, column: usize) -> Option<NaiveDate> {
        self.value(row, column)?.to_date()
    }

    pub fn column(&self, column: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).and_then(|cell| cell.as_ref()))
    }

    pub fn map_column<F>(mut self, column: usize, mut f: F) -> Self
    where
        F: FnMut(Cell) -> Cell,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = f(cell.take());
            }
        }
        self
    }

    /// Inserts a column at `position` (clamped to the table width). Missing
    /// trailing values are filled with missing cells; extra values are dropped.
    pub fn insert_column(mut self, position: usize, name: &str, mut values: Vec<Cell>) -> Self {
        let position = position.min(self.headers.len());
        values.resize(self.rows.len(), None);
        self.headers.insert(position, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(position, value);
        }
        self
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub fn retain_rows<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self
    }
}

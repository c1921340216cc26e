//! Base loader: turns the raw ERP extract and the basic-material reference
//! list into a normalized [`Transactions`] table.
//!
//! Normalization happens once, here:
//!
//! 1. order and requisition dates are parsed leniently (bad values → missing);
//! 2. unit price, quantity and line total are coerced to decimals;
//! 3. supplier codes are zero-padded to the widest observed code;
//! 4. the reference code set is de-duplicated with missing codes dropped;
//! 5. `TIPO_MATERIAL` is inserted right after the material code column,
//!    unless the table already carries one.
//!
//! Everything downstream borrows the resulting table read-only.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    columns::{ColumnResolver, find_contained, find_exact},
    data::{Value, normalize_text},
    error::{self, IndicatorError},
    frame::{Cell, Frame},
    io_utils::TableSource,
    report::{self, TabularRow},
};

pub const MATERIAL_TYPE_COLUMN: &str = "TIPO_MATERIAL";
pub const REFERENCE_CODE_FIELD: &str = "CODIGO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialType {
    #[serde(rename = "BASIC")]
    Basic,
    #[serde(rename = "SPECIFIC")]
    Specific,
}

impl MaterialType {
    pub fn label(self) -> &'static str {
        match self {
            MaterialType::Basic => "BASIC",
            MaterialType::Specific => "SPECIFIC",
        }
    }

    /// Accepts the English labels and the accented forms older extracts carry.
    pub fn parse(value: &str) -> Option<Self> {
        match normalize_text(value).as_str() {
            "BASIC" | "BASICO" => Some(MaterialType::Basic),
            "SPECIFIC" | "ESPECIFICO" => Some(MaterialType::Specific),
            _ => None,
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical transaction fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    OrderId,
    OrderDate,
    RequisitionDate,
    MaterialCode,
    MaterialDescription,
    Category,
    MaterialType,
    SupplierCode,
    SupplierDescription,
    SupplierRegion,
    Requester,
    UnitPrice,
    Quantity,
    TotalValue,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::OrderId,
        Field::OrderDate,
        Field::RequisitionDate,
        Field::MaterialCode,
        Field::MaterialDescription,
        Field::Category,
        Field::MaterialType,
        Field::SupplierCode,
        Field::SupplierDescription,
        Field::SupplierRegion,
        Field::Requester,
        Field::UnitPrice,
        Field::Quantity,
        Field::TotalValue,
    ];

    pub const fn canonical(self) -> &'static str {
        match self {
            Field::OrderId => "OF_CDG",
            Field::OrderDate => "OF_DATA",
            Field::RequisitionDate => "REQ_DATA",
            Field::MaterialCode => "INSUMO_CDG",
            Field::MaterialDescription => "INSUMO_DESC",
            Field::Category => "INSUMO_CATEGORIA",
            Field::MaterialType => MATERIAL_TYPE_COLUMN,
            Field::SupplierCode => "FORNECEDOR_CDG",
            Field::SupplierDescription => "FORNECEDOR_DESC",
            Field::SupplierRegion => "FORNECEDOR_UF",
            Field::Requester => "EMPRD_DESC",
            Field::UnitPrice => "ITEM_PRCUNTPED",
            Field::Quantity => "ITEM_QTDE",
            Field::TotalValue => "PRCTTL_INSUMO",
        }
    }

    const fn required(self) -> bool {
        matches!(
            self,
            Field::OrderId | Field::OrderDate | Field::MaterialCode
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSlot {
    index: Option<usize>,
    candidates: Vec<String>,
}

/// Column positions of the canonical fields inside the normalized frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFields {
    slots: BTreeMap<Field, FieldSlot>,
}

impl TransactionFields {
    /// Exact matches are settled for every field before any substring
    /// fallback runs, and a fallback never claims a column another field
    /// already matched.
    fn resolve(headers: &[String], resolver: &ColumnResolver) -> error::Result<Self> {
        let candidates = Field::ALL
            .iter()
            .map(|field| match field {
                Field::MaterialType => vec![MATERIAL_TYPE_COLUMN.to_string()],
                other => resolver.candidates(&[other.canonical()]),
            })
            .collect::<Vec<_>>();
        let mut indices = candidates
            .iter()
            .map(|list| find_exact(headers, list))
            .collect::<Vec<_>>();
        for (pos, field) in Field::ALL.iter().enumerate() {
            if indices[pos].is_some() || *field == Field::MaterialType {
                continue;
            }
            let taken = indices.iter().flatten().copied().collect::<Vec<_>>();
            indices[pos] = find_contained(headers, &candidates[pos], &taken);
        }

        let mut slots = BTreeMap::new();
        for ((field, index), candidates) in Field::ALL.into_iter().zip(indices).zip(candidates) {
            if index.is_none() && field.required() {
                return Err(IndicatorError::column_not_found(candidates, headers));
            }
            if let Some(idx) = index {
                debug!("Field {} resolved to column '{}'", field.canonical(), headers[idx]);
            }
            slots.insert(field, FieldSlot { index, candidates });
        }
        Ok(Self { slots })
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.slots.get(&field).and_then(|slot| slot.index)
    }

    fn candidates(&self, field: Field) -> Vec<String> {
        self.slots
            .get(&field)
            .map(|slot| slot.candidates.clone())
            .unwrap_or_else(|| vec![field.canonical().to_string()])
    }

    /// Shifts every index at or after `position` one column to the right.
    fn shift_from(&mut self, position: usize) {
        for slot in self.slots.values_mut() {
            if let Some(idx) = slot.index.as_mut()
                && *idx >= position
            {
                *idx += 1;
            }
        }
    }
}

/// How one canonical field was matched against the loaded headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    #[serde(rename = "CAMPO")]
    pub field: &'static str,
    #[serde(rename = "COLUNA")]
    pub column: Option<String>,
    #[serde(rename = "OBRIGATORIO")]
    pub required: bool,
}

impl TabularRow for ResolvedColumn {
    fn headers() -> Vec<String> {
        report::headers(&["CAMPO", "COLUNA", "OBRIGATORIO"])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.field.to_string(),
            self.column.clone().unwrap_or_else(|| "(missing)".to_string()),
            if self.required { "yes" } else { "no" }.to_string(),
        ]
    }
}

/// De-duplicated set of basic material codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCodes {
    codes: HashSet<String>,
}

impl ReferenceCodes {
    pub fn from_frame(frame: &Frame, resolver: &ColumnResolver) -> error::Result<Self> {
        let column = resolver.resolve(frame.headers(), &[REFERENCE_CODE_FIELD])?;
        Ok(frame
            .column(column)
            .flatten()
            .map(|value| value.as_display())
            .collect())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ReferenceCodes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let codes = iter
            .into_iter()
            .map(|code| code.as_ref().trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();
        Self { codes }
    }
}

/// The normalized transaction table.
#[derive(Debug, Clone, PartialEq)]
pub struct Transactions {
    frame: Frame,
    fields: TransactionFields,
}

impl Transactions {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn fields(&self) -> &TransactionFields {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Column index of `field`, or the missing-column condition with the
    /// candidates tried at load time.
    pub fn require(&self, field: Field) -> error::Result<usize> {
        self.fields.index(field).ok_or_else(|| {
            IndicatorError::column_not_found(self.fields.candidates(field), self.frame.headers())
        })
    }

    pub fn text(&self, row: usize, field: Field) -> Option<String> {
        self.frame.text(row, self.fields.index(field)?)
    }

    pub fn order_id(&self, row: usize) -> Option<String> {
        self.text(row, Field::OrderId)
    }

    pub fn order_date(&self, row: usize) -> Option<NaiveDate> {
        let column = self.fields.index(Field::OrderDate)?;
        match self.frame.value(row, column)? {
            Value::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn number(&self, row: usize, field: Field) -> Option<Decimal> {
        let column = self.fields.index(field)?;
        match self.frame.value(row, column)? {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Line total when present, otherwise quantity × unit price.
    pub fn line_value(&self, row: usize) -> Option<Decimal> {
        self.number(row, Field::TotalValue).or_else(|| {
            let quantity = self.number(row, Field::Quantity)?;
            let price = self.number(row, Field::UnitPrice)?;
            quantity.checked_mul(price)
        })
    }

    pub fn material_type(&self, row: usize) -> Option<MaterialType> {
        self.text(row, Field::MaterialType)
            .and_then(|label| MaterialType::parse(&label))
    }

    /// Row indices whose order date falls in `start..=end`; rows without a
    /// parseable date are skipped.
    pub fn rows_within(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&row| {
            self.order_date(row)
                .is_some_and(|d| (start..=end).contains(&d))
        })
    }

    pub fn resolved_columns(&self) -> Vec<ResolvedColumn> {
        Field::ALL
            .iter()
            .map(|field| ResolvedColumn {
                field: field.canonical(),
                column: self
                    .fields
                    .index(*field)
                    .and_then(|idx| self.frame.headers().get(idx).cloned()),
                required: field.required(),
            })
            .collect()
    }

    /// New table restricted to the given regions (empty = all) and order
    /// years (inclusive bounds). The current table is left untouched.
    pub fn filtered(
        &self,
        regions: &[String],
        years: Option<(i32, i32)>,
    ) -> error::Result<Transactions> {
        let region_column = if regions.is_empty() {
            None
        } else {
            Some(self.require(Field::SupplierRegion)?)
        };
        let date_column = self.require(Field::OrderDate)?;
        let wanted = regions
            .iter()
            .map(|r| normalize_text(r))
            .collect::<HashSet<_>>();
        let frame = self.frame.clone().retain_rows(|row| {
            let region_ok = region_column.is_none_or(|col| {
                row[col]
                    .as_ref()
                    .is_some_and(|v| wanted.contains(&normalize_text(&v.as_display())))
            });
            let year_ok = years.is_none_or(|(from, to)| match &row[date_column] {
                Some(Value::Date(d)) => (from..=to).contains(&d.year()),
                _ => false,
            });
            region_ok && year_ok
        });
        Ok(Transactions {
            frame,
            fields: self.fields.clone(),
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub reference_codes: usize,
    pub unparseable_dates: usize,
    pub unparseable_numbers: usize,
    pub basic_rows: usize,
}

/// Normalizes an already-read transaction frame against the reference list.
pub fn normalize(
    raw: Frame,
    reference: &Frame,
    resolver: &ColumnResolver,
) -> error::Result<(Transactions, LoadReport)> {
    let mut fields = TransactionFields::resolve(raw.headers(), resolver)?;
    let codes = ReferenceCodes::from_frame(reference, resolver)?;
    let mut report = LoadReport {
        rows: raw.len(),
        reference_codes: codes.len(),
        ..LoadReport::default()
    };

    let mut frame = raw;
    for field in [Field::OrderDate, Field::RequisitionDate] {
        if let Some(column) = fields.index(field) {
            frame = frame.map_column(column, |cell| {
                coerce(cell, &mut report.unparseable_dates, |v| {
                    v.to_date().map(Value::Date)
                })
            });
        }
    }
    for field in [Field::UnitPrice, Field::Quantity, Field::TotalValue] {
        if let Some(column) = fields.index(field) {
            frame = frame.map_column(column, |cell| {
                coerce(cell, &mut report.unparseable_numbers, |v| {
                    v.to_number().map(Value::Number)
                })
            });
        }
    }
    if let Some(column) = fields.index(Field::SupplierCode) {
        frame = zero_pad_column(frame, column);
    }

    let frame = classify(frame, &mut fields, &codes)?;
    let transactions = Transactions { frame, fields };
    report.basic_rows = (0..transactions.len())
        .filter(|&row| transactions.material_type(row) == Some(MaterialType::Basic))
        .count();
    Ok((transactions, report))
}

/// Reads both sources and normalizes them.
pub fn load_bases(
    transactions: &dyn TableSource,
    reference: &dyn TableSource,
    resolver: &ColumnResolver,
) -> Result<Transactions> {
    let raw = transactions
        .read_frame()
        .with_context(|| format!("Loading transactions from {}", transactions.describe()))?;
    let reference_frame = reference
        .read_frame()
        .with_context(|| format!("Loading reference codes from {}", reference.describe()))?;
    let (table, report) = normalize(raw, &reference_frame, resolver)
        .with_context(|| format!("Normalizing transactions from {}", transactions.describe()))?;
    if report.unparseable_dates > 0 || report.unparseable_numbers > 0 {
        warn!(
            "{} date(s) and {} number(s) could not be parsed and were treated as missing",
            report.unparseable_dates, report.unparseable_numbers
        );
    }
    info!(
        "Loaded {} transaction row(s); {} basic against {} reference code(s)",
        report.rows, report.basic_rows, report.reference_codes
    );
    Ok(table)
}

fn coerce<F>(cell: Cell, failures: &mut usize, parse: F) -> Cell
where
    F: FnOnce(&Value) -> Option<Value>,
{
    let value = cell?;
    let parsed = parse(&value);
    if parsed.is_none() {
        *failures += 1;
    }
    parsed
}

/// Left-pads all-digit codes with zeros to the widest all-digit code.
/// Placeholders such as `-` and alphanumeric codes are kept as they are.
fn zero_pad_column(frame: Frame, column: usize) -> Frame {
    let width = frame
        .column(column)
        .flatten()
        .map(|v| v.as_display())
        .filter(|text| is_numeric_code(text.as_str()))
        .map(|text| text.len())
        .max()
        .unwrap_or(0);
    frame.map_column(column, |cell| {
        cell.map(|value| {
            let text = value.as_display();
            if !is_numeric_code(&text) {
                return value;
            }
            let pad = width.saturating_sub(text.len());
            Value::Text(format!("{}{text}", "0".repeat(pad)))
        })
    })
}

fn is_numeric_code(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// Inserts `TIPO_MATERIAL` after the material code column. A table that
/// already has the column is returned unchanged.
fn classify(
    frame: Frame,
    fields: &mut TransactionFields,
    codes: &ReferenceCodes,
) -> error::Result<Frame> {
    if fields.index(Field::MaterialType).is_some() {
        debug!("{MATERIAL_TYPE_COLUMN} already present; keeping existing classification");
        return Ok(frame);
    }
    let code_column = fields
        .index(Field::MaterialCode)
        .ok_or_else(|| {
            IndicatorError::column_not_found(fields.candidates(Field::MaterialCode), frame.headers())
        })?;
    let values = frame
        .column(code_column)
        .map(|cell| {
            let basic = cell.is_some_and(|v| codes.contains(&v.as_display()));
            let kind = if basic {
                MaterialType::Basic
            } else {
                MaterialType::Specific
            };
            Some(Value::Text(kind.label().to_string()))
        })
        .collect::<Vec<_>>();
    let position = code_column + 1;
    let frame = frame.insert_column(position, MATERIAL_TYPE_COLUMN, values);
    fields.shift_from(position);
    if let Some(slot) = fields.slots.get_mut(&Field::MaterialType) {
        slot.index = Some(position);
    }
    Ok(frame)
}

/// Re-runs classification on an already-normalized table.
pub fn reclassify(table: Transactions, codes: &ReferenceCodes) -> error::Result<Transactions> {
    let Transactions { frame, mut fields } = table;
    let frame = classify(frame, &mut fields, codes)?;
    Ok(Transactions { frame, fields })
}

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    columns::{ColumnResolver, find_distinct},
    error::{IndicatorError, Result},
    frame::Frame,
    indicators::{Extreme, FirstSeen, keep_first, percent_of, round_money, window_start},
    loader::{Field, MaterialType, Transactions},
    report::{self, TabularRow},
};

/// One purchase order (OF) with its line items folded together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    #[serde(rename = "OF_CDG")]
    pub order_id: String,
    #[serde(rename = "VALOR_TOTAL")]
    pub total_value: Decimal,
    #[serde(rename = "EMPRD_DESC")]
    pub requester: Option<String>,
    #[serde(rename = "FORNECEDOR_DESC")]
    pub supplier: Option<String>,
    #[serde(rename = "DATA_OF")]
    pub order_date: Option<NaiveDate>,
    #[serde(rename = "INSUMOS")]
    pub materials: String,
    #[serde(rename = "TOTAL_ITENS")]
    pub item_count: usize,
}

impl TabularRow for OrderSummary {
    fn headers() -> Vec<String> {
        report::headers(&[
            "OF_CDG",
            "VALOR_TOTAL",
            "EMPRD_DESC",
            "FORNECEDOR_DESC",
            "DATA_OF",
            "INSUMOS",
            "TOTAL_ITENS",
        ])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.order_id.clone(),
            report::money(self.total_value),
            report::optional(self.requester.as_ref()),
            report::optional(self.supplier.as_ref()),
            report::date(self.order_date),
            self.materials.clone(),
            self.item_count.to_string(),
        ]
    }
}

#[derive(Default)]
struct OrderAccumulator {
    total: Decimal,
    requester: Option<String>,
    supplier: Option<String>,
    order_date: Option<NaiveDate>,
    descriptions: BTreeSet<String>,
    codes: HashSet<String>,
}

fn collect_orders(table: &Transactions) -> Vec<(String, OrderAccumulator)> {
    let mut orders: FirstSeen<String, OrderAccumulator> = FirstSeen::new();
    for row in 0..table.len() {
        let Some(order_id) = table.order_id(row) else {
            continue;
        };
        let acc = orders.entry_or_insert_with(order_id, OrderAccumulator::default);
        acc.total += table.line_value(row).unwrap_or_default();
        keep_first(&mut acc.requester, table.text(row, Field::Requester));
        keep_first(&mut acc.supplier, table.text(row, Field::SupplierDescription));
        keep_first(&mut acc.order_date, table.order_date(row));
        if let Some(description) = table.text(row, Field::MaterialDescription) {
            acc.descriptions.insert(description);
        }
        if let Some(code) = table.text(row, Field::MaterialCode) {
            acc.codes.insert(code);
        }
    }
    orders.into_groups()
}

fn finish(order_id: String, acc: OrderAccumulator) -> OrderSummary {
    OrderSummary {
        order_id,
        total_value: round_money(acc.total),
        requester: acc.requester,
        supplier: acc.supplier,
        order_date: acc.order_date,
        materials: acc.descriptions.iter().join(", "),
        item_count: acc.codes.len(),
    }
}

/// Folds line items into orders, in order of first appearance. Descriptive
/// fields take the first non-missing value of the order.
pub fn summarize_orders(table: &Transactions) -> Vec<OrderSummary> {
    collect_orders(table)
        .into_iter()
        .map(|(order_id, acc)| finish(order_id, acc))
        .collect()
}

/// Largest or smallest order by summed value; `None` for an empty table.
/// Equal totals resolve to the order that appears first.
pub fn extreme_order(table: &Transactions, extreme: Extreme) -> Option<OrderSummary> {
    collect_orders(table)
        .into_iter()
        .reduce(|best, candidate| {
            if extreme.beats(candidate.1.total, best.1.total) {
                candidate
            } else {
                best
            }
        })
        .map(|(order_id, acc)| finish(order_id, acc))
}

pub fn largest_order(table: &Transactions) -> Option<OrderSummary> {
    extreme_order(table, Extreme::Largest)
}

pub fn smallest_order(table: &Transactions) -> Option<OrderSummary> {
    extreme_order(table, Extreme::Smallest)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTotal {
    #[serde(rename = "OF_CDG")]
    pub order_id: String,
    #[serde(rename = "VALOR_TOTAL_OF")]
    pub total_value: Decimal,
}

impl TabularRow for OrderTotal {
    fn headers() -> Vec<String> {
        report::headers(&["OF_CDG", "VALOR_TOTAL_OF"])
    }

    fn cells(&self) -> Vec<String> {
        vec![self.order_id.clone(), report::money(self.total_value)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderMean {
    pub mean: Decimal,
    pub orders: Vec<OrderTotal>,
}

/// Arithmetic mean of per-order totals; `0` when there are no orders.
pub fn mean_order_value(table: &Transactions) -> OrderMean {
    let mut totals: FirstSeen<String, Decimal> = FirstSeen::new();
    for row in 0..table.len() {
        if let Some(order_id) = table.order_id(row) {
            *totals.entry_or_insert_with(order_id, Decimal::default) +=
                table.line_value(row).unwrap_or_default();
        }
    }
    let totals = totals.into_groups();
    let mean = if totals.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = totals.iter().map(|(_, value)| *value).sum();
        round_money(sum / Decimal::from(totals.len()))
    };
    let orders = totals
        .into_iter()
        .map(|(order_id, value)| OrderTotal {
            order_id,
            total_value: round_money(value),
        })
        .collect();
    OrderMean { mean, orders }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderKind {
    #[serde(rename = "OF_CDG")]
    pub order_id: String,
    #[serde(rename = "TIPO_OF")]
    pub kind: MaterialType,
}

impl TabularRow for OrderKind {
    fn headers() -> Vec<String> {
        report::headers(&["OF_CDG", "TIPO_OF"])
    }

    fn cells(&self) -> Vec<String> {
        vec![self.order_id.clone(), self.kind.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicOrderShare {
    pub percent: Decimal,
    pub breakdown: Vec<OrderKind>,
}

/// Share of orders in the window with at least one basic line item.
pub fn basic_order_share(
    table: &Transactions,
    reference: NaiveDate,
    years: u32,
) -> Result<BasicOrderShare> {
    table.require(Field::MaterialType)?;
    let start = window_start(reference, years);
    let mut kinds: FirstSeen<String, MaterialType> = FirstSeen::new();
    for row in table.rows_within(start, reference) {
        let Some(order_id) = table.order_id(row) else {
            continue;
        };
        let kind = kinds.entry_or_insert_with(order_id, || MaterialType::Specific);
        if table.material_type(row) == Some(MaterialType::Basic) {
            *kind = MaterialType::Basic;
        }
    }
    let breakdown = kinds
        .into_groups()
        .into_iter()
        .map(|(order_id, kind)| OrderKind { order_id, kind })
        .collect::<Vec<_>>();
    let basic = breakdown
        .iter()
        .filter(|order| order.kind == MaterialType::Basic)
        .count();
    Ok(BasicOrderShare {
        percent: percent_of(Decimal::from(basic), Decimal::from(breakdown.len())),
        breakdown,
    })
}

/// A single purchase line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    #[serde(rename = "INSUMO_CDG")]
    pub code: Option<String>,
    #[serde(rename = "INSUMO_DESC")]
    pub description: Option<String>,
    #[serde(rename = "ITEM_QTDE")]
    pub quantity: Option<Decimal>,
    #[serde(rename = "ITEM_PRCUNTPED")]
    pub unit_price: Option<Decimal>,
    #[serde(rename = "TOTAL")]
    pub total: Decimal,
}

impl TabularRow for LineItem {
    fn headers() -> Vec<String> {
        report::headers(&[
            "INSUMO_CDG",
            "INSUMO_DESC",
            "ITEM_QTDE",
            "ITEM_PRCUNTPED",
            "TOTAL",
        ])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            report::optional(self.code.as_ref()),
            report::optional(self.description.as_ref()),
            report::optional(self.quantity.map(|q| q.normalize())),
            report::optional_money(self.unit_price),
            report::money(self.total),
        ]
    }
}

/// Largest or smallest single line item of any table.
///
/// Columns are resolved through `resolver`. The line total is taken from a
/// total column when one resolves and the cell is present, otherwise from
/// quantity × unit price. A table offering neither path fails with
/// [`IndicatorError::NoTotalOrPriceQuantity`].
pub fn extreme_line_item(
    frame: &Frame,
    resolver: &ColumnResolver,
    extreme: Extreme,
) -> Result<Option<LineItem>> {
    let headers = frame.headers();
    let fields = [
        Field::MaterialCode,
        Field::MaterialDescription,
        Field::Quantity,
        Field::UnitPrice,
        Field::TotalValue,
    ]
    .map(|field| resolver.candidates(&[field.canonical()]));
    let [code, description, quantity, unit_price, total] =
        <[Option<usize>; 5]>::try_from(find_distinct(headers, &fields)).unwrap_or([None; 5]);
    if total.is_none() && (quantity.is_none() || unit_price.is_none()) {
        return Err(IndicatorError::NoTotalOrPriceQuantity {
            available: headers.to_vec(),
        });
    }

    let mut best: Option<LineItem> = None;
    for row in 0..frame.len() {
        let qty = quantity.and_then(|col| frame.number(row, col));
        let price = unit_price.and_then(|col| frame.number(row, col));
        let line_total = total
            .and_then(|col| frame.number(row, col))
            .or_else(|| qty?.checked_mul(price?));
        let Some(line_total) = line_total else {
            continue;
        };
        if best
            .as_ref()
            .is_some_and(|current| !extreme.beats(line_total, current.total))
        {
            continue;
        }
        best = Some(LineItem {
            code: code.and_then(|col| frame.text(row, col)),
            description: description.and_then(|col| frame.text(row, col)),
            quantity: qty,
            unit_price: price,
            total: line_total,
        });
    }
    Ok(best.map(|item| LineItem {
        unit_price: item.unit_price.map(round_money),
        total: round_money(item.total),
        ..item
    }))
}

use std::{collections::HashSet, fmt};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::{
    indicators::{percent_of, round_money, window_start},
    loader::Transactions,
    report::{self, TabularRow},
};

/// One of the six fixed two-month calendar buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bimester {
    JanFeb,
    MarApr,
    MayJun,
    JulAug,
    SepOct,
    NovDec,
}

impl Bimester {
    pub const ALL: [Bimester; 6] = [
        Bimester::JanFeb,
        Bimester::MarApr,
        Bimester::MayJun,
        Bimester::JulAug,
        Bimester::SepOct,
        Bimester::NovDec,
    ];

    /// Bucket for a calendar month (1-12); `None` outside that range.
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            1..=12 => Some(Self::ALL[((month - 1) / 2) as usize]),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bimester::JanFeb => "Jan–Feb",
            Bimester::MarApr => "Mar–Apr",
            Bimester::MayJun => "May–Jun",
            Bimester::JulAug => "Jul–Aug",
            Bimester::SepOct => "Sep–Oct",
            Bimester::NovDec => "Nov–Dec",
        }
    }
}

impl fmt::Display for Bimester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Bimester {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeOrder {
    /// Highest value first; equal values keep calendar order.
    #[default]
    ByValue,
    /// Calendar order, for the seasonality view.
    Calendar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BimonthlyVolume {
    #[serde(rename = "BIMESTRE_ROTULO")]
    pub bimester: Bimester,
    #[serde(rename = "VALOR_TOTAL")]
    pub total_value: Decimal,
    #[serde(rename = "QTDE_OFS")]
    pub order_count: usize,
    #[serde(rename = "PARTICIPACAO_PCT")]
    pub share_percent: Decimal,
}

impl TabularRow for BimonthlyVolume {
    fn headers() -> Vec<String> {
        report::headers(&[
            "BIMESTRE_ROTULO",
            "VALOR_TOTAL",
            "QTDE_OFS",
            "PARTICIPACAO_PCT",
        ])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.bimester.to_string(),
            report::money(self.total_value),
            self.order_count.to_string(),
            report::money(self.share_percent),
        ]
    }
}

/// Value and distinct order count per bimester inside the window. Only
/// bimesters with at least one transaction are returned.
pub fn bimonthly_volume(
    table: &Transactions,
    reference: NaiveDate,
    years: u32,
    order: VolumeOrder,
) -> Vec<BimonthlyVolume> {
    let start = window_start(reference, years);
    let mut totals = [Decimal::ZERO; 6];
    let mut orders: [HashSet<String>; 6] = Default::default();
    let mut seen = [false; 6];
    for row in table.rows_within(start, reference) {
        let Some(bin) = table
            .order_date(row)
            .and_then(|date| Bimester::from_month(date.month()))
        else {
            continue;
        };
        let slot = bin as usize;
        seen[slot] = true;
        totals[slot] += table.line_value(row).unwrap_or_default();
        if let Some(order_id) = table.order_id(row) {
            orders[slot].insert(order_id);
        }
    }
    let grand_total: Decimal = totals.iter().copied().sum();
    let mut rows = Bimester::ALL
        .iter()
        .filter(|bin| seen[**bin as usize])
        .map(|bin| {
            let slot = *bin as usize;
            BimonthlyVolume {
                bimester: *bin,
                total_value: round_money(totals[slot]),
                order_count: orders[slot].len(),
                share_percent: percent_of(totals[slot], grand_total),
            }
        })
        .collect::<Vec<_>>();
    if order == VolumeOrder::ByValue {
        rows.sort_by(|a, b| b.total_value.cmp(&a.total_value));
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyVolume {
    #[serde(rename = "ANO_MES")]
    pub period: String,
    #[serde(rename = "VALOR_TOTAL")]
    pub total_value: Decimal,
    #[serde(rename = "PARTICIPACAO_PCT")]
    pub share_percent: Decimal,
}

impl TabularRow for MonthlyVolume {
    fn headers() -> Vec<String> {
        report::headers(&["ANO_MES", "VALOR_TOTAL", "PARTICIPACAO_PCT"])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.period.clone(),
            report::money(self.total_value),
            report::money(self.share_percent),
        ]
    }
}

/// (year, month) buckets inside the window, highest value first. Shares
/// are relative to the whole window even when `top_n` truncates the list.
pub fn monthly_volume(
    table: &Transactions,
    reference: NaiveDate,
    years: u32,
    top_n: Option<usize>,
) -> Vec<MonthlyVolume> {
    let start = window_start(reference, years);
    let mut buckets = std::collections::BTreeMap::<(i32, u32), Decimal>::new();
    for row in table.rows_within(start, reference) {
        if let Some(date) = table.order_date(row) {
            *buckets.entry((date.year(), date.month())).or_default() +=
                table.line_value(row).unwrap_or_default();
        }
    }
    let grand_total: Decimal = buckets.values().copied().sum();
    let ranked = rank(buckets.into_iter().collect(), top_n);
    ranked
        .into_iter()
        .map(|((year, month), value)| MonthlyVolume {
            period: format!("{year:04}-{month:02}"),
            total_value: round_money(value),
            share_percent: percent_of(value, grand_total),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOfYearVolume {
    #[serde(rename = "MES")]
    pub month: u32,
    #[serde(rename = "VALOR_TOTAL")]
    pub total_value: Decimal,
    #[serde(rename = "PARTICIPACAO_PCT")]
    pub share_percent: Decimal,
}

impl TabularRow for MonthOfYearVolume {
    fn headers() -> Vec<String> {
        report::headers(&["MES", "VALOR_TOTAL", "PARTICIPACAO_PCT"])
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            report::money(self.total_value),
            report::money(self.share_percent),
        ]
    }
}

/// Month-of-year buckets across the whole history, highest value first.
pub fn month_of_year_volume(table: &Transactions, top_n: Option<usize>) -> Vec<MonthOfYearVolume> {
    let mut buckets = std::collections::BTreeMap::<u32, Decimal>::new();
    for row in 0..table.len() {
        if let Some(date) = table.order_date(row) {
            *buckets.entry(date.month()).or_default() += table.line_value(row).unwrap_or_default();
        }
    }
    let grand_total: Decimal = buckets.values().copied().sum();
    rank(buckets.into_iter().collect(), top_n)
        .into_iter()
        .map(|(month, value)| MonthOfYearVolume {
            month,
            total_value: round_money(value),
            share_percent: percent_of(value, grand_total),
        })
        .collect()
}

/// Stable descending sort on value, then truncation to `top_n`.
fn rank<K>(mut entries: Vec<(K, Decimal)>, top_n: Option<usize>) -> Vec<(K, Decimal)> {
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(limit) = top_n {
        entries.truncate(limit);
    }
    entries
}

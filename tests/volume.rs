mod common;

use proptest::prelude::*;
use rust_decimal::Decimal;
use supply_indicators::indicators::volume::{self, Bimester, VolumeOrder};

use common::{date, dec, load, sample};

#[test]
fn bimonthly_volume_ranks_by_value() {
    let table = sample();
    let rows = volume::bimonthly_volume(&table, date(2024, 12, 31), 10, VolumeOrder::ByValue);
    let summary = rows
        .iter()
        .map(|r| (r.bimester.label(), r.total_value, r.order_count, r.share_percent))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("Mar–Apr", dec("550.00"), 2, dec("51.89")),
            ("Nov–Dec", dec("300.00"), 1, dec("28.30")),
            ("Jan–Feb", dec("200.00"), 1, dec("18.87")),
            ("May–Jun", dec("10.00"), 1, dec("0.94")),
        ]
    );
}

#[test]
fn bimonthly_volume_in_calendar_order() {
    let table = sample();
    let rows = volume::bimonthly_volume(&table, date(2024, 12, 31), 10, VolumeOrder::Calendar);
    let bins = rows.iter().map(|r| r.bimester).collect::<Vec<_>>();
    assert_eq!(
        bins,
        vec![
            Bimester::JanFeb,
            Bimester::MarApr,
            Bimester::MayJun,
            Bimester::NovDec
        ]
    );
}

#[test]
fn march_and_april_share_a_bin() {
    let table = load(
        "OF_CDG,OF_DATA,INSUMO_CDG,PRCTTL_INSUMO\nA,2024-03-10,1,10\nB,2024-04-10,1,10\nC,2024-02-10,1,10\n",
        "CODIGO\n1\n",
    );
    let rows = volume::bimonthly_volume(&table, date(2024, 12, 31), 1, VolumeOrder::Calendar);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].bimester.label(), "Jan–Feb");
    assert_eq!(rows[0].order_count, 1);
    assert_eq!(rows[1].bimester.label(), "Mar–Apr");
    assert_eq!(rows[1].order_count, 2);
}

#[test]
fn empty_window_yields_no_bins() {
    let table = sample();
    let rows = volume::bimonthly_volume(&table, date(2040, 1, 1), 1, VolumeOrder::ByValue);
    assert!(rows.is_empty());
}

#[test]
fn monthly_volume_top_n_keeps_window_shares() {
    let table = sample();
    let rows = volume::monthly_volume(&table, date(2024, 12, 31), 1, Some(2));
    let summary = rows
        .iter()
        .map(|r| (r.period.as_str(), r.total_value, r.share_percent))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("2024-11", dec("300.00"), dec("58.82")),
            ("2024-01", dec("200.00"), dec("39.22")),
        ]
    );
}

#[test]
fn month_of_year_spans_all_history() {
    let table = sample();
    let rows = volume::month_of_year_volume(&table, None);
    let months = rows.iter().map(|r| r.month).collect::<Vec<_>>();
    assert_eq!(months, vec![4, 11, 1, 3, 6]);
    let top = volume::month_of_year_volume(&table, Some(3));
    assert_eq!(top.len(), 3);
}

fn transactions_csv(values: &[(u32, u32)]) -> String {
    let mut csv = String::from("OF_CDG,OF_DATA,INSUMO_CDG,PRCTTL_INSUMO\n");
    for (idx, (month, value)) in values.iter().enumerate() {
        csv.push_str(&format!("OF{idx},2024-{month:02}-15,1,{value}\n"));
    }
    csv
}

proptest! {
    #[test]
    fn bin_shares_sum_to_one_hundred(
        values in proptest::collection::vec((1u32..=12, 1u32..10_000), 1..40),
    ) {
        let table = load(&transactions_csv(&values), "CODIGO\n1\n");
        let rows = volume::bimonthly_volume(&table, date(2024, 12, 31), 1, VolumeOrder::ByValue);
        let total: Decimal = rows.iter().map(|r| r.share_percent).sum();
        prop_assert!((total - Decimal::ONE_HUNDRED).abs() <= dec("0.05"));
        for row in &rows {
            prop_assert!(row.share_percent >= Decimal::ZERO);
            prop_assert!(row.share_percent <= Decimal::ONE_HUNDRED);
        }
        for pair in rows.windows(2) {
            prop_assert!(pair[0].total_value >= pair[1].total_value);
        }
    }

    #[test]
    fn monthly_top_n_never_exceeds_n(
        values in proptest::collection::vec((1u32..=12, 1u32..10_000), 0..40),
        top in 0usize..8,
    ) {
        let table = load(&transactions_csv(&values), "CODIGO\n1\n");
        let rows = volume::monthly_volume(&table, date(2024, 12, 31), 1, Some(top));
        prop_assert!(rows.len() <= top);
        for pair in rows.windows(2) {
            prop_assert!(pair[0].total_value >= pair[1].total_value);
        }
    }
}

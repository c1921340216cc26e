mod common;

use supply_indicators::{
    columns::ColumnResolver,
    error::IndicatorError,
    indicators::suppliers,
};

use common::{date, dec, load, sample};

#[test]
fn top_supplier_per_region_over_ten_years() {
    let table = sample();
    let rows = suppliers::top_supplier_by_region(&table, date(2024, 12, 31), 10, &[]).unwrap();
    let summary = rows
        .iter()
        .map(|r| (r.region.as_str(), r.supplier_code.as_str(), r.value))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![("RJ", "0017", dec("1000.00")), ("SP", "2041", dec("200.00"))]
    );
    assert_eq!(rows[0].supplier_name.as_deref(), Some("Alfa Materiais"));
}

#[test]
fn recent_window_only_counts_recent_orders() {
    let table = sample();
    let rows = suppliers::top_supplier_by_region(&table, date(2024, 12, 31), 1, &[]).unwrap();
    let values = rows.iter().map(|r| (r.region.as_str(), r.value)).collect::<Vec<_>>();
    assert_eq!(values, vec![("RJ", dec("300.00")), ("SP", dec("200.00"))]);
}

#[test]
fn requested_regions_keep_their_order() {
    let table = sample();
    let regions = vec!["sp".to_string(), "RJ".to_string(), "MG".to_string()];
    let rows = suppliers::top_supplier_by_region(&table, date(2024, 12, 31), 10, &regions).unwrap();
    let order = rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["SP", "RJ"]);
}

#[test]
fn equal_supplier_totals_go_to_the_first_seen() {
    let table = load(
        "OF_CDG,OF_DATA,INSUMO_CDG,FORNECEDOR_CDG,FORNECEDOR_UF,PRCTTL_INSUMO\n\
         A,2024-01-01,1,20,RJ,100\n\
         B,2024-01-02,1,10,RJ,100\n",
        "CODIGO\n1\n",
    );
    let rows = suppliers::top_supplier_by_region(&table, date(2024, 12, 31), 1, &[]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].supplier_code, "20");
}

#[test]
fn top_supplier_requires_a_region_column() {
    let table = load(
        "OF_CDG,OF_DATA,INSUMO_CDG,FORNECEDOR_CDG,PRCTTL_INSUMO\nA,2024-01-01,1,7,10\n",
        "CODIGO\n1\n",
    );
    let err = suppliers::top_supplier_by_region(&table, date(2024, 12, 31), 1, &[])
        .expect_err("no region column");
    assert!(matches!(err, IndicatorError::ColumnNotFound { .. }));
}

#[test]
fn distinct_active_suppliers_in_window() {
    let table = sample();
    let resolver = ColumnResolver::builtin();
    assert_eq!(
        suppliers::distinct_active_suppliers(&table, &resolver, date(2024, 12, 31), 10),
        Ok(3)
    );
    // Only OF2 (supplier 0017) falls in 2023.
    assert_eq!(
        suppliers::distinct_active_suppliers(&table, &resolver, date(2023, 12, 31), 1),
        Ok(1)
    );
    assert_eq!(
        suppliers::distinct_active_suppliers(&table, &resolver, date(2040, 1, 1), 1),
        Ok(0)
    );
}

#[test]
fn zero_value_lines_do_not_make_a_supplier_active() {
    let table = load(
        "OF_CDG,OF_DATA,INSUMO_CDG,FORNECEDOR_CDG,PRCTTL_INSUMO\n\
         A,2024-01-01,1,7,0\n\
         B,2024-01-02,1,8,5\n",
        "CODIGO\n1\n",
    );
    assert_eq!(
        suppliers::distinct_active_suppliers(
            &table,
            &ColumnResolver::builtin(),
            date(2024, 12, 31),
            1
        ),
        Ok(1)
    );
}

#[test]
fn missing_supplier_column_is_its_own_error() {
    let table = load(
        "OF_CDG,OF_DATA,INSUMO_CDG,PRCTTL_INSUMO\nA,2024-01-01,1,10\n",
        "CODIGO\n1\n",
    );
    let err = suppliers::distinct_active_suppliers(
        &table,
        &ColumnResolver::builtin(),
        date(2024, 12, 31),
        1,
    )
    .expect_err("no supplier column");
    assert!(matches!(err, IndicatorError::NoSupplierColumn { .. }));
    assert!(err.is_missing_column());
}

use std::collections::BTreeMap;

use proptest::prelude::*;
use supply_indicators::{
    columns::{ColumnResolver, find_column},
    error::IndicatorError,
};

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn supplier_code_resolves_through_aliases() {
    let available = headers(&["COD_FORNECEDOR"]);
    // Without aliases "COD_FORNECEDOR" neither equals nor contains the
    // canonical name.
    assert!(
        ColumnResolver::empty()
            .resolve(&available, &["FORNECEDOR_CDG"])
            .is_err()
    );
    assert_eq!(
        ColumnResolver::builtin().resolve(&available, &["FORNECEDOR_CDG"]),
        Ok(0)
    );
}

#[test]
fn substring_pass_matches_contained_candidate() {
    let available = headers(&["DATA", "FORNECEDOR_CDG_ERP"]);
    let candidates = vec!["FORNECEDOR_CDG".to_string()];
    assert_eq!(find_column(&available, &candidates), Some(1));
}

#[test]
fn missing_column_carries_candidates_and_available() {
    let resolver = ColumnResolver::builtin();
    let available = headers(&["OF_CDG", "VALOR"]);
    let err = resolver
        .resolve(&available, &["FORNECEDOR_CDG"])
        .expect_err("no supplier column");
    assert!(err.is_missing_column());
    match err {
        IndicatorError::ColumnNotFound {
            candidates,
            available,
        } => {
            assert_eq!(candidates[0], "FORNECEDOR_CDG");
            assert!(candidates.contains(&"COD_FORNECEDOR".to_string()));
            assert_eq!(available, vec!["OF_CDG", "VALOR"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn exact_match_is_case_insensitive_and_trimmed() {
    let resolver = ColumnResolver::builtin();
    let available = headers(&["  of_cdg ", "OF_DATA"]);
    assert_eq!(resolver.resolve(&available, &["OF_CDG"]), Ok(0));
}

#[test]
fn exact_match_beats_earlier_substring_match() {
    let available = headers(&["VALOR_TOTAL_OF", "TOTAL"]);
    let candidates = vec!["TOTAL".to_string()];
    assert_eq!(find_column(&available, &candidates), Some(1));
}

#[test]
fn candidate_order_breaks_substring_ties() {
    let available = headers(&["XX_UF", "XX_FORN_UF"]);
    let candidates = vec!["FORN_UF".to_string(), "UF".to_string()];
    assert_eq!(find_column(&available, &candidates), Some(1));
}

#[test]
fn overrides_replace_builtin_aliases() {
    let mut overrides = BTreeMap::new();
    overrides.insert("of_cdg".to_string(), vec!["NUMERO_PEDIDO".to_string()]);
    let resolver = ColumnResolver::builtin().with_overrides(&overrides);
    assert_eq!(resolver.aliases("OF_CDG"), ["NUMERO_PEDIDO".to_string()]);
    let available = headers(&["NUMERO_PEDIDO"]);
    assert_eq!(resolver.resolve(&available, &["OF_CDG"]), Ok(0));
    assert!(resolver.resolve(&headers(&["PEDIDO"]), &["OF_CDG"]).is_err());
}

#[test]
fn candidates_are_deduplicated_in_order() {
    let resolver = ColumnResolver::builtin();
    let candidates = resolver.candidates(&["CODIGO", "INSUMO_CDG"]);
    let position = |name: &str| candidates.iter().position(|c| c == name);
    assert_eq!(position("CODIGO"), Some(0));
    assert!(position("INSUMO_CDG") < position("COD_INSUMO"));
    assert_eq!(
        candidates.iter().filter(|c| c.as_str() == "INSUMO_CDG").count(),
        1
    );
}

proptest! {
    #[test]
    fn resolution_is_deterministic_and_points_at_a_matching_header(
        names in proptest::collection::vec("[A-Z_]{1,8}", 1..8),
        wanted in "[A-Z_]{1,4}",
    ) {
        let candidates = vec![wanted.clone()];
        let first = find_column(&names, &candidates);
        let second = find_column(&names, &candidates);
        prop_assert_eq!(first, second);
        if let Some(idx) = first {
            prop_assert!(names[idx].contains(wanted.as_str()));
            let exact = names.iter().position(|n| n == &wanted);
            if exact.is_some() {
                prop_assert_eq!(first, exact);
            } else {
                let earliest = names.iter().position(|n| n.contains(wanted.as_str()));
                prop_assert_eq!(first, earliest);
            }
        } else {
            prop_assert!(names.iter().all(|n| !n.contains(wanted.as_str())));
        }
    }
}

//! Column resolution across inconsistently named spreadsheet exports.
//!
//! A [`ColumnResolver`] maps canonical field names (`OF_CDG`, `FORNECEDOR_CDG`,
//! ...) to alias lists and finds the column a given table uses for a field.
//!
//! Resolution runs in two passes over the expanded candidate list (each
//! canonical name followed by its aliases):
//!
//! 1. the first candidate whose trimmed, case-insensitive form equals a header;
//! 2. otherwise the first candidate contained in a header, headers scanned left
//!    to right.
//!
//! Candidate order, then column order, is the tie-break in both passes.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::header_key,
    error::{IndicatorError, Result},
};

const BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    ("OF_CDG", &["OF", "ORDEM_FORNECIMENTO", "PED_CDG", "PEDIDO"]),
    ("OF_DATA", &["DATA_OF", "PED_DT", "DATA", "DT"]),
    ("REQ_DATA", &["DATA_REQ", "REQ_DT"]),
    ("INSUMO_CDG", &["COD_INSUMO", "MATERIAL_CDG", "COD_MATERIAL"]),
    ("INSUMO_DESC", &["DESC_INSUMO", "MATERIAL_DESC", "DESCRICAO"]),
    (
        "INSUMO_CATEGORIA",
        &["CATEGORIA", "GRUPO_INSUMO", "FAMILIA", "SEGMENTO"],
    ),
    (
        "FORNECEDOR_CDG",
        &[
            "FORNECEDOR_ID",
            "COD_FORNECEDOR",
            "FORN_ID",
            "FORN_CODIGO",
            "FORN_CDG",
            "FORN_CNPJ",
            "CNPJ",
            "PED_FORNECEDOR",
            "FORNECEDOR",
        ],
    ),
    ("FORNECEDOR_DESC", &["FORN_DESC", "RAZAO_SOCIAL", "NOME_FORNECEDOR"]),
    ("FORNECEDOR_UF", &["FORN_UF", "UF_FORN", "UF"]),
    ("EMPRD_DESC", &["EMPREENDIMENTO", "OBRA", "SOLICITANTE"]),
    ("EMPRD_UF", &["UF_OBRA", "OBRA_UF", "UF"]),
    (
        "ITEM_PRCUNTPED",
        &["PRECO_UNITARIO", "PRC_UNIT", "VALOR_UNITARIO", "PRECO"],
    ),
    ("ITEM_QTDE", &["QUANTIDADE", "QTDE", "QTD", "ITEM_QTDPED"]),
    ("PRCTTL_INSUMO", &["VALOR_TOTAL", "PRECO_TOTAL", "TOTAL", "VALOR"]),
    ("CODIGO", &["CÓDIGO", "COD", "INSUMO_CDG"]),
    ("MUNICIPIO", &["MUNICÍPIO", "CIDADE", "MUNICIPIO_DESC"]),
    (
        "DATA_CADASTRO",
        &["DT_CADASTRO", "CADASTRO", "DATA_INCLUSAO", "DATA_REGISTRO"],
    ),
    (
        "CATEGORIA_FORNECIMENTO",
        &["CATEGORIA", "SEGMENTO", "RAMO", "ATIVIDADE"],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnResolver {
    aliases: BTreeMap<String, Vec<String>>,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ColumnResolver {
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(canonical, list)| {
                (
                    header_key(canonical),
                    list.iter().map(|a| a.to_string()).collect(),
                )
            })
            .collect();
        Self { aliases }
    }

    /// Replaces the alias list of each canonical name present in `overrides`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Vec<String>>) -> Self {
        for (canonical, list) in overrides {
            self.aliases.insert(header_key(canonical), list.clone());
        }
        self
    }

    pub fn aliases(&self, canonical: &str) -> &[String] {
        self.aliases
            .get(&header_key(canonical))
            .map(|list| list.as_slice())
            .unwrap_or_default()
    }

    /// Each requested name followed by its aliases, duplicates dropped.
    pub fn candidates(&self, names: &[&str]) -> Vec<String> {
        let mut expanded: Vec<String> = Vec::new();
        for name in names {
            let own = std::iter::once(name.to_string());
            for candidate in own.chain(self.aliases(name).iter().cloned()) {
                if !expanded
                    .iter()
                    .any(|existing| header_key(existing) == header_key(&candidate))
                {
                    expanded.push(candidate);
                }
            }
        }
        expanded
    }

    pub fn find(&self, headers: &[String], names: &[&str]) -> Option<usize> {
        find_column(headers, &self.candidates(names))
    }

    pub fn resolve(&self, headers: &[String], names: &[&str]) -> Result<usize> {
        let candidates = self.candidates(names);
        match find_column(headers, &candidates) {
            Some(idx) => {
                debug!("Resolved {:?} to column '{}'", names, headers[idx]);
                Ok(idx)
            }
            None => Err(IndicatorError::column_not_found(candidates, headers)),
        }
    }
}

/// Two-pass lookup: exact (trimmed, case-insensitive) match first, then the
/// first header containing a candidate.
pub fn find_column(headers: &[String], candidates: &[String]) -> Option<usize> {
    find_exact(headers, candidates).or_else(|| find_contained(headers, candidates, &[]))
}

/// First candidate equal to a header, in candidate order.
pub fn find_exact(headers: &[String], candidates: &[String]) -> Option<usize> {
    let keys = keys(headers);
    wanted(candidates)
        .iter()
        .find_map(|candidate| keys.iter().position(|key| key == candidate))
}

/// First candidate contained in a header, skipping the columns in `taken`.
pub fn find_contained(headers: &[String], candidates: &[String], taken: &[usize]) -> Option<usize> {
    let keys = keys(headers);
    wanted(candidates).iter().find_map(|candidate| {
        keys.iter()
            .enumerate()
            .find(|(idx, key)| !taken.contains(idx) && key.contains(candidate.as_str()))
            .map(|(idx, _)| idx)
    })
}

/// Resolves several fields against one header row so that no two fields
/// share a column. Exact matches are settled for every field first (earlier
/// fields win a shared header); the substring pass then skips claimed columns.
pub fn find_distinct(headers: &[String], fields: &[Vec<String>]) -> Vec<Option<usize>> {
    let mut indices: Vec<Option<usize>> = Vec::with_capacity(fields.len());
    for candidates in fields {
        let exact = find_exact(headers, candidates).filter(|idx| !indices.contains(&Some(*idx)));
        indices.push(exact);
    }
    for (pos, candidates) in fields.iter().enumerate() {
        if indices[pos].is_some() {
            continue;
        }
        let taken = indices.iter().flatten().copied().collect::<Vec<_>>();
        indices[pos] = find_contained(headers, candidates, &taken);
    }
    indices
}

fn keys(headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| header_key(h)).collect()
}

fn wanted(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| header_key(c))
        .filter(|c| !c.is_empty())
        .collect()
}

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use supply_indicators::{
    columns::ColumnResolver,
    frame::Frame,
    loader::{self, Transactions},
};
use tempfile::{TempDir, tempdir};

pub const TX_HEADER: &str = "OF_CDG,OF_DATA,REQ_DATA,INSUMO_CDG,INSUMO_DESC,INSUMO_CATEGORIA,FORNECEDOR_CDG,FORNECEDOR_DESC,FORNECEDOR_UF,EMPRD_DESC,ITEM_PRCUNTPED,ITEM_QTDE,PRCTTL_INSUMO";

/// Eight lines across five orders, two regions and three years.
pub const SAMPLE_TRANSACTIONS: &str = "\
OF_CDG,OF_DATA,REQ_DATA,INSUMO_CDG,INSUMO_DESC,INSUMO_CATEGORIA,FORNECEDOR_CDG,FORNECEDOR_DESC,FORNECEDOR_UF,EMPRD_DESC,ITEM_PRCUNTPED,ITEM_QTDE,PRCTTL_INSUMO
OF1,2022-03-10,2022-03-01,100,Cimento CP-II,Cimento,17,Alfa Materiais,RJ,Obra Centro,10,5,50
OF2,2023-04-02,2023-03-20,200,Areia media,Agregados,17,Alfa Materiais,RJ,Obra Centro,20,10,
OF2,2023-04-02,2023-03-20,300,Porta sob medida,Esquadrias,17,Alfa Materiais,RJ,Obra Centro,100,3,300
OF3,2024-01-15,2024-01-02,100,Cimento CP-II,Cimento,2041,Beta Comercio,SP,Obra Norte,12,10,120
OF3,2024-01-15,2024-01-02,400,Brita 1,Agregados,2041,Beta Comercio,SP,Obra Norte,8,10,80
OF4,2024-06-20,2024-06-01,300,Porta sob medida,Esquadrias,355,Gama Portas,SP,Obra Norte,5,2,10
OF5,2024-11-05,2024-10-30,200,Areia media,Agregados,17,Alfa Materiais,RJ,Obra Sul,15,10,150
OF5,2024-11-05,2024-10-30,500,Vergalhao CA-50,Aco,17,Alfa Materiais,RJ,Obra Sul,30,5,
";

pub const SAMPLE_REFERENCE: &str = "\
CODIGO,DESCRICAO
100,Cimento
200,Areia
200,Areia
400,Brita
,
500,Aco
";

pub const SAMPLE_REGISTRY: &str = "\
FORNECEDOR_CDG,UF,MUNICIPIO,DATA_CADASTRO,CATEGORIA_FORNECIMENTO
0017,RJ,Rio de Janeiro,15/02/2019,Cimento; Areia
2041,SP,São Paulo,2020-07-01,Agregados / Brita
0355,SP,Campinas,2021-03-03,Portas e janelas
0355,SP,Campinas,2020-01-10,Portas e janelas
9001,RJ,Niterói,2021-09-09,Aço e ferragens
nan,RJ,Niterói,2021-09-09,Cimento
";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

/// Parses simple comma-separated text (no quoting) into a frame.
pub fn frame(text: &str) -> Frame {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let headers = lines
        .next()
        .map(split)
        .unwrap_or_default();
    let rows = lines.map(split).collect();
    Frame::from_text_rows(headers, rows)
}

fn split(line: &str) -> Vec<String> {
    line.split(',').map(|cell| cell.to_string()).collect()
}

pub fn load(transactions: &str, reference: &str) -> Transactions {
    let (table, _) = loader::normalize(
        frame(transactions),
        &frame(reference),
        &ColumnResolver::builtin(),
    )
    .expect("normalize fixture");
    table
}

pub fn sample() -> Transactions {
    load(SAMPLE_TRANSACTIONS, SAMPLE_REFERENCE)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

//! CSV reading, encoding and delimiter resolution.
//!
//! Spreadsheet extracts reach the engine as CSV exports. This module turns a
//! file into a [`Frame`] of text cells and is the only place that touches the
//! filesystem for input:
//!
//! - **Delimiter resolution**: explicit override, `.tsv` → tab, otherwise a
//!   sniff of the header line choosing between `;` and `,`.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8
//!   (`windows-1252` is common for pt-BR exports).
//! - **Output**: indicator rows can be written back out as CSV on stdout.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::frame::Frame;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const SEMICOLON_DELIMITER: u8 = b';';

/// Something that can hand over a fully loaded table.
pub trait TableSource {
    fn describe(&self) -> String;
    fn read_frame(&self) -> Result<Frame>;
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: None,
            encoding: UTF_8,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl TableSource for CsvSource {
    fn describe(&self) -> String {
        format!("{:?}", self.path)
    }

    fn read_frame(&self) -> Result<Frame> {
        let delimiter = resolve_input_delimiter(&self.path, self.delimiter)?;
        debug!(
            "Reading {:?} with delimiter '{}' and encoding {}",
            self.path,
            printable_delimiter(delimiter),
            self.encoding.name()
        );
        let mut reader = open_csv_reader_from_path(&self.path, delimiter)?;
        let headers = reader_headers(&mut reader, self.encoding)?
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            rows.push(decode_record(&record, self.encoding)?);
        }
        Ok(Frame::from_text_rows(headers, rows))
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> Result<u8> {
    if let Some(delimiter) = provided {
        return Ok(delimiter);
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => Ok(DEFAULT_TSV_DELIMITER),
        _ => {
            let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
            let mut first_line = Vec::new();
            BufReader::new(file)
                .read_until(b'\n', &mut first_line)
                .with_context(|| format!("Reading header line of {path:?}"))?;
            Ok(sniff_delimiter(&first_line))
        }
    }
}

fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

/// Picks `;` when the header line holds more semicolons than commas.
pub fn sniff_delimiter(header_line: &[u8]) -> u8 {
    let semicolons = header_line.iter().filter(|b| **b == b';').count();
    let commas = header_line.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        SEMICOLON_DELIMITER
    } else {
        DEFAULT_CSV_DELIMITER
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = Box::new(BufReader::new(
        File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
    ));
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

pub fn write_csv_rows<W>(writer: W, headers: &[String], rows: &[Vec<String>]) -> Result<()>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    let mut writer = builder.from_writer(writer);
    writer.write_record(headers).context("Writing CSV header")?;
    for row in rows {
        writer.write_record(row).context("Writing CSV row")?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

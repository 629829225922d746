//! File I/O for the dataset store: CSV and JSON readers, input decoding and
//! the CSV writer used for every output table.
//!
//! - **Encoding**: inputs are decoded via `encoding_rs`, defaulting to UTF-8.
//! - **Atomic output**: tables are written to a `.tmp` sibling and renamed
//!   into place once complete, so a failed write never leaves a partial file.
//! - **Quoting**: CSV output uses `QuoteStyle::Always` for round-trip safety.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::dataset::Dataset;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const OUTPUT_DELIMITER: u8 = DEFAULT_CSV_DELIMITER;

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
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
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
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
    let mut decoded = decode_record(&headers, encoding)?;
    if let Some(first) = decoded.first_mut() {
        // A UTF-8 byte order mark survives decoding as U+FEFF.
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    Ok(decoded)
}

/// Reads the header and every record of a delimited file as text.
pub fn read_csv_text(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let headers = reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers of {path:?}"))?;
    let mut records = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 2))?;
        records.push(decode_record(&record, encoding)?);
    }
    Ok((headers, records))
}

/// Reads JSON objects from either a single top-level array or one object per
/// line. Blank lines are skipped.
pub fn read_json_records(
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    let mut bytes = Vec::new();
    File::open(path)
        .with_context(|| format!("Opening input file {path:?}"))?
        .read_to_end(&mut bytes)
        .with_context(|| format!("Reading input file {path:?}"))?;
    let text = decode_bytes(&bytes, encoding)?;
    let trimmed = text.trim_start_matches('\u{feff}').trim();

    let values: Vec<serde_json::Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).with_context(|| format!("Parsing JSON array in {path:?}"))?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Parsing JSON line {} of {path:?}", idx + 1))
            })
            .collect::<Result<Vec<serde_json::Value>>>()?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(anyhow!(
                "Record {} of {path:?} is not a JSON object: {other}",
                idx + 1
            )),
        })
        .collect()
}

pub fn open_csv_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    Ok(builder.from_writer(BufWriter::new(file)))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `dataset` with a header row, replacing any existing file at `path`
/// only once the whole table has been written.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let staging = staging_path(path);
    let written = write_rows(&staging, dataset);
    if let Err(err) = written {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    fs::rename(&staging, path).with_context(|| format!("Moving {staging:?} to {path:?}"))
}

fn write_rows(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = open_csv_writer(path, OUTPUT_DELIMITER)?;
    writer
        .write_record(dataset.columns())
        .with_context(|| format!("Writing headers of '{}'", dataset.name()))?;
    for row in dataset.rows() {
        writer
            .write_record(
                row.iter()
                    .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default()),
            )
            .with_context(|| format!("Writing row of '{}'", dataset.name()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing output for '{}'", dataset.name()))
}

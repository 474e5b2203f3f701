//! CSV / TSV stores.

use std::path::Path;

use crate::error::Result;
use crate::table::Grid;

/// Header row and data rows of a delimited file, as written.
pub(crate) fn read(path: &Path, delimiter: u8) -> Result<(Vec<String>, Grid)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Grid::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

pub(crate) fn read_headers(path: &Path, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

pub(crate) fn encode(delimiter: u8, headers: &[String], rows: &Grid) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

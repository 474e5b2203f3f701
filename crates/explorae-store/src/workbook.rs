//! `.xlsx` stores.
//!
//! One sheet holds the table; every other sheet is carried through a save
//! with its cell values intact. Cell formatting and formulas are not kept,
//! only the values the workbook last computed.

use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet};

use crate::error::{Result, StoreError};
use crate::table::{Grid, SheetSelector};

/// Sheets of the workbook a table was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkbookLayout {
    /// Every sheet in workbook order. The table's own slot holds no cells.
    sheets: Vec<(String, Grid)>,
    table_sheet: usize,
}

impl WorkbookLayout {
    pub(crate) fn table_sheet_name(&self) -> &str {
        &self.sheets[self.table_sheet].0
    }
}

/// Table sheet split into header and rows, plus the rest of the workbook.
pub(crate) fn read(path: &Path, sheet: &SheetSelector) -> Result<(Vec<String>, Grid, WorkbookLayout)> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let names: Vec<String> = workbook.sheet_names().iter().map(|n| n.to_string()).collect();
    let table_sheet = sheet
        .position(&names)
        .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;

    let mut sheets = Vec::with_capacity(names.len());
    let mut table = Grid::new();
    for (index, name) in names.into_iter().enumerate() {
        let grid = grid_of(&workbook.worksheet_range(&name)?);
        if index == table_sheet {
            table = grid;
            sheets.push((name, Grid::new()));
        } else {
            sheets.push((name, grid));
        }
    }

    // Header is the first non-empty row.
    let start = table.iter().position(|row| row.iter().any(|c| !c.is_empty())).unwrap_or(table.len());
    let mut rows = table.split_off(start);
    let headers = if rows.is_empty() { Vec::new() } else { rows.remove(0) };

    Ok((headers, rows, WorkbookLayout { sheets, table_sheet }))
}

pub(crate) fn read_headers(path: &Path, sheet: &SheetSelector) -> Result<Vec<String>> {
    read(path, sheet).map(|(headers, _, _)| headers)
}

/// Cells as text, keeping the sheet's offset from A1.
fn grid_of(range: &Range<Data>) -> Grid {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut grid: Grid = (0..first_row).map(|_| Vec::new()).collect();
    for cells in range.rows() {
        let mut row = vec![String::new(); first_col as usize];
        row.extend(cells.iter().map(cell_text));
        grid.push(row);
    }
    grid
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn encode(layout: &WorkbookLayout, headers: &[String], rows: &Grid) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    for (index, (name, grid)) in layout.sheets.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        if index == layout.table_sheet {
            write_row(sheet, 0, headers, false)?;
            for (r, row) in rows.iter().enumerate() {
                write_row(sheet, r + 1, row, true)?;
            }
        } else {
            for (r, row) in grid.iter().enumerate() {
                write_row(sheet, r, row, true)?;
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn write_row(sheet: &mut Worksheet, row: usize, cells: &[String], numeric: bool) -> Result<()> {
    // Out-of-range indices saturate and are rejected by the writer.
    let row = RowNum::try_from(row).unwrap_or(RowNum::MAX);
    for (col, text) in cells.iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        let col = ColNum::try_from(col).unwrap_or(ColNum::MAX);
        match as_number(text).filter(|_| numeric) {
            Some(value) => sheet.write_number(row, col, value)?,
            None => sheet.write_string(row, col, text)?,
        };
    }
    Ok(())
}

/// Text stored as a number cell. Zero-padded codes such as `007` stay text.
pub(crate) fn as_number(text: &str) -> Option<f64> {
    let digits = text.trim_start_matches(&['+', '-'][..]).as_bytes();
    if digits.len() > 1 && digits[0] == b'0' && digits[1].is_ascii_digit() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

//! In-memory table and atomic saving.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::delimited;
use crate::error::Result;
use crate::workbook::{self, WorkbookLayout};

/// Rows of text cells.
pub(crate) type Grid = Vec<Vec<String>>;

/// Which worksheet of an `.xlsx` store holds the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    /// Zero-based position in the workbook.
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl SheetSelector {
    pub fn position(&self, names: &[String]) -> Option<usize> {
        match self {
            Self::Index(i) => (*i < names.len()).then_some(*i),
            Self::Name(name) => names.iter().position(|n| n == name),
        }
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// How the store file is read and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Column whose values are matched against run identifiers.
    pub id_column: String,
    /// Field delimiter for text stores; inferred from the file extension when unset.
    pub delimiter: Option<u8>,
    /// Worksheet holding the table in `.xlsx` stores.
    pub sheet: SheetSelector,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            id_column: "jobs".to_string(),
            delimiter: None,
            sheet: SheetSelector::default(),
        }
    }
}

impl StoreOptions {
    /// Tab for `.tsv`/`.tab` files, comma otherwise, unless set explicitly.
    pub fn delimiter_for(&self, path: &Path) -> u8 {
        if let Some(d) = self.delimiter {
            return d;
        }
        match extension(path).as_deref() {
            Some("tsv") | Some("tab") => b'\t',
            _ => b',',
        }
    }
}

/// `.xlsx` files are workbooks; anything else is delimited text.
pub fn is_workbook(path: &Path) -> bool {
    extension(path).as_deref() == Some("xlsx")
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

/// What happened to the canonical file on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The canonical file now holds the new table.
    Replaced,
    /// The canonical file could not be replaced; the new table is kept at this path.
    Retained(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Encoding {
    Delimited(u8),
    Workbook(WorkbookLayout),
}

/// In-memory copy of the store. Every cell is text; empty means missing.
///
/// No row is wider than the header: surplus cells found on load get an
/// unnamed column of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularStore {
    headers: Vec<String>,
    rows: Grid,
    encoding: Encoding,
}

impl TabularStore {
    /// Empty delimited table.
    pub fn new(headers: Vec<String>, delimiter: u8) -> Self {
        Self { headers, rows: Vec::new(), encoding: Encoding::Delimited(delimiter) }
    }

    pub fn load(path: &Path, options: &StoreOptions) -> Result<Self> {
        let mut table = if is_workbook(path) {
            let (headers, rows, layout) = workbook::read(path, &options.sheet)?;
            debug!("Reading sheet '{}' of {:?}", layout.table_sheet_name(), path);
            Self { headers, rows, encoding: Encoding::Workbook(layout) }
        } else {
            let delimiter = options.delimiter_for(path);
            let (headers, rows) = delimited::read(path, delimiter)?;
            Self { headers, rows, encoding: Encoding::Delimited(delimiter) }
        };
        table.widen_to_rows();

        debug!("Loaded {} rows x {} columns from {:?}", table.rows.len(), table.headers.len(), path);
        Ok(table)
    }

    /// Header row only, for validating a store before a batch starts.
    pub fn read_headers(path: &Path, options: &StoreOptions) -> Result<Vec<String>> {
        if is_workbook(path) {
            workbook::read_headers(path, &options.sheet)
        } else {
            delimited::read_headers(path, options.delimiter_for(path))
        }
    }

    fn widen_to_rows(&mut self) {
        let widest = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        if widest > self.headers.len() {
            warn!(
                "Store has rows with {} cells but only {} column names; keeping the extra cells under unnamed columns",
                widest,
                self.headers.len()
            );
            self.headers.resize(widest, String::new());
        }
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
        self.widen_to_rows();
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, appending an empty column if it does not exist yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        let index = self.headers.len() - 1;
        for row in &mut self.rows {
            row.truncate(index);
            row.resize(index + 1, String::new());
        }
        index
    }

    /// First row whose cell in `column` equals `value` as text.
    pub fn find_row(&self, column: usize, value: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(column).map(String::as_str) == Some(value))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Overwrite an existing cell; out-of-range coordinates are ignored.
    pub fn set_cell(&mut self, row: usize, column: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            *cell = value;
        }
    }

    /// Cell of the row identified by `id` in `id_column`.
    pub fn lookup(&self, id_column: &str, id: &str, column: &str) -> Option<&str> {
        let row = self.find_row(self.column_index(id_column)?, id)?;
        self.cell(row, self.column_index(column)?)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        match &self.encoding {
            Encoding::Delimited(delimiter) => delimited::encode(*delimiter, &self.headers, &self.rows),
            Encoding::Workbook(layout) => workbook::encode(layout, &self.headers, &self.rows),
        }
    }

    /// Write the table next to `path` and rename it over `path`.
    ///
    /// A failed rename is not an error: the fully written temporary file is
    /// kept and its location returned so nothing computed is lost.
    pub fn write_atomic(&self, path: &Path) -> Result<WriteOutcome> {
        let bytes = self.encode()?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = path.extension().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "csv".to_string());

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{stem}."))
            .suffix(&format!(".tmp.{ext}"))
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;

        // Keep the store's permissions rather than the temp file's 0600.
        if let Ok(meta) = fs::metadata(path) {
            if meta.is_file() {
                if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
                    debug!("Could not copy permissions of {:?} to {:?}: {}", path, tmp.path(), e);
                }
            }
        }

        match tmp.persist(path) {
            Ok(_) => Ok(WriteOutcome::Replaced),
            Err(e) => {
                let (_, kept) = e.file.keep().map_err(|k| k.error)?;
                error!(
                    "Store file is locked or cannot be replaced ({}). Close '{}' and rerun; \
                     the updated table was written to: {}",
                    e.error,
                    path.display(),
                    kept.display()
                );
                Ok(WriteOutcome::Retained(kept))
            }
        }
    }
}

//! Store error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook read error: {0}")]
    WorkbookRead(#[from] calamine::XlsxError),

    #[error("Workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Sheet {0} not found in workbook")]
    SheetNotFound(String),

    #[error("Identifier column '{0}' not found in store header")]
    MissingIdColumn(String),
}

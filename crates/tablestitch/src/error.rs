use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("invalid page number {page}: document has {page_count} page(s)")]
    InvalidPageNumber { page: u32, page_count: usize },

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("failed to extract geometry from page {page}: {source}")]
    Extraction {
        page: u32,
        #[source]
        source: lopdf::Error,
    },

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("sheet '{sheet}' exceeds the worksheet row or column limit")]
    SheetTooLarge { sheet: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl ExtractError {
    /// True for errors raised while reading the document itself, as opposed
    /// to request validation or output failures.
    #[must_use]
    pub fn is_extraction_failure(&self) -> bool {
        matches!(self, Self::PdfLoad(_) | Self::Extraction { .. })
    }
}

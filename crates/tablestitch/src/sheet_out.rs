use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use rust_xlsxwriter::Workbook;

use crate::error::ExtractError;
use crate::model::MergedTable;

/// Receives merged tables one sheet at a time.
pub trait SheetWriter {
    fn write_sheet(&mut self, table: &MergedTable) -> Result<(), ExtractError>;

    /// Called once after the last sheet.
    fn finish(&mut self) -> Result<(), ExtractError> {
        Ok(())
    }
}

/// Single `.xlsx` workbook, one worksheet per merged table, saved on
/// [`SheetWriter::finish`]. Excel compares sheet names case-insensitively;
/// a later sheet with a clashing name replaces the earlier one in place.
/// Nothing is saved when no sheet was written.
#[derive(Debug, Clone)]
pub struct XlsxWorkbookWriter {
    path: PathBuf,
    sheets: Vec<MergedTable>,
}

impl XlsxWorkbookWriter {
    pub fn create(path: &Path) -> Result<Self, ExtractError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            sheets: Vec::new(),
        })
    }

    #[must_use]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .map(|sheet| sheet.sheet_name.as_str())
            .collect()
    }

    fn save(&self) -> Result<(), ExtractError> {
        let mut workbook = Workbook::new();
        for (position, table) in self.sheets.iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(worksheet_name(&table.sheet_name, position))?;

            for (row_index, row) in std::iter::once(&table.header)
                .chain(&table.rows)
                .enumerate()
            {
                let row_number = u32::try_from(row_index).map_err(|_| too_large(table))?;
                for (col_index, cell) in row.iter().enumerate() {
                    let col_number = u16::try_from(col_index).map_err(|_| too_large(table))?;
                    worksheet.write_string(row_number, col_number, cell.as_str())?;
                }
            }
        }
        workbook.save(&self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            sheets = self.sheets.len(),
            "saved workbook"
        );
        Ok(())
    }
}

fn too_large(table: &MergedTable) -> ExtractError {
    ExtractError::SheetTooLarge {
        sheet: table.sheet_name.clone(),
    }
}

/// Excel also refuses names that start or end with an apostrophe.
fn worksheet_name(name: &str, position: usize) -> String {
    let trimmed = name.trim_matches('\'');
    if trimmed.is_empty() {
        format!("Sheet{}", position + 1)
    } else {
        trimmed.to_string()
    }
}

impl SheetWriter for XlsxWorkbookWriter {
    fn write_sheet(&mut self, table: &MergedTable) -> Result<(), ExtractError> {
        let name = table.sheet_name.to_lowercase();
        match self
            .sheets
            .iter_mut()
            .find(|sheet| sheet.sheet_name.to_lowercase() == name)
        {
            Some(existing) => *existing = table.clone(),
            None => self.sheets.push(table.clone()),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        if self.sheets.is_empty() {
            return Ok(());
        }
        self.save()
    }
}

/// Workbook stored as a directory with one `<sheet_name>.csv` per sheet.
/// A second sheet with the same name replaces the first.
#[derive(Debug, Clone)]
pub struct CsvWorkbookWriter {
    dir: PathBuf,
    delimiter: u8,
    written: Vec<PathBuf>,
}

impl CsvWorkbookWriter {
    pub fn create(dir: &Path, delimiter: u8) -> Result<Self, ExtractError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            delimiter,
            written: Vec::new(),
        })
    }

    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl SheetWriter for CsvWorkbookWriter {
    fn write_sheet(&mut self, table: &MergedTable) -> Result<(), ExtractError> {
        let path = self.dir.join(format!("{}.csv", table.sheet_name));
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)?;
        writer.write_record(&table.header)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        self.written.push(path);
        Ok(())
    }
}

pub fn write_sheet_to_string(table: &MergedTable, delimiter: u8) -> Result<String, ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ExtractError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

mod chain;
mod continuation;
mod error;
mod geometry;
mod header;
mod label;
mod merge;
mod model;
mod options;
mod pdf_reader;
mod sheet_out;
mod table_detect;
mod table_parse;
mod warning;

use std::collections::BTreeMap;
use std::path::Path;

use crate::chain::ChainBuilder;
use crate::label::label;
use crate::merge::merge_chain;
use crate::warning::WarningCode;

pub use error::ExtractError;
pub use geometry::GeometryProvider;
pub use merge::sanitize_sheet_name;
pub use model::{BBox, Cell, DetectedBox, MergedTable, PageGeometry, RegionKey, TableRegion, Word};
pub use options::{
    DEFAULT_ALIGN_TOLERANCE, DEFAULT_EDGE_MARGIN, DEFAULT_HEADER_SIMILARITY,
    DEFAULT_LINE_TOLERANCE, StitchOptions,
};
pub use pdf_reader::PdfGeometry;
pub use sheet_out::{CsvWorkbookWriter, SheetWriter, XlsxWorkbookWriter, write_sheet_to_string};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    /// Table regions detected across the document.
    pub table_count: usize,
    pub chain_count: usize,
    /// Sheets produced, after rejected chains are dropped.
    pub sheet_count: usize,
    pub row_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

fn load_labeled_page(
    provider: &(impl GeometryProvider + ?Sized),
    page: u32,
    options: &StitchOptions,
) -> Result<PageGeometry, ExtractError> {
    let mut geometry = provider.page(page)?;
    for table in &mut geometry.tables {
        table.header_label = label(&table.bbox, &geometry.words, options.line_tolerance);
    }
    Ok(geometry)
}

fn page_index(index: usize) -> Result<u32, ExtractError> {
    u32::try_from(index)
        .map_err(|_| ExtractError::InvalidOption(format!("page index {index} is out of range")))
}

/// Merges every continuation chain in the document into one table each.
///
/// Chains that fail the column invariant are omitted and reported as
/// `MergeRejected` warnings; any extraction error aborts the whole export.
pub fn export_tables(
    provider: &(impl GeometryProvider + ?Sized),
    options: &StitchOptions,
) -> Result<(Vec<MergedTable>, ExportReport), ExtractError> {
    options.validate()?;

    let mut builder = ChainBuilder::default();
    let mut regions = BTreeMap::new();
    for index in 0..provider.page_count() {
        let page = load_labeled_page(provider, page_index(index)?, options)?;
        builder.push_page(&page, options);
        regions.extend(page.tables.into_iter().map(|table| (table.key, table)));
    }
    let chains = builder.finish();

    let mut warnings = Vec::new();
    if regions.is_empty() {
        warnings.push(ExtractWarning::new(
            WarningCode::NoTablesDetected,
            "no tables were detected in the document",
        ));
    }

    let groups = chains.groups();
    let mut tables = Vec::with_capacity(groups.len());
    for (root, members) in &groups {
        let Some(root_region) = regions.get(root) else {
            continue;
        };
        let fragments = members
            .iter()
            .filter_map(|key| regions.get(key))
            .collect::<Vec<_>>();

        match merge_chain(
            root_region,
            &fragments,
            options.header_similarity,
            &mut warnings,
        ) {
            Ok(table) => tables.push(table),
            Err(rejection) => {
                tracing::warn!(
                    page = root.page,
                    index = root.index,
                    fragments = fragments.len(),
                    "dropping table chain: {rejection}"
                );
                warnings.push(
                    ExtractWarning::new(WarningCode::MergeRejected, rejection.to_string())
                        .with_region(*root),
                );
            }
        }
    }

    let report = ExportReport {
        table_count: chains.len(),
        chain_count: groups.len(),
        sheet_count: tables.len(),
        row_count: tables.iter().map(|table| table.rows.len()).sum(),
        warnings,
    };
    Ok((tables, report))
}

/// Writes each merged table through `writer`, in order, then finishes it.
pub fn write_sheets(
    writer: &mut impl SheetWriter,
    tables: &[MergedTable],
) -> Result<(), ExtractError> {
    for table in tables {
        writer.write_sheet(table)?;
    }
    writer.finish()
}

/// Detect-only view of a single page (1-based `page_number`): labels and the
/// continuation decision against the previous page, without merging.
pub fn detect_page(
    provider: &(impl GeometryProvider + ?Sized),
    page_number: u32,
    options: &StitchOptions,
) -> Result<Vec<DetectedBox>, ExtractError> {
    options.validate()?;

    let page_count = provider.page_count();
    let in_range =
        page_number >= 1 && usize::try_from(page_number).is_ok_and(|page| page <= page_count);
    if !in_range {
        return Err(ExtractError::InvalidPageNumber {
            page: page_number,
            page_count,
        });
    }

    let index = page_number - 1;
    let mut builder = ChainBuilder::default();
    if index > 0 {
        let previous = load_labeled_page(provider, index - 1, options)?;
        builder.push_page(&previous, options);
    }
    let page = load_labeled_page(provider, index, options)?;
    let links = builder.push_page(&page, options);

    Ok(page
        .tables
        .iter()
        .zip(links)
        .map(|(table, continued_from)| DetectedBox {
            x0: table.bbox.x0,
            y0: table.bbox.top,
            x1: table.bbox.x1,
            y1: table.bbox.bottom,
            page_width: page.width,
            page_height: page.height,
            header_label: table.header_label.clone(),
            is_continuation: continued_from.is_some(),
            continued_from,
        })
        .collect())
}

pub fn export_pdf(
    input_pdf: &Path,
    options: &StitchOptions,
) -> Result<(Vec<MergedTable>, ExportReport), ExtractError> {
    let geometry = PdfGeometry::open(input_pdf, options)?;
    export_tables(&geometry, options)
}

pub fn export_pdf_bytes(
    input_pdf: &[u8],
    options: &StitchOptions,
) -> Result<(Vec<MergedTable>, ExportReport), ExtractError> {
    let geometry = PdfGeometry::from_bytes(input_pdf, options)?;
    export_tables(&geometry, options)
}

/// Exports every merged table of `input_pdf` as a CSV sheet under `output_dir`.
pub fn export_pdf_to_dir(
    input_pdf: &Path,
    output_dir: &Path,
    options: &StitchOptions,
) -> Result<ExportReport, ExtractError> {
    let (tables, report) = export_pdf(input_pdf, options)?;
    let mut writer = CsvWorkbookWriter::create(output_dir, options.delimiter)?;
    write_sheets(&mut writer, &tables)?;
    Ok(report)
}

/// Exports every merged table of `input_pdf` into one `.xlsx` workbook.
pub fn export_pdf_to_xlsx(
    input_pdf: &Path,
    output_xlsx: &Path,
    options: &StitchOptions,
) -> Result<ExportReport, ExtractError> {
    let (tables, report) = export_pdf(input_pdf, options)?;
    let mut writer = XlsxWorkbookWriter::create(output_xlsx)?;
    write_sheets(&mut writer, &tables)?;
    Ok(report)
}

pub fn detect_pdf_page(
    input_pdf: &Path,
    page_number: u32,
    options: &StitchOptions,
) -> Result<Vec<DetectedBox>, ExtractError> {
    let geometry = PdfGeometry::open(input_pdf, options)?;
    detect_page(&geometry, page_number, options)
}

pub fn detect_pdf_bytes_page(
    input_pdf: &[u8],
    page_number: u32,
    options: &StitchOptions,
) -> Result<Vec<DetectedBox>, ExtractError> {
    let geometry = PdfGeometry::from_bytes(input_pdf, options)?;
    detect_page(&geometry, page_number, options)
}

#[cfg(test)]
mod tests {
    use super::{ExtractError, detect_page, export_tables};
    use crate::model::{BBox, Cell, PageGeometry, RegionKey, TableRegion, Word};
    use crate::options::StitchOptions;
    use crate::warning::WarningCode;

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|cell| Some((*cell).to_string())).collect()
    }

    fn table(page: u32, index: usize, bbox: BBox, rows: Vec<Vec<Cell>>) -> TableRegion {
        TableRegion {
            key: RegionKey::new(page, index),
            bbox,
            rows,
            header_label: String::new(),
        }
    }

    fn caption(text: &str, top: f64) -> Word {
        Word {
            text: text.to_string(),
            x0: 50.0,
            top,
            x1: 120.0,
            bottom: top + 10.0,
        }
    }

    fn page(page: u32, tables: Vec<TableRegion>, words: Vec<Word>) -> PageGeometry {
        PageGeometry {
            page,
            width: 612.0,
            height: 792.0,
            tables,
            words,
        }
    }

    fn split_document() -> Vec<PageGeometry> {
        vec![
            page(
                0,
                vec![table(
                    0,
                    0,
                    BBox::new(50.0, 100.0, 500.0, 700.0),
                    vec![row(&["Name", "Qty", "Price"]), row(&["Pen", "3", "1.50"])],
                )],
                vec![caption("Inventory", 80.0)],
            ),
            page(
                1,
                vec![
                    table(
                        1,
                        0,
                        BBox::new(52.0, 40.0, 498.0, 300.0),
                        vec![row(&["Name", "Qty", "Pric"]), row(&["Book", "1", "9.90"])],
                    ),
                    table(
                        1,
                        1,
                        BBox::new(50.0, 400.0, 300.0, 500.0),
                        vec![row(&["Code", "Label"]), row(&["7", "x", "extra"])],
                    ),
                ],
                vec![caption("Totals", 380.0)],
            ),
        ]
    }

    #[test]
    fn merges_split_table_and_rejects_ragged_one() {
        let (tables, report) =
            export_tables(&split_document(), &StitchOptions::default()).expect("export");

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].sheet_name, "Inventory");
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(report.table_count, 3);
        assert_eq!(report.chain_count, 2);
        assert_eq!(report.sheet_count, 1);
        assert_eq!(report.row_count, 2);
        let rejected = report
            .warnings
            .iter()
            .find(|warning| warning.code == WarningCode::MergeRejected)
            .expect("ragged chain is reported");
        assert_eq!(rejected.region, Some(RegionKey::new(1, 1)));
    }

    #[test]
    fn export_is_deterministic() {
        let document = split_document();
        let first = export_tables(&document, &StitchOptions::default()).expect("export");
        let second = export_tables(&document, &StitchOptions::default()).expect("export");
        assert_eq!(first, second);
    }

    #[test]
    fn single_page_single_table_is_one_chain() {
        let document = vec![page(
            0,
            vec![table(
                0,
                0,
                BBox::new(50.0, 300.0, 400.0, 400.0),
                vec![row(&["A", "B"]), row(&["1", "2"])],
            )],
            Vec::new(),
        )];
        let (tables, report) = export_tables(&document, &StitchOptions::default()).expect("export");
        assert_eq!(report.chain_count, 1);
        assert_eq!(tables[0].root, RegionKey::new(0, 0));
        assert_eq!(tables[0].sheet_name, "Table_Page_1_1");
    }

    #[test]
    fn empty_document_warns() {
        let document: Vec<PageGeometry> = vec![page(0, Vec::new(), Vec::new())];
        let (tables, report) = export_tables(&document, &StitchOptions::default()).expect("export");
        assert!(tables.is_empty());
        assert_eq!(report.warnings[0].code, WarningCode::NoTablesDetected);
    }

    #[test]
    fn detect_reports_continuation_of_previous_page() {
        let boxes = detect_page(&split_document(), 2, &StitchOptions::default()).expect("detect");
        assert_eq!(boxes.len(), 2);
        assert!(boxes[0].is_continuation);
        assert_eq!(boxes[0].continued_from, Some(RegionKey::new(0, 0)));
        assert!(!boxes[1].is_continuation);
        assert_eq!(boxes[1].header_label, "Totals");
        assert!((boxes[0].page_height - 792.0).abs() < f64::EPSILON);
    }

    #[test]
    fn detect_on_first_page_has_no_continuations() {
        let boxes = detect_page(&split_document(), 1, &StitchOptions::default()).expect("detect");
        assert_eq!(boxes.len(), 1);
        assert!(!boxes[0].is_continuation);
        assert_eq!(boxes[0].header_label, "Inventory");
    }

    #[test]
    fn detect_rejects_out_of_range_pages() {
        for page_number in [0, 3] {
            let err = detect_page(&split_document(), page_number, &StitchOptions::default())
                .expect_err("page outside document");
            assert!(matches!(
                err,
                ExtractError::InvalidPageNumber { page, page_count: 2 } if page == page_number
            ));
        }
    }

    #[test]
    fn invalid_options_fail_before_extraction() {
        let options = StitchOptions {
            min_cols: 0,
            ..StitchOptions::default()
        };
        assert!(matches!(
            export_tables(&split_document(), &options),
            Err(ExtractError::InvalidOption(_))
        ));
    }
}

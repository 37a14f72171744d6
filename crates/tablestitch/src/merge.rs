use std::fmt::{Display, Formatter};

use crate::header::is_repeated_header;
use crate::model::{Cell, MergedTable, RegionKey, TableRegion};
use crate::warning::{ExtractWarning, WarningCode};

pub(crate) const MAX_SHEET_NAME_CHARS: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['\\', '/', '*', '?', ':', '[', ']'];

/// Why a chain produced no table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MergeRejection {
    MissingHeader,
    ColumnMismatch {
        expected: usize,
        found: usize,
        row: usize,
    },
}

impl Display for MergeRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "chain has no header row"),
            Self::ColumnMismatch {
                expected,
                found,
                row,
            } => write!(
                f,
                "row {row} has {found} column(s), header has {expected}"
            ),
        }
    }
}

#[must_use]
pub fn sanitize_sheet_name(name: &str) -> String {
    let stripped = name
        .chars()
        .filter(|ch| !FORBIDDEN_SHEET_CHARS.contains(ch))
        .collect::<String>();
    stripped.trim().chars().take(MAX_SHEET_NAME_CHARS).collect()
}

pub(crate) fn fallback_sheet_name(root: RegionKey) -> String {
    format!("Table_Page_{}_{}", root.page + 1, root.index + 1)
}

fn to_text(row: Vec<Cell>) -> Vec<String> {
    row.into_iter().map(Option::unwrap_or_default).collect()
}

/// Concatenates a chain's fragments under the root header.
///
/// `fragments` must be in `(page, index)` order with the chain root first.
pub(crate) fn merge_chain(
    root: &TableRegion,
    fragments: &[&TableRegion],
    header_similarity: f64,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<MergedTable, MergeRejection> {
    let mut header: Option<&[Cell]> = None;
    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for (position, fragment) in fragments.iter().enumerate() {
        let Some((first, rest)) = fragment.rows.split_first() else {
            warnings.push(
                ExtractWarning::new(WarningCode::EmptyFragment, "table fragment has no rows")
                    .with_region(fragment.key),
            );
            continue;
        };

        if position == 0 {
            header = Some(first.as_slice());
            rows.extend(rest.iter().cloned());
            continue;
        }

        let repeated = header.is_some_and(|header| {
            is_repeated_header(first, header, header_similarity)
        });
        if !repeated {
            rows.push(first.clone());
        }
        rows.extend(rest.iter().cloned());
    }

    let header = header
        .filter(|header| !header.is_empty())
        .ok_or(MergeRejection::MissingHeader)?;
    if let Some((row, found)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|(_, len)| *len != header.len())
    {
        return Err(MergeRejection::ColumnMismatch {
            expected: header.len(),
            found,
            row,
        });
    }

    let mut sheet_name = sanitize_sheet_name(&root.header_label);
    if sheet_name.is_empty() {
        sheet_name = fallback_sheet_name(root.key);
    }

    Ok(MergedTable {
        sheet_name,
        root: root.key,
        header: to_text(header.to_vec()),
        rows: rows.into_iter().map(to_text).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{MergeRejection, merge_chain, sanitize_sheet_name};
    use crate::model::{BBox, Cell, RegionKey, TableRegion};
    use crate::warning::WarningCode;

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|cell| Some((*cell).to_string())).collect()
    }

    fn region(page: u32, label: &str, rows: Vec<Vec<Cell>>) -> TableRegion {
        TableRegion {
            key: RegionKey::new(page, 0),
            bbox: BBox::new(50.0, 40.0, 500.0, 760.0),
            rows,
            header_label: label.to_string(),
        }
    }

    #[test]
    fn drops_repeated_header_on_continuation() {
        let root = region(
            0,
            "Orders",
            vec![row(&["Name", "Qty", "Price"]), row(&["Pen", "3", "1.50"])],
        );
        let next = region(
            1,
            "",
            vec![row(&["Name", "Qty", "Pric"]), row(&["Book", "1", "9.90"])],
        );
        let mut warnings = Vec::new();

        let merged = merge_chain(&root, &[&root, &next], 0.9, &mut warnings).expect("merged");
        assert_eq!(merged.sheet_name, "Orders");
        assert_eq!(merged.header, vec!["Name", "Qty", "Price"]);
        assert_eq!(
            merged.rows,
            vec![vec!["Pen", "3", "1.50"], vec!["Book", "1", "9.90"]]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn keeps_leading_data_row_on_continuation() {
        let root = region(0, "", vec![row(&["Name", "Qty"]), row(&["Pen", "3"])]);
        let next = region(1, "", vec![row(&["Widget", "4"]), row(&["Book", "1"])]);
        let merged =
            merge_chain(&root, &[&root, &next], 0.9, &mut Vec::new()).expect("merged");
        assert_eq!(merged.rows.len(), 3);
        assert_eq!(merged.rows[1], vec!["Widget", "4"]);
        assert_eq!(merged.sheet_name, "Table_Page_1_1");
    }

    #[test]
    fn label_of_only_forbidden_characters_falls_back() {
        let root = region(2, "[ ]", vec![row(&["Name", "Qty"]), row(&["Pen", "3"])]);
        let merged = merge_chain(&root, &[&root], 0.9, &mut Vec::new()).expect("merged");
        assert_eq!(merged.sheet_name, "Table_Page_3_1");
    }

    #[test]
    fn later_fragments_compare_against_root_header() {
        let root = region(0, "", vec![row(&["Name", "Qty"]), row(&["Pen", "3"])]);
        let second = region(1, "", vec![row(&["Name", "Qty"]), row(&["Ink", "2"])]);
        let third = region(2, "", vec![row(&["Name", "Qty"]), row(&["Cap", "7"])]);
        let merged = merge_chain(&root, &[&root, &second, &third], 0.9, &mut Vec::new())
            .expect("merged");
        assert_eq!(
            merged.rows,
            vec![vec!["Pen", "3"], vec!["Ink", "2"], vec!["Cap", "7"]]
        );
    }

    #[test]
    fn rejects_ragged_chain() {
        let root = region(0, "", vec![row(&["A", "B"]), row(&["1", "2"])]);
        let next = region(1, "", vec![row(&["3", "4", "5"])]);
        let err = merge_chain(&root, &[&root, &next], 0.9, &mut Vec::new())
            .expect_err("ragged chain should be rejected");
        assert_eq!(
            err,
            MergeRejection::ColumnMismatch {
                expected: 2,
                found: 3,
                row: 1
            }
        );
    }

    #[test]
    fn empty_root_means_missing_header() {
        let root = region(0, "", Vec::new());
        let next = region(1, "", vec![row(&["A", "B"])]);
        let mut warnings = Vec::new();
        let err = merge_chain(&root, &[&root, &next], 0.9, &mut warnings)
            .expect_err("chain without header should be rejected");
        assert_eq!(err, MergeRejection::MissingHeader);
        assert_eq!(warnings[0].code, WarningCode::EmptyFragment);
    }

    #[test]
    fn null_cells_become_empty_strings() {
        let root = region(
            0,
            "",
            vec![row(&["A", "B"]), vec![Some("1".to_string()), None]],
        );
        let merged = merge_chain(&root, &[&root], 0.9, &mut Vec::new()).expect("merged");
        assert_eq!(merged.rows, vec![vec!["1", ""]]);
    }

    #[test]
    fn sanitizes_forbidden_characters() {
        let name = sanitize_sheet_name("Shipment/Manifest: Q1 [Draft]");
        assert_eq!(name, "ShipmentManifest Q1 Draft");
        assert!(name.chars().count() <= 31);
    }

    #[test]
    fn truncates_long_names_to_31_chars() {
        let name = sanitize_sheet_name("  Quarterly revenue by region and product line  ");
        assert_eq!(name, "Quarterly revenue by region and");
        assert_eq!(name.chars().count(), 31);
    }
}

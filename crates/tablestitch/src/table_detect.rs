use crate::model::{BBox, Cell, RegionKey, TableRegion, Word};
use crate::table_parse::{TextLine, group_lines, split_line_into_cells};

/// Vertical gap, in line heights, that ends a table even when the next line
/// still has enough cells.
const MAX_ROW_GAP_LINES: f64 = 2.0;

struct Candidate<'a> {
    lines: Vec<&'a TextLine<'a>>,
    rows: Vec<Vec<Cell>>,
}

impl Candidate<'_> {
    fn bbox(&self) -> Option<BBox> {
        self.lines
            .iter()
            .flat_map(|line| line.words.iter())
            .map(|word| BBox::new(word.x0, word.top, word.x1, word.bottom))
            .reduce(BBox::union)
    }
}

fn starts_new_table(previous: &TextLine<'_>, line: &TextLine<'_>) -> bool {
    let height = previous.height().max(line.height()).max(1.0);
    line.baseline - previous.baseline > height * MAX_ROW_GAP_LINES
}

/// Finds runs of at least two consecutive multi-cell lines on one page.
pub(crate) fn detect_tables_in_page(
    page: u32,
    words: &[Word],
    min_cols: usize,
    line_tolerance: f64,
) -> Vec<TableRegion> {
    let lines = group_lines(words, line_tolerance);
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut current: Option<Candidate<'_>> = None;

    for line in &lines {
        let cells = split_line_into_cells(line);
        if cells.len() < min_cols {
            candidates.extend(current.take());
            continue;
        }

        if let Some(open) = current.as_mut() {
            let continues = open
                .lines
                .last()
                .is_some_and(|previous| !starts_new_table(previous, line));
            if continues {
                open.lines.push(line);
                open.rows.push(cells.into_iter().map(Some).collect());
                continue;
            }
            candidates.extend(current.take());
        }

        current = Some(Candidate {
            lines: vec![line],
            rows: vec![cells.into_iter().map(Some).collect()],
        });
    }
    candidates.extend(current);

    candidates
        .into_iter()
        .filter(|candidate| candidate.rows.len() >= 2)
        .filter_map(|candidate| candidate.bbox().map(|bbox| (bbox, candidate.rows)))
        .enumerate()
        .map(|(index, (bbox, rows))| TableRegion {
            key: RegionKey::new(page, index),
            bbox,
            rows,
            header_label: String::new(),
        })
        .collect()
}

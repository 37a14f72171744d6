use crate::model::Word;

/// Horizontal gap, in character widths, that separates two cells. One blank
/// is a single advance and two blanks are two, so the cut sits between them.
const CELL_GAP_CHARS: f64 = 1.5;

/// Words sharing a baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextLine<'a> {
    pub baseline: f64,
    pub words: Vec<&'a Word>,
}

impl TextLine<'_> {
    pub(crate) fn height(&self) -> f64 {
        self.words
            .iter()
            .map(|word| word.bottom - word.top)
            .fold(0.0, f64::max)
    }
}

/// Groups words into lines, top to bottom.
pub(crate) fn group_lines(words: &[Word], line_tolerance: f64) -> Vec<TextLine<'_>> {
    let mut sorted = words.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| {
        left.bottom
            .total_cmp(&right.bottom)
            .then(left.x0.total_cmp(&right.x0))
    });

    let mut lines: Vec<TextLine<'_>> = Vec::new();
    for word in sorted {
        match lines.last_mut() {
            Some(line) if (word.bottom - line.baseline).abs() < line_tolerance => {
                line.words.push(word);
            }
            _ => lines.push(TextLine {
                baseline: word.bottom,
                words: vec![word],
            }),
        }
    }

    for line in &mut lines {
        line.words.sort_by(|left, right| left.x0.total_cmp(&right.x0));
    }
    lines
}

#[allow(clippy::cast_precision_loss)]
fn char_width(word: &Word) -> f64 {
    let chars = word.text.chars().count().max(1);
    (word.x1 - word.x0) / chars as f64
}

/// Splits a line into cells wherever the horizontal gap between two words is
/// at least [`CELL_GAP_CHARS`] character widths, the positional form of
/// "two or more blanks".
pub(crate) fn split_line_into_cells(line: &TextLine<'_>) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut previous: Option<&Word> = None;

    for word in &line.words {
        if let Some(prev) = previous {
            let gap = word.x0 - prev.x1;
            let width = char_width(prev).min(char_width(word));
            if gap >= width * CELL_GAP_CHARS {
                cells.push(std::mem::take(&mut current));
            } else {
                current.push(' ');
            }
        }
        current.push_str(&word.text);
        previous = Some(word);
    }

    if !current.is_empty() {
        cells.push(current);
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::{group_lines, split_line_into_cells};
    use crate::model::Word;

    // Monospace word: 6 units per character, 10 units tall.
    fn word(text: &str, column: usize, baseline: f64) -> Word {
        #[allow(clippy::cast_precision_loss)]
        let x0 = 50.0 + column as f64 * 6.0;
        #[allow(clippy::cast_precision_loss)]
        let width = text.chars().count() as f64 * 6.0;
        Word {
            text: text.to_string(),
            x0,
            top: baseline - 10.0,
            x1: x0 + width,
            bottom: baseline,
        }
    }

    #[test]
    fn groups_words_by_baseline() {
        let words = vec![
            word("b", 4, 120.0),
            word("a", 0, 100.0),
            word("c", 0, 121.0),
        ];
        let lines = group_lines(&words, 2.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].words[0].text, "c");
        assert_eq!(lines[1].words[1].text, "b");
    }

    #[test]
    fn splits_double_space_separated_cells() {
        // "Unit price  Qty"
        let words = vec![
            word("Unit", 0, 100.0),
            word("price", 5, 100.0),
            word("Qty", 12, 100.0),
        ];
        let lines = group_lines(&words, 2.0);
        assert_eq!(split_line_into_cells(&lines[0]), vec!["Unit price", "Qty"]);
    }

    #[test]
    fn single_blank_stays_inside_a_cell() {
        // "Blue pen  3": one blank, then two.
        let words = vec![
            word("Blue", 0, 100.0),
            word("pen", 5, 100.0),
            word("3", 10, 100.0),
        ];
        let lines = group_lines(&words, 2.0);
        assert_eq!(split_line_into_cells(&lines[0]), vec!["Blue pen", "3"]);
    }

    #[test]
    fn line_height_is_tallest_word() {
        let words = vec![word("a", 0, 100.0)];
        let lines = group_lines(&words, 2.0);
        assert!((lines[0].height() - 10.0).abs() < f64::EPSILON);
    }
}

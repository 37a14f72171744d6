use crate::model::{BBox, Word};

/// Label for a table: the nearest text line above it, else the nearest line
/// below it, else an empty string.
pub(crate) fn label(bbox: &BBox, words: &[Word], line_tolerance: f64) -> String {
    let mut above: Option<&Word> = None;
    let mut below: Option<&Word> = None;

    for word in words {
        if word.bottom < bbox.top {
            if above.is_none_or(|best| word.bottom > best.bottom) {
                above = Some(word);
            }
        } else if word.top > bbox.bottom && below.is_none_or(|best| word.top < best.top) {
            below = Some(word);
        }
    }

    if let Some(anchor) = above {
        return join_line(words, |word| {
            (word.bottom - anchor.bottom).abs() < line_tolerance
        });
    }
    if let Some(anchor) = below {
        return join_line(words, |word| (word.top - anchor.top).abs() < line_tolerance);
    }
    String::new()
}

fn join_line(words: &[Word], on_line: impl Fn(&Word) -> bool) -> String {
    let mut line = words.iter().filter(|word| on_line(word)).collect::<Vec<_>>();
    line.sort_by(|left, right| left.x0.total_cmp(&right.x0));
    line.iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

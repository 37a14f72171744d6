use crate::model::Cell;

fn joined(row: &[Cell]) -> Vec<char> {
    row.iter()
        .map(|cell| cell.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .collect()
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
/// Ties resolve to the block ending earliest in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut prev = vec![0_usize; bhi - blo + 1];
    let mut curr = vec![0_usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            curr[slot] = if a[i] == b[j] { prev[slot - 1] + 1 } else { 0 };
            let len = curr[slot];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![((0, a.len()), (0, b.len()))];

    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, len) = longest_match(a, b, (alo, ahi), (blo, bhi));
        if len == 0 {
            continue;
        }
        total += len;
        pending.push(((alo, i), (blo, j)));
        pending.push(((i + len, ahi), (j + len, bhi)));
    }

    total
}

/// Gestalt pattern-matching similarity, `2 * matches / (len(a) + len(b))`.
pub(crate) fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    ratio(&a, &b)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

/// Whether `candidate` is the chain header printed again atop a continuation
/// fragment. Always compared against the chain root's header.
pub(crate) fn is_repeated_header(candidate: &[Cell], root_header: &[Cell], threshold: f64) -> bool {
    if candidate.is_empty() || root_header.is_empty() || candidate.len() != root_header.len() {
        return false;
    }
    ratio(&joined(candidate), &joined(root_header)) > threshold
}

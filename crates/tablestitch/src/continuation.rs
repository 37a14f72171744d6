use crate::model::{BBox, RegionKey};
use crate::options::StitchOptions;

/// Geometry-only continuation test between a table and one on the page before.
///
/// Two unrelated tables that happen to share the same horizontal band, with
/// the first touching the page bottom and the second the page top, are
/// reported as a continuation. Nothing at this stage looks at cell text.
pub(crate) fn is_continuation(
    curr: &BBox,
    prev: &BBox,
    page_height_prev: f64,
    options: &StitchOptions,
) -> bool {
    let same_x = (curr.x0 - prev.x0).abs() < options.align_tolerance
        && (curr.x1 - prev.x1).abs() < options.align_tolerance;
    let prev_near_bottom = prev.bottom > page_height_prev - options.edge_margin;
    let curr_near_top = curr.top < options.edge_margin;

    same_x && prev_near_bottom && curr_near_top
}

/// First table on the previous page, in page order, that `curr` continues.
pub(crate) fn find_predecessor<'a>(
    curr: &BBox,
    prev_tables: impl IntoIterator<Item = (RegionKey, &'a BBox)>,
    page_height_prev: f64,
    options: &StitchOptions,
) -> Option<RegionKey> {
    prev_tables
        .into_iter()
        .find(|(_, prev)| is_continuation(curr, prev, page_height_prev, options))
        .map(|(key, _)| key)
}

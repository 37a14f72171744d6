use crate::error::ExtractError;
use crate::model::PageGeometry;

/// Source of per-page table regions and positioned words.
///
/// Pages are addressed by zero-based index. Implementations leave
/// `header_label` empty; labels are assigned by the export pass.
pub trait GeometryProvider {
    fn page_count(&self) -> usize;

    fn page(&self, page: u32) -> Result<PageGeometry, ExtractError>;
}

/// Pre-computed geometry, one entry per page in page order.
impl GeometryProvider for [PageGeometry] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page(&self, page: u32) -> Result<PageGeometry, ExtractError> {
        usize::try_from(page)
            .ok()
            .and_then(|index| self.get(index))
            .cloned()
            .ok_or(ExtractError::InvalidPageNumber {
                page: page.saturating_add(1),
                page_count: self.len(),
            })
    }
}

impl GeometryProvider for Vec<PageGeometry> {
    fn page_count(&self) -> usize {
        self.as_slice().page_count()
    }

    fn page(&self, page: u32) -> Result<PageGeometry, ExtractError> {
        self.as_slice().page(page)
    }
}

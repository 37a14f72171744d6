/// Axis-aligned box in page space: origin top-left, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    #[must_use]
    pub const fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

/// Identifies a table region: zero-based page and ordinal within the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionKey {
    pub page: u32,
    pub index: usize,
}

impl RegionKey {
    #[must_use]
    pub const fn new(page: u32, index: usize) -> Self {
        Self { page, index }
    }
}

pub type Cell = Option<String>;

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub key: RegionKey,
    pub bbox: BBox,
    pub rows: Vec<Vec<Cell>>,
    pub header_label: String,
}

/// Everything the engine needs to know about one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub page: u32,
    pub width: f64,
    pub height: f64,
    pub tables: Vec<TableRegion>,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTable {
    pub sheet_name: String,
    pub root: RegionKey,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Diagnostic record for detect-only mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub header_label: String,
    pub is_continuation: bool,
    pub continued_from: Option<RegionKey>,
}

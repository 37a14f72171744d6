use crate::error::ExtractError;

pub const DEFAULT_ALIGN_TOLERANCE: f64 = 5.0;
pub const DEFAULT_EDGE_MARGIN: f64 = 100.0;
pub const DEFAULT_HEADER_SIMILARITY: f64 = 0.9;
pub const DEFAULT_LINE_TOLERANCE: f64 = 2.0;

/// Tunables for labelling, continuation detection and merging.
///
/// Thresholds are in page coordinate units, so documents produced at an
/// unusual scale may need different values.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchOptions {
    /// Maximum difference between left (and right) edges of two fragments.
    pub align_tolerance: f64,
    /// Distance from the page bottom (previous page) or top (next page)
    /// within which a table counts as touching that edge.
    pub edge_margin: f64,
    /// Similarity ratio a leading row must exceed to count as a repeated header.
    pub header_similarity: f64,
    /// Vertical distance under which words share a text line.
    pub line_tolerance: f64,
    pub min_cols: usize,
    pub delimiter: u8,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            align_tolerance: DEFAULT_ALIGN_TOLERANCE,
            edge_margin: DEFAULT_EDGE_MARGIN,
            header_similarity: DEFAULT_HEADER_SIMILARITY,
            line_tolerance: DEFAULT_LINE_TOLERANCE,
            min_cols: 2,
            delimiter: b',',
        }
    }
}

impl StitchOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        require_positive(self.align_tolerance, "align_tolerance")?;
        require_positive(self.edge_margin, "edge_margin")?;
        require_positive(self.line_tolerance, "line_tolerance")?;
        if self.header_similarity.is_nan()
            || self.header_similarity <= 0.0
            || self.header_similarity > 1.0
        {
            return Err(ExtractError::InvalidOption(
                "header_similarity must be within (0, 1]".to_string(),
            ));
        }
        if self.min_cols < 2 {
            return Err(ExtractError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

fn require_positive(value: f64, name: &str) -> Result<(), ExtractError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ExtractError::InvalidOption(format!(
            "{name} must be a positive number"
        )))
    }
}

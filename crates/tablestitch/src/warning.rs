use crate::model::RegionKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningCode {
    MergeRejected,
    EmptyFragment,
    NoTablesDetected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub region: Option<RegionKey>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            region: None,
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: RegionKey) -> Self {
        self.region = Some(region);
        self
    }
}

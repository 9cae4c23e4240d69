use crate::workflow::report::{BatchSummary, ScanReport};
use serde::Serialize;

/// Latest results exposed to external viewers.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BridgeModel {
    pub summary: Option<BatchSummary>,
    pub last_scan: Option<ScanReport>,
}

impl BridgeModel {
    pub fn new() -> Self {
        Self::default()
    }
}

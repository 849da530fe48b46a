use std::path::PathBuf;

/// Snapshot of the engine state published to presentation adapters.
///
/// `version` changes exactly when `current_path` changes, so a polling or
/// push-based display layer can detect "new image" without comparing bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStatus {
    pub current_path: Option<PathBuf>,
    pub version: u64,
    pub matching_count: usize,
    pub discovered_count: usize,
    pub failed_count: u32,
    pub non_image_count: u32,
}

impl EngineStatus {
    pub fn is_empty(&self) -> bool {
        self.current_path.is_none()
    }
}

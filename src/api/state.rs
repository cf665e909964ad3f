use std::sync::Arc;

use crate::analysis::Detector;
use crate::config::DetectorConfig;
use crate::sink::MemoryOutlierSink;

#[derive(Clone)]
pub struct AppState {
    pub detector: Detector,
    pub outliers: Arc<MemoryOutlierSink>,
}

impl AppState {
    /// Detector wired to an in-memory outlier sink the API can query.
    pub fn new(config: DetectorConfig) -> Self {
        let outliers = Arc::new(MemoryOutlierSink::new());
        let detector = Detector::new(config).with_sink(outliers.clone());
        Self { detector, outliers }
    }
}

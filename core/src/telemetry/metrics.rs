use std::sync::Mutex;

/// Counters for a batch of scans.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub processed: usize,
    pub errors: usize,
    pub centers: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_processed(&self, centers: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
            metrics.centers += centers;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_processed_errors_and_centers() {
        let recorder = MetricsRecorder::new();
        recorder.record_processed(3);
        recorder.record_processed(0);
        recorder.record_error();
        assert_eq!(
            recorder.snapshot(),
            Metrics {
                processed: 2,
                errors: 1,
                centers: 3
            }
        );
    }
}

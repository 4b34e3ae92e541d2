//! Progress notifications emitted while downloading.
//!
//! Progress is purely observational: callbacks never influence control flow.

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Segment fetching is about to start.
    SegmentsStarted { total: usize },
    /// One more segment finished; `completed` counts every finished segment so far.
    SegmentCompleted { completed: usize, total: usize },
    /// Bytes received by a direct download. `total` is the advertised length, if any.
    BytesReceived { downloaded: u64, total: Option<u64> },
    /// The output file is complete.
    Finished { path: PathBuf },
}

impl ProgressEvent {
    /// Percentage carried by this event, when it has one.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            Self::SegmentCompleted { completed, total } => {
                Some(percentage(*completed as u64, *total as u64))
            }
            Self::BytesReceived {
                downloaded,
                total: Some(total),
            } => Some(percentage(*downloaded, *total)),
            _ => None,
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync + 'static>;

/// Completion percentage clamped to `[0, 100]`. An empty total counts as done.
pub fn percentage(current: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((current as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

pub(crate) fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_clamped() {
        assert_eq!(percentage(0, 0), 100.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(8, 4), 100.0);
    }

    #[test]
    fn event_percentage() {
        let event = ProgressEvent::SegmentCompleted {
            completed: 3,
            total: 4,
        };
        assert_eq!(event.percentage(), Some(75.0));

        let unmetered = ProgressEvent::BytesReceived {
            downloaded: 10,
            total: None,
        };
        assert_eq!(unmetered.percentage(), None);
    }
}

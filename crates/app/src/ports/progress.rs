//! Progress port — completed/total signals for progress UI.
//!
//! Emitted after every unit of apply work. Consumers use this for display
//! only; it never influences control flow.

use std::future::Future;

use serde::Serialize;

/// A point-in-time progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion percentage, saturating at 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.completed * 100) / self.total;
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

/// Receives progress snapshots from an apply pass.
pub trait ProgressSink: Send + Sync {
    /// Deliver one snapshot. Must not fail — progress is best-effort.
    fn report(&self, progress: Progress) -> impl Future<Output = ()> + Send;
}

/// Sink that drops every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn report(&self, _progress: Progress) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl<T: ProgressSink + Send + Sync> ProgressSink for std::sync::Arc<T> {
    fn report(&self, progress: Progress) -> impl Future<Output = ()> + Send {
        (**self).report(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compute_percentage_from_completed_and_total() {
        let progress = Progress {
            completed: 3,
            total: 12,
        };
        assert_eq!(progress.percent(), 25);
    }

    #[test]
    fn should_report_one_hundred_percent_for_empty_totals() {
        let progress = Progress {
            completed: 0,
            total: 0,
        };
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn should_saturate_percentage_at_one_hundred() {
        let progress = Progress {
            completed: 7,
            total: 5,
        };
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn should_serialize_progress_fields() {
        let progress = Progress {
            completed: 1,
            total: 4,
        };
        let json = serde_json::to_value(progress).unwrap();
        assert_eq!(json["completed"], 1);
        assert_eq!(json["total"], 4);
    }

    #[tokio::test]
    async fn should_accept_reports_on_the_null_sink() {
        NullProgressSink
            .report(Progress {
                completed: 1,
                total: 2,
            })
            .await;
    }
}

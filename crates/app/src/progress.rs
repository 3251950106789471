//! In-process progress fan-out backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use crate::ports::{Progress, ProgressSink};

/// Progress sink that fans snapshots out to any number of subscribers.
///
/// Reporting succeeds even when there are no active subscribers
/// (the snapshot is simply dropped).
#[derive(Debug, Clone)]
pub struct BroadcastProgress {
    sender: broadcast::Sender<Progress>,
}

impl BroadcastProgress {
    /// Create a new fan-out with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to snapshots reported *after* the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Progress> {
        self.sender.subscribe()
    }
}

impl ProgressSink for BroadcastProgress {
    fn report(&self, progress: Progress) -> impl Future<Output = ()> + Send {
        // send fails only when there are zero receivers, which is fine.
        let _ = self.sender.send(progress);
        async {}
    }
}

use std::future::Future;

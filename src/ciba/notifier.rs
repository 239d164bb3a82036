//! In-memory long-poll notifier (spec §4.4 "Long-polling notifier").
//!
//! One process-wide map from `auth_req_id` to a [`tokio::sync::Notify`],
//! the same broadcast-to-all-waiters primitive the teacher crate's
//! shutdown-signal plumbing is built on (`Notify::notify_waiters`
//! wakes every outstanding `notified()` future, matching "Multiple
//! waiters for the same id must all wake").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::interfaces::BackChannelNotifier;

#[derive(Default)]
pub struct InMemoryBackChannelNotifier {
    waiters: Mutex<HashMap<String, Arc<Notify>>>,
}

impl InMemoryBackChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &str) -> Arc<Notify> {
        self.waiters.lock().entry(id.to_owned()).or_insert_with(|| Arc::new(Notify::new())).clone()
    }
}

#[async_trait]
impl BackChannelNotifier for InMemoryBackChannelNotifier {
    /// Returns `true` iff notified before `timeout` elapses; cancellation
    /// is the caller's responsibility via `tokio::select!` around this
    /// future (spec §5 "Long-poll waits honor cancellation immediately").
    async fn wait_for_status_change(&self, id: &str, timeout: Duration) -> bool {
        let notify = self.entry(id);
        tokio::time::timeout(timeout, notify.notified()).await.is_ok()
    }

    async fn notify_status_change(&self, id: &str) {
        let notify = self.entry(id);
        notify.notify_waiters();
        self.waiters.lock().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wakes_waiter_on_notify() {
        let notifier = Arc::new(InMemoryBackChannelNotifier::new());
        let waiter = {
            let notifier = notifier.clone();
            tokio::spawn(async move { notifier.wait_for_status_change("req-1", Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        notifier.notify_status_change("req-1").await;

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn times_out_without_notification() {
        let notifier = InMemoryBackChannelNotifier::new();
        assert!(!notifier.wait_for_status_change("req-2", Duration::from_millis(20)).await);
    }
}

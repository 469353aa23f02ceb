//! Background work for the controller.
//!
//! Every task ends by sending one message back over an unbounded channel;
//! the controller applies those messages on its own task.
//!
//! - [`TaskManager::debounce`] runs a keyed timer; scheduling the same key again
//!   aborts the previous timer, so only the latest one can fire
//! - [`TaskManager::spawn`] runs a request to completion; requests are never
//!   aborted, their results are filtered by the receiver instead

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Identifies a debounce slot.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskKey(&'static str);

impl TaskKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }
}

pub struct TaskManager<M> {
    timers: HashMap<TaskKey, AbortHandle>,
    tx: mpsc::UnboundedSender<M>,
}

impl<M> TaskManager<M>
where
    M: Send + 'static,
{
    pub fn new(tx: mpsc::UnboundedSender<M>) -> Self {
        Self {
            timers: HashMap::new(),
            tx,
        }
    }

    /// Send `message` after `duration`, replacing any timer under `key`.
    pub fn debounce(&mut self, key: TaskKey, duration: Duration, message: M) {
        self.cancel(&key);
        tracing::trace!(key = key.0, ?duration, "debounce scheduled");

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(message);
        });

        self.timers.insert(key, handle.abort_handle());
    }

    /// Run `future` to completion and send its output.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = M> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = future.await;
            let _ = tx.send(message);
        });
    }

    /// Abort the timer under `key`, if any.
    pub fn cancel(&mut self, key: &TaskKey) {
        if let Some(handle) = self.timers.remove(key) {
            tracing::trace!(key = key.0, "debounce cancelled");
            handle.abort();
        }
    }

    /// Forget a timer that has already fired.
    pub fn finish(&mut self, key: &TaskKey) {
        self.timers.remove(key);
    }

    pub fn is_pending(&self, key: &TaskKey) -> bool {
        self.timers.contains_key(key)
    }
}

impl<M> Drop for TaskManager<M> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: TaskKey = TaskKey::new("test");

    #[tokio::test(start_paused = true)]
    async fn spawn_sends_output() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tasks = TaskManager::new(tx);

        tasks.spawn(async { 42 });

        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_waits_for_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.debounce(KEY, Duration::from_millis(50), 1);

        let early = tokio::time::timeout(Duration::from_millis(30), rx.recv()).await;
        assert!(early.is_err());

        let msg = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout");
        assert_eq!(msg, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_resets_previous_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.debounce(KEY, Duration::from_millis(50), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        tasks.debounce(KEY, Duration::from_millis(50), 2);

        assert_eq!(rx.recv().await, Some(2));

        let more = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(more.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
        let mut tasks = TaskManager::new(tx);

        tasks.debounce(KEY, Duration::from_millis(50), 1);
        assert!(tasks.is_pending(&KEY));

        tasks.cancel(&KEY);
        assert!(!tasks.is_pending(&KEY));

        let result = tokio::time::timeout(Duration::from_millis(150), rx.recv()).await;
        assert!(result.is_err());
    }
}

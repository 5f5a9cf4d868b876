//! Named, cancellable countdown handle.
//!
//! Each [`arm`](CountdownTimer::arm) spawns one sleeping task and returns an
//! arm id. Re-arming or cancelling invalidates the previous id, and the
//! callback receives the id it was armed with so the owner can check
//! [`take_if_current`](CountdownTimer::take_if_current) under its own lock.
//! This closes the window between the sleep completing and a concurrent cancel.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

struct Armed {
    id: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
pub struct CountdownTimer {
    armed: Option<Armed>,
    next_id: u64,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending countdown and start a new one on `runtime`.
    ///
    /// The caller may be on any thread; the countdown task runs on `runtime`.
    pub fn arm<F>(&mut self, runtime: &Handle, after: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();

        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();

        runtime.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(after) => on_fire(id),
            }
        });

        self.armed = Some(Armed { id, cancel });
        id
    }

    /// Cancel the pending countdown. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some_and(|armed| {
            armed.cancel.cancel();
            true
        })
    }

    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed_id(&self) -> Option<u64> {
        self.armed.as_ref().map(|a| a.id)
    }

    /// Disarm if `id` is the current arm. Returns whether the fire should proceed.
    pub fn take_if_current(&mut self, id: u64) -> bool {
        if self.armed_id() == Some(id) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("armed_id", &self.armed_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce(u64) + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&fired);
        (fired, move |_| {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_duration() {
        let mut timer = CountdownTimer::new();
        let (fired, on_fire) = counter();
        timer.arm(&Handle::current(), Duration::from_millis(3000), on_fire);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let mut timer = CountdownTimer::new();
        let (fired, on_fire) = counter();
        timer.arm(&Handle::current(), Duration::from_millis(100), on_fire);
        assert!(timer.cancel());
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous() {
        let mut timer = CountdownTimer::new();
        let last_id = Arc::new(AtomicU64::new(0));

        let seen = Arc::clone(&last_id);
        let first = timer.arm(&Handle::current(), Duration::from_millis(100), move |id| {
            seen.store(id, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = Arc::clone(&last_id);
        let second = timer.arm(&Handle::current(), Duration::from_millis(100), move |id| {
            seen.store(id, Ordering::SeqCst);
        });
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_millis(75)).await;
        assert_eq!(last_id.load(Ordering::SeqCst), 0, "first arm was cancelled");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(last_id.load(Ordering::SeqCst), second);
    }

    #[tokio::test]
    async fn test_take_if_current() {
        let mut timer = CountdownTimer::new();
        let id = timer.arm(&Handle::current(), Duration::from_secs(60), |_| {});
        assert!(!timer.take_if_current(id + 1));
        assert!(timer.is_armed());
        assert!(timer.take_if_current(id));
        assert!(!timer.is_armed());
        assert!(!timer.take_if_current(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_from_foreign_thread() {
        let runtime = Handle::current();
        let (fired, on_fire) = counter();
        let timer = std::thread::spawn(move || {
            let mut timer = CountdownTimer::new();
            timer.arm(&runtime, Duration::from_millis(250), on_fire);
            timer
        })
        .join()
        .unwrap();
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Start-once / shut-down-once state machine.
//!
//! ```text
//! unborn --try_start--> starting --mark_running--> running
//!    |                      |                         |
//!    |                 abort_start             begin_shutdown
//!    |                      |                         v
//!    +---begin_shutdown-----+-------------------> stopping --finish_shutdown--> dead
//! ```
//!
//! Every transition is guarded twice: an atomic read for the fast path, then
//! a re-check under a lock. Only one caller ever wins `try_start` and only one
//! ever wins `begin_shutdown`.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};

/// Lifecycle flags and wake-up primitives for one server, client or
/// server-side connection.
///
/// # Examples
///
/// ```rust
/// use tether::endpoint::Lifecycle;
///
/// let lifecycle = Lifecycle::new();
/// assert!(lifecycle.try_start());
/// assert!(!lifecycle.try_start());
/// assert!(lifecycle.mark_running());
///
/// assert_eq!(lifecycle.begin_shutdown(), Some(true));
/// assert_eq!(lifecycle.begin_shutdown(), None);
/// lifecycle.finish_shutdown();
/// assert!(!lifecycle.is_alive());
/// ```
#[derive(Debug)]
pub struct Lifecycle {
    started: AtomicBool,
    running: AtomicBool,
    alive: AtomicBool,
    stopping: AtomicBool,
    guard: Mutex<()>,
    stop: watch::Sender<bool>,
    wake: Notify,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Creates an unborn lifecycle: alive, not started, not running.
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            stopping: AtomicBool::new(false),
            guard: Mutex::new(()),
            stop,
            wake: Notify::new(),
        }
    }

    /// Claims the one start attempt.
    ///
    /// Returns `false` if a start was already attempted or the object is
    /// dead or stopping.
    pub fn try_start(&self) -> bool {
        if self.started.load(Ordering::Acquire) || !self.is_alive() {
            return false;
        }
        let _guard = self.guard.lock();
        if self.started.load(Ordering::Acquire) || self.stopping.load(Ordering::Acquire) {
            return false;
        }
        self.started.store(true, Ordering::Release);
        true
    }

    /// Promotes a started object to running.
    ///
    /// Returns `false` if a shutdown began while the start was in progress;
    /// the caller must then release whatever it acquired.
    pub fn mark_running(&self) -> bool {
        let _guard = self.guard.lock();
        if self.stopping.load(Ordering::Acquire) || !self.started.load(Ordering::Acquire) {
            return false;
        }
        self.running.store(true, Ordering::Release);
        true
    }

    /// Records a failed start. The object is dead and no notifications fire.
    pub fn abort_start(&self) {
        {
            let _guard = self.guard.lock();
            self.stopping.store(true, Ordering::Release);
            self.running.store(false, Ordering::Release);
        }
        self.stop.send_replace(true);
        self.finish_shutdown();
    }

    /// Claims the one shutdown.
    ///
    /// Returns `None` to every caller but the first. The first caller gets
    /// `Some(was_running)` and must call [`finish_shutdown`](Self::finish_shutdown)
    /// once teardown is complete.
    pub fn begin_shutdown(&self) -> Option<bool> {
        if self.stopping.load(Ordering::Acquire) {
            return None;
        }
        let was_running = {
            let _guard = self.guard.lock();
            if self.stopping.load(Ordering::Acquire) {
                return None;
            }
            self.stopping.store(true, Ordering::Release);
            self.running.swap(false, Ordering::AcqRel)
        };
        self.stop.send_replace(true);
        Some(was_running)
    }

    /// Marks teardown complete and wakes every `sync` waiter.
    pub fn finish_shutdown(&self) {
        self.alive.store(false, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Returns `true` while actively accepting and dispatching.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns `true` until teardown has finished.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Returns `true` once a start was attempted.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Returns `true` once a shutdown (or failed start) has begun.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Resolves once shutdown has begun. Used by background loops.
    pub async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }

    fn settled(&self) -> bool {
        !self.is_running() && !(self.is_stopping() && self.is_alive())
    }

    /// Waits until teardown finishes or [`unsync`](Self::unsync) is called.
    ///
    /// Returns immediately if not running and no teardown is in progress.
    pub async fn sync(&self) {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.settled() {
            return;
        }
        notified.await;
    }

    /// Like [`sync`](Self::sync), giving up after `timeout`.
    ///
    /// Returns `true` if woken (or there was nothing to wait for) and `false`
    /// if the timeout elapsed.
    pub async fn sync_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.sync()).await.is_ok()
    }

    /// Wakes every current `sync` waiter without changing state.
    pub fn unsync(&self) {
        self.wake.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_start_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.is_alive());
        assert!(!lifecycle.is_started());

        assert!(lifecycle.try_start());
        assert!(lifecycle.is_started());
        assert!(!lifecycle.is_running());
        assert!(lifecycle.mark_running());
        assert!(lifecycle.is_running());

        assert!(!lifecycle.try_start());
    }

    #[test]
    fn test_failed_start_is_terminal() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.try_start());
        lifecycle.abort_start();

        assert!(!lifecycle.is_alive());
        assert!(!lifecycle.is_running());
        assert!(!lifecycle.try_start());
        assert_eq!(lifecycle.begin_shutdown(), None);
    }

    #[test]
    fn test_shutdown_during_start_blocks_promotion() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.try_start());
        assert_eq!(lifecycle.begin_shutdown(), Some(false));
        assert!(!lifecycle.mark_running());
        assert!(!lifecycle.is_running());
    }

    #[test]
    fn test_shutdown_before_start_kills() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.begin_shutdown(), Some(false));
        lifecycle.finish_shutdown();
        assert!(!lifecycle.try_start());
    }

    #[test]
    fn test_concurrent_start_has_one_winner() {
        let lifecycle = Arc::new(Lifecycle::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if lifecycle.try_start() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_shutdown_has_one_winner() {
        let lifecycle = Arc::new(Lifecycle::new());
        assert!(lifecycle.try_start());
        assert!(lifecycle.mark_running());
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if let Some(was_running) = lifecycle.begin_shutdown() {
                        assert!(was_running);
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_returns_when_not_running() {
        let lifecycle = Lifecycle::new();
        lifecycle.sync().await;
        assert!(lifecycle.sync_timeout(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_sync_wakes_on_shutdown() {
        let lifecycle = Arc::new(Lifecycle::new());
        assert!(lifecycle.try_start());
        assert!(lifecycle.mark_running());

        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.sync().await })
        };
        tokio::task::yield_now().await;

        assert_eq!(lifecycle.begin_shutdown(), Some(true));
        lifecycle.finish_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_timeout_and_unsync() {
        let lifecycle = Arc::new(Lifecycle::new());
        assert!(lifecycle.try_start());
        assert!(lifecycle.mark_running());

        assert!(!lifecycle.sync_timeout(Duration::from_millis(20)).await);

        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.sync_timeout(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        lifecycle.unsync();

        assert!(waiter.await.unwrap());
        assert!(lifecycle.is_running());
    }

    #[tokio::test]
    async fn test_stopped_resolves_after_shutdown() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.begin_shutdown(), Some(false));
        tokio::time::timeout(Duration::from_secs(1), lifecycle.stopped())
            .await
            .unwrap();
    }
}

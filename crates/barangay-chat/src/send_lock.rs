// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Disable-on-submit for one staff console.
//!
//! Guards against an accidental double submit from a single UI. It provides
//! no guarantee across clients; ownership checks in the coordinator do that.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SendLock {
    interval: Duration,
    locked_until: Option<Instant>,
}

impl SendLock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            locked_until: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Take the lock if it is free. The lock then stays held for the interval.
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        if self.locked_until.is_some_and(|until| now < until) {
            return false;
        }
        self.locked_until = Some(now + self.interval);
        true
    }

    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some_and(|until| Instant::now() < until)
    }

    /// Release early, e.g. when the send itself failed.
    pub fn release(&mut self) {
        self.locked_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_submit_within_interval_is_refused() {
        let mut lock = SendLock::from_millis(500);
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());
        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(lock.is_locked());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!lock.is_locked());
        assert!(lock.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn release_unlocks_immediately() {
        let mut lock = SendLock::from_millis(500);
        assert!(lock.try_acquire());
        lock.release();
        assert!(lock.try_acquire());
    }
}

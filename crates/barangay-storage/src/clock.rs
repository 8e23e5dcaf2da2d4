// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strictly increasing store clock.

use std::sync::Mutex;

use barangay_core::Timestamp;
use chrono::{Duration, Utc};

/// Hands out instants that never repeat and never go backwards, even when
/// the wall clock does.
#[derive(Debug, Default)]
pub struct StoreClock {
    last: Mutex<Option<Timestamp>>,
}

impl StoreClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start after `floor`, e.g. the newest instant already persisted.
    pub fn starting_after(floor: Option<Timestamp>) -> Self {
        Self {
            last: Mutex::new(floor),
        }
    }

    pub fn now(&self) -> Timestamp {
        let wall = Utc::now();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = match *last {
            Some(prev) if wall <= prev => prev + Duration::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing() {
        let clock = StoreClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn floor_in_the_future_is_respected() {
        let future = Utc::now() + Duration::hours(1);
        let clock = StoreClock::starting_after(Some(future));
        assert!(clock.now() > future);
    }
}

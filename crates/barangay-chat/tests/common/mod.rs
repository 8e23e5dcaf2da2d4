// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use std::time::Duration;

use barangay_chat::{FeedHandle, FeedUpdate, ResidentChatView, StaffConsole};
use barangay_test_utils::TestHarness;

pub const WAIT: Duration = Duration::from_secs(5);

/// Anything that yields feed updates.
pub trait Updates {
    async fn next_update(&mut self) -> Option<FeedUpdate>;
}

impl Updates for ResidentChatView {
    async fn next_update(&mut self) -> Option<FeedUpdate> {
        ResidentChatView::next_update(self).await
    }
}

impl Updates for StaffConsole {
    async fn next_update(&mut self) -> Option<FeedUpdate> {
        StaffConsole::next_update(self).await
    }
}

impl Updates for FeedHandle {
    async fn next_update(&mut self) -> Option<FeedUpdate> {
        self.next().await
    }
}

/// Read updates until one matches, returning everything seen on the way.
pub async fn until<U, F>(source: &mut U, mut pred: F) -> Vec<FeedUpdate>
where
    U: Updates,
    F: FnMut(&FeedUpdate) -> bool,
{
    tokio::time::timeout(WAIT, async {
        let mut seen = Vec::new();
        loop {
            match source.next_update().await {
                Some(update) => {
                    let done = pred(&update);
                    seen.push(update);
                    if done {
                        return seen;
                    }
                }
                None => panic!("feed ended; saw {seen:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for feed update")
}

/// A harness with two staff members and one admin.
pub async fn office() -> TestHarness {
    TestHarness::builder()
        .with_staff("s1", "Ana")
        .with_staff("s2", "Ben")
        .with_admin("admin", "Kap. Cruz")
        .build()
        .await
        .unwrap()
}

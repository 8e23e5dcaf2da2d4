// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Barangay chat desk.
//!
//! Residents talk to a rule-based bot, may escalate to the staff queue, and
//! are then served by exactly one staff member at a time. This crate holds
//! the state machine that enforces those rules, the live feed projection
//! shown by each view, and the typed record layer at the store boundary.

pub mod coordinator;
pub mod directory;
pub mod feed;
pub mod inbox;
pub mod records;
pub mod render;
pub mod send_lock;
pub mod session;
pub mod state;
pub mod view;

pub use coordinator::{
    BotTurn, ClaimOutcome, EscalationCoordinator, EscalationOutcome, ResidentSend,
    TransferOutcome,
};
pub use directory::{StoreResidentDirectory, StoreStaffDirectory};
pub use feed::{FeedHandle, FeedProjector, FeedUpdate, SummaryCard, Viewer};
pub use inbox::{InboxEntry, InboxHandle, InboxProjector};
pub use render::{RenderedMessage, escape_html};
pub use send_lock::SendLock;
pub use session::{SessionResolver, wait_for_identity};
pub use state::{Event, next_status};
pub use view::{ResidentChatView, StaffConsole, report};

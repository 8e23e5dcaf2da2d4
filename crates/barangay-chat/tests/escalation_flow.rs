// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end escalation flows over the in-memory and SQLite stores.

mod common;

use barangay_chat::records::{CONVERSATIONS, MESSAGES, message_from_record};
use barangay_chat::{ClaimOutcome, EscalationOutcome, TransferOutcome};
use barangay_core::{BarangayError, ConversationStatus, DocumentStore, Sender};
use barangay_test_utils::TestHarness;
use serde_json::json;

use common::office;

fn is_denied(err: &BarangayError) -> bool {
    matches!(err, BarangayError::PermissionDenied { .. })
}

#[tokio::test]
async fn repeated_resolution_returns_one_conversation() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let first = h.sessions.resolve_session(&resident).await.unwrap();
    for _ in 0..5 {
        assert_eq!(h.sessions.resolve_session(&resident).await.unwrap(), first);
    }
    // Escalating does not end the session either.
    h.coordinator.accept_escalation_offer(&first, &resident).await.unwrap();
    assert_eq!(h.sessions.resolve_session(&resident).await.unwrap(), first);
}

#[tokio::test]
async fn resident_reaches_staff_and_back() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.sessions.resolve_session(&resident).await.unwrap();

    let sent = h
        .coordinator
        .send_resident_message(&id, &resident, "hello there")
        .await
        .unwrap();
    let bot = sent.bot.expect("bot answers while status is bot");
    assert!(bot.reply.offers_escalation());

    let outcome = h.coordinator.accept_escalation_offer(&id, &resident).await.unwrap();
    assert_eq!(outcome, EscalationOutcome::Escalated);
    let again = h.coordinator.accept_escalation_offer(&id, &resident).await.unwrap();
    assert_eq!(again, EscalationOutcome::AlreadyEscalated(ConversationStatus::Waiting));

    // No bot reply once a human is expected.
    let queued = h
        .coordinator
        .send_resident_message(&id, &resident, "still there?")
        .await
        .unwrap();
    assert!(queued.bot.is_none());
    assert!(h.coordinator.conversation(&id).await.unwrap().unread_staff);

    assert_eq!(h.coordinator.claim(&id, "s1").await.unwrap(), ClaimOutcome::Claimed);
    h.coordinator.send_staff_message(&id, "s1", "Good morning po").await.unwrap();

    let conversation = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(conversation.status, ConversationStatus::Active);
    assert_eq!(conversation.taken_over_by.as_deref(), Some("s1"));
    let last = conversation.last_message.unwrap();
    assert_eq!(last.text, "Good morning po");
    assert_eq!(last.sender, Sender::Staff);
    assert!(conversation.unread_resident);
}

#[tokio::test]
async fn concurrent_claims_have_one_winner() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.waiting_conversation(&resident).await.unwrap();

    let (a, b) = tokio::join!(h.coordinator.claim(&id, "s1"), h.coordinator.claim(&id, "s2"));
    let outcomes = [a.unwrap(), b.unwrap()];
    let winners = outcomes.iter().filter(|o| **o == ClaimOutcome::Claimed).count();
    assert_eq!(winners, 1, "{outcomes:?}");

    let owner = h.coordinator.conversation(&id).await.unwrap().taken_over_by.unwrap();
    let loser = outcomes
        .iter()
        .find_map(|o| match o {
            ClaimOutcome::AlreadyClaimed { by } => by.clone(),
            ClaimOutcome::Claimed => None,
        })
        .unwrap();
    assert_eq!(loser, owner);
}

#[tokio::test]
async fn unconditional_claim_still_backs_off_when_active() {
    let h = TestHarness::builder()
        .with_staff("s1", "Ana")
        .with_staff("s2", "Ben")
        .with_conditional_claim(false)
        .build()
        .await
        .unwrap();
    let resident = TestHarness::resident("r1");
    let id = h.waiting_conversation(&resident).await.unwrap();

    assert_eq!(h.coordinator.claim(&id, "s1").await.unwrap(), ClaimOutcome::Claimed);
    // Already active: the second claim sees it and backs off.
    assert_eq!(
        h.coordinator.claim(&id, "s2").await.unwrap(),
        ClaimOutcome::AlreadyClaimed { by: Some("s1".into()) }
    );
}

#[tokio::test]
async fn only_owner_or_admin_may_reply_while_active() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.waiting_conversation(&resident).await.unwrap();

    let err = h.coordinator.send_staff_message(&id, "s1", "hi").await.unwrap_err();
    assert!(is_denied(&err), "waiting: {err:?}");

    h.coordinator.claim(&id, "s1").await.unwrap();
    let err = h.coordinator.send_staff_message(&id, "s2", "hi").await.unwrap_err();
    assert!(is_denied(&err), "not owner: {err:?}");
    let err = h.coordinator.send_staff_message(&id, "r1", "hi").await.unwrap_err();
    assert!(is_denied(&err), "not staff: {err:?}");

    h.coordinator.send_staff_message(&id, "admin", "Admin here").await.unwrap();
    h.coordinator.send_staff_message(&id, "s1", "Owner here").await.unwrap();
    let last = h.coordinator.conversation(&id).await.unwrap().last_message.unwrap();
    assert_eq!(last.text, "Owner here");
}

#[tokio::test]
async fn transfer_resolves_only_by_its_target() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();

    let requested = h
        .coordinator
        .request_transfer(&id, "s1", "s2", Some("Ben handles permits"))
        .await
        .unwrap();
    assert!(matches!(requested, TransferOutcome::Requested(ref r) if r.to == "s2"));

    // A second request while one is pending is not allowed.
    let err = h
        .coordinator
        .request_transfer(&id, "s1", "admin", None)
        .await
        .unwrap_err();
    assert!(matches!(err, BarangayError::InvalidTransition { .. }), "{err:?}");

    for outsider in ["s1", "admin"] {
        let err = h.coordinator.accept_transfer(&id, outsider).await.unwrap_err();
        assert!(is_denied(&err), "{outsider}: {err:?}");
        let err = h.coordinator.reject_transfer(&id, outsider).await.unwrap_err();
        assert!(is_denied(&err), "{outsider}: {err:?}");
    }
    let still = h.coordinator.conversation(&id).await.unwrap();
    assert!(still.transfer_awaiting("s2").is_some());
    assert_eq!(still.taken_over_by.as_deref(), Some("s1"));

    let accepted = h.coordinator.accept_transfer(&id, "s2").await.unwrap();
    assert_eq!(accepted, TransferOutcome::Accepted { new_owner: "s2".into() });
    let after = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(after.taken_over_by.as_deref(), Some("s2"));
    assert!(after.pending_transfer.is_none());

    // The old owner lost the right to reply.
    let err = h.coordinator.send_staff_message(&id, "s1", "hi").await.unwrap_err();
    assert!(is_denied(&err));
}

#[tokio::test]
async fn takeover_request_goes_to_the_owner() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();

    let TransferOutcome::Requested(request) = h
        .coordinator
        .request_transfer(&id, "s2", "s1", None)
        .await
        .unwrap()
    else {
        panic!("expected a pending request");
    };
    assert_eq!(request.to, "s1");
    assert_eq!(request.new_owner(), "s2");

    assert_eq!(h.coordinator.reject_transfer(&id, "s1").await.unwrap(), TransferOutcome::Rejected);
    let after = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(after.taken_over_by.as_deref(), Some("s1"));
    assert!(after.pending_transfer.is_none());
}

#[tokio::test]
async fn resolve_then_reopen_round_trip() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();

    let err = h.coordinator.resolve(&id, "s2", Some("fixed")).await.unwrap_err();
    assert!(is_denied(&err));
    h.coordinator.resolve(&id, "s1", Some("fixed")).await.unwrap();

    let resolved = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(resolved.status, ConversationStatus::Resolved);
    let resolution = resolved.resolution.unwrap();
    assert_eq!(resolution.by, "s1");
    assert_eq!(resolution.note, "fixed");
    assert!(resolution.at.is_some());
    assert!(resolved.taken_over_by.is_none());

    let err = h
        .coordinator
        .send_resident_message(&id, &resident, "one more thing")
        .await
        .unwrap_err();
    assert!(matches!(err, BarangayError::InputRejected(_)));
    let err = h.coordinator.send_staff_message(&id, "s1", "hi").await.unwrap_err();
    assert!(is_denied(&err));

    // Someone who neither resolved it nor is admin cannot reopen.
    assert!(is_denied(&h.coordinator.reopen(&id, "s2").await.unwrap_err()));
    h.coordinator.reopen(&id, "s1").await.unwrap();

    let reopened = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(reopened.status, ConversationStatus::Active);
    assert!(reopened.resolution.is_none());
    assert_eq!(reopened.taken_over_by.as_deref(), Some("s1"));

    let err = h.coordinator.reopen(&id, "admin").await.unwrap_err();
    assert!(matches!(err, BarangayError::InvalidTransition { .. }));
}

async fn office_with_interference() -> TestHarness {
    TestHarness::builder()
        .with_staff("s1", "Ana")
        .with_staff("s2", "Ben")
        .with_admin("admin", "Kap. Cruz")
        .with_flaky_store()
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn resolve_refused_after_losing_ownership_mid_flight() {
    let h = office_with_interference().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();

    // s2 takes the conversation after s1 has read it as owner.
    let handoff = json!({ "takenOverBy": "s2" });
    h.flaky.as_ref().unwrap().write_before_next_swap(
        CONVERSATIONS,
        &id.0,
        handoff.as_object().cloned().unwrap(),
    );
    let err = h.coordinator.resolve(&id, "s1", Some("fixed")).await.unwrap_err();
    assert!(is_denied(&err));

    let now = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(now.status, ConversationStatus::Active);
    assert_eq!(now.taken_over_by.as_deref(), Some("s2"));
    assert!(now.resolution.is_none());

    // The new owner can still resolve it.
    h.coordinator.resolve(&id, "s2", Some("fixed")).await.unwrap();
}

#[tokio::test]
async fn reopen_refused_when_resolver_changed_mid_flight() {
    let h = office_with_interference().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();
    h.coordinator.resolve(&id, "s1", None).await.unwrap();

    let resolved_again = json!({ "resolvedBy": "s2" });
    h.flaky.as_ref().unwrap().write_before_next_swap(
        CONVERSATIONS,
        &id.0,
        resolved_again.as_object().cloned().unwrap(),
    );
    let err = h.coordinator.reopen(&id, "s1").await.unwrap_err();
    assert!(is_denied(&err));
    let now = h.coordinator.conversation(&id).await.unwrap();
    assert_eq!(now.status, ConversationStatus::Resolved);

    // Admins reopen regardless of who resolved.
    h.coordinator.reopen(&id, "admin").await.unwrap();
}

#[tokio::test]
async fn blank_resolution_note_uses_default() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();
    h.coordinator.resolve(&id, "admin", Some("   ")).await.unwrap();
    let note = h.coordinator.conversation(&id).await.unwrap().resolution.unwrap().note;
    assert_eq!(note, h.coordinator.config().default_resolution_note);
}

#[tokio::test]
async fn resolved_conversation_starts_a_new_session() {
    let h = office().await;
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();
    h.coordinator.resolve(&id, "s1", None).await.unwrap();

    let next = h.sessions.resolve_session(&resident).await.unwrap();
    assert_ne!(next, id);
    let fresh = h.coordinator.conversation(&next).await.unwrap();
    assert_eq!(fresh.status, ConversationStatus::Bot);
}

#[tokio::test]
async fn missing_conversation_is_not_found() {
    let h = office().await;
    let err = h.coordinator.claim(&"gone".into(), "s1").await.unwrap_err();
    assert!(err.requires_refresh(), "{err:?}");
}

#[tokio::test]
async fn history_is_in_timestamp_order_over_sqlite() {
    let h = TestHarness::builder()
        .with_staff("s1", "Ana")
        .with_sqlite()
        .build()
        .await
        .unwrap();
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();
    for i in 0..5 {
        h.coordinator
            .send_resident_message(&id, &resident, &format!("<b>{i}</b>"))
            .await
            .unwrap();
        h.coordinator.send_staff_message(&id, "s1", "noted").await.unwrap();
    }

    let records = h.store.list_subcollection(CONVERSATIONS, &id.0, MESSAGES).await.unwrap();
    let messages: Vec<_> = records.iter().map(message_from_record).collect();
    assert!(messages.len() >= 10);
    assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    // Stored verbatim; escaping happens at render time.
    assert!(messages.iter().any(|m| m.message == "<b>0</b>"));
}

#[tokio::test]
async fn store_failures_surface_as_transient_errors() {
    let h = TestHarness::builder()
        .with_staff("s1", "Ana")
        .with_flaky_store()
        .build()
        .await
        .unwrap();
    let resident = TestHarness::resident("r1");
    let id = h.active_conversation(&resident, "s1").await.unwrap();

    h.flaky.as_ref().unwrap().fail_next_writes(1);
    let err = h.coordinator.send_staff_message(&id, "s1", "hi").await.unwrap_err();
    assert!(err.is_transient());

    // Nothing half-written; the next attempt goes through.
    h.coordinator.send_staff_message(&id, "s1", "hi").await.unwrap();
}

// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply selection and office-detail interpolation.

use barangay_config::model::BotConfig;
use tracing::debug;

use crate::topics::{Topic, classify};

/// Appended to replies that invite the resident to reach a person.
pub const ESCALATION_PROMPT: &str =
    "Would you like to talk to a staff member? Tap \"Talk to staff\" and someone from the office will join this chat.";

/// What the bot says back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    /// A self-contained answer.
    Canned(String),
    /// An answer that also offers escalation to staff.
    EscalationOffer(String),
}

impl BotReply {
    pub fn text(&self) -> &str {
        match self {
            BotReply::Canned(t) | BotReply::EscalationOffer(t) => t,
        }
    }

    pub fn offers_escalation(&self) -> bool {
        matches!(self, BotReply::EscalationOffer(_))
    }
}

/// Stateless keyword responder with the office's contact details.
#[derive(Debug, Clone, Default)]
pub struct BotResponder {
    office: BotConfig,
}

impl BotResponder {
    pub fn new(office: BotConfig) -> Self {
        Self { office }
    }

    /// Pick the reply for one resident message.
    pub fn respond(&self, text: &str) -> BotReply {
        let lowered = text.trim().to_lowercase();
        let topic = classify(&lowered);
        debug!(topic = ?topic, "bot topic classified");
        match topic {
            Some(Topic::TalkToStaff) => BotReply::EscalationOffer(format!(
                "Of course. {ESCALATION_PROMPT}"
            )),
            Some(Topic::StatusCheck) => BotReply::EscalationOffer(format!(
                "I can't look up individual requests. A staff member can check the status for you. {ESCALATION_PROMPT}"
            )),
            Some(topic) => BotReply::Canned(self.canned(topic)),
            None => BotReply::EscalationOffer(format!(
                "Sorry, I didn't quite understand that. You can ask me about documents, \
                 fees, office hours, or reporting an incident. {ESCALATION_PROMPT}"
            )),
        }
    }

    fn canned(&self, topic: Topic) -> String {
        let o = &self.office;
        match topic {
            Topic::Documents => "We issue barangay clearances, certificates of indigency, \
                 certificates of residency, and business permits. Ask me about any of them \
                 for the requirements."
                .to_string(),
            Topic::BarangayClearance => "For a barangay clearance, bring one valid ID and \
                 proof of residency (a utility bill or lease) to the hall. It is usually \
                 released the same day."
                .to_string(),
            Topic::CertificateOfIndigency => "For a certificate of indigency, bring a valid ID \
                 and state the purpose (medical, scholarship, or legal aid). There is no fee."
                .to_string(),
            Topic::CertificateOfResidency => "For a certificate of residency, bring a valid ID \
                 showing your address in the barangay, or a letter from your landlord."
                .to_string(),
            Topic::BusinessPermit => "For a barangay business permit, bring your DTI or SEC \
                 registration, a valid ID, and your lease or proof of business location."
                .to_string(),
            Topic::Incident => format!(
                "To file a report or blotter, please visit the hall at {} so a desk officer can \
                 take your statement. For emergencies, call {} right away.",
                o.office_address, o.contact_phone
            ),
            Topic::Fees => "Clearances and certificates of residency cost PHP 50. Certificates \
                 of indigency are free. Business permit fees depend on the type of business."
                .to_string(),
            Topic::OfficeHours => format!("The office is open {}.", o.office_hours),
            Topic::Contact => format!(
                "You can reach us at {} or {}. The office is at {}.",
                o.contact_phone, o.contact_email, o.office_address
            ),
            Topic::AccountHelp => "To update your profile, open Settings from the portal menu. \
                 If you forgot your password, use \"Forgot password\" on the sign-in page and \
                 follow the link sent to your email."
                .to_string(),
            // Handled in `respond`; both carry an offer.
            Topic::StatusCheck | Topic::TalkToStaff => ESCALATION_PROMPT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bot() -> BotResponder {
        BotResponder::new(BotConfig {
            office_hours: "Mon to Fri, 8 AM to 5 PM".into(),
            contact_phone: "555-0100".into(),
            contact_email: "desk@example.ph".into(),
            office_address: "12 Rizal St".into(),
        })
    }

    #[test]
    fn hours_interpolates_config() {
        assert_eq!(
            bot().respond("What are your office HOURS?"),
            BotReply::Canned("The office is open Mon to Fri, 8 AM to 5 PM.".into())
        );
    }

    #[test]
    fn contact_reply_lists_phone_and_email() {
        let reply = bot().respond("how do I contact you");
        assert!(!reply.offers_escalation());
        assert!(reply.text().contains("555-0100"));
        assert!(reply.text().contains("desk@example.ph"));
    }

    #[test]
    fn talk_to_staff_offers_escalation() {
        let reply = bot().respond("can I talk to a staff please");
        assert!(reply.offers_escalation());
        assert!(reply.text().contains(ESCALATION_PROMPT));
    }

    #[test]
    fn unknown_input_falls_back_with_offer() {
        let reply = bot().respond("zxcv");
        assert!(reply.offers_escalation());
        assert!(reply.text().starts_with("Sorry, I didn't quite understand"));
    }

    #[test]
    fn status_check_offers_escalation() {
        assert!(bot().respond("what's the status of my request").offers_escalation());
    }

    proptest! {
        #[test]
        fn respond_is_deterministic_and_never_empty(text in ".{0,80}") {
            let b = bot();
            let first = b.respond(&text);
            prop_assert_eq!(&first, &b.respond(&text));
            prop_assert!(!first.text().is_empty());
        }

        #[test]
        fn case_does_not_matter(text in "[a-zA-Z ]{0,40}") {
            let b = bot();
            prop_assert_eq!(b.respond(&text.to_uppercase()), b.respond(&text.to_lowercase()));
        }
    }
}

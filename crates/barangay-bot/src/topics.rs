// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered topic patterns.

use std::sync::LazyLock;

use regex::Regex;

/// A recognised resident topic, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    /// General questions about requesting documents.
    Documents,
    BarangayClearance,
    CertificateOfIndigency,
    CertificateOfResidency,
    BusinessPermit,
    /// Blotter reports, noise, disputes, and similar incidents.
    Incident,
    Fees,
    OfficeHours,
    Contact,
    /// Profile edits and password resets.
    AccountHelp,
    StatusCheck,
    /// The resident explicitly asks for a person.
    TalkToStaff,
}

/// Topic patterns, matched against lower-cased input in this order.
pub(crate) static TOPIC_PATTERNS: LazyLock<Vec<(Topic, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Topic::Documents,
            Regex::new(r"\b(what|which) (documents?|papers|certificates?)\b|\b(request|get|apply for) (a |an )?(documents?|certificates?)\b|\brequirements?\b").unwrap(),
        ),
        (
            Topic::BarangayClearance,
            Regex::new(r"\bclearance\b").unwrap(),
        ),
        (
            Topic::CertificateOfIndigency,
            Regex::new(r"\bindigen(cy|t)\b").unwrap(),
        ),
        (
            Topic::CertificateOfResidency,
            Regex::new(r"\bresiden(cy|ce certificate)\b").unwrap(),
        ),
        (
            Topic::BusinessPermit,
            Regex::new(r"\bbusiness (permit|clearance)\b|\bpermit\b").unwrap(),
        ),
        (
            Topic::Incident,
            Regex::new(r"\b(blotter|incident|complaint|report|noise|dispute|neighbou?r|theft|stolen|fight|harass\w*)\b").unwrap(),
        ),
        (
            Topic::Fees,
            Regex::new(r"\b(fee|fees|cost|costs|price|how much|payment|pay)\b").unwrap(),
        ),
        (
            Topic::OfficeHours,
            Regex::new(r"\b(hours|open|close|closing|schedule|what time)\b").unwrap(),
        ),
        (
            Topic::Contact,
            Regex::new(r"\b(contact|phone|telephone|call|email|address|location|where is)\b").unwrap(),
        ),
        (
            Topic::AccountHelp,
            Regex::new(r"\b(password|profile|account|log ?in|sign ?in)\b").unwrap(),
        ),
        (
            Topic::StatusCheck,
            Regex::new(r"\b(status|follow ?up|update on|is it ready|ready yet|track)\b").unwrap(),
        ),
        (
            Topic::TalkToStaff,
            Regex::new(r"\b(talk|speak|chat) (to|with) (a |an |the )?(staff|human|person|someone|officer|agent)\b|\b(human|real person|live agent)\b").unwrap(),
        ),
    ]
});

/// The first topic whose pattern matches `lowered`.
pub fn classify(lowered: &str) -> Option<Topic> {
    TOPIC_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(lowered))
        .map(|(topic, _)| *topic)
}

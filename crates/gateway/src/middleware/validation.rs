//! Contact-info validation shared by the contact-info stage and the
//! `collect_contact_info` tool.
//!
//! Checks run in a fixed order and the first hard failure wins. Phone
//! format, jurisdiction and a missing contact method are only warnings.

use li_domain::config::TeamConfig;
use li_domain::context::{is_placeholder, ContactInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum ContactValidation {
    Accepted {
        contact: ContactInfo,
        warnings: Vec<String>,
    },
    Rejected {
        field: &'static str,
        message: String,
    },
}

impl ContactValidation {
    fn reject(field: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected { field, message: message.into() }
    }
}

/// Words that follow "I'm" / "I am" in ordinary sentences and are not
/// names ("I'm Not sure", "I am Looking for help").
const SENTENCE_WORDS: &[&str] = &[
    "a", "an", "the", "not", "so", "sorry", "just", "here", "looking", "going", "trying", "being",
    "getting", "having", "still", "also", "very", "really", "currently", "writing", "calling",
    "from", "in", "at", "on", "afraid", "worried", "scared", "concerned", "unsure", "ok", "okay",
    "fine", "good", "interested", "married", "divorced", "pregnant", "unemployed", "disabled",
];

/// Whether a captured name is really the start of a sentence.
pub fn is_sentence_word(name: &str) -> bool {
    name.split_whitespace()
        .next()
        .is_some_and(|first| SENTENCE_WORDS.contains(&first.to_lowercase().as_str()))
}

pub fn valid_name(name: &str) -> bool {
    let name = name.trim();
    let len = name.chars().count();
    (2..=100).contains(&len)
        && name.chars().any(char::is_alphabetic)
        && name
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'' || c == '.')
        && !is_placeholder(name)
        && !is_sentence_word(name)
}

pub fn valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || domain.starts_with('.') || domain.contains("..") {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// 7 to 15 digits with only common separators.
pub fn valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || " +-.()".contains(c))
}

pub fn valid_location(location: &str) -> bool {
    let location = location.trim();
    let len = location.chars().count();
    (2..=100).contains(&len) && location.chars().filter(|c| c.is_alphabetic()).count() >= 2
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validate `input` against the team, given what is already on file.
pub fn validate_contact(input: &ContactInfo, existing: &ContactInfo, team: &TeamConfig) -> ContactValidation {
    let name = present(&input.name);
    let email = present(&input.email);
    let phone = present(&input.phone);
    let location = present(&input.location);
    let mut warnings = Vec::new();

    if phone.is_some_and(is_placeholder) {
        return ContactValidation::reject(
            "phone",
            "That phone number looks like a placeholder. Could you share the number where an attorney can actually reach you?",
        );
    }
    if email.is_some_and(is_placeholder) {
        return ContactValidation::reject(
            "email",
            "That email address looks like a placeholder. Could you share the address you actually use?",
        );
    }
    if let Some(name) = name {
        if !valid_name(name) {
            return ContactValidation::reject(
                "name",
                "I didn't quite catch your name. Could you tell me your full name (first and last)?",
            );
        }
    }
    if let Some(email) = email {
        if !valid_email(email) {
            return ContactValidation::reject(
                "email",
                format!("\"{email}\" doesn't look like a complete email address. Could you double-check it?"),
            );
        }
    }
    if let Some(phone) = phone {
        if !valid_phone(phone) {
            tracing::warn!(phone, "phone number failed validation; keeping it flagged");
            warnings.push(format!("phone number '{phone}' may be incomplete"));
        }
    }
    if let Some(location) = location {
        if !valid_location(location) {
            return ContactValidation::reject(
                "location",
                "Could you tell me the city and state where you're located?",
            );
        }
        if let Some(jurisdiction) = team.jurisdiction.as_ref().filter(|j| j.is_well_formed()) {
            if !jurisdiction.supports(location) {
                tracing::warn!(location, "contact location outside the team's service area");
                warnings.push(format!("{location} is outside {}", jurisdiction.describe()));
            }
        }
    }
    if name.is_none() && present(&existing.name).is_none() {
        return ContactValidation::reject("name", "Thanks! Could you also tell me your full name?");
    }
    let has_method = email.is_some() || phone.is_some() || existing.has_contact_method();
    if !has_method {
        tracing::info!("contact info has neither phone nor email yet");
        warnings.push("no phone or email provided".into());
    }

    ContactValidation::Accepted {
        contact: ContactInfo {
            name: name.map(str::to_owned),
            email: email.map(str::to_owned),
            phone: phone.map(str::to_owned),
            location: location.map(str::to_owned),
        },
        warnings,
    }
}

/// Acknowledgement after contact info is accepted, followed by the next
/// open question.
pub fn acknowledgement(merged: &ContactInfo, has_matters: bool) -> String {
    let first_name = merged
        .name
        .as_deref()
        .and_then(|n| n.split_whitespace().next())
        .unwrap_or("there");
    let next = if !merged.has_contact_method() {
        "What's the best phone number or email address for an attorney to reach you?"
    } else if !has_matters {
        "What legal matter can we help you with today?"
    } else {
        "Is there anything else about your situation an attorney should know before they reach out?"
    };
    format!("Thank you, {first_name}. I've noted your contact details. {next}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use li_domain::config::JurisdictionConfig;

    fn info(name: Option<&str>, email: Option<&str>, phone: Option<&str>, location: Option<&str>) -> ContactInfo {
        ContactInfo {
            name: name.map(Into::into),
            email: email.map(Into::into),
            phone: phone.map(Into::into),
            location: location.map(Into::into),
        }
    }

    fn nc_team() -> TeamConfig {
        TeamConfig {
            jurisdiction: Some(JurisdictionConfig {
                supported_states: vec!["NC".into()],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn rejected_field(v: ContactValidation) -> &'static str {
        match v {
            ContactValidation::Rejected { field, .. } => field,
            ContactValidation::Accepted { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn accepts_complete_contact() {
        let input = info(Some("Jane Doe"), Some("jane@example.com"), Some("555-0100"), Some("Charlotte, NC"));
        match validate_contact(&input, &ContactInfo::default(), &nc_team()) {
            ContactValidation::Accepted { contact, warnings } => {
                assert_eq!(contact, input);
                assert!(warnings.is_empty(), "{warnings:?}");
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn placeholders_rejected_before_shape_checks() {
        let input = info(Some("x"), None, Some("123-456-7890"), None);
        assert_eq!(rejected_field(validate_contact(&input, &ContactInfo::default(), &nc_team())), "phone");
        let input = info(Some("Jane Doe"), Some("test@test.com"), None, None);
        assert_eq!(rejected_field(validate_contact(&input, &ContactInfo::default(), &nc_team())), "email");
    }

    #[test]
    fn bad_name_or_email_blocks() {
        let input = info(Some("J4ne"), None, None, None);
        assert_eq!(rejected_field(validate_contact(&input, &ContactInfo::default(), &nc_team())), "name");
        let input = info(Some("Jane Doe"), Some("jane@"), None, None);
        assert_eq!(rejected_field(validate_contact(&input, &ContactInfo::default(), &nc_team())), "email");
    }

    #[test]
    fn phone_and_jurisdiction_only_warn() {
        let input = info(Some("Jane Doe"), None, Some("55-01"), Some("Austin, TX"));
        match validate_contact(&input, &ContactInfo::default(), &nc_team()) {
            ContactValidation::Accepted { contact, warnings } => {
                assert_eq!(contact.phone.as_deref(), Some("55-01"));
                assert_eq!(warnings.len(), 2);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn missing_name_blocks_unless_on_file() {
        let input = info(None, Some("jane@example.com"), None, None);
        assert_eq!(rejected_field(validate_contact(&input, &ContactInfo::default(), &nc_team())), "name");

        let existing = info(Some("Jane Doe"), None, None, None);
        assert!(matches!(
            validate_contact(&input, &existing, &nc_team()),
            ContactValidation::Accepted { .. }
        ));
    }

    #[test]
    fn missing_contact_method_is_a_warning() {
        let input = info(Some("Jane Doe"), None, None, None);
        match validate_contact(&input, &ContactInfo::default(), &TeamConfig::default()) {
            ContactValidation::Accepted { warnings, .. } => assert_eq!(warnings.len(), 1),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn sentence_words_are_not_names() {
        assert!(is_sentence_word("Not sure"));
        assert!(!valid_name("Sorry"));
        assert!(valid_name("Mary-Jo O'Neil"));
    }

    #[test]
    fn acknowledgement_asks_next_question() {
        let c = info(Some("Jane Doe"), Some("jane@example.com"), None, None);
        let text = acknowledgement(&c, false);
        assert!(text.starts_with("Thank you, Jane."));
        assert!(text.contains("What legal matter"));
        assert!(acknowledgement(&info(Some("Jane"), None, None, None), true).contains("phone number or email"));
    }
}

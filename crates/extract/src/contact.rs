//! Deterministic contact extraction
//!
//! First pass over a message: an email-shaped token, a phone-shaped token,
//! and a name guess formed by stripping the matched tokens and collapsing
//! separators. Anything still missing afterwards is left for the model-based
//! fallback upstream.

use meeting_agent_core::ContactInfo;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

// Leading optional +, then digits with spaces/dashes/parens; at least six
// digits total so short counts ("3 slots") don't read as phone numbers.
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[+(]?\d[\d\s\-()]{4,}\d").unwrap());

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;|]+").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Fields found by the deterministic pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactExtraction {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactExtraction {
    /// Merge into the conversation's contact record without overwriting
    /// anything already known. Returns true if any field changed.
    pub fn merge_into(&self, contact: &mut ContactInfo) -> bool {
        let mut changed = false;
        if let Some(name) = &self.name {
            changed |= contact.name.fill(name.clone());
        }
        if let Some(email) = &self.email {
            changed |= contact.email.fill(email.clone());
        }
        if let Some(phone) = &self.phone {
            changed |= contact.phone.fill(phone.clone());
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Run the deterministic pattern pass over one message.
pub fn extract_contact(text: &str) -> ContactExtraction {
    let mut extraction = ContactExtraction::default();
    let mut remainder = text.to_string();

    if let Some(m) = EMAIL.find(text) {
        extraction.email = Some(m.as_str().to_string());
        remainder = remainder.replace(m.as_str(), " ");
    }

    // Phone is matched against the text with the email removed so digits in
    // an address never masquerade as a number.
    let phone_source = remainder.clone();
    if let Some(m) = PHONE.find(&phone_source) {
        let candidate = m.as_str().trim();
        if digit_count(candidate) >= 6 {
            extraction.phone = Some(candidate.to_string());
            remainder = remainder.replace(m.as_str(), " ");
        }
    }

    let name_text = SEPARATORS.replace_all(&remainder, " ");
    let name_text = WHITESPACE.replace_all(&name_text, " ");
    let name_text = name_text.trim();
    if name_text.len() > 1 {
        extraction.name = Some(name_text.to_string());
    }

    extraction
}

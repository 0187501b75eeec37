//! Contact information with per-field lifecycle
//!
//! Each field distinguishes "never seen", "extracted but not yet validated"
//! and "validated". Validation failures reset a single field to `Unset`
//! without disturbing the others.

use serde::{Deserialize, Serialize};

/// Lifecycle of a single contact field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum ContactField {
    /// Nothing extracted yet
    #[default]
    Unset,
    /// Extracted, pending validation
    Provided(String),
    /// Extracted and validated
    Valid(String),
}

impl ContactField {
    /// Whether the field holds a validated value
    pub fn is_valid(&self) -> bool {
        matches!(self, ContactField::Valid(_))
    }

    /// Whether the field holds any value at all
    pub fn is_set(&self) -> bool {
        !matches!(self, ContactField::Unset)
    }

    /// The held value, validated or not
    pub fn value(&self) -> Option<&str> {
        match self {
            ContactField::Unset => None,
            ContactField::Provided(v) | ContactField::Valid(v) => Some(v),
        }
    }

    /// Fill with an unvalidated value, but only if nothing is held yet.
    /// Extraction must never displace an earlier value with a weaker guess.
    pub fn fill(&mut self, value: impl Into<String>) -> bool {
        if self.is_set() {
            return false;
        }
        *self = ContactField::Provided(value.into());
        true
    }

    /// Promote a provided value to validated
    pub fn mark_valid(&mut self) {
        if let ContactField::Provided(v) = self {
            *self = ContactField::Valid(std::mem::take(v));
        }
    }

    /// Reset to unset (used when validation rejects the value)
    pub fn clear(&mut self) {
        *self = ContactField::Unset;
    }
}

/// The three contact fields needed to commit a booking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: ContactField,
    pub email: ContactField,
    pub phone: ContactField,
}

impl ContactInfo {
    /// All three fields validated
    pub fn is_complete(&self) -> bool {
        self.name.is_valid() && self.email.is_valid() && self.phone.is_valid()
    }

    /// Human-readable names of the fields still missing a valid value
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.name.is_valid() {
            missing.push("name");
        }
        if !self.email.is_valid() {
            missing.push("email");
        }
        if !self.phone.is_valid() {
            missing.push("phone number");
        }
        missing
    }
}

//! Natural-language field extractors and validators
//!
//! Every extractor here is a pure function of (text, context). Extraction
//! never fails a turn: unusable input comes back as an explicit signal and
//! the caller decides how to re-prompt. Extractors are also idempotent
//! against partially-filled state: a field that is already known is never
//! overwritten with a weaker guess.

pub mod contact;
pub mod date;
pub mod selection;
pub mod validate;

pub use contact::{extract_contact, ContactExtraction};
pub use date::{resolve_phrase, scan_message, DateSignal, ResolvedDate};
pub use selection::{parse_selection, SelectionOutcome};
pub use validate::{validate_email, validate_name, validate_phone};

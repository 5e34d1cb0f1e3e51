//! Form field validation.
//!
//! [`validate`] is pure: a value, the field's declared input type and its
//! `required` flag map to a [`ValidationVerdict`]. [`apply_verdict`] and
//! [`validate_field`] are the thin binding that reads a field target and
//! writes the verdict back onto it.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::host::Target;

pub const MSG_INVALID_CHARACTERS: &str = "Invalid characters detected";
pub const MSG_INVALID_EMAIL: &str = "Please enter a valid email address";
pub const MSG_REQUIRED: &str = "This field is required";

/// Longest address accepted by the email rule.
pub const MAX_EMAIL_LEN: usize = 254;

pub const INVALID_CLASS: &str = "is-invalid";
pub const ERROR_SELECTOR: &str = ".field-error";

const DISALLOWED_PATTERNS: &[&str] = &[
    r"(?is)<\s*script\b",
    r"(?i)javascript\s*:",
    r"(?i)\bon[a-z]+\s*=",
    r"(?is)<\s*iframe\b",
];

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$";

fn disallowed() -> &'static [Regex] {
    static SET: OnceLock<Vec<Regex>> = OnceLock::new();
    SET.get_or_init(|| {
        DISALLOWED_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("embedded pattern should compile"))
            .collect()
    })
}

fn email() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("embedded pattern should compile"))
}

/// How a declared input type is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// `text`, `textarea`, `search`, or no declared type.
    Text,
    Email,
    /// Anything else: only the content check applies.
    Other,
}

impl FieldKind {
    pub fn from_declared(declared_type: &str) -> Self {
        match declared_type.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "" | "text" | "textarea" | "search" => Self::Text,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    /// Empty when `valid`.
    pub message: String,
}

impl ValidationVerdict {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// True if `value` contains markup or script the page never accepts.
pub fn contains_disallowed(value: &str) -> bool {
    disallowed().iter().any(|re| re.is_match(value))
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LEN && email().is_match(value)
}

/// Validate one input value.
///
/// Rules, first match wins: disallowed content, then the email format for
/// email fields, then the required check for plain-text fields.
pub fn validate(value: &str, declared_type: &str, required: bool) -> ValidationVerdict {
    if contains_disallowed(value) {
        return ValidationVerdict::invalid(MSG_INVALID_CHARACTERS);
    }

    match FieldKind::from_declared(declared_type) {
        FieldKind::Email => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                if required {
                    ValidationVerdict::invalid(MSG_REQUIRED)
                } else {
                    ValidationVerdict::ok()
                }
            } else if is_valid_email(trimmed) {
                ValidationVerdict::ok()
            } else {
                ValidationVerdict::invalid(MSG_INVALID_EMAIL)
            }
        }
        FieldKind::Text if required && value.trim().is_empty() => {
            ValidationVerdict::invalid(MSG_REQUIRED)
        }
        _ => ValidationVerdict::ok(),
    }
}

/// Write `verdict` onto a field: the `is-invalid` class, `aria-invalid`, and
/// the message in the field's `.field-error` element.
pub fn apply_verdict(field: &dyn Target, verdict: &ValidationVerdict) {
    if verdict.valid {
        field.remove_class(INVALID_CLASS);
        field.set_attribute("aria-invalid", "false");
    } else {
        field.add_class(INVALID_CLASS);
        field.set_attribute("aria-invalid", "true");
    }

    match field.query(ERROR_SELECTOR) {
        Some(slot) => slot.set_text(&verdict.message),
        None if !verdict.valid => {
            warn!(target = %field.id(), "field has no error slot, message dropped");
        }
        None => {}
    }
}

/// Validate a field target from its `value`, `type` and `required`
/// attributes and write the verdict back onto it.
pub fn validate_field(field: &dyn Target) -> ValidationVerdict {
    let value = field.attribute("value").unwrap_or_default();
    let declared_type = field.attribute("type").unwrap_or_default();
    let required = field.attribute("required").is_some();

    let verdict = validate(&value, &declared_type, required);
    debug!(
        target = %field.id(),
        declared_type = %declared_type,
        valid = verdict.valid,
        "field validated"
    );
    apply_verdict(field, &verdict);
    verdict
}

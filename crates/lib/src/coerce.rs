//! Raw-input coercion and validation.
//!
//! Two error channels: `ValidationFailure` is a retryable value the prompt
//! loop re-asks on; `CollectionError` is fatal and aborts the collection.

use serde_json::Value;

use crate::schema::{FieldKind, NormalizedField, Verdict};

/// Inline message for an empty submit on a required, default-less field.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// A recoverable validation failure. Never propagates past the prompt loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub message: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fatal collection failure: aborts the whole pass, leaving no partial values.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("Parameter '{key}' is required.")]
    MissingRequired { key: String },
    #[error("a parameter section is already being collected")]
    SectionInFlight,
    #[error("front-end closed while collecting section '{title}'")]
    HostGone { title: String },
    #[error("prompt failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Coerce raw text (with the field's empty/default handling) and run its
/// validator. Stateless: one independent call per submit.
pub fn coerce_and_validate(raw: &str, field: &NormalizedField) -> Result<Value, ValidationFailure> {
    if raw.is_empty() {
        if let Some(default) = &field.default {
            return Ok(default.clone());
        }
        if field.required {
            return Err(ValidationFailure::new(REQUIRED_MESSAGE));
        }
        return Ok(Value::Null);
    }
    let value = coerce_kind(raw, field.kind)?;
    apply_validator(field, value)
}

/// Coerce non-empty raw text into `kind`. Paths are wrapped without any
/// existence check; that is a caller validator's job.
pub fn coerce_kind(raw: &str, kind: FieldKind) -> Result<Value, ValidationFailure> {
    match kind {
        FieldKind::String | FieldKind::Choice | FieldKind::Path => {
            Ok(Value::String(raw.to_string()))
        }
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid(kind)),
        FieldKind::Float => {
            let parsed = raw.trim().parse::<f64>().map_err(|_| invalid(kind))?;
            serde_json::Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| invalid(kind))
        }
        FieldKind::Boolean => parse_bool(raw).ok_or_else(|| invalid(kind)),
    }
}

/// Run the custom validator, if any, on an already-coerced value.
pub fn apply_validator(field: &NormalizedField, value: Value) -> Result<Value, ValidationFailure> {
    match run_validator(field, &value) {
        Verdict::Pass => Ok(value),
        Verdict::Fail => Err(ValidationFailure::new(format!(
            "Invalid value for '{}'.",
            field.key
        ))),
        Verdict::FailWith(message) => Err(ValidationFailure::new(message)),
    }
}

/// Raw verdict from the field's validator on an already-coerced value,
/// `Pass` when the field has none. For callers that phrase their own
/// rejection line; `apply_validator` folds this into a `ValidationFailure`.
pub fn run_validator(field: &NormalizedField, value: &Value) -> Verdict {
    let Some(validator) = &field.validator else {
        return Verdict::Pass;
    };
    let verdict = validator(value);
    match &verdict {
        Verdict::Pass => {}
        Verdict::Fail => log::debug!("validator rejected value for '{}'", field.key),
        Verdict::FailWith(message) => {
            log::debug!("validator rejected value for '{}': {}", field.key, message);
        }
    }
    verdict
}

fn invalid(kind: FieldKind) -> ValidationFailure {
    ValidationFailure::new(format!("Please enter a valid {}.", kind))
}

fn parse_bool(raw: &str) -> Option<Value> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(Value::Bool(true)),
        "false" | "no" | "n" | "0" => Some(Value::Bool(false)),
        _ => None,
    }
}

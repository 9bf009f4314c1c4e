use thiserror::Error;

/// Domain-level failures shared by the calculators and the tool layer.
///
/// These are conversational errors: the workflow engine narrates them back
/// to the athlete as clarifying text, it never crashes on them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("unknown activity level `{0}` (expected sedentary|lightly_active|moderately_active|very_active|extremely_active)")]
    UnknownActivityLevel(String),
    #[error("unknown value `{value}` for `{field}`")]
    UnknownEnum { field: &'static str, value: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Message safe to show an end user. Never contains identifiers or
    /// internal detail beyond the offending input value.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownActivityLevel(value) => format!(
                "I didn't recognize the activity level \"{value}\". Could you pick one of: \
                 sedentary, lightly active, moderately active, very active, or extremely active?"
            ),
            Self::UnknownEnum { field, value } => {
                format!("I didn't recognize \"{value}\" as a {field}. Could you rephrase that?")
            }
            Self::Validation(message) => format!("That doesn't look quite right: {message}"),
            Self::InvariantViolation(_) => {
                "I couldn't apply that change without breaking your current plan. \
                 Could you give me a bit more detail?"
                    .to_string()
            }
        }
    }
}

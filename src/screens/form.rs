//! Pieces shared by every form-bearing screen.

use std::fmt::{self, Display, Formatter};

use crate::client::ClientError;

/// Client-side validation failure. The form is not submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    Required(&'static str),
    Invalid { field: &'static str, reason: String },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FormError::Required(field) => write!(f, "{} is required", field),
            FormError::Invalid { field, reason } => write!(f, "{} is invalid: {}", field, reason),
        }
    }
}

impl std::error::Error for FormError {}

#[derive(Debug)]
pub enum SubmitError {
    Invalid(FormError),
    Backend(ClientError),
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Invalid(e) => write!(f, "{}", e),
            SubmitError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Invalid(e) => Some(e),
            SubmitError::Backend(e) => Some(e),
        }
    }
}

impl From<FormError> for SubmitError {
    fn from(value: FormError) -> Self {
        SubmitError::Invalid(value)
    }
}

impl From<ClientError> for SubmitError {
    fn from(value: ClientError) -> Self {
        SubmitError::Backend(value)
    }
}

/// Blocking yes/no question asked before destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Native `required` semantics: the field must not be empty.
pub fn required(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        Err(FormError::Required(field))
    } else {
        Ok(())
    }
}

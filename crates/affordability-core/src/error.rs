use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Money;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid numeric input: {field}: {reason}")]
    InvalidNumericInput { field: String, reason: String },

    #[error("Policy misconfiguration: {field}: {reason}")]
    PolicyMisconfiguration { field: String, reason: String },

    #[error("Incomplete scenario: {scenario} requires {field}")]
    IncompleteScenario { scenario: String, field: String },

    #[error("Location lookup failed: {0}")]
    LookupFailed(String),

    #[error("Location lookup cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    pub fn invalid_numeric(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidNumericInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn policy(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::PolicyMisconfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn incomplete(scenario: impl Into<String>, field: impl Into<String>) -> Self {
        EngineError::IncompleteScenario {
            scenario: scenario.into(),
            field: field.into(),
        }
    }

    /// Stable code surfaced to the presentation layer.
    pub fn code(&self) -> IssueCode {
        match self {
            EngineError::InvalidNumericInput { .. } => IssueCode::InvalidNumericInput,
            EngineError::PolicyMisconfiguration { .. } => IssueCode::PolicyMisconfiguration,
            EngineError::IncompleteScenario { .. } => IssueCode::IncompleteScenario,
            EngineError::LookupFailed(_) => IssueCode::LookupFailed,
            EngineError::Cancelled => IssueCode::Cancelled,
            EngineError::SerializationError(_) => IssueCode::SerializationError,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::InvalidNumericInput { field, .. }
            | EngineError::PolicyMisconfiguration { field, .. }
            | EngineError::IncompleteScenario { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::SerializationError(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    InvalidNumericInput,
    PolicyMisconfiguration,
    IncompleteScenario,
    LookupFailed,
    Cancelled,
    SerializationError,
}

impl IssueCode {
    /// Fatal codes reject the calculation; the rest only degrade it.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            IssueCode::PolicyMisconfiguration
                | IssueCode::IncompleteScenario
                | IssueCode::SerializationError
        )
    }
}

/// A structured problem attached to an output envelope instead of being thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl From<&EngineError> for Issue {
    fn from(err: &EngineError) -> Self {
        Issue {
            code: err.code(),
            field: err.field().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// Collects issues and warnings while a pipeline degrades bad input to zero.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    issues: Vec<Issue>,
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, err: EngineError) {
        tracing::warn!(code = ?err.code(), "{err}");
        let issue = Issue::from(&err);
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }

    /// Unwrap a monetary result, recording the error and falling back to zero.
    pub fn money_or_zero(&mut self, result: crate::EngineResult<Money>) -> Money {
        match result {
            Ok(v) => v,
            Err(e) => {
                self.flag(e);
                Decimal::ZERO
            }
        }
    }

    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(|i| i.code.is_fatal())
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_parts(self) -> (Vec<Issue>, Vec<String>) {
        (self.issues, self.warnings)
    }
}

pub mod error;
pub mod types;

pub mod input;

pub mod income;

pub mod expenses;

pub mod policy;

pub mod serviceability;

pub mod deposit;

pub mod amortization;

pub mod resolver;

pub mod comparison;

pub mod scenario;

pub mod session;

pub mod what_if;

#[cfg(feature = "location")]
pub mod location;

pub use error::{Diagnostics, EngineError, Issue, IssueCode};
pub use scenario::{calculate, ApplicationSnapshot, CalculationOutcome};
pub use types::*;

/// Standard result type for all affordability operations
pub type EngineResult<T> = Result<T, EngineError>;

//! Suburb search and lending-area eligibility.
//!
//! The engine only defines the collaborator contract. `StaticDirectory` is an
//! in-memory implementation for previews, the CLI and tests.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Diagnostics, EngineError};
use crate::EngineResult;

/// Queries shorter than this return no matches.
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMatch {
    pub name: String,
    pub state: String,
    pub postcode: String,
    pub eligible: bool,
}

impl LocationMatch {
    pub fn new(name: &str, state: &str, postcode: &str, eligible: bool) -> Self {
        LocationMatch {
            name: name.to_string(),
            state: state.to_string(),
            postcode: postcode.to_string(),
            eligible,
        }
    }

    /// "Sydney NSW 2000", the label the wizard displays and stores.
    pub fn label(&self) -> String {
        format!("{} {} {}", self.name, self.state, self.postcode)
    }
}

/// Shared flag a caller sets when a newer query supersedes this one.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocking request/response suburb lookup.
pub trait LocationLookup {
    fn lookup(&self, query: &str, token: &CancellationToken) -> EngineResult<Vec<LocationMatch>>;
}

/// Fixed suburb list searched by case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticDirectory {
    pub entries: Vec<LocationMatch>,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        StaticDirectory {
            entries: vec![
                LocationMatch::new("Sydney", "NSW", "2000", true),
                LocationMatch::new("Melbourne", "VIC", "3000", true),
                LocationMatch::new("Brisbane", "QLD", "4000", true),
                LocationMatch::new("Perth", "WA", "6000", true),
                LocationMatch::new("Adelaide", "SA", "5000", true),
                LocationMatch::new("Test Suburb", "NSW", "9999", false),
            ],
        }
    }
}

impl LocationLookup for StaticDirectory {
    fn lookup(&self, query: &str, token: &CancellationToken) -> EngineResult<Vec<LocationMatch>> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&query)
                    || e.postcode.starts_with(&query)
                    || e.label().to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }
}

/// Eligibility of the best match for `query`, for `ApplicationSnapshot::location_eligible`.
///
/// Returns `None` when nothing matched, the lookup failed, or it was
/// superseded. Failures are recorded but never stop a calculation.
pub fn resolve_eligibility(
    lookup: &impl LocationLookup,
    query: &str,
    token: &CancellationToken,
    diag: &mut Diagnostics,
) -> Option<bool> {
    match lookup.lookup(query, token) {
        Ok(matches) => {
            let exact = matches
                .iter()
                .find(|m| m.label().eq_ignore_ascii_case(query.trim()));
            exact.or_else(|| matches.first()).map(|m| m.eligible)
        }
        Err(EngineError::Cancelled) => {
            tracing::debug!(query, "location lookup superseded");
            None
        }
        Err(e) => {
            diag.flag(e);
            None
        }
    }
}

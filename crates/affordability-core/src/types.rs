use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Issue;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates and ratios expressed as decimals (0.06 = 6%). Never as percentages.
pub type Rate = Decimal;

/// Loan terms in whole years.
pub type Years = u32;

/// Overall outcome of a computation once its issues are taken into account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationStatus {
    #[default]
    Complete,
    /// Some inputs were degraded to zero; figures are a live preview.
    Partial,
    /// Zero-valued result; see the attached issues.
    Rejected,
}

impl CalculationStatus {
    pub fn from_issues(issues: &[Issue]) -> Self {
        if issues.iter().any(|i| i.code.is_fatal()) {
            CalculationStatus::Rejected
        } else if issues.is_empty() {
            CalculationStatus::Complete
        } else {
            CalculationStatus::Partial
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub status: CalculationStatus,
    pub issues: Vec<Issue>,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

impl<T: Serialize> ComputationOutput<T> {
    pub fn is_rejected(&self) -> bool {
        self.status == CalculationStatus::Rejected
    }
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    issues: Vec<Issue>,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        status: CalculationStatus::from_issues(&issues),
        issues,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_status_from_issues() {
        assert_eq!(CalculationStatus::from_issues(&[]), CalculationStatus::Complete);

        let soft = Issue::from(&EngineError::invalid_numeric("incomes[0].amount", "empty"));
        assert_eq!(
            CalculationStatus::from_issues(std::slice::from_ref(&soft)),
            CalculationStatus::Partial
        );

        let hard = Issue::from(&EngineError::policy("max_lvr", "must be below 1"));
        assert_eq!(
            CalculationStatus::from_issues(&[soft, hard]),
            CalculationStatus::Rejected
        );
    }

    #[test]
    fn test_metadata_populated() {
        let out = with_metadata("test", &serde_json::json!({}), vec![], vec![], 5, 1u32);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.status, CalculationStatus::Complete);
        assert!(!out.is_rejected());
    }
}

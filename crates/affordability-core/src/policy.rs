use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Diagnostics, EngineError};
use crate::expenses::BenchmarkTable;
use crate::scenario::ScenarioKind;
use crate::types::{Rate, Years};
use crate::EngineResult;

pub const PRESET_VERSION: &str = "2024.1";
pub const DEFAULT_SERVICEABILITY_RATIO: Rate = dec!(0.30);
pub const DEFAULT_TERM_YEARS: Years = 30;
pub const MAX_TERM_YEARS: Years = 50;

// ---------------------------------------------------------------------------
// Lending policy
// ---------------------------------------------------------------------------

/// Lending terms applied to one side of an affordability comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingPolicy {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Maximum loan-to-value ratio, strictly between 0 and 1.
    pub max_lvr: Rate,
    pub annual_rate: Rate,
    /// Loan term used when the borrower states no repayment preference.
    /// Any other preference picks its own term.
    pub term_years: Years,
    /// LVR above which mortgage insurance is charged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_threshold_lvr: Option<Rate>,
}

fn default_version() -> String {
    "custom".to_string()
}

impl LendingPolicy {
    pub fn new(name: &str, max_lvr: Rate, annual_rate: Rate, term_years: Years) -> Self {
        LendingPolicy {
            name: name.to_string(),
            version: default_version(),
            max_lvr,
            annual_rate,
            term_years,
            insurance_threshold_lvr: None,
        }
    }

    pub fn with_insurance_threshold(mut self, threshold: Rate) -> Self {
        self.insurance_threshold_lvr = Some(threshold);
        self
    }

    pub fn with_term(mut self, term_years: Years) -> Self {
        self.term_years = term_years;
        self
    }

    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Reject configurations that would silently produce a wrong number.
    pub fn validate(&self) -> EngineResult<()> {
        let field = |f: &str| format!("{}.{f}", self.name);
        if self.max_lvr <= Decimal::ZERO || self.max_lvr >= Decimal::ONE {
            return Err(EngineError::policy(
                field("max_lvr"),
                format!("must be between 0 and 1 exclusive, got {}", self.max_lvr),
            ));
        }
        if self.annual_rate <= Decimal::ZERO || self.annual_rate > Decimal::ONE {
            return Err(EngineError::policy(
                field("annual_rate"),
                "must be positive and at most 1",
            ));
        }
        if self.term_years == 0 || self.term_years > MAX_TERM_YEARS {
            return Err(EngineError::policy(
                field("term_years"),
                format!("must be between 1 and {MAX_TERM_YEARS}, got {}", self.term_years),
            ));
        }
        if let Some(t) = self.insurance_threshold_lvr {
            if t <= Decimal::ZERO || t >= Decimal::ONE {
                return Err(EngineError::policy(
                    field("insurance_threshold_lvr"),
                    "must be between 0 and 1 exclusive",
                ));
            }
        }
        Ok(())
    }

    pub fn requires_insurance(&self, lvr: Rate) -> bool {
        self.insurance_threshold_lvr.is_some_and(|t| lvr > t)
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Named, versioned policy constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyPreset {
    /// Subject lender, owner-occupier: 98% LVR, no mortgage insurance.
    SubjectStandard,
    /// Subject lender, investor rate.
    SubjectInvestment,
    /// Typical bank purchase loan: 95% LVR with insurance above 80%.
    Conventional,
    /// Typical bank refinance: 80% LVR cap.
    ConventionalRefinance,
}

impl PolicyPreset {
    pub fn all() -> [PolicyPreset; 4] {
        [
            PolicyPreset::SubjectStandard,
            PolicyPreset::SubjectInvestment,
            PolicyPreset::Conventional,
            PolicyPreset::ConventionalRefinance,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            PolicyPreset::SubjectStandard => "subject-standard",
            PolicyPreset::SubjectInvestment => "subject-investment",
            PolicyPreset::Conventional => "conventional",
            PolicyPreset::ConventionalRefinance => "conventional-refinance",
        }
    }

    /// Accepts `name` or `name@version`; only the current version resolves.
    pub fn from_id(id: &str) -> Option<PolicyPreset> {
        let (name, version) = match id.split_once('@') {
            Some((n, v)) => (n, Some(v)),
            None => (id, None),
        };
        if version.is_some_and(|v| v != PRESET_VERSION) {
            return None;
        }
        PolicyPreset::all().into_iter().find(|p| p.name() == name)
    }

    pub fn policy(self) -> LendingPolicy {
        let (max_lvr, annual_rate, threshold) = match self {
            PolicyPreset::SubjectStandard => (dec!(0.98), dec!(0.0598), None),
            PolicyPreset::SubjectInvestment => (dec!(0.98), dec!(0.0648), None),
            PolicyPreset::Conventional => (dec!(0.95), dec!(0.065), Some(dec!(0.80))),
            PolicyPreset::ConventionalRefinance => (dec!(0.80), dec!(0.065), None),
        };
        LendingPolicy {
            name: self.name().to_string(),
            version: PRESET_VERSION.to_string(),
            max_lvr,
            annual_rate,
            term_years: DEFAULT_TERM_YEARS,
            insurance_threshold_lvr: threshold,
        }
    }
}

impl fmt::Display for PolicyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name(), PRESET_VERSION)
    }
}

/// Every policy one calculation may consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    pub subject: LendingPolicy,
    pub investment: LendingPolicy,
    pub reference: LendingPolicy,
    pub refinance_reference: LendingPolicy,
}

impl Default for PolicySet {
    fn default() -> Self {
        PolicySet {
            subject: PolicyPreset::SubjectStandard.policy(),
            investment: PolicyPreset::SubjectInvestment.policy(),
            reference: PolicyPreset::Conventional.policy(),
            refinance_reference: PolicyPreset::ConventionalRefinance.policy(),
        }
    }
}

impl PolicySet {
    pub fn subject_for(&self, kind: ScenarioKind) -> &LendingPolicy {
        match kind {
            ScenarioKind::Purchase | ScenarioKind::Refinance => &self.subject,
            ScenarioKind::Investment => &self.investment,
        }
    }

    pub fn reference_for(&self, kind: ScenarioKind) -> &LendingPolicy {
        match kind {
            ScenarioKind::Purchase | ScenarioKind::Investment => &self.reference,
            ScenarioKind::Refinance => &self.refinance_reference,
        }
    }

    /// Validate the two policies a scenario uses, flagging each failure.
    pub fn validate_for(&self, kind: ScenarioKind, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        for policy in [self.subject_for(kind), self.reference_for(kind)] {
            if let Err(e) = policy.validate() {
                diag.flag(e);
                ok = false;
            }
        }
        ok
    }
}

// ---------------------------------------------------------------------------
// Mortgage insurance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceBand {
    /// Upper LVR bound (inclusive) of this band.
    pub max_lvr: Rate,
    /// One-off premium as a fraction of the loan amount.
    pub premium_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceSchedule {
    pub bands: Vec<InsuranceBand>,
    pub above_top_band: Rate,
}

impl Default for InsuranceSchedule {
    fn default() -> Self {
        InsuranceSchedule {
            bands: vec![
                InsuranceBand {
                    max_lvr: dec!(0.85),
                    premium_rate: dec!(0.010),
                },
                InsuranceBand {
                    max_lvr: dec!(0.90),
                    premium_rate: dec!(0.020),
                },
                InsuranceBand {
                    max_lvr: dec!(0.95),
                    premium_rate: dec!(0.035),
                },
            ],
            above_top_band: dec!(0.045),
        }
    }
}

impl InsuranceSchedule {
    pub fn premium_rate(&self, lvr: Rate) -> Rate {
        self.bands
            .iter()
            .find(|b| lvr <= b.max_lvr)
            .map(|b| b.premium_rate)
            .unwrap_or(self.above_top_band)
    }
}

// ---------------------------------------------------------------------------
// Assessment settings
// ---------------------------------------------------------------------------

/// Engine-wide assessment parameters that are not part of a lender's policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSettings {
    /// Share of gross monthly income available for repayments.
    #[serde(default = "default_ratio")]
    pub serviceability_ratio: Rate,
    #[serde(default)]
    pub benchmark: BenchmarkTable,
    #[serde(default)]
    pub insurance: InsuranceSchedule,
}

fn default_ratio() -> Rate {
    DEFAULT_SERVICEABILITY_RATIO
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        AssessmentSettings {
            serviceability_ratio: DEFAULT_SERVICEABILITY_RATIO,
            benchmark: BenchmarkTable::default(),
            insurance: InsuranceSchedule::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for preset in PolicyPreset::all() {
            preset.policy().validate().unwrap();
        }
    }

    #[test]
    fn test_preset_ids_round_trip() {
        for preset in PolicyPreset::all() {
            assert_eq!(PolicyPreset::from_id(&preset.to_string()), Some(preset));
            assert_eq!(PolicyPreset::from_id(preset.name()), Some(preset));
        }
        assert_eq!(PolicyPreset::from_id("conventional@2019.1"), None);
        assert_eq!(PolicyPreset::from_id("nope"), None);
    }

    #[test]
    fn test_lvr_of_one_rejected() {
        let policy = LendingPolicy::new("bad", Decimal::ONE, dec!(0.06), 30);
        match policy.validate().unwrap_err() {
            EngineError::PolicyMisconfiguration { field, .. } => assert_eq!(field, "bad.max_lvr"),
            other => panic!("Expected PolicyMisconfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_term_rejected() {
        let policy = LendingPolicy::new("bad", dec!(0.9), dec!(0.06), 0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_excessive_term_rejected() {
        let policy = LendingPolicy::new("long", dec!(0.9), dec!(0.06), 1000);
        match policy.validate().unwrap_err() {
            EngineError::PolicyMisconfiguration { field, .. } => assert_eq!(field, "long.term_years"),
            other => panic!("Expected PolicyMisconfiguration, got {other:?}"),
        }
        LendingPolicy::new("edge", dec!(0.9), dec!(0.06), MAX_TERM_YEARS)
            .validate()
            .unwrap();
    }

    #[test]
    fn test_rate_above_one_rejected() {
        let policy = LendingPolicy::new("bad", dec!(0.9), dec!(6.5), 30);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let policy = LendingPolicy::new("bad", dec!(0.9), Decimal::ZERO, 30);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_requires_insurance() {
        let conventional = PolicyPreset::Conventional.policy();
        assert!(conventional.requires_insurance(dec!(0.95)));
        assert!(!conventional.requires_insurance(dec!(0.80)));
        assert!(!PolicyPreset::SubjectStandard.policy().requires_insurance(dec!(0.98)));
    }

    #[test]
    fn test_premium_bands() {
        let schedule = InsuranceSchedule::default();
        assert_eq!(schedule.premium_rate(dec!(0.82)), dec!(0.010));
        assert_eq!(schedule.premium_rate(dec!(0.90)), dec!(0.020));
        assert_eq!(schedule.premium_rate(dec!(0.93)), dec!(0.035));
        assert_eq!(schedule.premium_rate(dec!(0.97)), dec!(0.045));
    }

    #[test]
    fn test_policy_set_routing() {
        let set = PolicySet::default();
        assert_eq!(set.subject_for(ScenarioKind::Investment).annual_rate, dec!(0.0648));
        assert_eq!(set.reference_for(ScenarioKind::Refinance).max_lvr, dec!(0.80));
        assert_eq!(set.reference_for(ScenarioKind::Purchase).max_lvr, dec!(0.95));
    }

    #[test]
    fn test_validate_for_flags_each_policy() {
        let mut set = PolicySet::default();
        set.subject.max_lvr = dec!(1.2);
        set.reference.term_years = 0;
        let mut diag = Diagnostics::new();
        assert!(!set.validate_for(ScenarioKind::Purchase, &mut diag));
        assert_eq!(diag.issues().len(), 2);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: AssessmentSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AssessmentSettings::default());
    }
}

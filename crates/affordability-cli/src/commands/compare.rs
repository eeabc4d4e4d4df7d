use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use affordability_core::comparison::{self, ComparisonInput};
use affordability_core::policy::{LendingPolicy, PolicyPreset};

use crate::config::PolicyFile;
use crate::input;

/// Arguments for the lender comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON comparison input (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Gross annual household income
    #[arg(long)]
    pub annual_income: Option<Decimal>,

    /// Monthly living expenses
    #[arg(long)]
    pub monthly_expenses: Option<Decimal>,

    /// Deposit available
    #[arg(long)]
    pub deposit: Option<Decimal>,

    /// Subject policy preset (default: the configured subject policy)
    #[arg(long)]
    pub subject: Option<String>,

    /// Reference policy preset (default: the configured reference policy)
    #[arg(long)]
    pub reference: Option<String>,
}

pub fn run_compare(args: CompareArgs, policy: &PolicyFile) -> Result<Value, Box<dyn std::error::Error>> {
    let compare_input: ComparisonInput = match input::read_input(args.input.as_deref())? {
        Some(i) => i,
        None => {
            let policies = policy.policies();
            ComparisonInput {
                annual_income: args
                    .annual_income
                    .ok_or("--annual-income is required (or provide --input)")?,
                monthly_expenses: args
                    .monthly_expenses
                    .ok_or("--monthly-expenses is required (or provide --input)")?,
                deposit: args.deposit.ok_or("--deposit is required (or provide --input)")?,
                subject: preset_or(args.subject.as_deref(), policies.subject)?,
                reference: preset_or(args.reference.as_deref(), policies.reference)?,
                settings: policy.settings(),
            }
        }
    };
    let result = comparison::compare_offers(&compare_input);
    Ok(serde_json::to_value(result)?)
}

pub fn run_presets() -> Result<Value, Box<dyn std::error::Error>> {
    let rows: Vec<Value> = PolicyPreset::all()
        .into_iter()
        .map(|preset| {
            let p = preset.policy();
            json!({
                "id": preset.to_string(),
                "max_lvr": p.max_lvr,
                "annual_rate": p.annual_rate,
                "term_years": p.term_years,
                "insurance_threshold_lvr": p.insurance_threshold_lvr,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

fn preset_or(
    id: Option<&str>,
    fallback: LendingPolicy,
) -> Result<LendingPolicy, Box<dyn std::error::Error>> {
    match id {
        Some(id) => Ok(PolicyPreset::from_id(id)
            .ok_or_else(|| format!("unknown preset '{id}'"))?
            .policy()),
        None => Ok(fallback),
    }
}

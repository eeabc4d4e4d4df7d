use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use affordability_core::amortization::RepaymentPreference;
use affordability_core::deposit::DepositInput;
use affordability_core::expenses::{ExpenseOverride, Household};
use affordability_core::income::{Frequency, IncomeEntry};
use affordability_core::scenario::{
    self, ApplicationSnapshot, BuyingReason, InvestmentDetails, LoanGoal, RefinanceDetails,
};

use super::rate_input;
use crate::config::PolicyFile;
use crate::input;

/// Household flags shared by `calculate` and `refinance`.
#[derive(Args, Debug, Clone)]
pub struct HouseholdFlags {
    /// Gross income per applicant (repeat for a second applicant)
    #[arg(long = "income")]
    pub incomes: Vec<Decimal>,

    /// Frequency of every --income value
    #[arg(long, default_value = "annual")]
    pub frequency: String,

    /// Adults in the household
    #[arg(long, default_value_t = 1)]
    pub adults: u32,

    /// Dependent children
    #[arg(long, default_value_t = 0)]
    pub dependants: u32,

    /// Suburb, city or postcode of the target property
    #[arg(long)]
    pub location: Option<String>,

    /// Declared monthly living expenses (replaces the benchmark)
    #[arg(long)]
    pub expenses: Option<Decimal>,
}

impl HouseholdFlags {
    fn apply(&self, snapshot: &mut ApplicationSnapshot) -> Result<(), Box<dyn std::error::Error>> {
        let frequency: Frequency = serde_json::from_value(Value::String(self.frequency.clone()))
            .map_err(|_| {
                format!(
                    "--frequency must be weekly, fortnightly, monthly or annual, got '{}'",
                    self.frequency
                )
            })?;
        snapshot.incomes = self
            .incomes
            .iter()
            .map(|a| IncomeEntry::new(*a, frequency))
            .collect();
        snapshot.household = Household::new(self.adults, self.dependants, self.location.as_deref());
        snapshot.expense_override = self.expenses.map(ExpenseOverride::monthly);
        Ok(())
    }
}

/// Arguments for the full wizard calculation
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to JSON application snapshot (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub household: HouseholdFlags,

    /// Deposit available, including any gift
    #[arg(long)]
    pub deposit: Option<Decimal>,

    /// Portion of the deposit that is gifted
    #[arg(long)]
    pub gift: Option<Decimal>,

    /// Equity released from property already owned, added to the deposit
    #[arg(long)]
    pub equity: Option<Decimal>,

    /// Repayment preference: lowest-repayment, fastest-payoff, flexibility, lowest-rate, no-preference
    #[arg(long, default_value = "no-preference")]
    pub preference: String,

    /// Expected weekly rent; makes this an investment purchase
    #[arg(long)]
    pub weekly_rent: Option<Decimal>,
}

/// Arguments for a refinance calculation
#[derive(Args)]
pub struct RefinanceArgs {
    /// Path to JSON application snapshot (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub household: HouseholdFlags,

    /// Outstanding loan balance
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Current interest rate ("6.5", "6.5%" or "0.065")
    #[arg(long)]
    pub current_rate: Option<String>,

    /// Remaining term in years
    #[arg(long)]
    pub remaining_term: Option<u32>,

    /// Current property value
    #[arg(long)]
    pub property_value: Option<Decimal>,
}

pub fn run_calculate(args: CalculateArgs, policy: &PolicyFile) -> Result<Value, Box<dyn std::error::Error>> {
    let mut snapshot: ApplicationSnapshot = match input::read_input(args.input.as_deref())? {
        Some(s) => s,
        None => {
            let mut snapshot = ApplicationSnapshot::default();
            args.household.apply(&mut snapshot)?;
            let deposit = args
                .deposit
                .ok_or("--deposit is required (or provide --input)")?;
            snapshot.deposit = DepositInput::new(deposit);
            if let Some(equity) = args.equity {
                snapshot.deposit = snapshot.deposit.with_equity(equity);
            }
            if let Some(gift) = args.gift {
                snapshot.deposit.includes_gift = true;
                snapshot.deposit.gift_amount = Some(gift.into());
            }
            snapshot.preference = serde_json::from_value::<RepaymentPreference>(Value::String(
                args.preference.clone(),
            ))
            .map_err(|_| format!("unknown --preference '{}'", args.preference))?;
            if let Some(rent) = args.weekly_rent {
                snapshot.buying_reason = Some(BuyingReason::ToInvest);
                snapshot.investment = Some(InvestmentDetails {
                    expected_weekly_rent: Some(rent.into()),
                    property_type: None,
                });
            }
            snapshot
        }
    };
    policy.apply(&mut snapshot);
    let result = scenario::calculate(&snapshot);
    Ok(serde_json::to_value(result)?)
}

pub fn run_refinance(args: RefinanceArgs, policy: &PolicyFile) -> Result<Value, Box<dyn std::error::Error>> {
    let mut snapshot: ApplicationSnapshot = match input::read_input(args.input.as_deref())? {
        Some(s) => s,
        None => {
            let mut snapshot = ApplicationSnapshot::default();
            args.household.apply(&mut snapshot)?;
            snapshot.refinance = Some(RefinanceDetails {
                current_balance: Some(
                    args.balance
                        .ok_or("--balance is required (or provide --input)")?
                        .into(),
                ),
                current_rate: Some(rate_input(
                    args.current_rate
                        .as_deref()
                        .ok_or("--current-rate is required (or provide --input)")?,
                )),
                remaining_term_years: Some(
                    Decimal::from(
                        args.remaining_term
                            .ok_or("--remaining-term is required (or provide --input)")?,
                    )
                    .into(),
                ),
                property_value: Some(
                    args.property_value
                        .ok_or("--property-value is required (or provide --input)")?
                        .into(),
                ),
            });
            snapshot
        }
    };
    snapshot.loan_goal = LoanGoal::Refinancing;
    policy.apply(&mut snapshot);
    let result = scenario::calculate(&snapshot);
    Ok(serde_json::to_value(result)?)
}

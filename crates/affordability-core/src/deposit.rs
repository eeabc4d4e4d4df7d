use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostics, EngineError};
use crate::input::{checked_add, checked_div, checked_mul, parse_amount, AmountField};
use crate::types::{Money, Rate};
use crate::EngineResult;

/// Deposit as entered in the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositInput {
    #[serde(default)]
    pub amount: Option<AmountField>,
    #[serde(default)]
    pub includes_gift: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_amount: Option<AmountField>,
    /// Equity released from property the household already owns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_amount: Option<AmountField>,
}

impl DepositInput {
    pub fn new(amount: Money) -> Self {
        DepositInput {
            amount: Some(AmountField::Number(amount)),
            includes_gift: false,
            gift_amount: None,
            equity_amount: None,
        }
    }

    pub fn with_equity(mut self, equity: Money) -> Self {
        self.equity_amount = Some(AmountField::Number(equity));
        self
    }
}

/// Validated deposit.
///
/// `amount` is the total put towards the purchase: `savings + equity_amount`.
/// Gift money is part of `savings`, never added on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub amount: Money,
    pub savings: Money,
    pub includes_gift: bool,
    pub gift_amount: Money,
    pub equity_amount: Money,
}

impl Deposit {
    pub fn new(amount: Money) -> Self {
        Deposit {
            amount,
            savings: amount,
            includes_gift: false,
            gift_amount: Decimal::ZERO,
            equity_amount: Decimal::ZERO,
        }
    }

    pub fn genuine_savings(&self) -> Money {
        self.savings - self.gift_amount
    }
}

/// Parse the deposit, degrading bad numbers to zero and clamping the gift.
pub fn resolve_deposit(input: &DepositInput, diag: &mut Diagnostics) -> Deposit {
    let savings = match &input.amount {
        Some(v) => diag.money_or_zero(parse_amount("deposit.amount", v)),
        None => {
            diag.flag(EngineError::invalid_numeric("deposit.amount", "value is missing"));
            Decimal::ZERO
        }
    };

    let mut gift_amount = match (&input.gift_amount, input.includes_gift) {
        (Some(v), true) => diag.money_or_zero(parse_amount("deposit.gift_amount", v)),
        _ => Decimal::ZERO,
    };
    if gift_amount > savings {
        diag.warn(format!(
            "Gift amount ({gift_amount}) exceeds the cash deposit ({savings}); capped at the deposit."
        ));
        gift_amount = savings;
    }

    let equity_amount = match &input.equity_amount {
        Some(v) => diag.money_or_zero(parse_amount("deposit.equity_amount", v)),
        None => Decimal::ZERO,
    };
    let amount = match checked_add("deposit.equity_amount", savings, equity_amount) {
        Ok(total) => total,
        Err(e) => {
            diag.flag(e);
            savings
        }
    };

    Deposit {
        amount,
        savings,
        includes_gift: input.includes_gift,
        gift_amount,
        equity_amount: amount - savings,
    }
}

/// Largest loan a deposit supports at the given maximum LVR:
/// `deposit * lvr / (1 - lvr)`.
///
/// Mortgage insurance is never folded into this figure.
pub fn max_loan_by_deposit(deposit: Money, max_lvr: Rate) -> EngineResult<Money> {
    if deposit < Decimal::ZERO {
        return Err(EngineError::invalid_numeric("deposit", "cannot be negative"));
    }
    if max_lvr >= Decimal::ONE || max_lvr <= Decimal::ZERO {
        return Err(EngineError::policy(
            "max_lvr",
            format!("must be between 0 and 1 exclusive, got {max_lvr}"),
        ));
    }
    let scaled = checked_mul("deposit", deposit, max_lvr)?;
    checked_div("deposit", scaled, Decimal::ONE - max_lvr)
}

/// Loan-to-value ratio, or `None` when there is no property value.
pub fn effective_lvr(loan: Money, property_value: Money) -> Option<Rate> {
    if property_value <= Decimal::ZERO {
        None
    } else {
        loan.checked_div(property_value)
    }
}

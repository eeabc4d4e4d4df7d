use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::term_for_preference;
use crate::deposit::resolve_deposit;
use crate::error::{Diagnostics, EngineError};
use crate::expenses::estimate_expenses_with;
use crate::income::normalize_income;
use crate::input::checked_add;
use crate::policy::{AssessmentSettings, LendingPolicy};
use crate::resolver::{affordability, AffordabilityResult, BindingConstraint};
use crate::scenario::ApplicationSnapshot;
use crate::types::*;
use crate::EngineResult;

/// Upper bound on values per axis so a careless step cannot build a huge grid.
pub const MAX_AXIS_POINTS: usize = 60;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// An input the what-if panel lets the user drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhatIfVariable {
    Deposit,
    AnnualIncome,
    MonthlyExpenses,
    AnnualRate,
    MaxLvr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhatIfMetric {
    #[default]
    MaxLoanAmount,
    MaxPropertyValue,
    MonthlyRepayment,
}

impl WhatIfMetric {
    fn read(self, result: &AffordabilityResult) -> Money {
        match self {
            WhatIfMetric::MaxLoanAmount => result.max_loan_amount,
            WhatIfMetric::MaxPropertyValue => result.max_property_value,
            WhatIfMetric::MonthlyRepayment => result.monthly_repayment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfAxis {
    pub variable: WhatIfVariable,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Household figures and policy every grid cell starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfBase {
    pub annual_income: Money,
    pub monthly_expenses: Money,
    pub deposit: Money,
    pub policy: LendingPolicy,
}

impl WhatIfBase {
    /// Resolve a wizard snapshot into base figures under its subject policy.
    pub fn from_snapshot(snapshot: &ApplicationSnapshot, diag: &mut Diagnostics) -> Self {
        let income = normalize_income(&snapshot.incomes, diag);
        let household = snapshot.household.normalised(diag);
        let expenses = estimate_expenses_with(
            &snapshot.settings.benchmark,
            &household,
            snapshot.expense_override.as_ref(),
            diag,
        );
        let deposit = resolve_deposit(&snapshot.deposit, diag);
        let policy = snapshot.policies.subject_for(snapshot.kind());
        let term = term_for_preference(snapshot.preference, policy.term_years);

        WhatIfBase {
            annual_income: income.annual_total,
            monthly_expenses: expenses.monthly_amount,
            deposit: deposit.amount,
            policy: policy.clone().with_term(term),
        }
    }

    fn value_of(&self, variable: WhatIfVariable) -> Decimal {
        match variable {
            WhatIfVariable::Deposit => self.deposit,
            WhatIfVariable::AnnualIncome => self.annual_income,
            WhatIfVariable::MonthlyExpenses => self.monthly_expenses,
            WhatIfVariable::AnnualRate => self.policy.annual_rate,
            WhatIfVariable::MaxLvr => self.policy.max_lvr,
        }
    }

    fn with_value(&self, variable: WhatIfVariable, value: Decimal) -> WhatIfBase {
        let mut out = self.clone();
        match variable {
            WhatIfVariable::Deposit => out.deposit = value,
            WhatIfVariable::AnnualIncome => out.annual_income = value,
            WhatIfVariable::MonthlyExpenses => out.monthly_expenses = value,
            WhatIfVariable::AnnualRate => out.policy.annual_rate = value,
            WhatIfVariable::MaxLvr => out.policy.max_lvr = value,
        }
        out
    }

    fn evaluate(&self, settings: &AssessmentSettings) -> EngineResult<AffordabilityResult> {
        affordability(
            self.annual_income,
            self.monthly_expenses,
            self.deposit,
            &self.policy,
            settings,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfInput {
    pub base: WhatIfBase,
    pub rows: WhatIfAxis,
    pub columns: WhatIfAxis,
    #[serde(default)]
    pub metric: WhatIfMetric,
    #[serde(default)]
    pub settings: AssessmentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfOutput {
    pub row_variable: WhatIfVariable,
    pub column_variable: WhatIfVariable,
    pub row_values: Vec<Decimal>,
    pub column_values: Vec<Decimal>,
    pub metric: WhatIfMetric,
    /// matrix[i][j] = metric at row_values[i], column_values[j]
    pub matrix: Vec<Vec<Money>>,
    /// Which ceiling bound in each cell.
    pub binding: Vec<Vec<BindingConstraint>>,
    pub base_case_value: Money,
    /// Grid cell closest to the unmodified base figures (row, col).
    pub base_case_position: (usize, usize),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate the affordability metric over a two-variable grid.
///
/// Cells that fail (an LVR of 1, a zero rate) are zero with a warning; only a
/// malformed axis fails the whole request.
pub fn run_what_if(input: &WhatIfInput) -> EngineResult<ComputationOutput<WhatIfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rows.variable == input.columns.variable {
        return Err(EngineError::invalid_numeric(
            "columns.variable",
            "must differ from rows.variable",
        ));
    }
    let row_values = generate_sweep_values("rows", &input.rows)?;
    let column_values = generate_sweep_values("columns", &input.columns)?;

    let mut matrix = Vec::with_capacity(row_values.len());
    let mut binding = Vec::with_capacity(row_values.len());
    for rv in &row_values {
        let row_base = input.base.with_value(input.rows.variable, *rv);
        let mut row = Vec::with_capacity(column_values.len());
        let mut row_binding = Vec::with_capacity(column_values.len());
        for cv in &column_values {
            let cell = row_base.with_value(input.columns.variable, *cv);
            match cell.evaluate(&input.settings) {
                Ok(result) => {
                    row.push(input.metric.read(&result));
                    row_binding.push(result.binding_constraint);
                }
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({rv}, {cv}): {e}"));
                    row.push(Decimal::ZERO);
                    row_binding.push(BindingConstraint::default());
                }
            }
        }
        matrix.push(row);
        binding.push(row_binding);
    }

    let base_case_value = match input.base.evaluate(&input.settings) {
        Ok(result) => input.metric.read(&result),
        Err(e) => {
            warnings.push(format!("Base case could not be evaluated: {e}"));
            Decimal::ZERO
        }
    };
    let base_case_position = (
        closest_index(&row_values, input.base.value_of(input.rows.variable)),
        closest_index(&column_values, input.base.value_of(input.columns.variable)),
    );

    tracing::debug!(
        rows = row_values.len(),
        columns = column_values.len(),
        failed = warnings.len(),
        "what-if grid evaluated"
    );

    let output = WhatIfOutput {
        row_variable: input.rows.variable,
        column_variable: input.columns.variable,
        row_values,
        column_values,
        metric: input.metric,
        matrix,
        binding,
        base_case_value,
        base_case_position,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-way what-if grid over the affordability pipeline",
        &serde_json::json!({
            "rows": input.rows.variable,
            "columns": input.columns.variable,
            "metric": input.metric,
            "policy": input.base.policy.label(),
        }),
        Vec::new(),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Values from min to max by step, with max appended if the step overshoots it.
fn generate_sweep_values(axis_name: &str, axis: &WhatIfAxis) -> EngineResult<Vec<Decimal>> {
    if axis.step <= Decimal::ZERO {
        return Err(EngineError::invalid_numeric(
            format!("{axis_name}.step"),
            "step must be positive",
        ));
    }
    if axis.min > axis.max {
        return Err(EngineError::invalid_numeric(
            format!("{axis_name}.min"),
            "min must be <= max",
        ));
    }
    if axis.min < Decimal::ZERO {
        return Err(EngineError::invalid_numeric(
            format!("{axis_name}.min"),
            "cannot be negative",
        ));
    }

    let step_field = format!("{axis_name}.step");
    let mut values = Vec::new();
    let mut current = axis.min;
    while current <= axis.max && values.len() <= MAX_AXIS_POINTS {
        values.push(current);
        current = checked_add(&step_field, current, axis.step)?;
    }
    if let Some(&last) = values.last() {
        if last < axis.max {
            values.push(axis.max);
        }
    }
    if values.len() > MAX_AXIS_POINTS {
        return Err(EngineError::invalid_numeric(
            step_field,
            format!("axis would exceed {MAX_AXIS_POINTS} values"),
        ));
    }
    Ok(values)
}

fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

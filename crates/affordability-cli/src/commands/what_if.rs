use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use affordability_core::error::Diagnostics;
use affordability_core::scenario::ApplicationSnapshot;
use affordability_core::what_if::{self, WhatIfAxis, WhatIfBase, WhatIfInput, WhatIfMetric, WhatIfVariable};

use crate::config::PolicyFile;
use crate::input;

/// Arguments for the what-if grid
#[derive(Args)]
pub struct WhatIfArgs {
    /// Path to a full JSON what-if input (overrides the other flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Application snapshot supplying the base case
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Row variable as name:min:max:step (e.g. "annual_income:60000:120000:10000")
    #[arg(long)]
    pub rows: Option<String>,

    /// Column variable as name:min:max:step (e.g. "deposit:0:80000:20000")
    #[arg(long)]
    pub columns: Option<String>,

    /// max_loan_amount, max_property_value or monthly_repayment
    #[arg(long, default_value = "max_loan_amount")]
    pub metric: String,
}

pub fn run_what_if(args: WhatIfArgs, policy: &PolicyFile) -> Result<Value, Box<dyn std::error::Error>> {
    let what_if_input: WhatIfInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else {
        let mut snapshot: ApplicationSnapshot = input::read_input(args.snapshot.as_deref())?
            .ok_or("--snapshot <file.json>, --input or stdin required for what-if")?;
        policy.apply(&mut snapshot);

        let mut diag = Diagnostics::new();
        let base = WhatIfBase::from_snapshot(&snapshot, &mut diag);
        for issue in diag.issues() {
            tracing::warn!(code = ?issue.code, "{}", issue.message);
        }

        WhatIfInput {
            base,
            rows: parse_axis(args.rows.as_deref().ok_or("--rows is required")?)?,
            columns: parse_axis(args.columns.as_deref().ok_or("--columns is required")?)?,
            metric: serde_json::from_value::<WhatIfMetric>(Value::String(args.metric.clone()))
                .map_err(|_| format!("unknown --metric '{}'", args.metric))?,
            settings: snapshot.settings,
        }
    };
    let result = what_if::run_what_if(&what_if_input)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_axis(spec: &str) -> Result<WhatIfAxis, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("what-if axis must be name:min:max:step, got '{spec}'").into());
    }
    let variable: WhatIfVariable = serde_json::from_value(Value::String(parts[0].to_string()))
        .map_err(|_| format!("unknown what-if variable '{}'", parts[0]))?;
    Ok(WhatIfAxis {
        variable,
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

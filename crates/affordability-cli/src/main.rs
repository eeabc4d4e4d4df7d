mod commands;
mod config;
mod input;
mod output;
mod telemetry;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::calculate::{CalculateArgs, RefinanceArgs};
use commands::compare::CompareArgs;
use commands::components::{
    DepositCeilingArgs, ExpensesArgs, RepaymentArgs, ScheduleArgs, ServiceabilityArgs,
};
use commands::lookup::LookupArgs;
use commands::what_if::WhatIfArgs;
use config::PolicyFile;

/// Home-loan affordability estimates
#[derive(Parser)]
#[command(
    name = "afford",
    version,
    about = "Home-loan affordability estimates",
    long_about = "Estimate how much a household can borrow, what it would repay and how \
                  the subject lender compares with a conventional bank. Covers purchase, \
                  refinance and investment scenarios with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "affordability_core=trace")
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// JSON or YAML file with `policies` and/or `settings` overriding the presets
    #[arg(long, global = true)]
    policy_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full wizard calculation for an application snapshot
    Calculate(CalculateArgs),
    /// Estimate monthly living expenses from the household benchmark
    Expenses(ExpensesArgs),
    /// Serviceability-constrained loan ceiling
    Serviceability(ServiceabilityArgs),
    /// Deposit/LVR-constrained loan ceiling
    DepositCeiling(DepositCeilingArgs),
    /// Monthly repayment for a loan
    Repayment(RepaymentArgs),
    /// Year-by-year amortisation schedule
    Schedule(ScheduleArgs),
    /// Compare the subject lender with a conventional lender
    Compare(CompareArgs),
    /// Refinance savings and accessible equity
    Refinance(RefinanceArgs),
    /// Two-way what-if grid over income, deposit, expenses, rate or LVR
    WhatIf(WhatIfArgs),
    /// Search suburbs and report lending-area eligibility
    Lookup(LookupArgs),
    /// List the built-in lending policy presets
    Presets,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init(&cli.log_level) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }

    let policy_file = match PolicyFile::load(cli.policy_file.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::calculate::run_calculate(args, &policy_file),
        Commands::Expenses(args) => commands::components::run_expenses(args, &policy_file),
        Commands::Serviceability(args) => {
            commands::components::run_serviceability(args, &policy_file)
        }
        Commands::DepositCeiling(args) => {
            commands::components::run_deposit_ceiling(args, &policy_file)
        }
        Commands::Repayment(args) => commands::components::run_repayment(args),
        Commands::Schedule(args) => commands::components::run_schedule(args),
        Commands::Compare(args) => commands::compare::run_compare(args, &policy_file),
        Commands::Refinance(args) => commands::calculate::run_refinance(args, &policy_file),
        Commands::WhatIf(args) => commands::what_if::run_what_if(args, &policy_file),
        Commands::Lookup(args) => commands::lookup::run_lookup(args),
        Commands::Presets => commands::compare::run_presets(),
        Commands::Version => {
            println!("afford {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

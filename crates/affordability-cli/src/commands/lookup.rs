use clap::Args;
use serde_json::{json, Value};

use affordability_core::error::Diagnostics;
use affordability_core::location::{resolve_eligibility, CancellationToken, LocationLookup, StaticDirectory};

use crate::input;

/// Arguments for suburb search
#[derive(Args)]
pub struct LookupArgs {
    /// Free-text suburb, city or postcode
    #[arg(long)]
    pub query: String,

    /// JSON directory of suburbs to search instead of the built-in list
    #[arg(long)]
    pub directory: Option<String>,
}

pub fn run_lookup(args: LookupArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let directory: StaticDirectory = match args.directory {
        Some(ref path) => input::file::read_json(path)?,
        None => StaticDirectory::default(),
    };
    let token = CancellationToken::new();

    let matches = directory.lookup(&args.query, &token)?;
    let mut diag = Diagnostics::new();
    let eligible = resolve_eligibility(&directory, &args.query, &token, &mut diag);

    Ok(json!({
        "query": args.query,
        "eligible": eligible,
        "matches": matches,
    }))
}

use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use affordability_core::amortization::{self, RepaymentPreference};
use affordability_core::input::{parse_rate, AmountField};
use affordability_core::location::{self, CancellationToken, LocationLookup, LocationMatch};
use affordability_core::policy::DEFAULT_TERM_YEARS;
use affordability_core::Diagnostics;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Wizard pipeline
// ---------------------------------------------------------------------------

/// Full calculation for an application snapshot. Always returns an envelope;
/// only malformed JSON is thrown.
#[napi]
pub fn calculate(input_json: String) -> NapiResult<String> {
    let snapshot: affordability_core::ApplicationSnapshot =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = affordability_core::calculate(&snapshot);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn estimate_expenses(input_json: String) -> NapiResult<String> {
    let request: affordability_core::expenses::ExpenseRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = affordability_core::expenses::assess_expenses(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_offers(input_json: String) -> NapiResult<String> {
    let input: affordability_core::comparison::ComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = affordability_core::comparison::compare_offers(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn what_if(input_json: String) -> NapiResult<String> {
    let input: affordability_core::what_if::WhatIfInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = affordability_core::what_if::run_what_if(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Repayments
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RepaymentRequest {
    principal: Decimal,
    annual_rate: AmountField,
    #[serde(default)]
    term_years: Option<u32>,
    #[serde(default)]
    preference: Option<RepaymentPreference>,
}

#[derive(Serialize)]
struct RepaymentResponse {
    monthly_repayment: Decimal,
    total_interest: Decimal,
    annual_rate: Decimal,
    term_years: u32,
}

#[napi]
pub fn monthly_repayment(input_json: String) -> NapiResult<String> {
    let request: RepaymentRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let annual_rate = parse_rate("annual_rate", &request.annual_rate).map_err(to_napi_error)?;
    let term_years = request.term_years.unwrap_or_else(|| {
        amortization::term_for_preference(request.preference.unwrap_or_default(), DEFAULT_TERM_YEARS)
    });
    let response = RepaymentResponse {
        monthly_repayment: amortization::monthly_repayment(request.principal, annual_rate, term_years)
            .map_err(to_napi_error)?,
        total_interest: amortization::total_interest(request.principal, annual_rate, term_years)
            .map_err(to_napi_error)?,
        annual_rate,
        term_years,
    };
    serde_json::to_string(&response).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LookupRequest {
    query: String,
    #[serde(default)]
    directory: Option<location::StaticDirectory>,
}

#[derive(Serialize)]
struct LookupResponse {
    matches: Vec<LocationMatch>,
    eligible: Option<bool>,
}

#[napi]
pub fn lookup_location(input_json: String) -> NapiResult<String> {
    let request: LookupRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let directory = request.directory.unwrap_or_default();
    let token = CancellationToken::new();
    let matches = directory.lookup(&request.query, &token).map_err(to_napi_error)?;
    let mut diag = Diagnostics::new();
    let eligible = location::resolve_eligibility(&directory, &request.query, &token, &mut diag);
    serde_json::to_string(&LookupResponse { matches, eligible }).map_err(to_napi_error)
}

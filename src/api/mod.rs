use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    AllocationPlan, DEFAULT_MAX_PLAN_MONTHS, FundingQuote, FundingStyle, Goal, GoalKind,
    GoalTarget, RetirementProfile, RetirementScenario, ReturnPhase, annuity_factor, build_plan,
    calculate_required_pmt, emergency_fund_target, quote_target, resolve_scenario,
    resolve_target,
};

const MAX_PLAN_MONTHS_LIMIT: u32 = 6_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFundingStyle {
    Parallel,
    Hybrid,
    Sequential,
}

impl From<CliFundingStyle> for FundingStyle {
    fn from(value: CliFundingStyle) -> Self {
        match value {
            CliFundingStyle::Parallel => FundingStyle::Parallel,
            CliFundingStyle::Hybrid => FundingStyle::Hybrid,
            CliFundingStyle::Sequential => FundingStyle::Sequential,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "goalplan",
    about = "Goal funding and allocation engine for expatriate financial plans"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value_t = 3.0,
        help = "Annual inflation in percent, used when a retirement goal has none"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_PLAN_MONTHS,
        help = "Longest allocation plan to build, in months"
    )]
    max_plan_months: u32,
    #[arg(
        long,
        global = true,
        help = "Date horizons are measured from (YYYY-MM-DD); defaults to today"
    )]
    reference_date: Option<NaiveDate>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Solve the monthly contribution for one target
    Pmt {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        horizon_months: u32,
        #[arg(
            long,
            value_delimiter = ',',
            required = true,
            help = "Annual return per phase in percent, e.g. 6,12"
        )]
        rate: Vec<f64>,
        #[arg(
            long,
            value_delimiter = ',',
            help = "Phase lengths in months; defaults to one phase covering the horizon"
        )]
        lengths: Vec<u32>,
    },
    /// Build an allocation plan from a JSON request file
    Plan {
        file: PathBuf,
        #[arg(long, value_enum, help = "Override the file's funding style")]
        funding_style: Option<CliFundingStyle>,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug)]
pub struct Settings {
    pub inflation_rate_pct: f64,
    pub max_plan_months: u32,
    pub reference_date: Option<NaiveDate>,
}

impl Settings {
    fn reference_date(&self, requested: Option<NaiveDate>) -> NaiveDate {
        requested
            .or(self.reference_date)
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PmtPayload {
    target_amount: f64,
    horizon_months: u32,
    phases: Vec<ReturnPhase>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PmtResponse {
    required_pmt: f64,
    annuity_factor: f64,
    horizon_months: u32,
    fallback: bool,
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotePayload {
    reference_date: Option<NaiveDate>,
    goal: Goal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    reference_date: NaiveDate,
    quote: FundingQuote,
    payout_installment: Option<f64>,
    retirement: Option<RetirementScenario>,
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetirementPayload {
    profile: RetirementProfile,
    today_monthly_cost: f64,
    inflation_rate_pct: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanPayload {
    reference_date: Option<NaiveDate>,
    monthly_budget: f64,
    funding_style: FundingStyle,
    goals: Vec<Goal>,
    max_months: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    reference_date: NaiveDate,
    quotes: Vec<FundingQuote>,
    plan: AllocationPlan,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_settings(cli: &Cli) -> Result<Settings, String> {
    if !cli.inflation_rate.is_finite() || cli.inflation_rate <= -100.0 {
        return Err("--inflation-rate must be > -100".to_string());
    }
    if cli.max_plan_months == 0 || cli.max_plan_months > MAX_PLAN_MONTHS_LIMIT {
        return Err(format!(
            "--max-plan-months must be between 1 and {MAX_PLAN_MONTHS_LIMIT}"
        ));
    }

    Ok(Settings {
        inflation_rate_pct: cli.inflation_rate,
        max_plan_months: cli.max_plan_months,
        reference_date: cli.reference_date,
    })
}

pub async fn run(cli: Cli) -> Result<(), RunError> {
    let settings = build_settings(&cli).map_err(RunError::Invalid)?;

    match cli.command {
        Command::Serve { port } => run_http_server(settings, port).await?,
        Command::Pmt {
            amount,
            horizon_months,
            rate,
            lengths,
        } => {
            let payload = pmt_payload_from_flags(amount, horizon_months, &rate, &lengths)?;
            let response = pmt_response(payload).map_err(RunError::Invalid)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Plan {
            file,
            funding_style,
        } => {
            let raw = std::fs::read_to_string(&file)?;
            let mut payload = serde_json::from_str::<PlanPayload>(&raw)?;
            if let Some(style) = funding_style {
                payload.funding_style = style.into();
            }
            let response = plan_response(&settings, payload).map_err(RunError::Invalid)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

fn pmt_payload_from_flags(
    amount: f64,
    horizon_months: u32,
    rates_pct: &[f64],
    lengths: &[u32],
) -> Result<PmtPayload, RunError> {
    let phases = if lengths.is_empty() {
        if rates_pct.len() != 1 {
            return Err(RunError::Invalid(
                "--lengths is required when more than one --rate is given".to_string(),
            ));
        }
        vec![ReturnPhase::new(horizon_months, rates_pct[0] / 100.0)]
    } else {
        if lengths.len() != rates_pct.len() {
            return Err(RunError::Invalid(
                "--lengths and --rate must have the same number of entries".to_string(),
            ));
        }
        lengths
            .iter()
            .zip(rates_pct)
            .map(|(&len, &pct)| ReturnPhase::new(len, pct / 100.0))
            .collect()
    };

    Ok(PmtPayload {
        target_amount: amount,
        horizon_months,
        phases,
    })
}

pub async fn run_http_server(settings: Settings, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/pmt", post(pmt_handler))
        .route("/api/goals/quote", post(quote_handler))
        .route("/api/retirement", post(retirement_handler))
        .route("/api/plan", post(plan_handler))
        .fallback(not_found_handler)
        .with_state(settings);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("goalplan HTTP API listening on http://{addr}");
    tracing::info!("Local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn pmt_handler(Json(payload): Json<PmtPayload>) -> Response {
    match pmt_response(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn quote_handler(
    State(settings): State<Settings>,
    Json(payload): Json<QuotePayload>,
) -> Response {
    match quote_response(&settings, payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn retirement_handler(
    State(settings): State<Settings>,
    Json(payload): Json<RetirementPayload>,
) -> Response {
    match retirement_response(&settings, payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn plan_handler(
    State(settings): State<Settings>,
    Json(payload): Json<PlanPayload>,
) -> Response {
    match plan_response(&settings, payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn validate_goal(goal: &Goal) -> Result<(), String> {
    if goal.id.trim().is_empty() {
        return Err("goal id must not be empty".to_string());
    }
    if !goal.amount.is_finite() {
        return Err(format!("goal {}: amount must be finite", goal.id));
    }
    for phase in &goal.return_phases {
        if phase.length_months == 0 {
            return Err(format!("goal {}: phase lengthMonths must be >= 1", goal.id));
        }
        if !phase.annual_rate.is_finite() || phase.annual_rate < 0.0 {
            return Err(format!("goal {}: phase annualRate must be >= 0", goal.id));
        }
    }

    match &goal.kind {
        GoalKind::EmergencyFund {
            buffer_months,
            monthly_expenses,
        } => {
            if !monthly_expenses.is_finite() || *monthly_expenses < 0.0 {
                return Err(format!("goal {}: monthlyExpenses must be >= 0", goal.id));
            }
            let target = emergency_fund_target(*monthly_expenses, *buffer_months);
            if goal.amount > 0.0 && target > 0.0 && (goal.amount - target).abs() > 0.01 {
                return Err(format!(
                    "goal {}: amount {} must equal bufferMonths x monthlyExpenses ({target})",
                    goal.id, goal.amount
                ));
            }
        }
        GoalKind::Retirement {
            profile,
            today_monthly_cost,
            inflation_rate_pct,
        } => {
            validate_retirement_inputs(profile, *today_monthly_cost, *inflation_rate_pct)
                .map_err(|msg| format!("goal {}: {msg}", goal.id))?;
        }
        _ => {}
    }
    Ok(())
}

fn validate_retirement_inputs(
    profile: &RetirementProfile,
    today_monthly_cost: f64,
    inflation_rate_pct: Option<f64>,
) -> Result<(), String> {
    if !today_monthly_cost.is_finite() || today_monthly_cost < 0.0 {
        return Err("todayMonthlyCost must be >= 0".to_string());
    }
    if let Some(inflation) = inflation_rate_pct {
        if !inflation.is_finite() || inflation <= -100.0 {
            return Err("inflationRatePct must be > -100".to_string());
        }
    }
    validate_retirement_profile(profile)
}

fn validate_retirement_profile(profile: &RetirementProfile) -> Result<(), String> {
    match profile {
        RetirementProfile::Individual {
            current_age,
            retirement_age,
        } => {
            if retirement_age <= current_age {
                return Err("retirementAge must be > currentAge".to_string());
            }
        }
        RetirementProfile::Household(family) => {
            if family.primary_retirement_age <= family.primary_age {
                return Err("primaryRetirementAge must be > primaryAge".to_string());
            }
            if family.spouse_retirement_age <= family.spouse_age {
                return Err("spouseRetirementAge must be > spouseAge".to_string());
            }
            if !family.expense_ratio.is_finite() || family.expense_ratio <= 0.0 {
                return Err("expenseRatio must be > 0".to_string());
            }
        }
    }
    Ok(())
}

// Solver failures fall back to amount-as-contribution so the caller always
// has a number to show; the warning says why.
fn quote_or_fallback(
    settings: &Settings,
    goal: &Goal,
    reference_date: NaiveDate,
) -> (GoalTarget, FundingQuote, Option<String>) {
    let target = resolve_target(goal, reference_date, settings.inflation_rate_pct);
    match quote_target(goal, &target) {
        Ok(quote) => (target, quote, None),
        Err(e) => {
            tracing::warn!(goal = %goal.id, error = %e, "goal quote failed; using fallback");
            let quote = FundingQuote::fallback(&goal.id, &target);
            (target, quote, Some(format!("calculation failed: {e}")))
        }
    }
}

fn pmt_response(payload: PmtPayload) -> Result<PmtResponse, String> {
    if !payload.target_amount.is_finite() || payload.target_amount < 0.0 {
        return Err("targetAmount must be >= 0".to_string());
    }
    if payload.horizon_months == 0 {
        return Err("horizonMonths must be >= 1".to_string());
    }

    let factor = annuity_factor(&payload.phases, payload.horizon_months);
    let response = match calculate_required_pmt(
        payload.target_amount,
        &payload.phases,
        payload.horizon_months,
    ) {
        Ok(required_pmt) => PmtResponse {
            required_pmt,
            annuity_factor: factor,
            horizon_months: payload.horizon_months,
            fallback: false,
            warning: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "pmt calculation failed; using fallback");
            PmtResponse {
                required_pmt: payload.target_amount,
                annuity_factor: factor,
                horizon_months: payload.horizon_months,
                fallback: true,
                warning: Some(format!("calculation failed: {e}")),
            }
        }
    };
    Ok(response)
}

fn quote_response(settings: &Settings, payload: QuotePayload) -> Result<QuoteResponse, String> {
    validate_goal(&payload.goal)?;
    let reference_date = settings.reference_date(payload.reference_date);
    let goal = &payload.goal;
    let (target, quote, warning) = quote_or_fallback(settings, goal, reference_date);

    Ok(QuoteResponse {
        reference_date,
        payout_installment: goal
            .kind
            .payout()
            .map(|payout| payout.installment_amount(quote.amount)),
        retirement: target.retirement,
        quote,
        warning,
    })
}

fn retirement_response(
    settings: &Settings,
    payload: RetirementPayload,
) -> Result<RetirementScenario, String> {
    validate_retirement_inputs(
        &payload.profile,
        payload.today_monthly_cost,
        payload.inflation_rate_pct,
    )?;
    let inflation = payload
        .inflation_rate_pct
        .unwrap_or(settings.inflation_rate_pct);

    Ok(resolve_scenario(
        &payload.profile,
        payload.today_monthly_cost,
        inflation,
    ))
}

fn plan_response(settings: &Settings, payload: PlanPayload) -> Result<PlanResponse, String> {
    if !payload.monthly_budget.is_finite() || payload.monthly_budget < 0.0 {
        return Err("monthlyBudget must be >= 0".to_string());
    }
    let max_months = payload.max_months.unwrap_or(settings.max_plan_months);
    if max_months == 0 || max_months > MAX_PLAN_MONTHS_LIMIT {
        return Err(format!(
            "maxMonths must be between 1 and {MAX_PLAN_MONTHS_LIMIT}"
        ));
    }

    let mut seen = HashSet::new();
    for goal in &payload.goals {
        validate_goal(goal)?;
        if !seen.insert(goal.id.as_str()) {
            return Err(format!("duplicate goal id {}", goal.id));
        }
    }

    let reference_date = settings.reference_date(payload.reference_date);
    let quotes = payload
        .goals
        .iter()
        .map(|goal| quote_or_fallback(settings, goal, reference_date).1)
        .collect::<Vec<_>>();
    let planned = quotes
        .iter()
        .zip(&payload.goals)
        .map(|(quote, goal)| quote.planned(goal))
        .collect::<Vec<_>>();

    let plan = build_plan(
        &planned,
        payload.monthly_budget,
        payload.funding_style,
        max_months,
    );
    tracing::info!(
        goals = planned.len(),
        months = plan.months.len(),
        shortfall = plan.budget_shortfall,
        style = ?plan.funding_style,
        "allocation plan built"
    );

    Ok(PlanResponse {
        reference_date,
        quotes,
        plan,
    })
}

#[cfg(test)]
fn plan_payload_from_json(json: &str) -> Result<PlanPayload, String> {
    serde_json::from_str::<PlanPayload>(json).map_err(|e| format!("Invalid API JSON payload: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GoalStatus, RetirementStrategy, ScenarioStrategy};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn fixed_settings() -> Settings {
        Settings {
            inflation_rate_pct: 3.0,
            max_plan_months: DEFAULT_MAX_PLAN_MONTHS,
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        }
    }

    const PLAN_JSON: &str = r#"{
      "monthlyBudget": 2500,
      "fundingStyle": "hybrid",
      "goals": [
        {
          "id": "ret",
          "name": "Retire in Portugal",
          "amount": 600000,
          "targetDate": "2055-01-01",
          "category": "retirement",
          "profile": { "type": "individual", "currentAge": 35, "retirementAge": 65 },
          "todayMonthlyCost": 3000
        },
        {
          "id": "ef",
          "name": "Emergency fund",
          "amount": 6000,
          "targetDate": "2025-07-01",
          "returnPhases": [{ "lengthMonths": 6, "annualRate": 0.0 }],
          "category": "emergencyFund",
          "bufferMonths": 3,
          "monthlyExpenses": 2000
        },
        {
          "id": "uni",
          "name": "University",
          "amount": 40000,
          "targetDate": "2030-09-01",
          "category": "education",
          "payout": { "frequency": "annual", "periodYears": 4 }
        }
      ]
    }"#;

    #[test]
    fn build_settings_rejects_zero_plan_months() {
        let cli = Cli::try_parse_from(["goalplan", "--max-plan-months", "0", "serve"])
            .expect("cli parses");
        let err = build_settings(&cli).expect_err("must reject");
        assert!(err.contains("--max-plan-months"));
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "goalplan",
            "pmt",
            "--amount",
            "48000",
            "--horizon-months",
            "12",
            "--rate",
            "6,12",
            "--lengths",
            "6,6",
            "--reference-date",
            "2025-03-01",
        ])
        .expect("cli parses");
        let settings = build_settings(&cli).expect("valid settings");
        assert_eq!(settings.reference_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        match cli.command {
            Command::Pmt { rate, lengths, .. } => {
                assert_eq!(rate, vec![6.0, 12.0]);
                assert_eq!(lengths, vec![6, 6]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pmt_flags_convert_percent_rates() {
        let payload = pmt_payload_from_flags(100_000.0, 12, &[6.0, 12.0], &[6, 6])
            .expect("valid flags");
        assert_eq!(
            payload.phases,
            vec![ReturnPhase::new(6, 0.06), ReturnPhase::new(6, 0.12)]
        );
        let response = pmt_response(payload).expect("valid payload");
        assert!(response.required_pmt < 100_000.0 / 12.0);
        assert!(!response.fallback);
    }

    #[test]
    fn pmt_flags_reject_mismatched_lengths() {
        let err = pmt_payload_from_flags(1_000.0, 12, &[5.0, 6.0], &[12])
            .expect_err("must reject");
        assert!(err.to_string().contains("--lengths"));
    }

    #[test]
    fn pmt_with_no_phases_reports_fallback() {
        let payload = PmtPayload {
            target_amount: 5_000.0,
            horizon_months: 10,
            phases: Vec::new(),
        };
        let response = pmt_response(payload).expect("payload is well-formed");
        assert!(response.fallback);
        assert_approx(response.required_pmt, 5_000.0);
        assert!(response.warning.is_some());
    }

    #[test]
    fn plan_payload_parses_tagged_goal_kinds() {
        let payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        assert_eq!(payload.funding_style, FundingStyle::Hybrid);
        assert_eq!(payload.goals.len(), 3);
        assert!(matches!(
            payload.goals[0].kind,
            GoalKind::Retirement {
                inflation_rate_pct: None,
                ..
            }
        ));
        assert!(matches!(
            payload.goals[1].kind,
            GoalKind::EmergencyFund {
                buffer_months: 3,
                ..
            }
        ));
        assert!(payload.goals[2].kind.payout().is_some());
    }

    #[test]
    fn plan_payload_requires_funding_style() {
        let json = r#"{ "monthlyBudget": 100, "goals": [] }"#;
        let err = plan_payload_from_json(json).expect_err("must reject");
        assert!(err.contains("fundingStyle"));
    }

    #[test]
    fn plan_response_funds_emergency_fund_first_in_hybrid_mode() {
        let payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        let response = plan_response(&fixed_settings(), payload).expect("valid plan");

        assert_eq!(response.plan.goals[0].goal_id, "ef");
        assert_eq!(response.plan.goals[2].goal_id, "ret");
        let ef_quote = response
            .quotes
            .iter()
            .find(|q| q.goal_id == "ef")
            .expect("ef quote");
        assert_approx(ef_quote.required_pmt, 1_000.0);
        assert_eq!(response.plan.goals[0].completion_month, Some(5));
        assert_eq!(response.plan.goals[1].start_month, Some(5));
        for month in &response.plan.months {
            assert!(month.total_allocation <= 2_500.0 + EPS);
        }
    }

    #[test]
    fn plan_response_rejects_duplicate_ids() {
        let mut payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        payload.goals[1].id = "ret".to_string();
        let err = plan_response(&fixed_settings(), payload).expect_err("must reject");
        assert!(err.contains("duplicate goal id"));
    }

    #[test]
    fn plan_response_caps_plan_length() {
        let mut payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        payload.monthly_budget = 10.0;
        payload.max_months = Some(12);
        let response = plan_response(&fixed_settings(), payload).expect("valid plan");
        assert_eq!(response.plan.months.len(), 12);
        assert!(
            response
                .plan
                .goals
                .iter()
                .all(|g| g.status != GoalStatus::Completed)
        );
    }

    #[test]
    fn quote_response_includes_payout_and_retirement_details() {
        let payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        let mut goals = payload.goals.into_iter();
        let retirement_goal = goals.next().expect("retirement goal");
        let _ = goals.next();
        let education_goal = goals.next().expect("education goal");

        let settings = fixed_settings();
        let retirement = quote_response(
            &settings,
            QuotePayload {
                reference_date: None,
                goal: retirement_goal,
            },
        )
        .expect("valid quote");
        let scenario = retirement.retirement.expect("retirement scenario");
        assert_eq!(scenario.strategy, ScenarioStrategy::Individual);
        assert_eq!(scenario.years_to_retirement, 30);
        assert_eq!(retirement.quote.horizon_months, 360);

        let education = quote_response(
            &settings,
            QuotePayload {
                reference_date: None,
                goal: education_goal,
            },
        )
        .expect("valid quote");
        assert_approx(education.payout_installment.expect("payout"), 10_000.0);
        assert!(education.retirement.is_none());
    }

    #[test]
    fn quote_response_rejects_negative_rates() {
        let mut payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        let mut goal = payload.goals.remove(1);
        goal.return_phases = vec![ReturnPhase::new(6, -0.02)];
        let err = quote_response(
            &fixed_settings(),
            QuotePayload {
                reference_date: None,
                goal,
            },
        )
        .expect_err("must reject");
        assert!(err.contains("annualRate"));
    }

    #[test]
    fn retirement_payload_parses_household_profile() {
        let json = r#"{
          "profile": {
            "type": "household",
            "primaryAge": 40,
            "spouseAge": 36,
            "primaryRetirementAge": 60,
            "spouseRetirementAge": 62,
            "strategy": "staggered",
            "expenseRatio": 1.0
          },
          "todayMonthlyCost": 5000,
          "inflationRatePct": 3
        }"#;
        let payload =
            serde_json::from_str::<RetirementPayload>(json).expect("json should parse");
        match payload.profile {
            RetirementProfile::Household(family) => {
                assert_eq!(family.strategy, RetirementStrategy::Staggered)
            }
            other => panic!("unexpected profile {other:?}"),
        }
        let scenario = retirement_response(&fixed_settings(), payload).expect("valid scenario");
        assert_eq!(scenario.years_to_retirement, 26);
        assert!(scenario.transition_details.is_some());
    }

    #[test]
    fn retirement_response_rejects_retirement_before_current_age() {
        let payload = RetirementPayload {
            profile: RetirementProfile::Individual {
                current_age: 60,
                retirement_age: 55,
            },
            today_monthly_cost: 2_000.0,
            inflation_rate_pct: None,
        };
        let err = retirement_response(&fixed_settings(), payload).expect_err("must reject");
        assert!(err.contains("retirementAge"));
    }

    #[test]
    fn plan_response_serialization_contains_expected_fields() {
        let payload = plan_payload_from_json(PLAN_JSON).expect("json should parse");
        let response = plan_response(&fixed_settings(), payload).expect("valid plan");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"referenceDate\":\"2025-01-01\""));
        assert!(json.contains("\"quotes\""));
        assert!(json.contains("\"requiredPmt\""));
        assert!(json.contains("\"perGoalContribution\""));
        assert!(json.contains("\"totalAllocation\""));
        assert!(json.contains("\"budgetShortfall\""));
        assert!(json.contains("\"fundingStyle\":\"hybrid\""));
    }

    fn single_goal_plan(goal_json: &str, style: &str, budget: f64) -> PlanPayload {
        let json = format!(
            r#"{{ "monthlyBudget": {budget}, "fundingStyle": "{style}", "goals": [{goal_json}] }}"#
        );
        plan_payload_from_json(&json).expect("json should parse")
    }

    #[test]
    fn cash_emergency_fund_completes_only_once_contributions_reach_target() {
        let payload = single_goal_plan(
            r#"{
              "id": "ef",
              "name": "Emergency fund",
              "amount": 100,
              "targetDate": "2025-07-01",
              "category": "emergencyFund",
              "bufferMonths": 1,
              "monthlyExpenses": 100
            }"#,
            "parallel",
            1_000.0,
        );
        let response = plan_response(&fixed_settings(), payload).expect("valid plan");
        let ef = &response.plan.goals[0];
        assert_eq!(ef.status, GoalStatus::Completed);
        assert!(ef.cumulative_contribution + 1e-9 >= 100.0);
        // Cash growth lowers the contribution, so six months fall short.
        assert_eq!(ef.completion_month, Some(6));
    }

    #[test]
    fn unset_emergency_fund_amount_comes_from_expenses() {
        let payload = single_goal_plan(
            r#"{
              "id": "ef",
              "name": "Emergency fund",
              "amount": 0,
              "targetDate": "2025-07-01",
              "returnPhases": [{ "lengthMonths": 6, "annualRate": 0.0 }],
              "category": "emergencyFund",
              "bufferMonths": 6,
              "monthlyExpenses": 2000
            }"#,
            "parallel",
            5_000.0,
        );
        let response = plan_response(&fixed_settings(), payload).expect("valid plan");
        assert_approx(response.quotes[0].amount, 12_000.0);
        assert_approx(response.quotes[0].required_pmt, 2_000.0);
        assert_eq!(response.plan.goals[0].completion_month, Some(5));
    }

    #[test]
    fn emergency_fund_amount_must_match_its_expenses() {
        let payload = single_goal_plan(
            r#"{
              "id": "ef",
              "name": "Emergency fund",
              "amount": 100,
              "targetDate": "2025-07-01",
              "category": "emergencyFund",
              "bufferMonths": 6,
              "monthlyExpenses": 2000
            }"#,
            "parallel",
            1_000.0,
        );
        let err = plan_response(&fixed_settings(), payload).expect_err("must reject");
        assert!(err.contains("bufferMonths"));
    }

    #[test]
    fn household_retirement_goal_is_planned_for_its_nest_egg() {
        let payload = single_goal_plan(
            r#"{
              "id": "ret",
              "name": "Retirement",
              "amount": 0,
              "targetDate": "2030-01-01",
              "category": "retirement",
              "profile": {
                "type": "household",
                "primaryAge": 40,
                "spouseAge": 36,
                "primaryRetirementAge": 60,
                "spouseRetirementAge": 62,
                "strategy": "staggered",
                "expenseRatio": 1.0
              },
              "todayMonthlyCost": 5000,
              "inflationRatePct": 3
            }"#,
            "parallel",
            50_000.0,
        );
        let expected = match &payload.goals[0].kind {
            GoalKind::Retirement { profile, .. } => resolve_scenario(profile, 5_000.0, 3.0),
            other => panic!("unexpected kind {other:?}"),
        };
        let response = plan_response(&fixed_settings(), payload).expect("valid plan");

        let quote = &response.quotes[0];
        assert_approx(quote.amount, expected.total_amount_needed);
        assert_eq!(quote.horizon_months, 26 * 12);
        assert!(quote.required_pmt > 0.0);
        let ret = &response.plan.goals[0];
        assert_eq!(ret.start_month, Some(0));
        assert_approx(response.plan.months[0].per_goal_contribution["ret"], quote.required_pmt);
    }

    #[test]
    fn retirement_goal_ages_are_checked_on_every_route() {
        let goal_json = r#"{
              "id": "ret",
              "name": "Retirement",
              "amount": 0,
              "targetDate": "2030-01-01",
              "category": "retirement",
              "profile": { "type": "individual", "currentAge": 70, "retirementAge": 65 },
              "todayMonthlyCost": 3000
            }"#;
        let payload = single_goal_plan(goal_json, "sequential", 1_000.0);
        let err = plan_response(&fixed_settings(), payload).expect_err("must reject");
        assert!(err.contains("retirementAge"));

        let goal = serde_json::from_str::<Goal>(goal_json).expect("json should parse");
        let err = quote_response(
            &fixed_settings(),
            QuotePayload {
                reference_date: None,
                goal,
            },
        )
        .expect_err("must reject");
        assert!(err.contains("goal ret"));
    }
}

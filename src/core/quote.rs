use chrono::NaiveDate;

use super::error::CalcError;
use super::profiles::{default_return_phases, emergency_fund_target};
use super::retirement::resolve_scenario;
use super::time_value::{calculate_required_pmt, horizon_months};
use super::types::{
    FundingQuote, Goal, GoalKind, GoalTarget, PlannedGoal, RetirementScenario, ReturnPhase,
};

/// Amount and horizon a goal has to be funded for.
///
/// A stored `amount > 0` is the confirmed target and wins. Otherwise an
/// emergency fund is `buffer_months` of expenses and a retirement goal is the
/// nest egg of its scenario. Retirement goals always run to the retirement
/// date implied by the profile; every other goal runs to `target_date`.
pub fn resolve_target(
    goal: &Goal,
    reference_date: NaiveDate,
    default_inflation_pct: f64,
) -> GoalTarget {
    let retirement = retirement_scenario_for(goal, default_inflation_pct);
    let horizon_months = match &retirement {
        Some(scenario) => scenario.months_to_retirement().max(1),
        None => horizon_months(reference_date, goal.target_date),
    };

    let amount = if goal.amount > 0.0 {
        goal.amount
    } else {
        match (&goal.kind, &retirement) {
            (
                GoalKind::EmergencyFund {
                    buffer_months,
                    monthly_expenses,
                },
                _,
            ) => emergency_fund_target(*monthly_expenses, *buffer_months),
            (GoalKind::Retirement { .. }, Some(scenario)) => scenario.total_amount_needed,
            _ => 0.0,
        }
    };

    GoalTarget {
        amount: if amount.is_finite() { amount.max(0.0) } else { 0.0 },
        horizon_months,
        retirement,
    }
}

/// Required contribution for `goal` as of `reference_date`. Goals saved
/// without return phases get the category defaults for their horizon.
pub fn quote_goal(
    goal: &Goal,
    reference_date: NaiveDate,
    default_inflation_pct: f64,
) -> Result<FundingQuote, CalcError> {
    let target = resolve_target(goal, reference_date, default_inflation_pct);
    quote_target(goal, &target)
}

pub fn quote_target(goal: &Goal, target: &GoalTarget) -> Result<FundingQuote, CalcError> {
    let return_phases = if goal.return_phases.is_empty() {
        default_return_phases(&goal.kind, target.horizon_months)
    } else {
        goal.return_phases.clone()
    };
    let required_pmt =
        calculate_required_pmt(target.amount, &return_phases, target.horizon_months)?;

    Ok(FundingQuote {
        goal_id: goal.id.clone(),
        amount: target.amount,
        horizon_months: target.horizon_months,
        return_phases,
        required_pmt,
        fallback: false,
    })
}

/// Retirement target for a retirement goal; `None` for every other kind.
pub fn retirement_scenario_for(
    goal: &Goal,
    default_inflation_pct: f64,
) -> Option<RetirementScenario> {
    match &goal.kind {
        GoalKind::Retirement {
            profile,
            today_monthly_cost,
            inflation_rate_pct,
        } => Some(resolve_scenario(
            profile,
            *today_monthly_cost,
            inflation_rate_pct.unwrap_or(default_inflation_pct),
        )),
        _ => None,
    }
}

impl FundingQuote {
    /// Stand-in quote for a goal that could not be solved: the whole amount
    /// as a single month's contribution. The horizon stays the goal's own so
    /// the goal keeps its place in the funding order.
    pub fn fallback(goal_id: &str, target: &GoalTarget) -> Self {
        Self {
            goal_id: goal_id.to_string(),
            amount: target.amount,
            horizon_months: target.horizon_months,
            return_phases: vec![ReturnPhase::new(1, 0.0)],
            required_pmt: target.amount,
            fallback: true,
        }
    }

    pub fn planned(&self, goal: &Goal) -> PlannedGoal {
        PlannedGoal {
            goal_id: self.goal_id.clone(),
            tier: goal.kind.priority_tier(),
            amount: self.amount,
            required_pmt: self.required_pmt,
            horizon_months: self.horizon_months,
        }
    }
}

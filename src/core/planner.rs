use std::collections::BTreeMap;

use super::types::{
    AllocationPlan, FundingStyle, GoalFundingSummary, GoalStatus, MonthlyAllocation, PlannedGoal,
    PriorityTier,
};

pub const DEFAULT_MAX_PLAN_MONTHS: u32 = 1_200;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
struct GoalState {
    status: GoalStatus,
    start_month: Option<u32>,
    completion_month: Option<u32>,
    cumulative: f64,
}

impl GoalState {
    fn new(goal: &PlannedGoal) -> Self {
        let done = goal.amount <= EPS;
        Self {
            status: if done {
                GoalStatus::Completed
            } else {
                GoalStatus::NotStarted
            },
            start_month: None,
            completion_month: done.then_some(0),
            cumulative: 0.0,
        }
    }

    fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

/// Emergency fund first, then goals by nearest horizon, retirement last.
/// Ties keep their input order.
pub fn prioritize(goals: &mut [PlannedGoal]) {
    goals.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then(a.horizon_months.cmp(&b.horizon_months))
    });
}

/// Month-by-month waterfall of `monthly_budget` across `goals`.
///
/// Each month, goals in priority order take up to their required contribution
/// from what is left of the budget, never more than they still need. When a
/// goal is short-funded, every lower-priority goal gets nothing that month.
/// A goal starts with its first nonzero contribution and completes once its
/// contributions reach the target amount. Under-funded goals keep their
/// contribution; the gap shows up as `budget_shortfall` and a later
/// completion month.
pub fn build_plan(
    goals: &[PlannedGoal],
    monthly_budget: f64,
    style: FundingStyle,
    max_months: u32,
) -> AllocationPlan {
    let mut ordered = goals.to_vec();
    prioritize(&mut ordered);

    let budget = monthly_budget.max(0.0);
    let mut states = ordered.iter().map(GoalState::new).collect::<Vec<_>>();
    let mut months = Vec::new();

    for month in 0..max_months {
        if states.iter().all(GoalState::is_completed) {
            break;
        }

        let mut remaining = budget;
        let mut short_above = false;
        let mut per_goal_contribution = ordered
            .iter()
            .map(|g| (g.goal_id.clone(), 0.0))
            .collect::<BTreeMap<_, _>>();

        for idx in 0..ordered.len() {
            if states[idx].is_completed() {
                continue;
            }
            if states[idx].status == GoalStatus::NotStarted
                && !may_start(style, &ordered, &states, idx)
            {
                continue;
            }
            if short_above {
                continue;
            }

            let goal = &ordered[idx];
            let state = &mut states[idx];
            let required = goal.required_pmt.max(0.0);
            let wanted = required.min(goal.amount - state.cumulative).max(0.0);
            let paid = wanted.min(remaining);
            if paid + EPS < wanted {
                short_above = true;
            }

            remaining -= paid;
            state.cumulative += paid;
            per_goal_contribution.insert(goal.goal_id.clone(), paid);

            if paid > 0.0 && state.status == GoalStatus::NotStarted {
                state.status = GoalStatus::Funding;
                state.start_month = Some(month);
                tracing::debug!(goal = %goal.goal_id, month, "goal funding started");
            }
            if state.cumulative + EPS >= goal.amount {
                state.status = GoalStatus::Completed;
                state.completion_month = Some(month);
                tracing::debug!(goal = %goal.goal_id, month, "goal completed");
            }
        }

        let total_allocation = per_goal_contribution.values().sum::<f64>();
        months.push(MonthlyAllocation {
            month_index: month,
            per_goal_contribution,
            total_allocation,
        });
    }

    let total_required_monthly = ordered
        .iter()
        .map(|g| g.required_pmt.max(0.0))
        .sum::<f64>();
    let summaries = ordered
        .iter()
        .zip(states)
        .map(|(goal, state)| GoalFundingSummary {
            goal_id: goal.goal_id.clone(),
            status: state.status,
            start_month: state.start_month,
            completion_month: state.completion_month,
            nominal_horizon_months: goal.horizon_months,
            required_pmt: goal.required_pmt,
            cumulative_contribution: state.cumulative,
        })
        .collect::<Vec<_>>();

    let unfinished = summaries
        .iter()
        .filter(|s| s.status != GoalStatus::Completed)
        .count();
    if unfinished > 0 {
        tracing::warn!(
            unfinished,
            max_months,
            "allocation plan ended with goals still open"
        );
    }

    AllocationPlan {
        funding_style: style,
        monthly_budget: budget,
        total_required_monthly,
        budget_shortfall: (total_required_monthly - budget).max(0.0),
        months,
        goals: summaries,
    }
}

fn may_start(
    style: FundingStyle,
    ordered: &[PlannedGoal],
    states: &[GoalState],
    idx: usize,
) -> bool {
    match style {
        FundingStyle::Parallel => true,
        FundingStyle::Sequential => states[..idx].iter().all(GoalState::is_completed),
        FundingStyle::Hybrid => {
            ordered[idx].tier == PriorityTier::EmergencyFund
                || ordered[..idx]
                    .iter()
                    .zip(&states[..idx])
                    .filter(|(goal, _)| goal.tier == PriorityTier::EmergencyFund)
                    .all(|(_, state)| state.is_completed())
        }
    }
}

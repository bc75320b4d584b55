mod error;
mod planner;
mod profiles;
mod quote;
mod retirement;
mod time_value;
mod types;

pub use error::CalcError;
pub use planner::{DEFAULT_MAX_PLAN_MONTHS, build_plan, prioritize};
pub use profiles::{default_return_phases, emergency_fund_target};
pub use quote::{quote_goal, quote_target, resolve_target, retirement_scenario_for};
pub use retirement::{
    SAFE_WITHDRAWAL_MULTIPLIER, TRANSITION_EXPENSE_RATIO, project_future_monthly_cost,
    resolve_scenario, total_retirement_needed,
};
pub use time_value::{
    annuity_factor, calculate_required_pmt, future_value, horizon_months, month_diff,
};
pub use types::{
    AllocationPlan, FamilyRetirementProfile, FundingQuote, FundingStyle, Goal, GoalCategory,
    GoalFundingSummary, GoalKind, GoalStatus, GoalTarget, MonthlyAllocation, PaymentFrequency, PayoutSchedule,
    PlannedGoal, PriorityTier, RetirementProfile, RetirementScenario, RetirementStrategy,
    ReturnPhase, ScenarioStrategy, TransitionDetails,
};

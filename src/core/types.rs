use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPhase {
    pub length_months: u32,
    /// Nominal annual rate as a fraction, e.g. `0.06` for 6%.
    pub annual_rate: f64,
}

impl ReturnPhase {
    pub fn new(length_months: u32, annual_rate: f64) -> Self {
        Self {
            length_months,
            annual_rate,
        }
    }

    pub fn monthly_rate(self) -> f64 {
        self.annual_rate / 12.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalCategory {
    Education,
    Travel,
    Gift,
    Home,
    Retirement,
    Other,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentFrequency {
    Once,
    Monthly,
    Quarterly,
    Biannual,
    Annual,
}

impl PaymentFrequency {
    pub fn payouts_per_year(self) -> u32 {
        match self {
            PaymentFrequency::Once => 0,
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::Biannual => 2,
            PaymentFrequency::Annual => 1,
        }
    }
}

/// How accumulated money is paid out after the target date.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSchedule {
    pub frequency: PaymentFrequency,
    pub period_years: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetirementStrategy {
    Joint,
    Staggered,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRetirementProfile {
    pub primary_age: u32,
    pub spouse_age: u32,
    pub primary_retirement_age: u32,
    pub spouse_retirement_age: u32,
    pub strategy: RetirementStrategy,
    /// Retirement-era household cost as a share of today's cost.
    pub expense_ratio: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RetirementProfile {
    #[serde(rename_all = "camelCase")]
    Individual {
        current_age: u32,
        retirement_age: u32,
    },
    Household(FamilyRetirementProfile),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum GoalKind {
    #[serde(rename_all = "camelCase")]
    EmergencyFund {
        buffer_months: u32,
        monthly_expenses: f64,
    },
    Education {
        payout: PayoutSchedule,
    },
    Home {
        payout: PayoutSchedule,
    },
    Travel,
    Gift,
    #[serde(rename_all = "camelCase")]
    Retirement {
        profile: RetirementProfile,
        today_monthly_cost: f64,
        inflation_rate_pct: Option<f64>,
    },
    Other,
}

impl GoalKind {
    /// The emergency fund is its own tier and has no discretionary category.
    pub fn category(&self) -> Option<GoalCategory> {
        match self {
            GoalKind::EmergencyFund { .. } => None,
            GoalKind::Education { .. } => Some(GoalCategory::Education),
            GoalKind::Home { .. } => Some(GoalCategory::Home),
            GoalKind::Travel => Some(GoalCategory::Travel),
            GoalKind::Gift => Some(GoalCategory::Gift),
            GoalKind::Retirement { .. } => Some(GoalCategory::Retirement),
            GoalKind::Other => Some(GoalCategory::Other),
        }
    }

    pub fn priority_tier(&self) -> PriorityTier {
        match self {
            GoalKind::EmergencyFund { .. } => PriorityTier::EmergencyFund,
            GoalKind::Retirement { .. } => PriorityTier::Retirement,
            _ => PriorityTier::Discretionary,
        }
    }

    pub fn payout(&self) -> Option<PayoutSchedule> {
        match self {
            GoalKind::Education { payout } | GoalKind::Home { payout } => Some(*payout),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriorityTier {
    EmergencyFund,
    Discretionary,
    Retirement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub target_date: NaiveDate,
    #[serde(default)]
    pub return_phases: Vec<ReturnPhase>,
    #[serde(flatten)]
    pub kind: GoalKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDetails {
    pub earlier_years: i32,
    pub later_years: i32,
    pub transition_years: i32,
    pub transition_monthly_cost: f64,
    pub transition_needs: f64,
    pub expense_ratio: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioStrategy {
    Individual,
    Joint,
    Staggered,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementScenario {
    pub strategy: ScenarioStrategy,
    /// Not clamped; ages at or past retirement give zero or negative years.
    pub years_to_retirement: i32,
    pub monthly_cost_at_retirement: f64,
    pub total_amount_needed: f64,
    pub transition_details: Option<TransitionDetails>,
}

impl RetirementScenario {
    pub fn months_to_retirement(&self) -> u32 {
        (self.years_to_retirement.max(0) as u32) * 12
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingQuote {
    pub goal_id: String,
    pub amount: f64,
    pub horizon_months: u32,
    pub return_phases: Vec<ReturnPhase>,
    pub required_pmt: f64,
    pub fallback: bool,
}

/// What a goal has to reach and by when, before any return assumptions.
#[derive(Clone, Debug, PartialEq)]
pub struct GoalTarget {
    pub amount: f64,
    pub horizon_months: u32,
    pub retirement: Option<RetirementScenario>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FundingStyle {
    Parallel,
    Hybrid,
    Sequential,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalStatus {
    NotStarted,
    Funding,
    Completed,
}

/// Planner input: one goal with its solved contribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedGoal {
    pub goal_id: String,
    pub tier: PriorityTier,
    pub amount: f64,
    pub required_pmt: f64,
    pub horizon_months: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAllocation {
    pub month_index: u32,
    pub per_goal_contribution: BTreeMap<String, f64>,
    pub total_allocation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalFundingSummary {
    pub goal_id: String,
    pub status: GoalStatus,
    pub start_month: Option<u32>,
    pub completion_month: Option<u32>,
    pub nominal_horizon_months: u32,
    pub required_pmt: f64,
    pub cumulative_contribution: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    pub funding_style: FundingStyle,
    pub monthly_budget: f64,
    pub total_required_monthly: f64,
    pub budget_shortfall: f64,
    pub months: Vec<MonthlyAllocation>,
    pub goals: Vec<GoalFundingSummary>,
}

use super::types::{
    FamilyRetirementProfile, RetirementProfile, RetirementScenario, RetirementStrategy,
    ScenarioStrategy, TransitionDetails,
};

/// Nest egg as a multiple of annual spend under the 4% withdrawal rule.
pub const SAFE_WITHDRAWAL_MULTIPLIER: f64 = 25.0;

/// Share of household expenses while one partner is retired and the other still works.
pub const TRANSITION_EXPENSE_RATIO: f64 = 0.7;

pub fn project_future_monthly_cost(
    today_monthly_cost: f64,
    inflation_rate_pct: f64,
    years: f64,
) -> f64 {
    today_monthly_cost * (1.0 + inflation_rate_pct / 100.0).powf(years)
}

pub fn total_retirement_needed(monthly_cost_at_retirement: f64) -> f64 {
    monthly_cost_at_retirement * 12.0 * SAFE_WITHDRAWAL_MULTIPLIER
}

/// Retirement target for a person or household. Ages at or past retirement
/// are not rejected here; they yield zero or negative horizons.
pub fn resolve_scenario(
    profile: &RetirementProfile,
    today_monthly_cost: f64,
    inflation_rate_pct: f64,
) -> RetirementScenario {
    match profile {
        RetirementProfile::Individual {
            current_age,
            retirement_age,
        } => individual_scenario(
            *current_age,
            *retirement_age,
            today_monthly_cost,
            inflation_rate_pct,
        ),
        RetirementProfile::Household(family) => {
            let household_cost = today_monthly_cost * family.expense_ratio;
            match family.strategy {
                RetirementStrategy::Joint => {
                    joint_scenario(family, household_cost, inflation_rate_pct)
                }
                RetirementStrategy::Staggered => {
                    staggered_scenario(family, household_cost, inflation_rate_pct)
                }
            }
        }
    }
}

fn years_between(age: u32, retirement_age: u32) -> i32 {
    retirement_age as i32 - age as i32
}

fn individual_scenario(
    current_age: u32,
    retirement_age: u32,
    today_monthly_cost: f64,
    inflation_rate_pct: f64,
) -> RetirementScenario {
    let years = years_between(current_age, retirement_age);
    let monthly_cost =
        project_future_monthly_cost(today_monthly_cost, inflation_rate_pct, years as f64);

    RetirementScenario {
        strategy: ScenarioStrategy::Individual,
        years_to_retirement: years,
        monthly_cost_at_retirement: monthly_cost,
        total_amount_needed: total_retirement_needed(monthly_cost),
        transition_details: None,
    }
}

// Both retire at the later retirement age, measured from the younger partner's
// age, so the horizon covers the longest accumulation need.
fn joint_scenario(
    family: &FamilyRetirementProfile,
    household_cost: f64,
    inflation_rate_pct: f64,
) -> RetirementScenario {
    let retirement_age = family
        .primary_retirement_age
        .max(family.spouse_retirement_age);
    let youngest_age = family.primary_age.min(family.spouse_age);
    let years = years_between(youngest_age, retirement_age);
    let monthly_cost =
        project_future_monthly_cost(household_cost, inflation_rate_pct, years as f64);

    RetirementScenario {
        strategy: ScenarioStrategy::Joint,
        years_to_retirement: years,
        monthly_cost_at_retirement: monthly_cost,
        total_amount_needed: total_retirement_needed(monthly_cost),
        transition_details: None,
    }
}

fn staggered_scenario(
    family: &FamilyRetirementProfile,
    household_cost: f64,
    inflation_rate_pct: f64,
) -> RetirementScenario {
    let primary_years = years_between(family.primary_age, family.primary_retirement_age);
    let spouse_years = years_between(family.spouse_age, family.spouse_retirement_age);
    let later_years = primary_years.max(spouse_years);
    let earlier_years = primary_years.min(spouse_years);
    let transition_years = later_years - earlier_years;

    let monthly_cost =
        project_future_monthly_cost(household_cost, inflation_rate_pct, later_years as f64);
    let full_needs = total_retirement_needed(monthly_cost);

    let transition_monthly_cost =
        project_future_monthly_cost(household_cost, inflation_rate_pct, earlier_years as f64);
    let transition_needs =
        transition_monthly_cost * 12.0 * TRANSITION_EXPENSE_RATIO * transition_years as f64;

    RetirementScenario {
        strategy: ScenarioStrategy::Staggered,
        years_to_retirement: later_years,
        monthly_cost_at_retirement: monthly_cost,
        total_amount_needed: full_needs + transition_needs,
        transition_details: Some(TransitionDetails {
            earlier_years,
            later_years,
            transition_years,
            transition_monthly_cost,
            transition_needs,
            expense_ratio: TRANSITION_EXPENSE_RATIO,
        }),
    }
}

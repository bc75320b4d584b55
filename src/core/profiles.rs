use super::types::{GoalKind, PayoutSchedule, PaymentFrequency, ReturnPhase};

pub const CASH_RATE: f64 = 0.03;
pub const CONSERVATIVE_RATE: f64 = 0.04;
pub const BALANCED_RATE: f64 = 0.06;
pub const GROWTH_RATE: f64 = 0.08;

const SHORT_HORIZON_MONTHS: u32 = 24;
const MEDIUM_HORIZON_MONTHS: u32 = 60;
const MEDIUM_GLIDE_MONTHS: u32 = 12;
const LONG_GLIDE_MONTHS: u32 = 24;
const RETIREMENT_GLIDE_MONTHS: u32 = 60;

/// Return phases used when a goal is saved without its own. The category only
/// picks the glide path; the phases always sum to `horizon_months`.
pub fn default_return_phases(kind: &GoalKind, horizon_months: u32) -> Vec<ReturnPhase> {
    let horizon_months = horizon_months.max(1);

    match kind {
        GoalKind::EmergencyFund { .. } => vec![ReturnPhase::new(horizon_months, CASH_RATE)],
        GoalKind::Retirement { .. } => glide(
            horizon_months,
            GROWTH_RATE,
            BALANCED_RATE,
            RETIREMENT_GLIDE_MONTHS,
        ),
        _ if horizon_months <= SHORT_HORIZON_MONTHS => {
            vec![ReturnPhase::new(horizon_months, CONSERVATIVE_RATE)]
        }
        _ if horizon_months <= MEDIUM_HORIZON_MONTHS => glide(
            horizon_months,
            BALANCED_RATE,
            CONSERVATIVE_RATE,
            MEDIUM_GLIDE_MONTHS,
        ),
        _ => glide(
            horizon_months,
            GROWTH_RATE,
            CONSERVATIVE_RATE,
            LONG_GLIDE_MONTHS,
        ),
    }
}

fn glide(
    horizon_months: u32,
    early_rate: f64,
    late_rate: f64,
    late_months: u32,
) -> Vec<ReturnPhase> {
    if horizon_months <= late_months {
        return vec![ReturnPhase::new(horizon_months, late_rate)];
    }
    vec![
        ReturnPhase::new(horizon_months - late_months, early_rate),
        ReturnPhase::new(late_months, late_rate),
    ]
}

pub fn emergency_fund_target(monthly_expenses: f64, buffer_months: u32) -> f64 {
    monthly_expenses.max(0.0) * buffer_months as f64
}

impl PayoutSchedule {
    pub fn installments(self) -> u32 {
        match self.frequency {
            PaymentFrequency::Once => 1,
            freq => (freq.payouts_per_year() * self.period_years).max(1),
        }
    }

    pub fn installment_amount(self, total: f64) -> f64 {
        total / self.installments() as f64
    }
}

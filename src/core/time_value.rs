use chrono::{Datelike, NaiveDate};

use super::error::CalcError;
use super::types::ReturnPhase;

/// A stretch of months compounding at one monthly rate.
#[derive(Debug, Clone, Copy)]
struct Segment {
    months: u32,
    monthly_rate: f64,
}

impl Segment {
    /// Value at the end of the segment of one unit paid at the start of every month in it.
    fn annuity_due_factor(self) -> f64 {
        let r = self.monthly_rate;
        if r == 0.0 {
            return self.months as f64;
        }
        ((1.0 + r).powi(self.months as i32) - 1.0) / r * (1.0 + r)
    }

    fn growth(self) -> f64 {
        (1.0 + self.monthly_rate).powi(self.months as i32)
    }
}

// Phases are clipped to the requested span; a span longer than the phases
// keeps compounding at the last phase's rate.
fn segments(phases: &[ReturnPhase], span_months: u32) -> Vec<Segment> {
    let mut out = Vec::with_capacity(phases.len() + 1);
    let mut remaining = span_months;
    for phase in phases {
        if remaining == 0 {
            break;
        }
        let months = phase.length_months.min(remaining);
        if months > 0 {
            out.push(Segment {
                months,
                monthly_rate: phase.monthly_rate(),
            });
        }
        remaining -= months;
    }

    if remaining > 0 {
        out.push(Segment {
            months: remaining,
            monthly_rate: phases.last().map(|p| p.monthly_rate()).unwrap_or(0.0),
        });
    }
    out
}

/// Balance after `periods_elapsed` monthly contributions paid at the start of
/// each month, compounding at each phase's `annual_rate / 12`.
pub fn future_value(contribution: f64, phases: &[ReturnPhase], periods_elapsed: u32) -> f64 {
    segments(phases, periods_elapsed)
        .into_iter()
        .fold(0.0, |balance, seg| {
            balance * seg.growth() + contribution * seg.annuity_due_factor()
        })
}

/// Blended annuity factor: how much one unit contributed every month grows to
/// by the end of `horizon_months`, carried through every later phase.
pub fn annuity_factor(phases: &[ReturnPhase], horizon_months: u32) -> f64 {
    let mut factor = 0.0;
    let mut growth_after = 1.0;
    for seg in segments(phases, horizon_months).into_iter().rev() {
        factor += seg.annuity_due_factor() * growth_after;
        growth_after *= seg.growth();
    }
    factor
}

/// Constant monthly contribution that grows to `target_amount` after
/// `horizon_months`. A zero annuity factor (empty horizon) returns the target
/// itself as a lump sum due now.
///
/// No clamping happens here: callers pass `horizon_months >= 1` and a
/// non-negative target.
pub fn calculate_required_pmt(
    target_amount: f64,
    phases: &[ReturnPhase],
    horizon_months: u32,
) -> Result<f64, CalcError> {
    validate_inputs(target_amount, phases)?;

    let factor = annuity_factor(phases, horizon_months);
    if factor == 0.0 {
        return Ok(target_amount);
    }
    Ok(target_amount / factor)
}

fn validate_inputs(target_amount: f64, phases: &[ReturnPhase]) -> Result<(), CalcError> {
    if !target_amount.is_finite() {
        return Err(CalcError::NonFinite {
            field: "target amount",
            value: target_amount,
        });
    }
    if phases.is_empty() {
        return Err(CalcError::EmptyPhases);
    }
    for (index, phase) in phases.iter().enumerate() {
        if !phase.annual_rate.is_finite() {
            return Err(CalcError::NonFinite {
                field: "annual rate",
                value: phase.annual_rate,
            });
        }
        if phase.monthly_rate() <= -1.0 {
            return Err(CalcError::RateOutOfRange {
                index,
                rate: phase.annual_rate,
            });
        }
    }
    Ok(())
}

/// Whole calendar months from `from` to `to`; day of month is ignored and the
/// result is negative when `to` is earlier.
pub fn month_diff(from: NaiveDate, to: NaiveDate) -> i32 {
    let from_index = from.year() * 12 + from.month0() as i32;
    let to_index = to.year() * 12 + to.month0() as i32;
    to_index - from_index
}

pub fn horizon_months(reference_date: NaiveDate, target_date: NaiveDate) -> u32 {
    month_diff(reference_date, target_date).max(1) as u32
}

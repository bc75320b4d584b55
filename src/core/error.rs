use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("return phases must not be empty")]
    EmptyPhases,

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("phase {index} annual rate {rate} gives a monthly rate at or below -100%")]
    RateOutOfRange { index: usize, rate: f64 },
}

/// Errors raised when constructing or advancing vehicles.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("invalid time step: {0} s (must be positive and finite)")]
    InvalidTimeStep(f64),

    #[error("vehicle at {position} m is not behind the convoy tail at {tail} m")]
    OutOfOrder { position: f64, tail: f64 },

    #[cfg(feature = "serde")]
    #[error("malformed scenario: {0}")]
    Scenario(String),
}

/// Checks that a time step is positive and finite.
pub(crate) fn check_time_step(dt: f64) -> Result<(), Error> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidTimeStep(dt))
    }
}

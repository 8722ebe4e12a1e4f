//! Crate-wide error type.
//!
//! Variants map onto process exit codes so the binary can stay tiny:
//!
//! - `2`: bad configuration / input / IO
//! - `3`: not enough data to estimate anything
//! - `4`: numeric failure

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Rejected before any simulation runs; never produces a partial result.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A single draw produced a non-finite or zero Weibull scale.
    #[error("numeric range error in draw {draw_index}: {message}")]
    NumericRange { draw_index: usize, message: String },

    #[error("estimation failed: {message}")]
    Estimation { message: String },

    #[error("{message}")]
    Io { message: String },
}

impl SimError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn numeric_range(draw_index: usize, message: impl Into<String>) -> Self {
        Self::NumericRange {
            draw_index,
            message: message.into(),
        }
    }

    pub fn estimation(message: impl Into<String>) -> Self {
        Self::Estimation {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SimError::Configuration { .. } | SimError::Io { .. } => 2,
            SimError::Estimation { .. } => 3,
            SimError::NumericRange { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(SimError::configuration("x").exit_code(), 2);
        assert_eq!(SimError::io("x").exit_code(), 2);
        assert_eq!(SimError::estimation("x").exit_code(), 3);
        assert_eq!(SimError::numeric_range(7, "x").exit_code(), 4);
    }

    #[test]
    fn numeric_range_message_names_the_draw() {
        let err = SimError::numeric_range(12, "scale overflowed");
        assert_eq!(err.to_string(), "numeric range error in draw 12: scale overflowed");
    }
}

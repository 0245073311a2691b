use thiserror::Error;

/// Misconfiguration detected while building a component. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least two firms are required, got {0}")]
    TooFewFirms(usize),
    #[error("the {0} grid is empty")]
    EmptyGrid(&'static str),
    #[error("the {0} grid is not strictly increasing")]
    UnsortedGrid(&'static str),
    #[error("buffer capacity must be positive")]
    ZeroCapacity,
    #[error("batch size must be positive")]
    ZeroBatchSize,
    #[error("horizon must span at least three periods, got {0}")]
    HorizonTooShort(usize),
    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("exploration bounds are inverted: min {min} > max {max}")]
    InvertedBounds { min: f64, max: f64 },
    #[error("layer width must be positive")]
    ZeroWidth,
}

impl ConfigError {
    /// Checks that `value` lies in the closed interval `[min, max]`.
    pub fn check_range(
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<(), Self> {
        if value.is_nan() || value < min || value > max {
            return Err(ConfigError::OutOfRange {
                name,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to encode results: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown mode '{0}', expected market, control or all")]
    UnknownMode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(ConfigError::check_range("gamma", 0.95, 0.0, 1.0).is_ok());
        assert!(ConfigError::check_range("gamma", 1.0, 0.0, 1.0).is_ok());
        assert_eq!(
            ConfigError::check_range("alpha", 1.5, 0.0, 1.0),
            Err(ConfigError::OutOfRange {
                name: "alpha",
                value: 1.5,
                min: 0.0,
                max: 1.0
            })
        );
        assert!(ConfigError::check_range("alpha", f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ConfigError::TooFewFirms(1).to_string(),
            "at least two firms are required, got 1"
        );
        let err: Error = ConfigError::ZeroCapacity.into();
        assert_eq!(err.to_string(), "buffer capacity must be positive");
    }
}

//! Error types for target normalization and variable resolution

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Placeholder references a name with no template variable and no raw input
    ///
    /// Recovered locally by the resolver: the placeholder text is left as-is.
    #[error("Unknown variable: {name}")]
    UnknownVariable {
        /// Variable name as written in the placeholder
        name: String,
    },

    /// Legacy target shape detected but required fields are missing
    #[error("Malformed legacy target: {0}")]
    MalformedLegacyTarget(String),

    /// Metric identifier mapping matched more than one entry
    ///
    /// Not produced today: the identifier table is resolved first-match.
    #[error("Ambiguous metric identifier for {key}")]
    AmbiguousMetricIdentifier {
        /// `data_source_label|data_type_label` key
        key: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unknown variable error
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Error::UnknownVariable { name: name.into() }
    }

    /// Create a malformed legacy target error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedLegacyTarget(message.into())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_variable("host");
        assert_eq!(err.to_string(), "Unknown variable: host");

        let err = Error::malformed("metric.id[3] is missing");
        assert!(err.to_string().contains("metric.id[3]"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

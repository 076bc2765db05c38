//! Error types for macinspect.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the specific failure (a shape mismatch versus a malformed input line,
//! for instance) instead of parsing messages.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading predictions, vocabularies or configuration.
#[derive(Debug, Error)]
pub enum InputError {
    /// A line that is not a valid prediction record.
    #[error("Malformed prediction record at line {line}: {message}")]
    MalformedRecord {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        message: String,
    },

    /// A file that could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A vocabulary file with no tokens.
    #[error("Vocabulary at {path} is empty")]
    EmptyVocab {
        /// The vocabulary file.
        path: PathBuf,
    },
}

/// Errors in the frozen run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file that does not deserialize.
    #[error("Failed to parse config {path}: {message}")]
    Parse {
        /// The config file.
        path: PathBuf,
        /// Deserializer message.
        message: String,
    },

    /// A `log_level` that names no known level.
    #[error("Invalid log level '{level}'")]
    InvalidLogLevel {
        /// The value as written.
        level: String,
    },
}

/// Top-level error type for macinspect.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Attention whose length differs from the tokens it weights.
    #[error("Shape mismatch in {field}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// The attention field, e.g. `question_word_attn[0]`.
        field: String,
        /// Token count.
        expected: usize,
        /// Weight count.
        actual: usize,
    },

    /// Reading predictions or the vocabulary failed.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// The frozen configuration is unusable.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Writing rendered rows failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectError {
    /// Creates a shape mismatch error for the named field.
    #[must_use]
    pub fn shape_mismatch(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Returns true if this is a shape mismatch.
    #[must_use]
    pub const fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }

    /// Returns true if this is an input error.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Returns true if this is a config error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::convert::Infallible> for InspectError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Result type alias for macinspect operations.
pub type InspectResult<T> = Result<T, InspectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = InspectError::shape_mismatch("question_word_attn[0]", 4, 3);
        let msg = format!("{err}");
        assert!(msg.contains("question_word_attn[0]"));
        assert!(msg.contains('4'));
        assert!(msg.contains('3'));
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_malformed_record_message() {
        let err = InputError::MalformedRecord {
            line: 7,
            message: "missing field `src`".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("line 7"));
        assert!(msg.contains("src"));
    }

    #[test]
    fn test_inspect_error_from_input() {
        let err: InspectError = InputError::EmptyVocab {
            path: PathBuf::from("vocab.txt"),
        }
        .into();
        assert!(err.is_input());
        assert!(!err.is_config());
    }

    #[test]
    fn test_inspect_error_from_config() {
        let err: InspectError = ConfigError::InvalidLogLevel {
            level: "loud".to_string(),
        }
        .into();
        assert!(err.is_config());
        assert!(format!("{err}").contains("loud"));
    }

    #[test]
    fn test_inspect_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: InspectError = io.into();
        assert!(!err.is_input());
        assert!(format!("{err}").contains("closed"));
    }
}

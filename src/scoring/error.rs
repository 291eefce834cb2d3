use std::fmt;
use thiserror::Error;

/// A fatal problem in a scoring configuration.
///
/// Raised once, at load time, before any score is computed. The message is
/// prefixed with the configuration path of the offending field so it can be
/// shown to operators as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("scoring.method: missing (expected one of sum, average, weighted-sum, custom)")]
    MissingMethod,

    #[error("scoring.method: unknown method '{0}' (expected one of sum, average, weighted-sum, custom)")]
    UnknownMethod(String),

    #[error("scoring.max_score: missing")]
    MissingMaxScore,

    #[error("scoring.max_score: must be a non-negative number, got {0}")]
    InvalidMaxScore(f64),

    #[error("scoring.passing_score: must be a finite number, got {0}")]
    InvalidPassingScore(f64),

    #[error("scoring.custom_hook: method is 'custom' but no hook name is configured")]
    MissingCustomHook,

    #[error("scoring.custom_hook: no aggregation hook registered under '{0}'")]
    UnregisteredHook(String),

    #[error("scoring.ranges[{index}]: bounds must be finite numbers")]
    NonFiniteRange { index: usize },

    #[error("scoring.ranges[{index}]: min {min} is greater than max {max}")]
    InvertedRange { index: usize, min: f64, max: f64 },

    #[error("scoring.questions.{question_id}: {message}")]
    InvalidQuestionRule { question_id: String, message: String },

    #[error("scoring.adjustments[{index}]: {message}")]
    InvalidAdjustment { index: usize, message: String },

    #[error("risk_table.{group}: {message}")]
    InvalidRiskTable { group: String, message: String },
}

/// Every configuration error found in one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationErrors(Vec<ConfigurationError>);

impl ConfigurationErrors {
    pub fn new(errors: Vec<ConfigurationError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[ConfigurationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigurationError> {
        self.0.iter()
    }
}

impl From<ConfigurationError> for ConfigurationErrors {
    fn from(error: ConfigurationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ConfigurationErrors {
    type Item = ConfigurationError;
    type IntoIter = std::vec::IntoIter<ConfigurationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ConfigurationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} scoring configuration error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigurationErrors {}

/// A non-fatal configuration problem.
///
/// The engine still behaves deterministically (first matching range wins,
/// unmatched scores are unclassified), but operators should fix the table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("scoring.ranges: '{first}' and '{second}' overlap on [{from}, {to}]; '{first}' wins")]
    RangeOverlap {
        first: String,
        second: String,
        from: f64,
        to: f64,
    },

    #[error("scoring.ranges: no range covers scores between {after} and {before}")]
    RangeGap { after: f64, before: f64 },

    #[error("scoring.ranges: no range covers scores from {from} to {to}")]
    RangeUncovered { from: f64, to: f64 },

    #[error("scoring.passing_score: {passing} is outside [0, {max}]")]
    PassingScoreOutOfRange { passing: f64, max: f64 },
}

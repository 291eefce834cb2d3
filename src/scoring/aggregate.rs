use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::contribution::AnswerContribution;
use super::error::ConfigurationError;
use super::model::Method;

/// Caller-supplied aggregation strategy for the `custom` method.
///
/// Receives only scored contributions, so every `value` is `Some`. The
/// engine clamps whatever the hook returns to `[0, max_score]`.
pub trait CustomAggregator: Send + Sync {
    fn aggregate(&self, contributions: &[AnswerContribution], max_score: f64) -> f64;
}

impl<F> CustomAggregator for F
where
    F: Fn(&[AnswerContribution], f64) -> f64 + Send + Sync,
{
    fn aggregate(&self, contributions: &[AnswerContribution], max_score: f64) -> f64 {
        self(contributions, max_score)
    }
}

/// Named custom hooks available to an engine.
pub type HookRegistry = BTreeMap<String, Arc<dyn CustomAggregator>>;

/// A method bound to its implementation.
#[derive(Clone)]
pub enum Aggregation {
    Sum,
    Average,
    WeightedSum,
    Custom {
        name: String,
        hook: Arc<dyn CustomAggregator>,
    },
}

impl fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Sum => write!(f, "Sum"),
            Aggregation::Average => write!(f, "Average"),
            Aggregation::WeightedSum => write!(f, "WeightedSum"),
            Aggregation::Custom { name, .. } => write!(f, "Custom({:?})", name),
        }
    }
}

impl Aggregation {
    /// Bind `method` to an implementation. A custom method whose hook is not
    /// registered is a configuration error; it never falls back to `sum`.
    pub fn resolve(method: &Method, hooks: &HookRegistry) -> Result<Self, ConfigurationError> {
        match method {
            Method::Sum => Ok(Aggregation::Sum),
            Method::Average => Ok(Aggregation::Average),
            Method::WeightedSum => Ok(Aggregation::WeightedSum),
            Method::Custom(name) => hooks
                .get(name)
                .map(|hook| Aggregation::Custom {
                    name: name.clone(),
                    hook: Arc::clone(hook),
                })
                .ok_or_else(|| ConfigurationError::UnregisteredHook(name.clone())),
        }
    }

    /// Aggregate before clamping. Always finite.
    pub fn total(&self, contributions: &[AnswerContribution], max_score: f64) -> f64 {
        let scored = || contributions.iter().filter_map(|c| c.value);

        let total = match self {
            Aggregation::Sum => scored().sum(),
            Aggregation::Average => {
                let count = scored().count();
                if count == 0 {
                    0.0
                } else {
                    scored().sum::<f64>() / count as f64
                }
            }
            // Weights are deliberately not renormalized by their sum.
            Aggregation::WeightedSum => contributions.iter().filter_map(|c| c.weighted()).sum(),
            Aggregation::Custom { name, hook } => {
                let scored: Vec<AnswerContribution> =
                    contributions.iter().filter(|c| c.is_scored()).cloned().collect();
                let value = hook.aggregate(&scored, max_score);
                if !value.is_finite() {
                    warn!(hook = %name, value, "custom aggregation returned a non-finite score; using 0");
                }
                value
            }
        };

        if total.is_finite() {
            total
        } else {
            0.0
        }
    }

    /// Raw score: the aggregate clamped to `[0, max_score]`.
    pub fn aggregate(&self, contributions: &[AnswerContribution], max_score: f64) -> f64 {
        clamp_score(self.total(contributions, max_score), max_score)
    }
}

/// Clamp to `[0, max_score]`; non-finite input becomes 0.
pub fn clamp_score(value: f64, max_score: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, max_score.max(0.0))
    } else {
        0.0
    }
}

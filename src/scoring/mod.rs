pub mod adjustments;
pub mod aggregate;
pub mod config;
pub mod contribution;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod ranges;
pub mod risk;
pub mod validation;

pub use adjustments::{AppliedAdjustment, Effect, ScoreOp};
pub use aggregate::{CustomAggregator, HookRegistry};
pub use config::*;
pub use contribution::{resolve_contribution, AnswerContribution, DEFAULT_CATEGORY};
pub use engine::{compute, Diagnostics, ScoreRecord, ScoreResult, ScoringEngine, ScoringEngineBuilder};
pub use error::{ConfigWarning, ConfigurationError, ConfigurationErrors};
pub use model::{Answer, AnswerValue, Choice, Method, ScoringConfiguration};
pub use normalize::{normalize, Normalization};
pub use ranges::{check_ranges, classify, ScoreRange};
pub use risk::{CategoryGroup, RiskBand, RiskLevel, RiskTable};
pub use validation::{validate_scoring, ValidatedConfig};

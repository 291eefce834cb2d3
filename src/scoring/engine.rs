use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::adjustments::{apply_adjustments, AppliedAdjustment};
use super::aggregate::{clamp_score, Aggregation, CustomAggregator, HookRegistry};
use super::config::ScoringConfig;
use super::contribution::{resolve_contribution, AnswerContribution};
use super::error::{ConfigurationError, ConfigurationErrors};
use super::model::{Answer, ScoringConfiguration};
use super::normalize::{normalize, round2};
use super::ranges::{classify, ScoreRange};
use super::risk::{RiskLevel, RiskTable};
use super::validation::validate_scoring;

/// How the engine got to its result, for operators and verbose output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub scored_answers: usize,
    /// Answers without a rule, marked unscored, or carrying a non-finite value
    pub excluded_answers: usize,
    /// A reference sample was supplied but too small or too uniform to use
    pub normalization_unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub raw_score: f64,
    pub normalized_score: f64,
    /// Present only when a reference population was supplied
    pub z_score: Option<f64>,
    pub percentile: Option<f64>,
    /// `None` means unclassified
    pub range: Option<ScoreRange>,
    pub risk_level: RiskLevel,
    /// `None` when no passing score is configured
    pub passed: Option<bool>,
    pub category: String,
    pub category_scores: BTreeMap<String, f64>,
    pub adjustments: Vec<AppliedAdjustment>,
    pub diagnostics: Diagnostics,
    pub computed_at: DateTime<Utc>,
}

/// Flat projection of a [`ScoreResult`] for storage and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub raw_score: f64,
    pub normalized_score: f64,
    pub z_score: Option<f64>,
    pub percentile: Option<f64>,
    pub range_label: Option<String>,
    pub range_color: Option<String>,
    pub range_interpretation: Option<String>,
    pub risk_level: RiskLevel,
    pub computed_at: DateTime<Utc>,
}

impl ScoreResult {
    /// Placeholder shown when no configuration could be loaded.
    pub fn unscored(category: impl Into<String>, computed_at: DateTime<Utc>) -> Self {
        Self {
            raw_score: 0.0,
            normalized_score: 0.0,
            z_score: None,
            percentile: None,
            range: None,
            risk_level: RiskLevel::Unknown,
            passed: None,
            category: category.into(),
            category_scores: BTreeMap::new(),
            adjustments: Vec::new(),
            diagnostics: Diagnostics::default(),
            computed_at,
        }
    }

    pub fn range_label(&self) -> Option<&str> {
        self.range.as_ref().map(|r| r.label.as_str())
    }

    pub fn record(&self) -> ScoreRecord {
        ScoreRecord {
            raw_score: self.raw_score,
            normalized_score: self.normalized_score,
            z_score: self.z_score,
            percentile: self.percentile,
            range_label: self.range.as_ref().map(|r| r.label.clone()),
            range_color: self.range.as_ref().and_then(|r| r.color.clone()),
            range_interpretation: self.range.as_ref().and_then(|r| r.interpretation.clone()),
            risk_level: self.risk_level,
            computed_at: self.computed_at,
        }
    }
}

/// Scores responses against one validated configuration.
///
/// Holds no mutable state, so one engine can be shared across threads.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    configuration: ScoringConfiguration,
    aggregation: Aggregation,
    risk_table: RiskTable,
}

#[derive(Default)]
pub struct ScoringEngineBuilder {
    hooks: HookRegistry,
    risk_table: Option<RiskTable>,
}

impl ScoringEngineBuilder {
    /// Register a custom aggregation strategy under `name`.
    pub fn hook(mut self, name: impl Into<String>, hook: impl CustomAggregator + 'static) -> Self {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn risk_table(mut self, table: RiskTable) -> Self {
        self.risk_table = Some(table);
        self
    }

    pub fn build(self, configuration: ScoringConfiguration) -> Result<ScoringEngine, ConfigurationErrors> {
        let mut errors: Vec<ConfigurationError> = Vec::new();

        let aggregation = match Aggregation::resolve(&configuration.method, &self.hooks) {
            Ok(aggregation) => Some(aggregation),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let risk_table = self.risk_table.unwrap_or_default();
        errors.extend(risk_table.validate());

        match aggregation {
            Some(aggregation) if errors.is_empty() => Ok(ScoringEngine {
                configuration,
                aggregation,
                risk_table,
            }),
            _ => Err(ConfigurationErrors::new(errors)),
        }
    }
}

impl ScoringEngine {
    pub fn builder() -> ScoringEngineBuilder {
        ScoringEngineBuilder::default()
    }

    /// Engine with no custom hooks and the default risk table.
    pub fn new(configuration: ScoringConfiguration) -> Result<Self, ConfigurationErrors> {
        Self::builder().build(configuration)
    }

    pub fn configuration(&self) -> &ScoringConfiguration {
        &self.configuration
    }

    pub fn risk_table(&self) -> &RiskTable {
        &self.risk_table
    }

    /// Resolve every answer, in order, against its rule.
    pub fn contributions(&self, answers: &[Answer]) -> Vec<AnswerContribution> {
        answers
            .iter()
            .map(|answer| resolve_contribution(answer, self.configuration.rule_for(answer)))
            .collect()
    }

    /// Score `answers`, stamping the result with the current time.
    pub fn compute(&self, answers: &[Answer], category: &str, reference: Option<&[f64]>) -> ScoreResult {
        self.compute_at(answers, category, reference, Utc::now())
    }

    /// Score `answers` with an explicit timestamp. Same inputs, same result.
    pub fn compute_at(
        &self,
        answers: &[Answer],
        category: &str,
        reference: Option<&[f64]>,
        computed_at: DateTime<Utc>,
    ) -> ScoreResult {
        let max_score = self.configuration.max_score;
        let contributions = self.contributions(answers);

        let total = self.aggregation.total(&contributions, max_score);
        let (adjusted, adjustments) = apply_adjustments(&self.configuration.adjustments, answers, total);
        let raw_score = clamp_score(adjusted, max_score);

        let range = classify(raw_score, &self.configuration.ranges).cloned();
        if range.is_none() && !self.configuration.ranges.is_empty() {
            debug!(raw_score, "score falls outside every configured range");
        }

        let normalization = reference.map(|sample| normalize(raw_score, sample));
        let normalization_unavailable = normalization.is_some_and(|n| !n.available);
        if normalization_unavailable {
            warn!(
                sample_size = normalization.map_or(0, |n| n.sample_size),
                "reference population too small or uniform; using neutral percentile"
            );
        }

        let risk_level = self.risk_table.classify(raw_score, category);
        let passed = self.configuration.passing_score.map(|passing| raw_score >= passing);
        let scored_answers = contributions.iter().filter(|c| c.is_scored()).count();

        debug!(
            method = %self.configuration.method,
            total,
            raw_score,
            risk = %risk_level,
            scored_answers,
            "computed score"
        );

        ScoreResult {
            raw_score,
            normalized_score: raw_score,
            z_score: normalization.map(|n| n.z_score),
            percentile: normalization.map(|n| n.percentile),
            range,
            risk_level,
            passed,
            category: category.trim().to_string(),
            category_scores: category_subtotals(&contributions),
            adjustments,
            diagnostics: Diagnostics {
                scored_answers,
                excluded_answers: contributions.len() - scored_answers,
                normalization_unavailable,
            },
            computed_at,
        }
    }
}

/// Unweighted sum of scored contributions per question category.
fn category_subtotals(contributions: &[AnswerContribution]) -> BTreeMap<String, f64> {
    let mut subtotals: BTreeMap<String, f64> = BTreeMap::new();
    for contribution in contributions {
        if let Some(value) = contribution.value {
            *subtotals.entry(contribution.category.clone()).or_default() += value;
        }
    }
    for value in subtotals.values_mut() {
        *value = round2(*value);
    }
    subtotals
}

/// Validate `config` and score `answers` in one step, with no custom hooks
/// and the default risk table.
pub fn compute(
    answers: &[Answer],
    config: &ScoringConfig,
    category: &str,
    reference: Option<&[f64]>,
) -> Result<ScoreResult, ConfigurationErrors> {
    let validated = validate_scoring(config)?;
    for warning in &validated.warnings {
        warn!("{}", warning);
    }
    let engine = ScoringEngine::new(validated.configuration)?;
    Ok(engine.compute(answers, category, reference))
}

use tracing::debug;

use super::adjustments::Adjustment;
use super::config::{QuestionRule, ScoringConfig};
use super::error::{ConfigWarning, ConfigurationError, ConfigurationErrors};
use super::model::{Method, ScoringConfiguration};
use super::ranges::{check_ranges, ScoreRange};

/// A configuration that passed validation, plus anything worth telling the
/// operator about it.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub configuration: ScoringConfiguration,
    pub warnings: Vec<ConfigWarning>,
}

/// Validate scoring configuration at load time.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<ValidatedConfig, ConfigurationErrors> {
    let mut errors = Vec::new();

    let method = match config.method.as_deref() {
        None => {
            errors.push(ConfigurationError::MissingMethod);
            None
        }
        Some(name) => match Method::parse(name, config.custom_hook.as_deref()) {
            Ok(method) => Some(method),
            Err(e) => {
                errors.push(e);
                None
            }
        },
    };

    let max_score = match config.max_score {
        None => {
            errors.push(ConfigurationError::MissingMaxScore);
            None
        }
        Some(max) if !max.is_finite() || max < 0.0 => {
            errors.push(ConfigurationError::InvalidMaxScore(max));
            None
        }
        Some(max) => Some(max),
    };

    if let Some(passing) = config.passing_score {
        if !passing.is_finite() {
            errors.push(ConfigurationError::InvalidPassingScore(passing));
        }
    }

    let mut ranges = Vec::with_capacity(config.ranges.len());
    for (index, range) in config.ranges.iter().enumerate() {
        if !range.min.is_finite() || !range.max.is_finite() {
            errors.push(ConfigurationError::NonFiniteRange { index });
        } else if range.min > range.max {
            errors.push(ConfigurationError::InvertedRange {
                index,
                min: range.min,
                max: range.max,
            });
        } else {
            ranges.push(ScoreRange {
                min: range.min,
                max: range.max,
                label: range.label.clone(),
                color: range.color.clone(),
                interpretation: range.description.clone(),
            });
        }
    }

    for (question_id, rule) in &config.questions {
        check_question_rule(question_id, rule, &mut errors);
    }

    let mut adjustments = Vec::with_capacity(config.adjustments.len());
    for (index, adjustment) in config.adjustments.iter().enumerate() {
        match Adjustment::parse(index, adjustment) {
            Ok(adjustment) => adjustments.push(adjustment),
            Err(e) => errors.push(ConfigurationError::InvalidAdjustment {
                index,
                message: e.to_string(),
            }),
        }
    }

    let (Some(method), Some(max_score), true) = (method, max_score, errors.is_empty()) else {
        return Err(ConfigurationErrors::new(errors));
    };

    let mut warnings = check_ranges(&ranges, max_score);
    if let Some(passing) = config.passing_score {
        if passing < 0.0 || passing > max_score {
            warnings.push(ConfigWarning::PassingScoreOutOfRange {
                passing,
                max: max_score,
            });
        }
    }

    debug!(
        method = %method,
        max_score,
        ranges = ranges.len(),
        adjustments = adjustments.len(),
        warnings = warnings.len(),
        "scoring configuration validated"
    );

    Ok(ValidatedConfig {
        configuration: ScoringConfiguration {
            method,
            max_score,
            passing_score: config.passing_score,
            ranges,
            questions: config.questions.clone(),
            adjustments,
        },
        warnings,
    })
}

fn check_question_rule(question_id: &str, rule: &QuestionRule, errors: &mut Vec<ConfigurationError>) {
    let mut error = |message: &str| {
        errors.push(ConfigurationError::InvalidQuestionRule {
            question_id: question_id.to_string(),
            message: message.to_string(),
        })
    };

    if !rule.weight.is_finite() || rule.weight < 0.0 {
        error("weight must be a non-negative number");
    }
    if let Some(cap) = rule.max_score {
        if !cap.is_finite() || cap < 0.0 {
            error("max_score must be a non-negative number");
        }
    }
    if let Some(text_score) = rule.text_score {
        if !text_score.is_finite() {
            error("text_score must be a finite number");
        }
    }
}

//! Answer contribution resolution.
//!
//! Turns one answer plus its question rule into the number it adds to the
//! aggregate, or marks it "not scored". Not-scored answers are excluded from
//! aggregation, which is different from contributing zero: an average over
//! the remaining answers is unaffected by them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::QuestionRule;
use super::model::{Answer, AnswerValue};

/// Subtotal bucket used when a rule names no category.
pub const DEFAULT_CATEGORY: &str = "general";

/// What one answer brings to the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerContribution {
    pub question_id: String,
    /// `None` means "not scored"
    pub value: Option<f64>,
    pub weight: f64,
    pub category: String,
}

impl AnswerContribution {
    pub fn is_scored(&self) -> bool {
        self.value.is_some()
    }

    /// Value times weight, for the weighted-sum method.
    pub fn weighted(&self) -> Option<f64> {
        self.value.map(|v| v * self.weight)
    }
}

/// Resolve the contribution of `answer` under `rule`.
///
/// `rule` is `None` when the question carries no scoring metadata; such
/// answers are dropped, never zeroed.
pub fn resolve_contribution(answer: &Answer, rule: Option<&QuestionRule>) -> AnswerContribution {
    let category = rule
        .and_then(|r| r.category.clone())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let not_scored = |reason: &str| {
        debug!(question_id = %answer.question_id, reason, "answer excluded from scoring");
        AnswerContribution {
            question_id: answer.question_id.clone(),
            value: None,
            weight: rule.map(|r| r.weight).unwrap_or(1.0),
            category: category.clone(),
        }
    };

    let Some(rule) = rule else {
        return not_scored("question has no scoring rule");
    };
    if !rule.is_scored {
        return not_scored("question is not scored");
    }
    if !rule.weight.is_finite() {
        return not_scored("question weight is not a finite number");
    }

    let value = match &answer.value {
        AnswerValue::SingleChoice { choice } => choice.score,
        AnswerValue::MultipleChoice { choices } if choices.is_empty() => 0.0,
        AnswerValue::MultipleChoice { choices } => {
            choices.iter().map(|c| c.score).sum::<f64>() / choices.len() as f64
        }
        // f64::min ignores NaN, so a NaN answer must not reach the cap.
        AnswerValue::Numeric { value } if !value.is_finite() => *value,
        AnswerValue::Numeric { value } => match rule.max_score {
            Some(cap) => value.min(cap),
            None => *value,
        },
        AnswerValue::Text { .. } => rule.text_score.unwrap_or(0.0),
    };

    if !value.is_finite() {
        return not_scored("answer value is not a finite number");
    }

    AnswerContribution {
        question_id: answer.question_id.clone(),
        value: Some(value),
        weight: rule.weight,
        category,
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::adjustments::Adjustment;
use super::config::QuestionRule;
use super::ranges::ScoreRange;

/// A selectable option together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub score: f64,
}

impl Choice {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// The value a respondent gave for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerValue {
    SingleChoice { choice: Choice },
    MultipleChoice { choices: Vec<Choice> },
    Numeric { value: f64 },
    Text { text: String },
}

impl AnswerValue {
    pub fn single(label: impl Into<String>, score: f64) -> Self {
        AnswerValue::SingleChoice {
            choice: Choice::new(label, score),
        }
    }

    pub fn multiple(choices: impl IntoIterator<Item = Choice>) -> Self {
        AnswerValue::MultipleChoice {
            choices: choices.into_iter().collect(),
        }
    }

    pub fn numeric(value: f64) -> Self {
        AnswerValue::Numeric { value }
    }

    pub fn text(text: impl Into<String>) -> Self {
        AnswerValue::Text { text: text.into() }
    }

    /// Numeric reading of the answer used by conditional adjustments.
    /// Multi-select reads as the mean of its choices; free text has none.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            AnswerValue::SingleChoice { choice } => Some(choice.score),
            AnswerValue::MultipleChoice { choices } if choices.is_empty() => None,
            AnswerValue::MultipleChoice { choices } => {
                Some(choices.iter().map(|c| c.score).sum::<f64>() / choices.len() as f64)
            }
            AnswerValue::Numeric { value } => Some(*value),
            AnswerValue::Text { .. } => None,
        }
    }
}

/// One `(question_id, question_rule, answer_value)` triple.
///
/// `rule` may be omitted when the configuration carries a rule for the
/// question; without either the answer is unscorable and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<QuestionRule>,
    pub value: AnswerValue,
}

impl Answer {
    /// An answer scored with the default rule (scored, weight 1).
    pub fn new(question_id: impl Into<String>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            rule: Some(QuestionRule::default()),
            value,
        }
    }

    /// An answer that relies on the configuration's question table for its rule.
    pub fn bare(question_id: impl Into<String>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            rule: None,
            value,
        }
    }

    pub fn with_rule(mut self, rule: QuestionRule) -> Self {
        self.rule = Some(rule);
        self
    }
}

/// How contributions are combined into a raw score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "method", content = "hook")]
pub enum Method {
    Sum,
    Average,
    WeightedSum,
    /// Caller-supplied strategy, looked up by name when the engine is built
    Custom(String),
}

impl Method {
    /// Parse the interchange method name. `custom` needs the hook name.
    pub fn parse(name: &str, custom_hook: Option<&str>) -> Result<Self, super::ConfigurationError> {
        use super::ConfigurationError;

        match name.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Method::Sum),
            "average" => Ok(Method::Average),
            "weighted-sum" | "weighted_sum" => Ok(Method::WeightedSum),
            "custom" => match custom_hook.map(str::trim) {
                Some(hook) if !hook.is_empty() => Ok(Method::Custom(hook.to_string())),
                _ => Err(ConfigurationError::MissingCustomHook),
            },
            _ => Err(ConfigurationError::UnknownMethod(name.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Sum => write!(f, "sum"),
            Method::Average => write!(f, "average"),
            Method::WeightedSum => write!(f, "weighted-sum"),
            Method::Custom(hook) => write!(f, "custom ({})", hook),
        }
    }
}

/// A validated, immutable scoring configuration.
///
/// Only produced by [`validate_scoring`](super::validate_scoring), so every
/// instance satisfies `max_score >= 0`, `min <= max` for each range, and
/// carries a concrete method.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfiguration {
    pub(crate) method: Method,
    pub(crate) max_score: f64,
    pub(crate) passing_score: Option<f64>,
    pub(crate) ranges: Vec<ScoreRange>,
    pub(crate) questions: BTreeMap<String, QuestionRule>,
    pub(crate) adjustments: Vec<Adjustment>,
}

impl ScoringConfiguration {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    pub fn passing_score(&self) -> Option<f64> {
        self.passing_score
    }

    pub fn ranges(&self) -> &[ScoreRange] {
        &self.ranges
    }

    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    /// Rule for an answer: its own rule first, then the configuration's table.
    pub fn rule_for<'a>(&'a self, answer: &'a Answer) -> Option<&'a QuestionRule> {
        answer
            .rule
            .as_ref()
            .or_else(|| self.questions.get(&answer.question_id))
    }
}

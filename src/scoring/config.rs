use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scoring configuration as it is persisted or transmitted.
///
/// This is the unvalidated interchange form. Every field is optional at the
/// parsing layer so that [`validate_scoring`](super::validate_scoring) can
/// report *all* problems at once instead of failing on the first missing key.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   method: sum
///   max_score: 27
///   passing_score: 5
///   ranges:
///     - { min: 0, max: 4, label: Minimal, color: "#00FF00", description: Minimal or no depression }
///     - { min: 5, max: 9, label: Mild, color: "#FFFF00", description: Mild depression }
///   questions:
///     q10: { is_scored: false }
///   adjustments:
///     - description: Any self-harm ideation
///       when: [{ question_id: q9, score: ">=1" }]
///       effect: "+5"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// One of `sum`, `average`, `weighted-sum` (or `weighted_sum`), `custom`
    #[serde(default)]
    pub method: Option<String>,

    /// Name of the caller-registered hook used when `method` is `custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_hook: Option<String>,

    /// Upper bound of the raw score. Required, must be >= 0.
    #[serde(default)]
    pub max_score: Option<f64>,

    /// Score at or above which a response counts as "passed"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<f64>,

    /// Ordered severity bands. First match wins when bands overlap.
    #[serde(default, alias = "rules")]
    pub ranges: Vec<RangeConfig>,

    /// Per-question rules for answers that arrive without their own rule
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub questions: BTreeMap<String, QuestionRule>,

    /// Conditional adjustments applied to the aggregate before clamping
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<AdjustmentConfig>,
}

impl ScoringConfig {
    /// A nine-item, 0–3 per item configuration with the standard depression
    /// severity bands. Used by `qscore init` as a starting point.
    pub fn starter() -> Self {
        let band = |min: f64, max: f64, label: &str, color: &str, description: &str| RangeConfig {
            min,
            max,
            label: label.to_string(),
            color: Some(color.to_string()),
            description: Some(description.to_string()),
        };

        Self {
            method: Some("sum".to_string()),
            custom_hook: None,
            max_score: Some(27.0),
            passing_score: Some(5.0),
            ranges: vec![
                band(0.0, 4.0, "Minimal", "#00FF00", "Minimal or no depression"),
                band(5.0, 9.0, "Mild", "#FFFF00", "Mild depression"),
                band(10.0, 14.0, "Moderate", "#FFA500", "Moderate depression"),
                band(15.0, 19.0, "Moderately Severe", "#FF4500", "Moderately severe depression"),
                band(20.0, 27.0, "Severe", "#FF0000", "Severe depression"),
            ],
            questions: BTreeMap::new(),
            adjustments: Vec::new(),
        }
    }
}

/// One severity band in interchange form.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    pub min: f64,
    pub max: f64,
    pub label: String,

    /// Opaque display token, usually a hex color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Clinical interpretation text
    #[serde(default, alias = "interpretation", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Scoring metadata for one question.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuestionRule {
    /// Unscored questions are excluded from aggregation entirely
    #[serde(default = "default_is_scored")]
    pub is_scored: bool,

    /// Multiplier used by the weighted-sum method (default: 1.0)
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Cap applied to numeric/scale answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,

    /// Flat score for free-text answers. Absent means free text scores 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_score: Option<f64>,

    /// Subtotal bucket (default: "general")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn default_is_scored() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

impl Default for QuestionRule {
    fn default() -> Self {
        Self {
            is_scored: true,
            weight: 1.0,
            max_score: None,
            text_score: None,
            category: None,
        }
    }
}

impl QuestionRule {
    pub fn weighted(weight: f64) -> Self {
        Self {
            weight,
            ..Self::default()
        }
    }

    pub fn unscored() -> Self {
        Self {
            is_scored: false,
            ..Self::default()
        }
    }

    pub fn with_max_score(mut self, max_score: f64) -> Self {
        self.max_score = Some(max_score);
        self
    }

    pub fn with_text_score(mut self, text_score: f64) -> Self {
        self.text_score = Some(text_score);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Conditional adjustment in interchange form.
///
/// `effect` (and `otherwise`, if present) use the `+N` / `xN` syntax.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// All conditions must hold for `effect` to apply
    pub when: Vec<ConditionConfig>,

    pub effect: String,

    /// Applied when any condition fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<String>,
}

/// A single answer-pattern test. Exactly one of `score` or `equals` is set.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConditionConfig {
    pub question_id: String,

    /// Comparison on the answer's numeric value: "<N", "<=N", ">N", ">=N", "!=N", "N", "N-M"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,

    /// Case-insensitive match on the chosen label(s) or free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
}

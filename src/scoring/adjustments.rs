use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::config::{AdjustmentConfig, ConditionConfig};
use super::model::{Answer, AnswerValue};

/// Numeric comparison against an answer's value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOp {
    LessThan(f64),
    LessEqual(f64),
    GreaterThan(f64),
    GreaterEqual(f64),
    Equal(f64),
    NotEqual(f64),
    Between(f64, f64), // Inclusive range: N-M
}

impl ScoreOp {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let op = if let Some(val) = s.strip_prefix(">=") {
            ScoreOp::GreaterEqual(val.trim().parse()?)
        } else if let Some(val) = s.strip_prefix("<=") {
            ScoreOp::LessEqual(val.trim().parse()?)
        } else if let Some(val) = s.strip_prefix("!=") {
            ScoreOp::NotEqual(val.trim().parse()?)
        } else if let Some(val) = s.strip_prefix("==") {
            ScoreOp::Equal(val.trim().parse()?)
        } else if let Some(val) = s.strip_prefix('>') {
            ScoreOp::GreaterThan(val.trim().parse()?)
        } else if let Some(val) = s.strip_prefix('<') {
            ScoreOp::LessThan(val.trim().parse()?)
        } else if let Ok(value) = s.parse::<f64>() {
            // Plain numbers first so exponents like "1e-3" are not split as a range.
            ScoreOp::Equal(value)
        } else if let Some((low, high)) = s.get(1..).and_then(|rest| rest.split_once('-')) {
            // Range format: "1-3". The first character is skipped so a
            // leading minus sign stays part of the lower bound.
            let low: f64 = format!("{}{}", &s[..1], low).trim().parse()?;
            let high: f64 = high.trim().parse()?;
            if low > high {
                bail!("Range lower bound {} is greater than upper bound {}", low, high);
            }
            ScoreOp::Between(low, high)
        } else {
            ScoreOp::Equal(s.parse()?)
        };

        if op.bounds().iter().any(|b| !b.is_finite()) {
            bail!("Comparison value must be a finite number: {}", s);
        }
        Ok(op)
    }

    fn bounds(&self) -> Vec<f64> {
        match self {
            ScoreOp::LessThan(n)
            | ScoreOp::LessEqual(n)
            | ScoreOp::GreaterThan(n)
            | ScoreOp::GreaterEqual(n)
            | ScoreOp::Equal(n)
            | ScoreOp::NotEqual(n) => vec![*n],
            ScoreOp::Between(low, high) => vec![*low, *high],
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self {
            ScoreOp::LessThan(n) => value < *n,
            ScoreOp::LessEqual(n) => value <= *n,
            ScoreOp::GreaterThan(n) => value > *n,
            ScoreOp::GreaterEqual(n) => value >= *n,
            ScoreOp::Equal(n) => value == *n,
            ScoreOp::NotEqual(n) => value != *n,
            ScoreOp::Between(low, high) => value >= *low && value <= *high,
        }
    }
}

/// Change applied to the aggregate when an adjustment fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Add(f64),
    Multiply(f64),
}

impl Effect {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let effect = if let Some(val) = s.strip_prefix('+') {
            Effect::Add(val.trim().parse()?)
        } else if let Some(val) = s.strip_prefix('x') {
            Effect::Multiply(val.trim().parse()?)
        } else {
            bail!("Effect must start with + or x: {}", s)
        };

        match effect {
            Effect::Add(n) | Effect::Multiply(n) if !n.is_finite() => {
                bail!("Effect value must be a finite number: {}", s)
            }
            effect => Ok(effect),
        }
    }

    pub fn apply(&self, score: f64) -> f64 {
        match self {
            Effect::Add(n) => score + n,
            Effect::Multiply(n) => score * n,
        }
    }
}

/// What a condition tests on the referenced answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Score(ScoreOp),
    Equals(String),
}

/// One answer-pattern test. An unanswered question never satisfies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub question_id: String,
    pub test: Test,
}

impl Condition {
    pub fn parse(config: &ConditionConfig) -> Result<Self> {
        if config.question_id.trim().is_empty() {
            bail!("condition is missing question_id");
        }
        let test = match (&config.score, &config.equals) {
            (Some(expr), None) => Test::Score(ScoreOp::parse(expr)?),
            (None, Some(text)) => Test::Equals(text.trim().to_string()),
            (Some(_), Some(_)) => bail!(
                "condition on '{}' sets both 'score' and 'equals'",
                config.question_id
            ),
            (None, None) => bail!(
                "condition on '{}' needs one of 'score' or 'equals'",
                config.question_id
            ),
        };
        Ok(Self {
            question_id: config.question_id.trim().to_string(),
            test,
        })
    }

    pub fn holds(&self, answers: &HashMap<&str, &Answer>) -> bool {
        let Some(answer) = answers.get(self.question_id.as_str()) else {
            return false;
        };

        match &self.test {
            Test::Score(op) => answer.value.numeric_value().is_some_and(|v| op.matches(v)),
            Test::Equals(expected) => match &answer.value {
                AnswerValue::SingleChoice { choice } => choice.label.trim().eq_ignore_ascii_case(expected),
                AnswerValue::MultipleChoice { choices } => choices
                    .iter()
                    .any(|c| c.label.trim().eq_ignore_ascii_case(expected)),
                AnswerValue::Text { text } => text.trim().eq_ignore_ascii_case(expected),
                AnswerValue::Numeric { value } => {
                    expected.parse::<f64>().is_ok_and(|expected| *value == expected)
                }
            },
        }
    }
}

/// A validated conditional adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub label: String,
    pub conditions: Vec<Condition>,
    pub effect: Effect,
    pub effect_text: String,
    pub otherwise: Option<(Effect, String)>,
}

/// Record of an adjustment that changed the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub label: String,       // e.g. "Self-harm item endorsed"
    pub description: String, // e.g. "conditions met -> +5"
    pub before: f64,         // Aggregate before this adjustment
    pub after: f64,          // Aggregate after this adjustment
}

impl Adjustment {
    /// Parse an adjustment. `index` only names it when no description is given.
    pub fn parse(index: usize, config: &AdjustmentConfig) -> Result<Self> {
        if config.when.is_empty() {
            bail!("'when' must list at least one condition");
        }
        let conditions = config
            .when
            .iter()
            .map(Condition::parse)
            .collect::<Result<Vec<_>>>()?;
        let effect = Effect::parse(&config.effect)?;
        let otherwise = match &config.otherwise {
            Some(text) => Some((Effect::parse(text)?, text.trim().to_string())),
            None => None,
        };

        Ok(Self {
            label: config
                .description
                .clone()
                .unwrap_or_else(|| format!("Adjustment #{}", index + 1)),
            conditions,
            effect,
            effect_text: config.effect.trim().to_string(),
            otherwise,
        })
    }

    /// Apply to `score`, returning `None` when no branch applies.
    pub fn apply(&self, score: f64, answers: &HashMap<&str, &Answer>) -> Option<AppliedAdjustment> {
        let met = self.conditions.iter().all(|c| c.holds(answers));
        let (effect, text, outcome) = if met {
            (&self.effect, &self.effect_text, "conditions met")
        } else {
            let (effect, text) = self.otherwise.as_ref()?;
            (effect, text, "conditions not met")
        };

        Some(AppliedAdjustment {
            label: self.label.clone(),
            description: format!("{} -> {}", outcome, text),
            before: score,
            after: effect.apply(score),
        })
    }
}

/// Index answers by question id. The first answer for a question wins.
pub fn index_answers(answers: &[Answer]) -> HashMap<&str, &Answer> {
    let mut index = HashMap::with_capacity(answers.len());
    for answer in answers {
        index.entry(answer.question_id.as_str()).or_insert(answer);
    }
    index
}

/// Apply every adjustment in order, returning the adjusted aggregate.
pub fn apply_adjustments(
    adjustments: &[Adjustment],
    answers: &[Answer],
    total: f64,
) -> (f64, Vec<AppliedAdjustment>) {
    if adjustments.is_empty() {
        return (total, Vec::new());
    }

    let index = index_answers(answers);
    let mut score = total;
    let mut applied = Vec::new();
    for adjustment in adjustments {
        if let Some(result) = adjustment.apply(score, &index) {
            score = result.after;
            applied.push(result);
        }
    }
    (score, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::model::Choice;

    #[test]
    fn test_parse_op_less_than() {
        let op = ScoreOp::parse("<2").unwrap();
        assert!(op.matches(1.5));
        assert!(!op.matches(2.0));
    }

    #[test]
    fn test_parse_op_greater_equal() {
        let op = ScoreOp::parse(">= 1").unwrap();
        assert!(!op.matches(0.0));
        assert!(op.matches(1.0));
        assert!(op.matches(3.0));
    }

    #[test]
    fn test_parse_op_equal_and_not_equal() {
        assert!(ScoreOp::parse("2").unwrap().matches(2.0));
        assert!(ScoreOp::parse("==2").unwrap().matches(2.0));
        assert!(ScoreOp::parse("!=2").unwrap().matches(3.0));
        assert!(!ScoreOp::parse("!=2").unwrap().matches(2.0));
    }

    #[test]
    fn test_parse_op_between() {
        let op = ScoreOp::parse("1-3").unwrap();
        assert!(!op.matches(0.5));
        assert!(op.matches(1.0));
        assert!(op.matches(3.0));
        assert!(!op.matches(3.5));
    }

    #[test]
    fn test_parse_op_negative_bounds() {
        assert_eq!(ScoreOp::parse("-2").unwrap(), ScoreOp::Equal(-2.0));
        assert_eq!(ScoreOp::parse("-2-1").unwrap(), ScoreOp::Between(-2.0, 1.0));
        assert_eq!(ScoreOp::parse("<-1").unwrap(), ScoreOp::LessThan(-1.0));
    }

    #[test]
    fn test_parse_op_exponent_is_a_number() {
        assert_eq!(ScoreOp::parse("1e-3").unwrap(), ScoreOp::Equal(0.001));
        assert_eq!(ScoreOp::parse("1e3").unwrap(), ScoreOp::Equal(1000.0));
        assert_eq!(ScoreOp::parse(">=2.5e-1").unwrap(), ScoreOp::GreaterEqual(0.25));
    }

    #[test]
    fn test_parse_op_invalid() {
        assert!(ScoreOp::parse("often").is_err());
        assert!(ScoreOp::parse("5-1").is_err());
        assert!(ScoreOp::parse(">inf").is_err());
    }

    #[test]
    fn test_parse_effect() {
        assert_eq!(Effect::parse("+5").unwrap().apply(10.0), 15.0);
        assert_eq!(Effect::parse("+-2").unwrap().apply(10.0), 8.0);
        assert_eq!(Effect::parse("x1.5").unwrap().apply(10.0), 15.0);
        assert!(Effect::parse("5").is_err());
        assert!(Effect::parse("xNaN").is_err());
    }

    fn answers() -> Vec<Answer> {
        vec![
            Answer::new("q1", AnswerValue::single("Several days", 1.0)),
            Answer::new(
                "q2",
                AnswerValue::multiple([Choice::new("Headache", 1.0), Choice::new("Fatigue", 2.0)]),
            ),
            Answer::new("q3", AnswerValue::text("Yes")),
            Answer::new("q4", AnswerValue::numeric(7.0)),
        ]
    }

    fn condition(question_id: &str, score: Option<&str>, equals: Option<&str>) -> Condition {
        Condition::parse(&ConditionConfig {
            question_id: question_id.to_string(),
            score: score.map(str::to_string),
            equals: equals.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_condition_score_and_equals() {
        let answers = answers();
        let index = index_answers(&answers);
        assert!(condition("q1", Some(">=1"), None).holds(&index));
        assert!(condition("q1", None, Some("several days")).holds(&index));
        assert!(condition("q2", None, Some("Fatigue")).holds(&index));
        assert!(condition("q2", Some("1.5"), None).holds(&index));
        assert!(condition("q3", None, Some("yes")).holds(&index));
        assert!(!condition("q3", Some(">0"), None).holds(&index));
        assert!(condition("q4", Some("5-10"), None).holds(&index));
        assert!(condition("q4", None, Some("7")).holds(&index));
    }

    #[test]
    fn test_unanswered_question_never_holds() {
        let answers = answers();
        let index = index_answers(&answers);
        assert!(!condition("q99", Some(">=0"), None).holds(&index));
        assert!(!condition("q99", Some("!=1"), None).holds(&index));
    }

    #[test]
    fn test_condition_needs_exactly_one_test() {
        let both = ConditionConfig {
            question_id: "q1".to_string(),
            score: Some(">1".to_string()),
            equals: Some("Yes".to_string()),
        };
        let neither = ConditionConfig {
            question_id: "q1".to_string(),
            score: None,
            equals: None,
        };
        assert!(Condition::parse(&both).is_err());
        assert!(Condition::parse(&neither).is_err());
    }

    fn adjustment(when: Vec<ConditionConfig>, effect: &str, otherwise: Option<&str>) -> Adjustment {
        Adjustment::parse(
            0,
            &AdjustmentConfig {
                description: None,
                when,
                effect: effect.to_string(),
                otherwise: otherwise.map(str::to_string),
            },
        )
        .unwrap()
    }

    fn when(question_id: &str, score: &str) -> ConditionConfig {
        ConditionConfig {
            question_id: question_id.to_string(),
            score: Some(score.to_string()),
            equals: None,
        }
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let answers = answers();
        let met = adjustment(vec![when("q1", ">=1"), when("q4", ">5")], "+3", None);
        let unmet = adjustment(vec![when("q1", ">=1"), when("q4", ">10")], "+3", None);

        let (score, applied) = apply_adjustments(&[met], &answers, 10.0);
        assert_eq!(score, 13.0);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].label, "Adjustment #1");
        assert_eq!(applied[0].description, "conditions met -> +3");

        let (score, applied) = apply_adjustments(&[unmet], &answers, 10.0);
        assert_eq!(score, 10.0);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_otherwise_branch() {
        let answers = answers();
        let adj = adjustment(vec![when("q1", ">=3")], "+3", Some("x0.5"));
        let (score, applied) = apply_adjustments(&[adj], &answers, 10.0);
        assert_eq!(score, 5.0);
        assert_eq!(applied[0].description, "conditions not met -> x0.5");
    }

    #[test]
    fn test_adjustments_compound_in_order() {
        let answers = answers();
        let add = adjustment(vec![when("q1", "1")], "+10", None);
        let double = adjustment(vec![when("q4", "7")], "x2", None);
        let (score, applied) = apply_adjustments(&[add, double], &answers, 5.0);
        assert_eq!(score, 30.0);
        assert_eq!(applied[1].before, 15.0);
        assert_eq!(applied[1].after, 30.0);
    }

    #[test]
    fn test_adjustment_without_conditions_rejected() {
        let config = AdjustmentConfig {
            description: Some("Empty".to_string()),
            when: vec![],
            effect: "+1".to_string(),
            otherwise: None,
        };
        assert!(Adjustment::parse(0, &config).is_err());
    }
}

//! Property-based tests for the scoring engine
//!
//! These tests verify invariants that should hold for all inputs:
//! - The raw score stays within [0, max_score]
//! - Computation is deterministic for a fixed timestamp
//! - Percentiles stay within [0, 100]
//! - Risk levels are monotonic in the raw score

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use qscore::scoring::{
    normalize, validate_scoring, Answer, AnswerValue, Choice, QuestionRule, RangeConfig, RiskLevel,
    RiskTable, ScoringConfig, ScoringEngine,
};

fn engine_for(method: &str, max_score: f64) -> ScoringEngine {
    let config = ScoringConfig {
        method: Some(method.to_string()),
        max_score: Some(max_score),
        ranges: vec![RangeConfig {
            min: 0.0,
            max: max_score,
            label: "All".to_string(),
            color: None,
            description: None,
        }],
        ..Default::default()
    };
    ScoringEngine::new(validate_scoring(&config).unwrap().configuration).unwrap()
}

/// Any answer shape, including non-finite numerics and unscored rules
fn answer_value() -> impl Strategy<Value = AnswerValue> {
    prop_oneof![
        (-10.0f64..50.0).prop_map(|s| AnswerValue::single("option", s)),
        prop::collection::vec(-10.0f64..50.0, 0..4).prop_map(|scores| {
            AnswerValue::multiple(scores.into_iter().map(|s| Choice::new("option", s)))
        }),
        prop_oneof![
            (-100.0f64..100.0).boxed(),
            Just(f64::NAN).boxed(),
            Just(f64::INFINITY).boxed(),
        ]
        .prop_map(AnswerValue::numeric),
        "[a-z ]{0,12}".prop_map(AnswerValue::text),
    ]
}

fn question_rule() -> impl Strategy<Value = QuestionRule> {
    (any::<bool>(), 0.0f64..5.0, prop::option::of(0.0f64..10.0), prop::option::of(0.0f64..3.0))
        .prop_map(|(is_scored, weight, max_score, text_score)| QuestionRule {
            is_scored,
            weight,
            max_score,
            text_score,
            category: None,
        })
}

fn answers() -> impl Strategy<Value = Vec<Answer>> {
    prop::collection::vec((question_rule(), answer_value()), 0..12).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (rule, value))| Answer::new(format!("q{}", i + 1), value).with_rule(rule))
            .collect()
    })
}

fn method() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("sum"), Just("average"), Just("weighted-sum")]
}

proptest! {
    /// Property: raw_score is always within [0, max_score] and never NaN
    #[test]
    fn prop_raw_score_within_bounds(
        method in method(),
        max_score in 0.0f64..100.0,
        answers in answers(),
    ) {
        let engine = engine_for(method, max_score);
        let result = engine.compute(&answers, "depression", None);

        prop_assert!(result.raw_score.is_finite());
        prop_assert!(result.raw_score >= 0.0);
        prop_assert!(result.raw_score <= max_score);
        prop_assert_eq!(result.normalized_score, result.raw_score);
        prop_assert_ne!(result.risk_level, RiskLevel::Unknown);
        prop_assert_eq!(
            result.diagnostics.scored_answers + result.diagnostics.excluded_answers,
            answers.len()
        );
    }

    /// Property: the same inputs and timestamp produce the same result
    #[test]
    fn prop_compute_is_deterministic(
        method in method(),
        answers in answers(),
        reference in prop::collection::vec(0.0f64..30.0, 0..20),
    ) {
        let engine = engine_for(method, 27.0);
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let first = engine.compute_at(&answers, "anxiety", Some(&reference), at);
        let second = engine.compute_at(&answers, "anxiety", Some(&reference), at);
        prop_assert_eq!(first, second);
    }

    /// Property: percentile is within [0, 100] for any finite sample
    #[test]
    fn prop_percentile_within_bounds(
        raw in -1000.0f64..1000.0,
        sample in prop::collection::vec(-1000.0f64..1000.0, 0..50),
    ) {
        let result = normalize(raw, &sample);
        prop_assert!(result.percentile >= 0.0);
        prop_assert!(result.percentile <= 100.0);
        prop_assert!(result.z_score.is_finite());
    }

    /// Property: a higher raw score never maps to a lower risk level
    #[test]
    fn prop_risk_is_monotonic(
        a in 0.0f64..40.0,
        b in 0.0f64..40.0,
        category in prop_oneof![
            Just("depression"),
            Just("physical_health"),
            Just("customer_feedback"),
        ],
    ) {
        let table = RiskTable::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let rank = |level: RiskLevel| match level {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
            RiskLevel::Unknown => 4,
        };
        prop_assert!(rank(table.classify(low, category)) <= rank(table.classify(high, category)));
    }

    /// Property: average never exceeds the largest scored contribution
    #[test]
    fn prop_average_bounded_by_largest_item(
        scores in prop::collection::vec(0.0f64..10.0, 1..10),
    ) {
        let engine = engine_for("average", 100.0);
        let answers: Vec<Answer> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| Answer::new(format!("q{}", i), AnswerValue::single("option", *s)))
            .collect();
        let largest = scores.iter().cloned().fold(0.0, f64::max);
        let result = engine.compute(&answers, "general", None);
        prop_assert!(result.raw_score <= largest + 1e-9);
    }
}

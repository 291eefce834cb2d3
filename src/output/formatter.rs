use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::scoring::{ConfigWarning, ConfigurationErrors, RiskLevel, ScoreResult};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score with at most two decimals ("18", "4.5", "1.33")
pub fn format_score(score: f64) -> String {
    let formatted = format!("{:.2}", score);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse "#RRGGBB" (or "RRGGBB") into RGB components
fn parse_hex_color(token: &str) -> Option<(u8, u8, u8)> {
    let hex = token.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn paint_risk(level: RiskLevel, use_colors: bool) -> String {
    let text = level.as_str();
    if !use_colors {
        return text.to_string();
    }
    match level {
        RiskLevel::Low => text.green().to_string(),
        RiskLevel::Medium => text.yellow().to_string(),
        RiskLevel::High => text.red().to_string(),
        RiskLevel::Critical => text.red().bold().to_string(),
        RiskLevel::Unknown => text.dimmed().to_string(),
    }
}

fn paint_range(result: &ScoreResult, use_colors: bool) -> String {
    let Some(range) = &result.range else {
        return if use_colors {
            "unclassified".dimmed().to_string()
        } else {
            "unclassified".to_string()
        };
    };

    let rgb = range.color.as_deref().and_then(parse_hex_color);
    match (use_colors, rgb) {
        (true, Some((r, g, b))) => range.label.truecolor(r, g, b).bold().to_string(),
        (true, None) => range.label.bold().to_string(),
        (false, _) => range.label.clone(),
    }
}

/// Format a result as labelled lines for a terminal
///
/// `max_score` is shown next to the raw score as "18 / 27".
pub fn format_result(result: &ScoreResult, max_score: f64, use_colors: bool) -> String {
    let score = format!("{} / {}", format_score(result.raw_score), format_score(max_score));
    let mut lines = vec![
        format!(
            "Score:      {}",
            if use_colors { score.bold().to_string() } else { score }
        ),
        format!("Range:      {}", paint_range(result, use_colors)),
    ];

    if let Some(interpretation) = result.range.as_ref().and_then(|r| r.interpretation.as_deref()) {
        lines.push(format!("            {}", interpretation));
    }

    let category = if result.category.is_empty() {
        "-"
    } else {
        result.category.as_str()
    };
    lines.push(format!(
        "Risk:       {} ({})",
        paint_risk(result.risk_level, use_colors),
        category
    ));

    if let (Some(z), Some(percentile)) = (result.z_score, result.percentile) {
        let note = if result.diagnostics.normalization_unavailable {
            " (reference sample too small; neutral)"
        } else {
            ""
        };
        lines.push(format!(
            "Percentile: {} (z = {}){}",
            format_score(percentile),
            format_score(z),
            note
        ));
    }

    if let Some(passed) = result.passed {
        let verdict = match (passed, use_colors) {
            (true, true) => "yes".green().to_string(),
            (false, true) => "no".red().to_string(),
            (true, false) => "yes".to_string(),
            (false, false) => "no".to_string(),
        };
        lines.push(format!("Passed:     {}", verdict));
    }

    lines.join("\n")
}

/// Format the detailed breakdown shown with `--verbose`
pub fn format_breakdown(result: &ScoreResult, use_colors: bool) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Answers: {} scored, {} excluded",
        result.diagnostics.scored_answers, result.diagnostics.excluded_answers
    ));

    if !result.category_scores.is_empty() {
        lines.push("Categories:".to_string());
        for (category, subtotal) in &result.category_scores {
            lines.push(format!("  {:<20} {:>8}", category, format_score(*subtotal)));
        }
    }

    if !result.adjustments.is_empty() {
        lines.push("Adjustments:".to_string());
        for adjustment in &result.adjustments {
            let change = format!(
                "{} -> {}",
                format_score(adjustment.before),
                format_score(adjustment.after)
            );
            if use_colors {
                lines.push(format!(
                    "  {}: {} ({})",
                    adjustment.label.bold(),
                    change,
                    adjustment.description.dimmed()
                ));
            } else {
                lines.push(format!(
                    "  {}: {} ({})",
                    adjustment.label, change, adjustment.description
                ));
            }
        }
    }

    lines.join("\n")
}

/// Format a result as one tab-separated line for scripting
/// Columns: raw_score, range_label, risk_level, z_score, percentile (no headers, no colors)
pub fn format_tsv(result: &ScoreResult) -> String {
    let optional = |value: Option<f64>| value.map(format_score).unwrap_or_default();
    format!(
        "{}\t{}\t{}\t{}\t{}",
        format_score(result.raw_score),
        result.range_label().unwrap_or(""),
        result.risk_level,
        optional(result.z_score),
        optional(result.percentile)
    )
}

/// Format a result as its flat score record in pretty-printed JSON,
/// the same shape `--save` writes
pub fn format_json(result: &ScoreResult) -> Result<String> {
    serde_json::to_string_pretty(&result.record()).context("Failed to serialize score record")
}

/// Format configuration warnings, one per line
pub fn format_warnings(warnings: &[ConfigWarning], use_colors: bool) -> String {
    warnings
        .iter()
        .map(|warning| {
            if use_colors {
                format!("{} {}", "warning:".yellow().bold(), warning)
            } else {
                format!("warning: {}", warning)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format every configuration error, one per line
pub fn format_errors(errors: &ConfigurationErrors, use_colors: bool) -> String {
    errors
        .iter()
        .map(|error| {
            if use_colors {
                format!("{} {}", "error:".red().bold(), error)
            } else {
                format!("error: {}", error)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{
        AppliedAdjustment, ConfigurationError, Diagnostics, ScoreRange,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn sample_result() -> ScoreResult {
        let mut range = ScoreRange::new(15.0, 19.0, "Moderately Severe");
        range.color = Some("#FF4500".to_string());
        range.interpretation = Some("Moderately severe depression".to_string());

        ScoreResult {
            raw_score: 18.0,
            normalized_score: 18.0,
            z_score: Some(1.25),
            percentile: Some(89.44),
            range: Some(range),
            risk_level: RiskLevel::Critical,
            passed: Some(true),
            category: "depression".to_string(),
            category_scores: BTreeMap::from([("general".to_string(), 18.0)]),
            adjustments: vec![AppliedAdjustment {
                label: "Self-harm item endorsed".to_string(),
                description: "conditions met -> +5".to_string(),
                before: 13.0,
                after: 18.0,
            }],
            diagnostics: Diagnostics {
                scored_answers: 9,
                excluded_answers: 1,
                normalization_unavailable: false,
            },
            computed_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    // format_score tests
    #[test]
    fn test_format_score_integer() {
        assert_eq!(format_score(18.0), "18");
        assert_eq!(format_score(0.0), "0");
    }

    #[test]
    fn test_format_score_decimals() {
        assert_eq!(format_score(4.5), "4.5");
        assert_eq!(format_score(1.333333), "1.33");
        assert_eq!(format_score(89.449), "89.45");
    }

    #[test]
    fn test_format_score_tiny_negative() {
        assert_eq!(format_score(-0.001), "0");
    }

    #[test]
    fn test_format_score_keeps_integer_zeros() {
        assert_eq!(format_score(100.0), "100");
        assert_eq!(format_score(20.5), "20.5");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF4500"), Some((255, 69, 0)));
        assert_eq!(parse_hex_color("00ff00"), Some((0, 255, 0)));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
    }

    #[test]
    fn test_format_result_plain() {
        let result = format_result(&sample_result(), 27.0, false);
        assert!(result.contains("Score:      18 / 27"));
        assert!(result.contains("Range:      Moderately Severe"));
        assert!(result.contains("Moderately severe depression"));
        assert!(result.contains("Risk:       critical (depression)"));
        assert!(result.contains("Percentile: 89.44 (z = 1.25)"));
        assert!(result.contains("Passed:     yes"));
    }

    #[test]
    fn test_format_result_unclassified_without_reference() {
        let mut result = sample_result();
        result.range = None;
        result.z_score = None;
        result.percentile = None;
        result.passed = None;
        let text = format_result(&result, 27.0, false);
        assert!(text.contains("Range:      unclassified"));
        assert!(!text.contains("Percentile"));
        assert!(!text.contains("Passed"));
    }

    #[test]
    fn test_format_result_colored_has_escape_codes() {
        let text = format_result(&sample_result(), 27.0, true);
        assert!(text.contains("\u{1b}["));
        assert!(text.contains("Moderately Severe"));
    }

    #[test]
    fn test_format_breakdown() {
        let text = format_breakdown(&sample_result(), false);
        assert!(text.contains("Answers: 9 scored, 1 excluded"));
        assert!(text.contains("general"));
        assert!(text.contains("Self-harm item endorsed: 13 -> 18 (conditions met -> +5)"));
    }

    #[test]
    fn test_format_tsv() {
        assert_eq!(
            format_tsv(&sample_result()),
            "18\tModerately Severe\tcritical\t1.25\t89.44"
        );
    }

    #[test]
    fn test_format_tsv_empty_optionals() {
        let mut result = sample_result();
        result.range = None;
        result.z_score = None;
        result.percentile = None;
        assert_eq!(format_tsv(&result), "18\t\tcritical\t\t");
    }

    #[test]
    fn test_format_json_is_flat_record() {
        let result = sample_result();
        let json = format_json(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["raw_score"], 18.0);
        assert_eq!(value["risk_level"], "critical");
        assert_eq!(value["range_label"], "Moderately Severe");
        assert_eq!(value["range_color"], "#FF4500");
        assert_eq!(value["range_interpretation"], "Moderately severe depression");
        assert!(value.get("range").is_none());

        let record: crate::scoring::ScoreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, result.record());
    }

    #[test]
    fn test_format_errors_and_warnings() {
        let errors = ConfigurationErrors::new(vec![
            ConfigurationError::MissingMethod,
            ConfigurationError::MissingMaxScore,
        ]);
        let text = format_errors(&errors, false);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("error: scoring.method"));

        let warnings = vec![ConfigWarning::RangeGap { after: 4.0, before: 10.0 }];
        assert_eq!(
            format_warnings(&warnings, false),
            "warning: scoring.ranges: no range covers scores between 4 and 10"
        );
    }
}

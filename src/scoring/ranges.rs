use serde::{Deserialize, Serialize};

use super::error::ConfigWarning;

/// Whether `next_min` picks up exactly where `covered_to` stops. Whole-number
/// bands such as `0-4` and `5-9` are contiguous; any other space between
/// bounds is a gap.
fn is_adjacent(covered_to: f64, next_min: f64) -> bool {
    next_min <= covered_to
        || (covered_to.fract() == 0.0 && next_min.fract() == 0.0 && next_min == covered_to + 1.0)
}

/// A labeled score band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub color: Option<String>,
    pub interpretation: Option<String>,
}

impl ScoreRange {
    pub fn new(min: f64, max: f64, label: impl Into<String>) -> Self {
        Self {
            min,
            max,
            label: label.into(),
            color: None,
            interpretation: None,
        }
    }

    /// Inclusive at both ends.
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

/// First range, in list order, whose bounds contain `score`.
/// `None` means unclassified.
pub fn classify(score: f64, ranges: &[ScoreRange]) -> Option<&ScoreRange> {
    ranges.iter().find(|range| range.contains(score))
}

/// Report overlaps, interior gaps and uncovered ends of `[0, max_score]`.
///
/// Assumes every range already has finite bounds with `min <= max`.
pub fn check_ranges(ranges: &[ScoreRange], max_score: f64) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    if ranges.is_empty() {
        return warnings;
    }

    // Overlaps are checked pairwise in list order so the warning names the
    // band that actually wins.
    for (i, first) in ranges.iter().enumerate() {
        for second in &ranges[i + 1..] {
            let from = first.min.max(second.min);
            let to = first.max.min(second.max);
            if from <= to {
                warnings.push(ConfigWarning::RangeOverlap {
                    first: first.label.clone(),
                    second: second.label.clone(),
                    from,
                    to,
                });
            }
        }
    }

    let mut sorted: Vec<&ScoreRange> = ranges.iter().collect();
    sorted.sort_by(|a, b| a.min.total_cmp(&b.min));

    let mut covered_to = sorted[0].max;
    for range in &sorted[1..] {
        if !is_adjacent(covered_to, range.min) {
            warnings.push(ConfigWarning::RangeGap {
                after: covered_to,
                before: range.min,
            });
        }
        covered_to = covered_to.max(range.max);
    }

    if sorted[0].min > 0.0 {
        warnings.push(ConfigWarning::RangeUncovered {
            from: 0.0,
            to: sorted[0].min,
        });
    }
    if covered_to < max_score {
        warnings.push(ConfigWarning::RangeUncovered {
            from: covered_to,
            to: max_score,
        });
    }

    warnings
}

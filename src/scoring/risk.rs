use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ConfigurationError;

/// Coarse, category-aware classification of a raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    /// No score could be produced (e.g. the configuration failed to load)
    Unknown,
}

impl RiskLevel {
    /// Levels that should trigger a notification.
    pub fn is_alerting(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One threshold step. A score below `below` maps to `level`; the last band
/// of a list leaves `below` unset to catch everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskBand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<f64>,
    pub level: RiskLevel,
}

impl RiskBand {
    pub fn below(limit: f64, level: RiskLevel) -> Self {
        Self {
            below: Some(limit),
            level,
        }
    }

    pub fn otherwise(level: RiskLevel) -> Self {
        Self { below: None, level }
    }
}

/// Categories sharing one set of thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryGroup {
    pub name: String,
    pub categories: Vec<String>,
    pub bands: Vec<RiskBand>,
}

/// Category → thresholds lookup. Adding a questionnaire category is a data
/// change here, not a code change in the mapper.
///
/// Example YAML override:
/// ```yaml
/// risk_table:
///   groups:
///     - name: sleep
///       categories: [insomnia, sleep_quality]
///       bands:
///         - { below: 8, level: low }
///         - { below: 15, level: medium }
///         - { level: high }
///   fallback:
///     - { below: 5, level: low }
///     - { below: 10, level: medium }
///     - { level: high }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskTable {
    #[serde(default)]
    pub groups: Vec<CategoryGroup>,
    /// Thresholds for any category not listed in a group
    pub fallback: Vec<RiskBand>,
}

impl Default for RiskTable {
    fn default() -> Self {
        use RiskLevel::*;

        let group = |name: &str, categories: &[&str], bands: Vec<RiskBand>| CategoryGroup {
            name: name.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            bands,
        };

        Self {
            groups: vec![
                group(
                    "behavioral_health",
                    &["anxiety", "depression", "stress", "mental_health"],
                    vec![
                        RiskBand::below(5.0, Low),
                        RiskBand::below(10.0, Medium),
                        RiskBand::below(15.0, High),
                        RiskBand::otherwise(Critical),
                    ],
                ),
                group(
                    "physical_health",
                    &["physical_health", "clinical_assessment"],
                    vec![
                        RiskBand::below(3.0, Low),
                        RiskBand::below(7.0, Medium),
                        RiskBand::below(12.0, High),
                        RiskBand::otherwise(Critical),
                    ],
                ),
            ],
            fallback: vec![
                RiskBand::below(5.0, Low),
                RiskBand::below(10.0, Medium),
                RiskBand::otherwise(High),
            ],
        }
    }
}

impl RiskTable {
    /// Group for `category`, matched case-insensitively. `None` means fallback.
    pub fn group_for(&self, category: &str) -> Option<&CategoryGroup> {
        let category = category.trim();
        self.groups.iter().find(|group| {
            group
                .categories
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(category))
        })
    }

    pub fn bands_for(&self, category: &str) -> &[RiskBand] {
        self.group_for(category)
            .map(|group| group.bands.as_slice())
            .unwrap_or(&self.fallback)
    }

    /// Map a raw score to a risk level for `category`.
    pub fn classify(&self, raw_score: f64, category: &str) -> RiskLevel {
        self.bands_for(category)
            .iter()
            .find(|band| band.below.map_or(true, |limit| raw_score < limit))
            .map(|band| band.level)
            .unwrap_or(RiskLevel::Unknown)
    }

    /// Check that every band list ascends and ends with a catch-all band.
    pub fn validate(&self) -> Vec<ConfigurationError> {
        let mut errors = Vec::new();
        for group in &self.groups {
            check_bands(&group.name, &group.bands, &mut errors);
        }
        check_bands("fallback", &self.fallback, &mut errors);
        errors
    }
}

fn check_bands(group: &str, bands: &[RiskBand], errors: &mut Vec<ConfigurationError>) {
    let mut error = |message: String| {
        errors.push(ConfigurationError::InvalidRiskTable {
            group: group.to_string(),
            message,
        })
    };

    match bands.last() {
        None => error("must define at least one band".to_string()),
        Some(last) if last.below.is_some() => {
            error("last band must omit 'below' so every score is classified".to_string())
        }
        Some(_) => {}
    }

    let limits: Vec<f64> = bands.iter().filter_map(|b| b.below).collect();
    if limits.iter().any(|l| !l.is_finite()) {
        error("'below' limits must be finite numbers".to_string());
    } else if limits.windows(2).any(|w| w[0] >= w[1]) {
        error("'below' limits must be strictly ascending".to_string());
    }
    if bands.iter().any(|b| b.level == RiskLevel::Unknown) {
        error("'unknown' is reserved for unscored results".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_behavioral_health_thresholds() {
        let table = RiskTable::default();
        assert_eq!(table.classify(4.9, "depression"), RiskLevel::Low);
        assert_eq!(table.classify(5.0, "anxiety"), RiskLevel::Medium);
        assert_eq!(table.classify(12.0, "depression"), RiskLevel::High);
        assert_eq!(table.classify(15.0, "stress"), RiskLevel::Critical);
        assert_eq!(table.classify(27.0, "mental_health"), RiskLevel::Critical);
    }

    #[test]
    fn test_physical_health_thresholds() {
        let table = RiskTable::default();
        assert_eq!(table.classify(2.0, "physical_health"), RiskLevel::Low);
        assert_eq!(table.classify(3.0, "clinical_assessment"), RiskLevel::Medium);
        assert_eq!(table.classify(7.0, "physical_health"), RiskLevel::High);
        assert_eq!(table.classify(12.0, "physical_health"), RiskLevel::Critical);
    }

    #[test]
    fn test_same_score_differs_by_group() {
        let table = RiskTable::default();
        assert_eq!(table.classify(12.0, "depression"), RiskLevel::High);
        assert_eq!(table.classify(12.0, "physical_health"), RiskLevel::Critical);
    }

    #[test]
    fn test_unlisted_category_has_no_critical_band() {
        let table = RiskTable::default();
        assert_eq!(table.classify(4.0, "customer_feedback"), RiskLevel::Low);
        assert_eq!(table.classify(9.0, "customer_feedback"), RiskLevel::Medium);
        assert_eq!(table.classify(100.0, "customer_feedback"), RiskLevel::High);
        assert_eq!(table.classify(100.0, ""), RiskLevel::High);
    }

    #[test]
    fn test_category_match_ignores_case_and_whitespace() {
        let table = RiskTable::default();
        assert_eq!(table.classify(16.0, " Depression "), RiskLevel::Critical);
        assert_eq!(table.group_for("ANXIETY").unwrap().name, "behavioral_health");
    }

    #[test]
    fn test_new_category_is_a_data_change() {
        let mut table = RiskTable::default();
        table.groups.push(CategoryGroup {
            name: "sleep".to_string(),
            categories: vec!["insomnia".to_string()],
            bands: vec![RiskBand::below(8.0, RiskLevel::Low), RiskBand::otherwise(RiskLevel::Medium)],
        });
        assert!(table.validate().is_empty());
        assert_eq!(table.classify(9.0, "insomnia"), RiskLevel::Medium);
    }

    #[test]
    fn test_default_table_is_valid() {
        assert!(RiskTable::default().validate().is_empty());
    }

    #[test]
    fn test_validate_rejects_malformed_bands() {
        let table = RiskTable {
            groups: vec![CategoryGroup {
                name: "broken".to_string(),
                categories: vec!["x".to_string()],
                bands: vec![RiskBand::below(10.0, RiskLevel::Low), RiskBand::below(5.0, RiskLevel::High)],
            }],
            fallback: vec![],
        };
        let errors = table.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].to_string().starts_with("risk_table.broken"));
        assert!(errors[2].to_string().starts_with("risk_table.fallback"));
    }

    #[test]
    fn test_alerting_levels() {
        assert!(RiskLevel::Critical.is_alerting());
        assert!(RiskLevel::High.is_alerting());
        assert!(!RiskLevel::Medium.is_alerting());
        assert!(!RiskLevel::Unknown.is_alerting());
    }

    #[test]
    fn test_risk_table_yaml_override() {
        let yaml = r#"
groups:
  - name: sleep
    categories: [insomnia]
    bands:
      - { below: 8, level: low }
      - { level: high }
fallback:
  - { level: medium }
"#;
        let table: RiskTable = serde_saphyr::from_str(yaml).unwrap();
        assert!(table.validate().is_empty());
        assert_eq!(table.classify(9.0, "insomnia"), RiskLevel::High);
        assert_eq!(table.classify(0.0, "depression"), RiskLevel::Medium);
    }
}

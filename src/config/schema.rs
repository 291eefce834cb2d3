use serde::{Deserialize, Serialize};

use crate::scoring::{
    validate_scoring, ConfigWarning, ConfigurationErrors, RiskTable, ScoringConfig, ScoringEngine,
};

/// Category used by `qscore score` when neither the config nor `--category` names one.
pub const DEFAULT_CATEGORY_TAG: &str = "general";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Questionnaire category tag, e.g. "depression"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Replaces the built-in category risk thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_table: Option<RiskTable>,
}

impl Config {
    /// Starter questionnaire written by `qscore init`.
    pub fn starter(category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            scoring: ScoringConfig::starter(),
            risk_table: None,
        }
    }

    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY_TAG)
    }

    /// Validate the scoring section and build an engine with this file's risk table.
    pub fn build_engine(&self) -> Result<(ScoringEngine, Vec<ConfigWarning>), ConfigurationErrors> {
        let validated = validate_scoring(&self.scoring)?;
        let mut builder = ScoringEngine::builder();
        if let Some(table) = &self.risk_table {
            builder = builder.risk_table(table.clone());
        }
        let engine = builder.build(validated.configuration)?;
        Ok((engine, validated.warnings))
    }
}

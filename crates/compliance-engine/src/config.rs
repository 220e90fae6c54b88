//! Engine configuration loaded from a single TOML file

use serde::{Deserialize, Serialize};
use std::path::Path;

use corpus_core::CorpusConfig;

use crate::checklist::{ChecklistRegistry, ChecklistSpec};
use crate::classifier::ClassifierConfig;
use crate::error::{ComplianceError, Result};
use crate::rules::{RedFlagRule, RuleDefinition};
use crate::scoring::ScoringPolicy;
use crate::taxonomy::TaxonomyEntry;

/// Everything an analysis run is tuned by.
///
/// Passed explicitly; two analyzers with different configurations can live
/// side by side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub taxonomy: Vec<TaxonomyEntry>,
    #[serde(default)]
    pub checklists: Vec<ChecklistSpec>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl EngineConfig {
    /// Load, apply environment overrides and validate
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ComplianceError::config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::from_toml(&content)?;
        config.corpus.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ComplianceError::config(format!("invalid engine configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.corpus
            .validate()
            .map_err(|e| ComplianceError::config(e.to_string()))?;
        self.classifier.validate()?;
        self.scoring.validate()?;
        for entry in &self.taxonomy {
            if entry.process.trim().is_empty() || entry.entity_type.trim().is_empty() {
                return Err(ComplianceError::config("taxonomy entries need a process and an entity_type"));
            }
        }
        self.checklist_registry()?;
        self.compile_rules()?;
        Ok(())
    }

    pub fn checklist_registry(&self) -> Result<ChecklistRegistry> {
        ChecklistRegistry::new(self.checklists.clone())
    }

    pub fn compile_rules(&self) -> Result<Vec<RedFlagRule>> {
        RedFlagRule::compile_all(&self.rules)
    }
}

//! Required-document checklists per (process, entity type)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ComplianceError, Result};

/// Required documents for one (process, entity type) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSpec {
    pub process: String,
    pub entity_type: String,
    /// Document-kind labels in declared order
    pub required_documents: Vec<String>,
    /// Recommended kinds; never counted as missing or extra, reported only
    /// when every required document is present
    #[serde(default)]
    pub optional_documents: Vec<String>,
}

impl ChecklistSpec {
    pub fn required_set(&self) -> BTreeSet<String> {
        self.required_documents.iter().cloned().collect()
    }

    pub fn optional_set(&self) -> BTreeSet<String> {
        self.optional_documents.iter().cloned().collect()
    }
}

/// Outcome of comparing uploaded kinds against a checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistResult {
    pub process: String,
    pub entity_type: String,
    pub required_count: usize,
    /// required − uploaded
    pub missing: BTreeSet<String>,
    /// uploaded − required
    pub extra: BTreeSet<String>,
    /// `missing` in the checklist's declared order
    pub missing_in_order: Vec<String>,
    /// Optional documents not uploaded, in declared order
    #[serde(default)]
    pub missing_optional: Vec<String>,
}

impl ChecklistResult {
    /// First missing required document in declared order, else the first
    /// missing optional one
    pub fn first_missing(&self) -> Option<&str> {
        self.missing_in_order
            .first()
            .or_else(|| self.missing_optional.first())
            .map(String::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Immutable lookup of checklists by (process, entity type)
#[derive(Debug, Clone, Default)]
pub struct ChecklistRegistry {
    specs: BTreeMap<(String, String), ChecklistSpec>,
}

impl ChecklistRegistry {
    /// Rejects duplicate pairs, checklists with no or repeated requirements and
    /// kinds listed as both required and optional
    pub fn new(specs: Vec<ChecklistSpec>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for spec in specs {
            if spec.required_documents.is_empty() {
                return Err(ComplianceError::config(format!(
                    "checklist '{}' / '{}' has no required documents",
                    spec.process, spec.entity_type
                )));
            }
            if spec.required_set().len() != spec.required_documents.len() {
                return Err(ComplianceError::config(format!(
                    "checklist '{}' / '{}' lists a document twice",
                    spec.process, spec.entity_type
                )));
            }
            let optional = spec.optional_set();
            if optional.len() != spec.optional_documents.len() || !optional.is_disjoint(&spec.required_set()) {
                return Err(ComplianceError::config(format!(
                    "checklist '{}' / '{}' repeats an optional document",
                    spec.process, spec.entity_type
                )));
            }
            let key = (spec.process.clone(), spec.entity_type.clone());
            if map.insert(key, spec).is_some() {
                return Err(ComplianceError::config("duplicate checklist for the same process and entity type"));
            }
        }
        Ok(Self { specs: map })
    }

    pub fn get(&self, process: &str, entity_type: &str) -> Result<&ChecklistSpec> {
        self.specs
            .get(&(process.to_string(), entity_type.to_string()))
            .ok_or_else(|| ComplianceError::UnknownChecklist {
                process: process.to_string(),
                entity_type: entity_type.to_string(),
            })
    }

    pub fn specs(&self) -> impl Iterator<Item = &ChecklistSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Pure set comparison against the checklist for the pair
    pub fn verify(
        &self,
        process: &str,
        entity_type: &str,
        uploaded_kinds: &BTreeSet<String>,
    ) -> Result<ChecklistResult> {
        let spec = self.get(process, entity_type)?;
        let required = spec.required_set();
        let optional = spec.optional_set();

        let missing: BTreeSet<String> = required.difference(uploaded_kinds).cloned().collect();
        let extra: BTreeSet<String> = uploaded_kinds
            .iter()
            .filter(|k| !required.contains(*k) && !optional.contains(*k))
            .cloned()
            .collect();
        let missing_in_order = spec
            .required_documents
            .iter()
            .filter(|d| missing.contains(*d))
            .cloned()
            .collect();
        let missing_optional = spec
            .optional_documents
            .iter()
            .filter(|d| !uploaded_kinds.contains(*d))
            .cloned()
            .collect();

        tracing::debug!(
            "Checklist {} / {}: {} required, {} missing, {} extra",
            process,
            entity_type,
            required.len(),
            missing.len(),
            extra.len()
        );

        Ok(ChecklistResult {
            process: process.to_string(),
            entity_type: entity_type.to_string(),
            required_count: required.len(),
            missing,
            extra,
            missing_in_order,
            missing_optional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const PROCESS: &str = "Company Incorporation";
    const ENTITY: &str = "Private Company Limited by Shares (Non-Financial)";

    fn incorporation() -> ChecklistSpec {
        ChecklistSpec {
            process: PROCESS.to_string(),
            entity_type: ENTITY.to_string(),
            required_documents: vec![
                "Articles of Association".to_string(),
                "Memorandum of Association".to_string(),
                "Incorporation Application Form".to_string(),
                "UBO Declaration Form".to_string(),
                "Register of Members and Directors".to_string(),
            ],
            optional_documents: vec!["Board Resolution".to_string()],
        }
    }

    fn kinds(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_four_of_five_uploaded() {
        let registry = ChecklistRegistry::new(vec![incorporation()]).unwrap();
        let uploaded = kinds(&[
            "Articles of Association",
            "Memorandum of Association",
            "Incorporation Application Form",
            "UBO Declaration Form",
        ]);

        let result = registry.verify(PROCESS, ENTITY, &uploaded).unwrap();
        assert_eq!(result.missing, kinds(&["Register of Members and Directors"]));
        assert_eq!(result.first_missing(), Some("Register of Members and Directors"));
        assert!(result.extra.is_empty());
        assert_eq!(result.required_count, 5);
    }

    #[test]
    fn test_missing_in_declared_order() {
        let registry = ChecklistRegistry::new(vec![incorporation()]).unwrap();
        let result = registry
            .verify(PROCESS, ENTITY, &kinds(&["Articles of Association", "Shareholder Resolution"]))
            .unwrap();
        assert_eq!(
            result.missing_in_order,
            vec![
                "Memorandum of Association",
                "Incorporation Application Form",
                "UBO Declaration Form",
                "Register of Members and Directors"
            ]
        );
        assert_eq!(result.extra, kinds(&["Shareholder Resolution"]));
        assert_eq!(result.missing_optional, vec!["Board Resolution"]);
        assert_eq!(result.first_missing(), Some("Memorandum of Association"));
    }

    #[test]
    fn test_optional_reported_once_required_complete() {
        let registry = ChecklistRegistry::new(vec![incorporation()]).unwrap();
        let spec = registry.get(PROCESS, ENTITY).unwrap();
        let uploaded = spec.required_set();

        let result = registry.verify(PROCESS, ENTITY, &uploaded).unwrap();
        assert!(result.is_complete());
        assert!(result.missing.is_empty());
        assert_eq!(result.first_missing(), Some("Board Resolution"));

        let mut with_optional = uploaded;
        with_optional.insert("Board Resolution".to_string());
        let result = registry.verify(PROCESS, ENTITY, &with_optional).unwrap();
        assert!(result.extra.is_empty());
        assert_eq!(result.first_missing(), None);
    }

    #[test]
    fn test_optional_overlapping_required_rejected() {
        let mut spec = incorporation();
        spec.optional_documents.push("Articles of Association".to_string());
        assert!(ChecklistRegistry::new(vec![spec]).is_err());
    }

    #[test]
    fn test_unknown_pair() {
        let registry = ChecklistRegistry::new(vec![incorporation()]).unwrap();
        let err = registry.verify("Employment", ENTITY, &BTreeSet::new()).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_duplicate_checklist_rejected() {
        assert!(ChecklistRegistry::new(vec![incorporation(), incorporation()]).is_err());
    }

    #[test]
    fn test_empty_requirements_rejected() {
        let mut spec = incorporation();
        spec.required_documents.clear();
        assert!(ChecklistRegistry::new(vec![spec]).is_err());
    }

    proptest! {
        #[test]
        fn prop_set_algebra(
            required in prop::collection::btree_set("[a-e]", 1..5),
            uploaded in prop::collection::btree_set("[a-h]", 0..8),
        ) {
            let spec = ChecklistSpec {
                process: "p".to_string(),
                entity_type: "e".to_string(),
                required_documents: required.iter().cloned().collect(),
                optional_documents: Vec::new(),
            };
            let registry = ChecklistRegistry::new(vec![spec]).unwrap();
            let result = registry.verify("p", "e", &uploaded).unwrap();

            let expected_missing: BTreeSet<String> = required.difference(&uploaded).cloned().collect();
            let expected_extra: BTreeSet<String> = uploaded.difference(&required).cloned().collect();
            prop_assert_eq!(&result.missing, &expected_missing);
            prop_assert_eq!(&result.extra, &expected_extra);
            if uploaded.is_superset(&required) {
                prop_assert!(result.is_complete());
            }
        }
    }
}

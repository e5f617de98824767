use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::GuideResult;

/// One navigable page of the ERP, as crawled into atlas.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasRecord {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub route: String,
}

#[derive(Debug, Clone, Default)]
pub struct Atlas {
    records: Vec<AtlasRecord>,
}

impl Atlas {
    pub fn new(records: Vec<AtlasRecord>) -> Self {
        Self { records }
    }

    pub fn from_file(path: &Path) -> GuideResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<AtlasRecord> = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), records = records.len(), "atlas loaded");
        Ok(Self { records })
    }

    /// Load the atlas, degrading to an empty one when the file is missing or malformed.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(atlas) => atlas,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "atlas unavailable, job analysis will use fallback");
                Self::default()
            }
        }
    }

    pub fn records(&self) -> &[AtlasRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose module or label contains `query`, case-insensitively.
    pub fn related(&self, query: &str) -> Vec<&AtlasRecord> {
        let needle = query.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.module.to_lowercase().contains(&needle) || r.label.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(module: &str, label: &str, route: &str) -> AtlasRecord {
        AtlasRecord {
            module: module.into(),
            label: label.into(),
            route: route.into(),
        }
    }

    #[test]
    fn related_matches_module_or_label() {
        let atlas = Atlas::new(vec![
            record("Buying", "Purchase Order", "/app/purchase-order"),
            record("Accounts", "Purchase Invoice", "/app/purchase-invoice"),
            record("Selling", "Sales Order", "/app/sales-order"),
        ]);
        let hits = atlas.related("Purchase");
        assert_eq!(hits.len(), 2);
        assert_eq!(atlas.related("selling")[0].label, "Sales Order");
        assert!(atlas.related("payroll").is_empty());
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = Atlas::load_or_empty(&dir.path().join("atlas.json"));
        assert!(atlas.is_empty());
    }

    #[test]
    fn loads_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.json");
        std::fs::write(
            &path,
            r#"[{"module":"Buying","label":"Supplier","route":"/app/supplier"},{"label":"Orphan"}]"#,
        )
        .unwrap();
        let atlas = Atlas::from_file(&path).unwrap();
        assert_eq!(atlas.len(), 2);
        assert_eq!(atlas.records()[1].module, "");
    }
}

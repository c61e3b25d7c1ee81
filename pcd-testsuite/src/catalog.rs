use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReportError;

/// Optional nested setting groups, in display order.
pub const SETTING_GROUPS: [&str; 9] = [
    "progressive_settings",
    "distance_weights",
    "altitude_filter",
    "backscatter_filter",
    "adaptive_settings",
    "prefetch_settings",
    "cache_settings",
    "render_settings",
    "hybrid_settings",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    pub latitude_range: Vec<Value>,
    pub longitude_range: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub target_file: String,
    pub spatial_filter: SpatialFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub test_id: String,
    pub name: String,
    pub use_case: String,
    pub expected_fps: String,
    pub max_depth: u32,
    pub point_budget: u64,
    pub lod_strategy: String,
    pub lod_threshold: Value,
    pub decimation: Value,
    #[serde(default)]
    pub recommended: bool,
    /// Setting groups and any other extra keys.
    #[serde(flatten)]
    pub settings: BTreeMap<String, Value>,
}

impl TestConfiguration {
    /// Present setting groups, in [`SETTING_GROUPS`] order.
    pub fn setting_groups(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        SETTING_GROUPS
            .iter()
            .filter_map(|key| self.settings.get(*key).map(|v| (*key, v)))
    }
}

/// The benchmark catalog. Loaded once and passed by reference to every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub metadata: CatalogMetadata,
    pub test_configurations: Vec<TestConfiguration>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let catalog = Self::from_json(&fs::read_to_string(path)?)?;
        log::debug!(
            "loaded {} test configurations from {:?}",
            catalog.test_configurations.len(),
            path
        );
        Ok(catalog)
    }

    pub fn find(&self, test_id: &str) -> Result<&TestConfiguration, ReportError> {
        self.test_configurations
            .iter()
            .find(|t| t.test_id == test_id)
            .ok_or_else(|| ReportError::TestNotFound(test_id.to_string()))
    }

    pub fn recommended(&self) -> impl Iterator<Item = &TestConfiguration> {
        self.test_configurations.iter().filter(|t| t.recommended)
    }
}

/// Renders a JSON value the way it reads in hand-written docs: strings unquoted.
pub fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `[-20, 20]`
pub fn list(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(Value::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> Catalog {
        Catalog::from_json(include_str!("../data/copc_test_configurations.json")).unwrap()
    }

    #[test]
    fn loads_sample_catalog() {
        let catalog = sample();
        assert_eq!(catalog.test_configurations.len(), 12);
        assert_eq!(
            catalog.metadata.target_file,
            "CAL_LID_L1-Standard-V4-51.2023-06-30T16-44-43ZD.copc.laz"
        );
        let ids: Vec<_> = catalog.recommended().map(|t| t.test_id.as_str()).collect();
        assert_eq!(ids, ["T049", "T050"]);
    }

    #[test]
    fn setting_groups_in_display_order() {
        let catalog = sample();
        let test = catalog.find("T044").unwrap();
        let keys: Vec<_> = test.setting_groups().map(|(k, _)| k).collect();
        assert_eq!(keys, ["prefetch_settings", "cache_settings", "hybrid_settings"]);
    }

    #[test]
    fn unknown_test_id() {
        assert!(matches!(
            sample().find("T999"),
            Err(ReportError::TestNotFound(id)) if id == "T999"
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, include_str!("../data/copc_test_configurations.json")).unwrap();
        assert_eq!(Catalog::load(&path).unwrap(), sample());
        assert!(matches!(
            Catalog::load(&dir.path().join("missing.json")),
            Err(ReportError::Io(_))
        ));
    }

    #[test]
    fn renders_values_plainly() {
        assert_eq!(plain(&Value::from("none")), "none");
        assert_eq!(plain(&Value::from(1.5)), "1.5");
        assert_eq!(list(&[Value::from(-20), Value::from(20)]), "[-20, 20]");
    }
}

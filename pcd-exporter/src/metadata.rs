use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pcd_core::pointcloud::bounds::BoundingVolume;

use crate::error::ExportError;

pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBoundingBox {
    #[serde(default)]
    pub min: Vec<f64>,
    #[serde(default)]
    pub max: Vec<f64>,
}

/// The parts of PotreeConverter's `metadata.json` that get verified.
/// Everything else in the document is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PotreeMetadata {
    /// Written as a string by PotreeConverter 2.x; kept as-is whatever its type.
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub points: u64,
    #[serde(rename = "boundingBox", default)]
    pub bounding_box: RawBoundingBox,
}

impl PotreeMetadata {
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `metadata.json` from a Potree output directory.
    pub fn read(output_dir: &Path) -> Result<Self, ExportError> {
        let json = fs::read_to_string(output_dir.join(METADATA_FILE))?;
        Self::from_json(&json)
    }

    /// Version text, whether written as a string or a number.
    pub fn version(&self) -> Option<String> {
        self.version.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn bounding_volume(&self) -> Option<BoundingVolume> {
        BoundingVolume::from_slices(&self.bounding_box.min, &self.bounding_box.max)
    }
}

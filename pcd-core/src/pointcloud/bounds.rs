use serde::{Deserialize, Serialize};

// Axis order follows the geographic outputs of the pipeline:
// [0] = longitude, [1] = latitude, [2] = altitude
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingVolume {
    /// Builds a volume from loosely typed min/max lists, as emitted by external tools.
    /// Returns `None` when either list holds fewer than three values.
    pub fn from_slices(min: &[f64], max: &[f64]) -> Option<Self> {
        if min.len() < 3 || max.len() < 3 {
            return None;
        }
        Some(Self {
            min: [min[0], min[1], min[2]],
            max: [max[0], max[1], max[2]],
        })
    }

    pub fn longitude(&self) -> (f64, f64) {
        (self.min[0], self.max[0])
    }

    pub fn latitude(&self) -> (f64, f64) {
        (self.min[1], self.max[1])
    }

    pub fn altitude(&self) -> (f64, f64) {
        (self.min[2], self.max[2])
    }
}

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Coordinate offset for a LAS/COPC writer. `Auto` lets PDAL pick the offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Offset {
    #[default]
    Auto,
    Value(f64),
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Auto => f.write_str("auto"),
            Offset::Value(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Offset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Offset::Auto => serializer.serialize_str("auto"),
            Offset::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for Offset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Offset::Value(v)),
            Repr::Text(s) if s.eq_ignore_ascii_case("auto") => Ok(Offset::Auto),
            Repr::Text(s) => s
                .parse::<f64>()
                .map(Offset::Value)
                .map_err(|_| de::Error::custom(format!("invalid offset: {s:?}"))),
        }
    }
}

/// Scale and offset written into LAS headers.
///
/// Stored coordinates are integers; the real value is `stored * scale + offset`.
/// A scale that is too coarse truncates point positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precision {
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
    #[serde(default)]
    pub offset_x: Offset,
    #[serde(default)]
    pub offset_y: Offset,
    #[serde(default)]
    pub offset_z: Offset,
}

impl Precision {
    /// Horizontal scale for decimal degrees (~1cm at the equator).
    pub const GEOGRAPHIC_SCALE_XY: f64 = 0.000_000_1;
    /// Horizontal scale used for COPC outputs.
    pub const COPC_SCALE_XY: f64 = 0.000_1;
    /// Vertical scale (1mm when heights are in meters).
    pub const SCALE_Z: f64 = 0.001;

    pub fn new(scale_xy: f64, scale_z: f64) -> Self {
        Self {
            scale_x: scale_xy,
            scale_y: scale_xy,
            scale_z,
            offset_x: Offset::Auto,
            offset_y: Offset::Auto,
            offset_z: Offset::Auto,
        }
    }

    /// Precision for writing reprojected geographic (degree) coordinates.
    pub fn geographic() -> Self {
        Self::new(Self::GEOGRAPHIC_SCALE_XY, Self::SCALE_Z)
    }

    pub fn copc() -> Self {
        Self::new(Self::COPC_SCALE_XY, Self::SCALE_Z)
    }

    pub fn scale(&self) -> [f64; 3] {
        [self.scale_x, self.scale_y, self.scale_z]
    }

    pub fn offset(&self) -> [Offset; 3] {
        [self.offset_x, self.offset_y, self.offset_z]
    }
}

use std::{fmt, path::Path};

use pcd_core::pointcloud::bounds::BoundingVolume;

use crate::metadata::{PotreeMetadata, METADATA_FILE};

/// Plausible ranges for a converted geographic point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsLimits {
    pub max_abs_longitude: f64,
    pub max_abs_latitude: f64,
    /// Upper limit for the maximum altitude, in the units of the source data.
    pub altitude_ceiling: f64,
}

impl BoundsLimits {
    /// Altitudes are expected in kilometers; spaceborne lidar profiles stay well under 100 km.
    pub const DEFAULT_ALTITUDE_CEILING: f64 = 100.0;

    pub fn with_altitude_ceiling(mut self, ceiling: f64) -> Self {
        self.altitude_ceiling = ceiling;
        self
    }
}

impl Default for BoundsLimits {
    fn default() -> Self {
        Self {
            max_abs_longitude: 180.0,
            max_abs_latitude: 90.0,
            altitude_ceiling: Self::DEFAULT_ALTITUDE_CEILING,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundsWarning {
    MetadataUnreadable(String),
    BoundsUnreadable,
    LongitudeOutOfRange { min: f64, max: f64 },
    LatitudeOutOfRange { min: f64, max: f64 },
    AltitudeAboveCeiling { max: f64, ceiling: f64 },
}

impl fmt::Display for BoundsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsWarning::MetadataUnreadable(reason) => {
                write!(f, "could not read {METADATA_FILE}: {reason}")
            }
            BoundsWarning::BoundsUnreadable => f.write_str("could not read bounds from metadata"),
            BoundsWarning::LongitudeOutOfRange { min, max } => {
                write!(f, "longitude {min} to {max} outside valid range [-180, 180]")
            }
            BoundsWarning::LatitudeOutOfRange { min, max } => {
                write!(f, "latitude {min} to {max} outside valid range [-90, 90]")
            }
            BoundsWarning::AltitudeAboveCeiling { max, ceiling } => {
                write!(f, "altitude {max} above sanity ceiling {ceiling}")
            }
        }
    }
}

/// Result of a bounds check. Warnings never invalidate the converted output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verification {
    pub points: u64,
    pub bounds: Option<BoundingVolume>,
    pub warnings: Vec<BoundsWarning>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn outside(range: (f64, f64), limit: f64) -> bool {
    range.0.abs() > limit || range.1.abs() > limit
}

pub fn verify(metadata: &PotreeMetadata, limits: &BoundsLimits) -> Verification {
    let mut verification = Verification {
        points: metadata.points,
        bounds: metadata.bounding_volume(),
        warnings: Vec::new(),
    };

    let Some(bounds) = verification.bounds else {
        verification.warnings.push(BoundsWarning::BoundsUnreadable);
        return verification;
    };

    let (min, max) = bounds.longitude();
    if outside((min, max), limits.max_abs_longitude) {
        verification
            .warnings
            .push(BoundsWarning::LongitudeOutOfRange { min, max });
    }
    let (min, max) = bounds.latitude();
    if outside((min, max), limits.max_abs_latitude) {
        verification
            .warnings
            .push(BoundsWarning::LatitudeOutOfRange { min, max });
    }
    let (_, max) = bounds.altitude();
    if max > limits.altitude_ceiling {
        verification.warnings.push(BoundsWarning::AltitudeAboveCeiling {
            max,
            ceiling: limits.altitude_ceiling,
        });
    }

    verification
}

/// Reads and verifies the metadata of a Potree output directory, logging the result.
pub fn verify_dir(output_dir: &Path, limits: &BoundsLimits) -> Verification {
    let verification = match PotreeMetadata::read(output_dir) {
        Ok(metadata) => {
            log::info!(
                "potree metadata: version {}, {} points",
                metadata.version().as_deref().unwrap_or("unknown"),
                metadata.points
            );
            verify(&metadata, limits)
        }
        Err(e) => Verification {
            warnings: vec![BoundsWarning::MetadataUnreadable(e.to_string())],
            ..Default::default()
        },
    };

    if let Some(bounds) = &verification.bounds {
        let (lon_min, lon_max) = bounds.longitude();
        let (lat_min, lat_max) = bounds.latitude();
        let (alt_min, alt_max) = bounds.altitude();
        log::info!("  longitude: {lon_min:.6}° to {lon_max:.6}°");
        log::info!("  latitude:  {lat_min:.6}° to {lat_max:.6}°");
        log::info!("  altitude:  {alt_min:.3} to {alt_max:.3}");
    }
    for warning in &verification.warnings {
        log::warn!("{}: {}", output_dir.display(), warning);
    }
    if verification.is_ok() {
        log::info!("bounds look reasonable");
    }

    verification
}

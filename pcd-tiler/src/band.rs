use std::fmt;

/// A latitude slice of the globe. The lower bound is inclusive; the upper
/// bound is exclusive unless `max_inclusive` is set (only for the band that
/// ends at the pole).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatitudeBand {
    pub name: &'static str,
    pub lat_min: f64,
    pub lat_max: f64,
    pub max_inclusive: bool,
}

// Splitting at fixed latitudes keeps each COPC cube from spanning the whole
// globe, which PDAL's cube calculation does not handle well.
pub const LATITUDE_BANDS: [LatitudeBand; 4] = [
    LatitudeBand {
        name: "south",
        lat_min: -90.0,
        lat_max: -30.0,
        max_inclusive: false,
    },
    LatitudeBand {
        name: "south_mid",
        lat_min: -30.0,
        lat_max: 0.0,
        max_inclusive: false,
    },
    LatitudeBand {
        name: "north_mid",
        lat_min: 0.0,
        lat_max: 30.0,
        max_inclusive: false,
    },
    LatitudeBand {
        name: "north",
        lat_min: 30.0,
        lat_max: 90.0,
        max_inclusive: true,
    },
];

impl LatitudeBand {
    pub fn contains(&self, lat: f64) -> bool {
        lat >= self.lat_min
            && (lat < self.lat_max || (self.max_inclusive && lat == self.lat_max))
    }

    /// `filters.range` limits for this band, e.g. `Y[-90:-30)`.
    pub fn range_limits(&self, dimension: &str) -> String {
        let close = if self.max_inclusive { ']' } else { ')' };
        format!("{dimension}[{}:{}{close}", self.lat_min, self.lat_max)
    }

    pub fn output_name(&self, stem: &str) -> String {
        format!("{stem}_tile_{}.copc.laz", self.name)
    }
}

impl fmt::Display for LatitudeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (lat: {}° to {}°)",
            self.name, self.lat_min, self.lat_max
        )
    }
}

pub fn band_for(lat: f64) -> Option<&'static LatitudeBand> {
    LATITUDE_BANDS.iter().find(|b| b.contains(lat))
}

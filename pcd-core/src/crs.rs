/// EPSG code type alias
pub type EpsgCode = u16;

/// WGS84 Geographic 2D (EPSG:4326)
pub const EPSG_WGS84_GEOGRAPHIC_2D: EpsgCode = 4326;

/// WGS84 / Pseudo-Mercator (EPSG:3857)
pub const EPSG_WEB_MERCATOR: EpsgCode = 3857;

/// PROJ definition handed to PotreeConverter for longitude/latitude output.
pub const WGS84_PROJ_STRING: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

pub fn epsg_srs(code: EpsgCode) -> String {
    format!("EPSG:{code}")
}

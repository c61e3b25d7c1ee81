use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::precision::Precision;

/// Dimensions summarised by the `filters.stats` stage of every conversion.
pub const STATS_DIMENSIONS: [&str; 4] = ["X", "Y", "Z", "Intensity"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Reader,
    Filter,
    Writer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterOptions {
    pub filename: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a_srs: Option<String>,
    #[serde(flatten)]
    pub precision: Precision,
}

impl WriterOptions {
    pub fn new(filename: impl Into<PathBuf>, precision: Precision) -> Self {
        Self {
            filename: filename.into(),
            forward: None,
            a_srs: None,
            precision,
        }
    }

    pub fn srs(mut self, srs: impl Into<String>) -> Self {
        self.a_srs = Some(srs.into());
        self
    }

    /// Carry header fields and VLRs of the input through to the output.
    pub fn forward_all(mut self) -> Self {
        self.forward = Some("all".to_string());
        self
    }
}

/// One entry of a PDAL pipeline. The serde tag is PDAL's stage type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stage {
    #[serde(rename = "readers.las")]
    LasReader { filename: PathBuf },

    #[serde(rename = "readers.copc")]
    CopcReader { filename: PathBuf },

    #[serde(rename = "filters.range")]
    Range { limits: String },

    #[serde(rename = "filters.stats")]
    Stats { dimensions: String },

    #[serde(rename = "filters.reprojection")]
    Reprojection { in_srs: String, out_srs: String },

    #[serde(rename = "writers.las")]
    LasWriter(WriterOptions),

    #[serde(rename = "writers.copc")]
    CopcWriter(WriterOptions),
}

impl Stage {
    pub fn las_reader(filename: impl Into<PathBuf>) -> Self {
        Stage::LasReader {
            filename: filename.into(),
        }
    }

    pub fn copc_reader(filename: impl Into<PathBuf>) -> Self {
        Stage::CopcReader {
            filename: filename.into(),
        }
    }

    pub fn range(limits: impl Into<String>) -> Self {
        Stage::Range {
            limits: limits.into(),
        }
    }

    pub fn stats(dimensions: &[&str]) -> Self {
        Stage::Stats {
            dimensions: dimensions.join(","),
        }
    }

    pub fn reprojection(in_srs: impl Into<String>, out_srs: impl Into<String>) -> Self {
        Stage::Reprojection {
            in_srs: in_srs.into(),
            out_srs: out_srs.into(),
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Stage::LasReader { .. } | Stage::CopcReader { .. } => StageKind::Reader,
            Stage::Range { .. } | Stage::Stats { .. } | Stage::Reprojection { .. } => {
                StageKind::Filter
            }
            Stage::LasWriter(_) | Stage::CopcWriter(_) => StageKind::Writer,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::LasReader { .. } => "readers.las",
            Stage::CopcReader { .. } => "readers.copc",
            Stage::Range { .. } => "filters.range",
            Stage::Stats { .. } => "filters.stats",
            Stage::Reprojection { .. } => "filters.reprojection",
            Stage::LasWriter(_) => "writers.las",
            Stage::CopcWriter(_) => "writers.copc",
        }
    }

    /// File the stage reads from or writes to. Filters have none.
    pub fn filename(&self) -> Option<&Path> {
        match self {
            Stage::LasReader { filename } | Stage::CopcReader { filename } => Some(filename),
            Stage::LasWriter(opts) | Stage::CopcWriter(opts) => Some(&opts.filename),
            _ => None,
        }
    }
}

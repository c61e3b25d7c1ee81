use std::path::Path;

use crate::{
    error::PipelineError,
    pipeline::Pipeline,
    precision::Precision,
    stage::{Stage, StageKind, WriterOptions, STATS_DIMENSIONS},
};

/// Assembles a [`Pipeline`] stage by stage.
///
/// `build` checks the shape PDAL needs to produce a file: a reader first and
/// a writer last.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let first = self
            .stages
            .first()
            .ok_or_else(|| PipelineError::InvalidPipeline("no stages".to_string()))?;
        if first.kind() != StageKind::Reader {
            return Err(PipelineError::InvalidPipeline(format!(
                "first stage must be a reader, got {}",
                first.type_name()
            )));
        }
        // a non-empty list has a last element
        if let Some(last) = self.stages.last() {
            if last.kind() != StageKind::Writer {
                return Err(PipelineError::InvalidPipeline(format!(
                    "last stage must be a writer, got {}",
                    last.type_name()
                )));
            }
        }
        Ok(Pipeline::new(self.stages))
    }
}

/// LAS to COPC, keeping all header data of the source.
pub fn las_to_copc(
    input: &Path,
    output: &Path,
    precision: &Precision,
    srs: &str,
) -> Result<Pipeline, PipelineError> {
    PipelineBuilder::new()
        .stage(Stage::las_reader(input))
        .stage(Stage::stats(&STATS_DIMENSIONS))
        .stage(Stage::CopcWriter(
            WriterOptions::new(output, *precision).forward_all().srs(srs),
        ))
        .build()
}

/// COPC to LAS with a reprojection in between.
///
/// Use [`Precision::geographic`] when `out_srs` is in degrees.
pub fn reproject_to_las(
    input: &Path,
    output: &Path,
    in_srs: &str,
    out_srs: &str,
    precision: &Precision,
) -> Result<Pipeline, PipelineError> {
    PipelineBuilder::new()
        .stage(Stage::copc_reader(input))
        .stage(Stage::reprojection(in_srs, out_srs))
        .stage(Stage::LasWriter(
            WriterOptions::new(output, *precision).srs(out_srs),
        ))
        .build()
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use pcd_core::crs::{epsg_srs, EPSG_WGS84_GEOGRAPHIC_2D};
use pcd_transformer::{
    stage::STATS_DIMENSIONS, Pipeline, PipelineBuilder, PipelineError, Precision, Runner, Stage,
    WriterOptions,
};

use crate::band::{LatitudeBand, LATITUDE_BANDS};

#[derive(Debug, Error)]
pub enum TilerError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug)]
pub struct TileOutcome {
    pub band: LatitudeBand,
    pub path: PathBuf,
    /// Output size in bytes on success.
    pub result: Result<u64, PipelineError>,
}

#[derive(Debug)]
pub struct TilingReport {
    pub input: PathBuf,
    pub outcomes: Vec<TileOutcome>,
}

impl TilingReport {
    pub fn successes(&self) -> impl Iterator<Item = &TileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Splits a global LAS file into one COPC file per [`LATITUDE_BANDS`] entry.
pub struct LatitudeTiler<R: Runner> {
    runner: R,
    precision: Precision,
    srs: String,
}

/// In EPSG:4326 LAS files Y holds the latitude.
const LATITUDE_DIMENSION: &str = "Y";

impl<R: Runner> LatitudeTiler<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            precision: Precision::copc(),
            srs: epsg_srs(EPSG_WGS84_GEOGRAPHIC_2D),
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = srs.into();
        self
    }

    pub fn band_pipeline(
        &self,
        las_path: &Path,
        output: &Path,
        band: &LatitudeBand,
    ) -> Result<Pipeline, PipelineError> {
        PipelineBuilder::new()
            .stage(Stage::las_reader(las_path))
            .stage(Stage::range(band.range_limits(LATITUDE_DIMENSION)))
            .stage(Stage::stats(&STATS_DIMENSIONS))
            .stage(Stage::CopcWriter(
                WriterOptions::new(output, self.precision)
                    .forward_all()
                    .srs(self.srs.as_str()),
            ))
            .build()
    }

    /// Runs every band; a failing band is logged and does not stop the others.
    pub fn split(&self, las_path: &Path, output_dir: &Path) -> Result<TilingReport, TilerError> {
        if !las_path.is_file() {
            return Err(TilerError::InputNotFound(las_path.to_path_buf()));
        }
        fs::create_dir_all(output_dir)?;

        let stem = las_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!(
            "converting {:?} to {} latitude tiles in {:?}",
            las_path,
            LATITUDE_BANDS.len(),
            output_dir
        );

        let mut outcomes = Vec::with_capacity(LATITUDE_BANDS.len());
        for band in &LATITUDE_BANDS {
            let path = output_dir.join(band.output_name(&stem));
            log::info!("processing tile: {band}");

            let result = self
                .band_pipeline(las_path, &path, band)
                .and_then(|pipeline| self.runner.run(&pipeline))
                .and_then(|_| Ok(fs::metadata(&path)?.len()));

            match &result {
                Ok(size) => log::info!(
                    "created {:?} ({:.1} MB)",
                    path,
                    *size as f64 / (1024.0 * 1024.0)
                ),
                Err(e) => log::error!("tile {} failed: {}", band.name, e),
            }

            outcomes.push(TileOutcome {
                band: *band,
                path,
                result,
            });
        }

        let report = TilingReport {
            input: las_path.to_path_buf(),
            outcomes,
        };
        log::info!(
            "tiling of {:?} complete: {} succeeded, {} failed",
            las_path,
            report.successes().count(),
            report.failures().count()
        );
        Ok(report)
    }

    /// Splits every `*.las` file of `las_dir`, in name order.
    pub fn split_dir(
        &self,
        las_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<TilingReport>, TilerError> {
        if !las_dir.is_dir() {
            return Err(TilerError::InputNotFound(las_dir.to_path_buf()));
        }

        let pattern = format!(
            "{}/*.las",
            glob::Pattern::escape(&las_dir.to_string_lossy())
        );
        let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
        files.sort();

        if files.is_empty() {
            log::warn!("no LAS files found in {:?}", las_dir);
            return Ok(Vec::new());
        }

        log::info!("found {} LAS files in {:?}", files.len(), las_dir);

        let mut reports = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            log::info!("[{}/{}] processing {:?}", i + 1, files.len(), file);
            reports.push(self.split(file, output_dir)?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use pcd_transformer::RunOutput;

    /// Writes a small file for every writer stage, except for bands listed in `fail`.
    #[derive(Default)]
    struct MockRunner {
        fail: Vec<&'static str>,
        runs: Mutex<Vec<Pipeline>>,
    }

    impl Runner for MockRunner {
        fn run(&self, pipeline: &Pipeline) -> Result<RunOutput, PipelineError> {
            self.runs.lock().unwrap().push(pipeline.clone());
            let output = pipeline.output_path().unwrap().to_path_buf();
            let name = output.to_string_lossy().into_owned();
            if self
                .fail
                .iter()
                .any(|band| name.ends_with(&format!("_tile_{band}.copc.laz")))
            {
                return Err(PipelineError::ProcessFailed {
                    program: PathBuf::from("pdal"),
                    status: Some(1),
                    stderr: "writers.copc: cube calculation failed".to_string(),
                });
            }
            fs::write(&output, b"copc-bytes").unwrap();
            Ok(RunOutput {
                stdout: String::new(),
                stderr: String::new(),
                output: Some(output),
            })
        }
    }

    #[test]
    fn missing_input_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tiler = LatitudeTiler::new(MockRunner::default());
        let err = tiler
            .split(&dir.path().join("missing.las"), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, TilerError::InputNotFound(_)));
        assert!(tiler.runner.runs.lock().unwrap().is_empty());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn creates_one_copc_per_band() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("orbit.las");
        fs::write(&input, b"las").unwrap();
        let out = dir.path().join("tiles");

        let tiler = LatitudeTiler::new(MockRunner::default());
        let report = tiler.split(&input, &out).unwrap();

        assert_eq!(report.successes().count(), 4);
        let names: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| o.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "orbit_tile_south.copc.laz",
                "orbit_tile_south_mid.copc.laz",
                "orbit_tile_north_mid.copc.laz",
                "orbit_tile_north.copc.laz",
            ]
        );
        for outcome in &report.outcomes {
            assert_eq!(*outcome.result.as_ref().unwrap(), 10);
        }
    }

    #[test]
    fn band_pipeline_shape() {
        let tiler = LatitudeTiler::new(MockRunner::default());
        let pipeline = tiler
            .band_pipeline(
                Path::new("orbit.las"),
                Path::new("orbit_tile_north.copc.laz"),
                &LATITUDE_BANDS[3],
            )
            .unwrap();
        let stages = pipeline.stages();
        assert_eq!(stages[0], Stage::las_reader("orbit.las"));
        assert_eq!(stages[1], Stage::range("Y[30:90]"));
        assert_eq!(stages[2], Stage::stats(&["X", "Y", "Z", "Intensity"]));
        match &stages[3] {
            Stage::CopcWriter(opts) => {
                assert_eq!(opts.a_srs.as_deref(), Some("EPSG:4326"));
                assert_eq!(opts.forward.as_deref(), Some("all"));
                assert_eq!(opts.precision, Precision::copc());
            }
            other => panic!("unexpected writer {other:?}"),
        }
    }

    #[test]
    fn writer_srs_is_configurable() {
        let tiler = LatitudeTiler::new(MockRunner::default()).with_srs("EPSG:4979");
        let pipeline = tiler
            .band_pipeline(
                Path::new("orbit.las"),
                Path::new("orbit_tile_south.copc.laz"),
                &LATITUDE_BANDS[0],
            )
            .unwrap();
        match pipeline.stages().last() {
            Some(Stage::CopcWriter(opts)) => assert_eq!(opts.a_srs.as_deref(), Some("EPSG:4979")),
            other => panic!("unexpected writer {other:?}"),
        }
    }

    #[test]
    fn failing_band_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("orbit.las");
        fs::write(&input, b"las").unwrap();

        let runner = MockRunner {
            fail: vec!["south_mid"],
            ..Default::default()
        };
        let tiler = LatitudeTiler::new(runner);
        let report = tiler.split(&input, dir.path()).unwrap();

        assert_eq!(report.successes().count(), 3);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.failures().next().unwrap().band.name, "south_mid");
        // bands after the failure still ran
        assert_eq!(tiler.runner.runs.lock().unwrap().len(), 4);
    }

    #[test]
    fn split_dir_processes_las_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        for name in ["b.las", "a.las", "notes.txt"] {
            fs::write(input.join(name), b"x").unwrap();
        }

        let tiler = LatitudeTiler::new(MockRunner::default());
        let reports = tiler.split_dir(&input, &dir.path().join("out")).unwrap();
        let inputs: Vec<_> = reports
            .iter()
            .map(|r| r.input.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(inputs, ["a.las", "b.las"]);
        assert_eq!(tiler.runner.runs.lock().unwrap().len(), 8);
    }

    #[test]
    fn split_dir_with_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tiler = LatitudeTiler::new(MockRunner::default());
        let err = tiler
            .split_dir(&dir.path().join("nope"), dir.path())
            .unwrap_err();
        assert!(matches!(err, TilerError::InputNotFound(_)));
    }
}

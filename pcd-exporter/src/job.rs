use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use pcd_core::crs::{epsg_srs, EPSG_WEB_MERCATOR, EPSG_WGS84_GEOGRAPHIC_2D};
use pcd_transformer::{
    builder::{las_to_copc, reproject_to_las},
    Precision, Runner,
};

use crate::{
    error::ExportError,
    potree::PotreeConverter,
    verify::{verify_dir, BoundsLimits, Verification},
};

#[derive(Debug, Clone)]
pub struct JobReport {
    pub output_dir: PathBuf,
    pub verification: Verification,
}

/// Produces a LAS file from satellite HDF data.
pub trait HdfToLas {
    fn convert(&self, hdf: &Path, las: &Path) -> Result<(), ExportError>;
}

/// Runs `<executable> <input.hdf> <output.las>`.
#[derive(Debug, Clone)]
pub struct ExternalHdfConverter {
    executable: PathBuf,
}

impl ExternalHdfConverter {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl HdfToLas for ExternalHdfConverter {
    fn convert(&self, hdf: &Path, las: &Path) -> Result<(), ExportError> {
        let output = Command::new(&self.executable)
            .arg(hdf)
            .arg(las)
            .output()
            .map_err(|source| ExportError::Spawn {
                program: self.executable.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ExportError::ProcessFailed {
                program: self.executable.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        if !las.is_file() {
            return Err(ExportError::MissingOutput {
                program: self.executable.clone(),
                output: las.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Files created during one job, removed when the guard drops unless kept.
struct Intermediates {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl Intermediates {
    fn new(keep: bool) -> Self {
        Self {
            paths: Vec::new(),
            keep,
        }
    }

    fn track(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }
}

impl Drop for Intermediates {
    fn drop(&mut self) {
        for path in &self.paths {
            if self.keep {
                log::info!("keeping intermediate file {:?}", path);
                continue;
            }
            if path.exists() {
                match fs::remove_file(path) {
                    Ok(()) => log::info!("removed intermediate file {:?}", path),
                    Err(e) => log::warn!("failed to remove {:?}: {}", path, e),
                }
            }
        }
    }
}

/// COPC (projected) → reprojected LAS in a scratch directory → Potree.
pub struct CopcToPotree<R: Runner> {
    runner: R,
    potree: PotreeConverter,
    in_srs: String,
    out_srs: String,
    precision: Precision,
    limits: BoundsLimits,
    scratch_root: Option<PathBuf>,
}

impl<R: Runner> CopcToPotree<R> {
    pub fn new(runner: R, potree: PotreeConverter) -> Self {
        Self {
            runner,
            potree,
            in_srs: epsg_srs(EPSG_WEB_MERCATOR),
            out_srs: epsg_srs(EPSG_WGS84_GEOGRAPHIC_2D),
            precision: Precision::geographic(),
            limits: BoundsLimits::default(),
            scratch_root: None,
        }
    }

    pub fn with_srs(mut self, in_srs: impl Into<String>, out_srs: impl Into<String>) -> Self {
        self.in_srs = in_srs.into();
        self.out_srs = out_srs.into();
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_limits(mut self, limits: BoundsLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Directory in which the per-job scratch directory is created (system temp dir by default).
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<JobReport, ExportError> {
        if !input.is_file() {
            return Err(ExportError::InputNotFound(input.to_path_buf()));
        }
        fs::create_dir_all(output_dir)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("copc-to-potree-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let las = scratch.path().join("reprojected.las");

        log::info!(
            "reprojecting {:?} from {} to {}",
            input,
            self.in_srs,
            self.out_srs
        );
        let pipeline = reproject_to_las(input, &las, &self.in_srs, &self.out_srs, &self.precision)?;
        self.runner.run(&pipeline)?;
        log::info!("reprojection complete: {:?}", las);

        self.potree.convert(&las, output_dir)?;
        let verification = verify_dir(output_dir, &self.limits);

        log::info!(
            "potree data created at {:?}; open {:?} to view",
            output_dir,
            output_dir.join("index.html")
        );

        Ok(JobReport {
            output_dir: output_dir.to_path_buf(),
            verification,
        })
    }
}

/// HDF → LAS → COPC → Potree, with the LAS and COPC written next to the output.
pub struct HdfToPotree<R: Runner, H: HdfToLas> {
    runner: R,
    hdf: H,
    potree: PotreeConverter,
    precision: Precision,
    srs: String,
    limits: BoundsLimits,
    keep_intermediate: bool,
}

impl<R: Runner, H: HdfToLas> HdfToPotree<R, H> {
    pub fn new(runner: R, hdf: H, potree: PotreeConverter) -> Self {
        Self {
            runner,
            hdf,
            potree,
            precision: Precision::copc(),
            srs: epsg_srs(EPSG_WGS84_GEOGRAPHIC_2D),
            limits: BoundsLimits::default(),
            keep_intermediate: false,
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_limits(mut self, limits: BoundsLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Converts `input` into `<output_dir>/<stem>/`. A `.las` input skips the HDF step.
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<JobReport, ExportError> {
        if !input.is_file() {
            return Err(ExportError::InputNotFound(input.to_path_buf()));
        }
        fs::create_dir_all(output_dir)?;

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let copc = output_dir.join(format!("{stem}.copc.laz"));
        let potree_dir = output_dir.join(&stem);

        log::info!("converting {:?}: HDF -> LAS -> COPC -> Potree", input);

        let mut intermediates = Intermediates::new(self.keep_intermediate);

        let is_las = input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("las"));
        let las = if is_las {
            log::info!("step 1/3: input is already LAS, skipping HDF conversion");
            input.to_path_buf()
        } else {
            let las = output_dir.join(format!("{stem}.las"));
            log::info!("step 1/3: converting HDF to LAS");
            intermediates.track(&las);
            self.hdf.convert(input, &las)?;
            log::info!("created LAS file {:?}", las);
            las
        };

        log::info!("step 2/3: converting LAS to COPC");
        intermediates.track(&copc);
        let pipeline = las_to_copc(&las, &copc, &self.precision, &self.srs)?;
        self.runner.run(&pipeline)?;
        let size = fs::metadata(&copc)?.len();
        log::info!(
            "created COPC file {:?} ({:.1} MB)",
            copc,
            size as f64 / (1024.0 * 1024.0)
        );

        log::info!("step 3/3: converting COPC to Potree");
        self.potree.convert(&copc, &potree_dir)?;
        let verification = verify_dir(&potree_dir, &self.limits);

        log::info!("conversion complete, potree output: {:?}", potree_dir);

        Ok(JobReport {
            output_dir: potree_dir,
            verification,
        })
    }
}

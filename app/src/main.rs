mod commands;

use std::{io::Write as _, path::PathBuf, process::ExitCode};

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::LevelFilter;
use thiserror::Error;

use pcd_batch::{BatchError, COPC_SUFFIX};
use pcd_core::ToolError;
use pcd_exporter::{BoundsLimits, ExportError};
use pcd_testsuite::ReportError;
use pcd_tiler::TilerError;
use pcd_transformer::Precision;

#[derive(Parser, Debug)]
#[command(
    name = "pcd-convert",
    about = "Convert satellite lidar point clouds through HDF, LAS, COPC and Potree",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// HDF (or LAS) -> LAS -> COPC -> Potree
    Hdf(HdfArgs),
    /// Reproject one COPC file and convert it to Potree
    Copc(CopcArgs),
    /// Convert every COPC file in a directory to Potree
    Batch(BatchArgs),
    /// Split a global LAS file into four latitude-band COPC files
    Tile(TileArgs),
    /// Render the visualization test catalog
    Testsuite(TestsuiteArgs),
}

#[derive(Args, Debug)]
struct ToolPaths {
    /// PotreeConverter executable
    #[arg(long, env = "POTREE_CONVERTER", value_name = "FILE")]
    potree_path: Option<PathBuf>,

    /// PDAL executable
    #[arg(long, env = "PDAL_PATH", value_name = "FILE")]
    pdal_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HdfArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,

    #[arg(short, long, default_value = "potree_data", value_name = "DIR")]
    output_dir: PathBuf,

    #[command(flatten)]
    tools: ToolPaths,

    /// HDF to LAS converter, invoked as `<exe> <input.hdf> <output.las>`
    #[arg(long, env = "HDF2LAS_PATH", default_value = "calipso_to_las")]
    hdf2las_path: PathBuf,

    /// Keep the intermediate LAS and COPC files
    #[arg(long)]
    keep_intermediate: bool,

    #[command(flatten)]
    limits: LimitsArgs,

    #[command(flatten)]
    precision: PrecisionArgs,
}

#[derive(Args, Debug)]
struct CopcArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,

    #[arg(value_name = "DIR")]
    output: PathBuf,

    #[command(flatten)]
    tools: ToolPaths,

    #[command(flatten)]
    reprojection: ReprojectionArgs,

    #[command(flatten)]
    limits: LimitsArgs,

    #[command(flatten)]
    precision: PrecisionArgs,
}

#[derive(Args, Debug)]
struct ReprojectionArgs {
    #[arg(long, default_value = "EPSG:3857")]
    in_srs: String,

    #[arg(long, default_value = "EPSG:4326")]
    out_srs: String,
}

#[derive(Args, Debug)]
struct LimitsArgs {
    /// Upper bound for the maximum altitude in the Potree metadata
    #[arg(long, default_value_t = BoundsLimits::DEFAULT_ALTITUDE_CEILING)]
    max_altitude: f64,
}

impl LimitsArgs {
    fn limits(&self) -> BoundsLimits {
        BoundsLimits::default().with_altitude_ceiling(self.max_altitude)
    }
}

/// Scale overrides; unset values come from the command's preset.
#[derive(Args, Debug)]
struct PrecisionArgs {
    /// X/Y scale factor of the written points
    #[arg(long)]
    scale_xy: Option<f64>,

    /// Z scale factor of the written points
    #[arg(long)]
    scale_z: Option<f64>,
}

impl PrecisionArgs {
    fn resolve(&self, preset: Precision) -> Precision {
        let [xy, _, z] = preset.scale();
        Precision::new(self.scale_xy.unwrap_or(xy), self.scale_z.unwrap_or(z))
    }
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[arg(value_name = "DIR")]
    input_dir: PathBuf,

    #[arg(value_name = "DIR")]
    output_dir: PathBuf,

    /// Parallel jobs; 0 uses one per CPU
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    #[arg(long, default_value = COPC_SUFFIX)]
    suffix: String,

    #[command(flatten)]
    tools: ToolPaths,

    #[command(flatten)]
    reprojection: ReprojectionArgs,

    #[command(flatten)]
    limits: LimitsArgs,

    #[command(flatten)]
    precision: PrecisionArgs,
}

#[derive(Args, Debug)]
struct TileArgs {
    /// LAS file, or a directory of LAS files with --all
    #[arg(value_name = "PATH")]
    input: PathBuf,

    #[arg(default_value = "public/potree_data/tiled", value_name = "DIR")]
    output: PathBuf,

    #[arg(long)]
    all: bool,

    #[arg(long, env = "PDAL_PATH", value_name = "FILE")]
    pdal_path: Option<PathBuf>,

    /// SRS assigned to the written tiles
    #[arg(long, default_value = "EPSG:4326")]
    srs: String,

    #[command(flatten)]
    precision: PrecisionArgs,
}

#[derive(Args, Debug)]
struct TestsuiteArgs {
    #[arg(long, default_value = "copc_test_configurations.json", value_name = "FILE")]
    config: PathBuf,

    /// Directory for the generated CSV, quick reference and exports
    #[arg(long, default_value = ".", value_name = "DIR")]
    out_dir: PathBuf,

    /// Show details for one test
    #[arg(long, value_name = "ID")]
    test: Option<String>,

    /// Export one test as a viewer configuration snippet
    #[arg(long, value_name = "ID")]
    export: Option<String>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Tiler(#[from] TilerError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let start = std::time::Instant::now();

    let result = match cli.command {
        Command::Hdf(args) => commands::hdf(args),
        Command::Copc(args) => commands::copc(args),
        Command::Batch(args) => commands::batch(args),
        Command::Tile(args) => commands::tile(args),
        Command::Testsuite(args) => commands::testsuite(args),
    };

    match result {
        Ok(()) => {
            log::info!("elapsed: {:?}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(AppError::Batch(BatchError::Declined)) => {
            println!("Aborted by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

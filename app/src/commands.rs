use std::io::{self, BufRead, Write};

use pcd_batch::{confirm, discover, BatchDriver, BatchError};
use pcd_core::crs::WGS84_PROJ_STRING;
use pcd_exporter::{
    CopcToPotree, ExportError, ExternalHdfConverter, HdfToPotree, JobReport, PotreeConverter,
};
use pcd_testsuite::{report, Catalog};
use pcd_tiler::{LatitudeTiler, TilerError, TilingReport};
use pcd_transformer::{InvocationMode, PdalRunner, Precision};

use crate::{
    AppError, BatchArgs, CopcArgs, HdfArgs, LimitsArgs, PrecisionArgs, ReprojectionArgs,
    TestsuiteArgs, TileArgs, ToolPaths,
};

fn copc_job(
    tools: &ToolPaths,
    reprojection: ReprojectionArgs,
    limits: &LimitsArgs,
    precision: &PrecisionArgs,
) -> Result<CopcToPotree<PdalRunner>, AppError> {
    let runner = PdalRunner::locate(tools.pdal_path.as_deref())?.with_mode(InvocationMode::TempFile);
    let potree = PotreeConverter::locate(tools.potree_path.as_deref())?
        .with_overwrite(true)
        .with_generated_page("index")
        .with_projection(WGS84_PROJ_STRING);

    Ok(CopcToPotree::new(runner, potree)
        .with_srs(reprojection.in_srs, reprojection.out_srs)
        .with_precision(precision.resolve(Precision::geographic()))
        .with_limits(limits.limits()))
}

fn log_report(report: &JobReport) {
    let verification = &report.verification;
    if verification.is_ok() {
        log::info!(
            "{:?}: {} points, bounds look valid",
            report.output_dir,
            verification.points
        );
    } else {
        log::warn!(
            "{:?}: finished with {} bounds warning(s)",
            report.output_dir,
            verification.warnings.len()
        );
    }
}

pub fn hdf(args: HdfArgs) -> Result<(), AppError> {
    // PotreeConverter is the last step; find it before spending time on the rest
    let potree = PotreeConverter::locate(args.tools.potree_path.as_deref())?;
    let runner = PdalRunner::locate(args.tools.pdal_path.as_deref())?.with_mode(InvocationMode::Stdin);
    let hdf = ExternalHdfConverter::new(args.hdf2las_path);

    let job = HdfToPotree::new(runner, hdf, potree)
        .with_precision(args.precision.resolve(Precision::copc()))
        .with_limits(args.limits.limits())
        .keep_intermediate(args.keep_intermediate);
    let report = job.run(&args.input, &args.output_dir)?;
    log_report(&report);

    println!("Potree data: {}", report.output_dir.display());
    Ok(())
}

pub fn copc(args: CopcArgs) -> Result<(), AppError> {
    if !args.input.is_file() {
        return Err(ExportError::InputNotFound(args.input).into());
    }
    let job = copc_job(&args.tools, args.reprojection, &args.limits, &args.precision)?;
    let report = job.run(&args.input, &args.output)?;
    log_report(&report);

    println!(
        "Open {} to view the point cloud",
        report.output_dir.join("index.html").display()
    );
    Ok(())
}

pub fn batch(args: BatchArgs) -> Result<(), AppError> {
    let stdin = io::stdin();
    run_batch(args, &mut stdin.lock(), &mut io::stdout().lock())
}

/// Discover, confirm, then convert; nothing is written before the answer.
fn run_batch<R: BufRead, W: Write>(
    args: BatchArgs,
    input: &mut R,
    output: &mut W,
) -> Result<(), AppError> {
    let files = discover(&args.input_dir, &args.suffix)?;

    if !args.yes && !confirm(input, output, &files)? {
        return Err(BatchError::Declined.into());
    }

    let job = copc_job(&args.tools, args.reprojection, &args.limits, &args.precision)?;
    let workers = match args.workers {
        0 => num_cpus::get(),
        n => n,
    };

    let summary = BatchDriver::new(workers).run(&files, &args.output_dir, |input, output| {
        job.run(input, output).map(|report| log_report(&report))
    })?;

    summary.write_report(output)?;
    output.flush()?;
    Ok(())
}

fn print_tiling(report: &TilingReport) {
    println!(
        "{}: {}/{} tiles",
        report.input.display(),
        report.successes().count(),
        report.outcomes.len()
    );
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(_) => println!("   - {}", outcome.path.display()),
            Err(e) => println!("   - {} failed: {e}", outcome.band.name),
        }
    }
}

pub fn tile(args: TileArgs) -> Result<(), AppError> {
    let input_exists = if args.all {
        args.input.is_dir()
    } else {
        args.input.is_file()
    };
    if !input_exists {
        return Err(TilerError::InputNotFound(args.input).into());
    }

    let runner = PdalRunner::locate(args.pdal_path.as_deref())?.with_mode(InvocationMode::Stdin);
    let tiler = LatitudeTiler::new(runner)
        .with_precision(args.precision.resolve(Precision::copc()))
        .with_srs(args.srs);

    if args.all {
        let reports = tiler.split_dir(&args.input, &args.output)?;
        reports.iter().for_each(print_tiling);
    } else {
        print_tiling(&tiler.split(&args.input, &args.output)?);
    }
    Ok(())
}

pub fn testsuite(args: TestsuiteArgs) -> Result<(), AppError> {
    let catalog = Catalog::load(&args.config)?;
    let mut stdout = io::stdout().lock();

    if let Some(id) = &args.test {
        report::write_test_details(&catalog, id, &mut stdout)?;
        return Ok(());
    }
    if let Some(id) = &args.export {
        let path = report::export_viewer_config_file(&catalog, id, &args.out_dir)?;
        writeln!(stdout, "Exported {}", path.display())?;
        return Ok(());
    }

    report::write_summary(&catalog, &mut stdout)?;
    let csv = report::write_results_csv_file(&catalog, &args.out_dir)?;
    let reference = report::write_quick_reference_file(&catalog, &args.out_dir)?;

    writeln!(stdout, "\nNEXT STEPS")?;
    writeln!(stdout, "1. Review {} for an overview", reference.display())?;
    writeln!(stdout, "2. Start with the recommended tests")?;
    writeln!(stdout, "3. Record results in {}", csv.display())?;
    writeln!(stdout, "\nTo see details for a specific test, run:")?;
    writeln!(stdout, "  pcd-convert testsuite --test <ID>")?;

    for test in catalog.recommended() {
        report::write_test_details(&catalog, &test.test_id, &mut stdout)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::*;

    fn missing_tools(dir: &Path) -> ToolPaths {
        ToolPaths {
            potree_path: Some(dir.join("no-PotreeConverter")),
            pdal_path: Some(dir.join("no-pdal")),
        }
    }

    fn limits() -> LimitsArgs {
        LimitsArgs { max_altitude: 100.0 }
    }

    fn precision() -> PrecisionArgs {
        PrecisionArgs {
            scale_xy: None,
            scale_z: None,
        }
    }

    fn reprojection() -> ReprojectionArgs {
        ReprojectionArgs {
            in_srs: "EPSG:3857".to_string(),
            out_srs: "EPSG:4326".to_string(),
        }
    }

    fn batch_args(dir: &Path, yes: bool) -> BatchArgs {
        BatchArgs {
            input_dir: dir.join("in"),
            output_dir: dir.join("out"),
            workers: 1,
            yes,
            suffix: pcd_batch::COPC_SUFFIX.to_string(),
            tools: missing_tools(dir),
            reprojection: reprojection(),
            limits: limits(),
            precision: precision(),
        }
    }

    fn tile_args(input: &Path, output: &Path, all: bool) -> TileArgs {
        TileArgs {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            all,
            pdal_path: Some(output.join("no-pdal")),
            srs: "EPSG:4326".to_string(),
            precision: precision(),
        }
    }

    #[test]
    fn copc_reports_missing_input_before_tools() {
        let dir = tempfile::tempdir().unwrap();
        let args = CopcArgs {
            input: dir.path().join("missing.copc.laz"),
            output: dir.path().join("out"),
            tools: missing_tools(dir.path()),
            reprojection: reprojection(),
            limits: limits(),
            precision: precision(),
        };
        let err = copc(args).unwrap_err();
        assert!(
            matches!(err, AppError::Export(ExportError::InputNotFound(_))),
            "{err}"
        );
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn copc_with_input_reports_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.copc.laz");
        fs::write(&input, b"copc").unwrap();
        let args = CopcArgs {
            input,
            output: dir.path().join("out"),
            tools: missing_tools(dir.path()),
            reprojection: reprojection(),
            limits: limits(),
            precision: precision(),
        };
        assert!(matches!(copc(args).unwrap_err(), AppError::Tool(_)));
    }

    #[test]
    fn tile_reports_missing_input_before_tools() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tiles");
        let err = tile(tile_args(&dir.path().join("orbit.las"), &out, false)).unwrap_err();
        assert!(
            matches!(err, AppError::Tiler(TilerError::InputNotFound(_))),
            "{err}"
        );
    }

    #[test]
    fn tile_all_needs_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("orbit.las");
        fs::write(&file, b"las").unwrap();
        let err = tile(tile_args(&file, &dir.path().join("tiles"), true)).unwrap_err();
        assert!(matches!(err, AppError::Tiler(TilerError::InputNotFound(_))));
    }

    #[test]
    fn batch_declined_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("in")).unwrap();
        fs::write(dir.path().join("in/a.copc.laz"), b"copc").unwrap();

        let mut prompt = Vec::new();
        let err = run_batch(batch_args(dir.path(), false), &mut "n\n".as_bytes(), &mut prompt)
            .unwrap_err();

        assert!(matches!(err, AppError::Batch(BatchError::Declined)));
        assert!(String::from_utf8(prompt)
            .unwrap()
            .contains("Convert 1 file(s)? [y/N]: "));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn batch_without_inputs_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("in")).unwrap();
        fs::write(dir.path().join("in/notes.txt"), b"x").unwrap();

        let mut prompt = Vec::new();
        let err = run_batch(batch_args(dir.path(), false), &mut "y\n".as_bytes(), &mut prompt)
            .unwrap_err();

        assert!(matches!(err, AppError::Batch(BatchError::NoInputs { .. })));
        assert!(prompt.is_empty());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn batch_confirmed_locates_tools_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("in")).unwrap();
        fs::write(dir.path().join("in/a.copc.laz"), b"copc").unwrap();

        let mut prompt = Vec::new();
        let err = run_batch(batch_args(dir.path(), true), &mut "".as_bytes(), &mut prompt)
            .unwrap_err();

        assert!(matches!(err, AppError::Tool(_)));
        assert!(prompt.is_empty());
        assert!(!dir.path().join("out").exists());
    }
}

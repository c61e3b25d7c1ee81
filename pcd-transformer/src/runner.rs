use std::{
    io::{ErrorKind, Write as _},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use pcd_core::{tool::home_relative, ToolError, ToolLocator};

use crate::{error::PipelineError, pipeline::Pipeline};

pub const PDAL: &str = "pdal";

pub const PDAL_GUIDANCE: &str = "\
PDAL is required but was not found. Install it with one of:
   conda install -c conda-forge pdal
   brew install pdal
   apt install pdal
or pass its location with --pdal-path (or the PDAL_PATH environment variable).";

/// Locator for the `pdal` executable, including the usual conda environments.
pub fn pdal_locator() -> ToolLocator {
    let mut locations = vec![
        PathBuf::from("/usr/local/bin/pdal"),
        PathBuf::from("/usr/bin/pdal"),
        PathBuf::from("/opt/homebrew/bin/pdal"),
        PathBuf::from("/opt/anaconda3/envs/pdal/bin/pdal"),
    ];
    locations.extend(home_relative("anaconda3/envs/pdal/bin/pdal"));
    locations.extend(home_relative("miniconda3/envs/pdal/bin/pdal"));

    ToolLocator::new(PDAL)
        .with_common_locations(locations)
        .with_guidance(PDAL_GUIDANCE)
}

/// Executes pipeline descriptors.
pub trait Runner {
    fn run(&self, pipeline: &Pipeline) -> Result<RunOutput, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// The artifact produced by the final writer, checked to exist and be non-empty.
    pub output: Option<PathBuf>,
}

/// How the descriptor reaches the `pdal` process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationMode {
    /// `pdal pipeline <file>` with the descriptor in a temporary file.
    #[default]
    TempFile,
    /// `pdal pipeline --stdin` with the descriptor written to the child's stdin.
    Stdin,
}

#[derive(Debug, Clone)]
pub struct PdalRunner {
    executable: PathBuf,
    mode: InvocationMode,
}

impl PdalRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            mode: InvocationMode::default(),
        }
    }

    pub fn locate(explicit: Option<&Path>) -> Result<Self, ToolError> {
        let executable = pdal_locator().locate(explicit)?;
        log::info!("found pdal: {:?}", executable);
        Ok(Self::new(executable))
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn spawn_error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::Spawn {
            program: self.executable.clone(),
            source,
        }
    }

    fn run_with_file(&self, pipeline: &Pipeline) -> Result<Output, PipelineError> {
        // removed when `descriptor` drops, on every return path
        let mut descriptor = tempfile::Builder::new()
            .prefix("pdal-pipeline-")
            .suffix(".json")
            .tempfile()?;
        descriptor.write_all(pipeline.to_json_pretty()?.as_bytes())?;
        descriptor.flush()?;

        log::debug!("pipeline descriptor: {:?}", descriptor.path());

        Command::new(&self.executable)
            .arg("pipeline")
            .arg(descriptor.path())
            .output()
            .map_err(|e| self.spawn_error(e))
    }

    fn run_with_stdin(&self, pipeline: &Pipeline) -> Result<Output, PipelineError> {
        let json = pipeline.to_json()?;

        let mut child = Command::new(&self.executable)
            .args(["pipeline", "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdin = child.stdin.take();

        // stdout and stderr are drained while the descriptor is still being written
        std::thread::scope(|scope| -> Result<Output, PipelineError> {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                let Some(mut stdin) = stdin else {
                    return Ok(());
                };
                // A child that exits early closes the pipe; its exit status tells the story.
                match stdin.write_all(json.as_bytes()) {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                    _ => Ok(()),
                }
            });

            let output = child.wait_with_output()?;
            writer
                .join()
                .map_err(|_| std::io::Error::other("descriptor writer panicked"))??;
            Ok(output)
        })
    }
}

impl Runner for PdalRunner {
    fn run(&self, pipeline: &Pipeline) -> Result<RunOutput, PipelineError> {
        log::debug!(
            "running {:?} ({:?}) with {} stages",
            self.executable,
            self.mode,
            pipeline.stages().len()
        );

        let output = match self.mode {
            InvocationMode::TempFile => self.run_with_file(pipeline)?,
            InvocationMode::Stdin => self.run_with_stdin(pipeline)?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(PipelineError::ProcessFailed {
                program: self.executable.clone(),
                status: output.status.code(),
                stderr,
            });
        }

        let artifact = pipeline.output_path().map(Path::to_path_buf);
        if let Some(path) = &artifact {
            let non_empty = path.metadata().map(|m| m.len() > 0).unwrap_or(false);
            if !non_empty {
                return Err(PipelineError::MissingOutput(path.clone()));
            }
        }

        Ok(RunOutput {
            stdout,
            stderr,
            output: artifact,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt as _};

    use super::*;
    use crate::{builder::las_to_copc, precision::Precision};

    fn fake_pdal(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("pdal");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn sample_pipeline(dir: &Path) -> Pipeline {
        las_to_copc(
            &dir.join("in.las"),
            &dir.join("out.copc.laz"),
            &Precision::copc(),
            "EPSG:4326",
        )
        .unwrap()
    }

    #[test]
    fn locate_missing_explicit_pdal() {
        let dir = tempfile::tempdir().unwrap();
        let err = PdalRunner::locate(Some(&dir.path().join("pdal"))).unwrap_err();
        assert!(err.to_string().contains("conda install -c conda-forge pdal"));
    }

    #[test]
    fn locate_explicit_pdal() {
        let dir = tempfile::tempdir().unwrap();
        let pdal = fake_pdal(dir.path(), "exit 0");
        let runner = PdalRunner::locate(Some(&pdal)).unwrap();
        assert_eq!(runner.executable(), pdal);
    }

    #[test]
    fn temp_file_mode_passes_descriptor_and_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("descriptor-path");
        let copy = dir.path().join("descriptor-copy.json");
        let out = dir.path().join("out.copc.laz");
        let pdal = fake_pdal(
            dir.path(),
            &format!(
                "echo \"$2\" > '{}'\ncp \"$2\" '{}'\nprintf 'copc' > '{}'",
                record.display(),
                copy.display(),
                out.display()
            ),
        );

        let pipeline = sample_pipeline(dir.path());
        let result = PdalRunner::new(&pdal).run(&pipeline).unwrap();
        assert_eq!(result.output.as_deref(), Some(out.as_path()));

        let descriptor = fs::read_to_string(&record).unwrap();
        assert!(!Path::new(descriptor.trim()).exists());

        let seen = Pipeline::from_json(&fs::read_to_string(&copy).unwrap()).unwrap();
        assert_eq!(seen, pipeline);
    }

    #[test]
    fn temp_file_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("descriptor-path");
        let pdal = fake_pdal(
            dir.path(),
            &format!("echo \"$2\" > '{}'\necho 'bad' >&2\nexit 1", record.display()),
        );

        let err = PdalRunner::new(&pdal)
            .run(&sample_pipeline(dir.path()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProcessFailed { .. }));

        let descriptor = fs::read_to_string(&record).unwrap();
        assert!(!Path::new(descriptor.trim()).exists());
    }

    #[test]
    fn stdin_mode_streams_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let received = dir.path().join("stdin.json");
        let out = dir.path().join("out.copc.laz");
        let pdal = fake_pdal(
            dir.path(),
            &format!(
                "[ \"$2\" = \"--stdin\" ] || exit 9\ncat > '{}'\nprintf 'copc' > '{}'",
                received.display(),
                out.display()
            ),
        );

        let pipeline = sample_pipeline(dir.path());
        PdalRunner::new(&pdal)
            .with_mode(InvocationMode::Stdin)
            .run(&pipeline)
            .unwrap();

        let seen = Pipeline::from_json(&fs::read_to_string(&received).unwrap()).unwrap();
        assert_eq!(seen, pipeline);
    }

    #[test]
    fn stdin_mode_drains_output_while_writing() {
        let dir = tempfile::tempdir().unwrap();
        let received = dir.path().join("stdin.json");
        let out = dir.path().join("out.copc.laz");
        // fills the stderr pipe before reading a descriptor larger than a pipe buffer
        let pdal = fake_pdal(
            dir.path(),
            &format!(
                "head -c 200000 /dev/zero >&2\ncat > '{}'\nprintf 'copc' > '{}'",
                received.display(),
                out.display()
            ),
        );

        let pipeline = las_to_copc(
            &dir.path().join("x".repeat(100_000)),
            &out,
            &Precision::copc(),
            "EPSG:4326",
        )
        .unwrap();
        let result = PdalRunner::new(&pdal)
            .with_mode(InvocationMode::Stdin)
            .run(&pipeline)
            .unwrap();

        assert_eq!(result.stderr.len(), 200_000);
        let seen = Pipeline::from_json(&fs::read_to_string(&received).unwrap()).unwrap();
        assert_eq!(seen, pipeline);
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let pdal = fake_pdal(
            dir.path(),
            "cat > /dev/null\necho 'PDAL: readers.las: Unable to open stream' >&2\nexit 3",
        );

        let err = PdalRunner::new(&pdal)
            .with_mode(InvocationMode::Stdin)
            .run(&sample_pipeline(dir.path()))
            .unwrap_err();
        match err {
            PipelineError::ProcessFailed { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert!(stderr.contains("Unable to open stream"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.copc.laz");
        let pdal = fake_pdal(dir.path(), &format!(": > '{}'", out.display()));

        let err = PdalRunner::new(&pdal)
            .run(&sample_pipeline(dir.path()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingOutput(p) if p == out));
    }

    #[test]
    fn missing_executable_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PdalRunner::new(dir.path().join("no-pdal-here"))
            .run(&sample_pipeline(dir.path()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }
}

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use pcd_core::{tool::home_relative, ToolLocator};

use crate::error::ExportError;

pub const POTREE_CONVERTER: &str = "PotreeConverter";

pub const INSTALL_GUIDANCE: &str = "\
PotreeConverter is required but was not found. To install it:

1. Build from source:
   git clone https://github.com/potree/PotreeConverter.git
   cd PotreeConverter && mkdir build && cd build
   cmake ../ && make

2. Put the executable on your PATH, or pass its location with
   --potree-path (or the POTREE_CONVERTER environment variable).

3. Verify the installation:
   PotreeConverter --help";

/// Locator for PotreeConverter: explicit path, then `PATH`, then common install locations.
pub fn potree_locator() -> ToolLocator {
    let mut locations = vec![
        PathBuf::from("/usr/local/bin/PotreeConverter"),
        PathBuf::from("/usr/bin/PotreeConverter"),
    ];
    locations.extend(home_relative("PotreeConverter/build/PotreeConverter"));
    locations.extend(home_relative("bin/PotreeConverter"));

    ToolLocator::new(POTREE_CONVERTER)
        .with_common_locations(locations)
        .with_guidance(INSTALL_GUIDANCE)
}

#[derive(Debug, Clone)]
pub struct PotreeOutput {
    pub output_dir: PathBuf,
    pub stdout: String,
}

/// Invocation settings for the PotreeConverter executable.
#[derive(Debug, Clone)]
pub struct PotreeConverter {
    executable: PathBuf,
    projection: Option<String>,
    generate_page: Option<String>,
    overwrite: bool,
}

impl PotreeConverter {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            projection: None,
            generate_page: None,
            overwrite: false,
        }
    }

    pub fn locate(explicit: Option<&Path>) -> Result<Self, ExportError> {
        let executable = potree_locator().locate(explicit)?;
        log::info!("found PotreeConverter: {:?}", executable);
        Ok(Self::new(executable))
    }

    /// PROJ string describing the input coordinates.
    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    /// Generate an HTML viewer page with the given name.
    pub fn with_generated_page(mut self, name: impl Into<String>) -> Self {
        self.generate_page = Some(name.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_owned(),
            "-o".into(),
            output_dir.as_os_str().to_owned(),
        ];
        if self.overwrite {
            args.push("--overwrite".into());
        }
        if let Some(page) = &self.generate_page {
            args.push("--generate-page".into());
            args.push(page.into());
        }
        if let Some(projection) = &self.projection {
            args.push("--projection".into());
            args.push(projection.into());
        }
        args
    }

    pub fn convert(&self, input: &Path, output_dir: &Path) -> Result<PotreeOutput, ExportError> {
        if !input.is_file() {
            return Err(ExportError::InputNotFound(input.to_path_buf()));
        }
        fs::create_dir_all(output_dir)?;

        let args = self.args(input, output_dir);
        log::info!(
            "running: {} {}",
            self.executable.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.executable)
            .args(&args)
            .output()
            .map_err(|source| ExportError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(ExportError::ProcessFailed {
                program: self.executable.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        log::info!("potree conversion complete: {:?}", output_dir);
        log::debug!("PotreeConverter output:\n{}", stdout);

        Ok(PotreeOutput {
            output_dir: output_dir.to_path_buf(),
            stdout,
        })
    }
}

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} not found (searched: {})\n{guidance}", display_paths(.searched))]
    NotFound {
        tool: String,
        searched: Vec<PathBuf>,
        guidance: String,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves an external executable.
///
/// Resolution order:
/// 1. an explicit path given by the caller (flag or environment variable),
/// 2. a lookup of `name` on the search path (`PATH` unless overridden),
/// 3. a fixed list of common install locations.
///
/// An explicit path that does not exist is not silently replaced by the
/// fallbacks; it resolves to [`ToolError::NotFound`].
#[derive(Debug, Clone)]
pub struct ToolLocator {
    name: String,
    common_locations: Vec<PathBuf>,
    guidance: String,
    search_path: Option<OsString>,
}

impl ToolLocator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            common_locations: Vec::new(),
            guidance: String::new(),
            search_path: None,
        }
    }

    pub fn with_common_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.common_locations = locations;
        self
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = guidance.into();
        self
    }

    /// Replaces the `PATH` value used for lookup.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locate(&self, explicit: Option<&Path>) -> Result<PathBuf, ToolError> {
        if let Some(path) = explicit {
            if is_executable(path) {
                log::debug!("using {} from explicit path {:?}", self.name, path);
                return Ok(path.to_path_buf());
            }
            log::warn!("{} not found at specified path: {:?}", self.name, path);
            return Err(self.not_found(vec![path.to_path_buf()]));
        }

        let mut searched = Vec::new();

        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"));
        if let Some(search_path) = search_path {
            for dir in env::split_paths(&search_path) {
                let candidate = dir.join(&self.name);
                if is_executable(&candidate) {
                    log::debug!("found {} on search path: {:?}", self.name, candidate);
                    return Ok(candidate);
                }
            }
        }

        for candidate in &self.common_locations {
            if is_executable(candidate) {
                log::debug!("found {} at {:?}", self.name, candidate);
                return Ok(candidate.clone());
            }
            searched.push(candidate.clone());
        }

        Err(self.not_found(searched))
    }

    fn not_found(&self, searched: Vec<PathBuf>) -> ToolError {
        ToolError::NotFound {
            tool: self.name.clone(),
            searched,
            guidance: self.guidance.clone(),
        }
    }
}

/// `$HOME` joined with `rel`, if a home directory is known.
pub fn home_relative(rel: &str) -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(rel))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

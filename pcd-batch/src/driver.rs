use std::{
    fmt::Display,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::error::BatchError;

/// Output directory name for one input: `a.copc.laz` -> `a`.
pub fn job_name(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.trim_end_matches(".copc").to_string()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub successes: Vec<String>,
    pub failures: Vec<(String, String)>,
    pub output_dir: PathBuf,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn write_report<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let rule = "=".repeat(60);
        writeln!(w, "\n{rule}")?;
        writeln!(w, "CONVERSION SUMMARY")?;
        writeln!(w, "{rule}")?;
        writeln!(w, "Successful: {}/{}", self.successes.len(), self.total())?;
        for name in &self.successes {
            writeln!(w, "   - {name}")?;
        }
        if !self.failures.is_empty() {
            writeln!(w, "\nFailed: {}/{}", self.failures.len(), self.total())?;
            for (name, reason) in &self.failures {
                writeln!(w, "   - {name}: {reason}")?;
            }
        }
        writeln!(w, "\nOutput directory: {}", self.output_dir.display())?;
        writeln!(w, "{rule}")
    }
}

/// Runs one single-file job per input.
///
/// With one worker, jobs run strictly one after another in input order.
/// With more, they run on a dedicated thread pool; jobs share nothing but
/// the output root, and each writes only into its own subdirectory.
#[derive(Debug, Clone, Copy)]
pub struct BatchDriver {
    workers: usize,
}

impl Default for BatchDriver {
    fn default() -> Self {
        Self::sequential()
    }
}

impl BatchDriver {
    pub fn sequential() -> Self {
        Self { workers: 1 }
    }

    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `job(input, output_dir)` is called with `output_dir = <output_root>/<job_name>`.
    /// A failing job is recorded and the batch moves on.
    pub fn run<F, T, E>(
        &self,
        files: &[PathBuf],
        output_root: &Path,
        job: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: Fn(&Path, &Path) -> Result<T, E> + Sync,
        E: Display,
    {
        fs::create_dir_all(output_root)?;
        log::info!("starting conversion (workers={})", self.workers);

        let process = |file: &PathBuf| -> (String, Result<(), String>) {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output_dir = output_root.join(job_name(file));
            log::info!("converting {} -> {:?}", name, output_dir);

            let result = job(file, &output_dir).map(|_| ()).map_err(|e| e.to_string());
            match &result {
                Ok(()) => log::info!("{name}: done"),
                Err(e) => log::error!("{name}: {e}"),
            }
            (name, result)
        };

        let outcomes: Vec<(String, Result<(), String>)> = if self.workers == 1 {
            files.iter().map(process).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()?;
            pool.install(|| files.par_iter().map(process).collect())
        };

        let mut summary = BatchSummary {
            output_dir: output_root.to_path_buf(),
            ..Default::default()
        };
        for (name, result) in outcomes {
            match result {
                Ok(()) => summary.successes.push(name),
                Err(reason) => summary.failures.push((name, reason)),
            }
        }
        Ok(summary)
    }
}

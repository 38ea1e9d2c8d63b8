//! Build pipeline orchestration.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::BuildConfig;
use crate::{assets, copy, html, images};

/// Errors that can occur during a build step.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read {path}: {source}")]
    ReadError { path: String, source: io::Error },

    #[error("Failed to write {path}: {source}")]
    WriteError { path: String, source: io::Error },

    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to process CSS: {path}: {message}")]
    CssError { path: String, message: String },

    #[error("Failed to optimize image: {path}: {message}")]
    ImageError { path: String, message: String },

    #[error("Build task failed: {0}")]
    TaskError(String),
}

impl BuildError {
    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        BuildError::ReadError {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        BuildError::WriteError {
            path: path.display().to_string(),
            source,
        }
    }
}

/// A pipeline step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PrepareOutput,
    Html,
    Css,
    StaticAssets,
    Images,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::PrepareOutput => "prepare-output",
            Step::Html => "html",
            Step::Css => "css",
            Step::StaticAssets => "static-assets",
            Step::Images => "images",
        };
        f.write_str(name)
    }
}

/// Outcome of a single step.
#[derive(Debug)]
pub struct StepReport {
    /// Which step ran
    pub step: Step,

    /// Files written to the output directory
    pub files_written: usize,

    /// Errors hit along the way
    pub errors: Vec<BuildError>,
}

impl StepReport {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            files_written: 0,
            errors: Vec::new(),
        }
    }

    pub(crate) fn wrote(&mut self, count: usize) {
        self.files_written += count;
    }

    pub(crate) fn fail(&mut self, error: BuildError) {
        self.errors.push(error);
    }

    /// Whether the step finished without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Per-step reports, in execution order
    pub steps: Vec<StepReport>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    /// Whether every step succeeded.
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(StepReport::is_ok)
    }

    /// Total number of files written.
    pub fn files_written(&self) -> usize {
        self.steps.iter().map(|s| s.files_written).sum()
    }

    /// All errors across steps.
    pub fn errors(&self) -> impl Iterator<Item = (Step, &BuildError)> {
        self.steps
            .iter()
            .flat_map(|s| s.errors.iter().map(move |e| (s.step, e)))
    }

    /// Report for a given step.
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }
}

/// Static site builder.
///
/// Runs every step in order. A failing step never stops the ones after it
/// and nothing already written is rolled back.
pub struct SiteBuilder {
    config: BuildConfig,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build configuration in use.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site.
    pub async fn build(&self) -> BuildResult {
        let start = Instant::now();

        tracing::info!("------------------------");
        tracing::info!("Start building...");

        let mut steps = Vec::new();
        record(&mut steps, self.prepare_output());
        record(&mut steps, html::build_html(&self.config));
        record(&mut steps, assets::build_css(&self.config));
        record(&mut steps, copy::copy_static_assets(&self.config));
        record(&mut steps, images::optimize_images(&self.config).await);

        let result = BuildResult {
            steps,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        };

        if result.is_success() {
            tracing::info!("🎉 Successfully build your project");
            tracing::info!("🔜 Ready to deploy");
        }

        result
    }

    /// Create the output directory if it does not exist yet.
    fn prepare_output(&self) -> StepReport {
        let mut report = StepReport::new(Step::PrepareOutput);
        let dir = &self.config.output_dir;

        if !dir.is_dir() {
            if let Err(e) = fs::create_dir_all(dir) {
                report.fail(BuildError::write(dir, e));
            } else {
                tracing::debug!("Created {}", dir.display());
            }
        }

        report
    }
}

fn record(steps: &mut Vec<StepReport>, report: StepReport) {
    for error in &report.errors {
        tracing::error!(step = %report.step, error = %error, "💥 Oops! Something went wrong");
    }
    steps.push(report);
}

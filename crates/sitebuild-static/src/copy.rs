//! Static asset copying.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::builder::{BuildError, Step, StepReport};
use crate::config::BuildConfig;

/// Write `contents` to `path`, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| BuildError::write(path, e))
}

/// Copy a file or directory tree from `from` to `to`, overwriting existing files.
///
/// Returns the number of files copied.
pub fn copy_path(from: &Path, to: &Path) -> Result<usize, BuildError> {
    if !from.exists() {
        return Err(BuildError::MissingSource(from.to_path_buf()));
    }

    if from.is_file() {
        copy_file(from, to)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            BuildError::read(&path, e.into())
        })?;

        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| BuildError::write(&dest, e))?;
        } else {
            copy_file(entry.path(), &dest)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), BuildError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| BuildError::write(to, e))?;
    tracing::debug!("Copied {} -> {}", from.display(), to.display());
    Ok(())
}

/// Copy static directories and favicon files into the output directory.
///
/// Each top-level copy fails on its own; the rest still run.
pub fn copy_static_assets(config: &BuildConfig) -> StepReport {
    let mut report = StepReport::new(Step::StaticAssets);

    let dirs = config.static_dirs.iter().map(|dir| dir.as_path());
    let favicons = config.favicons.iter().map(|f| Path::new(f.filename.as_str()));

    for relative in dirs.chain(favicons) {
        match copy_path(&config.source(relative), &config.target(relative)) {
            Ok(count) => report.wrote(count),
            Err(e) => report.fail(e),
        }
    }

    tracing::info!("Copied {} static files", report.files_written);
    report
}

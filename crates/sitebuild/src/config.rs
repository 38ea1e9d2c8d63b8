//! Configuration file loading (site.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use sitebuild_static::BuildConfig;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    site: SiteConfig,
    #[serde(default)]
    css: CssConfig,
    #[serde(default)]
    images: ImagesConfig,
}

#[derive(Debug, Deserialize, Default)]
struct SiteConfig {
    root: Option<PathBuf>,
    /// Output directory, relative to the root
    output: Option<PathBuf>,
    /// Deployment subdirectory name
    base: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CssConfig {
    /// Browserslist queries for vendor prefixing
    browsers: Option<Vec<String>>,
    #[serde(default = "default_minify")]
    minify: bool,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            browsers: None,
            minify: default_minify(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ImagesConfig {
    extensions: Option<Vec<String>>,
    jpeg_quality: Option<u8>,
}

fn default_minify() -> bool {
    true
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub base: Option<String>,
    pub no_minify: bool,
}

/// Locate the config file. A relative path is looked up inside `root` when one is given.
pub fn config_path(root: Option<&Path>, config: &Path) -> PathBuf {
    match root {
        Some(root) if config.is_relative() => root.join(config),
        _ => config.to_path_buf(),
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}

/// Layer the config file and command line over the built-in defaults.
pub fn resolve(file: ConfigFile, overrides: Overrides) -> Result<BuildConfig> {
    let root = overrides
        .root
        .or(file.site.root)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = BuildConfig::for_root(&root);

    if let Some(output) = overrides.output.or(file.site.output) {
        config.output_dir = root.join(output);
    }
    if let Some(base) = overrides.base.or(file.site.base) {
        config.base = base.trim_matches('/').to_string();
    }
    if let Some(browsers) = file.css.browsers {
        config.browsers = browsers;
    }
    config.minify = file.css.minify && !overrides.no_minify;

    if let Some(extensions) = file.images.extensions {
        config.image_extensions = extensions;
    }
    if let Some(quality) = file.images.jpeg_quality {
        if !(1..=100).contains(&quality) {
            anyhow::bail!("images.jpeg_quality must be between 1 and 100, got {}", quality);
        }
        config.jpeg_quality = Some(quality);
    }

    Ok(config)
}

//! Build configuration.

use std::path::PathBuf;

/// A favicon-related file copied from the project root to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favicon {
    /// File name relative to the project root
    pub filename: String,

    /// Absolute URL path referenced from the HTML, if any.
    /// Only favicons with a URL path are rewritten for subdirectory deployments.
    pub url_path: Option<String>,
}

impl Favicon {
    /// A favicon referenced from the HTML by `/<filename>`.
    pub fn linked(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            url_path: Some(format!("/{}", filename)),
        }
    }

    /// A favicon that is copied but never referenced from the HTML.
    pub fn unlinked(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            url_path: None,
        }
    }
}

/// Favicons shipped with every build. Linked entries come first, in rewrite order.
pub fn default_favicons() -> Vec<Favicon> {
    vec![
        Favicon::linked("apple-touch-icon.png"),
        Favicon::linked("favicon-32x32.png"),
        Favicon::linked("favicon-16x16.png"),
        Favicon::linked("site.webmanifest"),
        Favicon::linked("safari-pinned-tab.svg"),
        Favicon::unlinked("android-chrome-192x192.png"),
        Favicon::unlinked("android-chrome-512x512.png"),
        Favicon::unlinked("browserconfig.xml"),
        Favicon::unlinked("favicon.ico"),
        Favicon::unlinked("mstile-150x150.png"),
    ]
}

/// Configuration for building a site.
///
/// Source paths are relative to `root`. Output paths mirror the source
/// layout under `output_dir`.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root containing the sources
    pub root: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Deployment subdirectory name; empty disables favicon URL rewriting
    pub base: String,

    /// HTML entry document
    pub html_file: PathBuf,

    /// Stylesheet
    pub stylesheet: PathBuf,

    /// Directories copied verbatim (scripts, fonts)
    pub static_dirs: Vec<PathBuf>,

    /// Favicon files, in rewrite order
    pub favicons: Vec<Favicon>,

    /// Browserslist queries used for vendor prefixing
    pub browsers: Vec<String>,

    /// Minify the stylesheet after prefixing
    pub minify: bool,

    /// Image source directory (not searched recursively)
    pub images_dir: PathBuf,

    /// Image extensions picked up by the optimizer
    pub image_extensions: Vec<String>,

    /// Lossy JPEG quality (1-100); `None` keeps JPEG compression lossless
    pub jpeg_quality: Option<u8>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_dir: PathBuf::from("build"),
            base: "tomorrow-house".to_string(),
            html_file: PathBuf::from("index.html"),
            stylesheet: PathBuf::from("style.css"),
            static_dirs: vec![PathBuf::from("js"), PathBuf::from("assets/fonts")],
            favicons: default_favicons(),
            browsers: vec!["defaults".to_string()],
            minify: true,
            images_dir: PathBuf::from("assets/images"),
            image_extensions: vec!["jpg".to_string(), "png".to_string(), "svg".to_string()],
            jpeg_quality: None,
        }
    }
}

impl BuildConfig {
    /// Default configuration rooted at `root`, writing to `root/build`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            output_dir: root.join("build"),
            root,
            ..Default::default()
        }
    }

    /// Resolve a source path against the project root.
    pub fn source(&self, relative: impl AsRef<std::path::Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Resolve an output path against the output directory.
    pub fn target(&self, relative: impl AsRef<std::path::Path>) -> PathBuf {
        self.output_dir.join(relative)
    }
}

//! Stylesheet processing: vendor prefixing followed by minification.

use std::fs;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::builder::{BuildError, Step, StepReport};
use crate::config::BuildConfig;
use crate::copy::write_output;

/// CSS processor using lightningcss.
#[derive(Debug, Clone, Copy)]
pub struct CssProcessor {
    targets: Targets,
    minify: bool,
}

impl CssProcessor {
    /// Create a processor for explicit browser targets.
    pub fn new(targets: Targets, minify: bool) -> Self {
        Self { targets, minify }
    }

    /// Create a processor from browserslist queries such as `"defaults"`.
    pub fn from_browserslist(queries: &[String], minify: bool) -> Result<Self, String> {
        let browsers = Browsers::from_browserslist(queries.iter())
            .map_err(|e| format!("Invalid browser query: {}", e))?;

        let targets = browsers.map(Targets::from).unwrap_or_default();
        Ok(Self::new(targets, minify))
    }

    /// Add vendor prefixes for the configured targets, then minify.
    pub fn process(&self, css: &str, filename: &str) -> Result<String, String> {
        let mut stylesheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: filename.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| format!("CSS parse error: {}", e))?;

        stylesheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        let output = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify,
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| format!("CSS print error: {}", e))?;

        Ok(output.code)
    }
}

/// Read the stylesheet, transform it, and write the result to the output directory.
///
/// Nothing is written unless the transform succeeds.
pub fn build_css(config: &BuildConfig) -> StepReport {
    let mut report = StepReport::new(Step::Css);
    let source = config.source(&config.stylesheet);
    let source_name = source.display().to_string();

    let css = match fs::read_to_string(&source) {
        Ok(css) => css,
        Err(e) => {
            report.fail(BuildError::read(&source, e));
            return report;
        }
    };

    let processed = CssProcessor::from_browserslist(&config.browsers, config.minify)
        .and_then(|processor| processor.process(&css, &source_name));

    let processed = match processed {
        Ok(processed) => processed,
        Err(message) => {
            report.fail(BuildError::CssError {
                path: source_name,
                message,
            });
            return report;
        }
    };

    let target = config.target(&config.stylesheet);
    match write_output(&target, processed.as_bytes()) {
        Ok(()) => {
            tracing::info!(
                "Processed {} ({} -> {} bytes)",
                config.stylesheet.display(),
                css.len(),
                processed.len()
            );
            report.wrote(1);
        }
        Err(e) => report.fail(e),
    }

    report
}

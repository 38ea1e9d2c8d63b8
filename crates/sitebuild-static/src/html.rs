//! HTML entry document rewriting for subdirectory deployments.

use std::fs;

use crate::builder::{BuildError, Step, StepReport};
use crate::config::{BuildConfig, Favicon};
use crate::copy::write_output;

/// Insert `base` as a path segment right after the first `/` of `url`.
///
/// `/favicon.ico` with base `site` becomes `/site/favicon.ico`.
pub fn prefixed_url(url: &str, base: &str) -> String {
    url.replacen('/', &format!("/{}/", base), 1)
}

/// Rewrite favicon URLs in `html` for deployment under `base`.
///
/// Only the first literal occurrence of each URL is replaced, in favicon
/// order. An empty `base` leaves the document untouched. The document is
/// handled as raw bytes so non-UTF-8 content passes through unchanged.
pub fn rewrite_favicon_urls(html: &[u8], favicons: &[Favicon], base: &str) -> Vec<u8> {
    let mut html = html.to_vec();
    if base.is_empty() {
        return html;
    }

    for url in favicons.iter().filter_map(|f| f.url_path.as_deref()) {
        let rewritten = prefixed_url(url, base);
        if let Some(rewrote) = replace_first(&html, url.as_bytes(), rewritten.as_bytes()) {
            html = rewrote;
        }
    }
    html
}

fn replace_first(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Option<Vec<u8>> {
    if needle.is_empty() {
        return None;
    }
    let at = haystack.windows(needle.len()).position(|w| w == needle)?;

    let mut out = Vec::with_capacity(haystack.len() + replacement.len());
    out.extend_from_slice(&haystack[..at]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&haystack[at + needle.len()..]);
    Some(out)
}

/// Read the HTML entry document, rewrite it, and write it to the output directory.
pub fn build_html(config: &BuildConfig) -> StepReport {
    let mut report = StepReport::new(Step::Html);
    let source = config.source(&config.html_file);

    let html = match fs::read(&source) {
        Ok(html) => html,
        Err(e) => {
            report.fail(BuildError::read(&source, e));
            return report;
        }
    };

    let rewritten = rewrite_favicon_urls(&html, &config.favicons, &config.base);
    let target = config.target(&config.html_file);

    match write_output(&target, &rewritten) {
        Ok(()) => {
            tracing::debug!("Wrote {}", target.display());
            report.wrote(1);
        }
        Err(e) => report.fail(e),
    }

    report
}

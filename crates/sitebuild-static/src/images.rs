//! Image optimization.
//!
//! JPEG files are compressed; every other matched image is copied as-is.
//! Lossless JPEG compression drops metadata segments and keeps the
//! entropy-coded scan data untouched. With a quality set, a lossy
//! re-encode is also tried and the smaller result wins. Output is never
//! larger than input.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::builder::{BuildError, Step, StepReport};
use crate::config::BuildConfig;
use crate::copy::write_output;

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const COM: u8 = 0xFE;
const TEM: u8 = 0x01;

/// How a matched image is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Compressed
    Jpeg,
    /// Copied unchanged
    Passthrough,
}

impl ImageKind {
    /// Classify a file by extension.
    pub fn of(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("jpg") | Some("jpeg") => ImageKind::Jpeg,
            _ => ImageKind::Passthrough,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Find images directly inside `dir` whose extension is in `extensions`.
///
/// A missing directory yields no images.
pub fn discover_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.exists() {
        tracing::warn!("Image directory not found: {}", dir.display());
        return Ok(Vec::new());
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            BuildError::read(&path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let matches = extension(entry.path())
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);

        if matches {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

/// Rewrite a JPEG without comment and application metadata segments.
///
/// APP0 (JFIF) and APP14 (Adobe colour transform) are kept because decoders
/// depend on them. Everything from the first scan onwards is copied verbatim.
pub fn strip_jpeg_metadata(data: &[u8]) -> Result<Vec<u8>, String> {
    if data.len() < 4 || data[0] != MARKER || data[1] != SOI {
        return Err("not a JPEG file (missing SOI marker)".to_string());
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..2]);
    let mut pos = 2;

    loop {
        if data.get(pos) != Some(&MARKER) {
            return Err(format!("expected marker at offset {}", pos));
        }
        // Fill bytes
        while data.get(pos) == Some(&MARKER) {
            pos += 1;
        }
        let marker = *data
            .get(pos)
            .ok_or_else(|| "truncated JPEG marker".to_string())?;
        pos += 1;

        match marker {
            EOI => {
                out.extend_from_slice(&[MARKER, EOI]);
                return Ok(out);
            }
            TEM | 0xD0..=0xD7 => {
                out.extend_from_slice(&[MARKER, marker]);
                continue;
            }
            _ => {}
        }

        if pos + 2 > data.len() {
            return Err(format!("truncated segment length at offset {}", pos));
        }
        let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if len < 2 || pos + len > data.len() {
            return Err(format!("invalid segment length {} at offset {}", len, pos));
        }
        let segment = &data[pos..pos + len];
        pos += len;

        if marker == SOS {
            out.extend_from_slice(&[MARKER, SOS]);
            out.extend_from_slice(segment);
            out.extend_from_slice(&data[pos..]);
            return Ok(out);
        }

        if is_metadata(marker) {
            continue;
        }

        out.extend_from_slice(&[MARKER, marker]);
        out.extend_from_slice(segment);
    }
}

fn is_metadata(marker: u8) -> bool {
    matches!(marker, COM | 0xE1..=0xED | 0xEF)
}

/// Decode and re-encode a JPEG at `quality`.
pub fn reencode_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| format!("JPEG decode error: {}", e))?;

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    DynamicImage::ImageRgb8(decoded.into_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| format!("JPEG encode error: {}", e))?;

    Ok(out)
}

/// Compress a JPEG, returning the smallest candidate that is not larger than `data`.
pub fn optimize_jpeg(data: &[u8], quality: Option<u8>) -> Result<Vec<u8>, String> {
    let mut best = strip_jpeg_metadata(data)?;

    if let Some(quality) = quality {
        match reencode_jpeg(data, quality) {
            Ok(lossy) if lossy.len() < best.len() => best = lossy,
            Ok(_) => {}
            Err(e) => tracing::warn!("Keeping lossless JPEG, re-encode failed: {}", e),
        }
    }

    if best.len() >= data.len() {
        return Ok(data.to_vec());
    }
    Ok(best)
}

/// Optimize a single image from `source` into `target`.
///
/// Returns the input and output sizes in bytes.
pub fn optimize_file(
    source: &Path,
    target: &Path,
    jpeg_quality: Option<u8>,
) -> Result<(usize, usize), BuildError> {
    let data = fs::read(source).map_err(|e| BuildError::read(source, e))?;

    let output = match ImageKind::of(source) {
        ImageKind::Jpeg => {
            optimize_jpeg(&data, jpeg_quality).map_err(|message| BuildError::ImageError {
                path: source.display().to_string(),
                message,
            })?
        }
        ImageKind::Passthrough => data.clone(),
    };

    write_output(target, &output)?;
    Ok((data.len(), output.len()))
}

/// Optimize every matched image into the mirrored output directory.
///
/// Runs on the blocking pool; images are processed in parallel.
pub async fn optimize_images(config: &BuildConfig) -> StepReport {
    let source_dir = config.source(&config.images_dir);
    let target_dir = config.target(&config.images_dir);
    let extensions = config.image_extensions.clone();
    let quality = config.jpeg_quality;

    let task = tokio::task::spawn_blocking(move || {
        optimize_dir(&source_dir, &target_dir, &extensions, quality)
    });

    match task.await {
        Ok(report) => report,
        Err(e) => {
            let mut report = StepReport::new(Step::Images);
            report.fail(BuildError::TaskError(e.to_string()));
            report
        }
    }
}

fn optimize_dir(
    source_dir: &Path,
    target_dir: &Path,
    extensions: &[String],
    quality: Option<u8>,
) -> StepReport {
    let mut report = StepReport::new(Step::Images);

    let images = match discover_images(source_dir, extensions) {
        Ok(images) => images,
        Err(e) => {
            report.fail(e);
            return report;
        }
    };

    let results: Vec<Result<(usize, usize), BuildError>> = images
        .par_iter()
        .map(|source| {
            let relative = source.strip_prefix(source_dir).unwrap_or(source);
            optimize_file(source, &target_dir.join(relative), quality)
        })
        .collect();

    let mut before = 0;
    let mut after = 0;
    for result in results {
        match result {
            Ok((input, output)) => {
                before += input;
                after += output;
                report.wrote(1);
            }
            Err(e) => report.fail(e),
        }
    }

    tracing::info!(
        "Optimized {} images ({} -> {} bytes)",
        report.files_written,
        before,
        after
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn sample_jpeg() -> Vec<u8> {
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 95)
            .encode_image(&img)
            .unwrap();
        out
    }

    /// Insert a comment and an EXIF-style APP1 segment right after SOI.
    fn with_metadata(jpeg: &[u8]) -> Vec<u8> {
        let comment = b"generated by a camera that talks too much";
        let exif = [0u8; 512];

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[MARKER, COM]);
        out.extend_from_slice(&((comment.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(comment);
        out.extend_from_slice(&[MARKER, 0xE1]);
        out.extend_from_slice(&((exif.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&exif);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(ImageKind::of(Path::new("a.JPG")), ImageKind::Jpeg);
        assert_eq!(ImageKind::of(Path::new("a.jpeg")), ImageKind::Jpeg);
        assert_eq!(ImageKind::of(Path::new("a.png")), ImageKind::Passthrough);
        assert_eq!(ImageKind::of(Path::new("a.svg")), ImageKind::Passthrough);
    }

    #[test]
    fn strips_metadata_segments() {
        let jpeg = sample_jpeg();
        let bloated = with_metadata(&jpeg);

        let stripped = strip_jpeg_metadata(&bloated).unwrap();

        assert!(stripped.len() < bloated.len());
        assert!(stripped.len() <= jpeg.len());
        assert_eq!(&stripped[..2], &[MARKER, SOI]);
        assert!(image::load_from_memory_with_format(&stripped, ImageFormat::Jpeg).is_ok());
    }

    #[test]
    fn keeps_scan_data_intact() {
        let jpeg = sample_jpeg();
        let stripped = strip_jpeg_metadata(&with_metadata(&jpeg)).unwrap();

        let tail = |data: &[u8]| {
            let sos = data.windows(2).position(|w| w == [MARKER, SOS]).unwrap();
            data[sos..].to_vec()
        };
        assert_eq!(tail(&stripped), tail(&jpeg));
    }

    #[test]
    fn rejects_non_jpeg_data() {
        assert!(strip_jpeg_metadata(b"\x89PNG\r\n\x1a\n").is_err());
        assert!(strip_jpeg_metadata(&[MARKER, SOI, MARKER, 0xE1, 0xFF]).is_err());
    }

    #[test]
    fn never_inflates() {
        let jpeg = sample_jpeg();

        let lossless = optimize_jpeg(&jpeg, None).unwrap();
        let lossy = optimize_jpeg(&jpeg, Some(100)).unwrap();

        assert!(lossless.len() <= jpeg.len());
        assert!(lossy.len() <= jpeg.len());
    }

    #[test]
    fn lossy_quality_shrinks_large_images() {
        let jpeg = with_metadata(&sample_jpeg());

        let optimized = optimize_jpeg(&jpeg, Some(40)).unwrap();

        assert!(optimized.len() < jpeg.len());
        assert!(image::load_from_memory_with_format(&optimized, ImageFormat::Jpeg).is_ok());
    }

    #[test]
    fn undecodable_scan_falls_back_to_lossless() {
        let jpeg = sample_jpeg();
        let sos = jpeg.windows(2).position(|w| w == [MARKER, SOS]).unwrap();
        // Headers only, followed by garbage instead of scan data
        let mut broken = with_metadata(&jpeg[..sos + 2]);
        broken.extend_from_slice(&[0x00, 0x02]);
        broken.extend_from_slice(&[MARKER, EOI]);

        let optimized = optimize_jpeg(&broken, Some(60)).unwrap();

        assert_eq!(optimized, strip_jpeg_metadata(&broken).unwrap());
        assert!(optimized.len() < broken.len());
    }

    #[test]
    fn discovers_matching_files_only() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        fs::write(dir.join("b.png"), "png").unwrap();
        fs::write(dir.join("a.jpg"), "jpg").unwrap();
        fs::write(dir.join("c.gif"), "gif").unwrap();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/d.jpg"), "jpg").unwrap();

        let extensions = vec!["jpg".to_string(), "png".to_string(), "svg".to_string()];
        let found = discover_images(dir, &extensions).unwrap();

        assert_eq!(found, vec![dir.join("a.jpg"), dir.join("b.png")]);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let temp = tempdir().unwrap();
        let found = discover_images(&temp.path().join("images"), &["jpg".to_string()]).unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn optimizes_into_mirrored_directory() {
        let temp = tempdir().unwrap();
        let images = temp.path().join("assets/images");
        fs::create_dir_all(&images).unwrap();
        let jpeg = with_metadata(&sample_jpeg());
        fs::write(images.join("hero.jpg"), &jpeg).unwrap();
        fs::write(images.join("logo.svg"), "<svg/>").unwrap();

        let config = BuildConfig::for_root(temp.path());
        let report = optimize_images(&config).await;

        assert!(report.is_ok());
        assert_eq!(report.files_written, 2);
        let out = fs::read(temp.path().join("build/assets/images/hero.jpg")).unwrap();
        assert!(out.len() <= jpeg.len());
        assert_eq!(
            fs::read_to_string(temp.path().join("build/assets/images/logo.svg")).unwrap(),
            "<svg/>"
        );
    }

    #[tokio::test]
    async fn corrupt_jpeg_is_reported() {
        let temp = tempdir().unwrap();
        let images = temp.path().join("assets/images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("broken.jpg"), "not a jpeg").unwrap();
        fs::write(images.join("icon.png"), "png").unwrap();

        let report = optimize_images(&BuildConfig::for_root(temp.path())).await;

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], BuildError::ImageError { .. }));
        assert!(temp.path().join("build/assets/images/icon.png").exists());
    }
}

//! Image attachments: downscale, re-encode as JPEG and embed as a data URI.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub const DEFAULT_MAX_WIDTH: u32 = 800;
pub const DEFAULT_QUALITY: f32 = 0.7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("cannot encode image: {0}")]
    Encode(String),
    #[error("image processing timed out after {0:?}")]
    Timeout(Duration),
    #[error("image processing was cancelled")]
    Cancelled,
    #[error("image worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecOptions {
    /// Wider images are scaled down to this width.
    pub max_width: u32,
    /// JPEG quality on a 0..1 scale.
    pub quality: f32,
    pub timeout: Duration,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CodecOptions {
    /// Encoder quality on the 1..=100 scale.
    fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    /// Size of the encoded JPEG before base64.
    pub bytes: usize,
}

/// Target dimensions: width capped at `max_width`, aspect ratio preserved.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).floor() as u32;
    (max_width, scaled.max(1))
}

/// Decode `bytes`, downscale if too wide and re-encode as a JPEG data URI.
pub fn compress(bytes: &[u8], options: &CodecOptions) -> Result<EncodedImage, ImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;

    let (width, height) = scaled_dimensions(img.width(), img.height(), options.max_width);
    let img = if (width, height) != (img.width(), img.height()) {
        img.resize_exact(width, height, FilterType::Triangle)
    } else {
        img
    };

    let jpeg = encode_jpeg(&img, options.jpeg_quality())?;
    let bytes = jpeg.len();

    Ok(EncodedImage {
        data_uri: format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)),
        width,
        height,
        bytes,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Split a data URI into its mime type and decoded payload.
pub fn parse_data_uri(uri: &str) -> Option<(&str, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime, bytes))
}

/// Background compression of one image.
///
/// The job runs on the blocking pool under a timeout. A cancelled job resolves
/// to `ImageError::Cancelled` and its output is discarded.
#[derive(Debug)]
pub struct ImageJob {
    handle: JoinHandle<Result<EncodedImage, ImageError>>,
}

impl ImageJob {
    pub fn spawn(runtime: &Handle, bytes: Vec<u8>, options: CodecOptions) -> Self {
        let handle = runtime.spawn(async move {
            let work = tokio::task::spawn_blocking(move || compress(&bytes, &options));
            match tokio::time::timeout(options.timeout, work).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(ImageError::Worker(e.to_string())),
                Err(_) => Err(ImageError::Timeout(options.timeout)),
            }
        });
        Self { handle }
    }

    /// Read the file at `path` and start compressing it.
    pub fn from_file(runtime: &Handle, path: &Path, options: CodecOptions) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path)?;
        tracing::debug!("compressing {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::spawn(runtime, bytes, options))
    }

    /// Non-blocking check. Returns the result once; the job is spent afterwards.
    pub fn poll(&mut self) -> Option<Result<EncodedImage, ImageError>> {
        (&mut self.handle).now_or_never().map(join_result)
    }

    pub async fn wait(self) -> Result<EncodedImage, ImageError> {
        join_result(self.handle.await)
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.handle.abort_handle()
    }
}

fn join_result(
    joined: Result<Result<EncodedImage, ImageError>, tokio::task::JoinError>,
) -> Result<EncodedImage, ImageError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(ImageError::Cancelled),
        Err(e) => Err(ImageError::Worker(e.to_string())),
    }
}

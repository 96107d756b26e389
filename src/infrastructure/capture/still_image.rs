//! Frame-source camera adapter
//!
//! Treats an image file, or a directory of frames, as the camera feed. With
//! a directory the newest image is the current frame, so any tool that keeps
//! writing frames into it behaves like a live stream.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::debug;

use crate::application::ports::{
    CaptureDevice, CaptureError, DeviceFailure, DeviceOutcome, FailureBroadcaster,
    FailureListener,
};
use crate::domain::capture::{CapturedImage, Facing, ImageMimeType, JpegQuality, Surface};

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Camera backed by image files on disk
pub struct StillImageDevice {
    source: PathBuf,
    facing: Facing,
    streaming: AtomicBool,
    /// Number of acquisitions started; only the latest may change the stream state
    attempts: AtomicU64,
    /// Surface bound by the last successful acquisition
    surface: StdMutex<Option<Surface>>,
    diagnostic: StdMutex<Option<String>>,
    listeners: FailureBroadcaster,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StillImageDevice {
    pub fn new(source: impl Into<PathBuf>, facing: Facing) -> Self {
        Self {
            source: source.into(),
            facing,
            streaming: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            surface: StdMutex::new(None),
            diagnostic: StdMutex::new(None),
            listeners: FailureBroadcaster::new(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Resolve the frame to use right now.
    ///
    /// A directory may hold `environment/` and `user/` subdirectories; the one
    /// matching the facing preference wins, otherwise the directory itself is used.
    fn current_frame(&self) -> Result<PathBuf, String> {
        if self.source.is_file() {
            return Ok(self.source.clone());
        }
        if !self.source.is_dir() {
            return Err(format!("{} does not exist", self.source.display()));
        }

        let preferred = self.source.join(self.facing.as_str());
        let dir = if preferred.is_dir() {
            preferred
        } else {
            self.source.clone()
        };

        newest_frame(&dir)?.ok_or_else(|| format!("no frames in {}", dir.display()))
    }

    fn is_latest(&self, attempt: u64) -> bool {
        self.attempts.load(Ordering::SeqCst) == attempt
    }

    fn fail(&self, attempt: u64, reason: String) -> DeviceOutcome {
        if self.is_latest(attempt) {
            self.streaming.store(false, Ordering::SeqCst);
            *lock(&self.diagnostic) = Some(format!("Error accessing camera: {}", reason));
        } else {
            debug!(attempt, %reason, "superseded acquisition failed");
        }
        self.listeners.notify(&DeviceFailure {
            message: reason.clone(),
        });
        DeviceOutcome::Unavailable(reason)
    }
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Most recently modified image in `dir`
fn newest_frame(dir: &Path) -> Result<Option<PathBuf>, String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("cannot read {}: {}", dir.display(), e))?;

    Ok(entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_frame(path))
        .filter_map(|path| {
            let modified = path.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path))
}

fn decode_dimensions(path: &Path) -> Result<(u32, u32), String> {
    let frame = image::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok((frame.width(), frame.height()))
}

/// Decode a frame, scale it to the surface and compress it as JPEG
fn encode_frame(
    path: &Path,
    surface: &Surface,
    quality: JpegQuality,
) -> Result<CapturedImage, CaptureError> {
    let frame = image::open(path)
        .map_err(|e| CaptureError::Unavailable(format!("{}: {}", path.display(), e)))?;
    let frame = frame
        .resize_exact(surface.width(), surface.height(), FilterType::Triangle)
        .to_rgb8();

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, quality.as_percent())
        .encode_image(&frame)
        .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?;

    Ok(CapturedImage::new(data, ImageMimeType::Jpeg))
}

#[async_trait]
impl CaptureDevice for StillImageDevice {
    async fn acquire(&self, surface: &Surface) -> DeviceOutcome {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = match self.current_frame() {
            Ok(frame) => frame,
            Err(reason) => return self.fail(attempt, reason),
        };

        // Ready only once the first frame actually decodes
        let path = frame.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_dimensions(&path))
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| result);
        let (width, height) = match decoded {
            Ok(dimensions) => dimensions,
            Err(reason) => return self.fail(attempt, reason),
        };
        if !self.is_latest(attempt) {
            debug!(attempt, "superseded acquisition finished, stream left to the newer one");
            return DeviceOutcome::Ready;
        }

        *lock(&self.surface) = Some(surface.clone());
        *lock(&self.diagnostic) = None;
        self.streaming.store(true, Ordering::SeqCst);
        debug!(
            frame = %frame.display(),
            facing = %self.facing,
            frame_width = width,
            frame_height = height,
            width = surface.width(),
            height = surface.height(),
            "camera stream started"
        );
        DeviceOutcome::Ready
    }

    fn is_ready(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    async fn snapshot(&self, quality: JpegQuality) -> Result<CapturedImage, CaptureError> {
        if !self.is_ready() {
            return Err(CaptureError::NotReady);
        }
        let frame = self.current_frame().map_err(CaptureError::Unavailable)?;
        let surface = lock(&self.surface).clone().unwrap_or_default();

        tokio::task::spawn_blocking(move || encode_frame(&frame, &surface, quality))
            .await
            .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?
    }

    async fn release(&self) {
        if self.streaming.swap(false, Ordering::SeqCst) {
            debug!("camera stream stopped");
        }
        *lock(&self.surface) = None;
    }

    fn on_failure(&self, listener: FailureListener) {
        self.listeners.subscribe(listener);
    }

    fn diagnostic(&self) -> Option<String> {
        lock(&self.diagnostic).clone()
    }
}

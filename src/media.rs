//! Media-kind sniffing and the seams to the external media pipeline.
//!
//! The core never decodes pixels or extracts frames; those jobs belong to an
//! image pipeline and a frame extractor supplied by the application. The
//! traits here are the whole surface the core asks of them. Produced JPEGs
//! are expected to carry a JFIF APP0 segment right after the SOI marker; the
//! core does not inspect bodies to enforce that.

use std::path::Path;

/// What kind of content a source holds, deciding the IMB vs xV4 path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

/// Classify a source from its leading bytes, falling back to an extension
/// hint when the magic is unknown.
pub fn sniff(prefix: &[u8], extension_hint: Option<&str>) -> Option<MediaKind> {
    if prefix.starts_with(b"GIF87a") || prefix.starts_with(b"GIF89a") {
        return Some(MediaKind::Gif);
    }
    if prefix.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(MediaKind::Image);
    }
    if prefix.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(MediaKind::Image);
    }
    if prefix.starts_with(b"BM") {
        return Some(MediaKind::Image);
    }
    // ISO base media files put "ftyp" after a 4-byte box length.
    if prefix.len() >= 8 && &prefix[4..8] == b"ftyp" {
        return Some(MediaKind::Video);
    }
    // EBML header, mkv and webm.
    if prefix.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some(MediaKind::Video);
    }
    if prefix.starts_with(b"RIFF") && prefix.len() >= 12 && &prefix[8..12] == b"AVI " {
        return Some(MediaKind::Video);
    }

    match extension_hint.map(|e| e.trim_start_matches('.').to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "webp" => Some(MediaKind::Image),
            "gif" => Some(MediaKind::Gif),
            "mp4" | "m4v" | "mov" | "avi" | "mkv" | "webm" => Some(MediaKind::Video),
            _ => None,
        },
        None => None,
    }
}

/// Still-image preparation supplied by the application.
#[async_trait::async_trait]
pub trait ImagePipeline: Send + Sync {
    /// Resize/re-encode `source` into a JPEG at the display's geometry.
    async fn prepare(&self, source: &[u8], size: (u16, u16)) -> anyhow::Result<Vec<u8>>;

    /// A generated test pattern at the display's geometry.
    async fn checkerboard(&self, size: (u16, u16), squares: u16) -> anyhow::Result<Vec<u8>>;
}

/// Frame extraction for GIFs and videos, supplied by the application.
#[async_trait::async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Ordered JPEG frames at the display's geometry.
    async fn extract(&self, path: &Path, size: (u16, u16)) -> anyhow::Result<Vec<Vec<u8>>>;
}

/// Even per-frame interval for a clip of `total_ms` spread over
/// `frame_count` frames. The xV4 builder clamps the result into its
/// representable range regardless.
pub fn interval_for_duration(total_ms: u32, frame_count: usize) -> u32 {
    if frame_count == 0 {
        return 0;
    }
    total_ms / frame_count as u32
}

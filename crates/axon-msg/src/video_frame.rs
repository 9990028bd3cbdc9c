//! Raster video frame messages.

use crate::{Buf, MsgHeader};
use serde::{Deserialize, Serialize};

/// Pixel layout of a video frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFmt {
    /// 24-bit packed RGB.
    Rgb24,
    /// 32-bit packed RGBA.
    Rgba,
    /// 24-bit packed BGR.
    Bgr24,
    /// 32-bit packed BGRA.
    Bgra,
    /// Planar YUV 4:2:0.
    I420,
    /// Semi-planar YUV 4:2:0, UV interleaved.
    Nv12,
    /// Semi-planar YUV 4:2:0, VU interleaved.
    Nv21,
}

impl PixelFmt {
    /// The wire string of this layout.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
            Self::Bgr24 => "bgr24",
            Self::Bgra => "bgra",
            Self::I420 => "i420",
            Self::Nv12 => "nv12",
            Self::Nv21 => "nv21",
        }
    }

    /// Parses the wire string of a layout.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "rgb24" => Some(Self::Rgb24),
            "rgba" => Some(Self::Rgba),
            "bgr24" => Some(Self::Bgr24),
            "bgra" => Some(Self::Bgra),
            "i420" => Some(Self::I420),
            "nv12" => Some(Self::Nv12),
            "nv21" => Some(Self::Nv21),
            _ => None,
        }
    }
}

/// One raster frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    header: MsgHeader,
    buf: Buf,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Payload pixel layout.
    pub pixel_fmt: PixelFmt,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    /// `true` on the last frame of a stream.
    pub eof: bool,
}

impl VideoFrame {
    /// Creates an empty RGBA frame with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: MsgHeader::new(name),
            buf: Buf::default(),
            width: 0,
            height: 0,
            pixel_fmt: PixelFmt::Rgba,
            timestamp_us: 0,
            eof: false,
        }
    }

    /// The payload buffer.
    #[must_use]
    pub fn buf(&self) -> &Buf {
        &self.buf
    }

    /// Mutable payload buffer (lock checks apply on its accessors).
    pub fn buf_mut(&mut self) -> &mut Buf {
        &mut self.buf
    }

    /// Shared routing header.
    #[must_use]
    pub fn header(&self) -> &MsgHeader {
        &self.header
    }

    /// Mutable routing header.
    pub fn header_mut(&mut self) -> &mut MsgHeader {
        &mut self.header
    }

    pub(crate) fn from_parts(header: MsgHeader, buf: Buf) -> Self {
        Self {
            header,
            buf,
            ..Self::new("")
        }
    }
}

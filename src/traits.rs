//! Core traits and types for the camera capability-provider boundary.

use std::fmt;
use std::io;

/// Pixel format representation (e.g., YU12, NV12, YUYV).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUV420 pixel format (4:2:0 planar, V4L2 code `YU12`).
    pub const YUV420: Self = Self::new(b"YU12");
    /// NV12 pixel format (4:2:0 semi-planar).
    pub const NV12: Self = Self::new(b"NV12");
    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Color space of a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Unprocessed sensor data.
    Raw,
    /// sRGB primaries and transfer function.
    Srgb,
    /// sYCC, the JPEG/YCbCr variant of sRGB.
    Sycc,
    /// SMPTE 170M, standard-definition video.
    Smpte170m,
    /// ITU-R Rec. 709, high-definition video.
    Rec709,
    /// ITU-R Rec. 2020, ultra-high-definition video.
    Rec2020,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Raw => "RAW",
            Self::Srgb => "sRGB",
            Self::Sycc => "sYCC",
            Self::Smpte170m => "SMPTE170M",
            Self::Rec709 => "Rec709",
            Self::Rec2020 => "Rec2020",
        };
        write!(f, "{name}")
    }
}

/// Purpose of a capture stream, used when generating configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// Unprocessed frames straight from the sensor.
    Raw,
    /// Single-shot still image capture.
    StillCapture,
    /// Continuous video recording.
    VideoRecording,
    /// Low-latency preview.
    Viewfinder,
}

/// Negotiated parameters for a single capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfiguration {
    /// Frame dimensions.
    pub size: Size,
    /// Pixel format.
    pub pixel_format: FourCC,
    /// Color space.
    pub color_space: ColorSpace,
    /// Number of frame buffers to allocate for the stream.
    pub buffer_count: u32,
}

impl fmt::Display for StreamConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.size, self.pixel_format, self.color_space)
    }
}

/// An ordered set of stream configurations for one device.
///
/// The provider owns the structure: entries can be modified before
/// validation, but streams cannot be added or removed once generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfiguration {
    streams: Vec<StreamConfiguration>,
}

impl CameraConfiguration {
    /// Create a configuration from generated stream entries.
    #[must_use]
    pub fn new(streams: Vec<StreamConfiguration>) -> Self {
        Self { streams }
    }

    /// Stream entries in generation order.
    #[must_use]
    pub fn streams(&self) -> &[StreamConfiguration] {
        &self.streams
    }

    /// Mutable view of the stream entries.
    pub fn streams_mut(&mut self) -> &mut [StreamConfiguration] {
        &mut self.streams
    }

    /// Number of stream entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether the configuration holds no stream entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Outcome of checking a requested configuration against hardware limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// The configuration is supported exactly as requested.
    Valid,
    /// One or more entries were changed to the nearest supported values.
    Adjusted,
    /// The configuration cannot be satisfied by the hardware.
    Invalid,
}

/// Abstraction over a single camera device.
///
/// Implementations wrap one physical (or virtual) device and speak the
/// native stack's acquire/release protocol. Errors carry the provider's
/// description and are mapped to lifecycle errors by the manager.
pub trait CameraDevice {
    /// Stable identifier for the device, such as its node path.
    fn id(&self) -> &str;

    /// Take exclusive ownership of the device.
    fn acquire(&mut self) -> io::Result<()>;

    /// Give up exclusive ownership of the device.
    fn release(&mut self) -> io::Result<()>;

    /// Produce a default configuration covering the requested stream roles.
    ///
    /// Returns `None` when the device cannot serve the requested roles or
    /// has not been acquired.
    fn generate_configuration(&self, roles: &[StreamRole]) -> Option<CameraConfiguration>;

    /// Check the configuration against hardware limits.
    ///
    /// On [`ValidationStatus::Adjusted`], unsupported entries have been
    /// rewritten in place to the nearest values the hardware supports.
    fn validate_configuration(&self, config: &mut CameraConfiguration) -> ValidationStatus;

    /// Apply a validated configuration to the hardware.
    fn configure(&mut self, config: &CameraConfiguration) -> io::Result<()>;
}

/// Abstraction over the native camera stack.
pub trait CameraBackend {
    /// The device type managed by this backend.
    type Device: CameraDevice;

    /// Bring up the native camera stack.
    fn start(&mut self);

    /// Tear down the native camera stack. Called once, after every device
    /// has been released.
    fn stop(&mut self);

    /// Enumerate the available devices in deterministic order.
    fn list_devices(&self) -> Vec<Self::Device>;
}

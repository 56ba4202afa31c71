//! V4L2 capability provider using the v4l crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use v4l::capability::Flags;
use v4l::video::Capture;
use v4l::{Device, Format};

use crate::traits::{
    CameraBackend, CameraConfiguration, CameraDevice, ColorSpace, FourCC, Size,
    StreamConfiguration, StreamRole, ValidationStatus,
};

/// Capability provider backed by the kernel's V4L2 subsystem.
///
/// V4L2 has no stack-wide session to bring up, so `start` and `stop` only
/// mark the provider boundary in the logs. Discovery scans `/dev` for
/// capture-capable `videoN` nodes in numeric order.
pub struct V4L2Backend {
    dev_dir: PathBuf,
    pinned: Option<PathBuf>,
}

impl Default for V4L2Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl V4L2Backend {
    /// A backend that scans `/dev` for capture nodes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
            pinned: None,
        }
    }

    /// A backend that exposes only the given device node.
    ///
    /// Discovery probes just that path, which keeps tests independent of
    /// whatever other cameras the host has plugged in.
    #[must_use]
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
            pinned: Some(path.as_ref().to_path_buf()),
        }
    }

    /// All `videoN` nodes under the device directory, ordered by index.
    fn scan_device_nodes(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.dev_dir) else {
            return Vec::new();
        };

        let mut nodes: Vec<(u32, PathBuf)> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let index = name.to_str()?.strip_prefix("video")?.parse::<u32>().ok()?;
                Some((index, entry.path()))
            })
            .collect();
        nodes.sort_by_key(|(index, _)| *index);
        nodes.into_iter().map(|(_, path)| path).collect()
    }
}

impl CameraBackend for V4L2Backend {
    type Device = V4L2Camera;

    fn start(&mut self) {
        debug!("starting the V4L2 capability provider");
    }

    fn stop(&mut self) {
        debug!("stopping the V4L2 capability provider");
    }

    fn list_devices(&self) -> Vec<V4L2Camera> {
        let paths = match &self.pinned {
            Some(path) => vec![path.clone()],
            None => self.scan_device_nodes(),
        };
        paths.iter().filter_map(|path| probe(path)).collect()
    }
}

/// Open a node and keep it only if it reports a capture capability.
fn probe(path: &Path) -> Option<V4L2Camera> {
    let device = match Device::with_path(path) {
        Ok(device) => device,
        Err(err) => {
            debug!("skipping {}: {err}", path.display());
            return None;
        }
    };
    let caps = match device.query_caps() {
        Ok(caps) => caps,
        Err(err) => {
            debug!("skipping {}: {err}", path.display());
            return None;
        }
    };

    if !has_capture_flag(caps.capabilities) {
        debug!("skipping {}: not a capture device", path.display());
        return None;
    }

    debug!("found capture device {} ({})", path.display(), caps.card);
    Some(V4L2Camera::discovered(path.to_path_buf(), caps.card))
}

/// A single V4L2 capture node.
///
/// Discovery probes the node and drops the handle again; acquisition
/// reopens it and holds the file descriptor until release.
pub struct V4L2Camera {
    path: PathBuf,
    id: String,
    card: String,
    handle: Option<Device>,
}

impl V4L2Camera {
    fn discovered(path: PathBuf, card: String) -> Self {
        let id = path.display().to_string();
        Self {
            path,
            id,
            card,
            handle: None,
        }
    }

    /// Human-readable device name reported by the driver.
    #[must_use]
    pub fn card(&self) -> &str {
        &self.card
    }
}

impl CameraDevice for V4L2Camera {
    fn id(&self) -> &str {
        &self.id
    }

    fn acquire(&mut self) -> io::Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let device = Device::with_path(&self.path)?;
        // Device numbers can be reassigned between probe and open.
        let caps = device.query_caps()?;
        if !has_capture_flag(caps.capabilities) {
            return Err(io::Error::other(format!(
                "{} is not a capture device",
                self.id
            )));
        }
        self.handle = Some(device);
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        // Closing the node is how V4L2 gives a device back.
        self.handle = None;
        Ok(())
    }

    fn generate_configuration(&self, roles: &[StreamRole]) -> Option<CameraConfiguration> {
        let device = self.handle.as_ref()?;

        let current = match device.format() {
            Ok(format) => format,
            Err(err) => {
                debug!("cannot read the current format of {}: {err}", self.id);
                return None;
            }
        };

        let size = Size::new(current.width, current.height);
        let streams = roles
            .iter()
            .map(|role| StreamConfiguration {
                size,
                pixel_format: FourCC::from(current.fourcc),
                color_space: default_color_space(size),
                buffer_count: role_buffer_count(*role),
            })
            .collect();
        Some(CameraConfiguration::new(streams))
    }

    fn validate_configuration(&self, config: &mut CameraConfiguration) -> ValidationStatus {
        let Some(device) = self.handle.as_ref() else {
            return ValidationStatus::Invalid;
        };

        // S_FMT either applies the request or rewrites it to the nearest
        // parameters the driver supports, which is exactly the adjustment
        // contract of this method.
        let mut adjusted = false;
        for stream in config.streams_mut() {
            let requested = Format::new(
                stream.size.width,
                stream.size.height,
                stream.pixel_format.into(),
            );
            let actual = match device.set_format(&requested) {
                Ok(actual) => actual,
                Err(err) => {
                    debug!("the driver rejected {stream}: {err}");
                    return ValidationStatus::Invalid;
                }
            };

            let actual_size = Size::new(actual.width, actual.height);
            let actual_fourcc = FourCC::from(actual.fourcc);
            if actual_size != stream.size || actual_fourcc != stream.pixel_format {
                stream.size = actual_size;
                stream.pixel_format = actual_fourcc;
                adjusted = true;
            }
        }

        if adjusted {
            ValidationStatus::Adjusted
        } else {
            ValidationStatus::Valid
        }
    }

    fn configure(&mut self, config: &CameraConfiguration) -> io::Result<()> {
        let Some(device) = self.handle.as_ref() else {
            return Err(io::Error::other("device has not been acquired"));
        };

        for stream in config.streams() {
            let requested = Format::new(
                stream.size.width,
                stream.size.height,
                stream.pixel_format.into(),
            );
            let actual = device.set_format(&requested)?;

            let actual_size = Size::new(actual.width, actual.height);
            let actual_fourcc = FourCC::from(actual.fourcc);
            if actual_size != stream.size || actual_fourcc != stream.pixel_format {
                return Err(io::Error::other(format!(
                    "the driver replaced {stream} with {actual_size} {actual_fourcc}"
                )));
            }
            debug!("applied {stream} to {}", self.id);
        }
        Ok(())
    }
}

fn has_capture_flag(flags: Flags) -> bool {
    flags.contains(Flags::VIDEO_CAPTURE) || flags.contains(Flags::VIDEO_CAPTURE_MPLANE)
}

/// Rec. 709 for HD-class frames, SMPTE 170M for SD, matching what capture
/// stacks assume when the driver does not report a color space.
fn default_color_space(size: Size) -> ColorSpace {
    if size.width >= 1280 || size.height >= 720 {
        ColorSpace::Rec709
    } else {
        ColorSpace::Smpte170m
    }
}

/// Buffers to request per stream role.
fn role_buffer_count(role: StreamRole) -> u32 {
    match role {
        StreamRole::StillCapture => 1,
        StreamRole::Raw => 2,
        StreamRole::VideoRecording | StreamRole::Viewfinder => 4,
    }
}

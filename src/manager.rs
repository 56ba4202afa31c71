//! Camera device lifecycle management.
//!
//! [`CameraDeviceManager`] owns the handle to the native camera stack and
//! the lifecycle of exactly one device: acquire on construction, configure,
//! release on request or on drop. Illegal transitions are ruled out by an
//! explicit state machine rather than flag pairs.

use std::mem;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::traits::{
    CameraBackend, CameraConfiguration, CameraDevice, ColorSpace, FourCC, Size, StreamRole,
    ValidationStatus,
};

const DEFAULT_CAMERA_WIDTH: u32 = 2304;
const DEFAULT_CAMERA_HEIGHT: u32 = 1296;

/// Error type for camera lifecycle operations.
#[derive(Debug, Error)]
pub enum CameraManagerError {
    /// Device discovery returned an empty list.
    #[error("no camera devices found")]
    NoDevicesFound,
    /// The provider refused to hand over exclusive ownership.
    #[error("failed to acquire camera device: {0}")]
    AcquisitionFailed(String),
    /// An operation requiring an active device ran without one.
    #[error("camera is not active")]
    NotActive,
    /// The provider produced no configuration for the requested roles.
    #[error("failed to generate camera configuration")]
    ConfigGenerationFailed,
    /// Validation rejected the requested configuration outright.
    #[error("camera configuration is invalid")]
    ConfigInvalid,
    /// The provider failed while applying a validated configuration.
    #[error("failed to apply camera configuration: {0}")]
    ConfigApplyFailed(String),
    /// The provider refused to give up the device.
    #[error("failed to release camera device: {0}")]
    ReleaseFailed(String),
}

/// Result type for camera lifecycle operations.
pub type Result<T> = std::result::Result<T, CameraManagerError>;

/// Capture target requested for the recording stream.
///
/// These are deployment defaults, not values negotiated with the hardware;
/// validation may still adjust them to what the device supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPolicy {
    /// Requested frame dimensions.
    pub size: Size,
    /// Requested pixel format.
    pub pixel_format: FourCC,
    /// Requested color space.
    pub color_space: ColorSpace,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self {
            size: Size::new(DEFAULT_CAMERA_WIDTH, DEFAULT_CAMERA_HEIGHT),
            pixel_format: FourCC::YUV420,
            color_space: ColorSpace::Rec709,
        }
    }
}

/// Lifecycle states of the managed device.
///
/// A configuration exists only in `Configured`, so "configured implies
/// active" holds structurally.
enum DeviceState<D> {
    Idle,
    Acquired {
        device: D,
    },
    Configured {
        device: D,
        configuration: CameraConfiguration,
    },
}

/// Owns the camera stack handle and the lifecycle of exactly one device.
///
/// The lifecycle is a linear, synchronous sequence of blocking provider
/// calls: construction starts the backend, acquires the first discovered
/// device and applies a configuration; [`CameraDeviceManager::release`]
/// gives the device back; dropping the manager releases any active device
/// and then stops the backend. There is no internal locking — callers
/// serialize access themselves.
pub struct CameraDeviceManager<P: CameraBackend> {
    backend: P,
    state: DeviceState<P::Device>,
    policy: StreamPolicy,
}

impl<P: CameraBackend> CameraDeviceManager<P> {
    /// Start the backend, acquire the first available device and configure
    /// it with the default [`StreamPolicy`].
    ///
    /// Construction is all-or-nothing: on any failure the partially built
    /// manager runs the normal teardown (release the device if it was
    /// acquired, then stop the backend) before the error is returned.
    pub fn new(backend: P) -> Result<Self> {
        Self::with_policy(backend, StreamPolicy::default())
    }

    /// Like [`CameraDeviceManager::new`], but with an explicit capture
    /// target.
    pub fn with_policy(mut backend: P, policy: StreamPolicy) -> Result<Self> {
        backend.start();

        let mut manager = Self {
            backend,
            state: DeviceState::Idle,
            policy,
        };
        // An early return here drops `manager`, which releases anything
        // acquired so far and stops the backend.
        manager.acquire_device()?;
        manager.configure_device()?;
        Ok(manager)
    }

    /// Whether a device is currently owned by this manager.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DeviceState::Idle)
    }

    /// Whether a configuration has been applied to the active device.
    pub fn is_configured(&self) -> bool {
        matches!(self.state, DeviceState::Configured { .. })
    }

    /// The active device, if any.
    pub fn active_device(&self) -> Option<&P::Device> {
        match &self.state {
            DeviceState::Idle => None,
            DeviceState::Acquired { device } | DeviceState::Configured { device, .. } => {
                Some(device)
            }
        }
    }

    /// The applied configuration, if any.
    pub fn configuration(&self) -> Option<&CameraConfiguration> {
        match &self.state {
            DeviceState::Configured { configuration, .. } => Some(configuration),
            DeviceState::Idle | DeviceState::Acquired { .. } => None,
        }
    }

    /// The capture target this manager requests when configuring.
    pub fn policy(&self) -> &StreamPolicy {
        &self.policy
    }

    /// Release the active device.
    ///
    /// Releasing an idle manager is not an error: it logs a warning and
    /// returns without touching the provider. A provider failure leaves the
    /// device owned so the caller can retry or escalate; on success the
    /// device reference and the retained configuration are both cleared.
    pub fn release(&mut self) -> Result<()> {
        match &mut self.state {
            DeviceState::Idle => {
                warn!("camera is not active, nothing to release");
                Ok(())
            }
            DeviceState::Acquired { device } | DeviceState::Configured { device, .. } => {
                if let Err(err) = device.release() {
                    return Err(CameraManagerError::ReleaseFailed(err.to_string()));
                }
                self.state = DeviceState::Idle;
                info!("released the active camera device");
                Ok(())
            }
        }
    }

    /// Discover devices and acquire the first one.
    fn acquire_device(&mut self) -> Result<()> {
        // Single-camera deployments: take whichever device enumerates first.
        let Some(mut device) = self.backend.list_devices().into_iter().next() else {
            return Err(CameraManagerError::NoDevicesFound);
        };

        device
            .acquire()
            .map_err(|err| CameraManagerError::AcquisitionFailed(err.to_string()))?;

        info!("acquired camera device {}", device.id());
        self.state = DeviceState::Acquired { device };
        Ok(())
    }

    /// Generate, validate and apply a configuration for video recording.
    ///
    /// Requires an active device. On failure the device stays acquired but
    /// is treated as unconfigured, since the hardware state is uncertain.
    fn configure_device(&mut self) -> Result<()> {
        let mut device = match mem::replace(&mut self.state, DeviceState::Idle) {
            DeviceState::Idle => return Err(CameraManagerError::NotActive),
            DeviceState::Acquired { device } | DeviceState::Configured { device, .. } => device,
        };

        match Self::negotiate(&mut device, &self.policy) {
            Ok(configuration) => {
                self.state = DeviceState::Configured {
                    device,
                    configuration,
                };
                Ok(())
            }
            Err(err) => {
                self.state = DeviceState::Acquired { device };
                Err(err)
            }
        }
    }

    /// Run the generate → patch → validate → apply sequence on a device.
    fn negotiate(
        device: &mut P::Device,
        policy: &StreamPolicy,
    ) -> Result<CameraConfiguration> {
        let Some(mut configuration) =
            device.generate_configuration(&[StreamRole::VideoRecording])
        else {
            return Err(CameraManagerError::ConfigGenerationFailed);
        };

        let Some(stream) = configuration.streams_mut().first_mut() else {
            return Err(CameraManagerError::ConfigGenerationFailed);
        };
        stream.size = policy.size;
        stream.pixel_format = policy.pixel_format;
        stream.color_space = policy.color_space;

        match device.validate_configuration(&mut configuration) {
            ValidationStatus::Valid => info!("camera configuration is valid"),
            ValidationStatus::Adjusted => log_adjusted_configuration(&configuration),
            ValidationStatus::Invalid => return Err(CameraManagerError::ConfigInvalid),
        }

        device
            .configure(&configuration)
            .map_err(|err| CameraManagerError::ConfigApplyFailed(err.to_string()))?;

        info!(
            "camera configured with {} stream(s)",
            configuration.len()
        );
        Ok(configuration)
    }
}

impl<P: CameraBackend> Drop for CameraDeviceManager<P> {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(err) = self.release() {
                error!("failed to release the camera during teardown: {err}");
            }
        }
        self.backend.stop();
    }
}

/// Log the stream parameters the provider settled on after an adjustment.
fn log_adjusted_configuration(configuration: &CameraConfiguration) {
    for (index, stream) in configuration.streams().iter().enumerate() {
        warn!("camera configuration was adjusted: stream {index} is now {stream}");
    }
}

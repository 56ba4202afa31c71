//! Pi-Cam-Manager: camera device lifecycle management for Raspberry Pi
//!
//! This library manages the lifecycle of a single camera device on top of a
//! trait-based capability provider: construction acquires and configures the
//! device, release hands it back, and dropping the manager tears the whole
//! stack down. A V4L2 provider covers real hardware; a scripted mock covers
//! testing without any.

pub mod device;
pub mod manager;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use device::{V4L2Backend, V4L2Camera};
pub use manager::{CameraDeviceManager, CameraManagerError, StreamPolicy};
pub use traits::{
    CameraBackend, CameraConfiguration, CameraDevice, ColorSpace, FourCC, Size,
    StreamConfiguration, StreamRole, ValidationStatus,
};

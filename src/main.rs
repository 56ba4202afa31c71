//! Pi-cam-manager binary for bringing up the managed camera.

use pi_cam_manager::{CameraDevice, CameraDeviceManager, V4L2Backend};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    if let Err(err) = run() {
        error!("failed to start camera manager: {err}");
        std::process::exit(1);
    }
}

fn run() -> pi_cam_manager::manager::Result<()> {
    let manager = CameraDeviceManager::new(V4L2Backend::new())?;

    if let Some(device) = manager.active_device() {
        info!("camera manager started successfully on {} ({})", device.id(), device.card());
    }
    if let Some(configuration) = manager.configuration() {
        for stream in configuration.streams() {
            info!("active stream: {stream}");
        }
    }

    // Dropping the manager releases the device and stops the provider.
    Ok(())
}

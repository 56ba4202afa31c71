//! Scripted in-memory provider for testing without hardware.
//!
//! [`MockBackend`] hands out [`MockCamera`] devices whose behavior is fixed
//! up front with builder methods. Every provider call is recorded in a
//! shared [`Journal`] so tests can assert on call counts and ordering, not
//! just on the manager's externally visible state.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::traits::{
    CameraBackend, CameraConfiguration, CameraDevice, ColorSpace, FourCC, Size,
    StreamConfiguration, StreamRole, ValidationStatus,
};

/// A single provider call, in the vocabulary of the two provider traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    /// `CameraBackend::start`.
    Start,
    /// `CameraBackend::list_devices`.
    List,
    /// `CameraDevice::acquire`.
    Acquire,
    /// `CameraDevice::generate_configuration`.
    Generate,
    /// `CameraDevice::validate_configuration`.
    Validate,
    /// `CameraDevice::configure`.
    Configure,
    /// `CameraDevice::release`.
    Release,
    /// `CameraBackend::stop`.
    Stop,
}

/// Ordered record of provider calls plus the last applied configuration.
#[derive(Debug, Default)]
pub struct Journal {
    calls: Vec<BackendCall>,
    applied: Option<CameraConfiguration>,
}

impl Journal {
    /// All recorded calls, oldest first.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// How many times the given call was recorded.
    pub fn count(&self, call: BackendCall) -> usize {
        self.calls.iter().filter(|recorded| **recorded == call).count()
    }

    /// Index of the first occurrence of the given call.
    pub fn position(&self, call: BackendCall) -> Option<usize> {
        self.calls.iter().position(|recorded| *recorded == call)
    }

    /// The configuration passed to the last successful `configure` call.
    pub fn applied(&self) -> Option<CameraConfiguration> {
        self.applied.clone()
    }

    fn record(&mut self, call: BackendCall) {
        self.calls.push(call);
    }
}

/// How a scripted device answers `validate_configuration`.
#[derive(Debug, Clone)]
enum ScriptedValidation {
    Valid,
    Adjusted {
        size: Size,
        pixel_format: FourCC,
        color_space: ColorSpace,
    },
    Invalid,
}

/// Behavior knobs shared by every device a backend hands out.
#[derive(Debug, Clone)]
struct Script {
    acquire_error: Option<String>,
    generate_none: bool,
    validation: ScriptedValidation,
    configure_error: Option<String>,
    release_failures: u32,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            acquire_error: None,
            generate_none: false,
            validation: ScriptedValidation::Valid,
            configure_error: None,
            release_failures: 0,
        }
    }
}

/// Scripted backend exposing a configurable number of [`MockCamera`]s.
#[derive(Debug)]
pub struct MockBackend {
    device_count: usize,
    script: Script,
    journal: Rc<RefCell<Journal>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A backend with a single device that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            device_count: 1,
            script: Script::default(),
            journal: Rc::new(RefCell::new(Journal::default())),
        }
    }

    /// Handle to the shared call journal.
    ///
    /// The journal outlives the backend, so tests can keep asserting after
    /// the manager (and the backend it owns) has been dropped.
    #[must_use]
    pub fn journal(&self) -> Rc<RefCell<Journal>> {
        Rc::clone(&self.journal)
    }

    /// Expose the given number of devices during discovery.
    #[must_use]
    pub fn with_device_count(mut self, count: usize) -> Self {
        self.device_count = count;
        self
    }

    /// Fail every acquisition attempt with the given message.
    #[must_use]
    pub fn with_acquire_failure(mut self, message: &str) -> Self {
        self.script.acquire_error = Some(message.to_owned());
        self
    }

    /// Answer configuration generation with `None`.
    #[must_use]
    pub fn without_configuration(mut self) -> Self {
        self.script.generate_none = true;
        self
    }

    /// Rewrite every validated stream to the given parameters and report
    /// the configuration as adjusted.
    #[must_use]
    pub fn adjusting_to(
        mut self,
        size: Size,
        pixel_format: FourCC,
        color_space: ColorSpace,
    ) -> Self {
        self.script.validation = ScriptedValidation::Adjusted {
            size,
            pixel_format,
            color_space,
        };
        self
    }

    /// Reject every configuration during validation.
    #[must_use]
    pub fn rejecting_validation(mut self) -> Self {
        self.script.validation = ScriptedValidation::Invalid;
        self
    }

    /// Fail configuration apply with the given message.
    #[must_use]
    pub fn with_configure_failure(mut self, message: &str) -> Self {
        self.script.configure_error = Some(message.to_owned());
        self
    }

    /// Fail the next `count` release attempts before succeeding.
    #[must_use]
    pub fn with_release_failures(mut self, count: u32) -> Self {
        self.script.release_failures = count;
        self
    }
}

impl CameraBackend for MockBackend {
    type Device = MockCamera;

    fn start(&mut self) {
        self.journal.borrow_mut().record(BackendCall::Start);
    }

    fn stop(&mut self) {
        self.journal.borrow_mut().record(BackendCall::Stop);
    }

    fn list_devices(&self) -> Vec<MockCamera> {
        self.journal.borrow_mut().record(BackendCall::List);
        (0..self.device_count)
            .map(|index| MockCamera {
                id: format!("mock-{index}"),
                script: self.script.clone(),
                journal: Rc::clone(&self.journal),
                acquired: false,
                release_failures_left: self.script.release_failures,
            })
            .collect()
    }
}

/// Scripted device recording every call in the backend's journal.
#[derive(Debug)]
pub struct MockCamera {
    id: String,
    script: Script,
    journal: Rc<RefCell<Journal>>,
    acquired: bool,
    release_failures_left: u32,
}

impl CameraDevice for MockCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn acquire(&mut self) -> io::Result<()> {
        self.journal.borrow_mut().record(BackendCall::Acquire);
        if let Some(message) = &self.script.acquire_error {
            return Err(io::Error::other(message.clone()));
        }
        self.acquired = true;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.journal.borrow_mut().record(BackendCall::Release);
        if self.release_failures_left > 0 {
            self.release_failures_left -= 1;
            return Err(io::Error::other("scripted release failure"));
        }
        self.acquired = false;
        Ok(())
    }

    fn generate_configuration(&self, roles: &[StreamRole]) -> Option<CameraConfiguration> {
        self.journal.borrow_mut().record(BackendCall::Generate);
        if self.script.generate_none || !self.acquired {
            return None;
        }
        let streams = roles
            .iter()
            .map(|_| StreamConfiguration {
                size: Size::new(640, 480),
                pixel_format: FourCC::YUYV,
                color_space: ColorSpace::Smpte170m,
                buffer_count: 4,
            })
            .collect();
        Some(CameraConfiguration::new(streams))
    }

    fn validate_configuration(&self, config: &mut CameraConfiguration) -> ValidationStatus {
        self.journal.borrow_mut().record(BackendCall::Validate);
        match &self.script.validation {
            ScriptedValidation::Valid => ValidationStatus::Valid,
            ScriptedValidation::Adjusted {
                size,
                pixel_format,
                color_space,
            } => {
                for stream in config.streams_mut() {
                    stream.size = *size;
                    stream.pixel_format = *pixel_format;
                    stream.color_space = *color_space;
                }
                ValidationStatus::Adjusted
            }
            ScriptedValidation::Invalid => ValidationStatus::Invalid,
        }
    }

    fn configure(&mut self, config: &CameraConfiguration) -> io::Result<()> {
        self.journal.borrow_mut().record(BackendCall::Configure);
        if let Some(message) = &self.script.configure_error {
            return Err(io::Error::other(message.clone()));
        }
        self.journal.borrow_mut().applied = Some(config.clone());
        Ok(())
    }
}

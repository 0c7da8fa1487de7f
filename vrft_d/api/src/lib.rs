use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSingleEyeData {
    pub gaze: Vec3,
    pub pupil_diameter_mm: f32,
    pub openness: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedEyeData {
    pub left: UnifiedSingleEyeData,
    pub right: UnifiedSingleEyeData,
}

/// Output record owned by the host. Modules only write into it during `update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTrackingData {
    pub eye: UnifiedEyeData,
}

/// What a module can supply (or was asked to supply).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub eye: bool,
    pub expression: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        eye: false,
        expression: false,
    };

    pub const fn new(eye: bool, expression: bool) -> Self {
        Self { eye, expression }
    }

    /// Flags present in both sets.
    pub const fn intersect(self, other: Capabilities) -> Capabilities {
        Capabilities {
            eye: self.eye && other.eye,
            expression: self.expression && other.expression,
        }
    }

    pub const fn any(self) -> bool {
        self.eye || self.expression
    }
}

impl From<(bool, bool)> for Capabilities {
    fn from((eye, expression): (bool, bool)) -> Self {
        Self { eye, expression }
    }
}

impl From<Capabilities> for (bool, bool) {
    fn from(c: Capabilities) -> Self {
        (c.eye, c.expression)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    #[default]
    Uninitialized,
    Idle,
    Active,
}

/// Display information surfaced to the host UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleInfo {
    pub name: String,
    /// Encoded image files (PNG etc.), in display order.
    pub static_images: Vec<Vec<u8>>,
}

/// log level for module logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

/// logger callback for modules
pub type LogCallback = extern "C" fn(level: LogLevel, target: *const i8, message: *const i8);

/// Logger interface for modules
pub struct ModuleLogger {
    callback: LogCallback,
    module_name: String,
}

impl ModuleLogger {
    pub fn new(callback: LogCallback, module_name: String) -> Self {
        Self {
            callback,
            module_name,
        }
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        let target = to_c_string(&self.module_name);
        let msg = to_c_string(message);
        (self.callback)(level, target.as_ptr(), msg.as_ptr());
    }
}

// Interior NULs would make CString::new fail; strip them instead of dropping the line.
fn to_c_string(s: &str) -> std::ffi::CString {
    std::ffi::CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Log callback that forwards module messages to the `log` facade.
pub extern "C" fn forward_to_log(level: LogLevel, target: *const i8, message: *const i8) {
    if target.is_null() || message.is_null() {
        return;
    }

    // SAFETY: ModuleLogger always passes valid NUL-terminated strings that outlive this call.
    let (target, message) = unsafe {
        (
            std::ffi::CStr::from_ptr(target).to_string_lossy(),
            std::ffi::CStr::from_ptr(message).to_string_lossy(),
        )
    };

    let target: &str = &target;
    match level {
        LogLevel::Error => log::error!(target: target, "{}", message),
        LogLevel::Warn => log::warn!(target: target, "{}", message),
        LogLevel::Info => log::info!(target: target, "{}", message),
        LogLevel::Debug => log::debug!(target: target, "{}", message),
        LogLevel::Trace => log::trace!(target: target, "{}", message),
    }
}

pub trait TrackingModule {
    /// Capabilities this module can supply at best.
    fn supported(&self) -> Capabilities;

    /// One-shot setup. Returns what is actually supplied; `Capabilities::NONE` on failure.
    fn initialize(&mut self, requested: Capabilities, logger: ModuleLogger) -> Capabilities;

    fn update(&mut self, data: &mut UnifiedTrackingData) -> Result<()>;

    fn unload(&mut self);

    fn status(&self) -> ModuleState {
        ModuleState::Active
    }

    fn info(&self) -> ModuleInfo {
        ModuleInfo::default()
    }
}

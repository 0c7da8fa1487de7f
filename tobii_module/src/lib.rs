//! Tobii Stream Engine eye tracking module

pub mod assets;
pub mod config;
pub mod ffi;
pub mod mapping;
pub mod session;
pub mod stream_engine;
pub mod tobii;

use api::TrackingModule;
use ffi::TobiiErrorCode;
use std::path::PathBuf;
use tobii::TobiiModule;

pub use config::TobiiConfig;
pub use session::{Device, Session};
pub use stream_engine::{ApiHandle, DeviceHandle, StreamEngine};

/// Errors raised while talking to the Stream Engine runtime
#[derive(Debug, thiserror::Error)]
pub enum TobiiError {
    #[error("Failed to load Stream Engine library {path:?}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("{call} failed: {code}")]
    Vendor {
        call: &'static str,
        code: TobiiErrorCode,
    },
    #[error("{0} returned a null handle")]
    NullHandle(&'static str),
    #[error("Device URL contains a NUL byte: {0:?}")]
    InvalidUrl(String),
    #[error("Handle already released")]
    NotConnected,
    #[error("Session still has a connected device")]
    SessionInUse,
}

impl TobiiError {
    /// Vendor error code, if this error came from a `tobii_*` call.
    pub fn code(&self) -> Option<TobiiErrorCode> {
        match self {
            TobiiError::Vendor { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.code() == Some(TobiiErrorCode::TimedOut)
    }
}

#[no_mangle]
#[allow(improper_ctypes_definitions)]
pub extern "C" fn create_module() -> Box<dyn TrackingModule> {
    Box::new(TobiiModule::new())
}

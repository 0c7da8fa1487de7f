use std::ffi::{c_char, c_void};

/// Opaque `tobii_api_t`.
#[repr(C)]
pub struct TobiiApi {
    _private: [u8; 0],
}

/// Opaque `tobii_device_t`.
#[repr(C)]
pub struct TobiiDevice {
    _private: [u8; 0],
}

pub const TOBII_VALIDITY_INVALID: i32 = 0;
pub const TOBII_VALIDITY_VALID: i32 = 1;

pub const TOBII_STATE_BOOL_FALSE: i32 = 0;
pub const TOBII_STATE_BOOL_TRUE: i32 = 1;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOfUse {
    Interactive = 1,
    Analytical = 2,
}

/// `tobii_error_t`. Raw codes outside the known range map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TobiiErrorCode {
    NoError,
    Internal,
    InsufficientLicense,
    NotSupported,
    NotAvailable,
    ConnectionFailed,
    TimedOut,
    AllocationFailed,
    InvalidParameter,
    CalibrationAlreadyStarted,
    CalibrationNotStarted,
    AlreadySubscribed,
    NotSubscribed,
    OperationFailed,
    ConflictingApiInstances,
    CalibrationBusy,
    CallbackInProgress,
    TooManySubscribers,
    ConnectionFailedDriver,
    Unauthorized,
    FirmwareUpgradeInProgress,
    Unknown(i32),
}

impl TobiiErrorCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::Internal,
            2 => Self::InsufficientLicense,
            3 => Self::NotSupported,
            4 => Self::NotAvailable,
            5 => Self::ConnectionFailed,
            6 => Self::TimedOut,
            7 => Self::AllocationFailed,
            8 => Self::InvalidParameter,
            9 => Self::CalibrationAlreadyStarted,
            10 => Self::CalibrationNotStarted,
            11 => Self::AlreadySubscribed,
            12 => Self::NotSubscribed,
            13 => Self::OperationFailed,
            14 => Self::ConflictingApiInstances,
            15 => Self::CalibrationBusy,
            16 => Self::CallbackInProgress,
            17 => Self::TooManySubscribers,
            18 => Self::ConnectionFailedDriver,
            19 => Self::Unauthorized,
            20 => Self::FirmwareUpgradeInProgress,
            other => Self::Unknown(other),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::Internal => "internal error",
            Self::InsufficientLicense => "insufficient license",
            Self::NotSupported => "not supported",
            Self::NotAvailable => "not available",
            Self::ConnectionFailed => "connection failed",
            Self::TimedOut => "timed out",
            Self::AllocationFailed => "allocation failed",
            Self::InvalidParameter => "invalid parameter",
            Self::CalibrationAlreadyStarted => "calibration already started",
            Self::CalibrationNotStarted => "calibration not started",
            Self::AlreadySubscribed => "already subscribed",
            Self::NotSubscribed => "not subscribed",
            Self::OperationFailed => "operation failed",
            Self::ConflictingApiInstances => "conflicting api instances",
            Self::CalibrationBusy => "calibration busy",
            Self::CallbackInProgress => "callback in progress",
            Self::TooManySubscribers => "too many subscribers",
            Self::ConnectionFailedDriver => "connection failed (driver)",
            Self::Unauthorized => "unauthorized",
            Self::FirmwareUpgradeInProgress => "firmware upgrade in progress",
            Self::Unknown(_) => "unknown error",
        }
    }
}

impl std::fmt::Display for TobiiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown error ({})", code),
            other => f.write_str(other.description()),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WearableConsumerEye {
    pub pupil_position_in_sensor_area_validity: i32,
    pub pupil_position_in_sensor_area_xy: [f32; 2],
    pub position_guide_validity: i32,
    pub position_guide_xy: [f32; 2],
    pub blink_validity: i32,
    pub blink: i32,
}

impl WearableConsumerEye {
    pub fn is_pupil_position_valid(&self) -> bool {
        self.pupil_position_in_sensor_area_validity == TOBII_VALIDITY_VALID
    }

    pub fn is_blinking(&self) -> bool {
        self.blink == TOBII_STATE_BOOL_TRUE
    }
}

/// `tobii_wearable_consumer_data_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WearableConsumerData {
    pub timestamp_us: i64,
    pub left: WearableConsumerEye,
    pub right: WearableConsumerEye,
    pub gaze_origin_combined_validity: i32,
    pub gaze_origin_combined_mm_xyz: [f32; 3],
    pub gaze_direction_combined_validity: i32,
    pub gaze_direction_combined_normalized_xyz: [f32; 3],
    pub convergence_distance_validity: i32,
    pub convergence_distance_mm: f32,
    pub improve_user_position_hmd: i32,
}

// Function signatures
pub type DeviceUrlReceiverFn = unsafe extern "C" fn(url: *const c_char, user_data: *mut c_void);
pub type WearableConsumerDataCallbackFn =
    unsafe extern "C" fn(data: *const WearableConsumerData, user_data: *mut c_void);

pub type ApiCreateFn = unsafe extern "C" fn(
    api: *mut *mut TobiiApi,
    custom_alloc: *const c_void,
    custom_log: *const c_void,
) -> i32;
pub type ApiDestroyFn = unsafe extern "C" fn(api: *mut TobiiApi) -> i32;
pub type EnumerateLocalDeviceUrlsFn = unsafe extern "C" fn(
    api: *mut TobiiApi,
    receiver: DeviceUrlReceiverFn,
    user_data: *mut c_void,
) -> i32;
pub type DeviceCreateFn = unsafe extern "C" fn(
    api: *mut TobiiApi,
    url: *const c_char,
    field_of_use: i32,
    device: *mut *mut TobiiDevice,
) -> i32;
pub type DeviceDestroyFn = unsafe extern "C" fn(device: *mut TobiiDevice) -> i32;
pub type WaitForCallbacksFn =
    unsafe extern "C" fn(device_count: i32, devices: *const *mut TobiiDevice) -> i32;
pub type DeviceProcessCallbacksFn = unsafe extern "C" fn(device: *mut TobiiDevice) -> i32;
pub type WearableConsumerDataSubscribeFn = unsafe extern "C" fn(
    device: *mut TobiiDevice,
    callback: WearableConsumerDataCallbackFn,
    user_data: *mut c_void,
) -> i32;
pub type WearableConsumerDataUnsubscribeFn = unsafe extern "C" fn(device: *mut TobiiDevice) -> i32;

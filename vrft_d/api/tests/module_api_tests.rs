use api::{Capabilities, LogLevel, ModuleLogger, ModuleState, UnifiedTrackingData};
use std::ffi::CStr;
use std::sync::Mutex;

static CAPTURED: Mutex<Vec<(LogLevel, String, String)>> = Mutex::new(Vec::new());

extern "C" fn capture(level: LogLevel, target: *const i8, message: *const i8) {
    let (target, message) = unsafe {
        (
            CStr::from_ptr(target).to_string_lossy().into_owned(),
            CStr::from_ptr(message).to_string_lossy().into_owned(),
        )
    };
    CAPTURED.lock().unwrap().push((level, target, message));
}

#[test]
fn test_capabilities_intersect() {
    let requested = Capabilities::new(true, true);
    let supported = Capabilities::new(true, false);

    assert_eq!(requested.intersect(supported), supported);
    assert_eq!(
        Capabilities::new(false, true).intersect(supported),
        Capabilities::NONE
    );
    assert!(!Capabilities::NONE.any());
}

#[test]
fn test_capabilities_tuple_conversion() {
    let caps = Capabilities::from((true, false));
    assert!(caps.eye);
    assert!(!caps.expression);
    assert_eq!(<(bool, bool)>::from(caps), (true, false));
}

#[test]
fn test_module_logger_forwards_target_and_level() {
    let logger = ModuleLogger::new(capture, "vrft_d::plugins::test".to_string());

    logger.warn("device lost");
    logger.info("with\0nul");

    let captured = CAPTURED.lock().unwrap();
    assert!(captured.contains(&(
        LogLevel::Warn,
        "vrft_d::plugins::test".to_string(),
        "device lost".to_string()
    )));
    assert!(captured.contains(&(
        LogLevel::Info,
        "vrft_d::plugins::test".to_string(),
        "withnul".to_string()
    )));
}

#[test]
fn test_forward_to_log_accepts_every_level() {
    let _ = env_logger::builder().is_test(true).try_init();
    let logger = ModuleLogger::new(api::forward_to_log, "vrft_d::plugins::test".to_string());

    logger.error("error");
    logger.warn("warn");
    logger.info("info");
    logger.debug("debug");
    logger.trace("trace");
}

#[test]
fn test_default_state_and_data() {
    assert_eq!(ModuleState::default(), ModuleState::Uninitialized);

    let data = UnifiedTrackingData::default();
    let json = serde_json::to_value(&data).unwrap();
    assert!(json["eye"]["left"]["openness"].is_number());
}

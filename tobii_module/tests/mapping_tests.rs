use api::UnifiedTrackingData;
use tobii_module::ffi::{
    WearableConsumerData, WearableConsumerEye, TOBII_STATE_BOOL_FALSE, TOBII_STATE_BOOL_TRUE,
    TOBII_VALIDITY_INVALID, TOBII_VALIDITY_VALID,
};
use tobii_module::mapping::update_eye_openness;

fn eye(validity: i32, blink: i32) -> WearableConsumerEye {
    WearableConsumerEye {
        pupil_position_in_sensor_area_validity: validity,
        blink,
        ..Default::default()
    }
}

fn data_with_openness(left: f32, right: f32) -> UnifiedTrackingData {
    let mut data = UnifiedTrackingData::default();
    data.eye.left.openness = left;
    data.eye.right.openness = right;
    data
}

#[test]
fn test_valid_blink_closes_eye() {
    let mut data = data_with_openness(0.7, 0.7);
    let consumer = WearableConsumerData {
        left: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_TRUE),
        right: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_TRUE),
        ..Default::default()
    };

    update_eye_openness(&mut data, &consumer);

    assert_eq!(data.eye.left.openness, 0.0);
    assert_eq!(data.eye.right.openness, 0.0);
}

#[test]
fn test_valid_no_blink_opens_eye() {
    let mut data = data_with_openness(0.2, 0.2);
    let consumer = WearableConsumerData {
        left: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_FALSE),
        right: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_FALSE),
        ..Default::default()
    };

    update_eye_openness(&mut data, &consumer);

    assert_eq!(data.eye.left.openness, 1.0);
    assert_eq!(data.eye.right.openness, 1.0);
}

#[test]
fn test_invalid_eye_keeps_previous_value() {
    let mut data = data_with_openness(0.42, 0.13);
    let consumer = WearableConsumerData {
        left: eye(TOBII_VALIDITY_INVALID, TOBII_STATE_BOOL_TRUE),
        right: eye(TOBII_VALIDITY_INVALID, TOBII_STATE_BOOL_FALSE),
        ..Default::default()
    };

    update_eye_openness(&mut data, &consumer);
    update_eye_openness(&mut data, &consumer);

    assert_eq!(data.eye.left.openness, 0.42);
    assert_eq!(data.eye.right.openness, 0.13);
}

#[test]
fn test_eyes_are_mapped_independently() {
    let mut data = data_with_openness(0.5, 0.5);
    let consumer = WearableConsumerData {
        left: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_TRUE),
        right: eye(TOBII_VALIDITY_INVALID, TOBII_STATE_BOOL_TRUE),
        ..Default::default()
    };

    update_eye_openness(&mut data, &consumer);

    assert_eq!(data.eye.left.openness, 0.0);
    assert_eq!(data.eye.right.openness, 0.5);
}

#[test]
fn test_only_openness_is_written() {
    let mut data = UnifiedTrackingData::default();
    data.eye.left.pupil_diameter_mm = 3.5;
    let before = data.clone();
    let consumer = WearableConsumerData {
        left: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_FALSE),
        right: eye(TOBII_VALIDITY_VALID, TOBII_STATE_BOOL_FALSE),
        gaze_direction_combined_validity: TOBII_VALIDITY_VALID,
        gaze_direction_combined_normalized_xyz: [0.0, 0.0, 1.0],
        ..Default::default()
    };

    update_eye_openness(&mut data, &consumer);

    assert_eq!(data.eye.left.gaze, before.eye.left.gaze);
    assert_eq!(data.eye.right.gaze, before.eye.right.gaze);
    assert_eq!(data.eye.left.pupil_diameter_mm, 3.5);
}

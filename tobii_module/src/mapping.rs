use crate::ffi::{WearableConsumerData, WearableConsumerEye};
use api::{UnifiedSingleEyeData, UnifiedTrackingData};

pub const OPENNESS_OPEN: f32 = 1.0;
pub const OPENNESS_CLOSED: f32 = 0.0;

/// Binary openness from the consumer blink flag. Eyes without a valid pupil
/// position keep their previous value.
pub fn update_eye_openness(data: &mut UnifiedTrackingData, consumer: &WearableConsumerData) {
    update_single_eye(&mut data.eye.left, &consumer.left);
    update_single_eye(&mut data.eye.right, &consumer.right);
}

fn update_single_eye(eye: &mut UnifiedSingleEyeData, external: &WearableConsumerEye) {
    if !external.is_pupil_position_valid() {
        return;
    }

    eye.openness = if external.is_blinking() {
        OPENNESS_CLOSED
    } else {
        OPENNESS_OPEN
    };
}

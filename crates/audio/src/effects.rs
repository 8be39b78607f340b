//! Level and envelope effects applied to narration.

use crate::buffer::{dbfs_to_amplitude, AudioBuffer};

/// Headroom left below full scale by [`normalize`].
pub const DEFAULT_HEADROOM_DB: f64 = 0.1;

/// Scale every sample by `gain_db`, clipping to `[-1.0, 1.0]`.
pub fn apply_gain(buffer: &mut AudioBuffer, gain_db: f64) {
    let factor = dbfs_to_amplitude(gain_db) as f32;
    for sample in buffer.samples_mut() {
        *sample = (*sample * factor).clamp(-1.0, 1.0);
    }
}

/// Peak-normalize so the loudest sample sits `headroom_db` below full scale.
///
/// Silent buffers are left untouched.
pub fn normalize(buffer: &mut AudioBuffer, headroom_db: f64) {
    let peak_db = buffer.max_dbfs();
    if !peak_db.is_finite() {
        return;
    }
    let gain = -headroom_db - peak_db;
    tracing::debug!(peak_db, gain_db = gain, "Normalizing audio");
    apply_gain(buffer, gain);
}

/// Linear ramp from silence to full level over the first `duration_ms`.
pub fn fade_in(buffer: &mut AudioBuffer, duration_ms: f64) {
    let format = buffer.format();
    let ch = format.channels as usize;
    let frames = format.frames_for_ms(duration_ms).min(buffer.frame_count());
    if frames == 0 {
        return;
    }
    let samples = buffer.samples_mut();
    for frame in 0..frames {
        let gain = frame as f32 / frames as f32;
        for sample in &mut samples[frame * ch..(frame + 1) * ch] {
            *sample *= gain;
        }
    }
}

/// Linear ramp from full level to silence over the last `duration_ms`.
pub fn fade_out(buffer: &mut AudioBuffer, duration_ms: f64) {
    let format = buffer.format();
    let ch = format.channels as usize;
    let total = buffer.frame_count();
    let frames = format.frames_for_ms(duration_ms).min(total);
    if frames == 0 {
        return;
    }
    let first = total - frames;
    let samples = buffer.samples_mut();
    for frame in first..total {
        let remaining = (total - 1 - frame) as f32;
        let gain = remaining / frames as f32;
        for sample in &mut samples[frame * ch..(frame + 1) * ch] {
            *sample *= gain;
        }
    }
}

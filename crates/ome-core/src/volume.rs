//! Volume clamping and the two-level gain model.

/// Volume a track gets when it is created or reset.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Clamp a volume into `[0, 1]`. `NaN` maps to silence.
pub fn clamp_volume(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Gain applied to a playing track: track volume times global volume, clamped.
pub fn effective_gain(track_volume: f32, global_volume: f32) -> f32 {
    clamp_volume(clamp_volume(track_volume) * clamp_volume(global_volume))
}

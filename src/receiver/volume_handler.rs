//! Volume handling for AirPlay receiver

use std::str::FromStr;

/// AirPlay volume range
/// -144.0 dB = silence
/// 0.0 dB = full volume
const VOLUME_MIN_DB: f32 = -144.0;
const VOLUME_MAX_DB: f32 = 0.0;

/// Volume update from SET_PARAMETER
#[derive(Debug, Clone, Copy)]
pub struct VolumeUpdate {
    /// Volume in dB (-144.0 to 0.0)
    pub db: f32,
    /// Muted (volume = -144)
    pub muted: bool,
    /// Linear volume (0.0 to 1.0)
    pub linear: f32,
}

impl VolumeUpdate {
    /// Create from dB value
    pub fn from_db(db: f32) -> Self {
        let db = db.clamp(VOLUME_MIN_DB, VOLUME_MAX_DB);
        let muted = db <= VOLUME_MIN_DB;
        let linear = db_to_linear(db);

        Self { db, muted, linear }
    }
}

/// Parse volume from SET_PARAMETER body
///
/// Format: "volume: -15.000000\r\n"
pub fn parse_volume_parameter(body: &str) -> Option<VolumeUpdate> {
    for line in body.lines() {
        let line = line.trim();

        if let Some(value_str) = line.strip_prefix("volume:") {
            let value_str = value_str.trim();

            if let Ok(db) = f32::from_str(value_str) {
                return Some(VolumeUpdate::from_db(db));
            }
        }
    }

    None
}

/// Convert dB volume to linear (0.0 to 1.0)
///
/// AirPlay's own scale, not a power law: `linear = (v + 30)/30`, clamped to `[0, 1]`.
/// `-144.0` (mute) always maps to `0.0`.
pub fn db_to_linear(db: f32) -> f32 {
    if db <= VOLUME_MIN_DB {
        return 0.0;
    }

    ((db + 30.0) / 30.0).clamp(0.0, 1.0)
}

/// Convert linear volume (0.0 to 1.0) to dB
///
/// Inverse of [`db_to_linear`]: muted maps to `-144.0`, else `(linear - 1) * 30`.
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return VOLUME_MIN_DB;
    }

    (linear - 1.0) * 30.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_fifteen_db_is_half_linear() {
        assert!((db_to_linear(-15.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mute_maps_to_zero_linear() {
        assert_eq!(db_to_linear(-144.0), 0.0);
        assert_eq!(db_to_linear(-200.0), 0.0);
    }

    #[test]
    fn zero_db_is_full_linear() {
        assert_eq!(db_to_linear(0.0), 1.0);
    }

    #[test]
    fn linear_to_db_round_trips() {
        assert!((linear_to_db(0.5) - (-15.0)).abs() < 1e-4);
        assert_eq!(linear_to_db(0.0), VOLUME_MIN_DB);
        assert_eq!(linear_to_db(1.0), 0.0);
    }

    #[test]
    fn parse_volume_parameter_computes_linear() {
        let update = parse_volume_parameter("volume: -15.000000\r\n").unwrap();
        assert!((update.linear - 0.5).abs() < 1e-6);
        assert!(!update.muted);
    }

    #[test]
    fn parse_volume_parameter_detects_mute() {
        let update = parse_volume_parameter("volume: -144.000000\r\n").unwrap();
        assert!(update.muted);
        assert_eq!(update.linear, 0.0);
    }
}

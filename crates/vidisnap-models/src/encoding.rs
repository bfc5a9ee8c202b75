//! Ranking and thumbnail encoding constants.

/// Number of labels returned to callers.
pub const TOP_K: usize = 3;

/// Thumbnails wider than this are downscaled, preserving aspect ratio.
pub const THUMBNAIL_MAX_WIDTH: u32 = 480;

/// Default JPEG quality for thumbnails.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;

/// Decimal places kept for scores on the wire.
pub const SCORE_DECIMALS: i32 = 4;

/// Round a score to [`SCORE_DECIMALS`] places.
pub fn round_score(score: f32) -> f32 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    ((score as f64 * factor).round() / factor) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123456), 0.1235);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn test_round_score_is_monotonic() {
        let a = round_score(0.50004);
        let b = round_score(0.50006);
        assert!(a <= b);
    }
}

use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct LensConfig {
    /// Override table file; the embedded tables are used when unset.
    pub tables_path: Option<PathBuf>,
    /// Minimum detector confidence for a detection to be used.
    pub confidence_threshold: f32,
    /// Frame limit for `run` (0 = unlimited).
    pub max_frames: usize,
    /// Where `run` writes processed frames.
    pub output_dir: PathBuf,
    /// Recommendation database for `recommend`.
    pub recommendations_path: PathBuf,
}

impl LensConfig {
    /// Load configuration from `LENS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            tables_path: std::env::var("LENS_TABLES_PATH").ok().map(PathBuf::from),
            confidence_threshold: env_f32("LENS_CONFIDENCE_THRESHOLD", 0.5).clamp(0.0, 1.0),
            max_frames: env_usize("LENS_MAX_FRAMES", 0),
            output_dir: std::env::var("LENS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("lens-out")),
            recommendations_path: std::env::var("LENS_RECOMMENDATIONS_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets/database.json")),
        }
    }
}

/// Non-finite values ("NaN", "inf") fall back to `default` like unparsable ones.
fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_helpers_fall_back_on_missing_or_bad_values() {
        std::env::set_var("LENS_TEST_BAD_F32", "not-a-number");
        assert_eq!(env_f32("LENS_TEST_BAD_F32", 0.25), 0.25);
        assert_eq!(env_usize("LENS_TEST_UNSET_USIZE", 7), 7);
        std::env::set_var("LENS_TEST_GOOD_USIZE", "12");
        assert_eq!(env_usize("LENS_TEST_GOOD_USIZE", 7), 12);
    }

    #[test]
    fn test_env_f32_rejects_non_finite() {
        std::env::set_var("LENS_TEST_NAN_F32", "NaN");
        assert_eq!(env_f32("LENS_TEST_NAN_F32", 0.5), 0.5);
        std::env::set_var("LENS_TEST_INF_F32", "inf");
        assert_eq!(env_f32("LENS_TEST_INF_F32", 0.5), 0.5);
        std::env::set_var("LENS_TEST_GOOD_F32", "0.75");
        assert_eq!(env_f32("LENS_TEST_GOOD_F32", 0.5), 0.75);
    }
}

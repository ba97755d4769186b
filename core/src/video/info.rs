use serde::{Deserialize, Serialize};

/// Container-level facts for the uploaded clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub frame_count: u64,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Builds the metadata record, deriving the duration from frame count and rate.
    ///
    /// The rate is floored at 1 for the division so a missing rate never
    /// produces an infinite duration.
    pub fn new(frame_count: u64, frame_rate: f64, width: u32, height: u32) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            0.0
        };
        Self {
            duration_seconds: frame_count as f64 / frame_rate.max(1.0),
            frame_count,
            frame_rate,
            width,
            height,
        }
    }

    /// Metadata for a container that opened but reported no stream properties.
    pub fn unavailable() -> Self {
        Self::new(0, 0.0, 0, 0)
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_divides_frames_by_rate() {
        let info = VideoInfo::new(1500, 30.0, 1920, 1080);
        assert_eq!(info.duration_seconds, 1500.0 / 30.0);
        assert_eq!(info.resolution(), "1920x1080");
    }

    #[test]
    fn duration_guards_missing_or_slow_rates() {
        assert_eq!(VideoInfo::new(240, 0.0, 0, 0).duration_seconds, 240.0);
        assert_eq!(VideoInfo::new(240, 0.5, 0, 0).duration_seconds, 240.0);
        assert_eq!(VideoInfo::new(240, f64::NAN, 0, 0).frame_rate, 0.0);
        assert_eq!(VideoInfo::unavailable().duration_seconds, 0.0);
    }
}

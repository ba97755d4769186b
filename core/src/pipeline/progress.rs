use crate::prelude::PipelineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Complete,
}

/// Progress report published after every runner transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub phase: RunPhase,
    pub stage_index: usize,
    pub stage_name: String,
    pub percent: f64,
    pub tick: u32,
    pub total_ticks: u32,
}

/// Maps elapsed ticks onto stages and a 0..=100 percentage.
///
/// Stage `i` of `N` covers `[100*i/N, 100*(i+1)/N)`; the final tick lands on
/// exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCurve {
    stage_count: u32,
    ticks_per_stage: u32,
}

impl ProgressCurve {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            stage_count: u32::try_from(config.stages.len())
                .unwrap_or(u32::MAX)
                .max(1),
            ticks_per_stage: config.ticks_per_stage.max(1),
        }
    }

    pub fn total_ticks(&self) -> u32 {
        self.stage_count.saturating_mul(self.ticks_per_stage)
    }

    pub fn percent_at(&self, tick: u32) -> f64 {
        let total = self.total_ticks();
        100.0 * tick.min(total) as f64 / total as f64
    }

    pub fn stage_at(&self, tick: u32) -> usize {
        (tick / self.ticks_per_stage).min(self.stage_count - 1) as usize
    }

    pub fn stage_span(&self, stage_index: usize) -> (f64, f64) {
        let count = self.stage_count as f64;
        let index = stage_index as f64;
        (100.0 * index / count, 100.0 * (index + 1.0) / count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_ends_at_one_hundred() {
        let curve = ProgressCurve::new(&PipelineConfig {
            stages: vec!["a".into(), "b".into(), "c".into()],
            ticks_per_stage: 7,
        });
        let values: Vec<f64> = (0..=curve.total_ticks())
            .map(|tick| curve.percent_at(tick))
            .collect();

        assert_eq!(values[0], 0.0);
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(values.iter().filter(|v| **v == 100.0).count(), 1);
        assert_eq!(*values.last().unwrap(), 100.0);
    }

    #[test]
    fn each_stage_owns_an_equal_slice() {
        let config = PipelineConfig::default();
        let curve = ProgressCurve::new(&config);
        for tick in 0..curve.total_ticks() {
            let stage = curve.stage_at(tick);
            let (low, high) = curve.stage_span(stage);
            let percent = curve.percent_at(tick);
            assert!(percent >= low && percent < high, "tick {} at {}", tick, percent);
        }
        assert_eq!(curve.stage_at(curve.total_ticks()), config.stages.len() - 1);
        assert_eq!(curve.stage_span(1), (20.0, 40.0));
    }

    #[test]
    fn oversized_layouts_saturate_instead_of_wrapping() {
        let curve = ProgressCurve::new(&PipelineConfig {
            stages: vec!["a".into(), "b".into(), "c".into()],
            ticks_per_stage: u32::MAX,
        });
        assert_eq!(curve.total_ticks(), u32::MAX);
        assert_eq!(curve.percent_at(u32::MAX), 100.0);
        assert_eq!(curve.stage_at(u32::MAX), 1);
    }
}

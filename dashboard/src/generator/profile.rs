use anyhow::ensure;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use varcore::video::AviMainHeader;

/// Configuration for generating a synthetic AVI clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub frames: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub payload_bytes: usize,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            frames: 1500,
            fps: 25,
            width: 1280,
            height: 720,
            payload_bytes: 4096,
            seed: 0,
        }
    }
}

/// Builds a clip whose header carries the configured stream properties and
/// whose `movi` payload is seeded noise.
pub fn build_clip_from_config(config: &GeneratorConfig) -> anyhow::Result<Vec<u8>> {
    ensure!(config.fps > 0, "generator fps must be positive");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let payload: Vec<u8> = (0..config.payload_bytes).map(|_| rng.gen()).collect();

    let header = AviMainHeader {
        micro_sec_per_frame: 1_000_000 / config.fps,
        total_frames: config.frames,
        width: config.width,
        height: config.height,
    };
    Ok(header.encode_clip(&payload))
}

#[cfg(test)]
pub fn build_clip(frames: u32, fps: u32) -> anyhow::Result<Vec<u8>> {
    let config = GeneratorConfig {
        frames,
        fps,
        ..Default::default()
    };
    build_clip_from_config(&config)
}

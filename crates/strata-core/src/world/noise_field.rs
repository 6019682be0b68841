//! Seeded 2D coherent noise sampler

use fastnoise_lite::FastNoiseLite;
use glam::Vec2;

use super::worldgen_config::NoiseLayerConfig;

/// Deterministic noise field built from a [`NoiseLayerConfig`] and a world seed
///
/// Sampling is a pure function of `(seed, config, x, y)`.
pub struct NoiseField {
    noise: FastNoiseLite,
    offset: Vec2,
}

impl NoiseField {
    pub fn new(config: &NoiseLayerConfig, seed: u64) -> Self {
        Self {
            noise: config.to_fastnoise(seed),
            offset: Vec2::new(config.offset_x, config.offset_y),
        }
    }

    /// Sample at `(x, y)`, roughly in [-1, 1]
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        self.noise.get_noise_2d(x + self.offset.x, y + self.offset.y)
    }

    /// Sample mapped to [0, 1]
    #[inline]
    pub fn sample01(&self, x: f32, y: f32) -> f32 {
        ((self.sample(x, y) + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Sample along a single axis (y fixed at 0)
    #[inline]
    pub fn sample_line(&self, t: f32) -> f32 {
        self.sample(t, 0.0)
    }
}

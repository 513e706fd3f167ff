//! Post-processing settings

use serde::{Deserialize, Serialize};

/// Largest accepted bloom downscale limit, in pixels
pub const MAX_DOWNSCALE_LIMIT: u32 = 65536;

/// How bloom is combined with the scene
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloomMode {
    /// Bloom added on top of the image
    Additive,
    /// Energy-conserving blend between blurred and sharp image
    #[default]
    Scattering,
}

/// Bloom configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Pyramid level cap (0 disables bloom, max 16)
    pub max_iterations: u32,
    /// Smallest pyramid dimension in pixels
    pub downscale_limit: u32,
    pub bicubic_upsampling: bool,
    /// Brightness threshold in gamma space
    pub threshold: f32,
    /// Soft knee (0-1)
    pub threshold_knee: f32,
    pub intensity: f32,
    /// Suppress single-pixel highlights in the prefilter
    pub fade_fireflies: bool,
    pub mode: BloomMode,
    /// Scatter amount for scattering mode (0.05-0.95)
    pub scatter: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            max_iterations: 4,
            downscale_limit: 2,
            bicubic_upsampling: true,
            threshold: 0.5,
            threshold_knee: 0.5,
            intensity: 1.0,
            fade_fireflies: true,
            mode: BloomMode::Scattering,
            scatter: 0.7,
        }
    }
}

impl BloomSettings {
    /// Bloom that only copies the image
    pub fn disabled() -> Self {
        Self {
            intensity: 0.0,
            ..Default::default()
        }
    }

    /// Clamp all values into legal ranges
    pub fn validate(&mut self) {
        self.max_iterations = self.max_iterations.min(16);
        self.downscale_limit = self.downscale_limit.clamp(1, MAX_DOWNSCALE_LIMIT);
        self.threshold = self.threshold.max(0.0);
        self.threshold_knee = self.threshold_knee.clamp(0.0, 1.0);
        self.intensity = self.intensity.max(0.0);
        self.scatter = self.scatter.clamp(0.05, 0.95);
    }
}

/// Tone mapping operator applied by the final pass
///
/// The pipeline only forwards the choice as `_ToneMappingMode`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneMappingMode {
    #[default]
    None,
    Aces,
    Neutral,
    Reinhard,
}

impl ToneMappingMode {
    pub fn shader_value(self) -> i32 {
        match self {
            ToneMappingMode::None => 0,
            ToneMappingMode::Aces => 1,
            ToneMappingMode::Neutral => 2,
            ToneMappingMode::Reinhard => 3,
        }
    }
}

/// Post-processing stack configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFxSettings {
    pub bloom: BloomSettings,
    pub tone_mapping: ToneMappingMode,
}

impl PostFxSettings {
    pub fn validate(&mut self) {
        self.bloom.validate();
    }

    /// Names of fields holding NaN or infinite values
    pub(crate) fn non_finite_fields(&self) -> Vec<&'static str> {
        let bloom = &self.bloom;
        [
            ("post_fx.bloom.threshold", bloom.threshold),
            ("post_fx.bloom.threshold_knee", bloom.threshold_knee),
            ("post_fx.bloom.intensity", bloom.intensity),
            ("post_fx.bloom.scatter", bloom.scatter),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
        .collect()
    }
}

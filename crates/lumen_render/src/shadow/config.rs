//! Shadow Configuration
//!
//! Pipeline-wide shadow settings with serde support. `validate()` clamps
//! every field into its legal range.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Percentage-closer filter kernel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadowFilter {
    #[default]
    Pcf2x2,
    Pcf3x3,
    Pcf5x5,
    Pcf7x7,
}

impl ShadowFilter {
    /// Zero-based filter index; the filter size in texels is `index + 1`
    pub fn index(self) -> usize {
        match self {
            ShadowFilter::Pcf2x2 => 0,
            ShadowFilter::Pcf3x3 => 1,
            ShadowFilter::Pcf5x5 => 2,
            ShadowFilter::Pcf7x7 => 3,
        }
    }

    /// Keyword slot for keyword groups that omit the 2x2 default
    pub fn keyword_index(self) -> Option<usize> {
        self.index().checked_sub(1)
    }
}

/// How neighbouring cascades blend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CascadeBlendMode {
    #[default]
    Hard,
    Soft,
    Dither,
}

impl CascadeBlendMode {
    pub fn keyword_index(self) -> Option<usize> {
        match self {
            CascadeBlendMode::Hard => None,
            CascadeBlendMode::Soft => Some(0),
            CascadeBlendMode::Dither => Some(1),
        }
    }
}

/// When baked shadowmask data replaces real-time shadows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadowmaskMode {
    /// Real-time shadows up to max distance, baked beyond
    #[default]
    Distance,
    /// Static casters always use the baked mask
    Always,
}

impl ShadowmaskMode {
    pub fn keyword_index(self) -> usize {
        match self {
            ShadowmaskMode::Always => 0,
            ShadowmaskMode::Distance => 1,
        }
    }
}

/// Directional shadow atlas settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalShadowSettings {
    /// Atlas resolution (power of 2)
    pub atlas_size: u32,
    pub filter: ShadowFilter,
    /// Cascades per light (1-4)
    pub cascade_count: u32,
    pub cascade_ratio1: f32,
    pub cascade_ratio2: f32,
    pub cascade_ratio3: f32,
    /// Fraction of the last cascade over which shadows fade out
    pub cascade_fade: f32,
    pub cascade_blend: CascadeBlendMode,
}

impl Default for DirectionalShadowSettings {
    fn default() -> Self {
        Self {
            atlas_size: 1024,
            filter: ShadowFilter::Pcf2x2,
            cascade_count: 4,
            cascade_ratio1: 0.1,
            cascade_ratio2: 0.25,
            cascade_ratio3: 0.5,
            cascade_fade: 0.1,
            cascade_blend: CascadeBlendMode::Hard,
        }
    }
}

impl DirectionalShadowSettings {
    /// Split ratios handed to the culling collaborator
    pub fn cascade_ratios(&self) -> Vec3 {
        Vec3::new(self.cascade_ratio1, self.cascade_ratio2, self.cascade_ratio3)
    }
}

/// Point and spot light shadow atlas settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherShadowSettings {
    pub atlas_size: u32,
    pub filter: ShadowFilter,
}

impl Default for OtherShadowSettings {
    fn default() -> Self {
        Self {
            atlas_size: 1024,
            filter: ShadowFilter::Pcf2x2,
        }
    }
}

/// Global shadow configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Maximum shadow distance from the camera
    pub max_distance: f32,
    /// Fraction of max distance over which shadows fade
    pub distance_fade: f32,
    pub shadowmask_mode: ShadowmaskMode,
    pub directional: DirectionalShadowSettings,
    pub other: OtherShadowSettings,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            distance_fade: 0.1,
            shadowmask_mode: ShadowmaskMode::Distance,
            directional: DirectionalShadowSettings::default(),
            other: OtherShadowSettings::default(),
        }
    }
}

impl ShadowSettings {
    /// High-resolution preset with soft cascade blending
    pub fn high_quality() -> Self {
        Self {
            max_distance: 150.0,
            directional: DirectionalShadowSettings {
                atlas_size: 4096,
                filter: ShadowFilter::Pcf5x5,
                cascade_blend: CascadeBlendMode::Soft,
                ..Default::default()
            },
            other: OtherShadowSettings {
                atlas_size: 2048,
                filter: ShadowFilter::Pcf5x5,
            },
            ..Default::default()
        }
    }

    /// Clamp all values into legal ranges
    pub fn validate(&mut self) {
        self.max_distance = self.max_distance.max(0.001);
        self.distance_fade = self.distance_fade.clamp(0.001, 1.0);

        let dir = &mut self.directional;
        dir.atlas_size = clamp_atlas_size(dir.atlas_size);
        dir.cascade_count = dir.cascade_count.clamp(1, 4);
        dir.cascade_ratio1 = dir.cascade_ratio1.clamp(0.0, 1.0);
        dir.cascade_ratio2 = dir.cascade_ratio2.clamp(0.0, 1.0);
        dir.cascade_ratio3 = dir.cascade_ratio3.clamp(0.0, 1.0);
        dir.cascade_fade = dir.cascade_fade.clamp(0.001, 1.0);

        self.other.atlas_size = clamp_atlas_size(self.other.atlas_size);
    }

    /// Names of fields holding NaN or infinite values
    pub(crate) fn non_finite_fields(&self) -> Vec<&'static str> {
        let dir = &self.directional;
        [
            ("shadows.max_distance", self.max_distance),
            ("shadows.distance_fade", self.distance_fade),
            ("shadows.directional.cascade_ratio1", dir.cascade_ratio1),
            ("shadows.directional.cascade_ratio2", dir.cascade_ratio2),
            ("shadows.directional.cascade_ratio3", dir.cascade_ratio3),
            ("shadows.directional.cascade_fade", dir.cascade_fade),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
        .collect()
    }
}

fn clamp_atlas_size(size: u32) -> u32 {
    size.clamp(256, 8192).next_power_of_two()
}

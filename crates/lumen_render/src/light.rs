//! Visible light records
//!
//! Produced by the host's culling each frame and read-only to the core.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Light type with per-variant data
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    Spot {
        /// Full outer cone angle in degrees
        spot_angle: f32,
        /// Full inner cone angle in degrees
        inner_spot_angle: f32,
    },
}

impl LightKind {
    pub fn is_directional(&self) -> bool {
        matches!(self, LightKind::Directional)
    }
}

/// Shadow casting mode of a light
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightShadows {
    #[default]
    None,
    Hard,
    Soft,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightmapBakeType {
    #[default]
    Realtime,
    Mixed,
    Baked,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixedLightingMode {
    #[default]
    IndirectOnly,
    Shadowmask,
    Subtractive,
}

/// Baked lighting state of a light
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BakingOutput {
    pub bake_type: LightmapBakeType,
    pub mixed_mode: MixedLightingMode,
    /// Shadowmask channel, -1 when the light has none
    pub occlusion_mask_channel: i32,
}

impl Default for BakingOutput {
    fn default() -> Self {
        Self {
            bake_type: LightmapBakeType::Realtime,
            mixed_mode: MixedLightingMode::IndirectOnly,
            occlusion_mask_channel: -1,
        }
    }
}

impl BakingOutput {
    /// Mixed light whose shadows are baked into a shadowmask channel
    pub fn shadowmask(channel: i32) -> Self {
        Self {
            bake_type: LightmapBakeType::Mixed,
            mixed_mode: MixedLightingMode::Shadowmask,
            occlusion_mask_channel: channel,
        }
    }

    pub fn uses_shadowmask(&self) -> bool {
        self.bake_type == LightmapBakeType::Mixed && self.mixed_mode == MixedLightingMode::Shadowmask
    }
}

/// A light that survived culling this frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleLight {
    pub kind: LightKind,
    pub local_to_world: Mat4,
    /// Linear color
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub shadows: LightShadows,
    pub shadow_strength: f32,
    /// Slope-scaled depth bias
    pub shadow_bias: f32,
    pub shadow_normal_bias: f32,
    pub shadow_near_plane: f32,
    pub baking: BakingOutput,
}

impl VisibleLight {
    /// Light of the given kind at the origin facing +Z, no shadows
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            local_to_world: Mat4::IDENTITY,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            shadows: LightShadows::None,
            shadow_strength: 1.0,
            shadow_bias: 0.0,
            shadow_normal_bias: 0.0,
            shadow_near_plane: 0.1,
            baking: BakingOutput::default(),
        }
    }

    pub fn directional(direction: Vec3) -> Self {
        Self {
            local_to_world: facing(Vec3::ZERO, direction),
            ..Self::new(LightKind::Directional)
        }
    }

    pub fn point(position: Vec3, range: f32) -> Self {
        Self {
            local_to_world: Mat4::from_translation(position),
            range,
            ..Self::new(LightKind::Point)
        }
    }

    pub fn spot(position: Vec3, direction: Vec3, range: f32, spot_angle: f32, inner_spot_angle: f32) -> Self {
        Self {
            local_to_world: facing(position, direction),
            range,
            ..Self::new(LightKind::Spot {
                spot_angle,
                inner_spot_angle,
            })
        }
    }

    /// Enable shadows with the given strength and biases
    pub fn with_shadows(mut self, shadows: LightShadows, strength: f32, slope_bias: f32, normal_bias: f32) -> Self {
        self.shadows = shadows;
        self.shadow_strength = strength;
        self.shadow_bias = slope_bias;
        self.shadow_normal_bias = normal_bias;
        self
    }

    pub fn with_color(mut self, color: Vec3, intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    pub fn with_baking(mut self, baking: BakingOutput) -> Self {
        self.baking = baking;
        self
    }

    /// Color premultiplied by intensity
    pub fn final_color(&self) -> Vec4 {
        (self.color * self.intensity).extend(1.0)
    }

    /// World-space position (translation column)
    pub fn position(&self) -> Vec3 {
        self.local_to_world.w_axis.truncate()
    }

    /// World-space forward direction (local +Z)
    pub fn forward(&self) -> Vec3 {
        self.local_to_world.z_axis.truncate()
    }

    /// True if this light wants real-time shadows this frame
    pub fn casts_shadows(&self) -> bool {
        self.shadows != LightShadows::None && self.shadow_strength > 0.0
    }
}

/// Transform placing local +Z along `direction` at `position`
pub fn facing(position: Vec3, direction: Vec3) -> Mat4 {
    let forward = direction.normalize_or_zero();
    let reference = if forward.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let right = reference.cross(forward).normalize_or_zero();
    let up = forward.cross(right);
    Mat4::from_cols(
        right.extend(0.0),
        up.extend(0.0),
        forward.extend(0.0),
        position.extend(1.0),
    )
}

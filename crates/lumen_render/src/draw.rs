//! Draw submission settings
//!
//! Parameters the orchestrator hands to the host when it asks for culled
//! renderers or shadow casters to be drawn.

use crate::context::ShadowSplitData;

/// Per-object data the host must supply to lit shaders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PerObjectData(u32);

impl PerObjectData {
    pub const NONE: Self = Self(0);
    pub const LIGHTMAPS: Self = Self(1 << 0);
    pub const SHADOW_MASK: Self = Self(1 << 1);
    /// Interpolated spherical-harmonic ambient light
    pub const AMBIENT_SH: Self = Self(1 << 2);
    pub const OCCLUSION_SH: Self = Self(1 << 3);
    /// Volume-sampled variants of the two above
    pub const AMBIENT_SH_VOLUME: Self = Self(1 << 4);
    pub const OCCLUSION_SH_VOLUME: Self = Self(1 << 5);
    /// Per-object light count and offsets
    pub const LIGHT_DATA: Self = Self(1 << 6);
    /// Per-object light index list
    pub const LIGHT_INDICES: Self = Self(1 << 7);

    /// Everything the baked-GI path needs
    pub const BAKED_LIGHTING: Self = Self(
        Self::LIGHTMAPS.0
            | Self::SHADOW_MASK.0
            | Self::AMBIENT_SH.0
            | Self::OCCLUSION_SH.0
            | Self::AMBIENT_SH_VOLUME.0
            | Self::OCCLUSION_SH_VOLUME.0,
    );

    /// Per-object light lists
    pub const PER_OBJECT_LIGHTS: Self = Self(Self::LIGHT_DATA.0 | Self::LIGHT_INDICES.0);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if all specified flags are set
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Set flags based on condition
    #[inline]
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl core::ops::BitOr for PerObjectData {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for PerObjectData {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Sort order for a draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortingCriteria {
    /// Front to back, grouped by material
    CommonOpaque,
    /// Back to front
    CommonTransparent,
    None,
}

/// Inclusive render queue range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderQueueRange {
    pub lower: u32,
    pub upper: u32,
}

impl RenderQueueRange {
    pub const OPAQUE: Self = Self { lower: 0, upper: 2500 };
    pub const TRANSPARENT: Self = Self { lower: 2501, upper: 5000 };
    pub const ALL: Self = Self { lower: 0, upper: 5000 };

    pub fn contains(&self, queue: u32) -> bool {
        queue >= self.lower && queue <= self.upper
    }
}

/// Shader pass tag of unlit materials
pub const UNLIT_SHADER_TAG: &str = "SRPDefaultUnlit";
/// Shader pass tag of lit materials
pub const LIT_SHADER_TAG: &str = "CustomLit";

/// Pass tags of shaders this pipeline cannot render
pub const LEGACY_SHADER_TAGS: [&str; 6] = [
    "Always",
    "ForwardBase",
    "PrepassBase",
    "Vertex",
    "VertexLMRGBM",
    "VertexLM",
];

/// How culled renderers are drawn
#[derive(Clone, Debug, PartialEq)]
pub struct DrawingSettings {
    pub shader_passes: Vec<&'static str>,
    pub sorting: SortingCriteria,
    pub enable_dynamic_batching: bool,
    pub enable_instancing: bool,
    pub per_object_data: PerObjectData,
    /// Material replacing every renderer's own (error shader)
    pub override_material: Option<&'static str>,
}

impl DrawingSettings {
    pub fn new(shader_passes: &[&'static str], sorting: SortingCriteria) -> Self {
        Self {
            shader_passes: shader_passes.to_vec(),
            sorting,
            enable_dynamic_batching: false,
            enable_instancing: false,
            per_object_data: PerObjectData::NONE,
            override_material: None,
        }
    }
}

/// Which renderers a draw considers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilteringSettings {
    pub render_queue_range: RenderQueueRange,
}

impl FilteringSettings {
    pub fn opaque() -> Self {
        Self {
            render_queue_range: RenderQueueRange::OPAQUE,
        }
    }

    pub fn transparent() -> Self {
        Self {
            render_queue_range: RenderQueueRange::TRANSPARENT,
        }
    }

    pub fn all() -> Self {
        Self {
            render_queue_range: RenderQueueRange::ALL,
        }
    }
}

/// Projection used when rendering a shadow tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadowProjection {
    Orthographic,
    Perspective,
}

/// Shadow caster draw for a single atlas tile
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowDrawingSettings {
    pub visible_light_index: usize,
    pub projection: ShadowProjection,
    pub split_data: ShadowSplitData,
}

/// Gizmo layer relative to post-processing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GizmoSubset {
    PreImageEffects,
    PostImageEffects,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_object_flags() {
        let mut flags = PerObjectData::BAKED_LIGHTING;
        assert!(flags.contains(PerObjectData::SHADOW_MASK));
        assert!(!flags.contains(PerObjectData::LIGHT_INDICES));

        flags.set(PerObjectData::PER_OBJECT_LIGHTS, true);
        assert!(flags.contains(PerObjectData::LIGHT_DATA | PerObjectData::LIGHT_INDICES));

        flags.set(PerObjectData::PER_OBJECT_LIGHTS, false);
        assert_eq!(flags, PerObjectData::BAKED_LIGHTING);
    }

    #[test]
    fn test_queue_ranges_disjoint() {
        assert!(RenderQueueRange::OPAQUE.contains(2000));
        assert!(RenderQueueRange::OPAQUE.contains(2500));
        assert!(!RenderQueueRange::OPAQUE.contains(3000));
        assert!(RenderQueueRange::TRANSPARENT.contains(3000));
        assert!(!RenderQueueRange::TRANSPARENT.contains(2500));
    }

    #[test]
    fn test_drawing_settings_defaults() {
        let settings = DrawingSettings::new(&[UNLIT_SHADER_TAG, LIT_SHADER_TAG], SortingCriteria::CommonOpaque);
        assert_eq!(settings.shader_passes, vec!["SRPDefaultUnlit", "CustomLit"]);
        assert!(settings.per_object_data.is_empty());
        assert!(settings.override_material.is_none());
    }
}

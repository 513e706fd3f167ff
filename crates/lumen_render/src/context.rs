//! Host collaborator interfaces
//!
//! The renderer core is backend-agnostic. A host engine provides:
//!
//! - [`RenderContext`]: culling, command execution and the draws that need
//!   scene knowledge (renderers, shadow casters, skybox, gizmos)
//! - [`CullingResults`]: the visible light set of one camera plus the
//!   shadow projection math for those lights
//!
//! Everything else (light marshaling, atlas layout, bloom, ordering) lives
//! in the core and is expressed as recorded commands.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::command::CommandBuffer;
use crate::draw::{DrawingSettings, FilteringSettings, GizmoSubset, ShadowDrawingSettings};
use crate::light::VisibleLight;

/// Axis-aligned bounds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    /// Grow to contain `other`
    pub fn encapsulate(&mut self, other: &Bounds) {
        let min = self.min().min(other.min());
        let max = self.max().max(other.max());
        self.center = (min + max) * 0.5;
        self.extents = (max - min) * 0.5;
    }

    /// Squared distance from `point` to the box (0 inside)
    pub fn distance_squared(&self, point: Vec3) -> f32 {
        let d = (point - self.center).abs() - self.extents;
        d.max(Vec3::ZERO).length_squared()
    }
}

/// Culling data for one shadow split
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShadowSplitData {
    /// xyz center, w radius
    pub culling_sphere: Vec4,
    /// Fraction of the previous cascade's sphere whose casters can be culled
    pub shadow_cascade_blend_culling_factor: f32,
}

/// View, projection and culling split for one shadow tile
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub split: ShadowSplitData,
}

/// Cube map face rendered for a point light shadow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubemapFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubemapFace {
    pub const ALL: [CubemapFace; 6] = [
        CubemapFace::PositiveX,
        CubemapFace::NegativeX,
        CubemapFace::PositiveY,
        CubemapFace::NegativeY,
        CubemapFace::PositiveZ,
        CubemapFace::NegativeZ,
    ];

    /// Direction the face looks along
    pub fn direction(self) -> Vec3 {
        match self {
            CubemapFace::PositiveX => Vec3::X,
            CubemapFace::NegativeX => Vec3::NEG_X,
            CubemapFace::PositiveY => Vec3::Y,
            CubemapFace::NegativeY => Vec3::NEG_Y,
            CubemapFace::PositiveZ => Vec3::Z,
            CubemapFace::NegativeZ => Vec3::NEG_Z,
        }
    }

    /// Up vector conventionally used for the face
    pub fn up(self) -> Vec3 {
        match self {
            CubemapFace::PositiveY => Vec3::Z,
            CubemapFace::NegativeY => Vec3::NEG_Z,
            _ => Vec3::NEG_Y,
        }
    }
}

/// Result of culling one camera
pub trait CullingResults {
    /// Lights that survived culling, in host order
    fn visible_lights(&self) -> &[VisibleLight];

    /// Bounds of shadow casters affecting a light, `None` if there are none
    fn shadow_caster_bounds(&self, visible_light_index: usize) -> Option<Bounds>;

    /// Matrices for one cascade of a directional light
    fn compute_directional_shadow_matrices(
        &self,
        visible_light_index: usize,
        cascade_index: usize,
        cascade_count: usize,
        split_ratios: Vec3,
        tile_size: u32,
        near_plane_offset: f32,
    ) -> Option<ShadowMatrices>;

    /// Matrices for a spot light
    fn compute_spot_shadow_matrices(&self, visible_light_index: usize) -> Option<ShadowMatrices>;

    /// Matrices for one cube face of a point light
    ///
    /// `fov_bias` widens the 90 degree face frustum to cover filter taps.
    fn compute_point_shadow_matrices(
        &self,
        visible_light_index: usize,
        face: CubemapFace,
        fov_bias: f32,
    ) -> Option<ShadowMatrices>;

    /// Remap visible light indices to other-light array indices (-1 = skip)
    fn set_light_index_map(&mut self, map: &[i32]);
}

/// Host-side rendering context for a frame
pub trait RenderContext {
    type Culling: CullingResults;

    /// Cull the scene for a camera; `None` skips the camera
    fn cull(&mut self, camera: &Camera, max_shadow_distance: f32) -> Option<Self::Culling>;

    /// Bind the camera's view/projection and related globals
    fn setup_camera_properties(&mut self, camera: &Camera);

    /// Execute recorded commands in order
    fn execute_command_buffer(&mut self, buffer: &CommandBuffer);

    fn draw_renderers(
        &mut self,
        culling: &Self::Culling,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    );

    fn draw_shadows(&mut self, culling: &Self::Culling, settings: &ShadowDrawingSettings);

    fn draw_skybox(&mut self, camera: &Camera);

    fn draw_gizmos(&mut self, camera: &Camera, subset: GizmoSubset);

    /// Inject UI geometry into the scene view camera
    fn emit_world_geometry_for_scene_view(&mut self, _camera: &Camera) {}

    /// True if the depth buffer is reversed (1 near, 0 far)
    fn uses_reversed_z_buffer(&self) -> bool {
        true
    }

    /// Submit everything queued for the current camera
    fn submit(&mut self);
}

//! In-crate mock host used by unit tests

use glam::{Mat4, Vec3, Vec4};

use crate::camera::Camera;
use crate::command::{CommandBuffer, RenderCommand};
use crate::context::{Bounds, CubemapFace, CullingResults, RenderContext, ShadowMatrices, ShadowSplitData};
use crate::draw::{DrawingSettings, FilteringSettings, GizmoSubset, ShadowDrawingSettings};
use crate::light::VisibleLight;
use crate::property::ShaderId;

/// Culling results with canned shadow matrices
#[derive(Clone, Debug, Default)]
pub(crate) struct MockCulling {
    pub lights: Vec<VisibleLight>,
    /// Visible light indices that report no shadow casters
    pub no_casters: Vec<usize>,
    pub index_map: Option<Vec<i32>>,
}

impl MockCulling {
    pub fn new(lights: Vec<VisibleLight>) -> Self {
        Self {
            lights,
            ..Default::default()
        }
    }
}

impl CullingResults for MockCulling {
    fn visible_lights(&self) -> &[VisibleLight] {
        &self.lights
    }

    fn shadow_caster_bounds(&self, visible_light_index: usize) -> Option<Bounds> {
        if self.no_casters.contains(&visible_light_index) {
            None
        } else {
            Some(Bounds::new(Vec3::ZERO, Vec3::splat(5.0)))
        }
    }

    fn compute_directional_shadow_matrices(
        &self,
        visible_light_index: usize,
        cascade_index: usize,
        _cascade_count: usize,
        _split_ratios: Vec3,
        _tile_size: u32,
        _near_plane_offset: f32,
    ) -> Option<ShadowMatrices> {
        let radius = 10.0 * (cascade_index + 1) as f32;
        Some(ShadowMatrices {
            view: Mat4::from_translation(Vec3::new(visible_light_index as f32, cascade_index as f32, 0.0)),
            projection: Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.0, radius * 4.0),
            split: ShadowSplitData {
                culling_sphere: Vec4::new(0.0, 0.0, cascade_index as f32, radius),
                shadow_cascade_blend_culling_factor: 0.0,
            },
        })
    }

    fn compute_spot_shadow_matrices(&self, visible_light_index: usize) -> Option<ShadowMatrices> {
        Some(ShadowMatrices {
            view: Mat4::from_translation(Vec3::new(visible_light_index as f32, 0.0, 0.0)),
            projection: Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 20.0),
            split: ShadowSplitData::default(),
        })
    }

    fn compute_point_shadow_matrices(
        &self,
        visible_light_index: usize,
        face: CubemapFace,
        fov_bias: f32,
    ) -> Option<ShadowMatrices> {
        let eye = Vec3::new(visible_light_index as f32, 0.0, 0.0);
        Some(ShadowMatrices {
            view: Mat4::look_at_rh(eye, eye + face.direction(), face.up()),
            projection: Mat4::perspective_rh((90.0 + fov_bias).to_radians(), 1.0, 0.1, 20.0),
            split: ShadowSplitData::default(),
        })
    }

    fn set_light_index_map(&mut self, map: &[i32]) {
        self.index_map = Some(map.to_vec());
    }
}

/// Context that records every command and draw
#[derive(Debug, Default)]
pub(crate) struct MockContext {
    /// Culling returned by `cull`; `None` simulates a culling failure
    pub scene: Option<MockCulling>,
    pub commands: Vec<(String, RenderCommand)>,
    pub shadow_draws: Vec<ShadowDrawingSettings>,
    pub draws: Vec<(DrawingSettings, FilteringSettings)>,
    pub skyboxes: u32,
    pub gizmos: Vec<GizmoSubset>,
    pub camera_setups: u32,
    pub submits: u32,
}

impl MockContext {
    pub fn with_scene(scene: MockCulling) -> Self {
        Self {
            scene: Some(scene),
            ..Default::default()
        }
    }

    pub fn count(&self, predicate: impl Fn(&RenderCommand) -> bool) -> usize {
        self.commands.iter().filter(|(_, c)| predicate(c)).count()
    }

    pub fn allocations(&self) -> usize {
        self.count(|c| matches!(c, RenderCommand::GetTemporaryTarget { .. }))
    }

    pub fn releases(&self) -> usize {
        self.count(|c| matches!(c, RenderCommand::ReleaseTemporaryTarget(_)))
    }

    pub fn fullscreen_passes(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|(_, c)| match c {
                RenderCommand::DrawFullscreen { pass } => Some(*pass),
                _ => None,
            })
            .collect()
    }

    /// Last vector array uploaded under `id`
    pub fn vector_array(&self, id: ShaderId) -> Option<&[Vec4]> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            RenderCommand::SetGlobalVectorArray { id: i, values } if *i == id => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Last matrix array uploaded under `id`
    pub fn matrix_array(&self, id: ShaderId) -> Option<&[Mat4]> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            RenderCommand::SetGlobalMatrixArray { id: i, values } if *i == id => Some(values.as_slice()),
            _ => None,
        })
    }

    pub fn int(&self, id: ShaderId) -> Option<i32> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            RenderCommand::SetGlobalInt { id: i, value } if *i == id => Some(*value),
            _ => None,
        })
    }

    pub fn float(&self, id: ShaderId) -> Option<f32> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            RenderCommand::SetGlobalFloat { id: i, value } if *i == id => Some(*value),
            _ => None,
        })
    }

    pub fn vector(&self, id: ShaderId) -> Option<Vec4> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            RenderCommand::SetGlobalVector { id: i, value } if *i == id => Some(*value),
            _ => None,
        })
    }

    /// Last state of a keyword
    pub fn keyword(&self, keyword: &str) -> Option<bool> {
        self.commands.iter().rev().find_map(|(_, c)| match c {
            RenderCommand::SetKeyword { keyword: k, enabled } if *k == keyword => Some(*enabled),
            _ => None,
        })
    }
}

impl RenderContext for MockContext {
    type Culling = MockCulling;

    fn cull(&mut self, _camera: &Camera, _max_shadow_distance: f32) -> Option<MockCulling> {
        self.scene.clone()
    }

    fn setup_camera_properties(&mut self, _camera: &Camera) {
        self.camera_setups += 1;
    }

    fn execute_command_buffer(&mut self, buffer: &CommandBuffer) {
        let name = buffer.name().to_string();
        self.commands
            .extend(buffer.commands().iter().cloned().map(|c| (name.clone(), c)));
    }

    fn draw_renderers(&mut self, _culling: &MockCulling, drawing: &DrawingSettings, filtering: &FilteringSettings) {
        self.draws.push((drawing.clone(), *filtering));
    }

    fn draw_shadows(&mut self, _culling: &MockCulling, settings: &ShadowDrawingSettings) {
        self.shadow_draws.push(*settings);
    }

    fn draw_skybox(&mut self, _camera: &Camera) {
        self.skyboxes += 1;
    }

    fn draw_gizmos(&mut self, _camera: &Camera, subset: GizmoSubset) {
        self.gizmos.push(subset);
    }

    fn submit(&mut self) {
        self.submits += 1;
    }
}

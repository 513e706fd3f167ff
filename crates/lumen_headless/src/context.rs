//! Recording render context
//!
//! [`HeadlessContext`] implements the host side of the renderer without a
//! GPU. It culls against a [`SceneDescription`], applies every recorded
//! command to a mirror of the global shader state and keeps an event log
//! that tests and the preview tool inspect afterwards.
//!
//! Temporary target misuse is reported, not fatal: each violation is
//! logged at error level and kept until [`HeadlessContext::take_violations`].

use std::collections::HashMap;

use glam::{Mat4, Vec4};
use lumen_render::post_fx::bloom::FX_SOURCE;
use lumen_render::{
    Camera, CommandBuffer, DrawingSettings, FilteringSettings, GizmoSubset, RenderCommand, RenderContext,
    RenderTargetId, ShaderId, ShadowDrawingSettings,
};

use crate::culling::SceneCulling;
use crate::scene::SceneDescription;
use crate::tracker::{HeadlessError, HeadlessResult, TargetTracker};

/// Something the renderer asked the host to do
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    Cull {
        camera: String,
        shadow_distance: f32,
        success: bool,
    },
    SetupCamera(String),
    /// A command executed from the named buffer
    Command {
        buffer: String,
        command: RenderCommand,
    },
    DrawRenderers {
        drawing: DrawingSettings,
        filtering: FilteringSettings,
    },
    DrawShadows(ShadowDrawingSettings),
    DrawSkybox(String),
    DrawGizmos(GizmoSubset),
    SceneViewGeometry(String),
    Submit,
}

/// Mirror of the global shader state
#[derive(Clone, Debug, Default)]
pub struct GlobalState {
    ints: HashMap<ShaderId, i32>,
    floats: HashMap<ShaderId, f32>,
    vectors: HashMap<ShaderId, Vec4>,
    vector_arrays: HashMap<ShaderId, Vec<Vec4>>,
    matrix_arrays: HashMap<ShaderId, Vec<Mat4>>,
    textures: HashMap<ShaderId, RenderTargetId>,
    keywords: HashMap<&'static str, bool>,
    render_target: Option<RenderTargetId>,
}

impl GlobalState {
    pub fn int(&self, id: ShaderId) -> Option<i32> {
        self.ints.get(&id).copied()
    }

    pub fn float(&self, id: ShaderId) -> Option<f32> {
        self.floats.get(&id).copied()
    }

    pub fn vector(&self, id: ShaderId) -> Option<Vec4> {
        self.vectors.get(&id).copied()
    }

    pub fn vector_array(&self, id: ShaderId) -> Option<&[Vec4]> {
        self.vector_arrays.get(&id).map(Vec::as_slice)
    }

    pub fn matrix_array(&self, id: ShaderId) -> Option<&[Mat4]> {
        self.matrix_arrays.get(&id).map(Vec::as_slice)
    }

    pub fn texture(&self, id: ShaderId) -> Option<RenderTargetId> {
        self.textures.get(&id).copied()
    }

    /// Keyword state; `None` if never touched
    pub fn keyword(&self, keyword: &str) -> Option<bool> {
        self.keywords.get(keyword).copied()
    }

    /// Current render target
    pub fn render_target(&self) -> Option<RenderTargetId> {
        self.render_target
    }
}

/// Host context that records instead of rendering
#[derive(Debug)]
pub struct HeadlessContext {
    scene: SceneDescription,
    events: Vec<HostEvent>,
    globals: GlobalState,
    tracker: TargetTracker,
    violations: Vec<HeadlessError>,
    samples: Vec<String>,
    uploaded_bytes: u64,
    submits: u32,
    reversed_z: bool,
    culling_enabled: bool,
}

impl HeadlessContext {
    pub fn new(scene: SceneDescription) -> Self {
        Self {
            scene,
            events: Vec::new(),
            globals: GlobalState::default(),
            tracker: TargetTracker::new(),
            violations: Vec::new(),
            samples: Vec::new(),
            uploaded_bytes: 0,
            submits: 0,
            reversed_z: true,
            culling_enabled: true,
        }
    }

    /// Select the depth convention reported to the renderer
    pub fn with_reversed_z(mut self, reversed_z: bool) -> Self {
        self.reversed_z = reversed_z;
        self
    }

    /// When disabled every `cull` call fails
    pub fn set_culling_enabled(&mut self, enabled: bool) {
        self.culling_enabled = enabled;
    }

    pub fn scene(&self) -> &SceneDescription {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneDescription {
        &mut self.scene
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Forget recorded events, keeping global state and counters
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Executed commands with the name of their buffer
    pub fn commands(&self) -> impl Iterator<Item = (&str, &RenderCommand)> {
        self.events.iter().filter_map(|event| match event {
            HostEvent::Command { buffer, command } => Some((buffer.as_str(), command)),
            _ => None,
        })
    }

    /// Material pass of every full-screen draw, in order
    pub fn fullscreen_passes(&self) -> Vec<u32> {
        self.commands()
            .filter_map(|(_, command)| match command {
                RenderCommand::DrawFullscreen { pass } => Some(*pass),
                _ => None,
            })
            .collect()
    }

    pub fn shadow_draws(&self) -> Vec<&ShadowDrawingSettings> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::DrawShadows(settings) => Some(settings),
                _ => None,
            })
            .collect()
    }

    pub fn globals(&self) -> &GlobalState {
        &self.globals
    }

    pub fn tracker(&self) -> &TargetTracker {
        &self.tracker
    }

    pub fn violations(&self) -> &[HeadlessError] {
        &self.violations
    }

    pub fn take_violations(&mut self) -> Vec<HeadlessError> {
        std::mem::take(&mut self.violations)
    }

    /// Bytes of vector and matrix arrays uploaded so far
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn submits(&self) -> u32 {
        self.submits
    }

    fn record(&mut self, result: HeadlessResult<()>) {
        if let Err(err) = result {
            log::error!("{}", err);
            self.violations.push(err);
        }
    }

    fn check_target(&mut self, target: RenderTargetId) {
        if let RenderTargetId::Temporary(id) = target {
            let result = self.tracker.check_live(id);
            self.record(result);
        }
    }

    fn apply(&mut self, command: &RenderCommand) {
        match command {
            RenderCommand::BeginSample(name) => self.samples.push(name.clone()),
            RenderCommand::EndSample(name) => {
                if self.samples.last() == Some(name) {
                    self.samples.pop();
                } else {
                    log::warn!("Sample '{}' ended while {:?} is open", name, self.samples.last());
                }
            }
            RenderCommand::GetTemporaryTarget { id, desc } => {
                let result = self.tracker.allocate(*id, *desc);
                self.record(result);
            }
            RenderCommand::ReleaseTemporaryTarget(id) => {
                let result = self.tracker.release(*id);
                self.record(result);
            }
            RenderCommand::SetRenderTarget { target, .. } => {
                self.check_target(*target);
                self.globals.render_target = Some(*target);
            }
            RenderCommand::SetGlobalTexture { id, target } => {
                self.check_target(*target);
                self.globals.textures.insert(*id, *target);
            }
            RenderCommand::SetGlobalInt { id, value } => {
                self.globals.ints.insert(*id, *value);
            }
            RenderCommand::SetGlobalFloat { id, value } => {
                self.globals.floats.insert(*id, *value);
            }
            RenderCommand::SetGlobalVector { id, value } => {
                self.globals.vectors.insert(*id, *value);
            }
            RenderCommand::SetGlobalVectorArray { id, values } => {
                self.uploaded_bytes += bytemuck::cast_slice::<Vec4, u8>(values).len() as u64;
                self.globals.vector_arrays.insert(*id, values.clone());
            }
            RenderCommand::SetGlobalMatrixArray { id, values } => {
                self.uploaded_bytes += bytemuck::cast_slice::<Mat4, u8>(values).len() as u64;
                self.globals.matrix_arrays.insert(*id, values.clone());
            }
            RenderCommand::SetKeyword { keyword, enabled } => {
                self.globals.keywords.insert(*keyword, *enabled);
            }
            RenderCommand::DrawFullscreen { .. } => {
                if let Some(source) = self.globals.texture(FX_SOURCE) {
                    self.check_target(source);
                }
            }
            RenderCommand::ClearRenderTarget { .. }
            | RenderCommand::SetViewport(_)
            | RenderCommand::SetViewProjection { .. }
            | RenderCommand::SetGlobalDepthBias { .. } => {}
        }
    }
}

impl RenderContext for HeadlessContext {
    type Culling = SceneCulling;

    fn cull(&mut self, camera: &Camera, max_shadow_distance: f32) -> Option<SceneCulling> {
        let culling = if self.culling_enabled {
            SceneCulling::cull(&self.scene, camera, max_shadow_distance)
        } else {
            None
        };
        self.events.push(HostEvent::Cull {
            camera: camera.name.clone(),
            shadow_distance: max_shadow_distance,
            success: culling.is_some(),
        });
        culling
    }

    fn setup_camera_properties(&mut self, camera: &Camera) {
        self.events.push(HostEvent::SetupCamera(camera.name.clone()));
    }

    fn execute_command_buffer(&mut self, buffer: &CommandBuffer) {
        log::trace!("Executing '{}' ({} commands)", buffer.name(), buffer.len());
        for command in buffer.commands() {
            self.apply(command);
            self.events.push(HostEvent::Command {
                buffer: buffer.name().to_string(),
                command: command.clone(),
            });
        }
    }

    fn draw_renderers(&mut self, _culling: &SceneCulling, drawing: &DrawingSettings, filtering: &FilteringSettings) {
        self.events.push(HostEvent::DrawRenderers {
            drawing: drawing.clone(),
            filtering: *filtering,
        });
    }

    fn draw_shadows(&mut self, _culling: &SceneCulling, settings: &ShadowDrawingSettings) {
        self.events.push(HostEvent::DrawShadows(*settings));
    }

    fn draw_skybox(&mut self, camera: &Camera) {
        self.events.push(HostEvent::DrawSkybox(camera.name.clone()));
    }

    fn draw_gizmos(&mut self, _camera: &Camera, subset: GizmoSubset) {
        self.events.push(HostEvent::DrawGizmos(subset));
    }

    fn emit_world_geometry_for_scene_view(&mut self, camera: &Camera) {
        self.events.push(HostEvent::SceneViewGeometry(camera.name.clone()));
    }

    fn uses_reversed_z_buffer(&self) -> bool {
        self.reversed_z
    }

    fn submit(&mut self) {
        for leak in self.tracker.drain_leaks() {
            log::error!("{}", leak);
            self.violations.push(leak);
        }
        if !self.samples.is_empty() {
            log::warn!("Submit with open samples {:?}", self.samples);
            self.samples.clear();
        }
        self.submits += 1;
        self.events.push(HostEvent::Submit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_render::{RenderTextureFormat, TemporaryTargetDesc};

    const TARGET: ShaderId = ShaderId::from_name("_Target");
    const VALUES: ShaderId = ShaderId::from_name("_Values");

    fn buffer(commands: impl FnOnce(&mut CommandBuffer)) -> CommandBuffer {
        let mut buffer = CommandBuffer::new("Test");
        commands(&mut buffer);
        buffer
    }

    #[test]
    fn test_globals_mirrored() {
        let mut context = HeadlessContext::new(SceneDescription::default());
        let cmd = buffer(|b| {
            b.set_global_int(VALUES, 3);
            b.set_global_vector_array(VALUES, &[Vec4::ONE; 4]);
            b.set_keyword("_KEYWORD", true);
        });
        context.execute_command_buffer(&cmd);

        assert_eq!(context.globals().int(VALUES), Some(3));
        assert_eq!(context.globals().vector_array(VALUES).map(<[Vec4]>::len), Some(4));
        assert_eq!(context.globals().keyword("_KEYWORD"), Some(true));
        assert_eq!(context.uploaded_bytes(), 64);
        assert_eq!(context.commands().count(), 3);
    }

    #[test]
    fn test_lifetime_violations_recorded() {
        let mut context = HeadlessContext::new(SceneDescription::default());
        let desc = TemporaryTargetDesc::color(8, 8, RenderTextureFormat::Default);
        let cmd = buffer(|b| {
            b.get_temporary_target(TARGET, desc);
            b.release_temporary_target(TARGET);
            b.set_global_texture(FX_SOURCE, TARGET);
            b.release_temporary_target(TARGET);
        });
        context.execute_command_buffer(&cmd);

        let violations = context.take_violations();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], HeadlessError::NotLive(_)));
        assert!(matches!(violations[1], HeadlessError::DoubleRelease(_)));
        assert!(context.violations().is_empty());
    }

    #[test]
    fn test_leak_reported_at_submit() {
        let mut context = HeadlessContext::new(SceneDescription::default());
        let cmd = buffer(|b| b.get_temporary_target(TARGET, TemporaryTargetDesc::shadow_map(16)));
        context.execute_command_buffer(&cmd);
        context.submit();

        assert_eq!(context.submits(), 1);
        assert!(matches!(context.violations()[0], HeadlessError::LeakedAtSubmit(id) if id == TARGET));
        assert_eq!(context.tracker().live_count(), 0);
    }

    #[test]
    fn test_culling_toggle() {
        let mut context = HeadlessContext::new(SceneDescription::default());
        let camera = Camera::default();
        assert!(context.cull(&camera, 100.0).is_some());
        context.set_culling_enabled(false);
        assert!(context.cull(&camera, 100.0).is_none());
        assert!(matches!(
            context.events().last(),
            Some(HostEvent::Cull { success: false, .. })
        ));
    }

    #[test]
    fn test_reversed_z_setting() {
        let context = HeadlessContext::new(SceneDescription::default()).with_reversed_z(false);
        assert!(!context.uses_reversed_z_buffer());
    }
}

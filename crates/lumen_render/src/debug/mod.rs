//! Debug & Introspection Hooks
//!
//! - [`DebugOverlay`]: editor-only behaviour injected into the camera
//!   renderer (error-shader draws, gizmos, scene view geometry, sample names)
//! - [`FrameStats`]: what a camera render did, for logging and tests
//!
//! # Example
//!
//! ```ignore
//! use lumen_render::debug::EditorOverlay;
//! use lumen_render::CameraRenderer;
//!
//! // Production: no overlay
//! let mut renderer = CameraRenderer::new();
//!
//! // Editor: draw unsupported shaders in magenta, show gizmos
//! let mut editor = CameraRenderer::with_overlay(EditorOverlay::default());
//! ```

pub mod stats;

pub use stats::{FrameStats, StatsIssue};

use crate::camera::{Camera, CameraType};
use crate::context::RenderContext;
use crate::draw::{DrawingSettings, FilteringSettings, GizmoSubset, SortingCriteria, LEGACY_SHADER_TAGS};

/// Sample name used when the overlay does not name cameras
pub const DEFAULT_SAMPLE_NAME: &str = "Render Camera";

/// Material substituted for shaders the pipeline does not support
pub const ERROR_MATERIAL: &str = "Hidden/InternalErrorShader";

/// Editor hooks invoked by the camera renderer
///
/// Every hook defaults to doing nothing, so production builds pay nothing.
pub trait DebugOverlay {
    /// Name of the per-camera profiling sample
    fn sample_name<'a>(&'a self, _camera: &'a Camera) -> &'a str {
        DEFAULT_SAMPLE_NAME
    }

    /// Called before culling
    fn prepare_for_scene_window<C: RenderContext>(&self, _context: &mut C, _camera: &Camera) {}

    /// Draw renderers using legacy passes with an error material
    fn draw_unsupported_shaders<C: RenderContext>(
        &self,
        _context: &mut C,
        _culling: &C::Culling,
        _camera: &Camera,
    ) {
    }

    fn draw_gizmos_before_fx<C: RenderContext>(&self, _context: &mut C, _camera: &Camera) {}

    fn draw_gizmos_after_fx<C: RenderContext>(&self, _context: &mut C, _camera: &Camera) {}

    /// Whether post-processing may run for `camera`
    fn allows_post_fx(&self, _camera: &Camera) -> bool {
        true
    }
}

/// Production overlay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoOverlay;

impl DebugOverlay for NoOverlay {}

/// Overlay mirroring the editor's scene and game views
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorOverlay {
    pub show_gizmos: bool,
    /// Scene view post-processing toggle
    pub scene_view_post_fx: bool,
}

impl Default for EditorOverlay {
    fn default() -> Self {
        Self {
            show_gizmos: true,
            scene_view_post_fx: true,
        }
    }
}

impl DebugOverlay for EditorOverlay {
    fn sample_name<'a>(&'a self, camera: &'a Camera) -> &'a str {
        &camera.name
    }

    fn prepare_for_scene_window<C: RenderContext>(&self, context: &mut C, camera: &Camera) {
        if camera.camera_type == CameraType::SceneView {
            context.emit_world_geometry_for_scene_view(camera);
        }
    }

    fn draw_unsupported_shaders<C: RenderContext>(&self, context: &mut C, culling: &C::Culling, _camera: &Camera) {
        let mut drawing = DrawingSettings::new(&LEGACY_SHADER_TAGS, SortingCriteria::None);
        drawing.override_material = Some(ERROR_MATERIAL);
        context.draw_renderers(culling, &drawing, &FilteringSettings::all());
    }

    fn draw_gizmos_before_fx<C: RenderContext>(&self, context: &mut C, camera: &Camera) {
        if self.show_gizmos {
            context.draw_gizmos(camera, GizmoSubset::PreImageEffects);
        }
    }

    fn draw_gizmos_after_fx<C: RenderContext>(&self, context: &mut C, camera: &Camera) {
        if self.show_gizmos {
            context.draw_gizmos(camera, GizmoSubset::PostImageEffects);
        }
    }

    fn allows_post_fx(&self, camera: &Camera) -> bool {
        camera.camera_type != CameraType::SceneView || self.scene_view_post_fx
    }
}

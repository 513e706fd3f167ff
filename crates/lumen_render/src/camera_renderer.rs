//! Frame Orchestrator: per-camera render sequence
//!
//! # Stages
//!
//! ```text
//! Cull ─▶ Lighting ─▶ Targets ─▶ Geometry ─▶ Unsupported ─▶ Gizmos ─▶ PostFx ─▶ Gizmos ─▶ Cleanup ─▶ Submit
//! ```
//!
//! A culling failure ends the render before anything is recorded. After
//! that every stage runs exactly once, in order.

use crate::camera::{Camera, ClearFlags};
use crate::command::CommandBuffer;
use crate::context::RenderContext;
use crate::debug::{DebugOverlay, FrameStats, NoOverlay};
use crate::draw::{
    DrawingSettings, FilteringSettings, PerObjectData, SortingCriteria, LIT_SHADER_TAG, UNLIT_SHADER_TAG,
};
use crate::lighting::Lighting;
use crate::post_fx::PostFxStack;
use crate::property::ShaderId;
use crate::resource::{
    color_to_linear, LoadAction, RenderTextureFormat, StoreAction, TemporaryTargetDesc,
};
use crate::settings::PipelineSettings;
use glam::Vec4;

/// Intermediate target the scene is drawn into when post-processing runs
pub const CAMERA_FRAME_BUFFER: ShaderId = ShaderId::from_name("_CameraFrameBuffer");

/// Stage a camera render has reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderStage {
    #[default]
    Idle,
    Culled,
    LightingReady,
    TargetsReady,
    GeometryDrawn,
    UnsupportedDrawn,
    GizmosBeforeFx,
    PostFx,
    GizmosAfterFx,
    CleanedUp,
    Submitted,
}

/// Renders one camera at a time
#[derive(Debug)]
pub struct CameraRenderer<O: DebugOverlay = NoOverlay> {
    buffer: CommandBuffer,
    lighting: Lighting,
    post_fx: PostFxStack,
    overlay: O,
    stage: RenderStage,
    use_hdr: bool,
    geometry_draws: u32,
    frame_buffer_bytes: u64,
}

impl Default for CameraRenderer<NoOverlay> {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraRenderer<NoOverlay> {
    pub fn new() -> Self {
        Self::with_overlay(NoOverlay)
    }
}

impl<O: DebugOverlay> CameraRenderer<O> {
    pub fn with_overlay(overlay: O) -> Self {
        Self {
            buffer: CommandBuffer::new(crate::debug::DEFAULT_SAMPLE_NAME),
            lighting: Lighting::new(),
            post_fx: PostFxStack::new(),
            overlay,
            stage: RenderStage::Idle,
            use_hdr: false,
            geometry_draws: 0,
            frame_buffer_bytes: 0,
        }
    }

    /// Render `camera`
    ///
    /// Returns `None` when the camera was skipped (invalid or not cullable).
    pub fn render<C: RenderContext>(
        &mut self,
        context: &mut C,
        camera: &Camera,
        settings: &PipelineSettings,
    ) -> Option<FrameStats> {
        self.stage = RenderStage::Idle;
        self.geometry_draws = 0;
        self.frame_buffer_bytes = 0;

        if !camera.is_valid() {
            log::warn!("Camera '{}' has invalid parameters, skipping", camera.name);
            return None;
        }

        let sample_name = self.overlay.sample_name(camera).to_string();
        self.buffer.set_name(sample_name);
        self.overlay.prepare_for_scene_window(context, camera);

        let max_shadow_distance = settings.shadows.max_distance.min(camera.far);
        let Some(mut culling) = context.cull(camera, max_shadow_distance) else {
            log::debug!("Culling failed for camera '{}', skipping", camera.name);
            return None;
        };
        self.advance(RenderStage::Culled);

        self.use_hdr = settings.allow_hdr && camera.allow_hdr;

        self.buffer.begin_sample();
        self.buffer.flush(context);
        self.lighting.setup(
            context,
            &mut culling,
            &settings.shadows,
            settings.use_lights_per_object,
        );
        let post_fx_settings = settings
            .post_fx
            .as_ref()
            .filter(|_| self.overlay.allows_post_fx(camera));
        self.post_fx.setup(camera, post_fx_settings, self.use_hdr);
        self.buffer.end_sample();
        self.advance(RenderStage::LightingReady);

        self.setup(context, camera);
        self.advance(RenderStage::TargetsReady);

        self.draw_visible_geometry(context, &culling, camera, settings);
        self.advance(RenderStage::GeometryDrawn);

        self.overlay.draw_unsupported_shaders(context, &culling, camera);
        self.advance(RenderStage::UnsupportedDrawn);

        self.overlay.draw_gizmos_before_fx(context, camera);
        self.advance(RenderStage::GizmosBeforeFx);

        if self.post_fx.is_active() {
            self.post_fx.render(context, CAMERA_FRAME_BUFFER);
            self.advance(RenderStage::PostFx);
        }

        self.overlay.draw_gizmos_after_fx(context, camera);
        self.advance(RenderStage::GizmosAfterFx);

        self.cleanup(context);
        self.advance(RenderStage::CleanedUp);

        self.submit(context);
        self.advance(RenderStage::Submitted);

        Some(self.collect_stats(camera))
    }

    fn advance(&mut self, next: RenderStage) {
        debug_assert!(next > self.stage, "stage {:?} after {:?}", next, self.stage);
        log::trace!("{:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Bind camera properties and choose the render target
    fn setup<C: RenderContext>(&mut self, context: &mut C, camera: &Camera) {
        context.setup_camera_properties(camera);
        let mut flags = camera.clear_flags;

        if self.post_fx.is_active() {
            if flags > ClearFlags::Color {
                flags = ClearFlags::Color;
            }
            let format = if self.use_hdr {
                RenderTextureFormat::DefaultHdr
            } else {
                RenderTextureFormat::Default
            };
            let desc = TemporaryTargetDesc {
                depth_bits: 32,
                ..TemporaryTargetDesc::color(camera.pixel_width, camera.pixel_height, format)
            };
            self.frame_buffer_bytes = desc.estimated_bytes();
            self.buffer.get_temporary_target(CAMERA_FRAME_BUFFER, desc);
            self.buffer
                .set_render_target(CAMERA_FRAME_BUFFER, LoadAction::DontCare, StoreAction::Store);
        }

        let clear_color = if flags == ClearFlags::Color {
            color_to_linear(camera.background_color)
        } else {
            Vec4::ZERO
        };
        self.buffer
            .clear_render_target(flags <= ClearFlags::Depth, flags == ClearFlags::Color, clear_color);
        self.buffer.begin_sample();
        self.buffer.flush(context);
    }

    fn draw_visible_geometry<C: RenderContext>(
        &mut self,
        context: &mut C,
        culling: &C::Culling,
        camera: &Camera,
        settings: &PipelineSettings,
    ) {
        let mut per_object_data = PerObjectData::BAKED_LIGHTING;
        if settings.use_lights_per_object {
            per_object_data |= PerObjectData::PER_OBJECT_LIGHTS;
        }

        let mut drawing = DrawingSettings::new(&[UNLIT_SHADER_TAG, LIT_SHADER_TAG], SortingCriteria::CommonOpaque);
        drawing.enable_dynamic_batching = settings.use_dynamic_batching;
        drawing.enable_instancing = settings.use_gpu_instancing;
        drawing.per_object_data = per_object_data;

        context.draw_renderers(culling, &drawing, &FilteringSettings::opaque());
        context.draw_skybox(camera);

        drawing.sorting = SortingCriteria::CommonTransparent;
        context.draw_renderers(culling, &drawing, &FilteringSettings::transparent());
        self.geometry_draws += 2;
    }

    fn cleanup<C: RenderContext>(&mut self, context: &mut C) {
        self.lighting.cleanup(context);
        if self.post_fx.is_active() {
            self.buffer.release_temporary_target(CAMERA_FRAME_BUFFER);
        }
    }

    fn submit<C: RenderContext>(&mut self, context: &mut C) {
        self.buffer.end_sample();
        self.buffer.flush(context);
        context.submit();
    }

    fn collect_stats(&self, camera: &Camera) -> FrameStats {
        FrameStats {
            camera: camera.name.clone(),
            hdr: self.use_hdr,
            post_fx: self.post_fx.is_active(),
            lights: self.lighting.stats().clone(),
            shadows: self.lighting.shadows().stats().clone(),
            bloom: self.post_fx.is_active().then(|| self.post_fx.stats().clone()),
            geometry_draws: self.geometry_draws,
            frame_buffer_bytes: self.frame_buffer_bytes,
            uploaded_bytes: self.lighting.buffers().uploaded_bytes() + self.lighting.shadows().uploaded_bytes(),
        }
    }

    /// Stage reached by the last render
    pub fn stage(&self) -> RenderStage {
        self.stage
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn post_fx(&self) -> &PostFxStack {
        &self.post_fx
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut O {
        &mut self.overlay
    }

    /// HDR decision of the last render
    pub fn use_hdr(&self) -> bool {
        self.use_hdr
    }
}

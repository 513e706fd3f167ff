//! Render pipeline entry point
//!
//! Owns the pipeline settings and a single [`CameraRenderer`] that is reused
//! for every camera of every frame.

use serde::Serialize;

use crate::camera::Camera;
use crate::camera_renderer::CameraRenderer;
use crate::context::RenderContext;
use crate::debug::{DebugOverlay, FrameStats, NoOverlay};
use crate::settings::PipelineSettings;

/// Result of rendering one frame
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameReport {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Per camera, in submission order; `None` for skipped cameras
    pub cameras: Vec<Option<FrameStats>>,
}

impl FrameReport {
    pub fn rendered_count(&self) -> usize {
        self.cameras.iter().flatten().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.cameras.len() - self.rendered_count()
    }

    /// Stats of all rendered cameras summed
    pub fn totals(&self) -> FrameStats {
        let mut total = FrameStats::new("total");
        for stats in self.cameras.iter().flatten() {
            total.merge(stats);
        }
        total
    }
}

/// Forward render pipeline
#[derive(Debug)]
pub struct RenderPipeline<O: DebugOverlay = NoOverlay> {
    settings: PipelineSettings,
    renderer: CameraRenderer<O>,
    frame: u64,
}

impl RenderPipeline<NoOverlay> {
    pub fn new(settings: PipelineSettings) -> Self {
        Self::with_overlay(settings, NoOverlay)
    }
}

impl<O: DebugOverlay> RenderPipeline<O> {
    pub fn with_overlay(mut settings: PipelineSettings, overlay: O) -> Self {
        settings.validate();
        Self {
            settings,
            renderer: CameraRenderer::with_overlay(overlay),
            frame: 0,
        }
    }

    /// Render every camera in order
    pub fn render<C: RenderContext>(&mut self, context: &mut C, cameras: &[Camera]) -> FrameReport {
        self.frame += 1;
        let cameras = cameras
            .iter()
            .map(|camera| self.renderer.render(context, camera, &self.settings))
            .collect();
        let report = FrameReport {
            frame: self.frame,
            cameras,
        };
        log::trace!(
            "Frame {}: {} cameras rendered, {} skipped",
            report.frame,
            report.rendered_count(),
            report.skipped_count()
        );
        report
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Replace settings; takes effect on the next frame
    pub fn set_settings(&mut self, mut settings: PipelineSettings) {
        settings.validate();
        self.settings = settings;
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn renderer(&self) -> &CameraRenderer<O> {
        &self.renderer
    }
}

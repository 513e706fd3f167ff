//! # lumen_render - Forward Renderer Core
//!
//! Backend-agnostic per-frame orchestration for a forward renderer:
//! - Shadow atlas packing for directional cascades and point/spot lights
//! - Light collection into fixed-capacity shader arrays
//! - Bloom post-processing with additive and scattering modes
//! - Per-camera frame sequencing
//!
//! ## Architecture
//!
//! The core never talks to a GPU. It records [`RenderCommand`]s into named
//! [`CommandBuffer`]s and hands them to a host [`RenderContext`], which also
//! performs culling and the draws that need scene knowledge.
//!
//! 1. **Shadows** (`shadow`): reserve tiles, render atlases, upload matrices
//! 2. **Lighting** (`lighting`): classify and pack lights, request shadow slots
//! 3. **Post FX** (`post_fx`): bloom pyramid and composite
//! 4. **Orchestration** (`camera_renderer`, `pipeline`): one camera after another
//!
//! ## Example
//!
//! ```ignore
//! use lumen_render::prelude::*;
//!
//! let settings = PipelineSettings::from_json(&std::fs::read_to_string("pipeline.json")?)?;
//! let mut pipeline = RenderPipeline::new(settings);
//!
//! // Each frame
//! let report = pipeline.render(&mut host_context, &cameras);
//! for stats in report.cameras.iter().flatten() {
//!     log::info!("{}: {} shadow tiles", stats.camera, stats.shadow_tiles());
//! }
//! ```

pub mod camera;
pub mod camera_renderer;
pub mod command;
pub mod context;
pub mod debug;
pub mod draw;
pub mod error;
pub mod light;
pub mod lighting;
pub mod pipeline;
pub mod post_fx;
pub mod property;
pub mod resource;
pub mod settings;
pub mod shadow;

#[cfg(test)]
mod testing;

pub use camera::{Camera, CameraType, ClearFlags};
pub use camera_renderer::{CameraRenderer, RenderStage, CAMERA_FRAME_BUFFER};
pub use command::{CommandBuffer, RenderCommand};
pub use context::{Bounds, CubemapFace, CullingResults, RenderContext, ShadowMatrices, ShadowSplitData};
pub use draw::{
    DrawingSettings, FilteringSettings, GizmoSubset, PerObjectData, RenderQueueRange, ShadowDrawingSettings,
    ShadowProjection, SortingCriteria,
};
pub use error::{RenderError, RenderResult};
pub use light::{BakingOutput, LightKind, LightShadows, LightmapBakeType, MixedLightingMode, VisibleLight};
pub use pipeline::{FrameReport, RenderPipeline};
pub use property::ShaderId;
pub use resource::{
    FilterMode, LoadAction, Rect, RenderTargetId, RenderTextureFormat, StoreAction, TemporaryTargetDesc,
};
pub use settings::PipelineSettings;

// Debug
pub use debug::{DebugOverlay, EditorOverlay, FrameStats, NoOverlay};

// Lighting
pub use lighting::{LightBuffers, LightStats, Lighting, MAX_DIRECTIONAL_LIGHTS, MAX_OTHER_LIGHTS};

// Post-processing
pub use post_fx::{
    plan_bloom, BloomMode, BloomPlan, BloomSettings, BloomStats, PostFxPass, PostFxSettings, PostFxStack,
    ToneMappingMode,
};

// Shadows
pub use shadow::{
    CascadeBlendMode, DirectionalShadowSettings, OtherShadowSettings, ShadowAtlasLayout, ShadowFilter,
    ShadowSettings, ShadowSlot, ShadowStats, ShadowmaskMode, Shadows,
};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::camera::{Camera, CameraType, ClearFlags};
    pub use crate::camera_renderer::{CameraRenderer, RenderStage};
    pub use crate::context::{CullingResults, RenderContext};
    pub use crate::debug::{DebugOverlay, EditorOverlay, FrameStats, NoOverlay};
    pub use crate::light::{LightKind, LightShadows, VisibleLight};
    pub use crate::pipeline::{FrameReport, RenderPipeline};
    pub use crate::post_fx::{BloomMode, BloomSettings, PostFxSettings, ToneMappingMode};
    pub use crate::settings::PipelineSettings;
    pub use crate::shadow::{ShadowFilter, ShadowSettings};
    pub use crate::{RenderError, RenderResult};
}

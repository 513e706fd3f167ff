//! # lumen_headless - Recording Host
//!
//! Runs the `lumen_render` core without a GPU:
//! - [`SceneDescription`]: lights, shadow casters and cameras loaded from JSON
//! - [`SceneCulling`]: CPU light culling and shadow projection math
//! - [`HeadlessContext`]: executes command buffers against a mirror of the
//!   global shader state and records every host call
//! - [`TargetTracker`]: temporary target lifetime checks
//!
//! ## Example
//!
//! ```ignore
//! use lumen_headless::{HeadlessContext, SceneDescription};
//! use lumen_render::prelude::*;
//!
//! let scene = SceneDescription::demo();
//! let cameras = scene.cameras.clone();
//! let mut context = HeadlessContext::new(scene);
//! let mut pipeline = RenderPipeline::new(PipelineSettings::default());
//!
//! let report = pipeline.render(&mut context, &cameras);
//! assert!(context.violations().is_empty());
//! ```

pub mod context;
pub mod culling;
pub mod scene;
pub mod tracker;

pub use context::{GlobalState, HeadlessContext, HostEvent};
pub use culling::SceneCulling;
pub use scene::{LightDescription, SceneDescription, ShadowCaster};
pub use tracker::{HeadlessError, HeadlessResult, TargetTracker, TrackerStats};

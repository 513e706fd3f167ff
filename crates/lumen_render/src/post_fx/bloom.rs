//! Bloom Compositor
//!
//! Builds a blurred downsample pyramid from the camera's frame buffer and
//! composites it back up onto the camera target.
//!
//! # Algorithm
//!
//! 1. Prefilter: threshold bright pixels at half resolution
//! 2. Downsample: per level, a horizontal then a vertical blur pass
//! 3. Combine: walk back up the pyramid, blending each level into the next
//!    finer one (additive or scattering)
//! 4. Final: blend the finest level with the original image
//!
//! Every intermediate target is released in the frame it was allocated,
//! right after its last read.

use glam::Vec4;
use serde::Serialize;

use super::config::{BloomMode, BloomSettings, PostFxSettings};
use crate::camera::{Camera, CameraType};
use crate::command::CommandBuffer;
use crate::context::RenderContext;
use crate::property::ShaderId;
use crate::resource::{
    gamma_to_linear, LoadAction, RenderTargetId, RenderTextureFormat, StoreAction, TemporaryTargetDesc,
};

/// Pyramid level cap
pub const MAX_BLOOM_PYRAMID_LEVELS: usize = 16;

/// Knee denominator guard
const THRESHOLD_EPSILON: f32 = 0.00001;
/// Upper bound of the final scatter intensity
const MAX_SCATTER_INTENSITY: f32 = 0.95;

pub const FX_SOURCE: ShaderId = ShaderId::from_name("_PostFXSource");
pub const FX_SOURCE2: ShaderId = ShaderId::from_name("_PostFXSource2");
pub const BLOOM_BICUBIC_UPSAMPLING: ShaderId = ShaderId::from_name("_BloomBicubicUpsampling");
pub const BLOOM_PREFILTER: ShaderId = ShaderId::from_name("_BloomPrefilter");
pub const BLOOM_THRESHOLD: ShaderId = ShaderId::from_name("_BloomThreshold");
pub const BLOOM_INTENSITY: ShaderId = ShaderId::from_name("_BloomIntensity");
pub const TONE_MAPPING_MODE: ShaderId = ShaderId::from_name("_ToneMappingMode");

/// Passes of the post-processing material
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostFxPass {
    BloomPrefilterFireflies,
    BloomPrefilter,
    BloomHorizontal,
    BloomVertical,
    BloomAdd,
    BloomScatter,
    BloomScatterFinal,
    Copy,
}

/// Target sizes bloom will use for a given resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BloomPlan {
    /// Bloom is skipped and the source is copied to the camera target
    Passthrough,
    Pyramid {
        prefilter: (u32, u32),
        /// Per-level size, finest first
        levels: Vec<(u32, u32)>,
    },
}

impl BloomPlan {
    pub fn level_count(&self) -> usize {
        match self {
            BloomPlan::Passthrough => 0,
            BloomPlan::Pyramid { levels, .. } => levels.len(),
        }
    }
}

/// Plan the pyramid for a `width × height` source
///
/// Bloom is skipped when iterations are zero, intensity is not positive, or
/// the half-resolution image is smaller than twice the downscale limit.
/// Otherwise levels halve until the iteration cap or the limit is hit.
pub fn plan_bloom(width: u32, height: u32, settings: &BloomSettings) -> BloomPlan {
    let limit = settings.downscale_limit.max(1);
    let min_half = limit.saturating_mul(2);
    let mut w = width / 2;
    let mut h = height / 2;
    if settings.max_iterations == 0 || settings.intensity <= 0.0 || h < min_half || w < min_half {
        return BloomPlan::Passthrough;
    }

    let prefilter = (w, h);
    w /= 2;
    h /= 2;

    let cap = (settings.max_iterations as usize).min(MAX_BLOOM_PYRAMID_LEVELS);
    let mut levels = Vec::with_capacity(cap);
    while levels.len() < cap {
        if h < limit || w < limit {
            break;
        }
        levels.push((w, h));
        w /= 2;
        h /= 2;
    }
    BloomPlan::Pyramid { prefilter, levels }
}

/// Soft threshold curve constants
///
/// `t` is the linear threshold: `(t, t·knee, 2·t·knee, 0.25 / (t·knee + ε))`.
pub fn threshold_vector(settings: &BloomSettings) -> Vec4 {
    let t = gamma_to_linear(settings.threshold);
    let knee = t * settings.threshold_knee;
    Vec4::new(t, knee, 2.0 * knee, 0.25 / (knee + THRESHOLD_EPSILON))
}

/// Bloom statistics for one frame
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BloomStats {
    /// Pyramid levels built
    pub levels: u32,
    pub allocations: u32,
    pub releases: u32,
    /// Full-screen draws issued
    pub draws: u32,
    /// True when bloom was skipped for a plain copy
    pub passthrough: bool,
}

/// Post-processing stack (bloom plus tone mapping selection)
#[derive(Debug)]
pub struct PostFxStack {
    buffer: CommandBuffer,
    settings: Option<PostFxSettings>,
    camera_size: (u32, u32),
    use_hdr: bool,
    /// Scratch/blurred id pairs, level `i` uses `2i` and `2i + 1`
    pyramid: Vec<ShaderId>,
    stats: BloomStats,
}

impl Default for PostFxStack {
    fn default() -> Self {
        Self::new()
    }
}

impl PostFxStack {
    pub fn new() -> Self {
        Self {
            buffer: CommandBuffer::new("Post FX"),
            settings: None,
            camera_size: (0, 0),
            use_hdr: false,
            pyramid: (0..MAX_BLOOM_PYRAMID_LEVELS * 2)
                .map(|i| ShaderId::indexed("_BloomPyramid", i))
                .collect(),
            stats: BloomStats::default(),
        }
    }

    /// Prepare for a camera
    ///
    /// Post-processing only runs for game and scene view cameras.
    pub fn setup(&mut self, camera: &Camera, settings: Option<&PostFxSettings>, use_hdr: bool) {
        self.camera_size = (camera.pixel_width, camera.pixel_height);
        self.use_hdr = use_hdr;
        self.settings = if camera.camera_type <= CameraType::SceneView {
            settings.cloned()
        } else {
            None
        };
        self.stats = BloomStats::default();
    }

    pub fn is_active(&self) -> bool {
        self.settings.is_some()
    }

    /// Composite `source` onto the camera target
    pub fn render<C: RenderContext>(&mut self, context: &mut C, source: ShaderId) {
        let Some(settings) = self.settings.clone() else {
            return;
        };
        self.buffer
            .set_global_int(TONE_MAPPING_MODE, settings.tone_mapping.shader_value());
        self.do_bloom(source, &settings.bloom);
        self.buffer.flush(context);
    }

    fn do_bloom(&mut self, source: ShaderId, bloom: &BloomSettings) {
        self.buffer.begin_sample();
        let (width, height) = self.camera_size;

        let BloomPlan::Pyramid { prefilter, levels } = plan_bloom(width, height, bloom) else {
            log::debug!("Bloom skipped for {}x{}, copying source", width, height);
            self.stats.passthrough = true;
            self.draw(source, RenderTargetId::CameraTarget, PostFxPass::Copy);
            self.buffer.end_sample();
            return;
        };

        let format = if self.use_hdr {
            RenderTextureFormat::DefaultHdr
        } else {
            RenderTextureFormat::Default
        };

        self.buffer
            .set_global_vector(BLOOM_THRESHOLD, threshold_vector(bloom));
        self.get_target(BLOOM_PREFILTER, prefilter, format);
        let prefilter_pass = if bloom.fade_fireflies {
            PostFxPass::BloomPrefilterFireflies
        } else {
            PostFxPass::BloomPrefilter
        };
        self.draw(source, BLOOM_PREFILTER, prefilter_pass);

        let mut from = BLOOM_PREFILTER;
        for (level, &size) in levels.iter().enumerate() {
            let (scratch, blurred) = self.level_ids(level);
            self.get_target(scratch, size, format);
            self.get_target(blurred, size, format);
            self.draw(from, scratch, PostFxPass::BloomHorizontal);
            self.draw(scratch, blurred, PostFxPass::BloomVertical);
            from = blurred;
        }

        let level_count = levels.len();
        self.release(BLOOM_PREFILTER);
        // The coarsest scratch target is never a combine destination
        let (last_scratch, _) = self.level_ids(level_count - 1);
        self.release(last_scratch);

        self.buffer.set_global_float(
            BLOOM_BICUBIC_UPSAMPLING,
            if bloom.bicubic_upsampling { 1.0 } else { 0.0 },
        );

        let (combine_pass, final_pass, combine_intensity, final_intensity) = match bloom.mode {
            BloomMode::Additive => (PostFxPass::BloomAdd, PostFxPass::BloomAdd, 1.0, bloom.intensity),
            BloomMode::Scattering => (
                PostFxPass::BloomScatter,
                PostFxPass::BloomScatterFinal,
                bloom.scatter,
                bloom.intensity.min(MAX_SCATTER_INTENSITY),
            ),
        };
        self.buffer.set_global_float(BLOOM_INTENSITY, combine_intensity);

        for level in (0..level_count - 1).rev() {
            let (scratch, blurred) = self.level_ids(level);
            self.buffer.set_global_texture(FX_SOURCE2, blurred);
            self.draw(from, scratch, combine_pass);
            self.release(from);
            self.release(blurred);
            from = scratch;
        }

        self.buffer.set_global_float(BLOOM_INTENSITY, final_intensity);
        self.buffer.set_global_texture(FX_SOURCE2, source);
        self.draw(from, RenderTargetId::CameraTarget, final_pass);
        self.release(from);

        self.stats.levels = level_count as u32;
        self.buffer.end_sample();
    }

    fn level_ids(&self, level: usize) -> (ShaderId, ShaderId) {
        (self.pyramid[2 * level], self.pyramid[2 * level + 1])
    }

    fn get_target(&mut self, id: ShaderId, (width, height): (u32, u32), format: RenderTextureFormat) {
        self.buffer
            .get_temporary_target(id, TemporaryTargetDesc::color(width, height, format));
        self.stats.allocations += 1;
    }

    fn release(&mut self, id: ShaderId) {
        self.buffer.release_temporary_target(id);
        self.stats.releases += 1;
    }

    fn draw(&mut self, from: impl Into<RenderTargetId>, to: impl Into<RenderTargetId>, pass: PostFxPass) {
        self.buffer.set_global_texture(FX_SOURCE, from);
        self.buffer
            .set_render_target(to, LoadAction::DontCare, StoreAction::Store);
        self.buffer.draw_fullscreen(pass as u32);
        self.stats.draws += 1;
    }

    pub fn settings(&self) -> Option<&PostFxSettings> {
        self.settings.as_ref()
    }

    pub fn stats(&self) -> &BloomStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RenderCommand;
    use crate::testing::MockContext;
    use std::collections::HashSet;

    const FRAME: ShaderId = ShaderId::from_name("_CameraFrameBuffer");

    fn run(width: u32, height: u32, bloom: BloomSettings, hdr: bool) -> (PostFxStack, MockContext) {
        let camera = Camera {
            pixel_width: width,
            pixel_height: height,
            ..Default::default()
        };
        let settings = PostFxSettings {
            bloom,
            ..Default::default()
        };
        let mut stack = PostFxStack::new();
        stack.setup(&camera, Some(&settings), hdr);
        let mut context = MockContext::default();
        stack.render(&mut context, FRAME);
        (stack, context)
    }

    /// Every temporary target is allocated once and released once, with no
    /// read after release
    fn assert_balanced(context: &MockContext) {
        let mut live = HashSet::new();
        let mut released = HashSet::new();
        for (_, command) in &context.commands {
            match command {
                RenderCommand::GetTemporaryTarget { id, .. } => {
                    assert!(live.insert(*id), "{:?} allocated twice", id);
                }
                RenderCommand::ReleaseTemporaryTarget(id) => {
                    assert!(live.remove(id), "{:?} released while not live", id);
                    assert!(released.insert(*id), "{:?} released twice", id);
                }
                RenderCommand::SetGlobalTexture { target: RenderTargetId::Temporary(id), .. } if *id != FRAME => {
                    assert!(live.contains(id), "{:?} read while not live", id);
                }
                _ => {}
            }
        }
        assert!(live.is_empty(), "leaked targets: {:?}", live);
    }

    #[test]
    fn test_plan_passthrough() {
        let bloom = BloomSettings::default();
        assert_eq!(plan_bloom(1920, 1080, &BloomSettings { max_iterations: 0, ..bloom.clone() }), BloomPlan::Passthrough);
        assert_eq!(plan_bloom(1920, 1080, &BloomSettings::disabled()), BloomPlan::Passthrough);
        // Half of 6 is 3, below 2 × limit 2
        assert_eq!(plan_bloom(6, 1080, &bloom), BloomPlan::Passthrough);
    }

    #[test]
    fn test_plan_huge_downscale_limit_passes_through() {
        let bloom = BloomSettings {
            downscale_limit: u32::MAX,
            ..Default::default()
        };
        assert_eq!(plan_bloom(1920, 1080, &bloom), BloomPlan::Passthrough);
        assert_eq!(plan_bloom(u32::MAX, u32::MAX, &bloom), BloomPlan::Passthrough);
    }

    #[test]
    fn test_plan_levels() {
        let plan = plan_bloom(1920, 1080, &BloomSettings::default());
        assert_eq!(
            plan,
            BloomPlan::Pyramid {
                prefilter: (960, 540),
                levels: vec![(480, 270), (240, 135), (120, 67), (60, 33)],
            }
        );
    }

    #[test]
    fn test_plan_stops_at_downscale_limit() {
        let bloom = BloomSettings {
            max_iterations: 16,
            downscale_limit: 30,
            ..Default::default()
        };
        let plan = plan_bloom(1920, 1080, &bloom);
        // 270, 135, 67, 33 fit; 16 does not
        assert_eq!(plan.level_count(), 4);
    }

    #[test]
    fn test_plan_never_exceeds_cap() {
        for &(w, h) in &[(4u32, 4u32), (64, 32), (800, 600), (1920, 1080), (7680, 4320), (16384, 16384)] {
            for iterations in 0..=16 {
                for &limit in &[1u32, 2, 8, 64] {
                    let bloom = BloomSettings {
                        max_iterations: iterations,
                        downscale_limit: limit,
                        ..Default::default()
                    };
                    let plan = plan_bloom(w, h, &bloom);
                    assert!(plan.level_count() <= iterations as usize);
                    if let BloomPlan::Pyramid { levels, .. } = &plan {
                        assert!(!levels.is_empty());
                        assert!(levels.iter().all(|&(lw, lh)| lw >= limit && lh >= limit));
                    }
                }
            }
        }
    }

    #[test]
    fn test_threshold_vector() {
        let bloom = BloomSettings {
            threshold: 1.0,
            threshold_knee: 0.5,
            ..Default::default()
        };
        let v = threshold_vector(&bloom);
        assert!((v.x - 1.0).abs() < 1e-5);
        assert!((v.y - 0.5).abs() < 1e-5);
        assert!((v.z - 1.0).abs() < 1e-5);
        assert!((v.w - 0.25 / 0.50001).abs() < 1e-5);

        let zero = threshold_vector(&BloomSettings { threshold: 0.0, ..Default::default() });
        assert!(zero.w.is_finite());
    }

    #[test]
    fn test_zero_intensity_single_copy() {
        let (stack, context) = run(1920, 1080, BloomSettings::disabled(), true);
        assert_eq!(context.fullscreen_passes(), vec![PostFxPass::Copy as u32]);
        assert_eq!(context.allocations(), 0);
        assert_eq!(context.releases(), 0);
        assert!(stack.stats().passthrough);
    }

    #[test]
    fn test_scatter_pass_sequence() {
        let (stack, context) = run(1920, 1080, BloomSettings::default(), true);
        let passes = context.fullscreen_passes();

        let expected: Vec<u32> = [
            PostFxPass::BloomPrefilterFireflies,
            PostFxPass::BloomHorizontal,
            PostFxPass::BloomVertical,
            PostFxPass::BloomHorizontal,
            PostFxPass::BloomVertical,
            PostFxPass::BloomHorizontal,
            PostFxPass::BloomVertical,
            PostFxPass::BloomHorizontal,
            PostFxPass::BloomVertical,
            PostFxPass::BloomScatter,
            PostFxPass::BloomScatter,
            PostFxPass::BloomScatter,
            PostFxPass::BloomScatterFinal,
        ]
        .iter()
        .map(|p| *p as u32)
        .collect();
        assert_eq!(passes, expected);
        assert_eq!(stack.stats().levels, 4);
        assert_eq!(context.allocations(), 9);
        assert_balanced(&context);
    }

    #[test]
    fn test_scatter_intensities() {
        let bloom = BloomSettings {
            intensity: 3.0,
            scatter: 0.6,
            ..Default::default()
        };
        let (_, context) = run(1920, 1080, bloom, false);
        let intensities: Vec<f32> = context
            .commands
            .iter()
            .filter_map(|(_, c)| match c {
                RenderCommand::SetGlobalFloat { id, value } if *id == BLOOM_INTENSITY => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(intensities, vec![0.6, 0.95]);
    }

    #[test]
    fn test_additive_mode() {
        let bloom = BloomSettings {
            mode: BloomMode::Additive,
            intensity: 2.0,
            fade_fireflies: false,
            bicubic_upsampling: false,
            ..Default::default()
        };
        let (_, context) = run(1920, 1080, bloom, false);
        let passes = context.fullscreen_passes();
        assert_eq!(passes[0], PostFxPass::BloomPrefilter as u32);
        assert_eq!(*passes.last().unwrap(), PostFxPass::BloomAdd as u32);
        assert_eq!(context.float(BLOOM_INTENSITY), Some(2.0));
        assert_eq!(context.float(BLOOM_BICUBIC_UPSAMPLING), Some(0.0));
        assert_balanced(&context);
    }

    #[test]
    fn test_single_level_balanced() {
        let bloom = BloomSettings {
            max_iterations: 1,
            ..Default::default()
        };
        let (stack, context) = run(1920, 1080, bloom, true);
        assert_eq!(stack.stats().levels, 1);
        assert_eq!(context.allocations(), 3);
        assert_balanced(&context);
    }

    #[test]
    fn test_lifetimes_balanced_across_resolutions() {
        for &(w, h) in &[(16u32, 16u32), (100, 40), (640, 480), (3840, 2160)] {
            for iterations in 1..=16 {
                let bloom = BloomSettings {
                    max_iterations: iterations,
                    downscale_limit: 1,
                    ..Default::default()
                };
                let (stack, context) = run(w, h, bloom, true);
                assert_balanced(&context);
                assert_eq!(stack.stats().allocations, stack.stats().releases);
            }
        }
    }

    #[test]
    fn test_hdr_format() {
        let (_, context) = run(1920, 1080, BloomSettings::default(), true);
        assert!(context.commands.iter().all(|(_, c)| match c {
            RenderCommand::GetTemporaryTarget { desc, .. } => desc.format == RenderTextureFormat::DefaultHdr,
            _ => true,
        }));
    }

    #[test]
    fn test_inactive_for_preview_camera() {
        let camera = Camera {
            camera_type: CameraType::Preview,
            ..Default::default()
        };
        let mut stack = PostFxStack::new();
        stack.setup(&camera, Some(&PostFxSettings::default()), false);
        assert!(!stack.is_active());

        let mut context = MockContext::default();
        stack.render(&mut context, FRAME);
        assert!(context.commands.is_empty());
    }

    #[test]
    fn test_tone_mapping_forwarded() {
        let camera = Camera::default();
        let settings = PostFxSettings {
            tone_mapping: crate::post_fx::ToneMappingMode::Neutral,
            ..Default::default()
        };
        let mut stack = PostFxStack::new();
        stack.setup(&camera, Some(&settings), false);
        let mut context = MockContext::default();
        stack.render(&mut context, FRAME);
        assert_eq!(context.int(TONE_MAPPING_MODE), Some(2));
    }
}

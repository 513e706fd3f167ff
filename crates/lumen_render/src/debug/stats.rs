//! Per-camera render statistics
//!
//! Collected by the camera renderer after every successful render and
//! aggregated per frame by the pipeline.

use serde::Serialize;

use crate::lighting::LightStats;
use crate::post_fx::BloomStats;
use crate::shadow::{ShadowStats, MAX_SHADOWED_OTHER_LIGHTS};

/// What one camera render did
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub camera: String,
    pub hdr: bool,
    /// Post-processing ran for this camera
    pub post_fx: bool,
    pub lights: LightStats,
    pub shadows: ShadowStats,
    /// `None` when post-processing was inactive
    pub bloom: Option<BloomStats>,
    /// Opaque and transparent renderer draws issued
    pub geometry_draws: u32,
    /// Estimated size of the intermediate frame buffer
    pub frame_buffer_bytes: u64,
    /// Bytes of light and shadow arrays uploaded, light counts included
    pub uploaded_bytes: u64,
}

impl FrameStats {
    pub fn new(camera: impl Into<String>) -> Self {
        Self {
            camera: camera.into(),
            ..Default::default()
        }
    }

    /// Directional plus other tiles
    pub fn shadow_tiles(&self) -> u32 {
        self.shadows.directional_tiles + self.shadows.other_tiles
    }

    pub fn frame_buffer_mb(&self) -> f32 {
        self.frame_buffer_bytes as f32 / (1024.0 * 1024.0)
    }

    /// Check stats for impossible values
    pub fn validate(&self) -> Vec<StatsIssue> {
        let mut issues = Vec::new();

        if self.lights.directional + self.lights.other + self.lights.overflow != self.lights.visible {
            issues.push(StatsIssue::LightCountMismatch);
        }

        if self.shadows.other_tiles as usize > MAX_SHADOWED_OTHER_LIGHTS {
            issues.push(StatsIssue::OtherTilesExceedCapacity);
        }

        if let Some(bloom) = &self.bloom {
            if bloom.allocations != bloom.releases {
                issues.push(StatsIssue::UnbalancedBloomTargets);
            }
        }

        issues
    }

    /// Merge stats from another camera (additive)
    pub fn merge(&mut self, other: &FrameStats) {
        self.lights.visible += other.lights.visible;
        self.lights.directional += other.lights.directional;
        self.lights.other += other.lights.other;
        self.lights.overflow += other.lights.overflow;
        self.lights.shadowed += other.lights.shadowed;
        self.shadows.directional_lights += other.shadows.directional_lights;
        self.shadows.directional_tiles += other.shadows.directional_tiles;
        self.shadows.other_tiles += other.shadows.other_tiles;
        self.shadows.sentinels += other.shadows.sentinels;
        self.shadows.caster_draws += other.shadows.caster_draws;
        self.shadows.skipped_tiles += other.shadows.skipped_tiles;
        self.geometry_draws += other.geometry_draws;
        self.frame_buffer_bytes += other.frame_buffer_bytes;
        self.uploaded_bytes += other.uploaded_bytes;
    }
}

/// Specific issues found in stats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StatsIssue {
    /// Classified plus dropped lights differ from the visible count
    LightCountMismatch,
    OtherTilesExceedCapacity,
    /// Bloom allocated and released a different number of targets
    UnbalancedBloomTargets,
}

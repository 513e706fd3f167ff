//! Pipeline settings
//!
//! One serializable struct holds everything the pipeline is configured with.
//! Loading goes through [`PipelineSettings::from_json`], which rejects
//! non-finite numbers and clamps every other value into its legal range.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::post_fx::PostFxSettings;
use crate::shadow::ShadowSettings;

/// Pipeline-wide settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub use_dynamic_batching: bool,
    pub use_gpu_instancing: bool,
    pub allow_hdr: bool,
    /// Build per-object light index lists
    pub use_lights_per_object: bool,
    pub shadows: ShadowSettings,
    /// `None` disables post-processing
    pub post_fx: Option<PostFxSettings>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            use_dynamic_batching: true,
            use_gpu_instancing: true,
            allow_hdr: true,
            use_lights_per_object: true,
            shadows: ShadowSettings::default(),
            post_fx: Some(PostFxSettings::default()),
        }
    }
}

impl PipelineSettings {
    /// Parse, check and clamp settings from JSON
    pub fn from_json(json: &str) -> RenderResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.checked()
    }

    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject non-finite values, then clamp
    pub fn checked(mut self) -> RenderResult<Self> {
        let mut bad = self.shadows.non_finite_fields();
        if let Some(post_fx) = &self.post_fx {
            bad.extend(post_fx.non_finite_fields());
        }
        if !bad.is_empty() {
            return Err(RenderError::Config(format!(
                "non-finite value in {}",
                bad.join(", ")
            )));
        }
        self.validate();
        Ok(self)
    }

    /// Clamp all values into legal ranges
    pub fn validate(&mut self) {
        self.shadows.validate();
        if let Some(post_fx) = &mut self.post_fx {
            post_fx.validate();
        }
    }
}

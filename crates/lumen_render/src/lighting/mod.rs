//! Light collection
//!
//! - `buffer`: fixed-capacity directional/other light arrays and packing
//! - `collector`: per-camera classification, shadow reservation, upload

pub mod buffer;
pub mod collector;

pub use buffer::{
    spot_angles, DirectionalLightData, LightBuffers, LightStats, OtherLightData, MAX_DIRECTIONAL_LIGHTS,
    MAX_OTHER_LIGHTS,
};
pub use collector::{Lighting, LIGHTS_PER_OBJECT_KEYWORD};

//! Post-processing
//!
//! - `config`: bloom and tone mapping settings
//! - `bloom`: pyramid planning and the [`PostFxStack`] that records it

pub mod bloom;
pub mod config;

pub use bloom::{
    plan_bloom, threshold_vector, BloomPlan, BloomStats, PostFxPass, PostFxStack, MAX_BLOOM_PYRAMID_LEVELS,
};
pub use config::{BloomMode, BloomSettings, PostFxSettings, ToneMappingMode};

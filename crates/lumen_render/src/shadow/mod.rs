//! Shadow Atlas Manager
//!
//! Packs directional cascades and point/spot shadow maps into two shared
//! depth atlases each frame.
//!
//! # Architecture
//!
//! - `config`: pipeline-wide shadow settings (atlas sizes, filters, cascades)
//! - `atlas`: tile split policy, tile viewports, atlas-space matrices
//! - `slot`: per-light reservation results in shader-packed form
//! - `data`: fixed-capacity per-frame shadow arrays
//! - `manager`: reservation ledger and atlas rendering
//!
//! # Usage
//!
//! ```ignore
//! shadows.setup(&settings.shadows);
//! let slot = shadows.reserve_directional(&culling, &light, index);
//! // ... reserve every light once ...
//! shadows.render(&mut context, &culling);
//! // ... draw geometry, post-processing ...
//! shadows.cleanup(&mut context);
//! ```

pub mod atlas;
pub mod config;
pub mod data;
pub mod manager;
pub mod slot;

pub use atlas::{atlas_matrix, split_for_tiles, ShadowAtlasLayout};
pub use config::{
    CascadeBlendMode, DirectionalShadowSettings, OtherShadowSettings, ShadowFilter, ShadowSettings,
    ShadowmaskMode,
};
pub use data::{
    CascadeDescriptor, ShadowData, ShadowGlobals, MAX_CASCADES, MAX_SHADOWED_DIRECTIONAL_LIGHTS,
    MAX_SHADOWED_OTHER_LIGHTS,
};
pub use manager::{ShadowStats, Shadows};
pub use slot::{ShadowAtlasKind, ShadowSlot};

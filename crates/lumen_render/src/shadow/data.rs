//! GPU Shadow Data
//!
//! Fixed-capacity arrays the shadow manager fills each frame and uploads as
//! global shader arrays. Owned by the manager instance and reset in
//! `setup`, so nothing leaks from one frame (or one camera) to the next.

use core::f32::consts::SQRT_2;

use glam::{Mat4, Vec4};

use super::config::ShadowFilter;

/// Maximum directional lights with real-time shadows
pub const MAX_SHADOWED_DIRECTIONAL_LIGHTS: usize = 4;
/// Maximum cascades per directional light
pub const MAX_CASCADES: usize = 4;
/// Maximum tiles in the other-light atlas (a point light takes six)
pub const MAX_SHADOWED_OTHER_LIGHTS: usize = 16;

/// Cascade culling sphere and filter metrics
///
/// Computed from the first shadowed directional light only and shared by
/// every directional light.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CascadeDescriptor {
    /// xyz center, w squared radius shrunk by the filter size
    pub culling_sphere: Vec4,
    /// World-space size of one shadow texel
    pub texel_size: f32,
    /// World-space filter footprint
    pub filter_size: f32,
}

impl CascadeDescriptor {
    pub fn new(sphere: Vec4, tile_size: u32, filter: ShadowFilter) -> Self {
        let texel_size = 2.0 * sphere.w / tile_size as f32;
        let filter_size = texel_size * (filter.index() + 1) as f32;
        let radius = sphere.w - filter_size;
        Self {
            culling_sphere: Vec4::new(sphere.x, sphere.y, sphere.z, radius * radius),
            texel_size,
            filter_size,
        }
    }

    /// `(1 / radius², filter size · √2, 0, 0)`
    pub fn data(&self) -> Vec4 {
        Vec4::new(
            1.0 / self.culling_sphere.w.max(f32::EPSILON),
            self.filter_size * SQRT_2,
            0.0,
            0.0,
        )
    }
}

/// Scalar shadow globals
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShadowGlobals {
    /// (dir size, 1 / dir size, other size, 1 / other size)
    pub atlas_size: [f32; 4],
    /// (1 / max distance, 1 / distance fade, 1 / (1 - (1 - cascade fade)²), 0)
    pub distance_fade: [f32; 4],
    pub cascade_count: i32,
}

/// Per-frame shadow arrays
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowData {
    pub globals: ShadowGlobals,
    pub cascades: [CascadeDescriptor; MAX_CASCADES],
    pub directional_matrices: [Mat4; MAX_SHADOWED_DIRECTIONAL_LIGHTS * MAX_CASCADES],
    pub other_matrices: [Mat4; MAX_SHADOWED_OTHER_LIGHTS],
    pub other_tiles: [Vec4; MAX_SHADOWED_OTHER_LIGHTS],
}

impl Default for ShadowData {
    fn default() -> Self {
        Self {
            globals: ShadowGlobals::default(),
            cascades: [CascadeDescriptor::default(); MAX_CASCADES],
            directional_matrices: [Mat4::ZERO; MAX_SHADOWED_DIRECTIONAL_LIGHTS * MAX_CASCADES],
            other_matrices: [Mat4::ZERO; MAX_SHADOWED_OTHER_LIGHTS],
            other_tiles: [Vec4::ZERO; MAX_SHADOWED_OTHER_LIGHTS],
        }
    }
}

impl ShadowData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every array for a new frame
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Culling spheres in upload form
    pub fn culling_spheres(&self) -> [Vec4; MAX_CASCADES] {
        self.cascades.map(|c| c.culling_sphere)
    }

    /// Per-cascade data in upload form
    pub fn cascade_data(&self) -> [Vec4; MAX_CASCADES] {
        self.cascades.map(|c| c.data())
    }

    /// Directional shadow matrices as bytes for GPU upload
    pub fn directional_matrices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.directional_matrices)
    }

    /// Other shadow matrices as bytes for GPU upload
    pub fn other_matrices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.other_matrices)
    }

    pub fn other_tiles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.other_tiles)
    }

    /// Bytes of the cascade and directional matrix arrays
    pub fn directional_upload_bytes(&self) -> usize {
        let cascade_arrays = 2 * core::mem::size_of::<[Vec4; MAX_CASCADES]>();
        cascade_arrays + self.directional_matrices_bytes().len()
    }

    /// Bytes of the other-light matrix and tile arrays
    pub fn other_upload_bytes(&self) -> usize {
        self.other_matrices_bytes().len() + self.other_tiles_bytes().len()
    }
}

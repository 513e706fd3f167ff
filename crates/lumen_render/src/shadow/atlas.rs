//! Shadow Atlas Layout
//!
//! A shadow atlas is one square depth texture divided into an equal grid of
//! tiles. The grid is chosen per frame from the number of tiles in use:
//!
//! | Tiles | Split | Grid |
//! |-------|-------|------|
//! | 1     | 1     | 1x1  |
//! | 2-4   | 2     | 2x2  |
//! | 5-16  | 4     | 4x4  |

use glam::{Mat4, Vec2, Vec4};

use crate::resource::Rect;

/// Largest grid dimension an atlas is divided into
pub const MAX_SPLIT: u32 = 4;

/// Maximum number of tiles in an atlas
pub const MAX_TILES: usize = (MAX_SPLIT * MAX_SPLIT) as usize;

/// Smallest grid split whose tiles cover `tile_count`
pub fn split_for_tiles(tile_count: usize) -> u32 {
    if tile_count <= 1 {
        1
    } else if tile_count <= 4 {
        2
    } else {
        4
    }
}

/// Tile grid of one atlas for the current frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowAtlasLayout {
    /// Atlas resolution in texels
    pub size: u32,
    /// Tiles per row/column
    pub split: u32,
    /// Tile resolution in texels
    pub tile_size: u32,
}

impl ShadowAtlasLayout {
    /// Layout for `tile_count` tiles in an atlas of `size` texels
    pub fn new(size: u32, tile_count: usize) -> Self {
        let split = split_for_tiles(tile_count);
        Self {
            size,
            split,
            tile_size: size / split,
        }
    }

    /// Number of tiles the grid can hold
    pub fn capacity(&self) -> usize {
        (self.split * self.split) as usize
    }

    /// Tile scale in atlas UV space
    pub fn tile_scale(&self) -> f32 {
        1.0 / self.split as f32
    }

    /// Grid coordinate (column, row) of a tile
    pub fn tile_offset(&self, index: usize) -> Vec2 {
        let split = self.split as usize;
        Vec2::new((index % split) as f32, (index / split) as f32)
    }

    /// Pixel viewport of a tile
    pub fn tile_viewport(&self, index: usize) -> Rect {
        let offset = self.tile_offset(index);
        let tile = self.tile_size as f32;
        Rect::new(offset.x * tile, offset.y * tile, tile, tile)
    }

    /// Sampling bounds of a tile shrunk by half a texel, `w` carries `bias`
    pub fn tile_bounds(&self, index: usize, bias: f32) -> Vec4 {
        let offset = self.tile_offset(index);
        let scale = self.tile_scale();
        let border = 0.5 / self.size as f32;
        Vec4::new(
            offset.x * scale + border,
            offset.y * scale + border,
            scale - border - border,
            bias,
        )
    }
}

/// Convert a clip-space shadow matrix into atlas texture space
///
/// Maps x/y from [-1, 1] into the tile at `offset` (grid units) scaled by
/// `scale`, and z into [0, 1]. With a reversed depth buffer the depth row is
/// negated first.
pub fn atlas_matrix(view_projection: Mat4, offset: Vec2, scale: f32, reversed_z: bool) -> Mat4 {
    let mut m = view_projection;
    if reversed_z {
        m = Mat4::from_diagonal(Vec4::new(1.0, 1.0, -1.0, 1.0)) * m;
    }
    let to_tile = Mat4::from_cols(
        Vec4::new(0.5 * scale, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.5 * scale, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 0.0),
        Vec4::new((0.5 + offset.x) * scale, (0.5 + offset.y) * scale, 0.5, 1.0),
    );
    to_tile * m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_policy() {
        assert_eq!(split_for_tiles(0), 1);
        assert_eq!(split_for_tiles(1), 1);
        assert_eq!(split_for_tiles(2), 2);
        assert_eq!(split_for_tiles(4), 2);
        assert_eq!(split_for_tiles(5), 4);
        assert_eq!(split_for_tiles(16), 4);
    }

    #[test]
    fn test_split_monotonic() {
        let mut previous = 0;
        for tiles in 0..=MAX_TILES {
            let split = split_for_tiles(tiles);
            assert!(split >= previous);
            assert!((split * split) as usize >= tiles);
            previous = split;
        }
    }

    #[test]
    fn test_viewports_partition_atlas() {
        for &size in &[256u32, 1024, 4096] {
            for &tiles in &[1usize, 4, 16] {
                let layout = ShadowAtlasLayout::new(size, tiles);
                let rects: Vec<Rect> = (0..layout.capacity()).map(|i| layout.tile_viewport(i)).collect();

                let total: f32 = rects.iter().map(Rect::area).sum();
                assert_eq!(total, (size * size) as f32);

                for (i, a) in rects.iter().enumerate() {
                    assert!(a.x >= 0.0 && a.y >= 0.0);
                    assert!(a.x + a.width <= size as f32);
                    assert!(a.y + a.height <= size as f32);
                    for b in &rects[i + 1..] {
                        assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn test_four_cascades_at_1024() {
        let layout = ShadowAtlasLayout::new(1024, 4);
        assert_eq!(layout.split, 2);
        assert_eq!(layout.tile_size, 512);
        assert_eq!(layout.tile_viewport(3), Rect::new(512.0, 512.0, 512.0, 512.0));
    }

    #[test]
    fn test_tile_bounds_border() {
        let layout = ShadowAtlasLayout::new(1024, 16);
        let bounds = layout.tile_bounds(5, 0.25);
        let border = 0.5 / 1024.0;
        assert!((bounds.x - (0.25 + border)).abs() < 1e-6);
        assert!((bounds.y - (0.25 + border)).abs() < 1e-6);
        assert!((bounds.z - (0.25 - 2.0 * border)).abs() < 1e-6);
        assert_eq!(bounds.w, 0.25);
    }

    #[test]
    fn test_atlas_matrix_maps_into_tile() {
        // Identity clip space, tile (1, 0) of a 2x2 grid
        let m = atlas_matrix(Mat4::IDENTITY, Vec2::new(1.0, 0.0), 0.5, false);

        let low = m * Vec4::new(-1.0, -1.0, -1.0, 1.0);
        let high = m * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert!((low.x - 0.5).abs() < 1e-6);
        assert!((low.y - 0.0).abs() < 1e-6);
        assert!((low.z - 0.0).abs() < 1e-6);
        assert!((high.x - 1.0).abs() < 1e-6);
        assert!((high.y - 0.5).abs() < 1e-6);
        assert!((high.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_atlas_matrix_reversed_z() {
        let m = atlas_matrix(Mat4::IDENTITY, Vec2::ZERO, 1.0, true);
        let near = m * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!((near.z - 0.0).abs() < 1e-6);
        let far = m * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!((far.z - 1.0).abs() < 1e-6);
    }
}

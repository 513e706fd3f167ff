//! Shadow slots handed back to the light collector
//!
//! A slot tells the lighting shader where a light's shadow lives. Three
//! shapes exist:
//!
//! - not shadowed: strength 0, mask channel -1
//! - sentinel: the light is shadowed but nothing was rendered (no atlas
//!   capacity or no casters); strength is negated so the shader skips
//!   real-time sampling but can still use the shadowmask channel
//! - renderable: positive strength and a tile index

use glam::Vec4;

/// Which atlas a slot refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadowAtlasKind {
    Directional,
    Other,
}

/// Shadow reservation result for one light
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSlot {
    pub atlas: ShadowAtlasKind,
    /// First tile used by the light
    pub tile_index: u32,
    /// Cascades per light (directional only)
    pub cascade_count: u32,
    pub strength: f32,
    pub normal_bias: f32,
    /// Point lights occupy six consecutive tiles
    pub is_point: bool,
    /// Shadowmask channel, -1 if none
    pub mask_channel: i32,
}

impl ShadowSlot {
    /// Light has no real-time or baked shadows
    pub fn none(atlas: ShadowAtlasKind) -> Self {
        Self {
            atlas,
            tile_index: 0,
            cascade_count: 0,
            strength: 0.0,
            normal_bias: 0.0,
            is_point: false,
            mask_channel: -1,
        }
    }

    /// Shadowed light that could not be rendered this frame
    pub fn sentinel(atlas: ShadowAtlasKind, strength: f32, mask_channel: i32) -> Self {
        Self {
            strength: -strength,
            mask_channel,
            ..Self::none(atlas)
        }
    }

    /// True for sentinel slots
    pub fn is_sentinel(&self) -> bool {
        self.strength < 0.0
    }

    /// True if the light has a rendered shadow tile
    pub fn is_renderable(&self) -> bool {
        self.strength > 0.0
    }

    /// Number of atlas tiles the slot occupies
    pub fn tile_count(&self) -> usize {
        if !self.is_renderable() {
            0
        } else {
            match self.atlas {
                ShadowAtlasKind::Directional => self.cascade_count as usize,
                ShadowAtlasKind::Other if self.is_point => 6,
                ShadowAtlasKind::Other => 1,
            }
        }
    }

    /// Packed shader form
    ///
    /// Directional: `(strength, tile, normal bias, mask channel)`.
    /// Other: `(strength, tile, 1 for point lights, mask channel)`.
    pub fn to_vector(&self) -> Vec4 {
        let z = match self.atlas {
            ShadowAtlasKind::Directional => self.normal_bias,
            ShadowAtlasKind::Other => {
                if self.is_point {
                    1.0
                } else {
                    0.0
                }
            }
        };
        Vec4::new(self.strength, self.tile_index as f32, z, self.mask_channel as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_vector() {
        let slot = ShadowSlot::none(ShadowAtlasKind::Directional);
        assert_eq!(slot.to_vector(), Vec4::new(0.0, 0.0, 0.0, -1.0));
        assert!(!slot.is_renderable());
        assert!(!slot.is_sentinel());
        assert_eq!(slot.tile_count(), 0);
    }

    #[test]
    fn test_sentinel_negates_strength() {
        let slot = ShadowSlot::sentinel(ShadowAtlasKind::Other, 0.8, 2);
        assert_eq!(slot.to_vector(), Vec4::new(-0.8, 0.0, 0.0, 2.0));
        assert!(slot.is_sentinel());
        assert_eq!(slot.tile_count(), 0);
    }

    #[test]
    fn test_packing() {
        let directional = ShadowSlot {
            atlas: ShadowAtlasKind::Directional,
            tile_index: 4,
            cascade_count: 4,
            strength: 1.0,
            normal_bias: 0.5,
            is_point: false,
            mask_channel: -1,
        };
        assert_eq!(directional.to_vector(), Vec4::new(1.0, 4.0, 0.5, -1.0));
        assert_eq!(directional.tile_count(), 4);

        let point = ShadowSlot {
            atlas: ShadowAtlasKind::Other,
            tile_index: 6,
            is_point: true,
            ..directional
        };
        assert_eq!(point.to_vector(), Vec4::new(1.0, 6.0, 1.0, -1.0));
        assert_eq!(point.tile_count(), 6);
    }
}

//! Render target descriptions
//!
//! The core never owns GPU memory. It describes temporary targets by id and
//! format, and the host allocates them when the command stream asks.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::property::ShaderId;

/// Destination or source of a pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTargetId {
    /// A temporary target previously allocated under this id
    Temporary(ShaderId),
    /// The camera's own output
    CameraTarget,
}

impl From<ShaderId> for RenderTargetId {
    fn from(id: ShaderId) -> Self {
        RenderTargetId::Temporary(id)
    }
}

/// Texture formats the pipeline requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderTextureFormat {
    /// LDR color
    Default,
    /// HDR color (16-bit float)
    DefaultHdr,
    /// Depth-only shadow map
    Shadowmap,
}

/// Texture sampling filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

/// What happens to existing contents when a target is bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadAction {
    Load,
    Clear,
    DontCare,
}

/// What happens to contents when a target is unbound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreAction {
    Store,
    DontCare,
}

/// Description of a per-frame temporary render target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TemporaryTargetDesc {
    pub width: u32,
    pub height: u32,
    /// Depth buffer bits (0, 16, 24 or 32)
    pub depth_bits: u32,
    pub filter: FilterMode,
    pub format: RenderTextureFormat,
}

impl TemporaryTargetDesc {
    /// Color target without depth
    pub fn color(width: u32, height: u32, format: RenderTextureFormat) -> Self {
        Self {
            width,
            height,
            depth_bits: 0,
            filter: FilterMode::Bilinear,
            format,
        }
    }

    /// Square shadow map with a 32-bit depth buffer
    pub fn shadow_map(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            depth_bits: 32,
            filter: FilterMode::Bilinear,
            format: RenderTextureFormat::Shadowmap,
        }
    }

    /// Approximate memory footprint in bytes
    pub fn estimated_bytes(&self) -> u64 {
        let color = match self.format {
            RenderTextureFormat::Default => 4,
            RenderTextureFormat::DefaultHdr => 8,
            RenderTextureFormat::Shadowmap => 0,
        };
        let depth = u64::from(self.depth_bits / 8);
        u64::from(self.width) * u64::from(self.height) * (color + depth)
    }
}

/// Pixel rectangle used for viewports
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True if the two rectangles share interior area
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Convert a gamma-space value to linear using the sRGB transfer curve
pub fn gamma_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else if value < 1.0 {
        ((value + 0.055) / 1.055).powf(2.4)
    } else {
        value.powf(2.2)
    }
}

/// Convert a gamma-space color to linear, keeping alpha
pub fn color_to_linear(color: Vec4) -> Vec4 {
    Vec4::new(
        gamma_to_linear(color.x),
        gamma_to_linear(color.y),
        gamma_to_linear(color.z),
        color.w,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_map_desc() {
        let desc = TemporaryTargetDesc::shadow_map(1024);
        assert_eq!(desc.width, 1024);
        assert_eq!(desc.height, 1024);
        assert_eq!(desc.depth_bits, 32);
        assert_eq!(desc.format, RenderTextureFormat::Shadowmap);
        assert_eq!(desc.estimated_bytes(), 1024 * 1024 * 4);
    }

    #[test]
    fn test_hdr_estimate() {
        let desc = TemporaryTargetDesc::color(100, 50, RenderTextureFormat::DefaultHdr);
        assert_eq!(desc.estimated_bytes(), 100 * 50 * 8);
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0.0, 0.0, 512.0, 512.0);
        let b = Rect::new(512.0, 0.0, 512.0, 512.0);
        let c = Rect::new(256.0, 256.0, 512.0, 512.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_gamma_to_linear() {
        assert_eq!(gamma_to_linear(0.0), 0.0);
        assert!((gamma_to_linear(1.0) - 1.0).abs() < 1e-5);
        assert!((gamma_to_linear(0.5) - 0.214_041).abs() < 1e-4);
        // Above one follows the 2.2 power curve
        assert!((gamma_to_linear(2.0) - 2.0f32.powf(2.2)).abs() < 1e-4);
    }

    #[test]
    fn test_color_to_linear_keeps_alpha() {
        let c = color_to_linear(Vec4::new(0.5, 0.5, 0.5, 0.3));
        assert_eq!(c.w, 0.3);
        assert!(c.x < 0.5);
    }
}

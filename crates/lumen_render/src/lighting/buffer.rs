//! Light Buffers
//!
//! Fixed-capacity light arrays in the layout lit shaders read:
//!
//! - directional lights: up to 4 (color, direction, shadow data)
//! - other lights: up to 64 points and spots combined (color, position with
//!   range attenuation in `w`, spot direction, spot angle terms, shadow data)
//!
//! Lights beyond capacity are dropped and counted, never wrapped.

use glam::Vec4;
use serde::Serialize;

use crate::command::CommandBuffer;
use crate::light::{LightKind, VisibleLight};
use crate::property::ShaderId;

/// Maximum directional lights
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
/// Maximum point and spot lights combined
pub const MAX_OTHER_LIGHTS: usize = 64;

/// Lower bound on squared range in the attenuation term
pub const RANGE_EPSILON: f32 = 0.00001;
/// Lower bound on the inner/outer cosine difference of a spot cone
pub const SPOT_EPSILON: f32 = 0.001;

pub const DIRECTIONAL_LIGHT_COUNT: ShaderId = ShaderId::from_name("_DirectionalLightCount");
pub const DIRECTIONAL_LIGHT_COLORS: ShaderId = ShaderId::from_name("_DirectionalLightColors");
pub const DIRECTIONAL_LIGHT_DIRECTIONS: ShaderId = ShaderId::from_name("_DirectionalLightDirections");
pub const DIRECTIONAL_LIGHT_SHADOW_DATA: ShaderId = ShaderId::from_name("_DirectionalLightShadowData");
pub const OTHER_LIGHT_COUNT: ShaderId = ShaderId::from_name("_OtherLightCount");
pub const OTHER_LIGHT_COLORS: ShaderId = ShaderId::from_name("_OtherLightColors");
pub const OTHER_LIGHT_POSITIONS: ShaderId = ShaderId::from_name("_OtherLightPositions");
pub const OTHER_LIGHT_DIRECTIONS: ShaderId = ShaderId::from_name("_OtherLightDirections");
pub const OTHER_LIGHT_SPOT_ANGLES: ShaderId = ShaderId::from_name("_OtherLightSpotAngles");
pub const OTHER_LIGHT_SHADOW_DATA: ShaderId = ShaderId::from_name("_OtherLightShadowData");

/// Shader-ready directional light
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLightData {
    pub color: Vec4,
    /// Direction toward the light
    pub direction: Vec4,
    pub shadow: Vec4,
}

impl DirectionalLightData {
    pub fn new(light: &VisibleLight, shadow: Vec4) -> Self {
        Self {
            color: light.final_color(),
            direction: (-light.forward()).extend(0.0),
            shadow,
        }
    }
}

/// Shader-ready point or spot light
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OtherLightData {
    pub color: Vec4,
    /// xyz position, w = 1 / max(range², ε)
    pub position: Vec4,
    /// Direction toward the light (spots only)
    pub direction: Vec4,
    /// (a, b) so that the cone fade is `saturate(dot · a + b)`
    pub spot_angles: Vec4,
    pub shadow: Vec4,
}

impl OtherLightData {
    pub fn new(light: &VisibleLight, shadow: Vec4) -> Self {
        let direction = match light.kind {
            LightKind::Spot { .. } => (-light.forward()).extend(0.0),
            _ => Vec4::ZERO,
        };
        Self {
            color: light.final_color(),
            position: light
                .position()
                .extend(1.0 / (light.range * light.range).max(RANGE_EPSILON)),
            direction,
            spot_angles: spot_angles(&light.kind),
            shadow,
        }
    }
}

/// Cone fade terms; point lights get `(0, 1)` so the fade is always 1
pub fn spot_angles(kind: &LightKind) -> Vec4 {
    match *kind {
        LightKind::Spot {
            spot_angle,
            inner_spot_angle,
        } => {
            let inner_cos = (0.5 * inner_spot_angle).to_radians().cos();
            let outer_cos = (0.5 * spot_angle).to_radians().cos();
            let angle_range_inv = 1.0 / (inner_cos - outer_cos).max(SPOT_EPSILON);
            Vec4::new(angle_range_inv, -outer_cos * angle_range_inv, 0.0, 0.0)
        }
        _ => Vec4::new(0.0, 1.0, 0.0, 0.0),
    }
}

/// Light collection statistics for one frame
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LightStats {
    pub visible: u32,
    pub directional: u32,
    pub other: u32,
    /// Lights dropped because an array was full
    pub overflow: u32,
    /// Lights with a rendered shadow tile
    pub shadowed: u32,
}

/// Per-frame light arrays
#[derive(Clone, Debug, PartialEq)]
pub struct LightBuffers {
    directional_count: usize,
    directional_colors: [Vec4; MAX_DIRECTIONAL_LIGHTS],
    directional_directions: [Vec4; MAX_DIRECTIONAL_LIGHTS],
    directional_shadow_data: [Vec4; MAX_DIRECTIONAL_LIGHTS],
    other_count: usize,
    other_colors: [Vec4; MAX_OTHER_LIGHTS],
    other_positions: [Vec4; MAX_OTHER_LIGHTS],
    other_directions: [Vec4; MAX_OTHER_LIGHTS],
    other_spot_angles: [Vec4; MAX_OTHER_LIGHTS],
    other_shadow_data: [Vec4; MAX_OTHER_LIGHTS],
}

impl Default for LightBuffers {
    fn default() -> Self {
        Self {
            directional_count: 0,
            directional_colors: [Vec4::ZERO; MAX_DIRECTIONAL_LIGHTS],
            directional_directions: [Vec4::ZERO; MAX_DIRECTIONAL_LIGHTS],
            directional_shadow_data: [Vec4::ZERO; MAX_DIRECTIONAL_LIGHTS],
            other_count: 0,
            other_colors: [Vec4::ZERO; MAX_OTHER_LIGHTS],
            other_positions: [Vec4::ZERO; MAX_OTHER_LIGHTS],
            other_directions: [Vec4::ZERO; MAX_OTHER_LIGHTS],
            other_spot_angles: [Vec4::ZERO; MAX_OTHER_LIGHTS],
            other_shadow_data: [Vec4::ZERO; MAX_OTHER_LIGHTS],
        }
    }
}

impl LightBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all lights for a new frame
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn directional_count(&self) -> usize {
        self.directional_count
    }

    pub fn other_count(&self) -> usize {
        self.other_count
    }

    pub fn is_directional_full(&self) -> bool {
        self.directional_count >= MAX_DIRECTIONAL_LIGHTS
    }

    pub fn is_other_full(&self) -> bool {
        self.other_count >= MAX_OTHER_LIGHTS
    }

    /// Add a directional light
    ///
    /// Returns the array index, or `None` if at capacity.
    pub fn push_directional(&mut self, light: DirectionalLightData) -> Option<usize> {
        if self.is_directional_full() {
            return None;
        }
        let index = self.directional_count;
        self.directional_colors[index] = light.color;
        self.directional_directions[index] = light.direction;
        self.directional_shadow_data[index] = light.shadow;
        self.directional_count += 1;
        Some(index)
    }

    /// Add a point or spot light
    pub fn push_other(&mut self, light: OtherLightData) -> Option<usize> {
        if self.is_other_full() {
            return None;
        }
        let index = self.other_count;
        self.other_colors[index] = light.color;
        self.other_positions[index] = light.position;
        self.other_directions[index] = light.direction;
        self.other_spot_angles[index] = light.spot_angles;
        self.other_shadow_data[index] = light.shadow;
        self.other_count += 1;
        Some(index)
    }

    /// Directional light at `index`, if populated
    pub fn directional(&self, index: usize) -> Option<DirectionalLightData> {
        (index < self.directional_count).then(|| DirectionalLightData {
            color: self.directional_colors[index],
            direction: self.directional_directions[index],
            shadow: self.directional_shadow_data[index],
        })
    }

    /// Other light at `index`, if populated
    pub fn other(&self, index: usize) -> Option<OtherLightData> {
        (index < self.other_count).then(|| OtherLightData {
            color: self.other_colors[index],
            position: self.other_positions[index],
            direction: self.other_directions[index],
            spot_angles: self.other_spot_angles[index],
            shadow: self.other_shadow_data[index],
        })
    }

    /// Bytes `upload` sends, counts included
    pub fn uploaded_bytes(&self) -> u64 {
        let mut bytes = 2 * std::mem::size_of::<i32>();
        if self.directional_count > 0 {
            bytes += array_bytes(&[
                &self.directional_colors[..],
                &self.directional_directions[..],
                &self.directional_shadow_data[..],
            ]);
        }
        if self.other_count > 0 {
            bytes += array_bytes(&[
                &self.other_colors[..],
                &self.other_positions[..],
                &self.other_directions[..],
                &self.other_spot_angles[..],
                &self.other_shadow_data[..],
            ]);
        }
        bytes as u64
    }

    /// Record counts and arrays as shader globals
    ///
    /// Arrays are uploaded at full capacity and skipped when empty.
    pub fn upload(&self, buffer: &mut CommandBuffer) {
        buffer.set_global_int(DIRECTIONAL_LIGHT_COUNT, self.directional_count as i32);
        if self.directional_count > 0 {
            buffer.set_global_vector_array(DIRECTIONAL_LIGHT_COLORS, &self.directional_colors);
            buffer.set_global_vector_array(DIRECTIONAL_LIGHT_DIRECTIONS, &self.directional_directions);
            buffer.set_global_vector_array(DIRECTIONAL_LIGHT_SHADOW_DATA, &self.directional_shadow_data);
        }

        buffer.set_global_int(OTHER_LIGHT_COUNT, self.other_count as i32);
        if self.other_count > 0 {
            buffer.set_global_vector_array(OTHER_LIGHT_COLORS, &self.other_colors);
            buffer.set_global_vector_array(OTHER_LIGHT_POSITIONS, &self.other_positions);
            buffer.set_global_vector_array(OTHER_LIGHT_DIRECTIONS, &self.other_directions);
            buffer.set_global_vector_array(OTHER_LIGHT_SPOT_ANGLES, &self.other_spot_angles);
            buffer.set_global_vector_array(OTHER_LIGHT_SHADOW_DATA, &self.other_shadow_data);
        }
    }
}

fn array_bytes(arrays: &[&[Vec4]]) -> usize {
    arrays
        .iter()
        .map(|values| bytemuck::cast_slice::<Vec4, u8>(values).len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RenderCommand;
    use glam::Vec3;

    #[test]
    fn test_directional_data() {
        let light = VisibleLight::directional(Vec3::NEG_Y).with_color(Vec3::ONE, 2.0);
        let data = DirectionalLightData::new(&light, Vec4::ZERO);
        assert_eq!(data.color, Vec4::new(2.0, 2.0, 2.0, 1.0));
        assert!((data.direction - Vec4::new(0.0, 1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_point_attenuation() {
        let light = VisibleLight::point(Vec3::new(1.0, 2.0, 3.0), 4.0);
        let data = OtherLightData::new(&light, Vec4::ZERO);
        assert_eq!(data.position, Vec4::new(1.0, 2.0, 3.0, 1.0 / 16.0));
        assert_eq!(data.spot_angles, Vec4::new(0.0, 1.0, 0.0, 0.0));
        assert_eq!(data.direction, Vec4::ZERO);
    }

    #[test]
    fn test_zero_range_clamped() {
        let light = VisibleLight::point(Vec3::ZERO, 0.0);
        let data = OtherLightData::new(&light, Vec4::ZERO);
        assert_eq!(data.position.w, 1.0 / RANGE_EPSILON);
        assert!(data.position.w.is_finite());
    }

    #[test]
    fn test_spot_angles() {
        let angles = spot_angles(&LightKind::Spot {
            spot_angle: 60.0,
            inner_spot_angle: 30.0,
        });
        let inner = 15f32.to_radians().cos();
        let outer = 30f32.to_radians().cos();
        let inv = 1.0 / (inner - outer);
        assert!((angles.x - inv).abs() < 1e-3);
        assert!((angles.y + outer * inv).abs() < 1e-3);

        // At the outer edge the fade is zero, at the inner edge one
        assert!((outer * angles.x + angles.y).abs() < 1e-4);
        assert!((inner * angles.x + angles.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_cone_clamped() {
        let angles = spot_angles(&LightKind::Spot {
            spot_angle: 45.0,
            inner_spot_angle: 45.0,
        });
        assert_eq!(angles.x, 1.0 / SPOT_EPSILON);
    }

    #[test]
    fn test_capacity_truncation() {
        let mut buffers = LightBuffers::new();
        let sun = DirectionalLightData::new(&VisibleLight::directional(Vec3::NEG_Y), Vec4::ZERO);
        for i in 0..MAX_DIRECTIONAL_LIGHTS {
            assert_eq!(buffers.push_directional(sun), Some(i));
        }
        assert_eq!(buffers.push_directional(sun), None);
        assert_eq!(buffers.directional_count(), MAX_DIRECTIONAL_LIGHTS);

        let point = OtherLightData::new(&VisibleLight::point(Vec3::ZERO, 1.0), Vec4::ZERO);
        for _ in 0..MAX_OTHER_LIGHTS {
            assert!(buffers.push_other(point).is_some());
        }
        assert_eq!(buffers.push_other(point), None);
        assert_eq!(buffers.other_count(), MAX_OTHER_LIGHTS);
        assert!(buffers.other(MAX_OTHER_LIGHTS).is_none());
    }

    #[test]
    fn test_upload_skips_empty_arrays() {
        let buffers = LightBuffers::new();
        let mut cmd = CommandBuffer::new("Lighting");
        buffers.upload(&mut cmd);
        assert_eq!(
            cmd.commands(),
            &[
                RenderCommand::SetGlobalInt { id: DIRECTIONAL_LIGHT_COUNT, value: 0 },
                RenderCommand::SetGlobalInt { id: OTHER_LIGHT_COUNT, value: 0 },
            ]
        );
    }

    #[test]
    fn test_upload_full_capacity_arrays() {
        let mut buffers = LightBuffers::new();
        let point = OtherLightData::new(&VisibleLight::point(Vec3::ZERO, 1.0), Vec4::ZERO);
        buffers.push_other(point);
        let mut cmd = CommandBuffer::new("Lighting");
        buffers.upload(&mut cmd);

        let arrays: Vec<usize> = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetGlobalVectorArray { values, .. } => Some(values.len()),
                _ => None,
            })
            .collect();
        assert_eq!(arrays, vec![MAX_OTHER_LIGHTS; 5]);
    }

    #[test]
    fn test_uploaded_bytes_other_arrays() {
        let mut buffers = LightBuffers::new();
        assert_eq!(buffers.uploaded_bytes(), 8);
        buffers.push_other(OtherLightData::new(&VisibleLight::point(Vec3::ZERO, 2.0), Vec4::ZERO));
        assert_eq!(buffers.uploaded_bytes(), 8 + 5 * MAX_OTHER_LIGHTS as u64 * 16);
    }

    #[test]
    fn test_uploaded_bytes_follow_counts() {
        let mut buffers = LightBuffers::new();
        buffers.push_directional(DirectionalLightData::new(&VisibleLight::directional(Vec3::NEG_Y), Vec4::ZERO));
        assert_eq!(buffers.uploaded_bytes(), 8 + 3 * 4 * 16);
    }
}

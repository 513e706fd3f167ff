//! CPU culling and shadow projection math
//!
//! # Directional cascades
//!
//! 1. Split the camera frustum at `ratio × shadow distance`
//! 2. Enclose the cascade's frustum slice in a bounding sphere
//! 3. Look at the sphere center along the light direction
//! 4. Orthographic projection enclosing the sphere, pulled back by the
//!    light's near plane offset
//! 5. Snap the projection to the tile's texel grid to prevent swimming

use glam::{Mat4, Vec3, Vec4};
use lumen_render::{
    Bounds, Camera, CubemapFace, CullingResults, LightKind, ShadowMatrices, ShadowSplitData, VisibleLight,
};

use crate::scene::SceneDescription;

/// Lowest near plane used for perspective shadow projections
const MIN_SHADOW_NEAR: f32 = 0.01;

/// Culling result for one camera
#[derive(Clone, Debug)]
pub struct SceneCulling {
    camera: Camera,
    shadow_distance: f32,
    lights: Vec<VisibleLight>,
    casters: Vec<Bounds>,
    light_index_map: Option<Vec<i32>>,
}

impl SceneCulling {
    /// Cull `scene` for `camera`
    ///
    /// Returns `None` if the camera cannot produce a frustum.
    pub fn cull(scene: &SceneDescription, camera: &Camera, shadow_distance: f32) -> Option<Self> {
        if !camera.is_valid() || !shadow_distance.is_finite() {
            return None;
        }

        let (_, _, forward) = camera.basis();
        let lights: Vec<VisibleLight> = scene
            .lights
            .iter()
            .filter(|light| light.enabled)
            .map(|light| light.to_visible())
            .filter(|light| match light.kind {
                LightKind::Directional => true,
                LightKind::Point | LightKind::Spot { .. } => {
                    sphere_in_view(camera, forward, light.position(), light.range)
                }
            })
            .collect();

        log::trace!(
            "Culled '{}': {} of {} lights visible",
            camera.name,
            lights.len(),
            scene.lights.len()
        );

        Some(Self {
            camera: camera.clone(),
            shadow_distance,
            lights,
            casters: scene.casters.iter().map(|c| c.bounds).collect(),
            light_index_map: None,
        })
    }

    /// Build from an explicit light list, skipping visibility tests
    pub fn from_lights(camera: &Camera, shadow_distance: f32, lights: Vec<VisibleLight>, casters: Vec<Bounds>) -> Self {
        Self {
            camera: camera.clone(),
            shadow_distance,
            lights,
            casters,
            light_index_map: None,
        }
    }

    pub fn shadow_distance(&self) -> f32 {
        self.shadow_distance
    }

    /// Remap table handed over by the light collector
    pub fn light_index_map(&self) -> Option<&[i32]> {
        self.light_index_map.as_deref()
    }

    fn light(&self, index: usize) -> Option<&VisibleLight> {
        self.lights.get(index)
    }

    /// Split distances `[start, end]` of a cascade
    fn cascade_range(&self, cascade_index: usize, cascade_count: usize, split_ratios: Vec3) -> (f32, f32) {
        let ratios = [split_ratios.x, split_ratios.y, split_ratios.z];
        let split = |i: usize| {
            if i + 1 >= cascade_count {
                self.shadow_distance
            } else {
                ratios[i] * self.shadow_distance
            }
        };
        let start = if cascade_index == 0 {
            self.camera.near
        } else {
            split(cascade_index - 1)
        };
        (start, split(cascade_index).max(start))
    }
}

impl CullingResults for SceneCulling {
    fn visible_lights(&self) -> &[VisibleLight] {
        &self.lights
    }

    fn shadow_caster_bounds(&self, visible_light_index: usize) -> Option<Bounds> {
        let light = self.light(visible_light_index)?;
        let mut affected = self.casters.iter().filter(|bounds| match light.kind {
            LightKind::Directional => true,
            LightKind::Point | LightKind::Spot { .. } => {
                bounds.distance_squared(light.position()) <= light.range * light.range
            }
        });

        let mut result = *affected.next()?;
        for bounds in affected {
            result.encapsulate(bounds);
        }
        Some(result)
    }

    fn compute_directional_shadow_matrices(
        &self,
        visible_light_index: usize,
        cascade_index: usize,
        cascade_count: usize,
        split_ratios: Vec3,
        tile_size: u32,
        near_plane_offset: f32,
    ) -> Option<ShadowMatrices> {
        let light = self.light(visible_light_index)?;
        if !light.kind.is_directional() || cascade_index >= cascade_count || tile_size == 0 {
            return None;
        }

        let (near, far) = self.cascade_range(cascade_index, cascade_count, split_ratios);
        let corners = frustum_slice_corners(&self.camera, near, far);
        let (center, radius) = bounding_sphere(&corners);
        if radius <= 0.0 {
            return None;
        }

        let direction = light.forward().normalize_or_zero();
        let eye = center - direction * radius * 2.0;
        let view = Mat4::look_at_rh(eye, center, find_up_vector(direction));
        let projection = Mat4::orthographic_rh(-radius, radius, -radius, radius, -near_plane_offset, radius * 4.0);
        let projection = snap_to_texel(projection, view, tile_size);

        Some(ShadowMatrices {
            view,
            projection,
            split: ShadowSplitData {
                culling_sphere: center.extend(radius),
                shadow_cascade_blend_culling_factor: 0.0,
            },
        })
    }

    fn compute_spot_shadow_matrices(&self, visible_light_index: usize) -> Option<ShadowMatrices> {
        let light = self.light(visible_light_index)?;
        let LightKind::Spot { spot_angle, .. } = light.kind else {
            return None;
        };

        let position = light.position();
        let direction = light.forward().normalize_or_zero();
        let view = Mat4::look_at_rh(position, position + direction, find_up_vector(direction));
        let near = light.shadow_near_plane.max(MIN_SHADOW_NEAR);
        let projection = Mat4::perspective_rh(spot_angle.to_radians(), 1.0, near, light.range.max(near * 2.0));

        Some(ShadowMatrices {
            view,
            projection,
            split: ShadowSplitData::default(),
        })
    }

    fn compute_point_shadow_matrices(
        &self,
        visible_light_index: usize,
        face: CubemapFace,
        fov_bias: f32,
    ) -> Option<ShadowMatrices> {
        let light = self.light(visible_light_index)?;
        if light.kind != LightKind::Point {
            return None;
        }

        let position = light.position();
        let view = Mat4::look_at_rh(position, position + face.direction(), face.up());
        let near = light.shadow_near_plane.max(MIN_SHADOW_NEAR);
        let fov = (90.0 + fov_bias).clamp(1.0, 179.0).to_radians();
        let projection = Mat4::perspective_rh(fov, 1.0, near, light.range.max(near * 2.0));

        Some(ShadowMatrices {
            view,
            projection,
            split: ShadowSplitData::default(),
        })
    }

    fn set_light_index_map(&mut self, map: &[i32]) {
        self.light_index_map = Some(map.to_vec());
    }
}

/// Conservative sphere-vs-view test: within far plane reach and not
/// entirely behind the camera
fn sphere_in_view(camera: &Camera, forward: Vec3, center: Vec3, radius: f32) -> bool {
    let offset = center - camera.position;
    let depth = offset.dot(forward);
    depth >= -radius && offset.length() <= camera.far + radius
}

/// World-space corners of the camera frustum between `near` and `far`
fn frustum_slice_corners(camera: &Camera, near: f32, far: f32) -> [Vec3; 8] {
    let (right, up, forward) = camera.basis();
    let tan_half = (camera.fov_y.to_radians() * 0.5).tan();
    let aspect = camera.aspect();

    let mut corners = [Vec3::ZERO; 8];
    for (slice, &distance) in [near, far].iter().enumerate() {
        let half_height = distance * tan_half;
        let half_width = half_height * aspect;
        let center = camera.position + forward * distance;
        for (i, (sx, sy)) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)].iter().enumerate() {
            corners[slice * 4 + i] = center + right * (half_width * sx) + up * (half_height * sy);
        }
    }
    corners
}

/// Center and radius of a sphere enclosing `points`
fn bounding_sphere(points: &[Vec3; 8]) -> (Vec3, f32) {
    let center = points.iter().fold(Vec3::ZERO, |sum, p| sum + *p) / points.len() as f32;
    let radius = points
        .iter()
        .map(|p| p.distance(center))
        .fold(0.0f32, f32::max);
    (center, radius)
}

/// Up vector not parallel to `direction`
fn find_up_vector(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.9 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Shift the projection so the world origin lands on a texel center
fn snap_to_texel(mut projection: Mat4, view: Mat4, resolution: u32) -> Mat4 {
    let origin = (projection * view) * Vec4::W;
    let texel_size = 2.0 / resolution as f32;

    let snapped_x = (origin.x / texel_size).round() * texel_size;
    let snapped_y = (origin.y / texel_size).round() * texel_size;

    projection.w_axis.x += snapped_x - origin.x;
    projection.w_axis.y += snapped_y - origin.y;
    projection
}

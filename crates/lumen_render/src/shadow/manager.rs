//! Shadow Atlas Manager
//!
//! Reserves atlas tiles while the light collector walks the visible lights,
//! then renders every reserved tile into two shared atlases:
//!
//! - directional atlas: `light count × cascade count` tiles
//! - other atlas: one tile per spot light, six per point light
//!
//! Per frame: `setup` → `reserve_*` (once per light) → `render` → `cleanup`.

use core::f32::consts::SQRT_2;

use glam::{Mat4, Vec4};
use serde::Serialize;

use super::atlas::{atlas_matrix, ShadowAtlasLayout};
use super::config::ShadowSettings;
use super::data::{
    CascadeDescriptor, ShadowData, MAX_SHADOWED_DIRECTIONAL_LIGHTS, MAX_SHADOWED_OTHER_LIGHTS,
};
use super::slot::{ShadowAtlasKind, ShadowSlot};
use crate::command::CommandBuffer;
use crate::context::{CubemapFace, CullingResults, RenderContext};
use crate::draw::{ShadowDrawingSettings, ShadowProjection};
use crate::light::{LightKind, VisibleLight};
use crate::property::ShaderId;
use crate::resource::{LoadAction, StoreAction, TemporaryTargetDesc};

pub const DIRECTIONAL_SHADOW_ATLAS: ShaderId = ShaderId::from_name("_DirectionalShadowAtlas");
pub const DIRECTIONAL_SHADOW_MATRICES: ShaderId = ShaderId::from_name("_DirectionalShadowMatrices");
pub const OTHER_SHADOW_ATLAS: ShaderId = ShaderId::from_name("_OtherShadowAtlas");
pub const OTHER_SHADOW_MATRICES: ShaderId = ShaderId::from_name("_OtherShadowMatrices");
pub const OTHER_SHADOW_TILES: ShaderId = ShaderId::from_name("_OtherShadowTiles");
pub const CASCADE_COUNT: ShaderId = ShaderId::from_name("_CascadeCount");
pub const CASCADE_CULLING_SPHERES: ShaderId = ShaderId::from_name("_CascadeCullingSpheres");
pub const CASCADE_DATA: ShaderId = ShaderId::from_name("_CascadeData");
pub const SHADOW_ATLAS_SIZE: ShaderId = ShaderId::from_name("_ShadowAtlasSize");
pub const SHADOW_DISTANCE_FADE: ShaderId = ShaderId::from_name("_ShadowDistanceFade");
pub const SHADOW_PANCAKING: ShaderId = ShaderId::from_name("_ShadowPancaking");

pub const DIRECTIONAL_FILTER_KEYWORDS: [&str; 3] =
    ["_DIRECTIONAL_PCF3", "_DIRECTIONAL_PCF5", "_DIRECTIONAL_PCF7"];
pub const OTHER_FILTER_KEYWORDS: [&str; 3] = ["_OTHER_PCF3", "_OTHER_PCF5", "_OTHER_PCF7"];
pub const CASCADE_BLEND_KEYWORDS: [&str; 2] = ["_CASCADE_BLEND_SOFT", "_CASCADE_BLEND_DITHER"];
pub const SHADOW_MASK_KEYWORDS: [&str; 2] = ["_SHADOW_MASK_ALWAYS", "_SHADOW_MASK_DISTANCE"];

/// Tiles a point light needs (one per cube face)
pub const POINT_LIGHT_TILES: usize = 6;

#[derive(Clone, Copy, Debug)]
struct ShadowedDirectionalLight {
    visible_light_index: usize,
    slope_scale_bias: f32,
    near_plane_offset: f32,
}

#[derive(Clone, Copy, Debug)]
struct ShadowedOtherLight {
    visible_light_index: usize,
    slope_scale_bias: f32,
    normal_bias: f32,
    is_point: bool,
}

/// Shadow statistics for one frame
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ShadowStats {
    /// Directional lights holding a reservation
    pub directional_lights: u32,
    /// Reserved directional tiles
    pub directional_tiles: u32,
    /// Reserved other tiles
    pub other_tiles: u32,
    /// Lights that received a sentinel slot
    pub sentinels: u32,
    /// Shadow caster draws issued
    pub caster_draws: u32,
    /// Tiles skipped because no matrices could be computed
    pub skipped_tiles: u32,
}

/// Shadow atlas manager
#[derive(Debug)]
pub struct Shadows {
    buffer: CommandBuffer,
    settings: ShadowSettings,
    directional: [Option<ShadowedDirectionalLight>; MAX_SHADOWED_DIRECTIONAL_LIGHTS],
    directional_count: usize,
    /// Indexed by first tile
    other: [Option<ShadowedOtherLight>; MAX_SHADOWED_OTHER_LIGHTS],
    other_tile_count: usize,
    /// Slots issued this frame, by visible light index
    reservations: Vec<(usize, ShadowSlot)>,
    use_shadowmask: bool,
    other_atlas_allocated: bool,
    data: ShadowData,
    stats: ShadowStats,
}

impl Default for Shadows {
    fn default() -> Self {
        Self::new()
    }
}

impl Shadows {
    pub fn new() -> Self {
        Self {
            buffer: CommandBuffer::new("Shadows"),
            settings: ShadowSettings::default(),
            directional: [None; MAX_SHADOWED_DIRECTIONAL_LIGHTS],
            directional_count: 0,
            other: [None; MAX_SHADOWED_OTHER_LIGHTS],
            other_tile_count: 0,
            reservations: Vec::new(),
            use_shadowmask: false,
            other_atlas_allocated: false,
            data: ShadowData::new(),
            stats: ShadowStats::default(),
        }
    }

    /// Reset all reservations and arrays for a new frame
    pub fn setup(&mut self, settings: &ShadowSettings) {
        self.settings = settings.clone();
        self.directional = [None; MAX_SHADOWED_DIRECTIONAL_LIGHTS];
        self.directional_count = 0;
        self.other = [None; MAX_SHADOWED_OTHER_LIGHTS];
        self.other_tile_count = 0;
        self.reservations.clear();
        self.use_shadowmask = false;
        self.other_atlas_allocated = false;
        self.data.clear();
        self.stats = ShadowStats::default();
    }

    /// Reserve cascade tiles for a directional light
    pub fn reserve_directional<R: CullingResults>(
        &mut self,
        culling: &R,
        light: &VisibleLight,
        visible_light_index: usize,
    ) -> ShadowSlot {
        if let Some(slot) = self.previous_reservation(visible_light_index) {
            return slot;
        }
        let slot = self.try_reserve_directional(culling, light, visible_light_index);
        self.reservations.push((visible_light_index, slot));
        slot
    }

    /// Reserve tiles for a point (six) or spot (one) light
    pub fn reserve_other<R: CullingResults>(
        &mut self,
        culling: &R,
        light: &VisibleLight,
        visible_light_index: usize,
    ) -> ShadowSlot {
        if let Some(slot) = self.previous_reservation(visible_light_index) {
            return slot;
        }
        let slot = self.try_reserve_other(culling, light, visible_light_index);
        self.reservations.push((visible_light_index, slot));
        slot
    }

    fn previous_reservation(&self, visible_light_index: usize) -> Option<ShadowSlot> {
        let (_, slot) = self
            .reservations
            .iter()
            .find(|(index, _)| *index == visible_light_index)?;
        log::warn!(
            "Shadow reservation repeated for visible light {} in the same frame",
            visible_light_index
        );
        Some(*slot)
    }

    fn try_reserve_directional<R: CullingResults>(
        &mut self,
        culling: &R,
        light: &VisibleLight,
        visible_light_index: usize,
    ) -> ShadowSlot {
        if self.directional_count >= MAX_SHADOWED_DIRECTIONAL_LIGHTS || !light.casts_shadows() {
            return ShadowSlot::none(ShadowAtlasKind::Directional);
        }

        let mask_channel = self.mask_channel(light);
        if culling.shadow_caster_bounds(visible_light_index).is_none() {
            self.stats.sentinels += 1;
            return ShadowSlot::sentinel(ShadowAtlasKind::Directional, light.shadow_strength, mask_channel);
        }

        let index = self.directional_count;
        self.directional[index] = Some(ShadowedDirectionalLight {
            visible_light_index,
            slope_scale_bias: light.shadow_bias,
            near_plane_offset: light.shadow_near_plane,
        });
        self.directional_count += 1;

        let cascade_count = self.settings.directional.cascade_count;
        self.stats.directional_lights += 1;
        self.stats.directional_tiles += cascade_count;

        ShadowSlot {
            atlas: ShadowAtlasKind::Directional,
            tile_index: cascade_count * index as u32,
            cascade_count,
            strength: light.shadow_strength,
            normal_bias: light.shadow_normal_bias,
            is_point: false,
            mask_channel,
        }
    }

    fn try_reserve_other<R: CullingResults>(
        &mut self,
        culling: &R,
        light: &VisibleLight,
        visible_light_index: usize,
    ) -> ShadowSlot {
        if !light.casts_shadows() {
            return ShadowSlot::none(ShadowAtlasKind::Other);
        }

        let mask_channel = self.mask_channel(light);
        let is_point = matches!(light.kind, LightKind::Point);
        let needed = if is_point { POINT_LIGHT_TILES } else { 1 };

        // All-or-nothing: a point light never gets a partial cube
        if self.other_tile_count + needed > MAX_SHADOWED_OTHER_LIGHTS
            || culling.shadow_caster_bounds(visible_light_index).is_none()
        {
            log::debug!(
                "Other light {} gets a shadow sentinel ({} of {} tiles used)",
                visible_light_index,
                self.other_tile_count,
                MAX_SHADOWED_OTHER_LIGHTS
            );
            self.stats.sentinels += 1;
            return ShadowSlot::sentinel(ShadowAtlasKind::Other, light.shadow_strength, mask_channel);
        }

        let tile_index = self.other_tile_count;
        self.other[tile_index] = Some(ShadowedOtherLight {
            visible_light_index,
            slope_scale_bias: light.shadow_bias,
            normal_bias: light.shadow_normal_bias,
            is_point,
        });
        self.other_tile_count += needed;
        self.stats.other_tiles += needed as u32;

        ShadowSlot {
            atlas: ShadowAtlasKind::Other,
            tile_index: tile_index as u32,
            cascade_count: 0,
            strength: light.shadow_strength,
            normal_bias: light.shadow_normal_bias,
            is_point,
            mask_channel,
        }
    }

    fn mask_channel(&mut self, light: &VisibleLight) -> i32 {
        if light.baking.uses_shadowmask() {
            self.use_shadowmask = true;
            light.baking.occlusion_mask_channel
        } else {
            -1
        }
    }

    /// Render all reserved tiles and upload the shadow globals
    pub fn render<C: RenderContext>(&mut self, context: &mut C, culling: &C::Culling) {
        let reversed_z = context.uses_reversed_z_buffer();

        if self.directional_count > 0 {
            self.render_directional(context, culling, reversed_z);
        } else {
            // Shaders always sample the atlas, so bind a 1x1 placeholder
            self.buffer
                .get_temporary_target(DIRECTIONAL_SHADOW_ATLAS, TemporaryTargetDesc::shadow_map(1));
        }

        if self.other_tile_count > 0 {
            self.render_other(context, culling, reversed_z);
        } else {
            self.buffer
                .set_global_texture(OTHER_SHADOW_ATLAS, DIRECTIONAL_SHADOW_ATLAS);
        }

        self.buffer.begin_sample();
        let mask_keyword = self
            .use_shadowmask
            .then(|| self.settings.shadowmask_mode.keyword_index());
        self.buffer.set_keyword_group(&SHADOW_MASK_KEYWORDS, mask_keyword);

        let cascade_count = if self.directional_count > 0 {
            self.settings.directional.cascade_count as i32
        } else {
            0
        };
        self.data.globals.cascade_count = cascade_count;
        self.buffer.set_global_int(CASCADE_COUNT, cascade_count);

        let fade = 1.0 - self.settings.directional.cascade_fade;
        self.data.globals.distance_fade = [
            1.0 / self.settings.max_distance,
            1.0 / self.settings.distance_fade,
            1.0 / (1.0 - fade * fade),
            0.0,
        ];
        self.buffer
            .set_global_vector(SHADOW_DISTANCE_FADE, Vec4::from(self.data.globals.distance_fade));
        self.buffer
            .set_global_vector(SHADOW_ATLAS_SIZE, Vec4::from(self.data.globals.atlas_size));
        self.buffer.end_sample();
        self.buffer.flush(context);
    }

    fn render_directional<C: RenderContext>(&mut self, context: &mut C, culling: &C::Culling, reversed_z: bool) {
        let size = self.settings.directional.atlas_size;
        self.data.globals.atlas_size[0] = size as f32;
        self.data.globals.atlas_size[1] = 1.0 / size as f32;

        self.buffer
            .get_temporary_target(DIRECTIONAL_SHADOW_ATLAS, TemporaryTargetDesc::shadow_map(size));
        self.buffer
            .set_render_target(DIRECTIONAL_SHADOW_ATLAS, LoadAction::DontCare, StoreAction::Store);
        self.buffer.clear_render_target(true, false, Vec4::ZERO);
        self.buffer.set_global_float(SHADOW_PANCAKING, 1.0);
        self.buffer.begin_sample();
        self.buffer.flush(context);

        let cascade_count = self.settings.directional.cascade_count as usize;
        let layout = ShadowAtlasLayout::new(size, self.directional_count * cascade_count);
        for index in 0..self.directional_count {
            self.render_directional_light(context, culling, index, &layout, reversed_z);
        }

        let spheres = self.data.culling_spheres();
        let cascade_data = self.data.cascade_data();
        self.buffer.set_global_vector_array(CASCADE_CULLING_SPHERES, &spheres);
        self.buffer.set_global_vector_array(CASCADE_DATA, &cascade_data);
        self.buffer
            .set_global_matrix_array(DIRECTIONAL_SHADOW_MATRICES, &self.data.directional_matrices);
        self.buffer.set_keyword_group(
            &DIRECTIONAL_FILTER_KEYWORDS,
            self.settings.directional.filter.keyword_index(),
        );
        self.buffer.set_keyword_group(
            &CASCADE_BLEND_KEYWORDS,
            self.settings.directional.cascade_blend.keyword_index(),
        );
        self.buffer.end_sample();
        self.buffer.flush(context);
    }

    fn render_directional_light<C: RenderContext>(
        &mut self,
        context: &mut C,
        culling: &C::Culling,
        index: usize,
        layout: &ShadowAtlasLayout,
        reversed_z: bool,
    ) {
        let Some(light) = self.directional[index] else {
            return;
        };
        let settings = &self.settings.directional;
        let cascade_count = settings.cascade_count as usize;
        let ratios = settings.cascade_ratios();
        let filter = settings.filter;
        let culling_factor = (0.8 - settings.cascade_fade).max(0.0);
        let tile_offset = index * cascade_count;

        for cascade in 0..cascade_count {
            let tile_index = tile_offset + cascade;
            let Some(matrices) = culling.compute_directional_shadow_matrices(
                light.visible_light_index,
                cascade,
                cascade_count,
                ratios,
                layout.tile_size,
                light.near_plane_offset,
            ) else {
                log::debug!(
                    "No cascade {} matrices for directional light {}, tile skipped",
                    cascade,
                    light.visible_light_index
                );
                self.stats.skipped_tiles += 1;
                continue;
            };

            let mut split = matrices.split;
            split.shadow_cascade_blend_culling_factor = culling_factor;
            if index == 0 {
                self.data.cascades[cascade] =
                    CascadeDescriptor::new(split.culling_sphere, layout.tile_size, filter);
            }

            self.buffer.set_viewport(layout.tile_viewport(tile_index));
            self.data.directional_matrices[tile_index] = atlas_matrix(
                matrices.projection * matrices.view,
                layout.tile_offset(tile_index),
                layout.tile_scale(),
                reversed_z,
            );
            self.buffer.set_view_projection(matrices.view, matrices.projection);
            self.buffer.set_global_depth_bias(0.0, light.slope_scale_bias);
            self.buffer.flush(context);
            context.draw_shadows(
                culling,
                &ShadowDrawingSettings {
                    visible_light_index: light.visible_light_index,
                    projection: ShadowProjection::Orthographic,
                    split_data: split,
                },
            );
            self.stats.caster_draws += 1;
        }
        self.buffer.set_global_depth_bias(0.0, 0.0);
    }

    fn render_other<C: RenderContext>(&mut self, context: &mut C, culling: &C::Culling, reversed_z: bool) {
        let size = self.settings.other.atlas_size;
        self.data.globals.atlas_size[2] = size as f32;
        self.data.globals.atlas_size[3] = 1.0 / size as f32;

        self.buffer
            .get_temporary_target(OTHER_SHADOW_ATLAS, TemporaryTargetDesc::shadow_map(size));
        self.other_atlas_allocated = true;
        self.buffer
            .set_render_target(OTHER_SHADOW_ATLAS, LoadAction::DontCare, StoreAction::Store);
        self.buffer.clear_render_target(true, false, Vec4::ZERO);
        self.buffer.set_global_float(SHADOW_PANCAKING, 0.0);
        self.buffer.begin_sample();
        self.buffer.flush(context);

        let layout = ShadowAtlasLayout::new(size, self.other_tile_count);
        let mut tile = 0;
        while tile < self.other_tile_count {
            match self.other[tile] {
                Some(light) if light.is_point => {
                    self.render_point(context, culling, tile, light, &layout, reversed_z);
                    tile += POINT_LIGHT_TILES;
                }
                Some(light) => {
                    self.render_spot(context, culling, tile, light, &layout, reversed_z);
                    tile += 1;
                }
                None => tile += 1,
            }
        }

        self.buffer
            .set_global_matrix_array(OTHER_SHADOW_MATRICES, &self.data.other_matrices);
        self.buffer
            .set_global_vector_array(OTHER_SHADOW_TILES, &self.data.other_tiles);
        self.buffer
            .set_keyword_group(&OTHER_FILTER_KEYWORDS, self.settings.other.filter.keyword_index());
        self.buffer.end_sample();
        self.buffer.flush(context);
    }

    fn render_spot<C: RenderContext>(
        &mut self,
        context: &mut C,
        culling: &C::Culling,
        tile: usize,
        light: ShadowedOtherLight,
        layout: &ShadowAtlasLayout,
        reversed_z: bool,
    ) {
        let Some(matrices) = culling.compute_spot_shadow_matrices(light.visible_light_index) else {
            log::debug!("No spot matrices for light {}, tile skipped", light.visible_light_index);
            self.stats.skipped_tiles += 1;
            return;
        };

        let texel_size = 2.0 / (layout.tile_size as f32 * matrices.projection.x_axis.x);
        let filter_size = texel_size * (self.settings.other.filter.index() + 1) as f32;
        let bias = light.normal_bias * filter_size * SQRT_2;

        self.draw_other_tile(
            context,
            culling,
            tile,
            light,
            matrices.view,
            matrices.projection,
            bias,
            layout,
            reversed_z,
        );
        self.buffer.set_global_depth_bias(0.0, 0.0);
    }

    fn render_point<C: RenderContext>(
        &mut self,
        context: &mut C,
        culling: &C::Culling,
        first_tile: usize,
        light: ShadowedOtherLight,
        layout: &ShadowAtlasLayout,
        reversed_z: bool,
    ) {
        let texel_size = 2.0 / layout.tile_size as f32;
        let filter_size = texel_size * (self.settings.other.filter.index() + 1) as f32;
        let bias = light.normal_bias * filter_size * SQRT_2;
        let fov_bias = point_fov_bias(bias, filter_size);

        for (face_index, face) in CubemapFace::ALL.into_iter().enumerate() {
            let Some(matrices) =
                culling.compute_point_shadow_matrices(light.visible_light_index, face, fov_bias)
            else {
                log::debug!(
                    "No {:?} face matrices for point light {}, tile skipped",
                    face,
                    light.visible_light_index
                );
                self.stats.skipped_tiles += 1;
                continue;
            };
            let view = flip_point_view(matrices.view);
            self.draw_other_tile(
                context,
                culling,
                first_tile + face_index,
                light,
                view,
                matrices.projection,
                bias,
                layout,
                reversed_z,
            );
        }
        self.buffer.set_global_depth_bias(0.0, 0.0);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_other_tile<C: RenderContext>(
        &mut self,
        context: &mut C,
        culling: &C::Culling,
        tile: usize,
        light: ShadowedOtherLight,
        view: Mat4,
        projection: Mat4,
        bias: f32,
        layout: &ShadowAtlasLayout,
        reversed_z: bool,
    ) {
        self.data.other_tiles[tile] = layout.tile_bounds(tile, bias);
        self.data.other_matrices[tile] =
            atlas_matrix(projection * view, layout.tile_offset(tile), layout.tile_scale(), reversed_z);

        self.buffer.set_viewport(layout.tile_viewport(tile));
        self.buffer.set_view_projection(view, projection);
        self.buffer.set_global_depth_bias(0.0, light.slope_scale_bias);
        self.buffer.flush(context);
        context.draw_shadows(
            culling,
            &ShadowDrawingSettings {
                visible_light_index: light.visible_light_index,
                projection: ShadowProjection::Perspective,
                split_data: Default::default(),
            },
        );
        self.stats.caster_draws += 1;
    }

    /// Release the atlases allocated in `render`
    pub fn cleanup<C: RenderContext>(&mut self, context: &mut C) {
        self.buffer.release_temporary_target(DIRECTIONAL_SHADOW_ATLAS);
        if self.other_atlas_allocated {
            self.buffer.release_temporary_target(OTHER_SHADOW_ATLAS);
            self.other_atlas_allocated = false;
        }
        self.buffer.flush(context);
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Shadow arrays written this frame
    pub fn data(&self) -> &ShadowData {
        &self.data
    }

    pub fn stats(&self) -> &ShadowStats {
        &self.stats
    }

    pub fn directional_count(&self) -> usize {
        self.directional_count
    }

    /// Tiles reserved in the other atlas
    pub fn other_tile_count(&self) -> usize {
        self.other_tile_count
    }

    /// Bytes of shadow arrays `render` uploads for the current reservations
    pub fn uploaded_bytes(&self) -> u64 {
        let mut bytes = 0;
        if self.directional_count > 0 {
            bytes += self.data.directional_upload_bytes();
        }
        if self.other_tile_count > 0 {
            bytes += self.data.other_upload_bytes();
        }
        bytes as u64
    }

    /// True if any reserved light uses a baked shadowmask
    pub fn uses_shadowmask(&self) -> bool {
        self.use_shadowmask
    }

    /// Reservations made this frame
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }
}

/// Field-of-view widening (degrees) so filter taps at face edges stay inside the tile
pub fn point_fov_bias(normal_bias: f32, filter_size: f32) -> f32 {
    (1.0 + normal_bias + filter_size).atan().to_degrees() * 2.0 - 90.0
}

/// Negate the view's second row so cube faces are rendered upright
pub fn flip_point_view(mut view: Mat4) -> Mat4 {
    view.y_axis.y = -view.y_axis.y;
    view.z_axis.y = -view.z_axis.y;
    view.w_axis.y = -view.w_axis.y;
    view
}

//! Light Collector
//!
//! Walks the visible light list once per camera, packs lights into the
//! fixed-capacity arrays and asks the shadow manager for a slot per light.

use super::buffer::{DirectionalLightData, LightBuffers, LightStats, OtherLightData};
use crate::command::CommandBuffer;
use crate::context::{CullingResults, RenderContext};
use crate::light::LightKind;
use crate::shadow::{ShadowSettings, Shadows};

/// Keyword enabling per-object light index lists
pub const LIGHTS_PER_OBJECT_KEYWORD: &str = "_LIGHTS_PER_OBJECT";

/// Light collector
#[derive(Debug)]
pub struct Lighting {
    buffer: CommandBuffer,
    shadows: Shadows,
    lights: LightBuffers,
    index_map: Vec<i32>,
    stats: LightStats,
}

impl Default for Lighting {
    fn default() -> Self {
        Self::new()
    }
}

impl Lighting {
    pub fn new() -> Self {
        Self {
            buffer: CommandBuffer::new("Lighting"),
            shadows: Shadows::new(),
            lights: LightBuffers::new(),
            index_map: Vec::new(),
            stats: LightStats::default(),
        }
    }

    /// Collect lights, upload them and render shadow atlases
    pub fn setup<C: RenderContext>(
        &mut self,
        context: &mut C,
        culling: &mut C::Culling,
        shadow_settings: &ShadowSettings,
        use_lights_per_object: bool,
    ) {
        self.buffer.begin_sample();
        self.shadows.setup(shadow_settings);
        self.setup_lights(culling, use_lights_per_object);
        self.buffer.end_sample();
        self.buffer.flush(context);

        self.shadows.render(context, culling);
        log::trace!(
            "Lighting: {} directional, {} other, {} overflow",
            self.stats.directional,
            self.stats.other,
            self.stats.overflow
        );
    }

    fn setup_lights<R: CullingResults>(&mut self, culling: &mut R, use_lights_per_object: bool) {
        self.lights.clear();
        self.stats = LightStats::default();
        self.index_map.clear();

        let light_count = culling.visible_lights().len();
        self.stats.visible = light_count as u32;
        if use_lights_per_object {
            self.index_map.resize(light_count, -1);
        }

        for index in 0..light_count {
            let light = culling.visible_lights()[index];
            let mut new_index = -1;
            match light.kind {
                LightKind::Directional => {
                    if self.lights.is_directional_full() {
                        self.stats.overflow += 1;
                    } else {
                        let slot = self.shadows.reserve_directional(&*culling, &light, index);
                        self.stats.shadowed += u32::from(slot.is_renderable());
                        self.lights
                            .push_directional(DirectionalLightData::new(&light, slot.to_vector()));
                        self.stats.directional += 1;
                    }
                }
                LightKind::Point | LightKind::Spot { .. } => {
                    if self.lights.is_other_full() {
                        self.stats.overflow += 1;
                    } else {
                        let slot = self.shadows.reserve_other(&*culling, &light, index);
                        self.stats.shadowed += u32::from(slot.is_renderable());
                        if let Some(other_index) =
                            self.lights.push_other(OtherLightData::new(&light, slot.to_vector()))
                        {
                            new_index = other_index as i32;
                        }
                        self.stats.other += 1;
                    }
                }
            }
            if use_lights_per_object {
                self.index_map[index] = new_index;
            }
        }

        if self.stats.overflow > 0 {
            log::debug!("{} lights over capacity were dropped", self.stats.overflow);
        }

        if use_lights_per_object {
            culling.set_light_index_map(&self.index_map);
        }
        self.buffer
            .set_keyword(LIGHTS_PER_OBJECT_KEYWORD, use_lights_per_object);
        self.lights.upload(&mut self.buffer);
    }

    /// Release shadow atlases
    pub fn cleanup<C: RenderContext>(&mut self, context: &mut C) {
        self.shadows.cleanup(context);
    }

    /// Light arrays written this frame
    pub fn buffers(&self) -> &LightBuffers {
        &self.lights
    }

    pub fn shadows(&self) -> &Shadows {
        &self.shadows
    }

    /// Visible light → other-light index table (empty unless per-object lights are on)
    pub fn index_map(&self) -> &[i32] {
        &self.index_map
    }

    pub fn stats(&self) -> &LightStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::buffer::{
        DIRECTIONAL_LIGHT_COUNT, DIRECTIONAL_LIGHT_SHADOW_DATA, MAX_DIRECTIONAL_LIGHTS, MAX_OTHER_LIGHTS,
        OTHER_LIGHT_COUNT, OTHER_LIGHT_SHADOW_DATA,
    };
    use crate::light::{LightShadows, VisibleLight};
    use crate::testing::{MockContext, MockCulling};
    use glam::{Vec3, Vec4};

    fn collect(lights: Vec<VisibleLight>, per_object: bool) -> (Lighting, MockContext, MockCulling) {
        let mut culling = MockCulling::new(lights);
        let mut context = MockContext::with_scene(culling.clone());
        let mut lighting = Lighting::new();
        lighting.setup(&mut context, &mut culling, &ShadowSettings::default(), per_object);
        (lighting, context, culling)
    }

    #[test]
    fn test_empty_light_set() {
        let (lighting, context, _) = collect(vec![], false);
        assert_eq!(context.int(DIRECTIONAL_LIGHT_COUNT), Some(0));
        assert_eq!(context.int(OTHER_LIGHT_COUNT), Some(0));
        assert!(context.vector_array(DIRECTIONAL_LIGHT_SHADOW_DATA).is_none());
        assert_eq!(lighting.stats().visible, 0);
    }

    #[test]
    fn test_truncation_at_capacity() {
        let mut lights = vec![VisibleLight::directional(Vec3::NEG_Y); 6];
        lights.extend((0..70).map(|i| VisibleLight::point(Vec3::new(i as f32, 0.0, 0.0), 5.0)));
        let (lighting, context, _) = collect(lights, false);

        assert_eq!(context.int(DIRECTIONAL_LIGHT_COUNT), Some(MAX_DIRECTIONAL_LIGHTS as i32));
        assert_eq!(context.int(OTHER_LIGHT_COUNT), Some(MAX_OTHER_LIGHTS as i32));
        assert_eq!(lighting.stats().overflow, 2 + 6);
        assert_eq!(lighting.buffers().directional_count(), 4);
        assert_eq!(lighting.buffers().other_count(), 64);
    }

    #[test]
    fn test_per_object_index_map() {
        let lights = vec![
            VisibleLight::point(Vec3::ZERO, 5.0),
            VisibleLight::directional(Vec3::NEG_Y),
            VisibleLight::spot(Vec3::ZERO, Vec3::NEG_Y, 5.0, 45.0, 30.0),
        ];
        let (lighting, context, culling) = collect(lights, true);

        assert_eq!(lighting.index_map(), &[0, -1, 1]);
        assert_eq!(culling.index_map, Some(vec![0, -1, 1]));
        assert_eq!(context.keyword(LIGHTS_PER_OBJECT_KEYWORD), Some(true));
    }

    #[test]
    fn test_index_map_handed_to_culling() {
        let mut culling = MockCulling::new(vec![VisibleLight::point(Vec3::ZERO, 5.0)]);
        let mut context = MockContext::with_scene(culling.clone());
        let mut lighting = Lighting::new();
        lighting.setup(&mut context, &mut culling, &ShadowSettings::default(), true);
        assert_eq!(culling.index_map, Some(vec![0]));

        lighting.setup(&mut context, &mut culling, &ShadowSettings::default(), false);
        assert!(lighting.index_map().is_empty());
        assert_eq!(context.keyword(LIGHTS_PER_OBJECT_KEYWORD), Some(false));
    }

    #[test]
    fn test_overflow_lights_marked_in_index_map() {
        let lights: Vec<VisibleLight> = (0..66).map(|_| VisibleLight::point(Vec3::ZERO, 5.0)).collect();
        let (lighting, _, _) = collect(lights, true);
        let map = lighting.index_map();
        assert_eq!(map.len(), 66);
        assert_eq!(map[63], 63);
        assert_eq!(map[64], -1);
        assert_eq!(map[65], -1);
    }

    #[test]
    fn test_shadow_data_written_per_light() {
        let lights = vec![
            VisibleLight::directional(Vec3::NEG_Y).with_shadows(LightShadows::Hard, 0.5, 0.0, 0.3),
            VisibleLight::point(Vec3::ZERO, 5.0).with_shadows(LightShadows::Soft, 1.0, 0.0, 0.0),
        ];
        let (lighting, context, _) = collect(lights, false);

        let dir = context.vector_array(DIRECTIONAL_LIGHT_SHADOW_DATA).unwrap();
        assert_eq!(dir[0], Vec4::new(0.5, 0.0, 0.3, -1.0));
        let other = context.vector_array(OTHER_LIGHT_SHADOW_DATA).unwrap();
        assert_eq!(other[0], Vec4::new(1.0, 0.0, 1.0, -1.0));
        assert_eq!(lighting.stats().shadowed, 2);
        // Each light reserved exactly once
        assert_eq!(lighting.shadows().reservation_count(), 2);
    }

    #[test]
    fn test_shadows_rendered_after_light_upload() {
        let lights = vec![VisibleLight::directional(Vec3::NEG_Y).with_shadows(LightShadows::Hard, 1.0, 0.0, 0.0)];
        let (_, context, _) = collect(lights, false);

        let first_shadow = context.commands.iter().position(|(name, _)| name == "Shadows").unwrap();
        let last_lighting = context.commands.iter().rposition(|(name, _)| name == "Lighting").unwrap();
        assert!(last_lighting < first_shadow);
        assert_eq!(context.shadow_draws.len(), 4);
    }
}

//! Scene descriptions loaded from JSON

use glam::Vec3;
use lumen_render::{
    BakingOutput, Bounds, Camera, CameraType, ClearFlags, LightKind, LightShadows, VisibleLight,
};
use serde::{Deserialize, Serialize};

use crate::tracker::HeadlessResult;

/// A light in the scene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightDescription {
    pub name: String,
    pub enabled: bool,
    pub kind: LightKind,
    pub position: Vec3,
    /// Direction the light shines toward (directional and spot)
    pub direction: Vec3,
    /// Linear color
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub shadows: LightShadows,
    pub shadow_strength: f32,
    pub shadow_bias: f32,
    pub shadow_normal_bias: f32,
    pub shadow_near_plane: f32,
    pub baking: BakingOutput,
}

impl Default for LightDescription {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            kind: LightKind::Point,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            shadows: LightShadows::None,
            shadow_strength: 1.0,
            shadow_bias: 0.0,
            shadow_normal_bias: 0.4,
            shadow_near_plane: 0.1,
            baking: BakingOutput::default(),
        }
    }
}

impl LightDescription {
    /// Light record as culling hands it to the renderer
    pub fn to_visible(&self) -> VisibleLight {
        let light = match self.kind {
            LightKind::Directional => VisibleLight::directional(self.direction),
            LightKind::Point => VisibleLight::point(self.position, self.range),
            LightKind::Spot {
                spot_angle,
                inner_spot_angle,
            } => VisibleLight::spot(self.position, self.direction, self.range, spot_angle, inner_spot_angle),
        };
        VisibleLight {
            shadow_near_plane: self.shadow_near_plane,
            ..light
                .with_color(self.color, self.intensity)
                .with_shadows(self.shadows, self.shadow_strength, self.shadow_bias, self.shadow_normal_bias)
                .with_baking(self.baking)
        }
    }
}

/// A shadow casting object, reduced to its bounds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowCaster {
    #[serde(default)]
    pub name: String,
    pub bounds: Bounds,
}

/// Everything the headless host knows about a scene
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub lights: Vec<LightDescription>,
    pub casters: Vec<ShadowCaster>,
    pub cameras: Vec<Camera>,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> HeadlessResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> HeadlessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in scene: a sun, five point lights, a spot light, a game and a
    /// scene view camera
    pub fn demo() -> Self {
        let mut lights = vec![LightDescription {
            name: "Sun".into(),
            kind: LightKind::Directional,
            direction: Vec3::new(-0.3, -1.0, 0.4),
            color: Vec3::new(1.0, 0.96, 0.84),
            shadows: LightShadows::Soft,
            shadow_bias: 1.0,
            ..Default::default()
        }];
        lights.extend((0..5).map(|i| LightDescription {
            name: format!("Lamp {}", i),
            kind: LightKind::Point,
            position: Vec3::new(-8.0 + 4.0 * i as f32, 2.0, 5.0),
            range: 6.0,
            color: Vec3::new(1.0, 0.6, 0.3),
            intensity: 2.0,
            shadows: LightShadows::Hard,
            ..Default::default()
        }));
        lights.push(LightDescription {
            name: "Spot".into(),
            kind: LightKind::Spot {
                spot_angle: 50.0,
                inner_spot_angle: 30.0,
            },
            position: Vec3::new(0.0, 6.0, 10.0),
            direction: Vec3::new(0.0, -1.0, 0.2),
            range: 15.0,
            intensity: 4.0,
            shadows: LightShadows::Soft,
            ..Default::default()
        });

        let casters = vec![
            ShadowCaster {
                name: "Ground".into(),
                bounds: Bounds::new(Vec3::new(0.0, -0.5, 10.0), Vec3::new(50.0, 0.5, 50.0)),
            },
            ShadowCaster {
                name: "Crate".into(),
                bounds: Bounds::new(Vec3::new(0.0, 1.0, 6.0), Vec3::ONE),
            },
            ShadowCaster {
                name: "Pillar".into(),
                bounds: Bounds::new(Vec3::new(-4.0, 3.0, 8.0), Vec3::new(0.5, 3.0, 0.5)),
            },
        ];

        let game = Camera::looking_at("Main Camera", Vec3::new(0.0, 3.0, -6.0), Vec3::new(0.0, 1.0, 8.0), 1920, 1080);
        let scene_view = Camera {
            camera_type: CameraType::SceneView,
            clear_flags: ClearFlags::Color,
            ..Camera::looking_at("SceneCamera", Vec3::new(12.0, 10.0, -8.0), Vec3::new(0.0, 0.0, 6.0), 1280, 720)
        };

        Self {
            lights,
            casters,
            cameras: vec![game, scene_view],
        }
    }
}

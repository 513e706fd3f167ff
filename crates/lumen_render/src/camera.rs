//! Camera description consumed by the orchestrator

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Kind of camera; post-processing only applies up to `SceneView`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CameraType {
    #[default]
    Game,
    SceneView,
    Preview,
    Reflection,
}

/// What the camera clears before drawing, ordered from most to least
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClearFlags {
    #[default]
    Skybox,
    Color,
    Depth,
    Nothing,
}

/// Camera state for one render
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub name: String,
    pub camera_type: CameraType,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub clear_flags: ClearFlags,
    /// Background color in gamma space
    pub background_color: Vec4,
    pub allow_hdr: bool,
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: "Main Camera".into(),
            camera_type: CameraType::Game,
            pixel_width: 1920,
            pixel_height: 1080,
            clear_flags: ClearFlags::Skybox,
            background_color: Vec4::new(0.19, 0.3, 0.47, 0.0),
            allow_hdr: true,
            position: Vec3::new(0.0, 1.0, -10.0),
            forward: Vec3::Z,
            up: Vec3::Y,
            fov_y: 60.0,
            near: 0.3,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Perspective game camera looking from `position` toward `target`
    pub fn looking_at(name: impl Into<String>, position: Vec3, target: Vec3, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            pixel_width: width,
            pixel_height: height,
            position,
            forward: (target - position).normalize_or_zero(),
            ..Default::default()
        }
    }

    pub fn aspect(&self) -> f32 {
        self.pixel_width as f32 / self.pixel_height.max(1) as f32
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect(), self.near, self.far)
    }

    /// Right-handed basis `(right, up, forward)`, orthonormalized
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.forward.normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);
        (right, up, forward)
    }

    /// True if the camera can produce a frustum
    pub fn is_valid(&self) -> bool {
        self.pixel_width > 0
            && self.pixel_height > 0
            && self.near > 0.0
            && self.far > self.near
            && self.fov_y > 0.0
            && self.fov_y < 180.0
            && self.position.is_finite()
            && self.forward.length_squared() > 0.0
            && self.forward.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_type_ordering() {
        assert!(CameraType::Game <= CameraType::SceneView);
        assert!(CameraType::SceneView <= CameraType::SceneView);
        assert!(CameraType::Preview > CameraType::SceneView);
        assert!(CameraType::Reflection > CameraType::SceneView);
    }

    #[test]
    fn test_clear_flags_ordering() {
        assert!(ClearFlags::Skybox < ClearFlags::Color);
        assert!(ClearFlags::Color < ClearFlags::Depth);
        assert!(ClearFlags::Depth < ClearFlags::Nothing);
    }

    #[test]
    fn test_camera_validity() {
        let camera = Camera::default();
        assert!(camera.is_valid());

        let zero = Camera { pixel_width: 0, ..Default::default() };
        assert!(!zero.is_valid());

        let inverted = Camera { near: 10.0, far: 1.0, ..Default::default() };
        assert!(!inverted.is_valid());
    }

    #[test]
    fn test_basis_orthonormal() {
        let camera = Camera::looking_at("c", Vec3::new(0.0, 5.0, -5.0), Vec3::ZERO, 800, 600);
        let (right, up, forward) = camera.basis();
        assert!(right.dot(up).abs() < 1e-5);
        assert!(right.dot(forward).abs() < 1e-5);
        assert!((up.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_camera_json_defaults() {
        let camera: Camera = serde_json::from_str(r#"{ "name": "Scene", "camera_type": "SceneView" }"#).unwrap();
        assert_eq!(camera.camera_type, CameraType::SceneView);
        assert_eq!(camera.pixel_width, 1920);
    }
}

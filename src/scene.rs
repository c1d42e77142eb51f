use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spheres_shared::{RaytracerConfig, SceneBuilder, SceneConstants, SphereInstance};

use crate::config::RenderSettings;
use crate::error::RenderError;

/// Camera that looks at a focus point and orbits around it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub eye: Vec3,
    pub focus: Vec3,
    pub up: Vec3,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            eye: Vec3::from(RaytracerConfig::CAMERA_EYE),
            focus: Vec3::from(RaytracerConfig::CAMERA_FOCUS),
            up: Vec3::from(RaytracerConfig::CAMERA_UP),
        }
    }

    /// Inverse of the left-handed view matrix.
    pub fn camera_to_world(&self) -> Mat4 {
        Mat4::look_at_lh(self.eye, self.focus, self.up).inverse()
    }

    pub fn forward(&self) -> Vec3 {
        (self.focus - self.eye).normalize_or_zero()
    }

    pub fn right(&self) -> Vec3 {
        self.up.cross(self.forward()).normalize_or_zero()
    }

    /// Rotate the eye around the focus, keeping the distance.
    pub fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32) {
        let offset = self.eye - self.focus;
        let radius = offset.length();
        if radius == 0.0 {
            return;
        }

        let yaw = offset.x.atan2(offset.z) + yaw_delta;
        let pitch = ((offset.y / radius).asin() + pitch_delta)
            .clamp(-RaytracerConfig::CAMERA_PITCH_CLAMP, RaytracerConfig::CAMERA_PITCH_CLAMP);

        self.eye = self.focus
            + radius * Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());
    }

    /// Slide eye and focus together along the view and side axes.
    pub fn translate(&mut self, forward: f32, right: f32) {
        let delta = self.forward() * forward + self.right() * right;
        self.eye += delta;
        self.focus += delta;
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Scene geometry, camera, random pool and trace parameters
pub struct SceneState {
    pub camera: OrbitCamera,
    pub instances: Vec<SphereInstance>,
    pub random_floats: Vec<f32>,
    pub sky_top_color: [f32; 4],
    pub sky_bottom_color: [f32; 4],
    pub vertical_fov_radians: f32,
    pub max_recursion_depth: u32,
    pub rays_per_pixel: u32,
    pub lambertian_attenuation: f32,
}

impl SceneState {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        let instances = SceneBuilder::build_default_scene(settings.planet_desc(), settings.main_desc());
        let random_floats = Self::generate_random_pool(settings.random_float_count(), settings.seed);

        log::info!(
            "Scene: {} spheres, {} random values (seed {}), {} rays per pixel, max depth {}",
            instances.len(),
            random_floats.len(),
            settings.seed,
            settings.rays_per_pixel,
            settings.max_depth
        );

        Self {
            camera: OrbitCamera::new(),
            instances,
            random_floats,
            sky_top_color: RaytracerConfig::SKY_TOP_COLOR,
            sky_bottom_color: RaytracerConfig::SKY_BOTTOM_COLOR,
            vertical_fov_radians: settings.vertical_fov_radians(),
            max_recursion_depth: settings.max_depth,
            rays_per_pixel: settings.rays_per_pixel,
            lambertian_attenuation: settings.lambertian_attenuation,
        }
    }

    /// Uniform values in `[-1, 1]`, reproducible for a given seed.
    pub fn generate_random_pool(count: u32, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count).map(|_| rng.gen_range(-1.0..=1.0)).collect()
    }

    /// Reject anything the shading core cannot evaluate.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroDimensions { width, height });
        }
        if self.random_floats.is_empty() {
            return Err(RenderError::EmptyRandomPool);
        }
        if self.rays_per_pixel == 0 {
            return Err(RenderError::ZeroSamples);
        }
        if self.instances.len() > RaytracerConfig::MAX_INSTANCES {
            return Err(RenderError::TooManyInstances {
                count: self.instances.len(),
                max: RaytracerConfig::MAX_INSTANCES,
            });
        }
        if let Some(instance) = self.instances.iter().position(|instance| !instance.is_invertible()) {
            return Err(RenderError::SingularTransform { instance });
        }
        Ok(())
    }

    /// Frame constants for a `width` x `height` dispatch.
    pub fn constants(&self, width: u32, height: u32) -> Result<SceneConstants, RenderError> {
        self.validate(width, height)?;

        Ok(SceneConstants {
            camera_to_world: self.camera.camera_to_world().to_cols_array_2d(),
            sky_top_color: self.sky_top_color,
            sky_bottom_color: self.sky_bottom_color,
            random_float_count: self.random_floats.len() as u32,
            vertical_fov_radians: self.vertical_fov_radians,
            max_recursion_depth: self.max_recursion_depth,
            rays_per_pixel: self.rays_per_pixel,
            lambertian_attenuation: self.lambertian_attenuation,
            instance_count: self.instances.len() as u32,
            _padding: [0; 2],
        })
    }
}

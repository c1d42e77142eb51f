use glam::{vec3, Mat4, UVec2, Vec2, Vec3};

#[cfg(all(target_arch = "spirv", feature = "shader"))]
use spirv_std::num_traits::Float;

/// Ray representation for raytracing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is kept as given: object-space rays carry the
    /// instance scale in their length so that `t` matches between spaces.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get point along ray at parameter t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Camera position in world space: the camera-space origin pushed through the transform.
pub fn world_camera_position(camera_to_world: &Mat4) -> Vec3 {
    camera_to_world.transform_point3(Vec3::ZERO)
}

/// Build the primary ray for a pixel.
///
/// The image plane sits at `z = 1` in camera space. Aspect correction is applied to X only,
/// so wide frames widen the view and the vertical FOV stays exact.
pub fn camera_ray(
    pixel: UVec2,
    dimensions: UVec2,
    jitter: Vec2,
    vertical_fov: f32,
    camera_to_world: &Mat4,
) -> Ray {
    let width = dimensions.x as f32;
    let height = dimensions.y as f32;
    let half_height = (vertical_fov / 2.0).tan();

    let camera_point = vec3(
        ((pixel.x as f32 + jitter.x) / width * 2.0 - 1.0) * (width / height) * half_height,
        -((pixel.y as f32 + jitter.y) / height * 2.0 - 1.0) * half_height,
        1.0,
    );

    let origin = world_camera_position(camera_to_world);
    let target = camera_to_world.transform_point3(camera_point);

    Ray::new(origin, (target - origin).normalize())
}

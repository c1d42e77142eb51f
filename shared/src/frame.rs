use bytemuck::{Pod, Zeroable};
use glam::{vec3, Mat4, UVec2, Vec3, Vec4};

use crate::camera::{camera_ray, Ray};
use crate::material::{sky_color, Material};
use crate::payload::RayPayload;
use crate::sampling::RandomPool;
use crate::sphere::{IntersectionAttributes, SphereInstance};
use crate::RaytracerConfig;

/// Constants for one dispatch. Filled by the host before the frame, read-only afterwards.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct SceneConstants {
    /// Column-major camera-to-world transform.
    pub camera_to_world: [[f32; 4]; 4],
    pub sky_top_color: [f32; 4],
    pub sky_bottom_color: [f32; 4],
    pub random_float_count: u32,
    pub vertical_fov_radians: f32,
    pub max_recursion_depth: u32,
    pub rays_per_pixel: u32,
    pub lambertian_attenuation: f32,
    pub instance_count: u32,
    pub _padding: [u32; 2],
}

impl SceneConstants {
    pub fn camera_to_world(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.camera_to_world)
    }

    pub fn sky_top(&self) -> Vec3 {
        vec3(self.sky_top_color[0], self.sky_top_color[1], self.sky_top_color[2])
    }

    pub fn sky_bottom(&self) -> Vec3 {
        vec3(self.sky_bottom_color[0], self.sky_bottom_color[1], self.sky_bottom_color[2])
    }
}

/// Closest surface found by a trace, resolved to world space.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHit {
    pub t: f32,
    pub instance_index: u32,
    pub attributes: IntersectionAttributes,
    pub world_point: Vec3,
    pub world_normal: Vec3,
    pub material: Material,
}

/// Whatever the rays are traced against.
pub trait Scene {
    /// Closest hit along `ray` with distance in `[t_min, t_max]`.
    fn closest_hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<SurfaceHit>;
}

/// Linear scan over the sphere instances. With a handful of spheres this is the whole
/// acceleration structure.
#[derive(Clone, Copy)]
pub struct InstanceList<'a> {
    instances: &'a [SphereInstance],
    count: u32,
}

impl<'a> InstanceList<'a> {
    /// `count` may be below the slice length when the buffer has spare capacity.
    pub fn new(instances: &'a [SphereInstance], count: u32) -> Self {
        Self { instances, count }
    }
}

impl<'a> Scene for InstanceList<'a> {
    fn closest_hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<SurfaceHit> {
        let mut closest_t = t_max;
        let mut closest_index = u32::MAX;
        let mut closest_attributes = IntersectionAttributes {
            object_point: Vec3::ZERO,
            object_normal: Vec3::ZERO,
        };

        for i in 0..self.count {
            if i as usize >= self.instances.len() {
                break;
            }

            if let Some(hit) = self.instances[i as usize].intersect(ray, t_min, closest_t) {
                closest_t = hit.t;
                closest_index = i;
                closest_attributes = hit.attributes;
            }
        }

        if closest_index == u32::MAX {
            return None;
        }

        let instance = &self.instances[closest_index as usize];
        Some(SurfaceHit {
            t: closest_t,
            instance_index: closest_index,
            attributes: closest_attributes,
            world_point: instance.world_point(closest_attributes.object_point),
            world_normal: instance.world_normal(closest_attributes.object_normal),
            material: instance.material.material(),
        })
    }
}

/// Everything one dispatch reads: constants, random pool, scene and frame size.
pub struct FrameContext<'a, S: Scene> {
    pub constants: &'a SceneConstants,
    pub random: RandomPool<'a>,
    pub scene: &'a S,
    pub dimensions: UVec2,
    camera_to_world: Mat4,
}

impl<'a, S: Scene> FrameContext<'a, S> {
    pub fn new(constants: &'a SceneConstants, random_values: &'a [f32], scene: &'a S, dimensions: UVec2) -> Self {
        Self {
            constants,
            random: RandomPool::new(random_values, constants.random_float_count),
            scene,
            dimensions,
            camera_to_world: constants.camera_to_world(),
        }
    }
}

/// Follow one ray through the scene until it escapes, is absorbed, or runs out of depth.
///
/// Every material continues the path by multiplying its attenuation into what the nested
/// trace returns, so the recursion unrolls into a loop carrying the running product.
pub fn trace_ray<S: Scene>(ctx: &FrameContext<S>, pixel_linear_index: u32, ray: Ray, payload: &mut RayPayload) {
    let constants = ctx.constants;
    let mut ray = ray;
    let mut throughput = Vec3::ONE;

    loop {
        let hit = match ctx
            .scene
            .closest_hit(&ray, RaytracerConfig::MIN_RAY_DISTANCE, RaytracerConfig::MAX_RAY_DISTANCE)
        {
            Some(hit) => hit,
            None => {
                payload.color = throughput * sky_color(constants.sky_top(), constants.sky_bottom(), ray.direction);
                return;
            }
        };

        if payload.recursion_depth >= constants.max_recursion_depth {
            payload.color *= throughput;
            return;
        }

        let random = ctx
            .random
            .random_unit_sphere_sample(pixel_linear_index, payload.intersection_count);

        match hit
            .material
            .scatter(ray.direction, hit.world_normal, random, constants.lambertian_attenuation)
        {
            Some(scatter) => {
                throughput *= scatter.attenuation;
                payload.begin_bounce(scatter.direction);
                ray = Ray::new(hit.world_point, scatter.direction);
            }
            None => {
                payload.color = Vec3::ZERO;
                return;
            }
        }
    }
}

/// One camera sample for a pixel. `sample` is 1-based.
pub fn trace_sample<S: Scene>(ctx: &FrameContext<S>, pixel: UVec2, sample: u32) -> RayPayload {
    let jitter = ctx.random.pixel_jitter_offset(sample);
    let ray = camera_ray(
        pixel,
        ctx.dimensions,
        jitter,
        ctx.constants.vertical_fov_radians,
        &ctx.camera_to_world,
    );

    let mut payload = RayPayload::new();
    trace_ray(ctx, pixel.y * ctx.dimensions.x + pixel.x, ray, &mut payload);
    payload
}

/// Ray generation for a pixel: the plain mean of its samples, alpha fixed at 1.
pub fn shade_pixel<S: Scene>(ctx: &FrameContext<S>, pixel: UVec2) -> Vec4 {
    let rays_per_pixel = ctx.constants.rays_per_pixel;
    if rays_per_pixel == 0 {
        return Vec4::W;
    }

    let mut sum = Vec3::ZERO;
    for sample in 0..rays_per_pixel {
        sum += trace_sample(ctx, pixel, sample + 1).color;
    }

    (sum / rays_per_pixel as f32).extend(1.0)
}

#![cfg_attr(target_arch = "spirv", no_std)]

//! Ray generation and shading core shared between the rust-gpu shader and the host.
//!
//! Everything here is a pure function of the frame constants, the random pool and the
//! scene instances, so the same code drives the GPU compute pass and the CPU reference
//! renderer.

use bytemuck::{Pod, Zeroable};

pub mod camera;
pub mod frame;
pub mod material;
pub mod payload;
pub mod sampling;
pub mod sphere;

pub use camera::{camera_ray, world_camera_position, Ray};
pub use frame::{shade_pixel, trace_ray, trace_sample, FrameContext, InstanceList, Scene, SceneConstants, SurfaceHit};
pub use material::{reflect, refract, schlick_reflectance, sky_color, Material, MaterialDesc, Scatter};
pub use payload::RayPayload;
pub use sampling::{wrap_index, RandomPool};
pub use sphere::{IntersectionAttributes, SphereHit, SphereInstance, UnitSphereQuadratic};

pub use glam;

/// Configuration constants for the raytracer
pub struct RaytracerConfig;

impl RaytracerConfig {
    pub const TILE_SIZE: u32 = 128;
    pub const THREAD_GROUP_SIZE: (u32, u32) = (16, 16);
    pub const MAX_INSTANCES: usize = 64;
    pub const CAMERA_MOVE_SPEED: f32 = 0.5;
    pub const CAMERA_ROTATE_SENSITIVITY: f32 = 0.005;
    pub const CAMERA_PITCH_CLAMP: f32 = 1.5;

    // Self-intersection offset for secondary rays
    pub const MIN_RAY_DISTANCE: f32 = 0.001;
    pub const MAX_RAY_DISTANCE: f32 = 1.0e6;

    pub const SKY_TOP_COLOR: [f32; 4] = [0.0, 0.502, 1.0, 0.0];
    pub const SKY_BOTTOM_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.0];

    pub const CAMERA_EYE: [f32; 3] = [0.0, 20.0, 30.0001];
    pub const CAMERA_FOCUS: [f32; 3] = [0.0, 0.0, 0.0];
    pub const CAMERA_UP: [f32; 3] = [0.0, 1.0, 0.0];

    // GPU configuration constants
    pub const MAX_PUSH_CONSTANT_SIZE: u32 = 128;
    pub const PERFORMANCE_STATS_INTERVAL: u64 = 60; // frames
    pub const MILLISECONDS_PER_SECOND: f32 = 1000.0;
    pub const PROGRESS_PERCENTAGE_SCALE: f32 = 100.0;
}

/// Per-dispatch values that change from tile to tile.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct PushConstants {
    /// Full frame size in pixels, not the tile size.
    pub resolution: [u32; 2],
    pub tile_offset: [u32; 2],
    pub tile_size: [u32; 2],
}

impl PushConstants {
    pub fn new(resolution: [u32; 2], tile_offset: [u32; 2], tile_size: [u32; 2]) -> Self {
        Self {
            resolution,
            tile_offset,
            tile_size,
        }
    }

    /// Map a thread id inside the current tile to a frame pixel, or `None` when the thread
    /// falls outside the tile or the frame.
    pub fn pixel_for_thread(&self, local_x: u32, local_y: u32) -> Option<(u32, u32)> {
        let pixel_x = self.tile_offset[0] + local_x;
        let pixel_y = self.tile_offset[1] + local_y;

        if local_x >= self.tile_size[0]
            || local_y >= self.tile_size[1]
            || pixel_x >= self.resolution[0]
            || pixel_y >= self.resolution[1]
        {
            return None;
        }

        Some((pixel_x, pixel_y))
    }
}

/// Helper functions for tile calculations
pub struct TileHelper;

impl TileHelper {
    /// Calculate number of tiles needed for given dimensions
    pub fn calculate_tile_count(width: u32, height: u32, tile_size: u32) -> (u32, u32) {
        let tiles_x = (width + tile_size - 1) / tile_size;
        let tiles_y = (height + tile_size - 1) / tile_size;
        (tiles_x, tiles_y)
    }

    /// Calculate adaptive tiles per frame based on total tile count.
    /// Every tile runs the full sample loop, so big frames are spread over many presents.
    pub fn calculate_tiles_per_frame(total_tiles: u32) -> u32 {
        match total_tiles {
            0..=16 => total_tiles,
            17..=64 => total_tiles / 8,
            65..=256 => total_tiles / 32,
            257..=1024 => total_tiles / 64,
            _ => 1,
        }
        .max(1)
    }

    /// Offset and clipped extent of a tile, in pixels.
    pub fn tile_rect(tile_index: u32, tiles_x: u32, width: u32, height: u32) -> ([u32; 2], [u32; 2]) {
        let tile_x = tile_index % tiles_x;
        let tile_y = tile_index / tiles_x;

        let offset_x = tile_x * RaytracerConfig::TILE_SIZE;
        let offset_y = tile_y * RaytracerConfig::TILE_SIZE;

        let extent_x = RaytracerConfig::TILE_SIZE.min(width.saturating_sub(offset_x));
        let extent_y = RaytracerConfig::TILE_SIZE.min(height.saturating_sub(offset_y));

        ([offset_x, offset_y], [extent_x, extent_y])
    }
}

/// Scene assembly for the host side.
#[cfg(not(target_arch = "spirv"))]
pub struct SceneBuilder {
    instances: Vec<SphereInstance>,
}

#[cfg(not(target_arch = "spirv"))]
impl SceneBuilder {
    pub fn new() -> Self {
        Self { instances: Vec::new() }
    }

    /// Add a sphere of `radius` at `center`. The unit sphere is scaled and translated
    /// into place, so the radius lives in the transform.
    pub fn add_sphere(mut self, center: [f32; 3], radius: f32, material: MaterialDesc) -> Self {
        self.instances.push(SphereInstance::new(center, radius, material));
        self
    }

    /// The two-sphere scene: a small planet resting on a huge ground sphere.
    pub fn build_default_scene(planet: MaterialDesc, main: MaterialDesc) -> Vec<SphereInstance> {
        Self::new()
            .add_sphere([0.0, 8.0, 0.0], 7.0, planet)
            .add_sphere([0.0, -300.0, 0.0], 300.0, main)
            .build()
    }

    pub fn build(self) -> Vec<SphereInstance> {
        self.instances
    }
}

#[cfg(not(target_arch = "spirv"))]
impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tile_count_rounds_up() {
        assert_eq!(TileHelper::calculate_tile_count(256, 128, 128), (2, 1));
        assert_eq!(TileHelper::calculate_tile_count(257, 129, 128), (3, 2));
    }

    #[test]
    fn test_tiles_per_frame_never_zero() {
        assert_eq!(TileHelper::calculate_tiles_per_frame(0), 1);
        assert_eq!(TileHelper::calculate_tiles_per_frame(12), 12);
        assert_eq!(TileHelper::calculate_tiles_per_frame(5000), 1);
    }

    #[test]
    fn test_edge_tile_is_clipped() {
        // 300x200 frame, tiles_x = 3; tile 2 is the right column of the first row.
        let (offset, extent) = TileHelper::tile_rect(2, 3, 300, 200);
        assert_eq!(offset, [256, 0]);
        assert_eq!(extent, [44, 128]);

        let (offset, extent) = TileHelper::tile_rect(4, 3, 300, 200);
        assert_eq!(offset, [128, 128]);
        assert_eq!(extent, [128, 72]);
    }

    #[test]
    fn test_pixel_for_thread_bounds() {
        let constants = PushConstants::new([300, 200], [256, 128], [44, 72]);
        assert_eq!(constants.pixel_for_thread(0, 0), Some((256, 128)));
        assert_eq!(constants.pixel_for_thread(43, 71), Some((299, 199)));
        assert_eq!(constants.pixel_for_thread(44, 0), None);
        assert_eq!(constants.pixel_for_thread(0, 72), None);
    }

    #[test]
    fn test_default_scene_layout() {
        let instances = SceneBuilder::build_default_scene(MaterialDesc::lambertian(), MaterialDesc::lambertian());
        assert_eq!(instances.len(), 2);
        assert!(instances.iter().all(SphereInstance::is_invertible));
        assert_eq!(instances[0].center(), glam::Vec3::new(0.0, 8.0, 0.0));
        assert_eq!(instances[1].radius(), 300.0);
    }
}

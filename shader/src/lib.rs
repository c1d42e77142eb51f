#![no_std]

use spirv_std::glam::{vec2, vec4, UVec2, UVec3, Vec2, Vec4};
use spirv_std::spirv;
use spheres_shared::glam::uvec2;
use spheres_shared::{shade_pixel, FrameContext, InstanceList, PushConstants, SceneConstants, SphereInstance};

#[spirv(compute(threads(16, 16)))]
pub fn main_cs(
    #[spirv(global_invocation_id)] id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0)] output_image: &spirv_std::image::Image!(2D, format=rgba8, write),
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] random_floats: &[f32],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)] instances: &[SphereInstance],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)] constants: &SceneConstants,
    #[spirv(push_constant)] push_constants: &PushConstants,
) {
    // Threads past the tile or frame edge have no pixel
    let (pixel_x, pixel_y) = match push_constants.pixel_for_thread(id.x, id.y) {
        Some(pixel) => pixel,
        None => return,
    };

    let scene = InstanceList::new(instances, constants.instance_count);
    let dimensions = uvec2(push_constants.resolution[0], push_constants.resolution[1]);
    let ctx = FrameContext::new(constants, random_floats, &scene, dimensions);

    let color = shade_pixel(&ctx, uvec2(pixel_x, pixel_y));

    unsafe {
        output_image.write(UVec2::new(pixel_x, pixel_y), vec4(color.x, color.y, color.z, color.w));
    }
}

// Vertex shader for fullscreen quad
#[spirv(vertex)]
pub fn main_vs(
    #[spirv(vertex_index)] vertex_index: i32,
    #[spirv(position)] out_pos: &mut Vec4,
    uv: &mut Vec2,
) {
    // Generate fullscreen triangle that covers entire screen
    let x = if vertex_index == 1 { 3.0 } else { -1.0 };
    let y = if vertex_index == 2 { 3.0 } else { -1.0 };

    *out_pos = vec4(x, y, 0.0, 1.0);
    *uv = vec2((x + 1.0) * 0.5, 1.0 - (y + 1.0) * 0.5);
}

// Fragment shader presenting the traced image unchanged
#[spirv(fragment)]
pub fn main_fs(
    uv: Vec2,
    #[spirv(descriptor_set = 0, binding = 0)] texture: &spirv_std::image::Image!(2D, type=f32, sampled),
    #[spirv(descriptor_set = 0, binding = 1)] sampler: &spirv_std::Sampler,
    output: &mut Vec4,
) {
    *output = texture.sample(*sampler, uv);
}

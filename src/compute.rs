use spheres_shared::{PushConstants, RaytracerConfig, TileHelper};
use crate::buffers::BufferManager;
use crate::error::RenderError;
use crate::renderer::{PerformanceState, ProgressiveState, RenderState};
use crate::scene::SceneState;

/// Compute shader execution and progressive rendering logic
pub struct ComputeRenderer;

impl ComputeRenderer {
    /// Dispatch the next batch of tiles of the render in progress, if any.
    pub fn run_compute(
        render: &mut RenderState,
        buffers: &mut BufferManager,
        scene: &SceneState,
        progressive: &mut ProgressiveState,
        performance: &mut PerformanceState,
    ) -> Result<(), RenderError> {
        if progressive.needs_recompute && !progressive.is_progressive_rendering {
            // Constants only change between renders, never while tiles are in flight
            Self::update_buffers_and_bind_groups(render, buffers, scene)?;
            Self::start_progressive_render(progressive);
        }

        if !progressive.is_progressive_rendering {
            return Ok(());
        }

        let total_tiles = progressive.total_tiles();
        if Self::check_rendering_completion(progressive, total_tiles) {
            return Ok(());
        }

        let compute_start = std::time::Instant::now();
        let tiles_this_frame = Self::calculate_tiles_for_frame(progressive, total_tiles);

        Self::execute_compute_pass(render, progressive, tiles_this_frame);

        Self::update_progress_and_performance(progressive, performance, compute_start, tiles_this_frame, total_tiles);
        Ok(())
    }

    fn start_progressive_render(progressive: &mut ProgressiveState) {
        progressive.is_progressive_rendering = true;
        progressive.current_tile = 0;
        progressive.progressive_start_time = std::time::Instant::now();
        progressive.needs_recompute = false;

        log::info!(
            "Starting progressive render: {}x{} tiles, {} tiles per frame",
            progressive.tiles_x,
            progressive.tiles_y,
            progressive.tiles_per_frame
        );
    }

    /// Check if progressive rendering is complete
    fn check_rendering_completion(progressive: &mut ProgressiveState, total_tiles: u32) -> bool {
        if progressive.current_tile >= total_tiles {
            progressive.is_progressive_rendering = false;
            let total_time = progressive.progressive_start_time.elapsed();
            log::info!(
                "Progressive render completed in {:.2}ms",
                total_time.as_secs_f32() * RaytracerConfig::MILLISECONDS_PER_SECOND
            );
            return true;
        }
        false
    }

    fn calculate_tiles_for_frame(progressive: &ProgressiveState, total_tiles: u32) -> u32 {
        let tiles_remaining = total_tiles - progressive.current_tile;
        progressive.tiles_per_frame.min(tiles_remaining)
    }

    /// Upload constants, random pool and instances, rebuilding the bind group if a buffer moved.
    fn update_buffers_and_bind_groups(
        render: &mut RenderState,
        buffers: &mut BufferManager,
        scene: &SceneState,
    ) -> Result<(), RenderError> {
        let constants = scene.constants(render.size.width, render.size.height)?;

        buffers.update_constants(&render.queue, &constants);
        buffers.update_random(&render.device, &render.queue, &scene.random_floats);
        buffers.update_instances(&render.queue, &scene.instances);

        if buffers.take_bind_group_stale() {
            render.recreate_bind_groups(buffers);
        }

        Ok(())
    }

    fn execute_compute_pass(render: &RenderState, progressive: &ProgressiveState, tiles_this_frame: u32) {
        let mut encoder = render.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Compute Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Compute Pass"),
            });

            compute_pass.set_pipeline(&render.compute_pipeline);
            compute_pass.set_bind_group(0, &render.compute_bind_group, &[]);

            for i in 0..tiles_this_frame {
                let tile_index = progressive.current_tile + i;
                let push_constants = Self::tile_push_constants(tile_index, progressive.tiles_x, render.size.width, render.size.height);

                compute_pass.set_push_constants(0, bytemuck::bytes_of(&push_constants));

                let (workgroup_x, workgroup_y) = Self::workgroup_count(push_constants.tile_size);
                compute_pass.dispatch_workgroups(workgroup_x, workgroup_y, 1);
            }
        }

        render.queue.submit(std::iter::once(encoder.finish()));
    }

    fn tile_push_constants(tile_index: u32, tiles_x: u32, width: u32, height: u32) -> PushConstants {
        let (tile_offset, tile_size) = TileHelper::tile_rect(tile_index, tiles_x, width, height);
        PushConstants::new([width, height], tile_offset, tile_size)
    }

    fn workgroup_count(tile_size: [u32; 2]) -> (u32, u32) {
        let (group_x, group_y) = RaytracerConfig::THREAD_GROUP_SIZE;
        ((tile_size[0] + group_x - 1) / group_x, (tile_size[1] + group_y - 1) / group_y)
    }

    /// Update performance metrics and progress tracking
    fn update_progress_and_performance(
        progressive: &mut ProgressiveState,
        performance: &mut PerformanceState,
        compute_start: std::time::Instant,
        tiles_this_frame: u32,
        total_tiles: u32,
    ) {
        performance.last_encode_time = compute_start.elapsed();
        progressive.current_tile += tiles_this_frame;

        if progressive.current_tile % (progressive.tiles_per_frame * 4) == 0 || progressive.current_tile == total_tiles {
            let progress = (progressive.current_tile as f32 / total_tiles as f32) * RaytracerConfig::PROGRESS_PERCENTAGE_SCALE;
            log::info!(
                "Progress: {:.1}% ({}/{}) - {} tiles/frame",
                progress,
                progressive.current_tile,
                total_tiles,
                tiles_this_frame
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tile_push_constants_clip_last_tile() {
        let push_constants = ComputeRenderer::tile_push_constants(5, 3, 300, 200);

        assert_eq!(push_constants.resolution, [300, 200]);
        assert_eq!(push_constants.tile_offset, [256, 128]);
        assert_eq!(push_constants.tile_size, [44, 72]);
    }

    #[test]
    fn test_workgroups_cover_tile() {
        assert_eq!(ComputeRenderer::workgroup_count([128, 128]), (8, 8));
        assert_eq!(ComputeRenderer::workgroup_count([44, 72]), (3, 5));
        assert_eq!(ComputeRenderer::workgroup_count([1, 1]), (1, 1));
    }

    #[test]
    fn test_tiles_for_frame_stops_at_last_tile() {
        let mut progressive = ProgressiveState::new(3840, 2160);
        progressive.current_tile = progressive.total_tiles() - 2;

        assert_eq!(ComputeRenderer::calculate_tiles_for_frame(&progressive, progressive.total_tiles()), 2);
    }
}

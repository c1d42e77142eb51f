use std::path::Path;

use glam::{uvec2, UVec2, Vec4};
use image::RgbaImage;
use rayon::prelude::*;
use spheres_shared::{shade_pixel, FrameContext, InstanceList, RaytracerConfig, SceneConstants};

use crate::error::RenderError;
use crate::scene::SceneState;

const BYTES_PER_PIXEL: usize = 4;

/// Renders a frame with the shared shading core on the CPU, one rayon task per row.
///
/// Produces the same pixels the compute shader writes, up to float differences between
/// the host and the GPU.
pub struct CpuRenderer<'a> {
    scene: &'a SceneState,
    constants: SceneConstants,
    dimensions: UVec2,
}

impl<'a> CpuRenderer<'a> {
    pub fn new(scene: &'a SceneState, width: u32, height: u32) -> Result<Self, RenderError> {
        let constants = scene.constants(width, height)?;

        Ok(Self {
            scene,
            constants,
            dimensions: uvec2(width, height),
        })
    }

    /// Run `f` against the frame context this renderer shades with.
    fn with_context<R>(&self, f: impl FnOnce(&FrameContext<InstanceList>) -> R) -> R {
        let instances = InstanceList::new(&self.scene.instances, self.constants.instance_count);
        let ctx = FrameContext::new(&self.constants, &self.scene.random_floats, &instances, self.dimensions);
        f(&ctx)
    }

    pub fn render(&self) -> RgbaImage {
        let start = std::time::Instant::now();
        let width = self.dimensions.x;
        let height = self.dimensions.y;

        let pixels = self.with_context(|ctx| Self::shade_rows(ctx, width, height));

        log::info!(
            "CPU render of {}x{} at {} rays per pixel took {:.2}ms",
            width,
            height,
            self.constants.rays_per_pixel,
            start.elapsed().as_secs_f32() * RaytracerConfig::MILLISECONDS_PER_SECOND
        );

        // The buffer is sized from the same dimensions, so this cannot fail
        RgbaImage::from_raw(width, height, pixels).unwrap_or_else(|| RgbaImage::new(width, height))
    }

    fn shade_rows(ctx: &FrameContext<InstanceList>, width: u32, height: u32) -> Vec<u8> {
        let row_stride = width as usize * BYTES_PER_PIXEL;
        let mut pixels = vec![0u8; row_stride * height as usize];

        pixels
            .par_chunks_mut(row_stride)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..width {
                    let color = shade_pixel(ctx, uvec2(x, y as u32));
                    let offset = x as usize * BYTES_PER_PIXEL;
                    row[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&to_unorm8(color));
                }
            });

        pixels
    }

    pub fn render_to_file(&self, path: &Path) -> Result<(), RenderError> {
        let image = self.render();
        image.save(path)?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Same conversion an RGBA8 unorm storage write performs: clamp, scale, round.
pub fn to_unorm8(color: Vec4) -> [u8; 4] {
    let scaled = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [scaled.x as u8, scaled.y as u8, scaled.z as u8, scaled.w as u8]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::RenderSettings;
    use clap::Parser;
    use spheres_shared::trace_sample;

    fn scene(args: &[&str]) -> SceneState {
        let mut argv = vec!["spheres_raytracer", "--width", "24", "--height", "16"];
        argv.extend_from_slice(args);
        SceneState::from_settings(&RenderSettings::parse_from(argv))
    }

    #[test]
    fn test_unorm_conversion_clamps() {
        assert_eq!(to_unorm8(Vec4::new(-1.0, 0.5, 2.0, 1.0)), [0, 128, 255, 255]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = scene(&["--samples", "3", "--planet-material", "dielectric"]);
        let renderer = CpuRenderer::new(&scene, 24, 16).unwrap();

        let first = renderer.render();
        let second = renderer.render();

        assert_eq!(first.dimensions(), (24, 16));
        assert_eq!(first.as_raw(), second.as_raw());
        assert!(first.pixels().all(|pixel| pixel.0[3] == 255));
    }

    #[test]
    fn test_pixel_is_mean_of_samples() {
        let scene = scene(&["--samples", "5", "--main-material", "metallic", "--fuzz", "0.4"]);
        let renderer = CpuRenderer::new(&scene, 24, 16).unwrap();

        let pixel = uvec2(12, 10);
        renderer.with_context(|ctx| {
            let mut sum = glam::Vec3::ZERO;
            for sample in 1..=5 {
                sum += trace_sample(ctx, pixel, sample).color;
            }

            assert!(shade_pixel(ctx, pixel).truncate().abs_diff_eq(sum / 5.0, 1e-6));
        });

        // Same pixel through the parallel path
        let image = renderer.render();
        let expected = renderer.with_context(|ctx| to_unorm8(shade_pixel(ctx, pixel)));
        assert_eq!(image.get_pixel(12, 10).0, expected);
    }

    #[test]
    fn test_sky_pixels_follow_gradient() {
        // Top row looks above the planet, so it sees only sky, bluer than the bottom color.
        let scene = scene(&["--samples", "2"]);
        let renderer = CpuRenderer::new(&scene, 24, 16).unwrap();

        let color = renderer.with_context(|ctx| shade_pixel(ctx, uvec2(0, 0)));
        assert!(color.z > color.x);
        assert_eq!(color.w, 1.0);
    }

    #[test]
    fn test_invalid_scene_is_rejected() {
        let scene = scene(&["--samples", "0"]);
        assert!(matches!(CpuRenderer::new(&scene, 24, 16), Err(RenderError::ZeroSamples)));
    }
}

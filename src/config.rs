use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use spheres_shared::MaterialDesc;

/// Albedo used when a sphere is switched to metal from the command line.
const METAL_ALBEDO: [f32; 3] = [0.8, 0.8, 0.8];

/// Material selectable per sphere on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MaterialChoice {
    Lambertian,
    Metallic,
    Dielectric,
}

impl MaterialChoice {
    pub fn desc(self, fuzz: f32, refraction_index: f32) -> MaterialDesc {
        match self {
            MaterialChoice::Lambertian => MaterialDesc::lambertian(),
            MaterialChoice::Metallic => MaterialDesc::metallic(METAL_ALBEDO, fuzz),
            MaterialChoice::Dielectric => MaterialDesc::dielectric(refraction_index),
        }
    }
}

/// Run-time render settings.
#[derive(Clone, Debug, Parser)]
#[command(name = "spheres_raytracer")]
#[command(about = "Progressive sphere path tracer on wgpu compute", long_about = None)]
pub struct RenderSettings {
    /// Frame width in pixels
    #[arg(long, default_value_t = 3840)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 2160)]
    pub height: u32,

    /// Rays traced per pixel
    #[arg(long = "samples", default_value_t = 500)]
    pub rays_per_pixel: u32,

    /// Maximum number of bounces after the camera ray
    #[arg(long, default_value_t = 31)]
    pub max_depth: u32,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 90.0)]
    pub fov: f32,

    /// Color factor applied at every diffuse bounce
    #[arg(long, default_value_t = 0.5)]
    pub lambertian_attenuation: f32,

    /// Size of the random pool (default: one value per pixel)
    #[arg(long)]
    pub random_count: Option<u32>,

    /// Seed for the random pool
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Material of the small sphere
    #[arg(long, value_enum, default_value_t = MaterialChoice::Lambertian)]
    pub planet_material: MaterialChoice,

    /// Material of the ground sphere
    #[arg(long, value_enum, default_value_t = MaterialChoice::Lambertian)]
    pub main_material: MaterialChoice,

    /// Roughness of metallic spheres, clamped to [0, 1]
    #[arg(long, default_value_t = 0.0)]
    pub fuzz: f32,

    /// Refraction index of dielectric spheres
    #[arg(long, default_value_t = 1.5)]
    pub ior: f32,

    /// Render once on the CPU instead of opening a window
    #[arg(long)]
    pub cpu: bool,

    /// Write the CPU render to this PNG file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl RenderSettings {
    pub fn random_float_count(&self) -> u32 {
        self.random_count
            .unwrap_or_else(|| self.width.saturating_mul(self.height))
    }

    pub fn vertical_fov_radians(&self) -> f32 {
        self.fov.to_radians()
    }

    pub fn planet_desc(&self) -> MaterialDesc {
        self.planet_material.desc(self.fuzz, self.ior)
    }

    pub fn main_desc(&self) -> MaterialDesc {
        self.main_material.desc(self.fuzz, self.ior)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::parse_from(["spheres_raytracer"])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_match_reference_frame() {
        let settings = RenderSettings::default();

        assert_eq!((settings.width, settings.height), (3840, 2160));
        assert_eq!(settings.rays_per_pixel, 500);
        assert_eq!(settings.max_depth, 31);
        assert_eq!(settings.lambertian_attenuation, 0.5);
        assert_eq!(settings.random_float_count(), 3840 * 2160);
        assert!((settings.vertical_fov_radians() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(!settings.cpu);
    }

    #[test]
    fn test_flags_override_defaults() {
        let settings = RenderSettings::parse_from([
            "spheres_raytracer",
            "--width",
            "64",
            "--height",
            "32",
            "--samples",
            "4",
            "--random-count",
            "100",
            "--planet-material",
            "metallic",
            "--main-material",
            "dielectric",
            "--fuzz",
            "0.25",
            "--cpu",
            "--output",
            "frame.png",
        ]);

        assert_eq!(settings.random_float_count(), 100);
        assert_eq!(settings.rays_per_pixel, 4);
        assert_eq!(settings.planet_desc(), MaterialDesc::metallic(METAL_ALBEDO, 0.25));
        assert_eq!(settings.main_desc(), MaterialDesc::dielectric(1.5));
        assert_eq!(settings.output, Some(PathBuf::from("frame.png")));
        assert!(settings.cpu);
    }
}

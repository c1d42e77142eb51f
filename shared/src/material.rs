use bytemuck::{Pod, Zeroable};
use glam::{vec3, Vec3};

#[cfg(all(target_arch = "spirv", feature = "shader"))]
use spirv_std::num_traits::Float;

/// GPU layout of a material binding. One per instance; `kind` selects the hit group.
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
#[repr(C)]
pub struct MaterialDesc {
    pub kind: u32,
    pub fuzz: f32,
    pub refraction_index: f32,
    pub _padding: u32,
    pub albedo: [f32; 4],
}

impl MaterialDesc {
    pub const LAMBERTIAN: u32 = 0;
    pub const METALLIC: u32 = 1;
    pub const DIELECTRIC: u32 = 2;

    /// Diffuse surface. Its attenuation comes from the frame constants, not the instance.
    pub fn lambertian() -> Self {
        Self {
            kind: Self::LAMBERTIAN,
            fuzz: 0.0,
            refraction_index: 1.0,
            _padding: 0,
            albedo: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn metallic(albedo: [f32; 3], fuzz: f32) -> Self {
        Self {
            kind: Self::METALLIC,
            fuzz,
            refraction_index: 1.0,
            _padding: 0,
            albedo: [albedo[0], albedo[1], albedo[2], 1.0],
        }
    }

    pub fn dielectric(refraction_index: f32) -> Self {
        Self {
            kind: Self::DIELECTRIC,
            fuzz: 0.0,
            refraction_index,
            _padding: 0,
            albedo: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Resolve the binding into the material it stands for. Unknown kinds shade as diffuse.
    pub fn material(&self) -> Material {
        match self.kind {
            Self::METALLIC => Material::Metallic {
                albedo: vec3(self.albedo[0], self.albedo[1], self.albedo[2]),
                fuzz: self.fuzz.min(1.0),
            },
            Self::DIELECTRIC => Material::Dielectric {
                refraction_index: self.refraction_index,
            },
            _ => Material::Lambertian,
        }
    }
}

/// Scattering model bound to an instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    Lambertian,
    Metallic { albedo: Vec3, fuzz: f32 },
    Dielectric { refraction_index: f32 },
}

/// Outgoing direction and the factor it multiplies into the path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scatter {
    pub direction: Vec3,
    pub attenuation: Vec3,
}

impl Material {
    /// Scatter an incoming unit direction off a surface with outward unit `normal`.
    ///
    /// `random` is the raw pool triple for this bounce. `None` means the ray was absorbed.
    pub fn scatter(&self, incoming: Vec3, normal: Vec3, random: Vec3, lambertian_attenuation: f32) -> Option<Scatter> {
        match *self {
            Material::Lambertian => Some(Scatter {
                direction: (normal + random).normalize_or(normal),
                attenuation: Vec3::splat(lambertian_attenuation),
            }),
            Material::Metallic { albedo, fuzz } => {
                let scattered = reflect(incoming, normal) + random * fuzz;
                if scattered.dot(normal) <= 0.0 {
                    return None;
                }

                Some(Scatter {
                    direction: scattered.normalize(),
                    attenuation: albedo,
                })
            }
            Material::Dielectric { refraction_index } => {
                // Outward normal facing the ray means we are entering the volume.
                let entering = incoming.dot(normal) < 0.0;
                let (facing_normal, ratio) = if entering {
                    (normal, 1.0 / refraction_index)
                } else {
                    (-normal, refraction_index)
                };

                let cos_theta = (-incoming).dot(facing_normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
                let choice = 0.5 * random.x + 0.5;

                let direction = if ratio * sin_theta > 1.0 || schlick_reflectance(cos_theta, ratio) > choice {
                    reflect(incoming, facing_normal)
                } else {
                    refract(incoming, facing_normal, ratio)
                };

                Some(Scatter {
                    direction: direction.normalize(),
                    attenuation: Vec3::ONE,
                })
            }
        }
    }
}

/// Mirror `direction` about `normal`.
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Bend a unit direction through a surface. `normal` faces the incoming side and `ratio`
/// is the relative index of refraction (incident over transmitted).
pub fn refract(direction: Vec3, normal: Vec3, ratio: f32) -> Vec3 {
    let cos_theta = (-direction).dot(normal).min(1.0);
    let perpendicular = ratio * (direction + cos_theta * normal);
    let parallel = -(1.0 - perpendicular.length_squared()).abs().sqrt() * normal;
    perpendicular + parallel
}

/// Schlick's approximation of Fresnel reflectance.
pub fn schlick_reflectance(cosine: f32, ratio: f32) -> f32 {
    let r0 = (1.0 - ratio) / (1.0 + ratio);
    let r0 = r0 * r0;
    let m = 1.0 - cosine;
    r0 + (1.0 - r0) * m * m * m * m * m
}

/// Miss shading: blend from the bottom to the top sky color by the ray's height.
pub fn sky_color(top: Vec3, bottom: Vec3, direction: Vec3) -> Vec3 {
    let t = 0.5 * direction.y + 0.5;
    bottom * (1.0 - t) + top * t
}

#[cfg(test)]
mod test {
    use super::*;

    const TOP: Vec3 = Vec3::new(0.0, 0.502, 1.0);
    const BOTTOM: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    #[test]
    fn test_sky_gradient_endpoints() {
        assert_eq!(sky_color(TOP, BOTTOM, Vec3::Y), TOP);
        assert_eq!(sky_color(TOP, BOTTOM, -Vec3::Y), BOTTOM);
        assert_eq!(sky_color(TOP, BOTTOM, Vec3::X), (TOP + BOTTOM) * 0.5);
    }

    #[test]
    fn test_lambertian_offsets_normal_by_sample() {
        let scatter = Material::Lambertian
            .scatter(-Vec3::Y, Vec3::Y, vec3(0.0, 0.0, 1.0), 0.5)
            .unwrap();

        assert!(scatter.direction.abs_diff_eq(vec3(0.0, 1.0, 1.0).normalize(), 1e-6));
        assert_eq!(scatter.attenuation, Vec3::splat(0.5));
    }

    #[test]
    fn test_lambertian_degenerate_sample_falls_back_to_normal() {
        let scatter = Material::Lambertian.scatter(-Vec3::Y, Vec3::Y, -Vec3::Y, 0.5).unwrap();
        assert_eq!(scatter.direction, Vec3::Y);
    }

    #[test]
    fn test_metal_mirror_reflection() {
        let metal = Material::Metallic {
            albedo: vec3(0.8, 0.6, 0.2),
            fuzz: 0.0,
        };
        let incoming = vec3(1.0, -1.0, 0.0).normalize();
        let scatter = metal.scatter(incoming, Vec3::Y, vec3(0.3, -0.7, 0.1), 0.5).unwrap();

        assert!(scatter.direction.abs_diff_eq(vec3(1.0, 1.0, 0.0).normalize(), 1e-6));
        assert_eq!(scatter.attenuation, vec3(0.8, 0.6, 0.2));
    }

    #[test]
    fn test_fuzzy_metal_can_absorb() {
        let metal = Material::Metallic {
            albedo: Vec3::ONE,
            fuzz: 1.0,
        };
        let grazing = vec3(1.0, -0.1, 0.0).normalize();
        assert!(metal.scatter(grazing, Vec3::Y, -Vec3::Y, 0.5).is_none());
    }

    #[test]
    fn test_metal_fuzz_is_clamped() {
        let desc = MaterialDesc::metallic([0.5, 0.5, 0.5], 4.0);
        assert_eq!(
            desc.material(),
            Material::Metallic {
                albedo: Vec3::splat(0.5),
                fuzz: 1.0
            }
        );
    }

    #[test]
    fn test_glass_head_on_passes_straight_through() {
        let glass = Material::Dielectric { refraction_index: 1.5 };
        let scatter = glass.scatter(-Vec3::Z, Vec3::Z, vec3(1.0, 0.0, 0.0), 0.5).unwrap();

        assert!(scatter.direction.abs_diff_eq(-Vec3::Z, 1e-6));
        assert_eq!(scatter.attenuation, Vec3::ONE);
    }

    #[test]
    fn test_glass_low_choice_reflects() {
        let glass = Material::Dielectric { refraction_index: 1.5 };
        let scatter = glass.scatter(-Vec3::Z, Vec3::Z, vec3(-1.0, 0.0, 0.0), 0.5).unwrap();
        assert!(scatter.direction.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_glass_entering_follows_snell() {
        let glass = Material::Dielectric { refraction_index: 1.5 };
        let incoming = vec3(1.0, -1.0, 0.0).normalize();
        let scatter = glass.scatter(incoming, Vec3::Y, vec3(1.0, 0.0, 0.0), 0.5).unwrap();

        let sin_out = scatter.direction.x;
        let sin_in = incoming.x;
        assert!((sin_out - sin_in / 1.5).abs() < 1e-5);
        assert!(scatter.direction.y < 0.0);
    }

    #[test]
    fn test_glass_total_internal_reflection_from_inside() {
        let glass = Material::Dielectric { refraction_index: 1.5 };
        // Leaving the volume at 60 degrees: 1.5 * sin(60) > 1.
        let incoming = vec3(60f32.to_radians().sin(), 60f32.to_radians().cos(), 0.0);
        let scatter = glass.scatter(incoming, Vec3::Y, vec3(1.0, 0.0, 0.0), 0.5).unwrap();

        assert!(scatter
            .direction
            .abs_diff_eq(vec3(incoming.x, -incoming.y, 0.0), 1e-5));
    }

    #[test]
    fn test_schlick_limits() {
        assert!((schlick_reflectance(1.0, 1.0 / 1.5) - 0.04).abs() < 1e-6);
        assert!((schlick_reflectance(0.0, 1.0 / 1.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_desc_kinds_resolve() {
        assert_eq!(MaterialDesc::lambertian().material(), Material::Lambertian);
        assert_eq!(
            MaterialDesc::dielectric(1.5).material(),
            Material::Dielectric { refraction_index: 1.5 }
        );
        let unknown = MaterialDesc {
            kind: 9,
            ..MaterialDesc::lambertian()
        };
        assert_eq!(unknown.material(), Material::Lambertian);
    }
}

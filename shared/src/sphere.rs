use bytemuck::{Pod, Zeroable};
use glam::{vec3a, Affine3A, Vec3};

#[cfg(all(target_arch = "spirv", feature = "shader"))]
use spirv_std::num_traits::Float;

use crate::camera::Ray;
use crate::material::MaterialDesc;

/// Coefficients of `a·t² + b·t + c = 0` for a ray against the unit sphere at the origin.
#[derive(Clone, Copy, Debug)]
pub struct UnitSphereQuadratic {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl UnitSphereQuadratic {
    /// Set up the quadratic for an object-space ray.
    pub fn new(object_ray: &Ray) -> Self {
        let origin = object_ray.origin;
        let direction = object_ray.direction;

        Self {
            a: direction.dot(direction),
            b: 2.0 * direction.dot(origin),
            c: origin.dot(origin) - 1.0,
        }
    }

    pub fn discriminant(&self) -> f32 {
        self.b * self.b - 4.0 * self.a * self.c
    }

    /// Both roots as `(t_near, t_far)`, or `None` when the ray misses. A zero-length
    /// direction (`a == 0`) counts as a miss instead of dividing by zero.
    pub fn roots(&self) -> Option<(f32, f32)> {
        let discriminant = self.discriminant();
        if discriminant < 0.0 || self.a == 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t_near = (-self.b - sqrt_discriminant) / (2.0 * self.a);
        let t_far = (-self.b + sqrt_discriminant) / (2.0 * self.a);

        Some((t_near, t_far))
    }
}

/// Per-hit attributes reported by the intersection test, both in object space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionAttributes {
    pub object_point: Vec3,
    pub object_normal: Vec3,
}

impl IntersectionAttributes {
    /// On a unit sphere centred at the origin the normal is the position itself.
    pub fn from_object_point(object_point: Vec3) -> Self {
        Self {
            object_point,
            object_normal: object_point.normalize(),
        }
    }
}

/// Accepted hit on a single sphere instance.
#[derive(Clone, Copy, Debug)]
pub struct SphereHit {
    /// Distance along the ray. Identical in object and world space because the object ray
    /// keeps the instance scale in its direction.
    pub t: f32,
    pub attributes: IntersectionAttributes,
}

/// A unit sphere placed in the world by a 3x4 affine transform, bound to one material.
///
/// Rows are stored the way the transform reads: `[m00 m01 m02 tx]` and so on. The inverse
/// is precomputed on the host so the shader never inverts a matrix.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct SphereInstance {
    pub object_to_world: [[f32; 4]; 3],
    pub world_to_object: [[f32; 4]; 3],
    pub material: MaterialDesc,
}

impl SphereInstance {
    /// Sphere of `radius` at `center`.
    pub fn new(center: [f32; 3], radius: f32, material: MaterialDesc) -> Self {
        let transform = Affine3A::from_scale_rotation_translation(
            Vec3::splat(radius),
            glam::Quat::IDENTITY,
            Vec3::from(center),
        );
        Self::from_affine(&transform, material)
    }

    /// Build from a row-major 3x4 transform.
    pub fn from_rows(object_to_world: [[f32; 4]; 3], material: MaterialDesc) -> Self {
        Self::from_affine(&affine_from_rows(&object_to_world), material)
    }

    fn from_affine(object_to_world: &Affine3A, material: MaterialDesc) -> Self {
        Self {
            object_to_world: rows_from_affine(object_to_world),
            world_to_object: rows_from_affine(&object_to_world.inverse()),
            material,
        }
    }

    pub fn object_to_world(&self) -> Affine3A {
        affine_from_rows(&self.object_to_world)
    }

    pub fn world_to_object(&self) -> Affine3A {
        affine_from_rows(&self.world_to_object)
    }

    /// A singular transform has no object space to intersect in.
    pub fn is_invertible(&self) -> bool {
        let determinant = self.object_to_world().matrix3.determinant();
        determinant != 0.0 && determinant.is_finite()
    }

    pub fn center(&self) -> Vec3 {
        self.object_to_world().transform_point3(Vec3::ZERO)
    }

    /// Radius along the object X axis; the scenes use uniform scale.
    pub fn radius(&self) -> f32 {
        Vec3::from(self.object_to_world().matrix3.x_axis).length()
    }

    pub fn object_ray(&self, world_ray: &Ray) -> Ray {
        let world_to_object = self.world_to_object();
        Ray::new(
            world_to_object.transform_point3(world_ray.origin),
            world_to_object.transform_vector3(world_ray.direction),
        )
    }

    pub fn world_point(&self, object_point: Vec3) -> Vec3 {
        self.object_to_world().transform_point3(object_point)
    }

    /// Object normal to world space through the inverse-transpose of the linear part.
    pub fn world_normal(&self, object_normal: Vec3) -> Vec3 {
        (self.world_to_object().matrix3.transpose() * object_normal).normalize()
    }

    /// Procedural intersection test.
    ///
    /// The entry root is reported when it lies in `[t_min, t_max]`. Only a dielectric falls
    /// back to the exit root, for rays refracted into it; opaque surfaces are never seen from
    /// the inside.
    pub fn intersect(&self, world_ray: &Ray, t_min: f32, t_max: f32) -> Option<SphereHit> {
        let object_ray = self.object_ray(world_ray);
        let (t_near, t_far) = UnitSphereQuadratic::new(&object_ray).roots()?;

        let t = if t_near >= t_min && t_near <= t_max {
            t_near
        } else if self.material.kind == MaterialDesc::DIELECTRIC && t_far >= t_min && t_far <= t_max {
            t_far
        } else {
            return None;
        };

        Some(SphereHit {
            t,
            attributes: IntersectionAttributes::from_object_point(object_ray.at(t)),
        })
    }
}

fn affine_from_rows(rows: &[[f32; 4]; 3]) -> Affine3A {
    Affine3A::from_cols(
        vec3a(rows[0][0], rows[1][0], rows[2][0]),
        vec3a(rows[0][1], rows[1][1], rows[2][1]),
        vec3a(rows[0][2], rows[1][2], rows[2][2]),
        vec3a(rows[0][3], rows[1][3], rows[2][3]),
    )
}

fn rows_from_affine(transform: &Affine3A) -> [[f32; 4]; 3] {
    let m = transform.matrix3;
    let t = transform.translation;
    [
        [m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x],
        [m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y],
        [m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z],
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::vec3;

    fn unit_sphere() -> SphereInstance {
        SphereInstance::new([0.0, 0.0, 0.0], 1.0, MaterialDesc::lambertian())
    }

    #[test]
    fn test_roots_through_unit_sphere() {
        let ray = Ray::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0));
        let quadratic = UnitSphereQuadratic::new(&ray);
        let (t_near, t_far) = quadratic.roots().unwrap();

        assert_eq!(t_near, 4.0);
        assert_eq!(t_far, 6.0);
        assert!((ray.at(t_near).length() - 1.0).abs() < 1e-6);
        assert!((ray.at(t_far).length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ray_past_sphere_has_negative_discriminant() {
        let ray = Ray::new(vec3(5.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0));
        let quadratic = UnitSphereQuadratic::new(&ray);

        assert!(quadratic.discriminant() < 0.0);
        assert!(quadratic.roots().is_none());
        assert!(unit_sphere().intersect(&ray, 0.0, f32::MAX).is_none());
    }

    #[test]
    fn test_zero_direction_is_a_miss() {
        let ray = Ray::new(vec3(0.0, 0.0, 0.5), Vec3::ZERO);
        assert!(UnitSphereQuadratic::new(&ray).roots().is_none());
    }

    #[test]
    fn test_intersect_prefers_entry_point() {
        let ray = Ray::new(vec3(0.0, 0.0, -5.0), Vec3::Z);
        let hit = unit_sphere().intersect(&ray, 0.001, f32::MAX).unwrap();

        assert_eq!(hit.t, 4.0);
        assert!(hit.attributes.object_point.abs_diff_eq(vec3(0.0, 0.0, -1.0), 1e-6));
        assert!(hit.attributes.object_normal.abs_diff_eq(vec3(0.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn test_dielectric_from_inside_uses_exit_point() {
        let glass = SphereInstance::new([0.0, 0.0, 0.0], 1.0, MaterialDesc::dielectric(1.5));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = glass.intersect(&ray, 0.001, f32::MAX).unwrap();

        assert_eq!(hit.t, 1.0);
        assert!(hit.attributes.object_normal.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_opaque_surfaces_ignore_exit_point() {
        // Leaves the near wall heading inward, as a diffuse sample below the tangent plane does.
        let ray = Ray::new(vec3(0.0, 0.0, -1.0), vec3(0.3, 0.2, 1.0).normalize());
        let metal = SphereInstance::new([0.0, 0.0, 0.0], 1.0, MaterialDesc::metallic([0.8, 0.8, 0.8], 0.0));
        let glass = SphereInstance::new([0.0, 0.0, 0.0], 1.0, MaterialDesc::dielectric(1.5));

        assert!(unit_sphere().intersect(&ray, 0.001, f32::MAX).is_none());
        assert!(metal.intersect(&ray, 0.001, f32::MAX).is_none());
        assert!(glass.intersect(&ray, 0.001, f32::MAX).is_some());
        assert!(unit_sphere().intersect(&Ray::new(Vec3::ZERO, Vec3::Z), 0.001, f32::MAX).is_none());
    }

    #[test]
    fn test_intersect_respects_t_max() {
        let ray = Ray::new(vec3(0.0, 0.0, -5.0), Vec3::Z);
        assert!(unit_sphere().intersect(&ray, 0.001, 3.0).is_none());
    }

    #[test]
    fn test_scaled_instance_keeps_world_distance() {
        let planet = SphereInstance::new([0.0, 8.0, 0.0], 7.0, MaterialDesc::lambertian());
        let ray = Ray::new(vec3(0.0, 8.0, -20.0), Vec3::Z);
        let hit = planet.intersect(&ray, 0.001, f32::MAX).unwrap();

        assert!((hit.t - 13.0).abs() < 1e-4);
        let world_point = planet.world_point(hit.attributes.object_point);
        assert!(world_point.abs_diff_eq(ray.at(hit.t), 1e-4));
        assert!(world_point.abs_diff_eq(vec3(0.0, 8.0, -7.0), 1e-4));
        assert!(planet
            .world_normal(hit.attributes.object_normal)
            .abs_diff_eq(vec3(0.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn test_world_normal_uses_inverse_transpose() {
        let stretched = SphereInstance::from_rows(
            [
                [2.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            MaterialDesc::lambertian(),
        );
        let object_normal = vec3(1.0, 1.0, 0.0).normalize();

        assert!(stretched
            .world_normal(object_normal)
            .abs_diff_eq(vec3(0.5, 1.0, 0.0).normalize(), 1e-6));
    }

    #[test]
    fn test_rows_round_trip_and_inverse() {
        let rows = [
            [300.0, 0.0, 0.0, 0.0],
            [0.0, 300.0, 0.0, -300.0],
            [0.0, 0.0, 300.0, 0.0],
        ];
        let ground = SphereInstance::from_rows(rows, MaterialDesc::lambertian());

        assert_eq!(ground.object_to_world, rows);
        assert!(ground.is_invertible());
        assert!(ground.center().abs_diff_eq(vec3(0.0, -300.0, 0.0), 1e-4));
        assert!((ground.radius() - 300.0).abs() < 1e-4);
        assert!(ground
            .world_to_object()
            .transform_point3(vec3(0.0, 0.0, 0.0))
            .abs_diff_eq(vec3(0.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_zero_radius_is_not_invertible() {
        let degenerate = SphereInstance::new([0.0, 0.0, 0.0], 0.0, MaterialDesc::lambertian());
        assert!(!degenerate.is_invertible());
    }
}

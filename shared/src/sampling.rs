use glam::{vec2, vec3, Vec2, Vec3};

/// Wrap a requested index into `[0, total)`.
///
/// `total` must be non-zero; the host checks the pool length before anything is dispatched.
pub fn wrap_index(requested: u32, total: u32) -> u32 {
    requested % total
}

/// Read-only view over the host-generated pool of uniform scalars in `[-1, 1]`.
///
/// Lookups are keyed by explicit indices rather than a stream position, so any pixel or
/// sample can be evaluated in any order and get the same values.
#[derive(Clone, Copy)]
pub struct RandomPool<'a> {
    values: &'a [f32],
    count: u32,
}

impl<'a> RandomPool<'a> {
    /// `count` is the declared pool length from the frame constants. It may be smaller than
    /// the backing buffer, which is allocated with spare capacity on the GPU.
    pub fn new(values: &'a [f32], count: u32) -> Self {
        Self { values, count }
    }

    /// Raw pool value at a wrapped index.
    pub fn value(&self, requested: u32) -> f32 {
        self.values[wrap_index(requested, self.count) as usize]
    }

    /// Sub-pixel jitter in `[0, 1]^2` for a 1-based sample index within a pixel.
    pub fn pixel_jitter_offset(&self, sample_within_pixel: u32) -> Vec2 {
        let base = sample_within_pixel.wrapping_sub(1).wrapping_mul(2);

        vec2(
            0.5 * self.value(base) + 0.5,
            0.5 * self.value(base.wrapping_add(1)) + 0.5,
        )
    }

    /// Candidate scatter offset for a bounce. The triple is returned as stored: it lies in
    /// the `[-1, 1]` cube and is neither normalized nor rejected against the unit sphere.
    pub fn random_unit_sphere_sample(&self, pixel_linear_index: u32, bounce_index: u32) -> Vec3 {
        let base = pixel_linear_index.wrapping_mul(3).wrapping_add(bounce_index);

        vec3(
            self.value(base),
            self.value(base.wrapping_add(1)),
            self.value(base.wrapping_add(2)),
        )
    }
}

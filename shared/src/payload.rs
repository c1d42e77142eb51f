use glam::Vec3;

/// Per-ray state threaded through the hit and miss handling of one sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RayPayload {
    /// Color collected by this ray.
    pub color: Vec3,
    /// Direction of the most recent scatter, in world space.
    pub last_scatter_direction: Vec3,
    /// Number of surfaces this ray has hit. Drives the per-bounce random lookups.
    pub intersection_count: u32,
    /// Number of nested traces issued so far, bounded by the frame's maximum depth.
    pub recursion_depth: u32,
}

impl RayPayload {
    pub fn new() -> Self {
        Self {
            color: Vec3::ZERO,
            last_scatter_direction: Vec3::ZERO,
            intersection_count: 0,
            recursion_depth: 0,
        }
    }

    /// Account for a nested trace. Must happen before the trace is issued.
    pub fn begin_bounce(&mut self, scatter_direction: Vec3) {
        self.recursion_depth += 1;
        self.intersection_count += 1;
        self.last_scatter_direction = scatter_direction;
    }
}

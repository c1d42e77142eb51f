use spheres_shared::{RaytracerConfig, SceneConstants, SphereInstance};

/// Minimum random pool capacity, in values.
const MIN_RANDOM_CAPACITY: usize = 1024;

/// GPU buffers behind the compute bindings: frame constants, random pool and instances
pub struct BufferManager {
    pub constants_buffer: wgpu::Buffer,
    pub random_buffer: wgpu::Buffer,
    pub instances_buffer: wgpu::Buffer,

    // Capacity in elements, not bytes
    random_capacity: usize,

    random_dirty: bool,
    instances_dirty: bool,

    // Set when a buffer was recreated and the bind group still points at the old one
    bind_group_stale: bool,
}

impl BufferManager {
    pub fn new(device: &wgpu::Device, random_len: usize) -> Self {
        let random_capacity = Self::grown_capacity(random_len, 0);

        let constants_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Constants Buffer"),
            size: std::mem::size_of::<SceneConstants>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let random_buffer = Self::create_random_buffer(device, random_capacity);

        let instances_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sphere Instances Buffer"),
            size: (std::mem::size_of::<SphereInstance>() * RaytracerConfig::MAX_INSTANCES) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            constants_buffer,
            random_buffer,
            instances_buffer,
            random_capacity,
            random_dirty: true,
            instances_dirty: true,
            bind_group_stale: false,
        }
    }

    fn create_random_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Random Pool Buffer"),
            size: (capacity * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Capacity to allocate for `required` values: doubled on growth, never below the minimum.
    pub fn grown_capacity(required: usize, current: usize) -> usize {
        if required <= current {
            return current;
        }
        (required * 2).max(MIN_RANDOM_CAPACITY)
    }

    pub fn update_constants(&self, queue: &wgpu::Queue, constants: &SceneConstants) {
        queue.write_buffer(&self.constants_buffer, 0, bytemuck::bytes_of(constants));
    }

    /// Upload the random pool, growing the buffer if it no longer fits.
    pub fn update_random(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, values: &[f32]) {
        let needs_resize = values.len() > self.random_capacity;

        if needs_resize {
            self.random_capacity = Self::grown_capacity(values.len(), self.random_capacity);
            self.random_buffer = Self::create_random_buffer(device, self.random_capacity);
            self.bind_group_stale = true;
            self.random_dirty = true;

            log::debug!(
                "Resized random pool buffer: {} values ({:.2} MB)",
                self.random_capacity,
                (self.random_capacity * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0)
            );
        }

        if self.random_dirty {
            queue.write_buffer(&self.random_buffer, 0, bytemuck::cast_slice(values));
            self.random_dirty = false;
        }
    }

    pub fn update_instances(&mut self, queue: &wgpu::Queue, instances: &[SphereInstance]) {
        if self.instances_dirty {
            queue.write_buffer(&self.instances_buffer, 0, bytemuck::cast_slice(instances));
            self.instances_dirty = false;
        }
    }

    /// Whether the compute bind group must be rebuilt. Clears the flag.
    pub fn take_bind_group_stale(&mut self) -> bool {
        std::mem::replace(&mut self.bind_group_stale, false)
    }
}

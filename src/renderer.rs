use wgpu::util::make_spirv;

use spheres_shared::{PushConstants, RaytracerConfig, TileHelper};
use crate::buffers::BufferManager;
use crate::error::RenderError;

/// GPU resources and rendering pipelines
pub struct RenderState {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    // Pipelines
    pub compute_pipeline: wgpu::ComputePipeline,
    pub render_pipeline: wgpu::RenderPipeline,

    // Traced image, written by the compute pass and sampled by the present pass
    pub raytraced_texture: wgpu::Texture,
    pub sampler: wgpu::Sampler,

    // Bind groups
    pub compute_bind_group: wgpu::BindGroup,
    pub render_bind_group: wgpu::BindGroup,
}

/// Progressive tile rendering state
pub struct ProgressiveState {
    pub needs_recompute: bool,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub current_tile: u32,
    pub is_progressive_rendering: bool,
    pub progressive_start_time: std::time::Instant,
    pub tiles_per_frame: u32,
}

/// Performance tracking
pub struct PerformanceState {
    pub start_time: std::time::Instant,
    /// CPU time spent encoding and submitting the last batch of tiles
    pub last_encode_time: std::time::Duration,
    pub frame_count: u64,
}

impl RenderState {
    pub async fn new(window: &winit::window::Window, random_len: usize) -> Result<(Self, BufferManager), RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = unsafe { instance.create_surface(&window) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Raytracer Device"),
                    features: wgpu::Features::PUSH_CONSTANTS,
                    limits: wgpu::Limits {
                        max_push_constant_size: RaytracerConfig::MAX_PUSH_CONSTANT_SIZE,
                        ..Default::default()
                    },
                },
                None,
            )
            .await?;

        // Device errors are fatal
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured GPU error: {error}");
            std::process::exit(1);
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        // Traced values go to the screen as they are, without an sRGB encode on top.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::info!("Surface configured: {}x{} {:?}", config.width, config.height, config.format);

        // Load shader binary
        let shader_binary = include_bytes!(env!("shader.spv"));
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader Module"),
            source: make_spirv(shader_binary),
        });

        let raytraced_texture = Self::create_raytraced_texture(&device, config.width, config.height);

        // Texture and surface have the same size, so every fragment maps to one texel
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let (compute_pipeline, render_pipeline) = Self::create_pipelines(&device, &shader_module, config.format);

        let buffers = BufferManager::new(&device, random_len);

        let compute_bind_group = Self::create_compute_bind_group(&device, &compute_pipeline, &raytraced_texture, &buffers);
        let render_bind_group = Self::create_render_bind_group(&device, &render_pipeline, &raytraced_texture, &sampler);

        let state = Self {
            surface,
            device,
            queue,
            config,
            size,
            compute_pipeline,
            render_pipeline,
            raytraced_texture,
            sampler,
            compute_bind_group,
            render_bind_group,
        };

        Ok((state, buffers))
    }

    fn create_pipelines(
        device: &wgpu::Device,
        shader_module: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
    ) -> (wgpu::ComputePipeline, wgpu::RenderPipeline) {
        let storage_buffer = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let compute_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compute Bind Group Layout"),
            entries: &[
                // Binding 0: Output image
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // Binding 1: Random pool
                storage_buffer(1),
                // Binding 2: Sphere instances
                storage_buffer(2),
                // Binding 3: Scene constants
                storage_buffer(3),
            ],
        });

        let render_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Compute pipeline
        let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Compute Pipeline Layout"),
            bind_group_layouts: &[&compute_bind_group_layout],
            push_constant_ranges: &[wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..std::mem::size_of::<PushConstants>() as u32,
            }],
        });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Compute Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: shader_module,
            entry_point: "main_cs",
        });

        // Render pipeline
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&render_bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader_module,
                entry_point: "main_vs",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader_module,
                entry_point: "main_fs",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        (compute_pipeline, render_pipeline)
    }

    fn create_raytraced_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Raytraced Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    }

    fn create_compute_bind_group(
        device: &wgpu::Device,
        compute_pipeline: &wgpu::ComputePipeline,
        output_texture: &wgpu::Texture,
        buffers: &BufferManager,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Compute Bind Group"),
            layout: &compute_pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(
                        &output_texture.create_view(&wgpu::TextureViewDescriptor::default()),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.random_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.instances_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.constants_buffer.as_entire_binding(),
                },
            ],
        })
    }

    fn create_render_bind_group(
        device: &wgpu::Device,
        render_pipeline: &wgpu::RenderPipeline,
        texture: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout: &render_pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(
                        &texture.create_view(&wgpu::TextureViewDescriptor::default()),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Reconfigure the surface and replace the output texture. Zero-sized windows are ignored.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>, buffers: &BufferManager) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);

            self.raytraced_texture = Self::create_raytraced_texture(&self.device, new_size.width, new_size.height);
            self.recreate_bind_groups(buffers);

            log::debug!("Resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Point both bind groups at the current texture and buffers.
    pub fn recreate_bind_groups(&mut self, buffers: &BufferManager) {
        self.compute_bind_group =
            Self::create_compute_bind_group(&self.device, &self.compute_pipeline, &self.raytraced_texture, buffers);
        self.render_bind_group =
            Self::create_render_bind_group(&self.device, &self.render_pipeline, &self.raytraced_texture, &self.sampler);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.render_bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Draw fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl ProgressiveState {
    pub fn new(width: u32, height: u32) -> Self {
        let (tiles_x, tiles_y) = TileHelper::calculate_tile_count(width, height, RaytracerConfig::TILE_SIZE);
        let tiles_per_frame = TileHelper::calculate_tiles_per_frame(tiles_x * tiles_y);

        Self {
            needs_recompute: true,
            tiles_x,
            tiles_y,
            current_tile: 0,
            is_progressive_rendering: false,
            progressive_start_time: std::time::Instant::now(),
            tiles_per_frame,
        }
    }

    pub fn total_tiles(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let (tiles_x, tiles_y) = TileHelper::calculate_tile_count(width, height, RaytracerConfig::TILE_SIZE);
        self.tiles_x = tiles_x;
        self.tiles_y = tiles_y;
        self.tiles_per_frame = TileHelper::calculate_tiles_per_frame(self.total_tiles());
        self.trigger_recompute();
    }

    /// Drop the render in flight and start over from the first tile.
    pub fn trigger_recompute(&mut self) {
        self.needs_recompute = true;
        self.current_tile = 0;
        self.is_progressive_rendering = false;
    }
}

impl PerformanceState {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            last_encode_time: std::time::Duration::ZERO,
            frame_count: 0,
        }
    }

    pub fn update_frame_count(&mut self) {
        self.frame_count += 1;

        if self.frame_count % RaytracerConfig::PERFORMANCE_STATS_INTERVAL == 0 {
            let elapsed = self.start_time.elapsed().as_secs_f32();
            log::info!("{}", self.stats_line(self.frame_count as f32 / elapsed));
        }
    }

    fn stats_line(&self, fps: f32) -> String {
        format!(
            "FPS: {:.1}, Last encode: {:.2}ms",
            fps,
            self.last_encode_time.as_secs_f32() * RaytracerConfig::MILLISECONDS_PER_SECOND
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_progressive_state_covers_frame() {
        let progressive = ProgressiveState::new(300, 200);
        assert_eq!((progressive.tiles_x, progressive.tiles_y), (3, 2));
        assert_eq!(progressive.tiles_per_frame, 6);
        assert!(progressive.needs_recompute);
    }

    #[test]
    fn test_resize_restarts_render() {
        let mut progressive = ProgressiveState::new(128, 128);
        progressive.is_progressive_rendering = true;
        progressive.needs_recompute = false;
        progressive.current_tile = 1;

        progressive.resize(3840, 2160);

        assert_eq!(progressive.total_tiles(), 30 * 17);
        assert_eq!(progressive.tiles_per_frame, 510 / 64);
        assert_eq!(progressive.current_tile, 0);
        assert!(progressive.needs_recompute);
        assert!(!progressive.is_progressive_rendering);
    }

    #[test]
    fn test_stats_line_reports_encode_time() {
        let mut performance = PerformanceState::new();
        performance.last_encode_time = std::time::Duration::from_micros(2500);

        assert_eq!(performance.stats_line(59.94), "FPS: 59.9, Last encode: 2.50ms");
    }
}

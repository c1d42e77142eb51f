use thiserror::Error;

/// Everything that can stop a render before or while it runs.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("random pool is empty, at least one value is required")]
    EmptyRandomPool,

    #[error("rays per pixel must be at least 1")]
    ZeroSamples,

    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("instance {instance} has a non-invertible transform")]
    SingularTransform { instance: usize },

    #[error("scene has {count} instances, the instance buffer holds at most {max}")]
    TooManyInstances { count: usize, max: usize },

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("window surface offers no usable texture format")]
    UnsupportedSurface,

    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

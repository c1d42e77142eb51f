mod buffers;
mod compute;
mod config;
mod cpu;
mod error;
mod input;
mod renderer;
mod scene;

use clap::Parser;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyboardInput, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use crate::buffers::BufferManager;
use crate::compute::ComputeRenderer;
use crate::config::RenderSettings;
use crate::cpu::CpuRenderer;
use crate::error::RenderError;
use crate::input::{CameraController, InputState, KeyAction};
use crate::renderer::{PerformanceState, ProgressiveState, RenderState};
use crate::scene::SceneState;

/// Everything the window loop owns
struct App {
    render: RenderState,
    buffers: BufferManager,
    scene: SceneState,
    progressive: ProgressiveState,
    performance: PerformanceState,
    input: InputState,
}

impl App {
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.render.resize(new_size, &self.buffers);
        self.progressive.resize(new_size.width, new_size.height);
    }

    fn handle_key(&mut self, action: KeyAction, control_flow: &mut ControlFlow) {
        match action {
            KeyAction::Move { forward, right } => {
                CameraController::move_camera(&mut self.scene.camera, forward, right);
                self.progressive.trigger_recompute();
            }
            KeyAction::Restart => self.progressive.trigger_recompute(),
            KeyAction::Exit => control_flow.set_exit(),
        }
    }

    fn redraw(&mut self, control_flow: &mut ControlFlow) {
        if let Err(error) = ComputeRenderer::run_compute(
            &mut self.render,
            &mut self.buffers,
            &self.scene,
            &mut self.progressive,
            &mut self.performance,
        ) {
            log::error!("{error}");
            control_flow.set_exit_with_code(1);
            return;
        }

        self.performance.update_frame_count();

        match self.render.render() {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost) => self.render.resize(self.render.size, &self.buffers),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
                control_flow.set_exit_with_code(1);
            }
            Err(e) => log::warn!("Surface error: {e:?}"),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = RenderSettings::parse();

    let result = if settings.cpu {
        run_cpu(&settings)
    } else {
        pollster::block_on(run(settings))
    };

    if let Err(error) = result {
        log::error!("{error}");
        std::process::exit(1);
    }
}

fn run_cpu(settings: &RenderSettings) -> Result<(), RenderError> {
    let scene = SceneState::from_settings(settings);
    let renderer = CpuRenderer::new(&scene, settings.width, settings.height)?;

    match &settings.output {
        Some(path) => renderer.render_to_file(path),
        None => {
            renderer.render();
            Ok(())
        }
    }
}

async fn run(settings: RenderSettings) -> Result<(), RenderError> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Sphere Raytracer")
        .with_inner_size(PhysicalSize::new(settings.width, settings.height))
        .build(&event_loop)?;

    let scene = SceneState::from_settings(&settings);
    let size = window.inner_size();
    scene.validate(size.width.max(1), size.height.max(1))?;

    let (render, buffers) = RenderState::new(&window, scene.random_floats.len()).await?;

    let mut app = App {
        progressive: ProgressiveState::new(render.config.width, render.config.height),
        render,
        buffers,
        scene,
        performance: PerformanceState::new(),
        input: InputState::new(),
    };

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent { ref event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => control_flow.set_exit(),
            WindowEvent::Resized(physical_size) => app.resize(*physical_size),
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => app.resize(**new_inner_size),
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                if let Some(action) = KeyAction::from_key(*key) {
                    app.handle_key(action, control_flow);
                }
            }
            WindowEvent::MouseInput { button, state, .. } => app.input.handle_mouse_input(*button, *state),
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((delta_x, delta_y)) = app.input.handle_cursor_moved(*position) {
                    CameraController::rotate_camera(&mut app.scene.camera, delta_x, delta_y);
                    app.progressive.trigger_recompute();
                }
            }
            _ => {}
        },
        Event::RedrawRequested(window_id) if window_id == window.id() => app.redraw(control_flow),
        Event::MainEventsCleared => window.request_redraw(),
        _ => {}
    })
}

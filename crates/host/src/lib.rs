pub mod bridge;
pub mod gpu;
pub mod logging;
pub mod timing;

use glam::Vec3;
use renderer::camera::Camera;
use renderer::AgentRenderer;
use sim_core::{CoordinatorState, Obstacle, SimError, SimulationCoordinator, WgpuBackend};
use tracing_subscriber::filter::LevelFilter;
use types::SimulationConfig;
use wasm_bindgen::prelude::*;

use timing::FrameTiming;

/// Flock sizes tried from the configured one downward when the device
/// cannot hold the buffers.
const FALLBACK_AGENT_COUNTS: [u32; 3] = [20_000, 5_000, 1_000];

pub struct App {
    pub gpu: gpu::GpuContext,
    pub sim: SimulationCoordinator<WgpuBackend>,
    pub renderer: AgentRenderer,
    pub camera: Camera,
    pub timing: FrameTiming,
    pub obstacles: Vec<Obstacle>,
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn default_obstacles(sim: &mut SimulationCoordinator<WgpuBackend>) -> Vec<Obstacle> {
    let half = sim.config().bounds().half_extents();
    vec![
        Obstacle::spawn(sim, 2.0, Vec3::new(half.x * 0.4, 0.0, 0.0)),
        Obstacle::spawn(sim, 1.5, Vec3::new(-half.x * 0.3, half.y * 0.3, half.z * 0.2)),
        Obstacle::spawn(sim, 3.0, Vec3::new(0.0, -half.y * 0.4, -half.z * 0.4)),
    ]
}

/// Initializes at the configured agent count, stepping down through
/// [`FALLBACK_AGENT_COUNTS`] while allocation fails.
fn initialize_with_fallback(sim: &mut SimulationCoordinator<WgpuBackend>) -> Result<(), SimError> {
    let requested = sim.config().agent_count;
    let mut last_err = match sim.initialize() {
        Ok(()) => return Ok(()),
        Err(e @ SimError::Allocation(_)) => e,
        Err(e) => return Err(e),
    };
    for count in FALLBACK_AGENT_COUNTS.into_iter().filter(|&c| c < requested) {
        tracing::warn!(error = %last_err, count, "allocation failed, trying a smaller flock");
        match sim.reconfigure(count) {
            Ok(()) => return Ok(()),
            Err(e @ SimError::Allocation(_)) => last_err = e,
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn init() -> Result<(), JsValue> {
    logging::install(LevelFilter::INFO);

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let canvas = document
        .get_element_by_id("gpu-canvas")
        .ok_or("no canvas element with id 'gpu-canvas'")?;
    let canvas: web_sys::HtmlCanvasElement = canvas
        .dyn_into()
        .map_err(|_| "element is not a canvas")?;

    // Match the backing store to the CSS layout size.
    let dpr = window.device_pixel_ratio();
    let width = (canvas.client_width() as f64 * dpr) as u32;
    let height = (canvas.client_height() as f64 * dpr) as u32;
    canvas.set_width(width);
    canvas.set_height(height);

    let gpu = gpu::init_gpu(canvas).await.map_err(|e| JsValue::from_str(&e))?;
    let backend = WgpuBackend::new(&gpu.device, &gpu.queue).map_err(js_error)?;

    let seed = (js_sys::Math::random() * u32::MAX as f64) as u64;
    let mut sim = SimulationCoordinator::with_seed(SimulationConfig::default(), seed);
    sim.bind_backend(backend);
    let obstacles = default_obstacles(&mut sim);
    initialize_with_fallback(&mut sim).map_err(js_error)?;

    let mut renderer = AgentRenderer::new(&gpu.device, &gpu.surface_config, sim.bounds(), sim.subscribe());
    renderer.max_speed = sim.config().max_speed;
    renderer.sync(&gpu.device, &gpu.queue, sim.agent_buffer(), sim.agent_count());

    let mut camera = Camera::new(&sim.bounds());
    camera.aspect = gpu.aspect();

    tracing::info!(agents = sim.agent_count(), "boids initialized");

    let app = App {
        gpu,
        sim,
        renderer,
        camera,
        timing: FrameTiming::new(),
        obstacles,
    };
    bridge::APP.with(|cell| {
        *cell.borrow_mut() = Some(app);
    });
    Ok(())
}

#[wasm_bindgen]
pub fn frame(dt: f32) {
    bridge::with_app(|app| {
        if app.sim.state() == CoordinatorState::Released {
            return;
        }

        for obstacle in &mut app.obstacles {
            obstacle.sync(&mut app.sim);
        }
        if let Some(step) = app.timing.step_dt(dt) {
            if let Err(e) = app.sim.tick(step) {
                tracing::error!(error = %e, "simulation tick failed");
                if app.sim.state() == CoordinatorState::Released {
                    return;
                }
            }
        }

        app.renderer
            .sync(&app.gpu.device, &app.gpu.queue, app.sim.agent_buffer(), app.sim.agent_count());

        let surface_texture = match app.gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                app.gpu.reconfigure();
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "surface texture unavailable");
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = app
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        app.renderer
            .render(&mut encoder, &surface_view, &app.gpu.queue, &app.camera);
        app.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    });
}

use std::cell::RefCell;

use glam::Vec3;
use sim_core::Obstacle;
use types::{SimulationBounds, SimulationConfig};
use wasm_bindgen::prelude::*;

use crate::App;

/// Agent counts the inspector allows.
pub const MIN_AGENTS: u32 = 128;
pub const MAX_AGENTS: u32 = 60_000;

thread_local! {
    pub static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

/// Runs `f` on the app if `init` has finished.
pub fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|cell| cell.borrow_mut().as_mut().map(f))
}

pub fn clamp_agent_count(count: u32) -> u32 {
    count.clamp(MIN_AGENTS, MAX_AGENTS)
}

/// Non-negative, with NaN mapped to zero.
fn non_negative(value: f32) -> f32 {
    value.max(0.0)
}

// --- Simulation config ---

/// Takes effect on the next frame.
#[wasm_bindgen]
pub fn set_agent_count(count: u32) {
    with_app(|app| app.sim.config_mut().agent_count = clamp_agent_count(count));
}

#[wasm_bindgen]
pub fn agent_count() -> u32 {
    with_app(|app| app.sim.agent_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn set_radii(cohesion: f32, alignment: f32, separation: f32) {
    with_app(|app| {
        let radii = &mut app.sim.config_mut().radii;
        radii.cohesion = non_negative(cohesion);
        radii.alignment = non_negative(alignment);
        radii.separation = non_negative(separation);
    });
}

#[wasm_bindgen]
pub fn set_weights(cohesion: f32, alignment: f32, separation: f32) {
    with_app(|app| {
        let weights = &mut app.sim.config_mut().weights;
        weights.cohesion = non_negative(cohesion);
        weights.alignment = non_negative(alignment);
        weights.separation = non_negative(separation);
    });
}

#[wasm_bindgen]
pub fn set_max_speed(speed: f32) {
    with_app(|app| {
        let speed = non_negative(speed);
        app.sim.config_mut().max_speed = speed;
        app.renderer.max_speed = speed;
    });
}

#[wasm_bindgen]
pub fn set_max_steering_force(force: f32) {
    with_app(|app| app.sim.config_mut().max_steering_force = non_negative(force));
}

#[wasm_bindgen]
pub fn set_obstacle_avoidance_weight(weight: f32) {
    with_app(|app| app.sim.config_mut().obstacle_avoidance_weight = non_negative(weight));
}

#[wasm_bindgen]
pub fn set_bounds_avoid_weight(weight: f32) {
    with_app(|app| app.sim.config_mut().bounds_avoid_weight = non_negative(weight));
}

#[wasm_bindgen]
pub fn set_bounds(cx: f32, cy: f32, cz: f32, width: f32, height: f32, depth: f32) {
    let bounds = SimulationBounds::new(
        Vec3::new(cx, cy, cz),
        Vec3::new(non_negative(width), non_negative(height), non_negative(depth)),
    );
    with_app(|app| app.sim.config_mut().set_bounds(bounds));
}

/// Replaces the whole configuration from JSON. Missing fields take their
/// defaults.
#[wasm_bindgen]
pub fn load_config(json: &str) -> Result<(), JsValue> {
    let mut config = SimulationConfig::from_json_str(json).map_err(crate::js_error)?;
    config.agent_count = clamp_agent_count(config.agent_count);
    with_app(|app| {
        app.renderer.max_speed = config.max_speed;
        *app.sim.config_mut() = config;
    })
    .ok_or_else(|| JsValue::from_str("not initialized"))
}

#[wasm_bindgen]
pub fn config_json() -> String {
    with_app(|app| app.sim.config().to_json_string()).unwrap_or_default()
}

// --- Obstacles ---

#[wasm_bindgen]
pub fn add_obstacle(radius: f32, x: f32, y: f32, z: f32) -> Option<u32> {
    with_app(|app| {
        let obstacle = Obstacle::spawn(&mut app.sim, non_negative(radius), Vec3::new(x, y, z));
        app.obstacles.push(obstacle);
        (app.obstacles.len() - 1) as u32
    })
}

#[wasm_bindgen]
pub fn move_obstacle(index: u32, x: f32, y: f32, z: f32) {
    with_app(|app| {
        if let Some(obstacle) = app.obstacles.get_mut(index as usize) {
            obstacle.position = Vec3::new(x, y, z);
        }
    });
}

#[wasm_bindgen]
pub fn resize_obstacle(index: u32, radius: f32) {
    with_app(|app| {
        if let Some(obstacle) = app.obstacles.get_mut(index as usize) {
            obstacle.radius = non_negative(radius);
        }
    });
}

// --- Timing ---

#[wasm_bindgen]
pub fn set_paused(paused: bool) {
    with_app(|app| app.timing.set_paused(paused));
}

#[wasm_bindgen]
pub fn single_step() {
    with_app(|app| app.timing.request_single_step());
}

#[wasm_bindgen]
pub fn set_time_scale(scale: f32) {
    with_app(|app| app.timing.set_time_scale(scale));
}

// --- Camera and input ---

#[wasm_bindgen]
pub fn on_mouse_move(dx: f32, dy: f32, buttons: u32) {
    with_app(|app| {
        if buttons & 1 != 0 {
            app.camera.orbit(dx, dy);
        } else if buttons & 4 != 0 {
            app.camera.pan(dx, dy);
        }
    });
}

#[wasm_bindgen]
pub fn on_scroll(delta: f32) {
    with_app(|app| app.camera.zoom(delta));
}

#[wasm_bindgen]
pub fn on_key_down(key: String) {
    with_app(|app| match key.as_str() {
        "p" | "P" => app.timing.toggle_pause(),
        "n" | "N" => app.timing.request_single_step(),
        "f" | "F" => app.camera.frame(&app.sim.bounds()),
        _ => {}
    });
}

#[wasm_bindgen]
pub fn resize(width: u32, height: u32) {
    with_app(|app| {
        app.gpu.resize(width, height);
        app.renderer.resize(
            &app.gpu.device,
            app.gpu.surface_config.width,
            app.gpu.surface_config.height,
        );
        app.camera.aspect = app.gpu.aspect();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_count_is_clamped_to_inspector_range() {
        assert_eq!(clamp_agent_count(0), MIN_AGENTS);
        assert_eq!(clamp_agent_count(5000), 5000);
        assert_eq!(clamp_agent_count(1_000_000), MAX_AGENTS);
    }

    #[test]
    fn setters_reject_negative_and_nan() {
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(f32::NAN), 0.0);
        assert_eq!(non_negative(2.5), 2.5);
    }

    #[test]
    fn calls_before_init_are_ignored() {
        assert_eq!(with_app(|_| ()), None);
        assert_eq!(agent_count(), 0);
        assert_eq!(config_json(), "");
    }
}

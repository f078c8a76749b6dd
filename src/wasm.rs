//! Browser bindings
//!
//! The page owns the canvas or 3D scene and the animation frame loop. It
//! forwards key codes and frame timestamps here and draws the JSON report
//! returned from `advance`.

use wasm_bindgen::prelude::*;

use crate::scenario::{Scenario, Tunable};
use crate::sim::{DriveMode, Simulation};

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Already installed by a previous module instance
        return;
    }
    log::info!("Drive sim core loaded");
}

/// A simulation owned by the page
#[wasm_bindgen]
pub struct SimHandle {
    sim: Simulation,
}

#[wasm_bindgen]
impl SimHandle {
    /// Create from a preset name (`canvas`, `plaza`, `scatter`) or scenario JSON
    #[wasm_bindgen(constructor)]
    pub fn new(scenario: &str) -> Result<SimHandle, JsValue> {
        let scenario = parse_scenario(scenario)?;
        log::info!("Scenario '{}' with {} obstacles", scenario.name, scenario.obstacles.len());
        let sim = Simulation::new(scenario).map_err(js_err)?;
        Ok(SimHandle { sim })
    }

    /// Replace the scenario; the simulation resets to idle
    pub fn configure(&mut self, scenario: &str) -> Result<(), JsValue> {
        let scenario = parse_scenario(scenario)?;
        self.sim.configure(scenario).map_err(js_err)
    }

    /// Scenario currently loaded, as JSON
    pub fn scenario(&self) -> Result<String, JsValue> {
        self.sim.scenario().to_json().map_err(js_err)
    }

    /// Step by a frame delta in milliseconds; returns the report as JSON
    pub fn step(&mut self, dt_millis: f64) -> Result<String, JsValue> {
        let report = self.sim.step(dt_millis).map_err(js_err)?;
        serde_json::to_string(&report).map_err(js_err)
    }

    /// Step to a `requestAnimationFrame` timestamp; returns the report as JSON
    pub fn advance(&mut self, timestamp_ms: f64) -> Result<String, JsValue> {
        let report = self.sim.advance(timestamp_ms).map_err(js_err)?;
        serde_json::to_string(&report).map_err(js_err)
    }

    pub fn start(&mut self) {
        self.sim.start();
    }

    pub fn pause(&mut self) {
        self.sim.pause();
    }

    pub fn reset(&mut self) {
        self.sim.reset();
    }

    /// `manual` or `autonomous`
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = DriveMode::from_str(mode).ok_or_else(|| js_err(format!("unknown drive mode '{mode}'")))?;
        self.sim.set_mode(mode);
        Ok(())
    }

    /// Currently held `KeyboardEvent.code` values
    #[wasm_bindgen(js_name = setKeyState)]
    pub fn set_key_state(&mut self, codes: Vec<String>) {
        self.sim.set_key_state(codes);
    }

    /// Slider input: `max_speed`, `brake_strength` or `sensor_range`
    #[wasm_bindgen(js_name = setTunable)]
    pub fn set_tunable(&mut self, name: &str, value: f32) -> Result<(), JsValue> {
        let tunable = Tunable::from_str(name).ok_or_else(|| js_err(format!("unknown tunable '{name}'")))?;
        self.sim.set_tunable(tunable, value).map_err(js_err)
    }

    /// Current status label for the HUD
    pub fn status(&self) -> String {
        self.sim.status().as_str().to_string()
    }
}

fn parse_scenario(source: &str) -> Result<Scenario, JsValue> {
    let trimmed = source.trim();
    if trimmed.starts_with('{') {
        Scenario::from_json(trimmed).map_err(js_err)
    } else {
        Scenario::preset(trimmed).ok_or_else(|| js_err(format!("unknown scenario preset '{trimmed}'")))
    }
}

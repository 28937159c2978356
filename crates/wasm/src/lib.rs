//! WebAssembly bindings for the beer sloshing simulator
//!
//! Exposes the engine to JavaScript as `BeerSimulator`. A web worker owns one
//! instance, feeds it each accelerometer reading as `{ x, y, z }` together with
//! the elapsed seconds, and posts the snapshot from `get_state` back to the
//! page for rendering.

use beer_sim_core::{Acceleration, BeerSimulator};
use serde::Deserialize;
use tracing::debug;
use wasm_bindgen::prelude::*;

/// Accelerometer reading as sent by the browser (m/s², device coordinates)
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
struct AccelerometerData {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
}

impl From<AccelerometerData> for Acceleration {
    fn from(data: AccelerometerData) -> Self {
        Acceleration::new(data.x as f32, data.y as f32, data.z as f32)
    }
}

/// Pick the sample to use: the decoded one, or the last good one if decoding failed
fn resolve_sample(decoded: Option<AccelerometerData>, last: Acceleration) -> Acceleration {
    decoded.map_or(last, Acceleration::from)
}

fn greeting(name: &str, width: u32, height: u32) -> String {
    format!("Hello from Rust WASM, {name}! Simulator ready for {width}x{height} area.")
}

fn decode(accel_js: JsValue) -> Option<AccelerometerData> {
    match serde_wasm_bindgen::from_value(accel_js) {
        Ok(data) => Some(data),
        Err(err) => {
            debug!("Ignoring undecodable accelerometer sample: {}", err);
            None
        }
    }
}

/// Liquid-in-a-glass simulator handle for JavaScript
#[wasm_bindgen(js_name = BeerSimulator)]
pub struct WasmBeerSimulator {
    engine: BeerSimulator,
    last_acceleration: Acceleration,
}

#[wasm_bindgen(js_class = BeerSimulator)]
impl WasmBeerSimulator {
    /// Create a simulator for a `width` × `height` grid at rest.
    ///
    /// # Errors
    ///
    /// Throws if either dimension is zero or the grid is too large.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Result<WasmBeerSimulator, JsError> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        Ok(Self {
            engine: BeerSimulator::new(width, height)?,
            last_acceleration: Acceleration::LEVEL,
        })
    }

    /// Advance by `dt` seconds under the given `{ x, y, z }` reading.
    ///
    /// A reading that cannot be decoded is replaced by the last good one, so
    /// the step still advances.
    pub fn update(&mut self, accel_js: JsValue, dt: f64) {
        let acceleration = resolve_sample(decode(accel_js), self.last_acceleration);
        self.last_acceleration = acceleration;
        self.engine.update(acceleration, dt as f32);
    }

    /// Snapshot `{ width, height, cells, tilt_x_deg, tilt_z_deg }` for rendering.
    ///
    /// # Errors
    ///
    /// Throws if the snapshot cannot be converted to a JavaScript value.
    pub fn get_state(&self, accel_js: JsValue) -> Result<JsValue, JsError> {
        let acceleration = resolve_sample(decode(accel_js), self.last_acceleration);
        let state = self.engine.get_state(acceleration);
        Ok(serde_wasm_bindgen::to_value(&state)?)
    }

    /// Copy the levels straight into a `Float32Array`, returning how many were written.
    pub fn copy_levels(&self, out: &mut [f32]) -> usize {
        self.engine.copy_levels_into(out)
    }

    /// Diagnostic statistics as a plain object.
    ///
    /// # Errors
    ///
    /// Throws if the statistics cannot be converted to a JavaScript value.
    pub fn stats(&self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.engine.stats())?)
    }

    /// Return the liquid to rest.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.last_acceleration = Acceleration::LEVEL;
    }

    pub fn greet(&self, name: &str) -> String {
        greeting(name, self.engine.width(), self.engine.height())
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.engine.width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.engine.height()
    }
}

//! WASM bindings for the spiral-thread-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Inputs and outputs are JSON strings.

use wasm_bindgen::prelude::*;

use crate::layout::{BranchRng, SpiralLayouter};
use crate::output::ThreadLayoutOutput;
use crate::record::{clear_layouts, parse_thread};

const SERIALIZE_FALLBACK: &str = "{\"error\": {\"message\": \"could not serialize layout\"}}";

fn report_error(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&JsValue::from_str(msg));
    #[cfg(not(target_arch = "wasm32"))]
    log::error!("{msg}");
}

fn to_json(output: &ThreadLayoutOutput) -> String {
    serde_json::to_string(output).unwrap_or_else(|e| {
        report_error(&format!("Error serializing layout: {e}"));
        SERIALIZE_FALLBACK.to_string()
    })
}

fn run_layout(layouter: &SpiralLayouter, input: &str) -> String {
    let records = match parse_thread(input) {
        Ok(records) => records,
        Err(e) => {
            report_error(&format!("Error parsing thread: {e}"));
            return to_json(&ThreadLayoutOutput::error(e.to_string()));
        }
    };
    let result = layouter.layout(&records);
    match ThreadLayoutOutput::from_result(&result) {
        Ok(output) => to_json(&output),
        Err(e) => {
            report_error(&format!("Error building layout output: {e}"));
            to_json(&ThreadLayoutOutput::error(e.to_string()))
        }
    }
}

/// Layout engine that remembers the canvas size between calls.
#[wasm_bindgen]
pub struct ThreadLayouter {
    inner: SpiralLayouter,
}

#[wasm_bindgen]
impl ThreadLayouter {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> ThreadLayouter {
        ThreadLayouter { inner: SpiralLayouter::new(width, height) }
    }

    /// Call after the canvas is resized; roots follow the new center.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.inner.set_canvas_size(width, height);
    }

    /// Seed the branch-angle choice, or pass nothing for fresh randomness.
    pub fn set_branch_seed(&mut self, seed: Option<u64>) {
        self.inner.config_mut().branch_rng = match seed {
            Some(s) => BranchRng::Seeded(s),
            None => BranchRng::Entropy,
        };
    }

    /// Lay out a thread (object with `messages`, or a message array).
    pub fn layout(&self, input: &str) -> String {
        run_layout(&self.inner, input)
    }
}

/// One-shot layout for a canvas of the given size.
#[wasm_bindgen]
pub fn layout_thread(input: &str, width: f64, height: f64) -> String {
    run_layout(&SpiralLayouter::new(width, height), input)
}

/// Strip every stored layout so the next layout regenerates the thread.
/// Returns the message array, or the input unchanged if it does not parse.
#[wasm_bindgen]
pub fn clear_thread_layouts(input: &str) -> String {
    let mut records = match parse_thread(input) {
        Ok(records) => records,
        Err(e) => {
            report_error(&format!("Error parsing thread: {e}"));
            return input.to_string();
        }
    };
    clear_layouts(&mut records);
    serde_json::to_string(&records).unwrap_or_else(|e| {
        report_error(&format!("Error serializing thread: {e}"));
        input.to_string()
    })
}

use wasm_bindgen::prelude::*;

mod error;
pub mod layout;
pub mod output;
pub mod record;
mod wasm;

pub use error::LayoutError;
pub use layout::{
    BranchRng, Canvas, LaidOutNode, LayoutConfig, LayoutResult, LayoutWarning, PlacementStatus, PointF,
    SpiralGeometry, SpiralLayouter,
};
pub use layout::variation::GenerationParams;
pub use record::{clear_layouts, parse_thread, LayoutDescriptor, MessageRecord};
pub use wasm::{clear_thread_layouts, layout_thread, ThreadLayouter};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(all(feature = "debug_logs", target_arch = "wasm32"))]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(all(feature = "debug_logs", target_arch = "wasm32")))]
fn init_logger() {}

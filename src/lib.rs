//! scene-canvas
//!
//! Mounts a small physics-driven 3D scene (a ball dropped onto a ground plane)
//! into a drawable surface: a `<canvas>` element on the web, a window natively.
//! The crate separates the mount lifecycle from the GPU so the lifecycle can be
//! driven, cancelled and torn down deterministically.
//!
//! High-level modules
//! - `host`: mount / unmount lifecycle around one rendering engine
//! - `engine`: the rendering engine seam and its `wgpu` implementation
//! - `scene`: CPU scene data and the asynchronous scene builder
//! - `physics`: physics plugin seam, aggregates and the `rapier3d` backend
//! - `overlay`: optional debug overlay ("inspector")
//! - `events`: global resize notifications
//! - `flow`: the `winit` event loop driving a host
//! - `camera`, `pipelines`, `render`, `data_structures`: GPU resources and drawing
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod events;
pub mod flow;
pub mod host;
pub mod lifecycle;
pub mod overlay;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod scene;

pub use config::{CanvasConfig, EngineOptions};
pub use error::SceneError;
pub use host::CanvasHost;
pub use lifecycle::MountStatus;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point for the web page: mounts the scene into `#renderCanvas`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start(show_inspector: bool) -> Result<(), JsValue> {
    let config = CanvasConfig::from_location();
    let show_inspector = show_inspector || config.show_inspector;
    flow::run(config.with_inspector(show_inspector)).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    scene_canvas::flow::run(scene_canvas::CanvasConfig::from_env())
}

// the web build starts through the exported `start` function instead
#[cfg(target_arch = "wasm32")]
fn main() {}

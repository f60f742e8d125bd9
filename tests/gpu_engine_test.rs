//! Runs the wgpu engine on a real window. Needs a display and a GPU adapter,
//! so it only builds with `--features integration-tests`.

#[cfg(feature = "integration-tests")]
use std::sync::Arc;

#[cfg(feature = "integration-tests")]
use futures::executor::block_on;
#[cfg(feature = "integration-tests")]
use instant::Duration;
#[cfg(feature = "integration-tests")]
use scene_canvas::{
    EngineOptions,
    context::Context,
    engine::{GpuEngine, MSAA_SAMPLES, RenderEngine},
    lifecycle::Liveness,
    scene::builder::{SceneLoaders, create_scene},
};
#[cfg(feature = "integration-tests")]
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

#[cfg(feature = "integration-tests")]
#[derive(Debug, Default)]
struct Report {
    created_size: (u32, u32),
    window_size_at_create: (u32, u32),
    sample_count: u32,
    stencil: bool,
    resized_size: (u32, u32),
    window_size_at_resize: (u32, u32),
    rendering: bool,
    frames: u32,
    sphere_height: f32,
    disposed: bool,
    frame_after_dispose_ok: bool,
}

#[cfg(feature = "integration-tests")]
#[derive(Default)]
struct EngineRun {
    result: Option<anyhow::Result<Report>>,
}

#[cfg(feature = "integration-tests")]
impl EngineRun {
    fn exercise(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Report> {
        let attributes = Window::default_attributes()
            .with_title("scene-canvas gpu test")
            .with_inner_size(PhysicalSize::new(640, 480));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let options = EngineOptions::default();

        let ctx = block_on(Context::new(window.clone(), &options))?;
        let mut engine = GpuEngine::create(ctx, &options)?;
        let mut report = Report {
            created_size: engine.output_size(),
            window_size_at_create: window.inner_size().into(),
            sample_count: engine.sample_count(),
            stencil: engine.depth_format().has_stencil_aspect(),
            ..Default::default()
        };

        let scene = block_on(create_scene(Liveness::new(), SceneLoaders::default()))?;
        engine.run_render_loop(scene);
        report.rendering = engine.is_rendering();
        for _ in 0..30 {
            engine.frame(Duration::from_millis(16))?;
            report.frames += 1;
        }

        let _ = window.request_inner_size(PhysicalSize::new(320, 240));
        engine.resize();
        report.resized_size = engine.output_size();
        report.window_size_at_resize = window.inner_size().into();
        engine.frame(Duration::from_millis(16))?;
        report.frames += 1;

        report.sphere_height = engine
            .scene()
            .and_then(|scene| scene.mesh_by_name("sphere"))
            .map_or(f32::NAN, |sphere| sphere.transform.position.y);

        engine.dispose();
        report.disposed = engine.is_disposed();
        report.frame_after_dispose_ok = engine.frame(Duration::from_millis(16)).is_ok();
        Ok(report)
    }
}

#[cfg(feature = "integration-tests")]
impl ApplicationHandler for EngineRun {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.result.is_none() {
            self.result = Some(self.exercise(event_loop));
        }
        event_loop.exit();
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, _event: WindowEvent) {}
}

#[cfg(all(feature = "integration-tests", target_os = "linux"))]
fn event_loop() -> EventLoop<()> {
    use winit::platform::wayland::EventLoopBuilderExtWayland;

    EventLoop::builder()
        .with_any_thread(true)
        .build()
        .expect("Failed to create an event loop")
}

#[cfg(all(feature = "integration-tests", target_os = "windows"))]
fn event_loop() -> EventLoop<()> {
    use winit::platform::windows::EventLoopBuilderExtWindows;

    EventLoop::builder()
        .with_any_thread(true)
        .build()
        .expect("Failed to create an event loop")
}

#[cfg(all(feature = "integration-tests", not(any(target_os = "linux", target_os = "windows"))))]
fn event_loop() -> EventLoop<()> {
    EventLoop::new().expect("Failed to create an event loop")
}

#[test]
#[cfg(feature = "integration-tests")]
fn gpu_engine_creates_resizes_and_renders() {
    let mut run = EngineRun::default();
    event_loop().run_app(&mut run).unwrap();
    let report = run.result.expect("the event loop never resumed").unwrap();

    assert_eq!(report.created_size, report.window_size_at_create);
    assert_eq!(report.sample_count, MSAA_SAMPLES);
    assert!(report.stencil);

    assert_eq!(report.resized_size, report.window_size_at_resize);

    assert!(report.rendering);
    assert_eq!(report.frames, 31);
    assert!(report.sphere_height < 4.0, "sphere never fell: {}", report.sphere_height);

    assert!(report.disposed);
    assert!(report.frame_after_dispose_ok);
}

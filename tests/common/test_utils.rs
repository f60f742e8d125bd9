#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use anyhow::anyhow;
use cgmath::{Quaternion, Vector3};
use futures::{channel::oneshot, executor::block_on};
use instant::Duration;
use scene_canvas::{
    CanvasConfig, CanvasHost, EngineOptions,
    engine::RenderEngine,
    events::ResizeListeners,
    host::SceneTask,
    overlay::{DebugOverlay, OverlayLoader, OverlayOptions},
    physics::{BodyDesc, BodyHandle, LoadFuture, PhysicsLoader, PhysicsPlugin, RapierPlugin},
    scene::{Scene, builder::SceneLoaders},
};

/// What happened to the engines created on one [`FakeSurface`].
#[derive(Debug, Default)]
pub struct EngineLog {
    pub created: u32,
    pub disposed: u32,
    pub resized: u32,
    pub render_loops: u32,
    pub frames: u32,
    /// Bodies attached to the scene when the render loop was started.
    pub bodies_at_render_start: Option<usize>,
    pub cameras_at_render_start: usize,
    pub lights_at_render_start: usize,
    pub meshes_at_render_start: usize,
    pub overlay_at_render_start: bool,
    pub overlays_attached: u32,
}

/// Stand-in for a canvas: a pixel size that tests can change at will.
#[derive(Clone, Default)]
pub struct FakeSurface {
    pub size: Rc<Cell<(u32, u32)>>,
    pub log: Rc<RefCell<EngineLog>>,
    pub fail_create: bool,
}

impl FakeSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Rc::new(Cell::new((width, height))),
            ..Default::default()
        }
    }

    pub fn broken() -> Self {
        Self {
            fail_create: true,
            ..Self::new(800, 600)
        }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }

    pub fn log(&self) -> std::cell::Ref<'_, EngineLog> {
        self.log.borrow()
    }
}

pub struct FakeEngine {
    surface: FakeSurface,
    size: (u32, u32),
    pub options: EngineOptions,
    scene: Option<Scene>,
    disposed: bool,
}

impl RenderEngine for FakeEngine {
    type Surface = FakeSurface;

    fn create(surface: FakeSurface, options: &EngineOptions) -> anyhow::Result<Self> {
        if surface.fail_create {
            return Err(anyhow!("no GPU adapter"));
        }
        surface.log.borrow_mut().created += 1;
        Ok(Self {
            size: surface.size.get(),
            surface,
            options: options.clone(),
            scene: None,
            disposed: false,
        })
    }

    fn resize(&mut self) {
        self.size = self.surface.size.get();
        self.surface.log.borrow_mut().resized += 1;
    }

    fn output_size(&self) -> (u32, u32) {
        self.size
    }

    fn run_render_loop(&mut self, scene: Scene) {
        let mut log = self.surface.log.borrow_mut();
        log.render_loops += 1;
        log.bodies_at_render_start = scene.physics().map(|physics| physics.body_count());
        log.cameras_at_render_start = scene.cameras().len();
        log.lights_at_render_start = scene.lights().len();
        log.meshes_at_render_start = scene.meshes().len();
        log.overlay_at_render_start = scene.has_debug_layer();
        self.scene = Some(scene);
    }

    fn is_rendering(&self) -> bool {
        self.scene.is_some()
    }

    fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    fn frame(&mut self, dt: Duration) -> anyhow::Result<()> {
        if let Some(scene) = self.scene.as_mut() {
            scene.step(dt);
            self.surface.log.borrow_mut().frames += 1;
        }
        Ok(())
    }

    fn attach_overlay(&mut self, overlay: Box<dyn DebugOverlay>) -> anyhow::Result<()> {
        let scene = self.scene.as_mut().ok_or_else(|| anyhow!("no scene is rendering"))?;
        scene.attach_debug_layer(overlay)?;
        self.surface.log.borrow_mut().overlays_attached += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.scene = None;
        self.surface.log.borrow_mut().disposed += 1;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// rapier, but counting the bodies added into a shared cell.
pub struct CountingPlugin {
    inner: RapierPlugin,
    pub bodies: Rc<Cell<usize>>,
}

impl CountingPlugin {
    pub fn new(bodies: Rc<Cell<usize>>) -> Self {
        Self {
            inner: RapierPlugin::new(true),
            bodies,
        }
    }
}

impl PhysicsPlugin for CountingPlugin {
    fn name(&self) -> &str {
        "counting"
    }

    fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.inner.set_gravity(gravity);
    }

    fn gravity(&self) -> Vector3<f32> {
        self.inner.gravity()
    }

    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.bodies.set(self.bodies.get() + 1);
        self.inner.add_body(desc)
    }

    fn step(&mut self, dt: f32) {
        self.inner.step(dt);
    }

    fn body_transform(&self, handle: BodyHandle) -> Option<(Vector3<f32>, Quaternion<f32>)> {
        self.inner.body_transform(handle)
    }

    fn body_count(&self) -> usize {
        self.inner.body_count()
    }
}

/// Resolves immediately, counting requests and bodies.
#[derive(Clone, Default)]
pub struct CountingPhysicsLoader {
    pub requests: Rc<Cell<u32>>,
    pub bodies: Rc<Cell<usize>>,
}

impl PhysicsLoader for CountingPhysicsLoader {
    fn load(&self) -> LoadFuture<Box<dyn PhysicsPlugin>> {
        self.requests.set(self.requests.get() + 1);
        let bodies = self.bodies.clone();
        Box::pin(async move {
            let plugin: Box<dyn PhysicsPlugin> = Box::new(CountingPlugin::new(bodies));
            Ok(plugin)
        })
    }
}

pub struct FailingPhysicsLoader;

impl PhysicsLoader for FailingPhysicsLoader {
    fn load(&self) -> LoadFuture<Box<dyn PhysicsPlugin>> {
        Box::pin(async { Err(anyhow!("physics payload could not be fetched")) })
    }
}

/// Stays pending until the test sends the plugin through the returned sender.
pub struct PendingPhysicsLoader {
    receiver: RefCell<Option<oneshot::Receiver<Box<dyn PhysicsPlugin>>>>,
}

impl PendingPhysicsLoader {
    pub fn new() -> (Self, oneshot::Sender<Box<dyn PhysicsPlugin>>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                receiver: RefCell::new(Some(receiver)),
            },
            sender,
        )
    }
}

impl PhysicsLoader for PendingPhysicsLoader {
    fn load(&self) -> LoadFuture<Box<dyn PhysicsPlugin>> {
        let receiver = self.receiver.borrow_mut().take();
        Box::pin(async move {
            let receiver = receiver.ok_or_else(|| anyhow!("physics requested twice"))?;
            receiver
                .await
                .map_err(|_| anyhow!("physics payload never arrived"))
        })
    }
}

#[derive(Clone, Default)]
pub struct CountingOverlayLoader {
    pub requests: Rc<Cell<u32>>,
    pub shown: Rc<Cell<u32>>,
    pub refreshed: Rc<Cell<u32>>,
    pub fail: bool,
}

impl CountingOverlayLoader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

struct RecordingOverlay {
    shown: Rc<Cell<u32>>,
    refreshed: Rc<Cell<u32>>,
}

impl DebugOverlay for RecordingOverlay {
    fn show(&mut self, options: &OverlayOptions, lines: &[String]) -> anyhow::Result<()> {
        assert!(options.embed_mode);
        assert!(!lines.is_empty());
        self.shown.set(self.shown.get() + 1);
        Ok(())
    }

    fn refresh(&mut self, _lines: &[String]) {
        self.refreshed.set(self.refreshed.get() + 1);
    }
}

impl OverlayLoader for CountingOverlayLoader {
    fn load(&self) -> LoadFuture<Box<dyn DebugOverlay>> {
        self.requests.set(self.requests.get() + 1);
        let fail = self.fail;
        let shown = self.shown.clone();
        let refreshed = self.refreshed.clone();
        Box::pin(async move {
            if fail {
                return Err(anyhow!("inspector bundle unavailable"));
            }
            let overlay: Box<dyn DebugOverlay> = Box::new(RecordingOverlay { shown, refreshed });
            Ok(overlay)
        })
    }
}

/// Never resolves, like an inspector bundle that hangs on the network.
#[derive(Clone, Default)]
pub struct StalledOverlayLoader {
    pub requests: Rc<Cell<u32>>,
}

impl OverlayLoader for StalledOverlayLoader {
    fn load(&self) -> LoadFuture<Box<dyn DebugOverlay>> {
        self.requests.set(self.requests.get() + 1);
        Box::pin(futures::future::pending())
    }
}

pub type Listeners = Rc<RefCell<ResizeListeners>>;
pub type TestHost = CanvasHost<FakeEngine, Listeners>;

pub fn loaders(physics: impl PhysicsLoader + 'static, overlay: impl OverlayLoader + 'static) -> SceneLoaders {
    SceneLoaders {
        physics: Rc::new(physics),
        overlay: Rc::new(overlay),
    }
}

pub fn host(loaders: SceneLoaders) -> (TestHost, Listeners) {
    let listeners: Listeners = Rc::new(RefCell::new(ResizeListeners::new()));
    (CanvasHost::new(listeners.clone(), loaders), listeners)
}

pub fn config(show_inspector: bool) -> CanvasConfig {
    CanvasConfig::default().with_inspector(show_inspector)
}

/// Run scene construction to completion and hand the result to the host.
/// A requested overlay is loaded and attached right after.
pub fn finish(host: &mut TestHost, task: SceneTask) -> bool {
    let outcome = block_on(task.run());
    let started = host.scene_ready(outcome);
    if let Some(overlay) = host.overlay_task() {
        host.overlay_ready(block_on(overlay.run()));
    }
    started
}

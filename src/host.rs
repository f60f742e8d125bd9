//! The canvas host: owns one engine per mount and walks it through
//! mount → scene construction → render loop → unmount.
//!
//! Scene construction is asynchronous. `mount` hands the construction future
//! back to the caller as a [`SceneTask`]; whoever drives the event loop runs it
//! and feeds the [`SceneOutcome`] back through [`CanvasHost::scene_ready`].
//! Outcomes that arrive after the mount went away are dropped.
//!
//! The debug overlay follows the same pattern one stage later: once the render
//! loop runs, [`CanvasHost::overlay_task`] yields its load and
//! [`CanvasHost::overlay_ready`] attaches the result to the running scene.

use std::{
    cell::{Ref, RefCell},
    pin::Pin,
    rc::Rc,
};

use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    config::CanvasConfig,
    engine::RenderEngine,
    error::SceneError,
    events::{ListenerId, ResizeEvents},
    lifecycle::{Liveness, MountStatus},
    overlay::DebugOverlay,
    physics::LoadFuture,
    scene::{
        Scene,
        builder::{SceneLoaders, create_scene},
    },
};

type SceneFuture = Pin<Box<dyn Future<Output = Result<Scene, SceneError>>>>;

/// Scene construction for one mount, tagged with that mount's generation.
pub struct SceneTask {
    generation: u64,
    future: SceneFuture,
}

impl SceneTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> SceneOutcome {
        SceneOutcome {
            generation: self.generation,
            result: self.future.await,
        }
    }
}

impl std::fmt::Debug for SceneTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneTask")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

pub struct SceneOutcome {
    pub generation: u64,
    pub result: Result<Scene, SceneError>,
}

/// Debug overlay load for one mount, started after its render loop.
pub struct OverlayTask {
    generation: u64,
    future: LoadFuture<Box<dyn DebugOverlay>>,
}

impl OverlayTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> OverlayOutcome {
        OverlayOutcome {
            generation: self.generation,
            result: self.future.await,
        }
    }
}

impl std::fmt::Debug for OverlayTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayTask")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

pub struct OverlayOutcome {
    pub generation: u64,
    pub result: anyhow::Result<Box<dyn DebugOverlay>>,
}

struct Mounted<E> {
    engine: Rc<RefCell<E>>,
    listener: ListenerId,
    liveness: Liveness,
    generation: u64,
    show_inspector: bool,
}

pub struct CanvasHost<E: RenderEngine + 'static, R: ResizeEvents> {
    events: R,
    loaders: SceneLoaders,
    mounted: Option<Mounted<E>>,
    overlay: Option<OverlayTask>,
    generation: u64,
    status: MountStatus,
}

impl<E: RenderEngine + 'static, R: ResizeEvents> CanvasHost<E, R> {
    pub fn new(events: R, loaders: SceneLoaders) -> Self {
        Self {
            events,
            loaders,
            mounted: None,
            overlay: None,
            generation: 0,
            status: MountStatus::Unmounted,
        }
    }

    /// Create the engine on `surface`, start listening for resizes and return
    /// the scene construction to drive.
    ///
    /// `Ok(None)` when there is nothing to do: no surface, or already mounted
    /// with the same inspector flag. A different flag tears the current mount
    /// down first.
    pub fn mount(
        &mut self,
        surface: Option<E::Surface>,
        config: &CanvasConfig,
    ) -> Result<Option<SceneTask>, SceneError> {
        if let Some(mounted) = &self.mounted {
            if mounted.show_inspector == config.show_inspector {
                log::debug!("already mounted, keeping the current engine");
                return Ok(None);
            }
            log::info!("inspector flag changed, remounting");
            self.unmount();
        }
        let Some(surface) = surface else {
            log::warn!("no surface for canvas `{}`, skipping setup", config.canvas_id);
            return Ok(None);
        };

        let engine = E::create(surface, &config.engine).map_err(SceneError::Engine)?;
        let engine = Rc::new(RefCell::new(engine));

        let weak = Rc::downgrade(&engine);
        let listener = self.events.add(Box::new(move || {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            match engine.try_borrow_mut() {
                Ok(mut engine) => engine.resize(),
                Err(_) => log::warn!("engine busy, resize skipped"),
            };
        }));

        self.generation += 1;
        let liveness = Liveness::new();
        let future: SceneFuture = Box::pin(create_scene(liveness.clone(), self.loaders.clone()));
        self.mounted = Some(Mounted {
            engine,
            listener,
            liveness,
            generation: self.generation,
            show_inspector: config.show_inspector,
        });
        self.status = MountStatus::Constructing;
        log::info!("mounted canvas `{}` (generation {})", config.canvas_id, self.generation);

        Ok(Some(SceneTask {
            generation: self.generation,
            future,
        }))
    }

    /// Start the render loop with a finished scene. `true` when it started.
    ///
    /// With the inspector flag set this also starts loading the overlay; take
    /// it with [`CanvasHost::overlay_task`].
    pub fn scene_ready(&mut self, outcome: SceneOutcome) -> bool {
        let Some(mounted) = &self.mounted else {
            log::debug!("scene finished after unmount, dropping it");
            return false;
        };
        if outcome.generation != mounted.generation || !mounted.liveness.is_alive() {
            log::debug!("scene of generation {} is stale, dropping it", outcome.generation);
            return false;
        }
        match outcome.result {
            Ok(scene) => {
                mounted.engine.borrow_mut().run_render_loop(scene);
                self.status = MountStatus::Rendering;
                if mounted.show_inspector {
                    self.overlay = Some(OverlayTask {
                        generation: mounted.generation,
                        future: self.loaders.overlay.load(),
                    });
                }
                true
            }
            Err(e) if e.is_cancelled() => {
                log::debug!("{}", e);
                false
            }
            Err(e) => {
                log::error!("Scene construction failed: {}", e);
                self.status = MountStatus::Failed(e);
                false
            }
        }
    }

    /// The overlay load started by [`CanvasHost::scene_ready`], at most once.
    pub fn overlay_task(&mut self) -> Option<OverlayTask> {
        self.overlay.take()
    }

    /// Attach a loaded overlay to the running scene. Failures are logged and
    /// leave the scene rendering without it. `true` when it was attached.
    pub fn overlay_ready(&mut self, outcome: OverlayOutcome) -> bool {
        let Some(mounted) = &self.mounted else {
            log::debug!("overlay finished after unmount, dropping it");
            return false;
        };
        if outcome.generation != mounted.generation || !mounted.liveness.is_alive() {
            log::debug!("overlay of generation {} is stale, dropping it", outcome.generation);
            return false;
        }
        let overlay = match outcome.result {
            Ok(overlay) => overlay,
            Err(e) => {
                log::error!("Failed to load the inspector: {:#}", e);
                return false;
            }
        };
        match mounted.engine.borrow_mut().attach_overlay(overlay) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to show the inspector: {:#}", e);
                false
            }
        }
    }

    /// Resize the engine right away, without waiting for a resize notification.
    pub fn resize(&mut self) {
        if let Some(mounted) = &self.mounted {
            mounted.engine.borrow_mut().resize();
        }
    }

    pub fn frame(&mut self, dt: Duration) -> anyhow::Result<()> {
        match &self.mounted {
            Some(mounted) => mounted.engine.borrow_mut().frame(dt),
            None => Ok(()),
        }
    }

    pub fn tick(&mut self) {
        if let Some(mounted) = &self.mounted {
            mounted.engine.borrow_mut().tick();
        }
    }

    pub fn window_event(&mut self, event: &WindowEvent) -> bool {
        self.mounted
            .as_ref()
            .is_some_and(|mounted| mounted.engine.borrow_mut().window_event(event))
    }

    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        if let Some(mounted) = &self.mounted {
            mounted.engine.borrow_mut().mouse_motion(dx, dy);
        }
    }

    /// Cancel pending construction, stop listening for resizes and dispose the
    /// engine. Safe to call at any time, any number of times.
    pub fn unmount(&mut self) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        mounted.liveness.cancel();
        self.overlay = None;
        if !self.events.remove(mounted.listener) {
            log::warn!("resize listener {:?} was already gone", mounted.listener);
        }
        mounted.engine.borrow_mut().dispose();
        self.status = MountStatus::Unmounted;
        log::info!("unmounted (generation {})", mounted.generation);
    }

    pub fn status(&self) -> &MountStatus {
        &self.status
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn engine(&self) -> Option<Ref<'_, E>> {
        self.mounted.as_ref().map(|mounted| mounted.engine.borrow())
    }
}

impl<E: RenderEngine + 'static, R: ResizeEvents> Drop for CanvasHost<E, R> {
    fn drop(&mut self) {
        self.unmount();
    }
}

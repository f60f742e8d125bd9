//! Application event loop.
//!
//! [`App`] drives one [`CanvasHost`] from `winit`: it creates the window (or
//! binds the page canvas on the web), connects the GPU, mounts the host, runs
//! the scene construction and forwards frames, input and resizes.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and starts the asynchronous GPU setup
//! 2. `SurfaceReady` mounts the host on the new surface
//! 3. `SceneReady` hands the finished scene to the render loop; with the
//!    inspector flag the overlay loads next and `OverlayReady` attaches it
//! 4. every `RedrawRequested` steps and draws one frame; every
//!    `tick_duration_millis` the debug overlay is refreshed
//! 5. closing the window (or the page going away) unmounts the host

use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::{cell::RefCell, rc::Rc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

#[cfg(not(target_arch = "wasm32"))]
use crate::events::ResizeListeners;
#[cfg(target_arch = "wasm32")]
use crate::events::WindowResizeEvents;
use crate::{
    config::CanvasConfig,
    context::Context,
    engine::GpuEngine,
    host::{CanvasHost, OverlayOutcome, SceneOutcome, SceneTask},
    scene::builder::SceneLoaders,
};

#[cfg(not(target_arch = "wasm32"))]
type Events = Rc<RefCell<ResizeListeners>>;
#[cfg(target_arch = "wasm32")]
type Events = WindowResizeEvents;

pub enum CanvasEvent {
    /// The asynchronous GPU setup finished.
    SurfaceReady(anyhow::Result<Context>),
    /// Scene construction finished (or failed, or was cancelled).
    SceneReady(SceneOutcome),
    /// The debug overlay finished loading (or failed to).
    OverlayReady(OverlayOutcome),
}

impl std::fmt::Debug for CanvasEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SurfaceReady(Ok(_)) => f.write_str("SurfaceReady(Ok)"),
            Self::SurfaceReady(Err(e)) => write!(f, "SurfaceReady(Err({}))", e),
            Self::SceneReady(outcome) => write!(f, "SceneReady({})", outcome.generation),
            Self::OverlayReady(outcome) => write!(f, "OverlayReady({})", outcome.generation),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<CanvasEvent>,
    config: CanvasConfig,
    host: CanvasHost<GpuEngine, Events>,
    #[cfg(not(target_arch = "wasm32"))]
    resize_listeners: Events,
    started: bool,
    last_time: Instant,
    time_since_tick: Duration,
}

impl App {
    pub fn new(event_loop: &EventLoop<CanvasEvent>, config: CanvasConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        let loaders = SceneLoaders::for_canvas(&config.canvas_id);

        #[cfg(not(target_arch = "wasm32"))]
        let (resize_listeners, host) = {
            let listeners: Events = Rc::new(RefCell::new(ResizeListeners::new()));
            (listeners.clone(), CanvasHost::new(listeners, loaders))
        };
        #[cfg(target_arch = "wasm32")]
        let host = CanvasHost::new(WindowResizeEvents::new(), loaders);

        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy,
            config,
            host,
            #[cfg(not(target_arch = "wasm32"))]
            resize_listeners,
            started: false,
            last_time: Instant::now(),
            time_since_tick: Duration::from_millis(0),
        })
    }

    fn surface_ready(&mut self, surface: anyhow::Result<Context>) {
        let ctx = match surface {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("Cannot create the rendering surface: {:#}", e);
                return;
            }
        };
        match self.host.mount(Some(ctx), &self.config) {
            Ok(Some(task)) => {
                // Trigger a resize now that we are initialized
                self.host.resize();
                self.spawn_scene(task);
            }
            Ok(None) => (),
            Err(e) => log::error!("{}", e),
        }
    }

    fn spawn_scene(&mut self, task: SceneTask) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let outcome = self.async_runtime.block_on(task.run());
            self.host.scene_ready(outcome);
            self.spawn_overlay();
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let outcome = task.run().await;
                if proxy.send_event(CanvasEvent::SceneReady(outcome)).is_err() {
                    log::warn!("event loop closed before the scene was ready");
                }
            });
        }
    }

    /// Load the overlay the host asked for, if any. The render loop is already running.
    fn spawn_overlay(&mut self) {
        let Some(task) = self.host.overlay_task() else {
            return;
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let outcome = self.async_runtime.block_on(task.run());
            self.host.overlay_ready(outcome);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let outcome = task.run().await;
                if proxy.send_event(CanvasEvent::OverlayReady(outcome)).is_err() {
                    log::warn!("event loop closed before the overlay was ready");
                }
            });
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn find_canvas(&self) -> Option<web_sys::HtmlCanvasElement> {
        use wasm_bindgen::JsCast;

        web_sys::window()?
            .document()?
            .get_element_by_id(&self.config.canvas_id)?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .ok()
    }
}

impl ApplicationHandler<CanvasEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("scene-canvas");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            match self.find_canvas() {
                Some(canvas) => window_attributes = window_attributes.with_canvas(Some(canvas)),
                None => {
                    log::warn!("no canvas with id `{}`, skipping setup", self.config.canvas_id);
                    return;
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let options = self.config.engine.clone();
        let surface_future = async move { Context::new(window, &options).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let surface = self.async_runtime.block_on(surface_future);
            self.surface_ready(surface);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let surface = surface_future.await;
                if proxy.send_event(CanvasEvent::SurfaceReady(surface)).is_err() {
                    log::warn!("event loop closed before the surface was ready");
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: CanvasEvent) {
        log::debug!("{:?}", event);
        match event {
            // This is the message from our wasm `spawn_local`
            CanvasEvent::SurfaceReady(surface) => self.surface_ready(surface),
            CanvasEvent::SceneReady(outcome) => {
                if self.host.scene_ready(outcome) {
                    self.spawn_overlay();
                }
            }
            CanvasEvent::OverlayReady(outcome) => {
                self.host.overlay_ready(outcome);
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.host.mouse_motion(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.host.unmount();
                event_loop.exit();
            }
            #[cfg(not(target_arch = "wasm32"))]
            WindowEvent::Resized(_) => self.resize_listeners.borrow_mut().dispatch(),
            // the DOM `resize` event can fire before the canvas settles, so
            // resize again once winit has observed the new canvas size
            #[cfg(target_arch = "wasm32")]
            WindowEvent::Resized(_) => self.host.resize(),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                self.time_since_tick += dt;

                if let Err(e) = self.host.frame(dt) {
                    log::error!("Unable to render {:#}", e);
                    self.host.unmount();
                    event_loop.exit();
                    return;
                }
                if self.time_since_tick >= Duration::from_millis(self.config.tick_duration_millis) {
                    self.host.tick();
                    self.time_since_tick = Duration::from_millis(0);
                }
            }
            other => {
                self.host.window_event(&other);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.host.unmount();
    }
}

/// Open a window (or bind the page canvas) and run until it is closed.
pub fn run(config: CanvasConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    let event_loop: EventLoop<CanvasEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

//! The rendering engine a canvas host drives.
//!
//! [`RenderEngine`] is the seam between the host lifecycle and the GPU: the
//! host only creates, resizes, feeds and disposes an engine, so it can be
//! exercised without a GPU. [`GpuEngine`] is the `wgpu` implementation.

use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    camera::CameraResources,
    config::EngineOptions,
    context::Context,
    data_structures::texture::Texture,
    overlay::DebugOverlay,
    pipelines::{
        basic::mk_basic_pipeline,
        light::{LightResources, LightUniform},
    },
    render::{DrawInstanced, SceneRenderer},
    scene::Scene,
};

/// Multisample count used when antialiasing is on.
pub const MSAA_SAMPLES: u32 = 4;

pub trait RenderEngine: Sized {
    /// What the engine draws into.
    type Surface;

    fn create(surface: Self::Surface, options: &EngineOptions) -> anyhow::Result<Self>;

    /// Match the output to the surface's current pixel size.
    fn resize(&mut self);

    fn output_size(&self) -> (u32, u32);

    /// Take ownership of `scene` and draw it every frame from now on.
    fn run_render_loop(&mut self, scene: Scene);

    fn is_rendering(&self) -> bool;

    fn scene(&self) -> Option<&Scene>;

    fn scene_mut(&mut self) -> Option<&mut Scene>;

    /// Advance the scene by `dt` and draw it. Does nothing before
    /// [`RenderEngine::run_render_loop`] or after [`RenderEngine::dispose`].
    fn frame(&mut self, dt: Duration) -> anyhow::Result<()>;

    /// Periodic, low frequency housekeeping (debug overlay refresh).
    fn tick(&mut self) {
        if let Some(scene) = self.scene_mut() {
            scene.refresh_debug_layer();
        }
    }

    /// Show `overlay` over the scene that is already rendering.
    fn attach_overlay(&mut self, overlay: Box<dyn DebugOverlay>) -> anyhow::Result<()> {
        match self.scene_mut() {
            Some(scene) => scene.attach_debug_layer(overlay),
            None => anyhow::bail!("no scene is rendering"),
        }
    }

    /// Input for the attached camera control. `true` when consumed.
    fn window_event(&mut self, _event: &WindowEvent) -> bool {
        false
    }

    fn mouse_motion(&mut self, _dx: f64, _dy: f64) {}

    /// Stop rendering and release the scene. Calling it twice is harmless.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

pub struct GpuEngine {
    ctx: Context,
    options: EngineOptions,
    sample_count: u32,
    depth_format: wgpu::TextureFormat,
    depth_texture: Texture,
    msaa_texture: Option<Texture>,
    pipeline: wgpu::RenderPipeline,
    camera: CameraResources,
    light: LightResources,
    render_loop: Option<(Scene, SceneRenderer)>,
    disposed: bool,
}

impl GpuEngine {
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    fn recreate_attachments(&mut self) {
        let size = [self.ctx.config.width, self.ctx.config.height];
        self.depth_texture = Texture::create_depth_texture(
            &self.ctx.device,
            size,
            self.depth_format,
            self.sample_count,
            "depth_texture",
        );
        self.msaa_texture = self.options.antialias.then(|| {
            Texture::create_msaa_texture(&self.ctx.device, size, self.ctx.config.format, self.sample_count)
        });
    }

    fn render(&self) -> Result<(), wgpu::SurfaceError> {
        let Some((scene, renderer)) = &self.render_loop else {
            return Ok(());
        };
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (target, resolve_target) = match &self.msaa_texture {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: self.options.stencil.then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for instanced in renderer.instanced() {
                render_pass.draw_instanced(instanced, &self.camera.bind_group, &self.light.bind_group);
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl RenderEngine for GpuEngine {
    type Surface = Context;

    fn create(ctx: Context, options: &EngineOptions) -> anyhow::Result<Self> {
        if options.disable_webgl2_support {
            log::warn!("WebGL1 contexts are not supported, continuing with WebGL2");
        }
        let sample_count = if options.antialias { MSAA_SAMPLES } else { 1 };
        let depth_format = Texture::depth_format(options.stencil);
        let size = [ctx.config.width, ctx.config.height];

        let camera = CameraResources::new(&ctx.device, ctx.config.width, ctx.config.height);
        let light = LightResources::new(LightUniform::dark(), &ctx.device);
        let pipeline = mk_basic_pipeline(
            &ctx.device,
            ctx.config.format,
            depth_format,
            sample_count,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );
        let depth_texture =
            Texture::create_depth_texture(&ctx.device, size, depth_format, sample_count, "depth_texture");
        let msaa_texture = options
            .antialias
            .then(|| Texture::create_msaa_texture(&ctx.device, size, ctx.config.format, sample_count));

        log::info!(
            "engine created: {}x{}, {:?}, {} samples",
            size[0],
            size[1],
            ctx.config.format,
            sample_count
        );
        Ok(Self {
            ctx,
            options: options.clone(),
            sample_count,
            depth_format,
            depth_texture,
            msaa_texture,
            pipeline,
            camera,
            light,
            render_loop: None,
            disposed: false,
        })
    }

    fn resize(&mut self) {
        if self.disposed {
            return;
        }
        let (width, height) = self.ctx.current_size();
        if self.ctx.configure(width, height) {
            self.camera.projection.resize(width, height);
            self.recreate_attachments();
        }
    }

    fn output_size(&self) -> (u32, u32) {
        (self.ctx.config.width, self.ctx.config.height)
    }

    fn run_render_loop(&mut self, scene: Scene) {
        if self.disposed {
            log::warn!("render loop requested on a disposed engine");
            return;
        }
        let renderer = SceneRenderer::new(&self.ctx.device, &scene);
        self.render_loop = Some((scene, renderer));
        self.ctx.window.request_redraw();
    }

    fn is_rendering(&self) -> bool {
        self.render_loop.is_some()
    }

    fn scene(&self) -> Option<&Scene> {
        self.render_loop.as_ref().map(|(scene, _)| scene)
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.render_loop.as_mut().map(|(scene, _)| scene)
    }

    fn frame(&mut self, dt: Duration) -> anyhow::Result<()> {
        if self.disposed {
            return Ok(());
        }
        // invoke main render loop
        self.ctx.window.request_redraw();
        let Some((scene, renderer)) = self.render_loop.as_mut() else {
            return Ok(());
        };

        scene.step(dt);
        if let Some(camera) = scene.active_camera() {
            self.camera.write(&self.ctx.queue, camera);
        }
        let light = scene
            .lights()
            .first()
            .map(LightUniform::from)
            .unwrap_or_else(LightUniform::dark);
        self.light.write(&self.ctx.queue, light);
        renderer.write_to_buffers(&self.ctx.queue, scene);

        match self.render() {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.resize(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("the GPU ran out of memory while rendering")
            }
            Err(e) => log::error!("Unable to render {}", e),
        }
        Ok(())
    }

    fn window_event(&mut self, event: &WindowEvent) -> bool {
        self.render_loop
            .as_mut()
            .and_then(|(scene, _)| scene.active_camera_mut())
            .is_some_and(|camera| camera.handle_window_event(event))
    }

    fn mouse_motion(&mut self, dx: f64, dy: f64) {
        if let Some(camera) = self
            .render_loop
            .as_mut()
            .and_then(|(scene, _)| scene.active_camera_mut())
        {
            camera.handle_mouse(dx, dy);
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.render_loop = None;
        self.disposed = true;
        log::info!("engine disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

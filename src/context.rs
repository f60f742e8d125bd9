use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::config::EngineOptions;

/// Connection to the GPU for one window (or canvas): the surface, the device
/// and queue, and the surface configuration.
///
/// This is the drawable surface the canvas host is mounted on. Creating it
/// is asynchronous because adapter and device requests are.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

impl Context {
    pub async fn new(window: Arc<Window>, options: &EngineOptions) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this surface")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("could not open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader assumes an Srgb surface texture, other formats come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if options.preserve_drawing_buffer {
            // keeps the presented frame readable (screenshots, readback)
            usage |= wgpu::TextureUsages::COPY_SRC & surface_caps.usages;
        }
        let config = wgpu::SurfaceConfiguration {
            usage,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
        })
    }

    /// Pixel size of the window right now, which may differ from the configured size.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn current_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Pixel size of the canvas right now. Read from the DOM: winit only
    /// updates its cached size after the browser's `resize` event has fired.
    #[cfg(target_arch = "wasm32")]
    pub fn current_size(&self) -> (u32, u32) {
        use winit::platform::web::WindowExtWebSys;

        self.window
            .canvas()
            .zip(web_sys::window())
            .map(|(canvas, window)| {
                physical_size(
                    canvas.client_width(),
                    canvas.client_height(),
                    window.device_pixel_ratio(),
                )
            })
            .unwrap_or_else(|| {
                let size = self.window.inner_size();
                (size.width, size.height)
            })
    }

    /// Reconfigure the surface; zero sized surfaces (minimised windows) are skipped.
    pub fn configure(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        true
    }
}

/// CSS pixels to device pixels, rounded. Negative sizes count as zero.
pub fn physical_size(css_width: i32, css_height: i32, scale_factor: f64) -> (u32, u32) {
    let scale = |css: i32| (f64::from(css.max(0)) * scale_factor).round() as u32;
    (scale(css_width), scale(css_height))
}

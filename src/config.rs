//! Mount-time configuration.
//!
//! Everything here is read once when the canvas is mounted. Changing a value
//! later has no effect on a running mount; the host has to be remounted.

/// The element id the web build looks up to find its drawable surface.
pub const DEFAULT_CANVAS_ID: &str = "renderCanvas";

/// Environment variable that turns the debug overlay on for native builds.
pub const INSPECTOR_ENV: &str = "SCENE_CANVAS_INSPECTOR";

/// Options the rendering engine is created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Multisample the colour output (4x).
    pub antialias: bool,
    /// Keep the presented frame readable after presentation (adds `COPY_SRC` to the surface).
    pub preserve_drawing_buffer: bool,
    /// Allocate a stencil aspect next to the depth buffer.
    pub stencil: bool,
    /// Ask for a pre-WebGL2 context. The web backend only speaks WebGL2, so `true` is
    /// reported and ignored.
    pub disable_webgl2_support: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            preserve_drawing_buffer: true,
            stencil: true,
            disable_webgl2_support: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasConfig {
    /// Load and show the debug overlay once the scene is built.
    pub show_inspector: bool,
    pub canvas_id: String,
    pub engine: EngineOptions,
    /// How often the debug overlay is refreshed while the render loop runs.
    pub tick_duration_millis: u64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            show_inspector: false,
            canvas_id: DEFAULT_CANVAS_ID.to_string(),
            engine: EngineOptions::default(),
            tick_duration_millis: 500,
        }
    }
}

impl CanvasConfig {
    pub fn with_inspector(mut self, show_inspector: bool) -> Self {
        self.show_inspector = show_inspector;
        self
    }

    /// Native configuration: defaults plus `SCENE_CANVAS_INSPECTOR`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let show_inspector = std::env::var(INSPECTOR_ENV)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        Self::default().with_inspector(show_inspector)
    }

    /// Web configuration: defaults plus an `inspector` query parameter on the page URL.
    #[cfg(target_arch = "wasm32")]
    pub fn from_location() -> Self {
        let search = web_sys::window()
            .and_then(|window| window.location().search().ok())
            .unwrap_or_default();
        Self::default().with_inspector(query_has_flag(&search, "inspector"))
    }
}

/// Accepts `1`, `true`, `yes` and `on` in any case.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `?inspector`, `?inspector=1` and `?a=b&inspector=true` all count; `?inspector=0` does not.
pub fn query_has_flag(search: &str, name: &str) -> bool {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            (key == name).then(|| parts.next().map_or(true, parse_flag))
        })
        .next()
        .unwrap_or(false)
}

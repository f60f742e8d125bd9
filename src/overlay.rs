//! Debug overlay ("inspector") that lists the scene contents next to the canvas.
//!
//! It is loaded lazily, only when the mount asks for it, and a failing load
//! never takes the scene down with it.

use crate::physics::LoadFuture;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayOptions {
    /// Dock the overlay beside the canvas instead of floating over it.
    pub embed_mode: bool,
}

pub trait DebugOverlay {
    fn show(&mut self, options: &OverlayOptions, lines: &[String]) -> anyhow::Result<()>;

    fn refresh(&mut self, lines: &[String]);
}

pub trait OverlayLoader {
    fn load(&self) -> LoadFuture<Box<dyn DebugOverlay>>;
}

/// Loads a [`SceneInspector`] for the canvas with the given element id.
#[derive(Clone, Debug)]
pub struct InspectorLoader {
    pub canvas_id: String,
}

impl InspectorLoader {
    pub fn new(canvas_id: impl Into<String>) -> Self {
        Self {
            canvas_id: canvas_id.into(),
        }
    }
}

impl OverlayLoader for InspectorLoader {
    fn load(&self) -> LoadFuture<Box<dyn DebugOverlay>> {
        let canvas_id = self.canvas_id.clone();
        Box::pin(async move {
            let inspector: Box<dyn DebugOverlay> = Box::new(SceneInspector::new(canvas_id));
            Ok(inspector)
        })
    }
}

/// On the web a `<pre>` panel inserted after the canvas; natively the scene
/// description goes to the log.
pub struct SceneInspector {
    canvas_id: String,
    last: Vec<String>,
    #[cfg(target_arch = "wasm32")]
    panel: Option<web_sys::Element>,
}

impl SceneInspector {
    pub fn new(canvas_id: String) -> Self {
        Self {
            canvas_id,
            last: Vec::new(),
            #[cfg(target_arch = "wasm32")]
            panel: None,
        }
    }

    /// What the inspector currently shows.
    pub fn lines(&self) -> &[String] {
        &self.last
    }

    #[cfg(target_arch = "wasm32")]
    fn mount_panel(&mut self, options: &OverlayOptions) -> anyhow::Result<()> {
        use anyhow::{Context as _, anyhow};

        let document = web_sys::window()
            .and_then(|window| window.document())
            .context("no document to attach the inspector to")?;
        let canvas = document
            .get_element_by_id(&self.canvas_id)
            .with_context(|| format!("no element with id `{}`", self.canvas_id))?;
        let panel = document
            .create_element("pre")
            .map_err(|e| anyhow!("could not create inspector panel: {:?}", e))?;
        panel.set_id(&format!("{}-inspector", self.canvas_id));
        let style = if options.embed_mode {
            "position:absolute;top:0;right:0;margin:0;padding:8px;max-height:100%;overflow:auto;\
             background:rgba(0,0,0,0.7);color:#9f9;font:12px monospace;"
        } else {
            "position:fixed;bottom:8px;left:8px;margin:0;padding:8px;\
             background:rgba(0,0,0,0.7);color:#9f9;font:12px monospace;"
        };
        panel
            .set_attribute("style", style)
            .map_err(|e| anyhow!("could not style inspector panel: {:?}", e))?;
        let parent = canvas
            .parent_node()
            .context("canvas is not attached to the document")?;
        parent
            .append_child(&panel)
            .map_err(|e| anyhow!("could not attach inspector panel: {:?}", e))?;
        self.panel = Some(panel);
        Ok(())
    }
}

impl DebugOverlay for SceneInspector {
    fn show(&mut self, options: &OverlayOptions, lines: &[String]) -> anyhow::Result<()> {
        #[cfg(target_arch = "wasm32")]
        {
            self.mount_panel(options)?;
            self.refresh(lines);
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            log::info!(
                "inspector for `{}` ({}):",
                self.canvas_id,
                if options.embed_mode { "embedded" } else { "floating" }
            );
            for line in lines {
                log::info!("  {}", line);
            }
            self.last = lines.to_vec();
        }
        Ok(())
    }

    fn refresh(&mut self, lines: &[String]) {
        if self.last == lines {
            return;
        }
        self.last = lines.to_vec();
        #[cfg(target_arch = "wasm32")]
        if let Some(panel) = &self.panel {
            panel.set_text_content(Some(&self.last.join("\n")));
        }
        #[cfg(not(target_arch = "wasm32"))]
        for line in &self.last {
            log::debug!("inspector: {}", line);
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl Drop for SceneInspector {
    fn drop(&mut self) {
        if let Some(panel) = self.panel.take() {
            panel.remove();
        }
    }
}

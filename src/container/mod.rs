//! Auto-height container
//!
//! Binds a `HeightReconciler` to an embedded surface: messages from the
//! document are fed to the reconciler, committed heights become surface
//! bounds, and the caller hears about every committed height.

pub mod origin;
pub mod surface;
pub mod webview;

use std::fmt;
use std::sync::Arc;

use crate::agent::{AgentPolicy, bootstrap_script, refresh_request_script};
use crate::config::AutoHeightConfig;
use crate::host::{DeferredFrames, HeightCallback, HeightReconciler, ReconcilerConfig};
use crate::scripts::compose_scripts;

pub use origin::OriginWhitelist;
pub use surface::{Bounds, EmbeddedSurface, SurfaceEvent, SurfaceEvents, event_queue};
pub use webview::{create_autoheight_webview, destroy_shared_context};

pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Html(String),
}

impl Default for Source {
    fn default() -> Self {
        Source::Html(String::new())
    }
}

/// Horizontal placement of the container; its height is owned by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStyle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub transparent: bool,
}

impl Default for ContainerStyle {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 320,
            transparent: true,
        }
    }
}

/// Options passed through to the embedded engine.
#[derive(Clone)]
pub struct ViewOptions {
    pub source: Source,
    pub injected_before_load: Option<String>,
    pub injected_after_load: Option<String>,
    pub origin_whitelist: Vec<String>,
    pub scroll_enabled: bool,
    pub shows_vertical_scroll_indicator: bool,
    pub automatically_adjust_content_insets: bool,
    /// Sees every message from the document, height reports included.
    pub on_message: Option<MessageHandler>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            source: Source::default(),
            injected_before_load: None,
            injected_after_load: None,
            origin_whitelist: vec!["*".to_string()],
            scroll_enabled: false,
            shows_vertical_scroll_indicator: false,
            automatically_adjust_content_insets: true,
            on_message: None,
        }
    }
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOptions")
            .field("source", &self.source)
            .field("injected_before_load", &self.injected_before_load.is_some())
            .field("injected_after_load", &self.injected_after_load.is_some())
            .field("origin_whitelist", &self.origin_whitelist)
            .field("scroll_enabled", &self.scroll_enabled)
            .field(
                "shows_vertical_scroll_indicator",
                &self.shows_vertical_scroll_indicator,
            )
            .field(
                "automatically_adjust_content_insets",
                &self.automatically_adjust_content_insets,
            )
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct ContainerConfig {
    pub min_height: f64,
    pub container_style: ContainerStyle,
    pub on_height_change: Option<HeightCallback>,
    pub agent: AgentPolicy,
    pub view: ViewOptions,
}

impl ContainerConfig {
    /// Container config seeded from the persisted settings.
    pub fn from_settings(settings: &AutoHeightConfig) -> Self {
        Self {
            min_height: settings.min_height,
            agent: settings.agent.clone(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ContainerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("min_height", &self.min_height)
            .field("container_style", &self.container_style)
            .field("on_height_change", &self.on_height_change.is_some())
            .field("agent", &self.agent)
            .field("view", &self.view)
            .finish()
    }
}

/// Scripts handed to the engine: one before content load, one after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPlan {
    pub before_load: Option<String>,
    pub after_load: Option<String>,
}

pub fn injection_plan(config: &ContainerConfig) -> InjectionPlan {
    let bootstrap = bootstrap_script(&config.agent);
    let surface_style = surface_style_script(&config.view);
    InjectionPlan {
        before_load: compose_scripts([
            Some(bootstrap.as_str()),
            surface_style.as_deref(),
            config.view.injected_before_load.as_deref(),
        ]),
        after_load: compose_scripts([config.view.injected_after_load.as_deref()]),
    }
}

/// Stylesheet enforcing the surface defaults (no scrolling, hidden scroll
/// indicator, safe-area insets).
pub fn surface_style_script(view: &ViewOptions) -> Option<String> {
    let mut rules = Vec::new();
    if !view.scroll_enabled {
        rules.push("html, body { overflow: hidden !important; overscroll-behavior: none; }");
    }
    if !view.shows_vertical_scroll_indicator {
        rules.push("html { scrollbar-width: none; }");
        rules.push("::-webkit-scrollbar { width: 0; height: 0; display: none; }");
    }
    if view.automatically_adjust_content_insets {
        rules.push(
            "body { padding-left: env(safe-area-inset-left); padding-right: env(safe-area-inset-right); }",
        );
    }
    if rules.is_empty() {
        return None;
    }

    let css = serde_json::to_string(&rules.join("\n")).ok()?;
    Some(format!(
        r#"(function () {{
    var css = {};
    function apply() {{
        var parent = document.head || document.documentElement;
        if (!parent) return false;
        var style = document.createElement('style');
        style.setAttribute('data-autoheight', 'surface');
        style.textContent = css;
        parent.appendChild(style);
        return true;
    }}
    if (!apply()) document.addEventListener('DOMContentLoaded', apply);
}})();"#,
        css
    ))
}

pub struct AutoHeightView<S: EmbeddedSurface> {
    surface: S,
    events: SurfaceEvents,
    frames: Arc<DeferredFrames>,
    reconciler: HeightReconciler,
    style: ContainerStyle,
    applied_height: Option<u32>,
    after_load: Option<String>,
    on_message: Option<MessageHandler>,
    disposed: bool,
}

impl<S: EmbeddedSurface> AutoHeightView<S> {
    /// Wrap a surface that was created with `injection_plan(&config).before_load`
    /// and reports into `events`.
    pub fn new(surface: S, events: SurfaceEvents, config: ContainerConfig) -> Self {
        let frames = DeferredFrames::new();
        let reconciler = HeightReconciler::new(
            ReconcilerConfig {
                min_height: config.min_height,
                on_height_change: config.on_height_change.clone(),
            },
            frames.clone(),
        );
        let after_load = injection_plan(&config).after_load;

        let mut view = Self {
            surface,
            events,
            frames,
            reconciler,
            style: config.container_style,
            applied_height: None,
            after_load,
            on_message: config.view.on_message,
            disposed: false,
        };
        view.sync_bounds();
        view
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn reconciler(&self) -> &HeightReconciler {
        &self.reconciler
    }

    pub fn height(&self) -> u32 {
        self.reconciler.height()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.style.x,
            y: self.style.y,
            width: self.style.width,
            height: self.reconciler.height(),
        }
    }

    /// Drain engine events, run the frame's commits and apply the result.
    /// Call once per host frame.
    pub fn process_events(&mut self) -> usize {
        if self.disposed {
            return 0;
        }

        let mut handled = 0;
        while let Some(event) = self.events.pop() {
            handled += 1;
            match event {
                SurfaceEvent::Message(body) => {
                    if let Some(handler) = &self.on_message {
                        handler(&body);
                    }
                    self.reconciler.ingest(body.as_str());
                }
                SurfaceEvent::PageLoaded(url) => {
                    crate::log_info!("[AutoHeight] Page loaded: {}", url);
                    if let Some(script) = &self.after_load {
                        if let Err(e) = self.surface.evaluate_script(script) {
                            crate::log_info!("[AutoHeight] Post-load script failed: {:?}", e);
                        }
                    }
                }
            }
        }

        self.frames.run_pending();
        self.sync_bounds();
        handled
    }

    pub fn set_min_height(&mut self, min_height: f64) {
        self.reconciler.set_min_height(min_height);
    }

    pub fn set_width(&mut self, width: u32) {
        if self.style.width != width {
            self.style.width = width;
            self.applied_height = None;
            self.sync_bounds();
        }
    }

    /// Ask the document for a fresh height without re-injecting the bootstrap.
    pub fn request_remeasure(&self) -> anyhow::Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.surface.evaluate_script(&refresh_request_script())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.reconciler.dispose();
        while self.events.pop().is_some() {}
        crate::log_info!("[AutoHeight] Container disposed at height {}", self.reconciler.height());
    }

    fn sync_bounds(&mut self) {
        let height = self.reconciler.height();
        if self.applied_height == Some(height) {
            return;
        }
        match self.surface.set_bounds(self.bounds()) {
            Ok(()) => self.applied_height = Some(height),
            Err(e) => crate::log_info!("[AutoHeight] set_bounds failed: {:?}", e),
        }
    }
}

impl<S: EmbeddedSurface> Drop for AutoHeightView<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

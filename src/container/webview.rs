//! wry binding for the auto-height container.

use std::cell::RefCell;
use std::path::PathBuf;

use raw_window_handle::HasWindowHandle;
use wry::{PageLoadEvent, Rect, WebViewBuilder};

use super::origin::OriginWhitelist;
use super::surface::{Bounds, EmbeddedSurface, SurfaceEvent, event_queue};
use super::{AutoHeightView, ContainerConfig, Source, injection_plan};

thread_local! {
    /// Shared WebContext for all auto-height views on this thread
    static SHARED_WEB_CONTEXT: RefCell<Option<wry::WebContext>> = const { RefCell::new(None) };
}

fn shared_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webview-autoheight")
        .join("webview")
}

fn to_rect(bounds: Bounds) -> Rect {
    Rect {
        position: wry::dpi::Position::Physical(wry::dpi::PhysicalPosition::new(
            bounds.x, bounds.y,
        )),
        size: wry::dpi::Size::Physical(wry::dpi::PhysicalSize::new(
            bounds.width,
            bounds.height,
        )),
    }
}

impl EmbeddedSurface for wry::WebView {
    fn evaluate_script(&self, script: &str) -> anyhow::Result<()> {
        wry::WebView::evaluate_script(self, script)
            .map_err(|e| anyhow::anyhow!("evaluate_script: {e}"))
    }

    fn set_bounds(&self, bounds: Bounds) -> anyhow::Result<()> {
        wry::WebView::set_bounds(self, to_rect(bounds))
            .map_err(|e| anyhow::anyhow!("set_bounds: {e}"))
    }
}

/// Create an auto-height webview as a child of `parent`.
/// Must be called from the thread that owns `parent`.
pub fn create_autoheight_webview<W: HasWindowHandle>(
    parent: &W,
    config: ContainerConfig,
) -> anyhow::Result<AutoHeightView<wry::WebView>> {
    let plan = injection_plan(&config);
    let events = event_queue();
    let whitelist = OriginWhitelist::new(&config.view.origin_whitelist);
    let initial = Bounds {
        x: config.container_style.x,
        y: config.container_style.y,
        width: config.container_style.width,
        height: crate::host::payload::ceil_px(config.min_height).max(1),
    };

    let ipc_events = events.clone();
    let load_events = events.clone();

    let result = SHARED_WEB_CONTEXT.with(|ctx| {
        let mut ctx_ref = ctx.borrow_mut();
        let context = ctx_ref.get_or_insert_with(|| wry::WebContext::new(Some(shared_data_dir())));

        let mut builder = WebViewBuilder::new_with_web_context(context)
            .with_bounds(to_rect(initial))
            .with_transparent(config.container_style.transparent)
            .with_ipc_handler(move |msg: wry::http::Request<String>| {
                ipc_events.push(SurfaceEvent::Message(msg.into_body()));
            })
            .with_on_page_load_handler(move |event, url| {
                if let PageLoadEvent::Finished = event {
                    load_events.push(SurfaceEvent::PageLoaded(url));
                }
            })
            .with_navigation_handler(move |url: String| {
                let allowed = whitelist.allows(&url);
                if !allowed {
                    crate::log_info!("[AutoHeight] Blocked navigation to {}", url);
                }
                allowed
            });

        if let Some(script) = &plan.before_load {
            builder = builder.with_initialization_script(script.as_str());
        }

        builder = match &config.view.source {
            Source::Url(url) => builder.with_url(url.as_str()),
            Source::Html(html) => builder.with_html(html.as_str()),
        };

        builder.build_as_child(parent)
    });

    let webview = match result {
        Ok(webview) => webview,
        Err(e) => {
            crate::log_info!("[AutoHeight] WebView FAILED: {:?}", e);
            anyhow::bail!("building auto-height webview: {e}");
        }
    };
    crate::log_info!("[AutoHeight] WebView created, initial bounds {:?}", initial);
    Ok(AutoHeightView::new(webview, events, config))
}

/// Drop the shared WebContext on this thread once no views remain.
pub fn destroy_shared_context() {
    SHARED_WEB_CONTEXT.with(|ctx| {
        ctx.borrow_mut().take();
    });
}

//! Capabilities the measurement session needs from the hosting document.
//!
//! Every registration returns `Option`: `None` means the document lacks the
//! capability, and the session carries on with the remaining triggers.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaId(pub u64);

/// Box metrics of a single element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementMetrics {
    pub rect_height: f64,
    pub scroll_height: f64,
    pub offset_height: f64,
    pub client_height: f64,
}

impl ElementMetrics {
    /// Same value for every metric.
    pub fn uniform(height: f64) -> Self {
        Self {
            rect_height: height,
            scroll_height: height,
            offset_height: height,
            client_height: height,
        }
    }

    fn tallest(&self) -> f64 {
        [
            self.rect_height,
            self.scroll_height,
            self.offset_height,
            self.client_height,
        ]
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
    }
}

/// One geometry read of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geometry {
    pub root: ElementMetrics,
    /// Nearest scrolling container, when it is not the root itself.
    pub scroller: Option<ElementMetrics>,
    pub body: Option<ElementMetrics>,
    pub viewport_height: f64,
}

impl Geometry {
    /// Height candidate: the largest metric across root, scroller and body,
    /// floored at the viewport height.
    pub fn candidate_height(&self) -> f64 {
        let floor = if self.viewport_height.is_finite() {
            self.viewport_height.max(0.0)
        } else {
            0.0
        };
        [Some(self.root), self.scroller, self.body]
            .into_iter()
            .flatten()
            .map(|metrics| metrics.tallest())
            .fold(floor, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    VisualViewportResize,
    VisualViewportScroll,
    OrientationChange,
    WindowResize,
    PageShow,
    ReadyStateChange,
}

impl ViewportEvent {
    pub const ALL: [ViewportEvent; 6] = [
        ViewportEvent::VisualViewportResize,
        ViewportEvent::VisualViewportScroll,
        ViewportEvent::OrientationChange,
        ViewportEvent::WindowResize,
        ViewportEvent::PageShow,
        ViewportEvent::ReadyStateChange,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Iframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaElement {
    pub id: MediaId,
    pub kind: MediaKind,
    /// Image `complete`, video `readyState >= HAVE_CURRENT_DATA`, iframe loaded.
    pub settled: bool,
}

/// A registration whose reverse operation must run on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registration {
    Listener(ListenerId),
    Timer(TimerId),
    Frame(FrameId),
}

pub trait AgentEnv {
    /// Baseline root/body styling, leaving author-set values alone.
    fn normalize_styles(&mut self);
    fn geometry(&self) -> Geometry;
    /// Send a payload over the outbound channel.
    fn post_message(&mut self, payload: &str) -> anyhow::Result<()>;

    fn request_frame(&mut self) -> Option<FrameId>;
    fn cancel_frame(&mut self, id: FrameId);
    fn set_timer(&mut self, delay_ms: u32) -> Option<TimerId>;
    fn clear_timer(&mut self, id: TimerId);

    /// Subtree observer over attributes, child list and character data.
    fn observe_mutations(&mut self) -> Option<ListenerId>;
    /// Size observer over root, body and scroll container.
    fn observe_resize(&mut self) -> Option<ListenerId>;
    fn listen_viewport(&mut self, event: ViewportEvent) -> Option<ListenerId>;
    /// Inbound `message` events (window and document).
    fn listen_control(&mut self) -> Option<ListenerId>;
    /// `pagehide`/`unload`.
    fn listen_unload(&mut self) -> Option<ListenerId>;

    fn media_elements(&self) -> Vec<MediaElement>;
    /// Settle events (load, error, loadeddata, loadedmetadata, ended) for one element.
    fn watch_media(&mut self, id: MediaId) -> Option<ListenerId>;
    fn remove_listener(&mut self, id: ListenerId);

    /// Run the reverse operation of a registration.
    fn release(&mut self, registration: Registration) {
        match registration {
            Registration::Listener(id) => self.remove_listener(id),
            Registration::Timer(id) => self.clear_timer(id),
            Registration::Frame(id) => self.cancel_frame(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_takes_the_largest_metric() {
        let geometry = Geometry {
            root: ElementMetrics {
                rect_height: 300.5,
                scroll_height: 280.0,
                offset_height: 290.0,
                client_height: 100.0,
            },
            scroller: Some(ElementMetrics::uniform(150.0)),
            body: Some(ElementMetrics {
                scroll_height: 412.0,
                ..ElementMetrics::default()
            }),
            viewport_height: 200.0,
        };
        assert_eq!(geometry.candidate_height(), 412.0);
    }

    #[test]
    fn viewport_height_is_the_floor() {
        let geometry = Geometry {
            root: ElementMetrics::uniform(10.0),
            viewport_height: 64.0,
            ..Geometry::default()
        };
        assert_eq!(geometry.candidate_height(), 64.0);
    }

    #[test]
    fn non_finite_metrics_are_ignored() {
        let geometry = Geometry {
            root: ElementMetrics {
                rect_height: f64::NAN,
                scroll_height: f64::INFINITY,
                offset_height: 90.0,
                client_height: 0.0,
            },
            viewport_height: f64::NAN,
            ..Geometry::default()
        };
        assert_eq!(geometry.candidate_height(), 90.0);
    }
}

//! Simulated document for driving `DocumentAgent` in tests.

#![allow(dead_code)]

use std::collections::HashMap;

use webview_autoheight::agent::{
    AgentEnv, DocumentAgent, ElementMetrics, FrameId, Geometry, ListenerId, MediaElement, MediaId,
    MediaKind, TimerId, ViewportEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Mutations,
    Resize,
    Viewport(ViewportEvent),
    Control,
    Unload,
    Media(MediaId),
}

#[derive(Debug)]
pub struct Capabilities {
    pub mutation_observer: bool,
    pub resize_observer: bool,
    pub frames: bool,
    pub timers: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            mutation_observer: true,
            resize_observer: true,
            frames: true,
            timers: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeDocument {
    pub geometry: Geometry,
    pub capabilities: Capabilities,
    pub channel_broken: bool,
    pub posted: Vec<String>,
    pub style_normalizations: usize,
    pub media: Vec<MediaElement>,
    pub now_ms: u64,
    pub timers: HashMap<TimerId, (u64, u32)>,
    pub frames: Vec<FrameId>,
    pub listeners: HashMap<ListenerId, ListenerKind>,
    pub installed: Vec<ListenerKind>,
    next_id: u64,
}

impl FakeDocument {
    pub fn with_height(height: f64) -> Self {
        let mut doc = Self::default();
        doc.set_height(height);
        doc
    }

    pub fn set_height(&mut self, height: f64) {
        self.geometry = Geometry {
            root: ElementMetrics::uniform(height),
            scroller: None,
            body: Some(ElementMetrics::uniform(height)),
            viewport_height: 0.0,
        };
    }

    pub fn add_media(&mut self, id: u64, kind: MediaKind, settled: bool) -> MediaId {
        let id = MediaId(id);
        self.media.push(MediaElement { id, kind, settled });
        id
    }

    pub fn live_listeners(&self, kind: ListenerKind) -> usize {
        self.listeners.values().filter(|k| **k == kind).count()
    }

    pub fn installed_count(&self, kind: ListenerKind) -> usize {
        self.installed.iter().filter(|k| **k == kind).count()
    }

    pub fn timer_delays(&self) -> Vec<u32> {
        self.timers.values().map(|(_, delay)| *delay).collect()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_listener(&mut self, kind: ListenerKind) -> Option<ListenerId> {
        let id = ListenerId(self.next());
        self.listeners.insert(id, kind);
        self.installed.push(kind);
        Some(id)
    }
}

impl AgentEnv for FakeDocument {
    fn normalize_styles(&mut self) {
        self.style_normalizations += 1;
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn post_message(&mut self, payload: &str) -> anyhow::Result<()> {
        if self.channel_broken {
            anyhow::bail!("ipc channel unavailable");
        }
        self.posted.push(payload.to_string());
        Ok(())
    }

    fn request_frame(&mut self) -> Option<FrameId> {
        if !self.capabilities.frames {
            return None;
        }
        let id = FrameId(self.next());
        self.frames.push(id);
        Some(id)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.frames.retain(|f| *f != id);
    }

    fn set_timer(&mut self, delay_ms: u32) -> Option<TimerId> {
        if !self.capabilities.timers {
            return None;
        }
        let id = TimerId(self.next());
        self.timers.insert(id, (self.now_ms + delay_ms as u64, delay_ms));
        Some(id)
    }

    fn clear_timer(&mut self, id: TimerId) {
        self.timers.remove(&id);
    }

    fn observe_mutations(&mut self) -> Option<ListenerId> {
        if !self.capabilities.mutation_observer {
            return None;
        }
        self.add_listener(ListenerKind::Mutations)
    }

    fn observe_resize(&mut self) -> Option<ListenerId> {
        if !self.capabilities.resize_observer {
            return None;
        }
        self.add_listener(ListenerKind::Resize)
    }

    fn listen_viewport(&mut self, event: ViewportEvent) -> Option<ListenerId> {
        self.add_listener(ListenerKind::Viewport(event))
    }

    fn listen_control(&mut self) -> Option<ListenerId> {
        self.add_listener(ListenerKind::Control)
    }

    fn listen_unload(&mut self) -> Option<ListenerId> {
        self.add_listener(ListenerKind::Unload)
    }

    fn media_elements(&self) -> Vec<MediaElement> {
        self.media.clone()
    }

    fn watch_media(&mut self, id: MediaId) -> Option<ListenerId> {
        self.add_listener(ListenerKind::Media(id))
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}

pub type Agent = DocumentAgent<FakeDocument>;

/// Run every frame callback currently requested.
pub fn run_frames(agent: &mut Agent) {
    let frames = std::mem::take(&mut agent.env_mut().frames);
    for frame in frames {
        agent.on_frame(frame);
    }
}

/// Move the clock forward, firing due timers in order.
pub fn advance(agent: &mut Agent, ms: u64) {
    let target = agent.env().now_ms + ms;
    loop {
        let due = agent
            .env()
            .timers
            .iter()
            .filter(|(_, (at, _))| *at <= target)
            .min_by_key(|(id, (at, _))| (*at, id.0))
            .map(|(id, (at, _))| (*id, *at));
        let Some((id, at)) = due else {
            break;
        };
        let env = agent.env_mut();
        env.now_ms = at;
        env.timers.remove(&id);
        agent.on_timer(id);
    }
    agent.env_mut().now_ms = target;
}

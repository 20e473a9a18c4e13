//! The engine-facing side of the container.

use std::sync::Arc;

use crossbeam_queue::SegQueue;

/// Placement of the surface inside its parent, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// What the container needs from the embedded renderer.
pub trait EmbeddedSurface {
    fn evaluate_script(&self, script: &str) -> anyhow::Result<()>;
    fn set_bounds(&self, bounds: Bounds) -> anyhow::Result<()>;
}

/// Engine callbacks, handed to the host thread through the event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Body of an outbound message from the document.
    Message(String),
    /// A page finished loading.
    PageLoaded(String),
}

pub type SurfaceEvents = Arc<SegQueue<SurfaceEvent>>;

pub fn event_queue() -> SurfaceEvents {
    Arc::new(SegQueue::new())
}

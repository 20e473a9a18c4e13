//! Per-frame scheduling primitives available to the host.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

pub type FrameCallback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

pub trait FrameScheduler: Send + Sync {
    /// Queue `callback` for the next rendering opportunity.
    ///
    /// Returns `None` when the host has no such primitive; the callback is
    /// dropped and the caller does the work synchronously.
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameRequest>;
    fn cancel_frame(&self, request: FrameRequest);
}

/// Host without a frame primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl FrameScheduler for Immediate {
    fn request_frame(&self, _callback: FrameCallback) -> Option<FrameRequest> {
        None
    }

    fn cancel_frame(&self, _request: FrameRequest) {}
}

/// Frame queue drained by the host loop once per frame.
#[derive(Default)]
pub struct DeferredFrames {
    next_id: AtomicU64,
    queue: Mutex<Vec<(FrameRequest, FrameCallback)>>,
}

impl DeferredFrames {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run every callback queued before this call. Callbacks queued while
    /// running wait for the next frame.
    pub fn run_pending(&self) -> usize {
        let due = std::mem::take(&mut *self.queue.lock());
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }
}

impl FrameScheduler for DeferredFrames {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameRequest> {
        let request = FrameRequest(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.queue.lock().push((request, callback));
        Some(request)
    }

    fn cancel_frame(&self, request: FrameRequest) {
        self.queue.lock().retain(|(queued, _)| *queued != request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn deferred_frames_run_once_per_drain() {
        let frames = DeferredFrames::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            frames.request_frame(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(frames.pending(), 3);
        assert_eq!(frames.run_pending(), 3);
        assert_eq!(frames.run_pending(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancelled_frame_never_runs() {
        let frames = DeferredFrames::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let request = frames
            .request_frame(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        frames.cancel_frame(request);
        frames.run_pending();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callbacks_queued_while_draining_wait_for_next_frame() {
        let frames = DeferredFrames::new();
        let inner = frames.clone();
        frames.request_frame(Box::new(move || {
            inner.request_frame(Box::new(|| {}));
        }));
        assert_eq!(frames.run_pending(), 1);
        assert_eq!(frames.pending(), 1);
    }
}

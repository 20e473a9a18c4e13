//! Turns a noisy stream of height reports into one committed height.
//!
//! At most one height is pending and at most one commit is scheduled at any
//! time; samples arriving before the commit runs overwrite the pending value.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::frames::{FrameRequest, FrameScheduler, Immediate};
use super::payload::{HeightSample, RejectReason, ceil_px};

pub type HeightCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Differences up to this many pixels are treated as rounding noise.
pub const CHANGE_THRESHOLD_PX: u32 = 1;

#[derive(Clone, Default)]
pub struct ReconcilerConfig {
    pub min_height: f64,
    pub on_height_change: Option<HeightCallback>,
}

impl fmt::Debug for ReconcilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcilerConfig")
            .field("min_height", &self.min_height)
            .field("on_height_change", &self.on_height_change.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A commit was requested for the next frame.
    Scheduled(u32),
    /// A commit was already scheduled; the pending value was replaced.
    Coalesced(u32),
    /// No frame primitive: committed on the spot.
    Committed(u32),
    Rejected(RejectReason),
}

struct ReconcilerState {
    min_height: u32,
    committed: u32,
    pending: Option<u32>,
    commit_scheduled: bool,
    frame: Option<FrameRequest>,
    disposed: bool,
    on_change: Option<HeightCallback>,
}

pub struct HeightReconciler {
    state: Arc<Mutex<ReconcilerState>>,
    scheduler: Arc<dyn FrameScheduler>,
}

fn normalize_min(min_height: f64) -> u32 {
    ceil_px(min_height)
}

impl HeightReconciler {
    pub fn new(config: ReconcilerConfig, scheduler: Arc<dyn FrameScheduler>) -> Self {
        let min_height = normalize_min(config.min_height);
        Self {
            state: Arc::new(Mutex::new(ReconcilerState {
                min_height,
                committed: min_height.max(1),
                pending: None,
                commit_scheduled: false,
                frame: None,
                disposed: false,
                on_change: config.on_height_change,
            })),
            scheduler,
        }
    }

    /// Reconciler for a host without a frame primitive.
    pub fn synchronous(config: ReconcilerConfig) -> Self {
        Self::new(config, Arc::new(Immediate))
    }

    pub fn height(&self) -> u32 {
        self.state.lock().committed
    }

    pub fn min_height(&self) -> u32 {
        self.state.lock().min_height
    }

    pub fn pending(&self) -> Option<u32> {
        self.state.lock().pending
    }

    pub fn is_commit_scheduled(&self) -> bool {
        self.state.lock().commit_scheduled
    }

    pub fn set_on_height_change(&self, callback: Option<HeightCallback>) {
        self.state.lock().on_change = callback;
    }

    pub fn ingest<'a>(&self, payload: impl Into<HeightSample<'a>>) -> IngestOutcome {
        let value = match payload.into().coerce() {
            Ok(value) => value,
            Err(reason) => return IngestOutcome::Rejected(reason),
        };

        let candidate = {
            let mut state = self.state.lock();
            if state.disposed {
                return IngestOutcome::Rejected(RejectReason::Disposed);
            }
            let candidate = ceil_px(value).max(state.min_height);
            if candidate.abs_diff(state.committed) <= CHANGE_THRESHOLD_PX {
                // The latest sample wins: an older pending value must not commit
                // over it. A pending raised minimum is kept in the sample's place.
                if state.pending.is_some() {
                    state.pending = (state.committed < state.min_height).then_some(candidate);
                }
                return IngestOutcome::Rejected(RejectReason::WithinThreshold);
            }
            state.pending = Some(candidate);
            if state.commit_scheduled {
                return IngestOutcome::Coalesced(candidate);
            }
            state.commit_scheduled = true;
            candidate
        };

        if self.schedule_commit() {
            IngestOutcome::Scheduled(candidate)
        } else {
            IngestOutcome::Committed(candidate)
        }
    }

    /// Change the minimum height. Raising it above the committed height
    /// schedules a commit of the new minimum.
    pub fn set_min_height(&self, min_height: f64) -> Option<IngestOutcome> {
        let min_height = normalize_min(min_height);
        let target = {
            let mut state = self.state.lock();
            if state.disposed {
                return None;
            }
            state.min_height = min_height;
            if min_height <= state.committed {
                return None;
            }
            let target = state.pending.map_or(min_height, |p| p.max(min_height));
            state.pending = Some(target);
            if state.commit_scheduled {
                return Some(IngestOutcome::Coalesced(target));
            }
            state.commit_scheduled = true;
            target
        };

        if self.schedule_commit() {
            Some(IngestOutcome::Scheduled(target))
        } else {
            Some(IngestOutcome::Committed(target))
        }
    }

    /// Cancel any scheduled commit and stop accepting samples.
    pub fn dispose(&self) {
        let frame = {
            let mut state = self.state.lock();
            state.disposed = true;
            state.pending = None;
            state.commit_scheduled = false;
            state.on_change = None;
            state.frame.take()
        };
        if let Some(frame) = frame {
            self.scheduler.cancel_frame(frame);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Request a frame for the commit; commit synchronously when the host
    /// has none. Returns whether the commit was deferred.
    fn schedule_commit(&self) -> bool {
        let state = Arc::clone(&self.state);
        let requested = self
            .scheduler
            .request_frame(Box::new(move || {
                commit(&state);
            }));

        match requested {
            Some(frame) => {
                let mut state = self.state.lock();
                // The callback may already have run on another thread.
                if state.commit_scheduled {
                    state.frame = Some(frame);
                }
                true
            }
            None => {
                commit(&self.state);
                false
            }
        }
    }
}

impl Drop for HeightReconciler {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for HeightReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HeightReconciler")
            .field("min_height", &state.min_height)
            .field("committed", &state.committed)
            .field("pending", &state.pending)
            .field("commit_scheduled", &state.commit_scheduled)
            .field("disposed", &state.disposed)
            .finish()
    }
}

/// Commit step. A callback firing after disposal, or with nothing pending, does nothing.
fn commit(state: &Mutex<ReconcilerState>) -> Option<u32> {
    let (height, callback) = {
        let mut state = state.lock();
        state.commit_scheduled = false;
        state.frame = None;
        if state.disposed {
            state.pending = None;
            return None;
        }
        let pending = state.pending.take()?;
        let height = pending.max(state.min_height).max(1);
        state.committed = height;
        (height, state.on_change.clone())
    };

    if let Some(callback) = callback {
        callback(height);
    }
    Some(height)
}

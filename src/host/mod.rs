//! Host side of the height channel.

pub mod frames;
pub mod payload;
pub mod reconciler;

pub use frames::{DeferredFrames, FrameCallback, FrameRequest, FrameScheduler, Immediate};
pub use payload::{HeightSample, RejectReason};
pub use reconciler::{
    CHANGE_THRESHOLD_PX, HeightCallback, HeightReconciler, IngestOutcome, ReconcilerConfig,
};

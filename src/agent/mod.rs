//! In-document measurement agent.
//!
//! The agent watches the rendered document for anything that can change its
//! height and posts the height out as a decimal string. `script` renders the
//! injectable bootstrap; `session` runs the same measurement session against
//! any `AgentEnv`.

pub mod control;
pub mod env;
pub mod gate;
pub mod policy;
pub mod script;
pub mod session;

pub use control::{is_refresh_request, refresh_request_script};
pub use env::{
    AgentEnv, ElementMetrics, FrameId, Geometry, ListenerId, MediaElement, MediaId, MediaKind,
    Registration, TimerId, ViewportEvent,
};
pub use gate::{GateDecision, PostGate};
pub use policy::{AgentPolicy, REFRESH_SENTINEL, SESSION_KEY};
pub use script::bootstrap_script;
pub use session::{Bootstrap, DocumentAgent, MeasureOutcome};

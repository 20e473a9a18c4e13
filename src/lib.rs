//! Size a non-scrolling native container to the height of the content
//! rendered inside an embedded webview.
//!
//! - `agent`: measurement session that runs inside the document
//! - `host`: reconciler turning height reports into a committed height
//! - `scripts`: composition of injectable script units
//! - `container`: webview-backed view wiring the two together
//! - `config`: persisted minimum height and agent policy

pub mod debug_log;

pub mod agent;
pub mod config;
pub mod container;
pub mod host;
pub mod scripts;

pub use agent::{AgentPolicy, DocumentAgent, REFRESH_SENTINEL, bootstrap_script};
pub use config::{AutoHeightConfig, load_config, save_config};
pub use container::{
    AutoHeightView, ContainerConfig, ContainerStyle, Source, ViewOptions,
    create_autoheight_webview, injection_plan,
};
pub use host::{HeightReconciler, IngestOutcome, ReconcilerConfig};
pub use scripts::compose_scripts;

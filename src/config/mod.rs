//! Configuration for webview-autoheight.
//!
//! - `AutoHeightConfig`: host minimum height plus the agent policy
//! - `io`: loading and saving the JSON file

mod io;

use serde::{Deserialize, Serialize};

use crate::agent::AgentPolicy;

pub use io::{get_config_path, load_config, load_config_from, save_config, save_config_to};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoHeightConfig {
    /// Container never shrinks below this many pixels.
    pub min_height: f64,
    pub agent: AgentPolicy,
}

impl Default for AutoHeightConfig {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            agent: AgentPolicy::default(),
        }
    }
}

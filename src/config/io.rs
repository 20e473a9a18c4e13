//! Config I/O: load and save.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::AutoHeightConfig;

pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_default()
        .join("webview-autoheight");
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir.join("autoheight.json")
}

/// Load the user config, falling back to defaults when missing or unreadable.
pub fn load_config() -> AutoHeightConfig {
    let path = get_config_path();
    if !path.exists() {
        return AutoHeightConfig::default();
    }
    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            crate::log_info!("[Config] Using defaults, {:#}", e);
            AutoHeightConfig::default()
        }
    }
}

pub fn load_config_from(path: &Path) -> anyhow::Result<AutoHeightConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut config: AutoHeightConfig = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;

    // Keep the policy usable even when hand-edited into nonsense.
    if !config.min_height.is_finite() || config.min_height < 0.0 {
        config.min_height = 0.0;
    }
    if config.agent.fallback_max_ms < config.agent.fallback_initial_ms {
        config.agent.fallback_max_ms = config.agent.fallback_initial_ms;
    }
    config.agent.forced_remeasure_ms.sort_unstable();
    Ok(config)
}

pub fn save_config(config: &AutoHeightConfig) -> anyhow::Result<()> {
    save_config_to(&get_config_path(), config)
}

pub fn save_config_to(path: &Path, config: &AutoHeightConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

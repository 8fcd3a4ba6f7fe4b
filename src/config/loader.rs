use super::Config;
use anyhow::Result;
use std::path::PathBuf;

/// Load configuration from file or return defaults
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Config::default())
    }
}

/// Load `.env` then `.env.local` from the working directory, without
/// overriding variables already present in the environment.
pub fn load_env_files() {
    for name in [".env", ".env.local"] {
        match dotenvy::from_filename(name) {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Could not load {}: {}", name, e),
        }
    }
}

fn get_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "caia")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.config/caia/config.toml"))
}

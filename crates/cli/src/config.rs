use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tutorchat_runtime_config::{
    apply_compat_fallbacks, normalize_server_url, ClientConfig, CONFIG_FILE_NAME,
};

/// Get the config directory path (~/.config/tutorchat/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("tutorchat"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

fn read_config_doc(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let doc = toml::from_str::<toml::Value>(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(doc)
}

fn load_runtime_config_from_doc(doc: &toml::Value) -> ClientConfig {
    let mut config = doc.clone().try_into::<ClientConfig>().unwrap_or_else(|e| {
        tracing::warn!("config has invalid fields, using defaults: {e}");
        ClientConfig::default()
    });
    apply_compat_fallbacks(&mut config);
    config
}

/// Load config from `path`, returning defaults if the file does not exist.
pub fn load_config_from(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let doc = read_config_doc(path)?;
    Ok(load_runtime_config_from_doc(&doc))
}

/// Write config to `path`, creating the parent directory.
pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir at {}", dir.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    Ok(())
}

/// Load config from the canonical location.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(&config_path()?)
}

/// Settings a `config` invocation may change. `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub server: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.server.is_none() && self.token.is_none() && self.username.is_none()
    }

    fn apply(self, config: &mut ClientConfig) {
        if let Some(url) = self.server {
            config.server.url = normalize_server_url(&url);
        }
        if let Some(token) = self.token {
            config.identity.token = token.trim().to_string();
        }
        if let Some(username) = self.username {
            config.identity.username = username.trim().to_string();
        }
        apply_compat_fallbacks(config);
    }
}

fn describe(config: &ClientConfig, path: &Path) -> String {
    let token = match config.identity.token() {
        None => "(not set)".to_string(),
        Some(token) => format!("{}...", token.chars().take(4).collect::<String>()),
    };
    let username = if config.identity.username.is_empty() {
        "(anonymous)"
    } else {
        config.identity.username.as_str()
    };
    format!(
        "Config file: {}\n\n[server]\n  url          = {}\n  timeout_secs = {}\n\n[retry]\n  max_retries  = {}\n  delays_secs  = {:?}\n\n[identity]\n  username     = {}\n  token        = {}",
        path.display(),
        config.server.url,
        config.server.timeout_secs,
        config.retry.max_retries,
        config.retry.delays_secs,
        username,
        token,
    )
}

/// Print current config.
pub fn show_config() -> Result<()> {
    let path = config_path()?;
    let config = load_config_from(&path)?;
    println!("{}", describe(&config, &path));
    Ok(())
}

/// Update config with provided values.
pub fn set_config(update: ConfigUpdate) -> Result<()> {
    let path = config_path()?;
    let mut config = load_config_from(&path)?;
    update.apply(&mut config);
    save_config_to(&path, &config)?;
    println!("Configuration updated.");
    println!("{}", describe(&config, &path));
    Ok(())
}

use serde::Deserialize;

pub const DEFAULT_API: &str = "http://127.0.0.1:5000";
pub const DEFAULT_NODES: u32 = 50;
pub const DEFAULT_TICK_MS: u64 = 200;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Base URL of the simulation backend.
    pub api: String,
    /// Node count requested on session start.
    pub n_nodes: u32,
    /// Delay between snapshot ticks. A throttle on backend load and render
    /// rate, not a real-time deadline.
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: DEFAULT_API.to_string(),
            n_nodes: DEFAULT_NODES,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_nodes == 0 {
            return Err(ConfigError::Invalid("n_nodes must be at least 1".into()));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

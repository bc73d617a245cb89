use {
    crate::cli::CliLogLevel,
    serde::{Deserialize, Serialize},
    std::{env, io, path::Path},
    thiserror::Error,
};

pub const ENV_USE_OVERLAY_PLANES: &str = "DRMHWC_USE_OVERLAY_PLANES";
pub const ENV_DEVICES: &str = "DRMHWC_DEVICES";
pub const ENV_HOTPLUG: &str = "DRMHWC_HOTPLUG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {0}")]
    Read(String, #[source] io::Error),
    #[error("Could not parse {0}")]
    Parse(String, #[source] serde_json::Error),
    #[error("{0} must be a boolean but is `{1}`")]
    NotABool(&'static str, String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Whether layers may be placed on overlay planes.
    pub use_overlay_planes: bool,
    /// Device nodes to open. If empty, every /dev/dri/card* node is used.
    pub devices: Vec<String>,
    /// Whether to follow connector hotplug events.
    pub hotplug: bool,
    pub log_level: Option<CliLogLevel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_overlay_planes: true,
            devices: vec![],
            hotplug: true,
            log_level: None,
        }
    }
}

impl Config {
    /// Reads the config file, if any, and applies the environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let name = path.display().to_string();
        let data = std::fs::read(path).map_err(|e| ConfigError::Read(name.clone(), e))?;
        serde_json::from_slice(&data).map_err(|e| ConfigError::Parse(name, e))
    }

    fn apply_env(
        &mut self,
        var: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = var(ENV_USE_OVERLAY_PLANES) {
            self.use_overlay_planes = parse_bool(ENV_USE_OVERLAY_PLANES, &v)?;
        }
        if let Some(v) = var(ENV_DEVICES) {
            self.devices = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }
        if let Some(v) = var(ENV_HOTPLUG) {
            self.hotplug = parse_bool(ENV_HOTPLUG, &v)?;
        }
        Ok(())
    }
}

fn parse_bool(name: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::NotABool(name, v.to_string())),
    }
}

mod channel;
mod mailflow;

use std::{env, io, path::PathBuf, str::FromStr};

use thiserror::Error;

pub use channel::ChannelConfig;
pub use mailflow::{ActionConfig, Config};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading {path} failed")]
    Read { path: PathBuf, source: io::Error },
    #[error("config is not valid")]
    Parse(#[from] toml::de::Error),
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    NoHome,
}

/// `$XDG_CONFIG_HOME/<crate>/config.toml`, or the same below `~/.config`.
pub fn default_location() -> Result<PathBuf, ConfigError> {
    let mut config_dir = if let Some(config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        let mut config_home = PathBuf::from(home);
        config_home.push(".config");
        config_home
    };
    config_dir.push(env!("CARGO_PKG_NAME"));
    config_dir.push("config.toml");

    Ok(config_dir)
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

use std::{fs::read_to_string, path::PathBuf, time::Duration};

use derive_getters::Getters;
use serde::Deserialize;

use crate::{
    action::DEFAULT_UNDO_WINDOW,
    config::{ChannelConfig, ConfigError, default_location},
    sync::DEFAULT_COMMIT_TIMEOUT,
    thread::ConnectionId,
};

#[derive(Debug, Clone, Deserialize, Getters)]
pub struct Config {
    connection: Option<ConnectionId>,
    channel: ChannelConfig,
    #[serde(default)]
    actions: ActionConfig,
}

impl Config {
    pub fn load_from_file(file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match file {
            Some(file) => file,
            None => default_location()?,
        };
        let contents = read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
        contents.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    undo_window_ms: u64,
    commit_timeout_ms: u64,
}

impl ActionConfig {
    pub fn undo_window(&self) -> Duration {
        Duration::from_millis(self.undo_window_ms)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            undo_window_ms: u64::try_from(DEFAULT_UNDO_WINDOW.as_millis())
                .expect("default undo window should fit in u64 millis"),
            commit_timeout_ms: u64::try_from(DEFAULT_COMMIT_TIMEOUT.as_millis())
                .expect("default commit timeout should fit in u64 millis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use assertables::*;
    use rstest::*;
    use tempfile::NamedTempFile;

    use super::*;

    #[rstest]
    fn test_minimal_config_uses_defaults() {
        let config: Config = assert_ok!("[channel]\nhost = \"sync.example.com\"\nport = 1999\n".parse());

        assert_none!(config.connection());
        assert_eq!("sync.example.com", config.channel().host());
        assert_eq!(1999, config.channel().port());
        assert!(config.channel().tls());
        assert_eq!(DEFAULT_UNDO_WINDOW, config.actions().undo_window());
        assert_eq!(DEFAULT_COMMIT_TIMEOUT, config.actions().commit_timeout());
    }

    #[rstest]
    fn test_load_full_config_from_file() {
        let mut file = assert_ok!(NamedTempFile::new());
        assert_ok!(write!(
            file,
            r#"
connection = "conn-1"

[channel]
host = "localhost"
port = 4000
tls = false
max_line_length = 4096

[actions]
undo_window_ms = 2500
"#
        ));

        let config = assert_ok!(Config::load_from_file(Some(file.path().to_path_buf())));
        assert_eq!(Some(&ConnectionId::from("conn-1")), config.connection().as_ref());
        assert!(!config.channel().tls());
        assert_eq!(4096, config.channel().max_line_length());
        assert_eq!(Duration::from_millis(2500), config.actions().undo_window());
        assert_eq!(DEFAULT_COMMIT_TIMEOUT, config.actions().commit_timeout());
    }

    #[rstest]
    #[case("")]
    #[case("[channel]\nhost = \"x\"\n")]
    #[case("[channel]\nhost = \"x\"\nport = \"many\"\n")]
    fn test_invalid_config_is_rejected(#[case] contents: &str) {
        assert_matches!(contents.parse::<Config>(), Err(ConfigError::Parse(_)));
    }

    #[rstest]
    fn test_missing_file_is_reported() {
        let dir = assert_ok!(tempfile::tempdir());
        let missing = dir.path().join("config.toml");
        assert_matches!(
            Config::load_from_file(Some(missing)),
            Err(ConfigError::Read { .. })
        );
    }
}

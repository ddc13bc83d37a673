use derive_getters::Getters;
use serde::Deserialize;

use crate::sync::DEFAULT_MAX_LINE_LENGTH;

#[derive(Debug, Clone, Deserialize, Getters)]
pub struct ChannelConfig {
    host: String,
    port: u16,
    #[serde(default = "tls")]
    tls: bool,
    #[serde(default = "max_line_length")]
    max_line_length: usize,
}

fn tls() -> bool {
    true
}

fn max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use netchess::DEFAULT_PORT;
use netchess::peer::PeerOptions;
use serde::{Deserialize, Serialize};


fn default_port() -> u16 { DEFAULT_PORT }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    // Drop a player who keeps the opponent waiting longer than this, e.g. "5m".
    #[serde(default, with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self { ServerConfig { port: DEFAULT_PORT, idle_timeout: None } }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'.", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'.", path.display()))
    }

    pub fn peer_options(&self) -> PeerOptions { PeerOptions { idle_timeout: self.idle_timeout } }
}

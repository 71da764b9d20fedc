// ABOUTME: Configuration types and parsing for dregs.yml.
// ABOUTME: Handles discovery, YAML parsing, and command-line overrides.

mod deserialize;
mod init;
mod server;

pub use init::{TEMPLATE, init_config};
pub use server::ServerConfig;

use crate::engine::RuntimeConfig;
use crate::error::{Error, Result};
use deserialize::deserialize_server_option;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "dregs.yml";
pub const CONFIG_FILENAME_ALT: &str = "dregs.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dregs/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Engine selection; empty means auto-detect.
    #[serde(default)]
    pub engine: RuntimeConfig,

    /// Remote host reached over SSH; absent means the local engine.
    #[serde(default, deserialize_with = "deserialize_server_option")]
    pub server: Option<ServerConfig>,

    /// Upper bound for a single remote command.
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: RuntimeConfig::default(),
            server: None,
            command_timeout: default_command_timeout(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// First config file found in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the config file in `dir`, failing when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Err(Error::ConfigNotFound(dir.to_path_buf())),
        }
    }

    /// Config for a console run.
    ///
    /// An explicit path must exist. Without one, a missing file in `dir`
    /// means defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(Error::ConfigNotFound(path.to_path_buf())),
            Some(path) => Self::load(path),
            None => match Self::find(dir) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading config");
                    Self::load(&path)
                }
                None => Ok(Self::default()),
            },
        }
    }

    /// Replace the configured server with a `[user@]host[:port]` address.
    pub fn with_host(mut self, address: &str) -> Result<Self> {
        let server = ServerConfig::parse(address).map_err(Error::InvalidConfig)?;
        self.server = Some(server);
        Ok(self)
    }

    pub fn is_remote(&self) -> bool {
        self.server.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RuntimeType, Transport};

    #[test]
    fn empty_document_is_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.server.is_none());
        assert_eq!(config.engine.transport, Transport::Api);
        assert_eq!(config.command_timeout, Duration::from_secs(300));
    }

    #[test]
    fn full_document() {
        let config = Config::from_yaml(
            r#"
engine:
  runtime: podman
  socket: /run/podman/podman.sock
  transport: cli
server: ops@build.example.com:2222
command_timeout: 90s
"#,
        )
        .unwrap();

        assert_eq!(config.engine.runtime, Some(RuntimeType::Podman));
        assert_eq!(config.engine.transport, Transport::Cli);
        let server = config.server.unwrap();
        assert_eq!(server.host, "build.example.com");
        assert_eq!(server.port, 2222);
        assert_eq!(server.user.as_deref(), Some("ops"));
        assert_eq!(config.command_timeout, Duration::from_secs(90));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_yaml("servers: []").is_err());
    }

    #[test]
    fn host_override_replaces_server() {
        let config = Config::from_yaml("server: old.example.com")
            .unwrap()
            .with_host("root@new.example.com")
            .unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.host, "new.example.com");
        assert_eq!(server.user.as_deref(), Some("root"));

        assert!(Config::default().with_host("host:notaport").is_err());
    }
}

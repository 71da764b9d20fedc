// ABOUTME: Server configuration for SSH connections.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use crate::ssh::SessionConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    /// Private key to try before the agent and default key files.
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
    #[serde(default)]
    pub trust_first_connection: bool,
}

fn default_port() -> u16 {
    22
}

impl ServerConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        // [user@]host[:port]
        let (user_part, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        if user_part == Some("") {
            return Err("user cannot be empty".to_string());
        }

        let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
            let port_str = &rest[colon_pos + 1..];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (&rest[..colon_pos], port)
        } else {
            (rest, 22)
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
            key: None,
            known_hosts: None,
            trust_first_connection: false,
        })
    }

    /// Login user, falling back to `$USER` and then `root`.
    pub fn login_user(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }

    /// SSH session settings for this server.
    pub fn ssh_session_config(&self, command_timeout: Duration) -> SessionConfig {
        let mut config = SessionConfig::new(&self.host, self.login_user())
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection)
            .command_timeout(command_timeout);
        if let Some(key) = &self.key {
            config = config.key_path(key);
        }
        if let Some(known_hosts) = &self.known_hosts {
            config = config.known_hosts_path(known_hosts);
        }
        config
    }
}

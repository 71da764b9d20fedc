// ABOUTME: Config scaffolding for new working directories.
// ABOUTME: Writes a commented dregs.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

/// Starting config; every setting is optional and shown commented out.
pub const TEMPLATE: &str = r#"# dregs configuration. Every key is optional.

engine:
  # docker | podman; omit to auto-detect
  # runtime: docker
  # omit to use the engine's default socket
  # socket: /var/run/docker.sock
  # api (engine socket) | cli (docker/podman client)
  transport: api

# Clean a remote host over SSH instead of the local engine.
# server: deploy@server.example.com:22
# server:
#   host: server.example.com
#   port: 22
#   user: deploy
#   key: /home/deploy/.ssh/id_ed25519
#   # Trust-On-First-Use for unknown host keys (default: false)
#   trust_first_connection: false

# Upper bound for a single remote command
command_timeout: 5m
"#;

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::super::Config;
    use super::*;

    #[test]
    fn template_parses_as_defaults() {
        let config = Config::from_yaml(TEMPLATE).unwrap();
        assert!(config.server.is_none());
        assert_eq!(config.command_timeout, std::time::Duration::from_secs(300));
    }
}

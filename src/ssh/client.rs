// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, authentication, host key checks, and remote commands.

use super::error::{Error, Result};
use super::forward::{ForwardHandle, start_forward};
use crate::shell::{CommandOutput, CommandRunner, RunError};
use async_trait::async_trait;
use parking_lot::Mutex;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Key files tried, in order, when neither an explicit key nor an agent is available.
const DEFAULT_KEY_FILES: [&str; 3] = [".ssh/id_ed25519", ".ssh/id_rsa", ".ssh/id_ecdsa"];

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Private key file. If None, the agent is tried, then default key files.
    pub key_path: Option<PathBuf>,
    /// Accept and record unknown host keys (Trust On First Use).
    pub trust_on_first_use: bool,
    /// known_hosts file; None means `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
    /// Timeout for a single remote command.
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// `user@host:port`, for messages.
    pub fn destination(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Host key verification callbacks for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn from_config(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn remember(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!("failed to record host key for {}: {}", self.host, e);
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match known {
            Ok(true) => Ok(true),
            // A changed key is never accepted, even with TOFU.
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!("host key for {}:{} has changed", self.host, self.port);
                Ok(false)
            }
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                self.remember(server_public_key);
                Ok(true)
            }
            Ok(false) | Err(_) => Ok(false),
        }
    }
}

enum Credentials {
    Agent(AgentClient<UnixStream>),
    Key(Arc<ssh_key::PrivateKey>),
}

/// An established SSH session to the engine host.
pub struct Session {
    config: SessionConfig,
    handle: Arc<Handle<SshHandler>>,
    forwarders: Mutex<Vec<ForwardHandle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connect and authenticate.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credentials = find_credentials(&config).await?;

        let russh_config = Arc::new(Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        });

        tracing::debug!("connecting to {}", config.destination());
        let mut handle = client::connect(
            russh_config,
            (config.host.as_str(), config.port),
            SshHandler::from_config(&config),
        )
        .await
        .map_err(|e| Error::Connection {
            host: config.host.clone(),
            port: config.port,
            reason: e.to_string(),
        })?;

        if !authenticate(&mut handle, &config.user, credentials).await? {
            return Err(Error::AuthenticationFailed {
                user: config.user.clone(),
            });
        }
        tracing::debug!("authenticated to {}", config.destination());

        Ok(Self {
            config,
            handle: Arc::new(handle),
            forwarders: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check whether a path exists on the remote host.
    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        let output = self
            .exec(&format!("test -e {} && echo exists", crate::shell::quote(path)))
            .await?;
        Ok(output.success() && output.stdout.trim() == "exists")
    }

    /// Execute a command with the configured timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let timeout = self.config.command_timeout;
        tokio::time::timeout(timeout, self.exec_inner(command))
            .await
            .map_err(|_| Error::CommandTimeout(timeout))?
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {e}")))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {e}")))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;
        let mut eof = false;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                // Extended data type 1 is stderr.
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status);
                    if eof {
                        break;
                    }
                }
                ChannelMsg::Eof => {
                    eof = true;
                    if exit_code.is_some() {
                        break;
                    }
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let exit_code = exit_code.ok_or(Error::ChannelClosed)?;
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    /// Forward a fresh local Unix socket to `remote_socket`; returns the local path.
    pub async fn forward_socket(&self, remote_socket: &str) -> Result<PathBuf> {
        let forward = start_forward(Arc::clone(&self.handle), remote_socket.to_string()).await?;
        let path = forward.local_path().to_path_buf();
        self.forwarders.lock().push(forward);
        Ok(path)
    }

    /// Stop forwarders and close the connection.
    pub async fn disconnect(&self) -> Result<()> {
        let forwarders: Vec<_> = self.forwarders.lock().drain(..).collect();
        for forward in forwarders {
            forward.stop().await;
        }

        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for Session {
    async fn run(&self, command: &str) -> std::result::Result<CommandOutput, RunError> {
        tracing::debug!(command, host = %self.config.host, "running remote command");
        self.exec(command).await.map_err(|e| match e {
            Error::CommandTimeout(d) => RunError::Timeout(d),
            other => RunError::Transport(other.to_string()),
        })
    }

    fn location(&self) -> String {
        self.config.destination()
    }
}

async fn find_credentials(config: &SessionConfig) -> Result<Credentials> {
    if let Some(path) = &config.key_path {
        let key = load_secret_key(path, None).map_err(|e| Error::KeyLoadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        return Ok(Credentials::Key(Arc::new(key)));
    }

    if let Ok(agent) = AgentClient::connect_env().await {
        return Ok(Credentials::Agent(agent));
    }

    let home = std::env::var("HOME")
        .map_err(|_| Error::NoCredentials("no SSH agent and HOME is not set".to_string()))?;

    DEFAULT_KEY_FILES
        .iter()
        .map(|rel| PathBuf::from(&home).join(rel))
        .find_map(|path| load_secret_key(&path, None).ok())
        .map(|key| Credentials::Key(Arc::new(key)))
        .ok_or_else(|| Error::NoCredentials("no SSH agent and no default key files".to_string()))
}

async fn authenticate(
    handle: &mut Handle<SshHandler>,
    user: &str,
    credentials: Credentials,
) -> Result<bool> {
    match credentials {
        Credentials::Agent(mut agent) => {
            let identities = agent
                .request_identities()
                .await
                .map_err(|e| Error::NoCredentials(format!("failed to list agent keys: {e}")))?;

            for identity in identities {
                let accepted = handle
                    .authenticate_publickey_with(user, identity, None, &mut agent)
                    .await;
                if matches!(accepted, Ok(result) if result.success()) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Credentials::Key(key) => {
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            let result = handle
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await?;
            Ok(result.success())
        }
    }
}

// ABOUTME: Opens the engine a console run talks to, locally or over SSH.
// ABOUTME: Picks detection and transport from config and owns the SSH session.

use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::engine::{
    ApiEngine, CliEngine, EngineError, Engine, RuntimeType, Transport, connect_via_session,
    detect_client, detect_local, detect_runtime,
};
use crate::output::Output;
use crate::shell::{CommandRunner, LocalShell};
use crate::ssh::Session;

/// A reachable engine plus whatever keeps it reachable.
pub struct Connection {
    engine: Box<dyn Engine>,
    runtime_type: RuntimeType,
    session: Option<Arc<Session>>,
}

impl Connection {
    /// Detect and connect to the engine `config` points at, then ping it.
    pub async fn open(config: &Config, output: &Output) -> Result<Self, EngineError> {
        let connection = match &config.server {
            None => Self::open_local(config, output).await?,
            Some(server) => {
                output.progress(&format!("Connecting to {}...", server.host));
                let session =
                    Arc::new(Session::connect(server.ssh_session_config(config.command_timeout)).await?);
                match Self::open_remote(config, Arc::clone(&session), output).await {
                    Ok(connection) => connection,
                    Err(e) => {
                        if let Err(close) = session.disconnect().await {
                            tracing::debug!("disconnect after failed setup: {}", close);
                        }
                        return Err(e);
                    }
                }
            }
        };

        connection.engine.ping().await?;
        tracing::debug!(runtime = %connection.runtime_type, "engine answered ping");
        Ok(connection)
    }

    async fn open_local(config: &Config, output: &Output) -> Result<Self, EngineError> {
        match config.engine.transport {
            Transport::Api => {
                let detected = detect_local(Some(&config.engine))?;
                output.progress(&format!(
                    "Found {} at {}",
                    detected.runtime_type, detected.socket_path
                ));
                let engine: Box<dyn Engine> = Box::new(ApiEngine::connect(&detected)?);
                Ok(Self::new(engine, detected.runtime_type, None))
            }
            Transport::Cli => {
                let runner: Arc<dyn CommandRunner> =
                    Arc::new(LocalShell::new().timeout(config.command_timeout));
                let runtime_type = detect_client(runner.as_ref(), Some(&config.engine)).await?;
                output.progress(&format!(
                    "Using the {runtime_type} client on {}",
                    runner.location()
                ));
                let engine: Box<dyn Engine> = Box::new(CliEngine::new(runner, runtime_type));
                Ok(Self::new(engine, runtime_type, None))
            }
        }
    }

    async fn open_remote(
        config: &Config,
        session: Arc<Session>,
        output: &Output,
    ) -> Result<Self, EngineError> {
        output.progress(&format!("Detecting runtime on {}...", session.location()));
        match config.engine.transport {
            Transport::Api => {
                let detected = detect_runtime(session.as_ref(), Some(&config.engine)).await?;
                output.progress(&format!(
                    "Found {} at {}",
                    detected.runtime_type, detected.socket_path
                ));
                let engine: Box<dyn Engine> =
                    Box::new(connect_via_session(&session, &detected).await?);
                Ok(Self::new(engine, detected.runtime_type, Some(session)))
            }
            Transport::Cli => {
                let runtime_type = detect_client(session.as_ref(), Some(&config.engine)).await?;
                output.progress(&format!(
                    "Using the {runtime_type} client on {}",
                    session.location()
                ));
                let runner: Arc<dyn CommandRunner> = session.clone();
                let engine: Box<dyn Engine> = Box::new(CliEngine::new(runner, runtime_type));
                Ok(Self::new(engine, runtime_type, Some(session)))
            }
        }
    }

    /// Wrap an already-connected engine.
    pub fn new(
        engine: Box<dyn Engine>,
        runtime_type: RuntimeType,
        session: Option<Arc<Session>>,
    ) -> Self {
        Self {
            engine,
            runtime_type,
            session,
        }
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Release the engine and close the SSH session, if any.
    ///
    /// A failed disconnect is a warning, not an error.
    pub async fn close(self, diag: &mut Diagnostics) {
        let Connection {
            engine, session, ..
        } = self;
        drop(engine);

        if let Some(session) = session
            && let Err(e) = session.disconnect().await
        {
            diag.warn(Warning::ssh_disconnect(format!(
                "SSH disconnect failed for {}: {}",
                session.config().host,
                e
            )));
        }
    }
}

// ABOUTME: Tunnels a local Unix socket to the remote engine socket over SSH.
// ABOUTME: Lets the API engine talk to a remote daemon as if it were local.

use super::client::SshHandler;
use super::error::{Error, Result};
use russh::ChannelMsg;
use russh::client::Handle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const PUMP_BUFFER: usize = 64 * 1024;

/// A running socket forwarder. Dropping it stops accepting connections.
pub struct ForwardHandle {
    local_path: PathBuf,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ForwardHandle {
    /// Path of the local socket clients should connect to.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Stop the forwarder, waiting briefly for the accept loop to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
        }
        let _ = std::fs::remove_file(&self.local_path);
    }
}

impl Drop for ForwardHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        let _ = std::fs::remove_file(&self.local_path);
    }
}

/// Bind a fresh local socket and forward every connection on it to
/// `remote_socket` through a `direct-streamlocal` channel.
pub(crate) async fn start_forward(
    handle: Arc<Handle<SshHandler>>,
    remote_socket: String,
) -> Result<ForwardHandle> {
    let local_path = local_socket_path();
    let _ = std::fs::remove_file(&local_path);

    let listener = UnixListener::bind(&local_path).map_err(|e| {
        Error::SocketForwardFailed(format!("failed to bind {}: {}", local_path.display(), e))
    })?;
    tracing::debug!(
        local = %local_path.display(),
        remote = %remote_socket,
        "socket forward listening"
    );

    let (shutdown, stopped) = watch::channel(false);
    let task = tokio::spawn(accept_loop(listener, handle, remote_socket, stopped));

    Ok(ForwardHandle {
        local_path,
        shutdown,
        task: Some(task),
    })
}

fn local_socket_path() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("dregs-{}-{}.sock", std::process::id(), n))
}

async fn accept_loop(
    listener: UnixListener,
    handle: Arc<Handle<SshHandler>>,
    remote_socket: String,
    mut stopped: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stopped.changed() => {
                if changed.is_err() || *stopped.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let handle = Arc::clone(&handle);
                    let remote = remote_socket.clone();
                    tokio::spawn(async move {
                        if let Err(e) = pump(stream, &handle, &remote).await {
                            tracing::debug!("forwarded connection ended: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("accept failed on forwarded socket: {}", e);
                    break;
                }
            },
        }
    }
}

/// Shuttle bytes between one local connection and one SSH channel.
async fn pump(
    mut local: UnixStream,
    handle: &Handle<SshHandler>,
    remote_socket: &str,
) -> Result<()> {
    let mut channel = handle
        .channel_open_direct_streamlocal(remote_socket)
        .await
        .map_err(|e| {
            Error::SocketForwardFailed(format!("streamlocal channel to {remote_socket}: {e}"))
        })?;

    let mut buf = vec![0u8; PUMP_BUFFER];
    let mut local_eof = false;
    let mut remote_eof = false;

    loop {
        tokio::select! {
            read = local.read(&mut buf), if !local_eof => match read? {
                0 => {
                    local_eof = true;
                    channel.eof().await?;
                }
                n => channel.data(&buf[..n]).await?,
            },
            msg = channel.wait(), if !remote_eof => match msg {
                Some(ChannelMsg::Data { ref data }) => local.write_all(data).await?,
                Some(ChannelMsg::Eof) => {
                    remote_eof = true;
                    if local_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            },
            else => break,
        }
    }

    Ok(())
}

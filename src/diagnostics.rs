// ABOUTME: Accumulator for non-fatal warnings raised while a command runs.
// ABOUTME: Warnings are logged immediately and shown to the operator at the end.

/// Collects non-fatal warnings.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Messages only, consuming the accumulator.
    pub fn into_messages(self) -> Vec<String> {
        self.warnings.into_iter().map(|w| w.message).collect()
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A blocking container could not be removed.
    pub fn container_removal(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerRemoval,
            message: message.into(),
        }
    }

    /// The SSH session did not close cleanly.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }
}

/// Categories of non-fatal warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Force-removing a container that blocked an image failed.
    ContainerRemoval,
    /// Failed to cleanly disconnect the SSH session.
    SshDisconnect,
}

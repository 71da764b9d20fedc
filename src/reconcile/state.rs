// ABOUTME: States of the batch reconciliation machine.
// ABOUTME: Each state has exactly one handler in the driver.

/// Where a batch is in its reconciliation.
///
/// `Initial → FirstPass → Diagnosed → AwaitContainerRemovalDecision →
/// Retried → AwaitForceDecision → Terminal`, with shortcuts to `Terminal`
/// whenever nothing is left pending or the operator declines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Batch built, nothing attempted.
    Initial,
    /// Plain delete of every pending ID (round 1).
    FirstPass,
    /// Dependents resolved and shown for every pending ID.
    Diagnosed,
    /// Asking whether to remove every blocking container.
    AwaitContainerRemovalDecision,
    /// Containers removed; plain delete retried once (round 2).
    Retried,
    /// Asking whether to force-delete what remains (round 3 on yes).
    AwaitForceDecision,
    /// Nothing pending; summary ready.
    Terminal,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        *self == BatchState::Terminal
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BatchState::Initial => "initial",
            BatchState::FirstPass => "first-pass",
            BatchState::Diagnosed => "diagnosed",
            BatchState::AwaitContainerRemovalDecision => "await-container-removal",
            BatchState::Retried => "retried",
            BatchState::AwaitForceDecision => "await-force",
            BatchState::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

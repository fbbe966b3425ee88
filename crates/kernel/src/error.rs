//! Error types for kernel operations.

use std::fmt;
use types::AgentId;

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors that can occur while wiring or running a simulation.
///
/// These are configuration errors: a run that hits one aborts rather than
/// recovering, since they indicate a setup bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// A message was addressed to an agent id that is not registered.
    UnknownRecipient(AgentId),
    /// Two agents were registered under the same id.
    DuplicateAgent(AgentId),
    /// A replay feed was provided but no exchange agent is mounted.
    NoExchange,
    /// `run` was called on a kernel that has already run.
    AlreadyRun,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::UnknownRecipient(id) => {
                write!(f, "message addressed to unregistered agent {}", id)
            }
            KernelError::DuplicateAgent(id) => {
                write!(f, "agent id {} registered twice", id)
            }
            KernelError::NoExchange => write!(f, "no exchange agent mounted"),
            KernelError::AlreadyRun => write!(f, "kernel has already run"),
        }
    }
}

impl std::error::Error for KernelError {}

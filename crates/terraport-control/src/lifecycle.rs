//! Typestate for a single deploy invocation.
//!
//! A run moves through the remote lifecycle in one direction only:
//!
//! ```text
//! Submitted ──▶ Staged ──▶ Transferred ──▶ Running ──▶ Completed ──▶ Cleaned
//! ```
//!
//! Each transition consumes the previous state, so cleanup can only be
//! reached from a completed run and a run cannot be started twice.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use terraport_core::DeploymentId;
use tracing::debug;

use crate::remote::RemoteWorkspace;

// =============================================================================
// State marker types (zero-sized)
// =============================================================================

/// Marker trait for run states.
pub trait RunState: private::Sealed + Send + Sync {
    /// Get the state name for logs and errors.
    fn name() -> &'static str;
}

mod private {
    pub trait Sealed {}
}

/// Template and credentials located.
#[derive(Debug, Clone, Copy)]
pub struct Submitted;

/// Inputs written to local staging files.
#[derive(Debug, Clone, Copy)]
pub struct Staged;

/// Inputs copied into the remote workspace.
#[derive(Debug, Clone, Copy)]
pub struct Transferred;

/// Container invoked on the remote host.
#[derive(Debug, Clone, Copy)]
pub struct Running;

/// Remote command returned or was abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Completed;

/// Remote workspace removal attempted.
#[derive(Debug, Clone, Copy)]
pub struct Cleaned;

impl private::Sealed for Submitted {}
impl private::Sealed for Staged {}
impl private::Sealed for Transferred {}
impl private::Sealed for Running {}
impl private::Sealed for Completed {}
impl private::Sealed for Cleaned {}

impl RunState for Submitted {
    fn name() -> &'static str {
        "submitted"
    }
}

impl RunState for Staged {
    fn name() -> &'static str {
        "staged"
    }
}

impl RunState for Transferred {
    fn name() -> &'static str {
        "transferred"
    }
}

impl RunState for Running {
    fn name() -> &'static str {
        "running"
    }
}

impl RunState for Completed {
    fn name() -> &'static str {
        "completed"
    }
}

impl RunState for Cleaned {
    fn name() -> &'static str {
        "cleaned"
    }
}

// =============================================================================
// Run parameterised by state
// =============================================================================

/// A deploy invocation in a specific state.
#[derive(Debug)]
pub struct Run<S: RunState> {
    id: DeploymentId,
    workspace: RemoteWorkspace,
    started_at: DateTime<Utc>,
    exit_code: Option<i32>,
    _state: PhantomData<S>,
}

impl<S: RunState> Run<S> {
    /// The deployment being run.
    #[must_use]
    pub const fn id(&self) -> &DeploymentId {
        &self.id
    }

    /// The remote workspace for this run.
    #[must_use]
    pub const fn workspace(&self) -> &RemoteWorkspace {
        &self.workspace
    }

    /// Get the state name.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        S::name()
    }

    /// Time since the run was created.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    fn transition<T: RunState>(self) -> Run<T> {
        debug!(
            deployment_id = %self.id,
            from = S::name(),
            to = T::name(),
            "run state transition"
        );
        Run {
            id: self.id,
            workspace: self.workspace,
            started_at: self.started_at,
            exit_code: self.exit_code,
            _state: PhantomData,
        }
    }
}

impl Run<Submitted> {
    /// Start tracking a deploy invocation.
    #[must_use]
    pub fn new(id: DeploymentId, workspace: RemoteWorkspace) -> Self {
        Self {
            id,
            workspace,
            started_at: Utc::now(),
            exit_code: None,
            _state: PhantomData,
        }
    }

    /// Local staging files have been written.
    #[must_use]
    pub fn staged(self) -> Run<Staged> {
        self.transition()
    }
}

impl Run<Staged> {
    /// Both files are in the remote workspace.
    #[must_use]
    pub fn transferred(self) -> Run<Transferred> {
        self.transition()
    }
}

impl Run<Transferred> {
    /// The container command is being issued.
    #[must_use]
    pub fn start(self) -> Run<Running> {
        self.transition()
    }
}

impl Run<Running> {
    /// The remote command finished with the given exit code.
    ///
    /// `None` means the process was killed or the run was abandoned.
    #[must_use]
    pub fn complete(mut self, exit_code: Option<i32>) -> Run<Completed> {
        self.exit_code = exit_code;
        self.transition()
    }
}

impl Run<Completed> {
    /// Exit code of the remote command.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Workspace removal has been attempted.
    #[must_use]
    pub fn cleaned(self) -> Run<Cleaned> {
        self.transition()
    }
}

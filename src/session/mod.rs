//! Session lifecycle: dial, wait, tear down
//!
//! A session runs exactly one native dial to completion. The controller
//! drives a [`Dialer`] through its states:
//!
//! ```text
//! Idle -> Connecting -> Connected-Waiting -> Disconnecting -> Terminal
//!              \______________________________________________/
//!                            (dial failed)
//! ```
//!
//! The wait ends on whichever comes first: the [`TimeBudget`] elapsing, an
//! [`Interrupt`], or the dialer process exiting on its own. A timeout and an
//! interrupt are distinct [`Teardown`] causes that lead to the same hang-up.
//! A second interrupt while hanging up abandons the teardown.

pub mod budget;
pub mod signal;

pub use budget::{BudgetError, TimeBudget};
pub use signal::CtrlC;

use std::fmt;
use std::future::{self, Future};
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
    #[error("Failed to stop {program}: {message}")]
    Stop { program: String, message: String },
    #[error("Credential hand-off failed: {0}")]
    Handoff(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A native dialer driven by the [`SessionController`]
pub trait Dialer {
    /// Human-readable description of the dial command, for logs
    fn describe(&self) -> String;

    /// Bring the connection up
    fn dial(&mut self) -> impl Future<Output = Result<(), SessionError>>;

    /// Resolves when the native session ends by itself
    ///
    /// Dialers that hand the session to the OS never resolve. An error means
    /// the session broke while the dialer may still be up; it is hung up.
    fn ended(&mut self) -> impl Future<Output = Result<ExitStatus, SessionError>>;

    /// Tear the connection down and wait for it to be gone
    fn hang_up(&mut self) -> impl Future<Output = Result<(), SessionError>>;
}

/// Source of external stop requests
pub trait Interrupt {
    fn arrived(&mut self) -> impl Future<Output = ()>;
}

/// Why a connected session is being torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Timeout,
    Interrupt,
}

impl fmt::Display for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Teardown::Timeout => write!(f, "time limit reached"),
            Teardown::Interrupt => write!(f, "interrupted"),
        }
    }
}

/// Terminal state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The dial command failed, nothing was torn down
    ConnectFailed,
    /// The dialer process exited before any teardown was requested
    DialerExited { success: bool },
    /// A teardown ran; `clean` is false if the hang-up failed
    Disconnected { cause: Teardown, clean: bool },
    /// The session broke while connected and was hung up
    Aborted,
}

impl SessionOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionOutcome::ConnectFailed | SessionOutcome::Aborted => 1,
            SessionOutcome::DialerExited { success } => u8::from(!success),
            SessionOutcome::Disconnected { clean, .. } => u8::from(!clean),
        }
    }
}

enum Waited {
    Teardown(Teardown),
    Exited(Result<ExitStatus, SessionError>),
}

/// Runs one dial session to completion
#[derive(Debug, Clone)]
pub struct SessionController {
    bound: Option<Duration>,
}

impl SessionController {
    pub fn new(budget: TimeBudget) -> Self {
        Self::with_bound(budget.as_duration())
    }

    /// Controller with an explicit wait bound, `None` waits until interrupted
    pub fn with_bound(bound: Option<Duration>) -> Self {
        Self { bound }
    }

    pub async fn run<D, I>(&self, dialer: &mut D, interrupt: &mut I) -> SessionOutcome
    where
        D: Dialer,
        I: Interrupt,
    {
        info!("Connecting: {}", dialer.describe());

        let dialed = tokio::select! {
            result = dialer.dial() => Some(result),
            () = interrupt.arrived() => None,
        };

        let cause = match dialed {
            Some(Err(e)) => {
                error!("Connection failed: {}", e);
                return SessionOutcome::ConnectFailed;
            }
            None => {
                warn!("Interrupted while connecting, disconnecting");
                Teardown::Interrupt
            }
            Some(Ok(())) => match self.wait(dialer, interrupt).await {
                Waited::Teardown(cause) => cause,
                Waited::Exited(Ok(status)) => return dialer_exited(status),
                Waited::Exited(Err(e)) => {
                    error!("Session failed: {}", e);
                    hang_up(dialer, interrupt).await;
                    return SessionOutcome::Aborted;
                }
            },
        };

        let clean = hang_up(dialer, interrupt).await;
        if clean {
            info!("Disconnected ({})", cause);
        }
        SessionOutcome::Disconnected { cause, clean }
    }

    async fn wait<D, I>(&self, dialer: &mut D, interrupt: &mut I) -> Waited
    where
        D: Dialer,
        I: Interrupt,
    {
        match self.bound {
            Some(bound) => info!("Connected, session limited to {:?}", bound),
            None => info!("Connected, no session time limit"),
        }

        let deadline = async {
            match self.bound {
                Some(bound) => tokio::time::sleep(bound).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = deadline => {
                warn!("Session ended, disconnecting");
                Waited::Teardown(Teardown::Timeout)
            }
            () = interrupt.arrived() => {
                warn!("Interrupted, disconnecting");
                Waited::Teardown(Teardown::Interrupt)
            }
            result = dialer.ended() => Waited::Exited(result),
        }
    }
}

/// Hang up, giving up if another interrupt arrives first
async fn hang_up<D, I>(dialer: &mut D, interrupt: &mut I) -> bool
where
    D: Dialer,
    I: Interrupt,
{
    let result = tokio::select! {
        biased;
        result = dialer.hang_up() => Some(result),
        () = interrupt.arrived() => None,
    };
    match result {
        Some(Ok(())) => true,
        Some(Err(e)) => {
            error!("Disconnect failed: {}", e);
            false
        }
        None => {
            error!("Interrupted again, gave up stopping {}", dialer.describe());
            false
        }
    }
}

fn dialer_exited(status: ExitStatus) -> SessionOutcome {
    if status.success() {
        info!("Dialer exited");
        SessionOutcome::DialerExited { success: true }
    } else {
        error!("Dialer exited with {}", status);
        SessionOutcome::DialerExited { success: false }
    }
}

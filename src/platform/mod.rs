//! Platform-specific session implementations
//!
//! The host platform is detected once at startup into a closed [`Platform`]
//! value. Each variant knows how to write its native profile, build its
//! dialer and run it through the [`SessionController`].
//!
//! [`SessionController`]: crate::session::SessionController

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

use crate::config::Config;
use crate::credential::Identity;
use crate::session::{Interrupt, SessionOutcome, TimeBudget};
use crate::vpn::ProfileError;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Do not know how to connect on \"{0}\" platform")]
    UnsupportedPlatform(String),
    #[error("Failed to write connection profile: {0}")]
    ProfileError(#[from] ProfileError),
    #[cfg(unix)]
    #[error("Failed to set up credential channel: {0}")]
    ChannelError(#[from] crate::credential::ChannelError),
}

/// Host platforms with a native PPTP dialer we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// pppd with the secret handed over through a FIFO
    Posix,
    /// rasdial with a per-user phonebook
    Windows,
}

impl Platform {
    /// Detect the platform this binary is running on
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Result<Self, PlatformError> {
        match os {
            "linux" => Ok(Platform::Posix),
            "windows" => Ok(Platform::Windows),
            other => Err(PlatformError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Write the native profile and run one session to completion
    ///
    /// Returns an error only for setup failures that happen before dialing.
    /// Everything after that is folded into the [`SessionOutcome`].
    pub async fn connect<I: Interrupt>(
        self,
        config: &Config,
        identity: &Identity,
        budget: TimeBudget,
        interrupt: &mut I,
    ) -> Result<SessionOutcome, PlatformError> {
        match self {
            Platform::Posix => {
                #[cfg(target_os = "linux")]
                {
                    linux::connect(config, identity, budget, interrupt).await
                }
                #[cfg(not(target_os = "linux"))]
                {
                    let _ = (config, identity, budget, interrupt);
                    Err(PlatformError::UnsupportedPlatform(self.to_string()))
                }
            }
            Platform::Windows => {
                #[cfg(target_os = "windows")]
                {
                    windows::connect(config, identity, budget, interrupt).await
                }
                #[cfg(not(target_os = "windows"))]
                {
                    let _ = (config, identity, budget, interrupt);
                    Err(PlatformError::UnsupportedPlatform(self.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Posix => write!(f, "Linux"),
            Platform::Windows => write!(f, "Windows"),
        }
    }
}

//! Windows session: rasdial with a per-user phonebook
//!
//! rasdial only accepts the password on its command line, so there is no
//! side channel here; the log redactor keeps it out of diagnostics.

use super::PlatformError;
use crate::config::Config;
use crate::credential::Identity;
use crate::session::{
    Dialer, Interrupt, SessionController, SessionError, SessionOutcome, TimeBudget,
};
use crate::vpn::PhonebookFile;
use std::future;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::info;

const RASDIAL: &str = "rasdial";

pub async fn connect<I: Interrupt>(
    config: &Config,
    identity: &Identity,
    budget: TimeBudget,
    interrupt: &mut I,
) -> Result<SessionOutcome, PlatformError> {
    let phonebook = PhonebookFile::in_data_dir(&config.vpn.peer_name)?;
    phonebook.write(&config.vpn.peer_name, &config.vpn.server)?;

    let mut dialer = RasDialer::new(
        &config.vpn.peer_name,
        identity.clone(),
        phonebook.path().to_path_buf(),
    );

    let outcome = SessionController::new(budget)
        .run(&mut dialer, interrupt)
        .await;
    Ok(outcome)
}

pub struct RasDialer {
    entry: String,
    identity: Identity,
    phonebook: PathBuf,
}

impl RasDialer {
    pub fn new(entry: &str, identity: Identity, phonebook: PathBuf) -> Self {
        Self {
            entry: entry.to_string(),
            identity,
            phonebook,
        }
    }

    fn phonebook_arg(&self) -> String {
        format!("/phonebook:{}", self.phonebook.display())
    }

    async fn rasdial(&self, args: &[&str]) -> Result<(), SessionError> {
        let status = Command::new(RASDIAL)
            .args(args)
            .status()
            .await
            .map_err(|source| SessionError::Spawn {
                program: RASDIAL.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(SessionError::CommandFailed {
                program: RASDIAL.to_string(),
                status,
            });
        }
        Ok(())
    }
}

impl Dialer for RasDialer {
    fn describe(&self) -> String {
        format!(
            "{} {} {} *** {}",
            RASDIAL,
            self.entry,
            self.identity.login(),
            self.phonebook_arg()
        )
    }

    async fn dial(&mut self) -> Result<(), SessionError> {
        let phonebook = self.phonebook_arg();
        self.rasdial(&[
            self.entry.as_str(),
            self.identity.login(),
            self.identity.secret(),
            phonebook.as_str(),
        ])
        .await
    }

    async fn ended(&mut self) -> Result<ExitStatus, SessionError> {
        // The connection belongs to RAS once rasdial returns
        future::pending().await
    }

    async fn hang_up(&mut self) -> Result<(), SessionError> {
        info!("Disconnecting: {} {} /disconnect", RASDIAL, self.entry);
        self.rasdial(&[self.entry.as_str(), "/disconnect"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_masks_password() {
        let dialer = RasDialer::new(
            "urfu",
            Identity::new("student", "hunter2"),
            PathBuf::from(r"C:\Users\student\AppData\Roaming\urfu.pbk"),
        );

        let described = dialer.describe();

        assert!(described.starts_with("rasdial urfu student *** /phonebook:"));
        assert!(!described.contains("hunter2"));
    }
}

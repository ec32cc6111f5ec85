//! Linux session: pppd driven through a peer file and a secrets FIFO

use super::PlatformError;
use crate::config::Config;
use crate::credential::{ChannelError, CredentialChannel, Identity, SecretWriter};
use crate::session::{
    Dialer, Interrupt, SessionController, SessionError, SessionOutcome, TimeBudget,
};
use crate::vpn::{chap_secret_line, PeerFile};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::future;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

const PPPD: &str = "pppd";

/// Write the peer file, open the credential channel and run the session
///
/// The channel is declared before the dialer so it is removed only after
/// the dialer, and with it the secret writer, is gone.
pub async fn connect<I: Interrupt>(
    config: &Config,
    identity: &Identity,
    budget: TimeBudget,
    interrupt: &mut I,
) -> Result<SessionOutcome, PlatformError> {
    let peer = PeerFile::new(&config.ppp.peers_dir, &config.vpn.peer_name);
    peer.write(&config.vpn.server, identity.login())?;

    let channel = CredentialChannel::acquire(&config.ppp.secrets_path)?;
    let writer = SecretWriter::new(config.ppp.write_attempts, config.ppp.poll_interval());
    let mut dialer = PppDialer::new(
        &config.vpn.peer_name,
        channel.path().to_path_buf(),
        chap_secret_line(identity),
        writer,
    );

    let outcome = SessionController::new(budget)
        .run(&mut dialer, interrupt)
        .await;
    Ok(outcome)
}

type Feeder = JoinHandle<Result<(), ChannelError>>;

/// `pppd nodetach call <peer>` plus the task feeding it credentials
///
/// A failed hand-off ends the session: pppd cannot authenticate without it.
pub struct PppDialer {
    peer: String,
    channel: PathBuf,
    record: String,
    writer: Option<SecretWriter>,
    child: Option<Child>,
    feeder: Option<Feeder>,
}

impl PppDialer {
    pub fn new(peer: &str, channel: PathBuf, record: String, writer: SecretWriter) -> Self {
        Self {
            peer: peer.to_string(),
            channel,
            record,
            writer: Some(writer),
            child: None,
            feeder: None,
        }
    }

    fn start_feeder(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let path = self.channel.clone();
        let record = std::mem::take(&mut self.record);
        self.feeder = Some(tokio::spawn(async move {
            writer.deliver(&path, &record).await
        }));
    }

    /// Abort the feeder, reporting its failure if it already finished
    async fn stop_feeder(&mut self) -> Result<(), SessionError> {
        match self.feeder.take() {
            Some(feeder) if feeder.is_finished() => handed_off(feeder.await),
            Some(feeder) => {
                feeder.abort();
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn terminate(&mut self) -> Result<(), SessionError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };

        info!("Disconnecting: stopping {}", PPPD);
        if let Some(pid) = child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => {
                    return Err(SessionError::Stop {
                        program: PPPD.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let status = child.wait().await?;
        debug!("{} exited with {}", PPPD, status);
        self.child = None;
        Ok(())
    }
}

fn handed_off(joined: Result<Result<(), ChannelError>, JoinError>) -> Result<(), SessionError> {
    match joined {
        Ok(Ok(())) => {
            debug!("Credentials handed to {}", PPPD);
            Ok(())
        }
        Ok(Err(e)) => Err(SessionError::Handoff(e.to_string())),
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(SessionError::Handoff(e.to_string())),
    }
}

impl Dialer for PppDialer {
    fn describe(&self) -> String {
        format!("{} nodetach call {}", PPPD, self.peer)
    }

    async fn dial(&mut self) -> Result<(), SessionError> {
        // Own process group: a terminal Ctrl+C reaches us, not pppd.
        // Killed if the dialer is dropped before pppd was reaped.
        let child = Command::new(PPPD)
            .args(["nodetach", "call", self.peer.as_str()])
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                program: PPPD.to_string(),
                source,
            })?;
        debug!("{} started, pid {:?}", PPPD, child.id());
        self.child = Some(child);
        self.start_feeder();
        Ok(())
    }

    async fn ended(&mut self) -> Result<ExitStatus, SessionError> {
        let joined = match (self.child.as_mut(), self.feeder.as_mut()) {
            (None, _) => return future::pending().await,
            (Some(child), None) => return Ok(child.wait().await?),
            (Some(child), Some(feeder)) => tokio::select! {
                status = child.wait() => return Ok(status?),
                joined = feeder => joined,
            },
        };
        self.feeder = None;
        handed_off(joined)?;

        match self.child.as_mut() {
            Some(child) => Ok(child.wait().await?),
            None => future::pending().await,
        }
    }

    async fn hang_up(&mut self) -> Result<(), SessionError> {
        let handoff = self.stop_feeder().await;
        self.terminate().await?;
        handoff
    }
}

impl Drop for PppDialer {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

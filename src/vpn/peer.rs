//! pppd peer file and chap-secrets record

use super::{quote, write_profile, ProfileError};
use crate::credential::Identity;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options file read by `pppd call <peer>`
pub struct PeerFile {
    path: PathBuf,
}

impl PeerFile {
    pub fn new(peers_dir: &Path, peer_name: &str) -> Self {
        Self {
            path: peers_dir.join(peer_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, server: &str, login: &str) -> Result<(), ProfileError> {
        write_profile(&self.path, &render(server, login))?;
        info!("Wrote connection info to {}", self.path.display());
        Ok(())
    }
}

/// PPTP over pppd: one attempt, MS-CHAPv2 only, all traffic via the tunnel
fn render(server: &str, login: &str) -> String {
    let pty = format!("pptp {} --nolaunchpppd", server);
    format!(
        "pty {}\n\
         name {}\n\
         maxfail 1\n\
         persist\n\
         require-mschap-v2\n\
         defaultroute\n\
         replacedefaultroute\n\
         noauth\n",
        quote(&pty),
        quote(login)
    )
}

/// One chap-secrets line: client, any server, secret
pub fn chap_secret_line(identity: &Identity) -> String {
    format!(
        "{} * {}\n",
        quote(identity.login()),
        quote(identity.secret())
    )
}

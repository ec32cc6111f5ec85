//! Native connection profiles for the OS dialers
//!
//! - `peer`: pppd peer options and the chap-secrets record
//! - `phonebook`: RAS phonebook entry for `rasdial`
//!
//! Profiles are plain templates. They are rewritten on every run and left
//! in place afterwards; none of them carries the password.

pub mod peer;
pub mod phonebook;

pub use peer::{chap_secret_line, PeerFile};
pub use phonebook::PhonebookFile;

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot locate the application data directory")]
    NoDataDir,
}

/// Write `content` to `path`, creating parent directories as needed
fn write_profile(path: &Path, content: &str) -> Result<(), ProfileError> {
    let wrap = |source: io::Error| ProfileError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, content).map_err(wrap)
}

/// Quote a value for pppd's option and secrets file syntax
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

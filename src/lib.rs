//! UrFU VPN - PPTP connector for the UrFU remote access endpoint
//!
//! The tool does not speak PPTP itself. It writes the native connection
//! profile, starts the operating system's dialer, hands it the password and
//! hangs up after a time limit or on Ctrl+C.
//!
//! # Architecture
//!
//! - `cli`: Command-line arguments
//! - `config`: Configuration file handling (TOML)
//! - `logging`: Subscriber setup and secret redaction
//! - `credential`: Login/password and the named-pipe hand-off to pppd
//! - `session`: Time budget and the dial/wait/hang-up controller
//! - `vpn`: pppd peer file and RAS phonebook profiles
//! - `platform`: Linux (pppd) and Windows (rasdial) sessions
//!
//! # Usage
//!
//! ```bash
//! sudo urfu-vpn STUDENT_LOGIN --connect-time 120
//! ```

pub mod cli;
pub mod config;
pub mod credential;
pub mod logging;
pub mod platform;
pub mod session;
pub mod vpn;

pub use config::Config;
pub use credential::Identity;
pub use platform::Platform;
pub use session::{SessionController, SessionOutcome, TimeBudget};

//! Ctrl+C as a session interrupt

use super::Interrupt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;

/// Process-wide Ctrl+C handler bridged into the async controller
///
/// The handler stores a wakeup even when nothing is waiting yet, so a
/// Ctrl+C pressed while the dialer is still starting is seen by the wait.
pub struct CtrlC {
    notify: Arc<Notify>,
}

impl CtrlC {
    /// Install the handler. Can only succeed once per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let notify = Arc::new(Notify::new());
        let handler = Arc::clone(&notify);
        ctrlc::set_handler(move || handler.notify_one())?;
        Ok(Self::with_notify(notify))
    }

    fn with_notify(notify: Arc<Notify>) -> Self {
        Self { notify }
    }
}

impl Interrupt for CtrlC {
    fn arrived(&mut self) -> impl Future<Output = ()> {
        self.notify.notified()
    }
}

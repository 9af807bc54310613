use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// The one pending reconnect attempt of a shard. Scheduling a new attempt always cancels the
/// previous one first so a shard never ends up with two sockets.
#[derive(Default)]
pub struct ReconnectTimer {
    pending: Option<JoinHandle<()>>,
}

impl ReconnectTimer {
    /// Schedule an attempt after `delay`, the receiver fires once it is due. A cancelled attempt
    /// drops its sender so the receiver resolves to an error.
    pub fn schedule(&mut self, delay: Duration) -> oneshot::Receiver<()> {
        self.cancel();
        let (sender, receiver) = oneshot::channel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(());
        }));
        receiver
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |pending| !pending.is_finished())
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Change notifications from bound collections to the digest driver.
//!
//! Only collection mutations notify. Filter values and column visibility go
//! through `&mut TableController`, which the driver holds while it runs, so the
//! next digest after those calls already sees them.

use tokio::sync::mpsc;

/// Queued notifications past this are dropped; one digest covers them all.
const CHANGE_BUFFER: usize = 8;

/// Notifying half, installed into collections. Clones share the channel.
#[derive(Clone, Debug)]
pub struct ChangeSender {
    tx: mpsc::Sender<()>,
}

impl ChangeSender {
    /// Tell the driver a collection changed. Never blocks.
    pub fn notify(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Receiving half, owned by [`drive`](crate::drive).
#[derive(Debug)]
pub struct ChangeReceiver {
    rx: mpsc::Receiver<()>,
}

impl ChangeReceiver {
    /// Wait for the next change. `None` once every sender is dropped.
    pub async fn changed(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Discard the notifications queued behind the one just received.
    pub fn coalesce(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Create a notifier pair for one driver.
pub fn channel() -> (ChangeSender, ChangeReceiver) {
    let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
    (ChangeSender { tx }, ChangeReceiver { rx })
}

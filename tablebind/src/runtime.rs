//! Async digest driver.
//!
//! [`drive`] owns the update loop of one table: it digests, then sleeps
//! until the compile flush is due, a bound collection changes or it is
//! cancelled. Install the sending half of a [`notify::channel`] into every
//! collection the host binds with
//! [`Collection::install_notifier`](crate::Collection::install_notifier).
//!
//! [`notify::channel`]: crate::notify::channel

use std::time::Instant;

use log::{debug, trace};
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;

use crate::controller::TableController;
use crate::notify::ChangeReceiver;
use crate::widget::HostScope;

/// Sleep until a deadline, or wait forever if None.
async fn sleep_until_optional(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(tokio::time::Instant::from_std(d)).await,
        None => std::future::pending::<()>().await,
    }
}

/// Drive a controller until `cancel` fires or the table is torn down.
///
/// Returns the number of digests run.
pub async fn drive<T: 'static, S: HostScope<T> + 'static>(
    controller: &mut TableController<T, S>,
    changes: &mut ChangeReceiver,
    cancel: CancellationToken,
) -> u64 {
    let mut digests = 0;
    let mut closed = false;

    loop {
        let report = controller.digest();
        digests += 1;
        if !report.is_idle() {
            trace!("Digest {}: {:?}", digests, report);
        }
        if controller.lifecycle().is_disposed() {
            debug!("Table {} disposed, driver stopping", controller.id());
            break;
        }

        let deadline = controller.next_flush();
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Driver for table {} cancelled", controller.id());
                break;
            }

            changed = changes.changed(), if !closed => {
                match changed {
                    Some(()) => {
                        let dropped = changes.coalesce();
                        trace!("Collection changed, {} notifications coalesced", dropped);
                    }
                    None => {
                        debug!("Change channel closed");
                        closed = true;
                    }
                }
            }

            _ = sleep_until_optional(deadline) => {}
        }
    }

    digests
}

mod common;

use std::time::Duration;

use tablebind::notify;
use tablebind::{RowItem, TableSetup, TableWidget, drive};
use tokio_util::sync::CancellationToken;

use common::{Controller, EXPRESSION, Fixture, date, options, request, requests};

/// Controller on the wall clock, so flush deadlines line up with tokio timers.
fn controller(fixture: &Fixture) -> Controller {
    TableSetup::new(
        EXPRESSION,
        options(),
        fixture.scope.clone(),
        fixture.factory.clone(),
        fixture.compiler.clone(),
    )
    .build()
    .unwrap()
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_driver_compiles_and_follows_changes() {
    let fixture = Fixture::new(requests());
    let mut controller = controller(&fixture);
    let (sender, mut receiver) = notify::channel();
    fixture.collection.install_notifier(sender);

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let collection = fixture.collection.clone();
    let compiler = fixture.compiler.clone();
    let host = async move {
        wait_until(|| compiler.records().len() == 6).await;
        collection.push(RowItem::new(request("late", "b", date(2020, 7, 1))));
        wait_until(|| compiler.records().len() == 7).await;
        stop.cancel();
    };

    let (digests, ()) = tokio::join!(drive(&mut controller, &mut receiver, cancel), host);

    assert!(digests >= 4);
    assert_eq!(controller.flush_count(), 2);
    assert_eq!(fixture.table().row_count(), 7);
    assert_eq!(controller.pending_compiles(), 0);
}

#[tokio::test]
async fn test_driver_stops_when_cancelled() {
    let fixture = Fixture::new(Vec::new());
    fixture.scope.unbind("requests");
    let mut controller = controller(&fixture);
    let (_sender, mut receiver) = notify::channel();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let digests = drive(&mut controller, &mut receiver, cancel).await;
    assert_eq!(digests, 1);
}

#[tokio::test]
async fn test_closed_channel_does_not_spin() {
    let fixture = Fixture::new(requests());
    let mut controller = controller(&fixture);
    let (sender, mut receiver) = notify::channel();
    drop(sender);

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let host = async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel();
    };
    let (digests, ()) = tokio::join!(drive(&mut controller, &mut receiver, cancel), host);

    // initial bind, the flush, then at most one turn for the closed channel
    assert!(digests <= 4, "ran {digests} digests");
    assert_eq!(controller.flush_count(), 1);
}

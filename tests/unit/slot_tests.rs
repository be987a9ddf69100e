//! Unit tests for the single-slot response handoff.

use repl_uplink::session::slot::{ResponseSlot, SlotValue};
use repl_uplink::AppError;

/// Arming installs a receiver; fulfilling delivers the value to it exactly
/// once.
#[tokio::test]
async fn arm_then_fulfill_delivers_value() {
    let slot = ResponseSlot::new();
    let receiver = slot.arm().expect("arming an empty slot must succeed");

    assert!(slot.fulfill(SlotValue::Response("payload".to_owned())));

    let value = receiver.await.expect("value must be delivered");
    assert_eq!(value, SlotValue::Response("payload".to_owned()));
    assert!(!slot.is_armed(), "fulfillment must consume the slot");
}

/// The protocol is non-pipelined: a second arm while a call is outstanding
/// is refused.
#[test]
fn second_arm_while_outstanding_is_refused() {
    let slot = ResponseSlot::new();
    let _receiver = slot.arm().expect("first arm must succeed");

    let result = slot.arm();
    assert!(
        matches!(result, Err(AppError::Protocol(_))),
        "second arm must be a protocol error, got: {result:?}"
    );
}

/// Fulfilling with nothing armed reports the value as dropped.
#[test]
fn fulfill_without_arm_reports_dropped() {
    let slot = ResponseSlot::new();
    assert!(!slot.fulfill(SlotValue::Closed));
}

/// A second fulfill after the first finds the slot already consumed.
#[test]
fn fulfill_consumes_the_slot() {
    let slot = ResponseSlot::new();
    let _receiver = slot.arm().expect("arm must succeed");

    assert!(slot.fulfill(SlotValue::Closed));
    assert!(
        !slot.fulfill(SlotValue::Closed),
        "the slot is write-once; a second fulfill must find it empty"
    );
}

/// Disarming releases the slot so a later call can arm it again.
#[test]
fn disarm_releases_the_slot() {
    let slot = ResponseSlot::new();
    let _receiver = slot.arm().expect("arm must succeed");

    slot.disarm();
    assert!(!slot.is_armed());
    assert!(slot.arm().is_ok(), "a disarmed slot must accept a new arm");
}

/// Fulfilling after the receiver was dropped reports failure — the waiting
/// call gave up, so the value has nowhere to go.
#[test]
fn fulfill_after_receiver_dropped_reports_failure() {
    let slot = ResponseSlot::new();
    let receiver = slot.arm().expect("arm must succeed");
    drop(receiver);

    assert!(!slot.fulfill(SlotValue::Response("late".to_owned())));
}

/// A slot abandoned by a cancelled caller (receiver dropped, never
/// fulfilled) is reclaimed by the next arm instead of wedging the
/// connection.
#[test]
fn abandoned_slot_can_be_rearmed() {
    let slot = ResponseSlot::new();
    let receiver = slot.arm().expect("first arm must succeed");
    drop(receiver);

    assert!(
        slot.arm().is_ok(),
        "an abandoned slot must be reclaimable by the next call"
    );
}

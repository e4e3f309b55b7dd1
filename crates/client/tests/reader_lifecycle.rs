//! Integration tests for the reader path

mod common;

use common::{harness, seed_stream, stream};
use rill_client::ClientError;
use rill_engine::{EngineError, StreamEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

#[tokio::test]
async fn reads_a_full_slice_then_idempotent_end() {
    let h = harness();
    seed_stream(&h, 1, &[b"one", b"two", b"three"]).await;

    let reader = h.client.create_reader(stream()).unwrap();
    let reader_handle = reader.handle().unwrap();

    let mut slice = reader.next_slice().await.unwrap();
    let slice_handle = slice.handle().unwrap();

    assert_eq!(slice.next_event().unwrap().unwrap(), b"one");
    assert_eq!(slice.next_event().unwrap().unwrap(), b"two");
    assert_eq!(slice.next_event().unwrap().unwrap(), b"three");
    assert_eq!(slice.next_event().unwrap(), None);
    assert_eq!(slice.next_event().unwrap(), None);

    slice.close();
    reader.close();

    assert_eq!(h.engine.slice_release_count(slice_handle), 1);
    assert_eq!(h.engine.reader_release_count(reader_handle), 1);
    assert_eq!(h.registry.in_flight(), 0);
}

#[tokio::test]
async fn double_close_releases_resources_once() {
    let h = harness();
    seed_stream(&h, 1, &[b"x"]).await;

    let reader = h.client.create_reader(stream()).unwrap();
    let reader_handle = reader.handle().unwrap();
    let mut slice = reader.next_slice().await.unwrap();
    let slice_handle = slice.handle().unwrap();

    slice.close();
    slice.close();
    reader.close();
    reader.close();
    assert_eq!(h.engine.slice_release_count(slice_handle), 1);
    assert_eq!(h.engine.reader_release_count(reader_handle), 1);

    // Drop after an explicit close must not release again.
    drop(slice);
    drop(reader);
    assert_eq!(h.engine.slice_release_count(slice_handle), 1);
    assert_eq!(h.engine.reader_release_count(reader_handle), 1);
}

#[tokio::test]
async fn operations_after_close_are_defined_failures() {
    let h = harness();
    seed_stream(&h, 1, &[b"x"]).await;

    let reader = h.client.create_reader(stream()).unwrap();
    let mut slice = reader.next_slice().await.unwrap();

    slice.close();
    assert_eq!(slice.next_event(), Err(ClientError::SliceClosed));

    reader.close();
    assert!(matches!(
        reader.next_slice().await,
        Err(ClientError::ReaderClosed)
    ));
}

#[tokio::test]
async fn rejected_submission_fails_fast_and_leaks_nothing() {
    let h = harness();
    seed_stream(&h, 1, &[]).await;

    let reader = h.client.create_reader(stream()).unwrap();
    let handle = reader.handle().unwrap();

    // Pull the engine-side rug out so the next submission is rejected
    // synchronously, before it ever reaches dispatch.
    h.engine.release_reader(handle);

    assert!(matches!(
        reader.next_slice().await,
        Err(ClientError::Rejected(EngineError::UnknownReader(_)))
    ));
    assert_eq!(h.registry.in_flight(), 0);
}

#[tokio::test]
async fn delivered_failure_surfaces_and_leaves_registry_empty() {
    let h = harness();
    seed_stream(&h, 1, &[b"x"]).await;

    let reader = h.client.create_reader(stream()).unwrap();
    h.engine
        .inject_slice_failure(EngineError::SegmentUnavailable("segment 0 moved".into()));

    assert!(matches!(
        reader.next_slice().await,
        Err(ClientError::Engine(EngineError::SegmentUnavailable(_)))
    ));
    assert_eq!(h.registry.in_flight(), 0);
}

#[tokio::test]
async fn close_cancels_in_flight_requests_and_drops_late_delivery() {
    let h = harness();
    // No data: the slice request parks engine-side and stays in flight.
    seed_stream(&h, 1, &[]).await;

    let reader = Arc::new(h.client.create_reader(stream()).unwrap());
    let waiter = tokio::spawn({
        let reader = reader.clone();
        async move { reader.next_slice().await.map(|_| ()) }
    });

    // Let the request reach the parked state before closing.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.registry.in_flight(), 1);

    reader.close();
    assert!(matches!(waiter.await.unwrap(), Err(ClientError::Canceled)));
    assert_eq!(h.registry.in_flight(), 0);

    // Data arriving now wakes the parked request; its delivery must be
    // dropped as unknown instead of panicking the dispatch task.
    let mut writer = h.client.create_writer(stream()).unwrap();
    writer.write_event(b"late".to_vec(), None).await.unwrap();
    writer.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The engine keeps serving fresh readers afterwards.
    let reader = h.client.create_reader(stream()).unwrap();
    let mut slice = reader.next_slice().await.unwrap();
    assert_eq!(slice.next_event().unwrap().unwrap(), b"late");
}

#[tokio::test]
async fn event_stream_tails_across_slices() {
    let h = harness();
    seed_stream(&h, 1, &[b"a", b"b"]).await;

    let reader = h.client.create_reader(stream()).unwrap();
    let mut events = std::pin::pin!(reader.event_stream());
    assert_eq!(events.next().await.unwrap().unwrap(), b"a");
    assert_eq!(events.next().await.unwrap().unwrap(), b"b");

    // The next poll fetches a fresh slice, which parks until data arrives.
    let mut writer = h.client.create_writer(stream()).unwrap();
    writer.write_event(b"c".to_vec(), None).await.unwrap();
    assert_eq!(events.next().await.unwrap().unwrap(), b"c");
}

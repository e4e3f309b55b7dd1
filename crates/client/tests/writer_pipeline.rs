//! Integration tests for the writer path

mod common;

use common::{harness, seed_stream, stream};
use rill_client::{ClientConfig, ClientError, OperationRegistry, StreamClient};
use rill_engine::{MockEngine, StreamId};
use std::sync::Arc;

#[tokio::test]
async fn writes_are_acknowledged_and_readable() {
    let h = harness();
    seed_stream(&h, 1, &[]).await;

    let mut writer = h.client.create_writer(stream()).unwrap();
    for i in 0..20u8 {
        let written = writer.write_event(vec![i], None).await.unwrap();
        assert_eq!(written, 1);
    }
    writer.flush().await.unwrap();

    let reader = h.client.create_reader(stream()).unwrap();
    let mut slice = reader.next_slice().await.unwrap();
    for i in 0..20u8 {
        assert_eq!(slice.next_event().unwrap().unwrap(), vec![i]);
    }
    assert_eq!(slice.next_event().unwrap(), None);
}

#[tokio::test]
async fn small_ack_window_still_delivers_every_append() {
    let registry = Arc::new(OperationRegistry::new());
    let engine = Arc::new(MockEngine::new());
    engine.start(registry.clone());
    let config = ClientConfig::new("tcp://127.0.0.1:9090").with_max_inflight_appends(2);
    let client = StreamClient::new(config, engine.clone(), registry);

    client.create_namespace("analytics").unwrap();
    client.create_stream(&stream(), 1).unwrap();

    let mut writer = client.create_writer(stream()).unwrap();
    for i in 0..10u8 {
        writer.write_event(vec![i], None).await.unwrap();
    }
    writer.flush().await.unwrap();

    let reader = client.create_reader(stream()).unwrap();
    let mut slice = reader.next_slice().await.unwrap();
    let mut count = 0;
    while slice.next_event().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 10);
}

#[tokio::test]
async fn write_after_close_is_a_defined_failure() {
    let h = harness();
    seed_stream(&h, 1, &[]).await;

    let mut writer = h.client.create_writer(stream()).unwrap();
    let handle = writer.handle().unwrap();
    writer.close();
    writer.close();

    assert!(matches!(
        writer.write_event(b"x".to_vec(), None).await,
        Err(ClientError::WriterClosed)
    ));
    assert_eq!(h.engine.writer_release_count(handle), 1);
}

#[tokio::test]
async fn per_key_order_is_preserved_across_a_segmented_stream() {
    let h = harness();
    h.client.create_namespace("analytics").unwrap();
    let keyed = StreamId::new("analytics", "orders");
    h.client.create_stream(&keyed, 4).unwrap();

    let mut writer = h.client.create_writer(keyed.clone()).unwrap();
    for payload in [&b"created"[..], b"paid", b"shipped"] {
        writer
            .write_event(payload.to_vec(), Some("order-17".to_string()))
            .await
            .unwrap();
    }
    writer.flush().await.unwrap();

    let reader = h.client.create_reader(keyed).unwrap();
    let mut slice = reader.next_slice().await.unwrap();
    assert_eq!(slice.next_event().unwrap().unwrap(), b"created");
    assert_eq!(slice.next_event().unwrap().unwrap(), b"paid");
    assert_eq!(slice.next_event().unwrap().unwrap(), b"shipped");
    assert_eq!(slice.next_event().unwrap(), None);
}

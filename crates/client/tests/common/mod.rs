//! Common wiring for client integration tests

use rill_client::{ClientConfig, OperationRegistry, StreamClient};
use rill_engine::{MockEngine, StreamId};
use std::sync::Arc;

/// Engine, registry and client wired together the way an application does it
pub struct TestHarness {
    pub engine: Arc<MockEngine>,
    pub registry: Arc<OperationRegistry>,
    pub client: StreamClient<MockEngine>,
}

pub fn harness() -> TestHarness {
    let registry = Arc::new(OperationRegistry::new());
    let engine = Arc::new(MockEngine::new());
    engine.start(registry.clone());
    let client = StreamClient::new(
        ClientConfig::new("tcp://127.0.0.1:9090"),
        engine.clone(),
        registry.clone(),
    );
    TestHarness {
        engine,
        registry,
        client,
    }
}

pub fn stream() -> StreamId {
    StreamId::new("analytics", "page-views")
}

/// Create the namespace and stream, then append `events` through a writer.
pub async fn seed_stream(harness: &TestHarness, segments: u32, events: &[&[u8]]) {
    harness.client.create_namespace("analytics").unwrap();
    harness.client.create_stream(&stream(), segments).unwrap();

    let mut writer = harness.client.create_writer(stream()).unwrap();
    for event in events {
        writer.write_event(event.to_vec(), None).await.unwrap();
    }
    writer.flush().await.unwrap();
    writer.close();
}

// tests/ingest_flow.rs

//! End-to-end write path over the in-memory transport and store: publish
//! sensor payloads, let the subscriber loop persist them, inspect the tree.

use serde_json::json;
use tokio::time::{sleep, timeout, Duration};

use growhouse_bridge::{
    // ---
    create_memory_store,
    create_memory_transport,
    BridgeConfig,
    Channel,
    Message,
    StorePtr,
    spawn_subscriber_loop,
};

/// Poll the store until the channel's log holds `expected` records.
///
/// Ingestion is asynchronous relative to publish, so assertions wait for
/// the write to land rather than racing it.
async fn wait_for_log_len(store: &StorePtr, channel: Channel, expected: usize) {
    // ---
    let deadline = async {
        loop {
            let len = store.children(&channel.log_path()).await.unwrap().len();
            if len >= expected {
                return len;
            }
            sleep(Duration::from_millis(5)).await;
        }
    };

    let len = timeout(Duration::from_secs(2), deadline)
        .await
        .expect("timed out waiting for ingestion");
    assert_eq!(len, expected);
}

#[tokio::test]
async fn reading_lands_in_log_and_live_slot() {
    // ---
    // Arrange
    // ---
    let config = BridgeConfig::memory();
    let transport = create_memory_transport().await.unwrap();
    let store = create_memory_store().await.unwrap();

    let _loop = spawn_subscriber_loop(transport.clone(), store.clone(), &config)
        .await
        .unwrap();

    // ---
    // Act
    // ---
    transport
        .publish(Message::text("growhouse/temp", "23.5"))
        .await
        .unwrap();

    // ---
    // Assert
    // ---
    wait_for_log_len(&store, Channel::Temp, 1).await;

    let (_, record) = store.children("temp").await.unwrap().remove(0);
    assert_eq!(record["value"], json!(23.5));
    assert!(record["timestamp"].as_f64().unwrap() > 0.0);

    assert_eq!(store.get("live/temp").await.unwrap(), Some(json!(23.5)));
}

#[tokio::test]
async fn nan_sentinel_is_recorded_as_zero() {
    // ---
    let config = BridgeConfig::memory();
    let transport = create_memory_transport().await.unwrap();
    let store = create_memory_store().await.unwrap();

    let _loop = spawn_subscriber_loop(transport.clone(), store.clone(), &config)
        .await
        .unwrap();

    transport
        .publish(Message::text("growhouse/humidity", "nan"))
        .await
        .unwrap();

    wait_for_log_len(&store, Channel::Humidity, 1).await;

    assert_eq!(store.get("live/humidity").await.unwrap(), Some(json!(0.0)));
}

#[tokio::test]
async fn live_slot_is_last_write_wins() {
    // ---
    let config = BridgeConfig::memory();
    let transport = create_memory_transport().await.unwrap();
    let store = create_memory_store().await.unwrap();

    let _loop = spawn_subscriber_loop(transport.clone(), store.clone(), &config)
        .await
        .unwrap();

    for payload in ["20.0", "21.0", "22.0"] {
        transport
            .publish(Message::text("growhouse/temp", payload))
            .await
            .unwrap();
    }

    wait_for_log_len(&store, Channel::Temp, 3).await;

    // Full history retained, only the latest value live.
    assert_eq!(store.children("temp").await.unwrap().len(), 3);
    assert_eq!(store.get("live/temp").await.unwrap(), Some(json!(22.0)));
}

#[tokio::test]
async fn malformed_payload_is_dropped_and_loop_continues() {
    // ---
    // Arrange
    // ---
    let config = BridgeConfig::memory();
    let transport = create_memory_transport().await.unwrap();
    let store = create_memory_store().await.unwrap();

    let _loop = spawn_subscriber_loop(transport.clone(), store.clone(), &config)
        .await
        .unwrap();

    // ---
    // Act: garbage first, then a valid reading on the same channel.
    // ---
    transport
        .publish(Message::text("growhouse/temp", "offline"))
        .await
        .unwrap();
    transport
        .publish(Message::text("growhouse/temp", "19.25"))
        .await
        .unwrap();

    // ---
    // Assert: the bad message added nothing; the next one got through.
    // ---
    wait_for_log_len(&store, Channel::Temp, 1).await;

    let (_, record) = store.children("temp").await.unwrap().remove(0);
    assert_eq!(record["value"], json!(19.25));
}

#[tokio::test]
async fn readings_for_different_channels_stay_separate() {
    // ---
    let config = BridgeConfig::memory();
    let transport = create_memory_transport().await.unwrap();
    let store = create_memory_store().await.unwrap();

    let _loop = spawn_subscriber_loop(transport.clone(), store.clone(), &config)
        .await
        .unwrap();

    transport
        .publish(Message::text("growhouse/tempout", "4.5"))
        .await
        .unwrap();
    transport
        .publish(Message::text("growhouse/humout", "81.0"))
        .await
        .unwrap();

    wait_for_log_len(&store, Channel::TempOut, 1).await;
    wait_for_log_len(&store, Channel::HumOut, 1).await;

    assert_eq!(store.get("live/tempout").await.unwrap(), Some(json!(4.5)));
    assert_eq!(store.get("live/humout").await.unwrap(), Some(json!(81.0)));
    assert!(store.children("temp").await.unwrap().is_empty());
}

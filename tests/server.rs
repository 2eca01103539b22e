//! Websocket server round trip: producer → pipeline → viewers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use trafficwatch::model::ObjectCount;
use trafficwatch::{MemoryStore, NewCamera, RecordStore, ServerConfig, TrafficServer};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
    ws
}

async fn wait_for_subscribers(server: &TrafficServer<ObjectCount>, n: usize) {
    for _ in 0..500 {
        if server.registry().subscriber_count().await == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscribers never reached {}", n);
}

#[tokio::test]
async fn detections_and_frames_round_trip() {
    let store = Arc::new(MemoryStore::<ObjectCount>::new());
    store.create_camera(NewCamera::new("CAM-1")).await.unwrap();
    store.create_camera(NewCamera::new("CAM-2")).await.unwrap();

    let config = ServerConfig::default()
        .ingest_workers(2)
        .shutdown_grace(Duration::from_millis(500));
    let server = Arc::new(TrafficServer::<ObjectCount>::new(config, store.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let running = {
        let server = server.clone();
        tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        })
    };

    let mut global = connect(addr, "/trafficcamerarecords").await;
    let mut cam2 = connect(addr, "/trafficcamerarecords/CAM-2").await;
    let mut frames = connect(addr, "/camera/frames/CAM-1").await;
    wait_for_subscribers(&server, 3).await;

    let mut producer = connect(addr, "/ingest/detections").await;
    producer
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    producer
        .send(Message::Text(
            r#"{"label":"CAM-1","timestamp":"2024-05-01T12:00:00Z","objectsDetected":7}"#.into(),
        ))
        .await
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(5), global.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = match message {
        Message::Text(text) => text,
        other => panic!("unexpected message: {:?}", other),
    };
    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(json["label"], "CAM-1");
    assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    assert_eq!(json["objectsDetected"], 7);

    assert!(
        tokio::time::timeout(Duration::from_millis(200), cam2.next())
            .await
            .is_err(),
        "CAM-2 subscriber must not see CAM-1 records"
    );

    let camera = store.find_by_label("CAM-1").await.unwrap().unwrap();
    assert_eq!(camera.records.len(), 1);
    assert_eq!(server.stats().snapshot().rejected_input, 1);

    let mut frame_producer = connect(addr, "/ingest/frames/CAM-1").await;
    frame_producer
        .send(Message::Binary(vec![0xff, 0xd8, 0x01].into()))
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match frame {
        Message::Binary(data) => assert_eq!(&data[..], &[0xff, 0xd8, 0x01]),
        other => panic!("unexpected message: {:?}", other),
    }

    for mut client in [global, cam2, frames, producer, frame_producer] {
        let _ = client.close(None).await;
    }
    wait_for_subscribers(&server, 0).await;

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn subscriber_limit_refuses_extra_viewers() {
    let store: Arc<dyn RecordStore<ObjectCount>> = Arc::new(MemoryStore::<ObjectCount>::new());
    let server = Arc::new(TrafficServer::new(
        ServerConfig::default().max_subscribers(1),
        store,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let running = {
        let server = server.clone();
        tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        })
    };

    let mut first = connect(addr, "/trafficcamerarecords").await;
    wait_for_subscribers(&server, 1).await;

    // Refused viewers are disconnected right after the upgrade
    let mut second = connect(addr, "/trafficcamerarecords").await;
    let closed = tokio::time::timeout(Duration::from_secs(5), second.next())
        .await
        .unwrap();
    assert!(!matches!(closed, Some(Ok(Message::Text(_)))));
    assert_eq!(server.registry().subscriber_count().await, 1);

    let _ = first.close(None).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn evicted_viewer_is_disconnected() {
    let store = Arc::new(MemoryStore::<ObjectCount>::new());
    let config = ServerConfig::default()
        .send_timeout(Duration::from_millis(300))
        .viewer_queue_capacity(1)
        .shutdown_grace(Duration::from_millis(500));
    let server = Arc::new(TrafficServer::<ObjectCount>::new(config, store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let running = {
        let server = server.clone();
        tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        })
    };

    // Connects, then stops reading
    let mut viewer = connect(addr, "/camera/frames/CAM-1").await;
    wait_for_subscribers(&server, 1).await;

    let frame_len = 4 * 1024 * 1024;
    let frame = vec![0xab_u8; frame_len];
    let mut producer = connect(addr, "/ingest/frames/CAM-1").await;
    for _ in 0..12 {
        producer
            .send(Message::Binary(frame.clone().into()))
            .await
            .unwrap();
    }

    wait_for_subscribers(&server, 0).await;
    assert_eq!(server.stats().snapshot().subscribers_evicted, 1);

    // The socket must end: whole frames, then a close or a reset, never a stall
    let ended = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match viewer.next().await {
                Some(Ok(Message::Binary(data))) => assert_eq!(data.len(), frame_len),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "evicted viewer was left connected");

    let _ = producer.close(None).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

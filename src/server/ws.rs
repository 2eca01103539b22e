//! Websocket endpoints
//!
//! Viewer endpoints register a subscriber for the lifetime of the socket.
//! Publishes land in a bounded per-viewer queue drained by a writer task, so
//! a send timeout only ever abandons a queued message, never a half-written
//! frame. Eviction from the registry ends the connection with a close frame.
//!
//! - `/trafficcamerarecords`: every detection record
//! - `/trafficcamerarecords/{label}`: detection records for one camera
//! - `/camera/frames/{label}`: raw frames for one camera (binary messages)
//!
//! Producer endpoints feed the ingestion pipelines:
//! - `/ingest/detections`: JSON detection events as text messages
//! - `/ingest/frames/{label}`: frames as binary messages

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::error::TransportError;
use crate::model::{DetectionEvent, DetectionPayload, FrameEvent};
use crate::registry::{Outbound, Scope, Subscriber, SubscriberRegistry, Transport};
use crate::session::SubscriberSession;
use crate::stats::PipelineStats;

/// Shared state for websocket handlers
pub struct AppState<P> {
    pub registry: Arc<SubscriberRegistry>,
    pub detections: mpsc::Sender<DetectionEvent<P>>,
    pub frames: mpsc::Sender<FrameEvent>,
    pub stats: Arc<PipelineStats>,
    /// Messages buffered per viewer before sends start timing out
    pub viewer_queue_capacity: usize,
    /// How long a closing viewer gets to flush before the socket is dropped
    pub close_timeout: Duration,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            detections: self.detections.clone(),
            frames: self.frames.clone(),
            stats: Arc::clone(&self.stats),
            viewer_queue_capacity: self.viewer_queue_capacity,
            close_timeout: self.close_timeout,
        }
    }
}

/// Build the websocket router
pub fn router<P: DetectionPayload>(state: AppState<P>) -> Router {
    Router::new()
        .route("/trafficcamerarecords", get(global_records::<P>))
        .route("/trafficcamerarecords/{label}", get(camera_records::<P>))
        .route("/camera/frames/{label}", get(camera_frames::<P>))
        .route("/ingest/detections", get(ingest_detections::<P>))
        .route("/ingest/frames/{label}", get(ingest_frames::<P>))
        .with_state(state)
}

/// Transport feeding a viewer's outbound queue
pub struct WsTransport {
    queue: mpsc::Sender<Message>,
}

impl WsTransport {
    pub fn new(queue: mpsc::Sender<Message>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, message: Outbound) -> Result<(), TransportError> {
        let message = match message {
            Outbound::Text(data) => {
                let text =
                    std::str::from_utf8(&data).map_err(|e| TransportError::Io(e.to_string()))?;
                Message::Text(text.into())
            }
            Outbound::Binary(data) => Message::Binary(data),
        };

        self.queue
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

async fn global_records<P: DetectionPayload>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<P>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state, Scope::Global))
}

async fn camera_records<P: DetectionPayload>(
    ws: WebSocketUpgrade,
    Path(label): Path<String>,
    State(state): State<AppState<P>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state, Scope::Camera(label)))
}

async fn camera_frames<P: DetectionPayload>(
    ws: WebSocketUpgrade,
    Path(label): Path<String>,
    State(state): State<AppState<P>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state, Scope::Frames(label)))
}

/// Why a viewer connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewerExit {
    /// The viewer closed or the read side failed
    Disconnected,
    /// Fan-out removed the subscriber after a failed send
    Evicted,
    /// The writer task hit a socket error
    WriteFailed,
}

async fn serve_subscriber<P: DetectionPayload>(socket: WebSocket, state: AppState<P>, scope: Scope) {
    // Viewers must not keep the ingest senders alive
    let AppState {
        registry,
        viewer_queue_capacity,
        close_timeout,
        ..
    } = state;

    let (sink, mut stream) = socket.split();
    let (queue, outbound) = mpsc::channel(viewer_queue_capacity.max(1));
    let subscriber = Subscriber::new(Arc::new(WsTransport::new(queue)));
    let handle = subscriber.clone();

    let mut session = match SubscriberSession::on_open(&registry, subscriber, scope).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Subscriber connection refused");
            return;
        }
    };

    let (stop, stopped) = oneshot::channel();
    let mut writer = tokio::spawn(forward_outbound(sink, outbound, stopped));

    let exit = loop {
        tokio::select! {
            _ = handle.closed() => break ViewerExit::Evicted,
            _ = &mut writer => break ViewerExit::WriteFailed,
            message = stream.next() => match message {
                Some(Ok(Message::Close(_))) | None => break ViewerExit::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(subscriber = %session.id(), error = %e, "Subscriber connection error");
                    break ViewerExit::Disconnected;
                }
            },
        }
    };

    session.on_close(&registry).await;

    if exit != ViewerExit::WriteFailed {
        let _ = stop.send(());
        if tokio::time::timeout(close_timeout, &mut writer).await.is_err() {
            // Writer is stuck on a viewer that stopped reading
            writer.abort();
        }
    }

    if exit == ViewerExit::Evicted {
        tracing::info!(
            subscriber = %session.id(),
            scope = %session.scope(),
            "Evicted subscriber disconnected"
        );
    }
}

/// Drain a viewer's queue into the socket, one whole message at a time
///
/// Ends with a close frame once stopped. Returns early on a write error.
async fn forward_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Message>,
    mut stopped: oneshot::Receiver<()>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = &mut stopped => break,
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if let Err(e) = sink.send(message).await {
            tracing::debug!(error = %e, "Subscriber write failed");
            return;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

async fn ingest_detections<P: DetectionPayload>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<P>>,
) -> Response {
    ws.on_upgrade(move |socket| receive_detections(socket, state))
}

async fn receive_detections<P: DetectionPayload>(mut socket: WebSocket, state: AppState<P>) {
    tracing::info!("Detection producer connected");

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<DetectionEvent<P>>(text.as_str()) {
                    Ok(event) => {
                        if state.detections.send(event).await.is_err() {
                            tracing::warn!("Detection pipeline closed, dropping producer");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Malformed detection event");
                        state.stats.record_rejected();
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Detection producer connection error");
                break;
            }
        }
    }

    tracing::info!("Detection producer disconnected");
}

async fn ingest_frames<P: DetectionPayload>(
    ws: WebSocketUpgrade,
    Path(label): Path<String>,
    State(state): State<AppState<P>>,
) -> Response {
    ws.on_upgrade(move |socket| receive_frames(socket, label, state.frames))
}

async fn receive_frames(mut socket: WebSocket, label: String, frames: mpsc::Sender<FrameEvent>) {
    tracing::info!(camera = %label, "Frame producer connected");

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Binary(data)) => {
                if frames.send(FrameEvent::new(label.clone(), data)).await.is_err() {
                    tracing::warn!(camera = %label, "Frame pipeline closed, dropping producer");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(camera = %label, error = %e, "Frame producer connection error");
                break;
            }
        }
    }

    tracing::info!(camera = %label, "Frame producer disconnected");
}

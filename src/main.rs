//! trafficwatch server binary
//!
//! Run with:
//!   cargo run -- --camera CAM-1=Main-St --camera CAM-2
//!
//! Then watch records:
//!   websocat ws://localhost:8080/trafficcamerarecords
//!   websocat ws://localhost:8080/trafficcamerarecords/CAM-1
//!
//! And feed detections:
//!   echo '{"label":"CAM-1","timestamp":"2024-05-01T12:00:00Z","categories":[{"category":"car","objectsDetected":3}]}' \
//!     | websocat ws://localhost:8080/ingest/detections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trafficwatch::error::StoreError;
use trafficwatch::model::{
    Categories, DetectionPayload, NewCamera, ObjectCount, RecordShape, STATUS_ACTIVE,
};
use trafficwatch::{MemoryStore, RecordStore, Result, ServerConfig, TrafficServer};

#[derive(Parser, Debug)]
#[command(name = "trafficwatch")]
#[command(about = "Traffic camera detection ingestion and websocket fan-out", long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, env = "TRAFFICWATCH_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Detection payload shape (flat, categorized)
    #[arg(long, env = "TRAFFICWATCH_SHAPE", default_value = "categorized")]
    shape: RecordShape,

    /// Label-sharded detection workers
    #[arg(long, env = "TRAFFICWATCH_WORKERS", default_value = "4")]
    workers: usize,

    /// Ingestion queue capacity
    #[arg(long, env = "TRAFFICWATCH_QUEUE_CAPACITY", default_value = "1024")]
    queue_capacity: usize,

    /// Maximum live subscribers (0 = unlimited)
    #[arg(long, env = "TRAFFICWATCH_MAX_SUBSCRIBERS", default_value = "0")]
    max_subscribers: usize,

    /// Per-subscriber send timeout in seconds
    #[arg(long, env = "TRAFFICWATCH_SEND_TIMEOUT_SECS", default_value = "5")]
    send_timeout_secs: u64,

    /// Camera to create at startup, as LABEL or LABEL=LOCATION (repeatable)
    #[arg(long = "camera", value_name = "LABEL[=LOCATION]")]
    cameras: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trafficwatch=info")),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig::with_addr(args.bind)
        .record_shape(args.shape)
        .ingest_workers(args.workers)
        .ingest_queue_capacity(args.queue_capacity)
        .max_subscribers(args.max_subscribers)
        .send_timeout(Duration::from_secs(args.send_timeout_secs));

    match args.shape {
        RecordShape::Flat => serve::<ObjectCount>(config, &args.cameras).await,
        RecordShape::Categorized => serve::<Categories>(config, &args.cameras).await,
    }
}

async fn serve<P: DetectionPayload>(config: ServerConfig, cameras: &[String]) -> Result<()> {
    let store: Arc<dyn RecordStore<P>> = Arc::new(MemoryStore::<P>::new());

    for flag in cameras {
        let camera = match flag.split_once('=') {
            Some((label, location)) => NewCamera::new(label).location(location),
            None => NewCamera::new(flag.as_str()),
        };

        match store.create_camera(camera.status(STATUS_ACTIVE)).await {
            Ok(_) => {}
            Err(StoreError::AlreadyExists(label)) => {
                tracing::warn!(camera = %label, "Duplicate camera flag ignored");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let server = TrafficServer::new(config, store);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
}

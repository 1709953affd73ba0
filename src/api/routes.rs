//! HTTP handlers
//!
//! Read, write and live-stream endpoints over the shared chain store

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::AppState;
use crate::chain::{verify_chain, ChainError, ChainRecord, ChainStore};

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET / - full chain snapshot
pub async fn get_chain(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let records = state.store.snapshot().await;
    let body = serde_json::to_string_pretty(&records)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// POST / body
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    #[serde(rename = "BPM", alias = "bpm", alias = "measurement")]
    pub measurement: i64,
}

/// POST / - append a record carrying the submitted measurement
pub async fn write_record(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ChainRecord>), ApiError> {
    let request: WriteRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedInput(e.to_string()))?;

    let tail = state.store.tail().await?;
    let candidate = tail.successor(request.measurement);

    match state.store.append(candidate.clone()).await {
        Ok(record) => {
            info!(
                index = record.index,
                bpm = record.measurement,
                hash = %record.hash,
                "Record written"
            );
            Ok((StatusCode::CREATED, Json(record)))
        }
        Err(ChainError::Rejected(e)) => Err(ApiError::Rejected {
            reason: e.to_string(),
            candidate: Box::new(candidate),
        }),
        Err(e) => Err(e.into()),
    }
}

/// GET /verify response
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /verify - check every link of the current snapshot
pub async fn verify(State(state): State<AppState>) -> Json<VerifyResponse> {
    let records = state.store.snapshot().await;
    let result = verify_chain(&records);

    Json(VerifyResponse {
        valid: result.is_ok(),
        length: records.len(),
        error: result.err().map(|e| e.to_string()),
    })
}

/// GET /stream - Server-Sent Events with the chain snapshot.
///
/// The first event goes out on connect, then one per stream interval. The
/// stream is dropped when the client disconnects and ends on server shutdown.
pub async fn stream_chain(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stream client connected");

    let mut ticker = interval(state.stream_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let events = snapshot_stream(state.store.clone(), ticker, state.subscribe_shutdown());

    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
}

fn snapshot_stream(
    store: ChainStore,
    ticker: tokio::time::Interval,
    shutdown_rx: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (store, ticker, shutdown_rx, StreamGuard),
        |(store, mut ticker, mut shutdown_rx, guard)| async move {
            if *shutdown_rx.borrow_and_update() {
                return None;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => return None,
            }
            let records = store.snapshot().await;
            let event = snapshot_event(&records);
            Some((Ok::<_, Infallible>(event), (store, ticker, shutdown_rx, guard)))
        },
    )
}

/// Render one snapshot as a single-line event. Serialization failures become
/// an `error` event; the stream keeps going.
pub fn snapshot_event(records: &[ChainRecord]) -> Event {
    match serde_json::to_string(records) {
        Ok(json) => {
            debug!(blocks = records.len(), "Sent chain update");
            Event::default().data(json)
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize chain for stream");
            Event::default().event("error").data(e.to_string())
        }
    }
}

/// Logs the disconnect when the stream is dropped
struct StreamGuard;

impl Drop for StreamGuard {
    fn drop(&mut self) {
        info!("Stream client disconnected");
    }
}

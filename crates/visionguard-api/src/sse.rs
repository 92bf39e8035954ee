//! Live detection stream with auto-reconnect.
//!
//! Connects to the backend's per-camera SSE endpoint
//! (`GET /sse/detected_objects/{id}`) and publishes each decoded message
//! as the new authoritative [`Snapshot`] through a [`tokio::sync::watch`]
//! channel. Handles reconnection with exponential backoff + jitter.
//!
//! The wire contract is replace-semantics: every `data:` payload is a
//! complete JSON array of detection events and fully supersedes the prior
//! one. A `watch` channel encodes that directly -- the last write wins and
//! readers never see deltas. Should the backend ever move to incremental
//! add/update/remove messages, only this module changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use visionguard_api::sse::{DetectionStream, ReconnectConfig};
//!
//! let mut handle = DetectionStream::connect(client, "cam-1", Snapshot::default(), ReconnectConfig::default());
//! let mut rx = handle.snapshots();
//!
//! while rx.changed().await.is_ok() {
//!     let snap = rx.borrow_and_update().clone();
//!     println!("{} detections", snap.len());
//! }
//!
//! handle.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::error::Error;
use crate::model::Snapshot;

// ── StreamState ──────────────────────────────────────────────────────

/// Connection state observable by consumers.
///
/// Stream faults are absorbed here and never propagated as errors:
/// transient ones show up as [`Error`](StreamState::Error) while the loop
/// backs off, terminal auth failures park the stream in
/// [`Unauthorized`](StreamState::Unauthorized). [`Idle`](StreamState::Idle)
/// covers both the time before the first connect and the gap between a
/// clean disconnect and the redial; [`Closed`](StreamState::Closed) is
/// terminal (teardown or retry limit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Open,
    Error { attempt: u32 },
    Unauthorized,
    Closed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running detection stream.
///
/// Exactly one handle owns each connection; it is destroyed and recreated
/// on camera change. Dropping the handle cancels the background task;
/// [`shutdown`](Self::shutdown) additionally awaits its exit, which is what
/// the view layer uses to guarantee the old connection is fully gone before
/// a replacement opens.
#[derive(Debug)]
pub struct StreamHandle {
    camera_id: String,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    state_rx: watch::Receiver<StreamState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// The camera this stream is scoped to.
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// The current authoritative snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// A watch receiver over snapshot replacements.
    pub fn snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_rx.clone()
    }

    /// The current connection state.
    pub fn state(&self) -> StreamState {
        self.state_rx.borrow().clone()
    }

    /// A watch receiver over connection-state transitions.
    pub fn states(&self) -> watch::Receiver<StreamState> {
        self.state_rx.clone()
    }

    /// Tear down the stream and wait for the background task to exit.
    ///
    /// Idempotent: calling it twice (or after drop-cancellation) is a no-op.
    /// On return, no task for this camera is reading from the network.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── DetectionStream ──────────────────────────────────────────────────

/// Entry point for opening per-camera detection streams.
pub struct DetectionStream;

impl DetectionStream {
    /// Open the SSE channel for one camera and spawn the reconnection loop.
    ///
    /// `initial` seeds the snapshot channel -- the view layer passes the
    /// bootstrap fetch result so consumers have data before the first push.
    /// Returns immediately; the first connection attempt happens in the
    /// background task.
    pub fn connect(
        client: ApiClient,
        camera_id: impl Into<String>,
        initial: Snapshot,
        reconnect: ReconnectConfig,
    ) -> StreamHandle {
        let camera_id = camera_id.into();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(initial));
        let (state_tx, state_rx) = watch::channel(StreamState::Idle);
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let task_camera = camera_id.clone();
        let task = tokio::spawn(async move {
            sse_loop(client, task_camera, snapshot_tx, state_tx, reconnect, task_cancel).await;
        });

        StreamHandle {
            camera_id,
            snapshot_rx,
            state_rx,
            cancel,
            task: Some(task),
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on transient error, backoff → reconnect.
async fn sse_loop(
    client: ApiClient,
    camera_id: String,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    state_tx: watch::Sender<StreamState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = state_tx.send(StreamState::Closed);
                break;
            }
            result = connect_and_read(&client, &camera_id, &snapshot_tx, &state_tx, &cancel) => {
                match result {
                    // Clean disconnect (server closed the response).
                    // Reset the attempt counter and redial after the base
                    // delay, the way EventSource treats its retry interval.
                    // The stream parks in Idle for the gap so observers
                    // never see a connection that is no longer being read.
                    Ok(()) => {
                        tracing::info!(camera = %camera_id, "detection stream disconnected cleanly, reconnecting");
                        attempt = 0;
                        let _ = state_tx.send(StreamState::Idle);
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                let _ = state_tx.send(StreamState::Closed);
                                return;
                            }
                            _ = tokio::time::sleep(reconnect.initial_delay) => {}
                        }
                    }
                    // Terminal: the session is gone. Retrying in a loop
                    // can never succeed, so park in Unauthorized.
                    Err(e) if e.is_auth_expired() => {
                        tracing::warn!(camera = %camera_id, "detection stream unauthorized, giving up");
                        let _ = state_tx.send(StreamState::Unauthorized);
                        break;
                    }
                    Err(e) => {
                        // A connection that reached Open and then dropped
                        // mid-read starts the backoff schedule over.
                        if *state_tx.borrow() == StreamState::Open {
                            attempt = 0;
                        }
                        tracing::warn!(camera = %camera_id, error = %e, attempt, "detection stream error");
                        let _ = state_tx.send(StreamState::Error { attempt });

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    camera = %camera_id,
                                    max_retries = max,
                                    "stream reconnection limit reached, giving up"
                                );
                                let _ = state_tx.send(StreamState::Closed);
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            camera = %camera_id,
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                let _ = state_tx.send(StreamState::Closed);
                                return;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one SSE connection and read frames until it drops.
///
/// HTTP 401/403 on the connect is classified terminal (the cookie session
/// is unusable); everything else is transient and retried by the caller.
async fn connect_and_read(
    client: &ApiClient,
    camera_id: &str,
    snapshot_tx: &watch::Sender<Arc<Snapshot>>,
    state_tx: &watch::Sender<StreamState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let _ = state_tx.send(StreamState::Connecting);

    let url = client.url(&format!("/sse/detected_objects/{camera_id}"))?;
    tracing::info!(url = %url, "connecting detection stream");

    let resp = client
        .http()
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| Error::StreamConnect(e.to_string()))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Unauthorized);
    }
    if !status.is_success() {
        return Err(Error::StreamConnect(format!("HTTP {status}")));
    }

    let _ = state_tx.send(StreamState::Open);
    tracing::info!(camera = %camera_id, "detection stream open");

    let mut body = resp.bytes_stream();
    let mut decoder = SseDecoder::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            chunk = body.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        for payload in decoder.feed(&bytes) {
                            install_snapshot(&payload, snapshot_tx);
                        }
                    }
                    Some(Err(e)) => {
                        return Err(Error::StreamConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!(camera = %camera_id, "detection stream ended");
                        return Ok(());
                    }
                }
            }
        }
    }
}

// ── Frame decoding ───────────────────────────────────────────────────

/// Incremental decoder for the SSE wire format.
///
/// Frames are separated by a blank line; only `data:` fields carry payload
/// (comments and other fields are skipped). Buffering is byte-level so a
/// frame split across chunk boundaries reassembles correctly.
#[derive(Debug, Default)]
struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Consume a network chunk, returning the data payload of every frame
    /// completed by it.
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((end, sep_len)) = frame_boundary(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + sep_len).collect();
            let text = String::from_utf8_lossy(&frame[..end]);
            if let Some(data) = frame_data(&text) {
                payloads.push(data);
            }
        }
        payloads
    }
}

/// Find the earliest blank-line frame separator (`\n\n` or `\r\n\r\n`).
fn frame_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (found, None) | (None, found) => found,
    }
}

/// Join the `data:` lines of one frame, per the SSE spec.
fn frame_data(frame: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in frame.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("data:") {
            lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Decode a frame payload as a full snapshot and install it.
///
/// Malformed payloads are discarded and logged; the prior snapshot stays
/// in place. This is a recoverable fault, never fatal to the stream.
fn install_snapshot(payload: &str, snapshot_tx: &watch::Sender<Arc<Snapshot>>) {
    match serde_json::from_str::<Snapshot>(payload) {
        Ok(snapshot) => {
            let _ = snapshot_tx.send(Arc::new(snapshot));
        }
        Err(e) => {
            tracing::debug!(error = %e, "discarding malformed snapshot payload");
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((attempt as f64 * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn decoder_extracts_data_frames() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed(b"data: [1,2,3]\n\ndata: []\n\n");
        assert_eq!(payloads, vec!["[1,2,3]".to_owned(), "[]".to_owned()]);
    }

    #[test]
    fn decoder_reassembles_split_frames() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: [{\"id\":").is_empty());
        let payloads = decoder.feed(b"1}]\n\n");
        assert_eq!(payloads, vec!["[{\"id\":1}]".to_owned()]);
    }

    #[test]
    fn decoder_skips_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed(b": keepalive\n\nevent: update\ndata: [42]\n\n");
        assert_eq!(payloads, vec!["[42]".to_owned()]);
    }

    #[test]
    fn decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed(b"data: [1,\ndata: 2]\n\n");
        assert_eq!(payloads, vec!["[1,\n2]".to_owned()]);
    }

    #[test]
    fn decoder_tolerates_crlf() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed(b"data: [7]\r\n\r\ndata: [8]\r\n\r\n");
        assert_eq!(payloads, vec!["[7]".to_owned(), "[8]".to_owned()]);
    }

    #[test]
    fn malformed_payload_keeps_prior_snapshot() {
        let prior = Snapshot::default();
        let (tx, rx) = watch::channel(Arc::new(prior.clone()));

        install_snapshot("{not json", &tx);
        assert_eq!(*rx.borrow().clone(), prior);

        install_snapshot(
            r#"[{"id":1,"tracker_id":9,"object_class":"person","start_time":"2024-01-01T00:00:00Z"}]"#,
            &tx,
        );
        assert_eq!(rx.borrow().len(), 1);
    }

    #[test]
    fn later_snapshot_fully_replaces_earlier() {
        let (tx, rx) = watch::channel(Arc::new(Snapshot::default()));

        install_snapshot(
            r#"[{"id":1,"tracker_id":1,"object_class":"car","start_time":"2024-01-01T00:00:00Z"},
               {"id":2,"tracker_id":2,"object_class":"bus","start_time":"2024-01-01T00:01:00Z"}]"#,
            &tx,
        );
        install_snapshot(
            r#"[{"id":3,"tracker_id":3,"object_class":"person","start_time":"2024-01-01T00:02:00Z"}]"#,
            &tx,
        );

        let snap = rx.borrow().clone();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.events[0].id, 3);
    }
}

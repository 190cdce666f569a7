//! Buffered, fire-and-forget push notification sink.
//!
//! Messages are queued onto a channel and shipped by a background worker
//! that batches opportunistically (up to 100 per request) against an
//! Expo-compatible endpoint. Transport failures are retried a bounded
//! number of times, then logged and dropped; they never propagate to the
//! caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Maximum messages per outbound request.
pub const MAX_BATCH: usize = 100;
/// Total attempts per batch before it is dropped.
const SEND_ATTEMPTS: u32 = 3;

/// One outbound push notification.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

/// Wire shape expected by the transport.
#[derive(Serialize)]
struct WirePush<'a> {
    to: &'a str,
    sound: &'static str,
    title: &'a str,
    body: &'a str,
    data: &'a Value,
}

enum Sink {
    /// Real transport: channel into the background worker.
    Http(mpsc::UnboundedSender<PushMessage>),
    /// Test sink: messages are recorded synchronously.
    Capture(Mutex<Vec<PushMessage>>),
}

/// Shared notification sink. Cheap to clone via `Arc`.
pub struct Notifier {
    sink: Sink,
    pending: Arc<AtomicUsize>,
}

impl Notifier {
    /// Start the notifier with a background delivery worker.
    pub fn start(url: String) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let notifier = Arc::new(Self {
            sink: Sink::Http(tx),
            pending: Arc::clone(&pending),
        });

        let client = reqwest::Client::new();
        tokio::spawn(deliver_loop(rx, client, url, pending));

        notifier
    }

    /// Create a notifier that records messages instead of sending them.
    pub fn capturing() -> Arc<Self> {
        Arc::new(Self {
            sink: Sink::Capture(Mutex::new(Vec::new())),
            pending: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue one message. Never blocks, never fails the caller.
    pub fn enqueue(&self, message: PushMessage) {
        match &self.sink {
            Sink::Http(tx) => {
                self.pending.fetch_add(1, Ordering::Relaxed);
                if tx.send(message).is_err() {
                    self.pending.fetch_sub(1, Ordering::Relaxed);
                    warn!("notification worker is gone, dropping message");
                }
            }
            Sink::Capture(captured) => captured.lock().push(message),
        }
    }

    /// Queue a batch of messages.
    pub fn enqueue_batch(&self, messages: Vec<PushMessage>) {
        for message in messages {
            self.enqueue(message);
        }
    }

    /// Messages queued but not yet delivered.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Wait until the queue drains or the timeout elapses. Used during
    /// graceful shutdown.
    pub async fn drain(&self, timeout: std::time::Duration) {
        let start = std::time::Instant::now();
        while self.pending() > 0 {
            if start.elapsed() >= timeout {
                warn!(
                    remaining = self.pending(),
                    "notification drain timed out, dropping remaining messages"
                );
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    /// Messages recorded by a capturing notifier. Empty for the HTTP sink.
    pub fn captured(&self) -> Vec<PushMessage> {
        match &self.sink {
            Sink::Capture(captured) => captured.lock().clone(),
            Sink::Http(_) => Vec::new(),
        }
    }

    /// Clear recorded messages (test helper).
    pub fn clear_captured(&self) {
        if let Sink::Capture(captured) = &self.sink {
            captured.lock().clear();
        }
    }
}

/// Background delivery loop: drain the channel, batch, send with retry.
async fn deliver_loop(
    mut rx: mpsc::UnboundedReceiver<PushMessage>,
    client: reqwest::Client,
    url: String,
    pending: Arc<AtomicUsize>,
) {
    let mut buffer: Vec<PushMessage> = Vec::with_capacity(MAX_BATCH);

    loop {
        buffer.clear();
        let received = rx.recv_many(&mut buffer, MAX_BATCH).await;
        if received == 0 {
            // Channel closed
            return;
        }

        send_batch(&client, &url, &buffer).await;
        pending.fetch_sub(received, Ordering::Relaxed);
    }
}

async fn send_batch(client: &reqwest::Client, url: &str, batch: &[PushMessage]) {
    let payload: Vec<WirePush> = batch
        .iter()
        .map(|m| WirePush {
            to: &m.to,
            sound: "default",
            title: &m.title,
            body: &m.body,
            data: &m.data,
        })
        .collect();

    for attempt in 1..=SEND_ATTEMPTS {
        match client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(count = batch.len(), "notification batch delivered");
                return;
            }
            Ok(response) => {
                warn!(
                    status = %response.status(),
                    attempt,
                    "notification transport rejected batch"
                );
            }
            Err(e) => {
                warn!(error = %e, attempt, "notification transport error");
            }
        }

        if attempt < SEND_ATTEMPTS {
            tokio::time::sleep(std::time::Duration::from_millis(200 * attempt as u64)).await;
        }
    }

    error!(
        count = batch.len(),
        "dropping notification batch after repeated transport failures"
    );
}

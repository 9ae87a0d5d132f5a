//! Network side of a client session.
//!
//! `start` registers the session over HTTP, opens the event stream, and
//! spawns one task that feeds inbound events into the shared
//! [`HistoryReconciler`], forwards outbound messages, and drives the
//! reconciler's timers. `close` tears all of it down.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use shopbot_core::{ClientMessage, ServerEvent, SessionKey, SessionProfile};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::actions::ShoppingAction;
use crate::error::ClientError;
use crate::reconciler::HistoryReconciler;

/// Granularity of delayed attachment checks.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type EventStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the event stream URL for `base_url` (http or https).
pub fn websocket_url(base_url: &str, key: &SessionKey) -> Result<String, ClientError> {
    let (scheme, rest) = if let Some(rest) = base_url.strip_prefix("https://") {
        ("wss://", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        ("ws://", rest)
    } else {
        return Err(ClientError::Http(format!("unsupported base URL: {}", base_url)));
    };
    Ok(format!(
        "{}{}/session?key={}",
        scheme,
        rest.trim_end_matches('/'),
        key
    ))
}

fn lock(reconciler: &Mutex<HistoryReconciler>) -> MutexGuard<'_, HistoryReconciler> {
    reconciler.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ClientSession {
    http: reqwest::Client,
    base_url: String,
    key: Option<SessionKey>,
    reconciler: Arc<Mutex<HistoryReconciler>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    observer: Option<mpsc::UnboundedSender<ServerEvent>>,
    task: Option<JoinHandle<()>>,
}

impl ClientSession {
    pub fn new(base_url: impl Into<String>, reconciler: HistoryReconciler) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: None,
            reconciler: Arc::new(Mutex::new(reconciler)),
            outbound: None,
            observer: None,
            task: None,
        }
    }

    pub fn reconciler(&self) -> Arc<Mutex<HistoryReconciler>> {
        Arc::clone(&self.reconciler)
    }

    pub fn key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Receive a copy of every inbound event of the next session `start`
    /// opens. The listener is dropped when that session closes, so each
    /// session needs its own call.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observer = Some(tx);
        rx
    }

    /// Load a fresh session on the server and open its event stream.
    pub async fn start(&mut self, profile: &SessionProfile) -> Result<SessionKey, ClientError> {
        let observer = self.observer.take();
        if self.key.is_some() {
            if let Err(e) = self.close().await {
                tracing::warn!("Failed to close previous session: {}", e);
            }
        }

        let key = SessionKey::generate();
        let response = self
            .http
            .post(format!("{}/load", self.base_url))
            .query(&[("key", key.as_str())])
            .json(profile)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(ClientError::Load {
                status: status.as_u16(),
                message,
            });
        }
        self.key = Some(key.clone());
        lock(&self.reconciler).set_profile(Some(profile.clone()));

        let stream = match self.connect(&key).await {
            Ok(stream) => stream,
            Err(e) => {
                if let Err(unload) = self.close().await {
                    tracing::warn!("Failed to unload after connect error: {}", unload);
                }
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let sweep_interval = lock(&self.reconciler).settings().sweep_interval;
        let task = tokio::spawn(drive(
            stream,
            Arc::clone(&self.reconciler),
            rx,
            observer,
            sweep_interval,
        ));
        self.outbound = Some(tx);
        self.task = Some(task);
        tracing::info!("Session {} started", key);
        Ok(key)
    }

    async fn connect(&self, key: &SessionKey) -> Result<EventStream, ClientError> {
        let url = websocket_url(&self.base_url, key)?;
        let (stream, _) = connect_async(url.as_str()).await?;
        Ok(stream)
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.send(&ClientMessage::Text { text: text.into() })
    }

    pub fn send_action(&self, action: &ShoppingAction) -> Result<(), ClientError> {
        self.send(&action.to_message())
    }

    fn send(&self, message: &ClientMessage) -> Result<(), ClientError> {
        let tx = self.outbound.as_ref().ok_or(ClientError::NotConnected)?;
        let json = serde_json::to_string(message)?;
        tx.send(json).map_err(|_| ClientError::NotConnected)
    }

    /// Stop the connection task, deregister listeners, clear local state
    /// and unload the session on the server. The key is forgotten even if
    /// unload fails.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.outbound = None;
        self.observer = None;
        if let Some(task) = self.task.take() {
            task.abort();
            // The task may be mid-frame; reset only once it can no longer
            // touch the reconciler.
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!("Session task ended abnormally: {}", e);
                }
            }
        }
        lock(&self.reconciler).reset();

        let Some(key) = self.key.take() else {
            return Ok(());
        };
        let response = self
            .http
            .post(format!("{}/unload", self.base_url))
            .query(&[("key", key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Http(format!(
                "unload failed: HTTP {}",
                response.status()
            )));
        }
        tracing::info!("Session {} closed", key);
        Ok(())
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive(
    stream: EventStream,
    reconciler: Arc<Mutex<HistoryReconciler>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    observer: Option<mpsc::UnboundedSender<ServerEvent>>,
    sweep_interval: Duration,
) {
    let (mut write, mut read) = stream.split();
    let mut sweep = tokio::time::interval(sweep_interval);
    let mut poll = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&text, &reconciler, observer.as_ref());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Event stream closed by server");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Event stream read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            out = outbound.recv() => {
                match out {
                    Some(json) => {
                        if let Err(e) = write.send(Message::Text(json)).await {
                            tracing::warn!("Event stream send error: {}", e);
                            break;
                        }
                    }
                    None => {
                        if let Err(e) = write.send(Message::Close(None)).await {
                            tracing::debug!("Close frame not delivered: {}", e);
                        }
                        break;
                    }
                }
            }
            _ = sweep.tick() => {
                lock(&reconciler).sweep(Instant::now());
            }
            _ = poll.tick() => {
                lock(&reconciler).poll(Instant::now());
            }
        }
    }
}

fn handle_frame(
    text: &str,
    reconciler: &Mutex<HistoryReconciler>,
    observer: Option<&mpsc::UnboundedSender<ServerEvent>>,
) {
    let event: ServerEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Ignoring unparseable server event: {}", e);
            return;
        }
    };
    tracing::trace!("Received {} event", event.kind());
    let copy = observer.is_some().then(|| event.clone());
    lock(reconciler).handle_event(event, Instant::now());
    if let (Some(tx), Some(copy)) = (observer, copy) {
        // Observers see an event only after the reconciler has applied it.
        let _ = tx.send(copy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSequencer;
    use crate::reconciler::ReconcilerSettings;

    fn session() -> ClientSession {
        ClientSession::new(
            "http://127.0.0.1:4000/",
            HistoryReconciler::new(AudioSequencer::default(), ReconcilerSettings::default()),
        )
    }

    #[test]
    fn test_websocket_url() {
        let key = SessionKey::new("k1");
        assert_eq!(
            websocket_url("http://localhost:4000", &key).unwrap(),
            "ws://localhost:4000/session?key=k1"
        );
        assert_eq!(
            websocket_url("https://shop.example.com/", &key).unwrap(),
            "wss://shop.example.com/session?key=k1"
        );
        assert!(websocket_url("ftp://x", &key).is_err());
    }

    #[test]
    fn test_send_requires_connection() {
        let s = session();
        assert!(!s.is_connected());
        assert!(matches!(s.send_text("hi"), Err(ClientError::NotConnected)));
        assert!(matches!(
            s.send_action(&ShoppingAction::ContinueShopping),
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn test_handle_frame_feeds_reconciler_and_observer() {
        let reconciler = Mutex::new(HistoryReconciler::new(
            AudioSequencer::default(),
            ReconcilerSettings::default(),
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_frame(r#"{"type":"ERROR","error":"boom"}"#, &reconciler, Some(&tx));
        handle_frame("not json", &reconciler, Some(&tx));

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::error("boom"));
        assert!(rx.try_recv().is_err());
        let notes = lock(&reconciler).take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "boom");
    }

    #[tokio::test]
    async fn test_close_without_start_is_noop() {
        let mut s = session();
        s.close().await.unwrap();
        assert!(s.key().is_none());
    }

    #[tokio::test]
    async fn test_close_drops_registered_listener() {
        let mut s = session();
        let mut events = s.observe();
        s.close().await.unwrap();
        assert!(s.observer.is_none());
        assert!(events.recv().await.is_none());
    }

    /// Writes into the reconciler when the task holding it is dropped.
    struct WriteOnDrop(Arc<Mutex<HistoryReconciler>>);

    impl Drop for WriteOnDrop {
        fn drop(&mut self) {
            lock(&self.0).handle_event(ServerEvent::error("late"), Instant::now());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_resets_after_task_stops() {
        let mut s = session();
        let guard = WriteOnDrop(s.reconciler());
        s.task = Some(tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        }));
        tokio::task::yield_now().await;

        s.close().await.unwrap();
        assert!(s.task.is_none());
        assert!(lock(&s.reconciler).take_notifications().is_empty());
    }
}

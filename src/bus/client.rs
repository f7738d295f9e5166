//! Websocket client for the shared message bus service

use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use super::{CHANNEL_CAPACITY, Message, MessageBus};
use crate::{Error, Result};

/// First reconnect delay after a dropped connection
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for the reconnect backoff
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// How a websocket session ended
#[derive(Debug, PartialEq)]
enum SessionEnd {
    /// Connection dropped; reconnect and send the unsent message first
    Disconnected(Option<Message>),
    /// Client handle dropped; stop
    Shutdown,
}

/// Message bus client over websocket
///
/// Connects in the background and reconnects with exponential backoff.
/// Messages emitted while disconnected are queued and sent once the
/// connection is back, including one whose send failed as the link dropped.
///
/// Only plain `ws://` is supported; the bus service listens on the device.
pub struct BusClient {
    outgoing: mpsc::UnboundedSender<Message>,
    incoming: broadcast::Sender<Message>,
    task: JoinHandle<()>,
}

impl BusClient {
    /// Start a client for the bus at `url` (e.g. `ws://127.0.0.1:8181/core`)
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is not a `ws://` URL
    pub fn connect(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid bus url {url}: {e}")))?;
        match parsed.scheme() {
            "ws" => {}
            "wss" => {
                return Err(Error::Config(format!(
                    "bus url {url} uses wss://, which is not supported; use ws://"
                )));
            }
            _ => {
                return Err(Error::Config(format!("bus url must use ws://, got {url}")));
            }
        }

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming, _) = broadcast::channel(CHANNEL_CAPACITY);

        let task = tokio::spawn(supervise(
            parsed.to_string(),
            outgoing_rx,
            incoming.clone(),
        ));

        Ok(Self {
            outgoing,
            incoming,
            task,
        })
    }
}

impl Drop for BusClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MessageBus for BusClient {
    fn emit(&self, message: Message) -> Result<()> {
        self.outgoing
            .send(message)
            .map_err(|e| Error::Bus(format!("bus client stopped, dropped {}", e.0.msg_type)))
    }

    fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.incoming.subscribe()
    }
}

/// Keep a connection to the bus alive until the client is dropped
async fn supervise(
    url: String,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    incoming: broadcast::Sender<Message>,
) {
    let mut delay = INITIAL_RECONNECT_DELAY;
    let mut unsent = None;

    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!(url = %url, "connected to message bus");
                delay = INITIAL_RECONNECT_DELAY;
                match run_session(stream, unsent.take(), &mut outgoing, &incoming).await {
                    SessionEnd::Shutdown => {
                        tracing::debug!("bus client shut down");
                        return;
                    }
                    SessionEnd::Disconnected(message) => {
                        unsent = message;
                        tracing::warn!(
                            url = %url,
                            unsent = unsent.is_some(),
                            "message bus connection lost"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    retry_in = ?delay,
                    "message bus connect failed"
                );
            }
        }

        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
    }
}

/// Pump messages in both directions over one connection
///
/// `unsent` is sent before anything else queued.
async fn run_session<S>(
    stream: S,
    unsent: Option<Message>,
    outgoing: &mut mpsc::UnboundedReceiver<Message>,
    incoming: &broadcast::Sender<Message>,
) -> SessionEnd
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError>,
{
    let (mut sink, mut source) = stream.split();

    if let Some(message) = unsent
        && let Err(message) = send(&mut sink, message).await
    {
        return SessionEnd::Disconnected(Some(message));
    }

    loop {
        tokio::select! {
            next = outgoing.recv() => {
                let Some(message) = next else {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                };
                if let Err(message) = send(&mut sink, message).await {
                    return SessionEnd::Disconnected(Some(message));
                }
            }
            frame = source.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match Message::from_json(&text) {
                    Ok(message) => {
                        // No subscribers is fine
                        let _ = incoming.send(message);
                    }
                    Err(e) => tracing::debug!(error = %e, "ignoring malformed bus frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => return SessionEnd::Disconnected(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "bus receive failed");
                    return SessionEnd::Disconnected(None);
                }
            },
        }
    }
}

/// Send one message, handing it back if the connection failed
///
/// Messages that cannot be encoded are logged and dropped.
async fn send<K>(sink: &mut K, message: Message) -> std::result::Result<(), Message>
where
    K: Sink<WsMessage, Error = WsError> + Unpin,
{
    let text = match message.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(msg_type = %message.msg_type, error = %e, "failed to encode message");
            return Ok(());
        }
    };

    if let Err(e) = sink.send(WsMessage::Text(text)).await {
        tracing::warn!(msg_type = %message.msg_type, error = %e, "failed to send message");
        return Err(message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use super::*;
    use crate::bus::events;

    /// Socket that never receives and records or refuses every send
    #[derive(Default)]
    struct FakeSocket {
        sent: Arc<Mutex<Vec<String>>>,
        broken: bool,
    }

    impl Stream for FakeSocket {
        type Item = std::result::Result<WsMessage, WsError>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Pending
        }
    }

    impl Sink<WsMessage> for FakeSocket {
        type Error = WsError;

        fn poll_ready(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: WsMessage) -> std::result::Result<(), WsError> {
            if self.broken {
                return Err(WsError::ConnectionClosed);
            }
            if let WsMessage::Text(text) = item {
                self.sent.lock().unwrap().push(text);
            }
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn rejects_non_websocket_url() {
        assert!(matches!(
            BusClient::connect("http://127.0.0.1:8181/core"),
            Err(Error::Config(_))
        ));
        assert!(matches!(BusClient::connect("not a url"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn rejects_tls_url_up_front() {
        assert!(matches!(
            BusClient::connect("wss://127.0.0.1:8181/core"),
            Err(Error::Config(msg)) if msg.contains("wss://")
        ));
    }

    #[tokio::test]
    async fn queues_messages_while_disconnected() {
        // Nothing listens on port 9 locally; the client keeps retrying
        let client = BusClient::connect("ws://127.0.0.1:9/core").unwrap();
        assert!(client.emit(Message::new("queued")).is_ok());
    }

    #[tokio::test]
    async fn failed_send_keeps_the_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (incoming, _) = broadcast::channel(8);
        tx.send(Message::new(events::MIC_MUTE)).unwrap();

        let socket = FakeSocket {
            broken: true,
            ..FakeSocket::default()
        };
        let end = run_session(socket, None, &mut rx, &incoming).await;

        assert_eq!(
            end,
            SessionEnd::Disconnected(Some(Message::new(events::MIC_MUTE)))
        );
    }

    #[tokio::test]
    async fn unsent_message_goes_out_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (incoming, _) = broadcast::channel(8);
        tx.send(Message::new(events::WIFI_SETUP)).unwrap();
        drop(tx);

        let socket = FakeSocket::default();
        let sent = Arc::clone(&socket.sent);
        let end = run_session(
            socket,
            Some(Message::new(events::MIC_MUTE)),
            &mut rx,
            &incoming,
        )
        .await;

        assert_eq!(end, SessionEnd::Shutdown);
        let types: Vec<String> = sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| Message::from_json(text).unwrap().msg_type)
            .collect();
        assert_eq!(types, vec![events::MIC_MUTE, events::WIFI_SETUP]);
    }

    #[tokio::test]
    async fn unsent_message_survives_another_failure() {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let (incoming, _) = broadcast::channel(8);

        let socket = FakeSocket {
            broken: true,
            ..FakeSocket::default()
        };
        let end =
            run_session(socket, Some(Message::speak("hello")), &mut rx, &incoming).await;

        assert_eq!(end, SessionEnd::Disconnected(Some(Message::speak("hello"))));
    }
}

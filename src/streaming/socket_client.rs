use crate::protocol::{self, ClientMessage, MessageSink};
use crate::scheduler::SessionEvent;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::mpsc::Sender as EventSender;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

// Outbound sends are fire-and-forget; when the connection stalls, dropping
// frames immediately beats buffering them.
const OUTBOUND_QUEUE: usize = 64;

/// Duplex connection to the estimation service. Wire format is one JSON
/// message per line in both directions.
///
/// The connection runs on its own thread with a single-threaded tokio
/// runtime; inbound notifications are forwarded into the session event queue
/// and never touch the session directly. Reconnection is not attempted here:
/// a drop leaves the session parked in its current phase.
pub struct SocketClient {
    outbound: mpsc::Sender<ClientMessage>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SocketClient {
    pub fn connect(address: String, events: EventSender<SessionEvent>) -> Result<Self> {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);

        let handle = std::thread::Builder::new()
            .name("socket-client".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!("Failed to build client runtime: {}", e);
                        let _ = events.send(SessionEvent::Disconnected);
                        return;
                    }
                };
                runtime.block_on(run_connection(address, rx, events));
            })
            .context("Failed to spawn socket client thread")?;

        Ok(Self {
            outbound: tx,
            handle: Some(handle),
        })
    }

    /// A cloneable outbound handle for the session.
    pub fn sender(&self) -> SocketSender {
        SocketSender {
            outbound: self.outbound.clone(),
        }
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        // Closing the last outbound sender ends the connection task.
        drop(std::mem::replace(&mut self.outbound, mpsc::channel(1).0));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Outbound side handed to the session. `try_send` keeps the tick loop
/// non-blocking; messages sent while disconnected or backlogged are dropped.
#[derive(Clone)]
pub struct SocketSender {
    outbound: mpsc::Sender<ClientMessage>,
}

impl MessageSink for SocketSender {
    fn send(&mut self, message: ClientMessage) {
        if let Err(e) = self.outbound.try_send(message) {
            debug!("Dropped outbound message: {}", e);
        }
    }
}

async fn run_connection(
    address: String,
    mut outbound: mpsc::Receiver<ClientMessage>,
    events: EventSender<SessionEvent>,
) {
    let stream = match TcpStream::connect(&address).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to connect to {}: {}", address, e);
            let _ = events.send(SessionEvent::Disconnected);
            return;
        }
    };
    // Small payloads at frame rate; Nagle only adds latency here.
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY: {}", e);
    }

    info!("Connected to estimation service at {}", address);
    let _ = events.send(SessionEvent::Connected);

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            maybe_message = outbound.recv() => {
                let Some(message) = maybe_message else {
                    // Session side is gone; shut the connection down.
                    break;
                };
                match protocol::encode(&message) {
                    Ok(mut line) => {
                        line.push('\n');
                        if let Err(e) = writer.write_all(line.as_bytes()).await {
                            warn!("Send failed: {}", e);
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping unencodable message: {:#}", e),
                }
            }
            maybe_line = lines.next_line() => {
                match maybe_line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match protocol::decode(&line) {
                            Ok(message) => {
                                if events.send(SessionEvent::Inbound(message)).is_err() {
                                    break;
                                }
                            }
                            // Unknown or malformed events are dropped here,
                            // never dispatched to the session.
                            Err(e) => warn!("Ignoring inbound line: {:#}", e),
                        }
                    }
                    Ok(None) => {
                        info!("Service closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("Read failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    let _ = events.send(SessionEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use std::io::{BufRead, BufReader as StdBufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn exchanges_line_framed_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = StdBufReader::new(stream.try_clone().unwrap());

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();

            let mut stream = stream;
            stream
                .write_all(b"{\"event\": \"modelTrained\"}\n")
                .unwrap();
            line
        });

        let (events_tx, events_rx) = channel();
        let client = SocketClient::connect(address, events_tx).unwrap();

        assert!(matches!(
            events_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            SessionEvent::Connected
        ));

        let mut sender = client.sender();
        sender.send(ClientMessage::CalibrationFinished(true));

        let received = server.join().unwrap();
        let value: serde_json::Value = serde_json::from_str(received.trim()).unwrap();
        assert_eq!(value["event"], "calibrationStatus");

        match events_rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            SessionEvent::Inbound(ServerMessage::ModelTrained) => {}
            other => panic!("unexpected event: {:?}", other),
        }

        drop(client);
        // Connection teardown is reported as an informational event.
        let saw_disconnect = std::iter::from_fn(|| {
            events_rx.recv_timeout(Duration::from_secs(5)).ok()
        })
        .any(|e| matches!(e, SessionEvent::Disconnected));
        assert!(saw_disconnect);
    }

    #[test]
    fn failed_connect_reports_disconnected() {
        let (events_tx, events_rx) = channel();
        // Port 1 is essentially never listening.
        let _client = SocketClient::connect("127.0.0.1:1".to_string(), events_tx).unwrap();

        let event = events_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(event, SessionEvent::Disconnected));
    }

    #[test]
    fn sends_while_disconnected_are_dropped() {
        let (events_tx, _events_rx) = channel();
        let client = SocketClient::connect("127.0.0.1:1".to_string(), events_tx).unwrap();
        let mut sender = client.sender();

        // Must not block or panic, whatever the connection state.
        for _ in 0..200 {
            sender.send(ClientMessage::Reset);
        }
    }
}

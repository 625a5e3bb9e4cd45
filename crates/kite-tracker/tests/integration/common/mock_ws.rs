//! Mock feed server for integration tests.
//!
//! Accepts WebSocket connections, records control frames, and pushes
//! queued binary frames after each mode message, matching the broker's
//! subscribe -> mode -> data sequence. Can be told to drop a connection
//! after the data flush to exercise reconnect handling.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    frames_on_mode: Arc<Mutex<Vec<Vec<u8>>>>,
    drop_after_flush: Arc<AtomicBool>,
}

impl MockFeedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let frames_on_mode: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let drop_after_flush = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let frames_clone = frames_on_mode.clone();
        let drop_clone = drop_after_flush.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            messages_clone.clone(),
                            connections_clone.clone(),
                            frames_clone.clone(),
                            drop_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
            frames_on_mode,
            drop_after_flush,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    /// Frames pushed after every mode message, on every connection.
    pub async fn queue_frames(&self, frames: Vec<Vec<u8>>) {
        *self.frames_on_mode.lock().await = frames;
    }

    /// Close the next connection right after its data flush.
    pub fn drop_next_connection(&self) {
        self.drop_after_flush.store(true, Ordering::Relaxed);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    frames_on_mode: Arc<Mutex<Vec<Vec<u8>>>>,
    drop_after_flush: Arc<AtomicBool>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                messages.lock().await.push(text.clone());

                let is_mode = serde_json::from_str::<serde_json::Value>(&text)
                    .ok()
                    .and_then(|v| v.get("a").and_then(|a| a.as_str()).map(|a| a == "mode"))
                    .unwrap_or(false);

                if is_mode {
                    let frames = frames_on_mode.lock().await.clone();
                    for frame in frames {
                        let _ = write.send(Message::Binary(frame)).await;
                    }
                    if drop_after_flush.swap(false, Ordering::Relaxed) {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }
}

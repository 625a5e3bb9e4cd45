//! Minimal HTTP responder standing in for the broker REST API.
//!
//! Answers every request with 200 and a tiny JSON body, which is all the
//! profile validation path needs.

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub struct MockBrokerServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
}

impl MockBrokerServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((mut stream, _)) = listener.accept() => {
                        tokio::spawn(async move {
                            let mut buf = [0u8; 4096];
                            // Drain the request head; GETs carry no body.
                            loop {
                                match stream.read(&mut buf).await {
                                    Ok(0) => return,
                                    Ok(n) => {
                                        if buf[..n].windows(4).any(|w| w == b"\r\n\r\n") {
                                            break;
                                        }
                                    }
                                    Err(_) => return,
                                }
                            }
                            let body = r#"{"status":"success","data":{}}"#;
                            let response = format!(
                                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                                body.len()
                            );
                            let _ = stream.write_all(response.as_bytes()).await;
                            let _ = stream.shutdown().await;
                        });
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self { addr, shutdown_tx }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

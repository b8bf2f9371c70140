use crate::bencode::{encode, Dict, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::warn;

/// An outbound KRPC message: the bencoded dictionary and its destination.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub data: Dict,
    pub to: SocketAddr,
}

/// A bounded outbound queue feeding a single writer on the shared socket.
///
/// Handlers and the refresh tick produce messages concurrently; exactly
/// one background task drains the queue and writes to the socket, so the
/// socket never sees concurrent writers. A full queue applies
/// backpressure by making `send` wait. Per-datagram write errors are
/// logged and dropped; the socket is never torn down for one.
#[derive(Clone)]
pub struct UdpSender {
    tx: mpsc::Sender<Outbound>,
}

impl UdpSender {
    /// Spawns the drain task and returns a cloneable producer handle.
    ///
    /// The task exits once every handle is dropped and the queue runs dry.
    pub fn spawn(socket: Arc<UdpSocket>, queue_size: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Outbound>(queue_size);

        tokio::spawn(async move {
            while let Some(Outbound { data, to }) = rx.recv().await {
                match encode(&Value::Dict(data)) {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, to).await {
                            warn!("udp send to {} failed: {}", to, e);
                        }
                    }
                    Err(e) => warn!("could not encode outbound message: {}", e),
                }
            }
        });

        Self { tx }
    }

    /// Enqueues a message, waiting while the queue is full.
    pub async fn send(&self, message: Outbound) {
        if self.tx.send(message).await.is_err() {
            warn!("outbound queue closed, dropping message");
        }
    }
}

//! Handler streaming frames to a gateway's TCP ingress port.

use std::{collections::VecDeque, sync::Mutex as StdMutex, time::Duration};

use async_trait::async_trait;
use edgeflow_proto::{Frame, MetaValue};
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::Notify};

use crate::handler::OutputHandler;

const QUEUE_CAPACITY: usize = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

struct Queue {
    frames: StdMutex<VecDeque<Frame>>,
    notify: Notify,
}

impl Queue {
    fn push(&self, frame: Frame) {
        let mut guard = self.frames.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.len() >= QUEUE_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(frame);
        drop(guard);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Frame {
        loop {
            let popped =
                self.frames.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front();
            if let Some(frame) = popped {
                return frame;
            }
            self.notify.notified().await;
        }
    }
}

/// Streams frames to a gateway ingress socket at `(host, port)`, tagging each with `source_id` so
/// the gateway can route it by logical source channel.
///
/// `send` never blocks on the network: frames are enqueued into a bounded drop-oldest queue
/// drained by a background task. Connection loss is recovered by reconnecting lazily on the next
/// queued frame.
pub struct TcpHandler {
    queue: std::sync::Arc<Queue>,
    source_id: String,
    worker: tokio::task::AbortHandle,
}

impl TcpHandler {
    /// Spawn the background sender and return a handle. `source_id` is written into every
    /// frame's `topic` metadata entry before it is enqueued.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, source_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let queue = std::sync::Arc::new(Queue {
            frames: StdMutex::new(VecDeque::new()),
            notify: Notify::new(),
        });
        let worker_queue = queue.clone();
        let host = host.into();

        let handle = tokio::spawn(async move {
            run_sender(worker_queue, host, port).await;
        });

        Self { queue, source_id, worker: handle.abort_handle() }
    }
}

async fn run_sender(queue: std::sync::Arc<Queue>, host: String, port: u16) {
    let mut conn: Option<TcpStream> = None;
    loop {
        let frame = queue.pop().await;

        if conn.is_none() {
            match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host.as_str(), port))).await {
                Ok(Ok(stream)) => {
                    if let Err(err) = stream.set_nodelay(true) {
                        tracing::warn!(%err, host, port, "failed to set TCP_NODELAY");
                    }
                    tracing::info!(host, port, "tcp handler connected");
                    conn = Some(stream);
                }
                Ok(Err(err)) => {
                    tracing::warn!(%err, host, port, "tcp handler connect failed");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(host, port, "tcp handler connect timed out");
                    continue;
                }
            }
        }

        let Some(stream) = conn.as_mut() else { continue };
        let encoded = frame.to_bytes();
        let len_header = u32::try_from(encoded.len()).unwrap_or(u32::MAX).to_be_bytes();

        let write_result: std::io::Result<()> = async {
            stream.write_all(&len_header).await?;
            stream.write_all(&encoded).await?;
            Ok(())
        }
        .await;

        if let Err(err) = write_result {
            tracing::warn!(%err, host, port, "tcp handler write failed, reconnecting");
            conn = None;
        }
    }
}

#[async_trait]
impl OutputHandler for TcpHandler {
    async fn send(&self, frame: &Frame) {
        let mut frame = frame.clone();
        frame.meta.insert("topic".to_string(), MetaValue::Str(self.source_id.clone()));
        self.queue.push(frame);
    }

    async fn close(&self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use edgeflow_proto::MetaMap;
    use tokio::{io::AsyncReadExt, net::TcpListener};

    use super::*;

    #[tokio::test]
    async fn send_delivers_length_prefixed_frame_tagged_with_source_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handler = TcpHandler::new(addr.ip().to_string(), addr.port(), "cam-1");
        let frame = Frame::new(9, 1.0, MetaMap::new(), b"jpeg-bytes".to_vec());
        handler.send(&frame).await;

        let (mut socket, _) = tokio::time::timeout(Duration::from_secs(2), listener.accept())
            .await
            .unwrap()
            .unwrap();

        let mut len_buf = [0u8; 4];
        socket.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        socket.read_exact(&mut body).await.unwrap();

        let decoded = Frame::decode(&body).unwrap();
        assert_eq!(decoded.frame_id, 9);
        assert_eq!(decoded.meta.get("topic").and_then(MetaValue::as_str), Some("cam-1"));

        handler.close().await;
    }

    #[tokio::test]
    async fn queue_drops_oldest_when_full() {
        let handler = TcpHandler::new("127.0.0.1", 1, "cam-1");
        for id in 0..(QUEUE_CAPACITY as u32 + 5) {
            let frame = Frame::new(id, 0.0, MetaMap::new(), b"x".to_vec());
            handler.send(&frame).await;
        }
        assert_eq!(handler.queue.frames.lock().unwrap().len(), QUEUE_CAPACITY);
        handler.close().await;
    }
}

//! Length-prefixed TCP ingress: accepts connections from any number of upstream
//! [`edgeflow_handlers::TcpHandler`]s and routes each decoded frame into [`SharedState`].

use std::sync::Arc;

use edgeflow_proto::Frame;
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
};

use crate::state::SharedState;

/// Accept loop: binds `addr` and spawns one reader task per accepted connection, forever.
pub async fn run(listener: TcpListener, state: Arc<SharedState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "gateway ingress accepted connection");
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    read_frames(stream, &state).await;
                    tracing::debug!(%peer, "gateway ingress connection closed");
                });
            },
            Err(err) => {
                tracing::warn!(%err, "gateway ingress accept failed");
            },
        }
    }
}

/// Read `[length:u32 BE][frame_bytes]` messages from `stream` until EOF or a protocol error,
/// closing the connection (by returning, dropping the socket) on either.
async fn read_frames(mut stream: TcpStream, state: &SharedState) {
    loop {
        let mut len_buf = [0u8; 4];
        if let Err(err) = stream.read_exact(&mut len_buf).await {
            if err.kind() != std::io::ErrorKind::UnexpectedEof {
                tracing::warn!(%err, "gateway ingress read failed");
            }
            return;
        }
        let len = u32::from_be_bytes(len_buf) as usize;

        let mut body = vec![0u8; len];
        if let Err(err) = stream.read_exact(&mut body).await {
            tracing::warn!(%err, "gateway ingress truncated frame body");
            return;
        }

        let frame = match Frame::decode(&body) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "gateway ingress dropped malformed frame, closing connection");
                return;
            },
        };

        #[allow(clippy::disallowed_methods)]
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        state.on_frame(&frame, now).await;
    }
}

#[cfg(test)]
mod tests {
    use edgeflow_proto::MetaMap;
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    use super::*;

    #[tokio::test]
    async fn two_frames_on_distinct_topics_both_land_in_state() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(SharedState::new(0.0, None));

        let accept_state = Arc::clone(&state);
        tokio::spawn(run_once(listener, accept_state));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        for topic in ["a", "b"] {
            let mut meta = MetaMap::new();
            meta.insert("topic".into(), edgeflow_proto::MetaValue::Str(topic.into()));
            let frame = Frame::new(1, 1.0, meta, b"x".to_vec());
            let encoded = frame.to_bytes();
            client.write_all(&(encoded.len() as u32).to_be_bytes()).await.unwrap();
            client.write_all(&encoded).await.unwrap();
        }
        drop(client);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(state.pop("a", 1.0).await.unwrap().as_ref(), b"x");
        assert_eq!(state.pop("b", 1.0).await.unwrap().as_ref(), b"x");
    }

    async fn run_once(listener: TcpListener, state: Arc<SharedState>) {
        if let Ok((stream, _)) = listener.accept().await {
            read_frames(stream, &state).await;
        }
    }
}

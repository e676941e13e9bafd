//! IPC client for the node's administrative socket.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::admin::Transport;
use crate::envelope::{RpcRequest, RpcResponse};
use crate::frame::{Frame, FrameBuffer};
use crate::RpcError;

/// Delay between connection attempts while the node is not yet listening.
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Size of a single socket read.
const READ_CHUNK: usize = 16 * 1024;

/// Request ids are drawn from `0..=MAX_REQUEST_ID`.
const MAX_REQUEST_ID: u64 = 4095;

/// A persistent JSON-RPC connection to the node.
///
/// Generic over the stream so tests can drive it through an in-memory pipe.
pub struct IpcClient<S = UnixStream> {
    stream: S,
    buffer: FrameBuffer,
}

impl IpcClient<UnixStream> {
    /// Connect to the node's IPC socket, retrying until it accepts.
    ///
    /// The node creates its socket some time after start-up, so a missing or
    /// refusing endpoint is waited out rather than reported.
    pub async fn connect(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut attempts: u64 = 0;
        loop {
            match UnixStream::connect(path).await {
                Ok(stream) => {
                    tracing::info!(path = %path.display(), attempts, "connected to node IPC");
                    return Self::from_stream(stream);
                }
                Err(e) => {
                    if attempts == 0 {
                        tracing::warn!(path = %path.display(), error = %e, "node IPC not ready, retrying");
                    } else {
                        tracing::debug!(path = %path.display(), error = %e, attempts, "node IPC still not ready");
                    }
                    attempts += 1;
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
    }
}

impl<S> IpcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::new(),
        }
    }

    /// Send one request and wait for its reply.
    ///
    /// Fails with [`RpcError::ProtocolMismatch`] when the reply carries a
    /// different id; the mismatched body is never returned.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<RpcResponse, RpcError> {
        let id = rand::thread_rng().gen_range(0..=MAX_REQUEST_ID);
        let request = RpcRequest::new(method, params, id);
        let bytes = serde_json::to_vec(&request)?;

        tracing::trace!(method, id, "sending request");
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        let value = self.read_frame().await?;
        let response: RpcResponse = serde_json::from_value(value)
            .map_err(|e| RpcError::MalformedResponse(e.to_string()))?;

        if !response.matches(id) {
            return Err(RpcError::ProtocolMismatch {
                expected: id,
                got: response.id,
            });
        }
        Ok(response)
    }

    async fn read_frame(&mut self) -> Result<Value, RpcError> {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(RpcError::ConnectionClosed);
            }
            self.buffer.extend(&chunk[..n])?;
            match self.buffer.decode() {
                Frame::Complete(value) => return Ok(value),
                Frame::Incomplete => {
                    tracing::warn!(buffer = %self.buffer.contents(), "incomplete JSON payload, reading more");
                }
            }
        }
    }
}

#[async_trait]
impl<S> Transport for IpcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn call(&mut self, method: &str, params: Value) -> Result<RpcResponse, RpcError> {
        IpcClient::call(self, method, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{duplex, DuplexStream};

    /// Read one request off the server end of the pipe.
    async fn read_request(server: &mut DuplexStream) -> RpcRequest {
        let mut fb = FrameBuffer::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = server.read(&mut chunk).await.unwrap();
            fb.extend(&chunk[..n]).unwrap();
            if let Frame::Complete(v) = fb.decode() {
                return serde_json::from_value(v).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn call_round_trip() {
        let (client_end, mut server) = duplex(4096);
        let mut client = IpcClient::from_stream(client_end);

        let node = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            assert_eq!(req.jsonrpc, "2.0");
            assert_eq!(req.method, "eth_blockNumber");
            assert!(req.id <= MAX_REQUEST_ID);
            let reply = RpcResponse::success(req.id, json!("0x10"));
            server
                .write_all(&serde_json::to_vec(&reply).unwrap())
                .await
                .unwrap();
            server
        });

        let resp = client.call("eth_blockNumber", json!([])).await.unwrap();
        assert_eq!(resp.into_result().unwrap(), json!("0x10"));
        node.await.unwrap();
    }

    #[tokio::test]
    async fn reply_split_across_reads_is_reassembled() {
        let (client_end, mut server) = duplex(4096);
        let mut client = IpcClient::from_stream(client_end);

        let node = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            let body = format!(r#"{{"jsonrpc":"2.0","id":{},"result":[1,2,3]}}"#, req.id);
            let (head, tail) = body.split_at(9);
            server.write_all(head.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            server.write_all(tail.as_bytes()).await.unwrap();
            server
        });

        let resp = client.call("admin_peers", json!([])).await.unwrap();
        assert_eq!(resp.result, Some(json!([1, 2, 3])));
        node.await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_id_is_protocol_error() {
        let (client_end, mut server) = duplex(4096);
        let mut client = IpcClient::from_stream(client_end);

        let node = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            let wrong = (req.id + 1) % (MAX_REQUEST_ID + 1);
            let reply = RpcResponse::success(wrong, json!(true));
            server
                .write_all(&serde_json::to_vec(&reply).unwrap())
                .await
                .unwrap();
            server
        });

        let err = client.call("admin_removePeer", json!(["x"])).await.unwrap_err();
        assert!(matches!(err, RpcError::ProtocolMismatch { .. }));
        node.await.unwrap();
    }

    #[tokio::test]
    async fn closed_connection_is_transport_error() {
        let (client_end, mut server) = duplex(4096);
        let mut client = IpcClient::from_stream(client_end);

        let node = tokio::spawn(async move {
            let _ = read_request(&mut server).await;
            server.write_all(br#"{"jsonrpc":"2.0""#).await.unwrap();
            drop(server);
        });

        let err = client.call("admin_nodeInfo", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
        assert!(err.is_transport());
        node.await.unwrap();
    }

    #[tokio::test]
    async fn connect_waits_for_socket_to_appear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.ipc");

        let listener_path = path.clone();
        let node = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let listener = tokio::net::UnixListener::bind(&listener_path).unwrap();
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut chunk = [0u8; 1024];
            let n = conn.read(&mut chunk).await.unwrap();
            let req: RpcRequest = serde_json::from_slice(&chunk[..n]).unwrap();
            let reply = RpcResponse::success(req.id, json!({ "enode": "enode://aa@1.2.3.4:30303" }));
            conn.write_all(&serde_json::to_vec(&reply).unwrap())
                .await
                .unwrap();
        });

        let mut client = IpcClient::connect(&path).await;
        let resp = client.call("admin_nodeInfo", json!([])).await.unwrap();
        assert!(resp.result.is_some());
        node.await.unwrap();
    }
}

//! Event-socket transport adapter.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, trace, warn};

use weld_core::{ConnectionIdentity, Request, TransportError, TransportResult};
use weld_framework::Pipeline;

use super::{parse, wire};
use crate::signal::ShutdownSignal;
use crate::Transport;

/// Event-socket listener configuration.
#[derive(Debug, Clone)]
pub struct EventSocketConfig {
    /// Address to bind, e.g. `0.0.0.0`.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

/// The event-socket transport adapter.
///
/// Owns a listening socket and runs one lightweight task per accepted
/// connection, so one slow client never blocks others. Each connection
/// task parses requests, submits them to the shared pipeline and writes
/// responses back in order, honoring keep-alive.
pub struct EventSocketServer {
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
}

impl EventSocketServer {
    /// Binds the listening socket.
    pub async fn bind(config: &EventSocketConfig, pipeline: Arc<Pipeline>) -> TransportResult<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(addr = %listener.local_addr()?, "event-socket listening");
        Ok(Self { listener, pipeline })
    }

    /// The actual bound address (useful with port 0).
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the shutdown signal is cancelled.
    pub async fn serve(self, shutdown: ShutdownSignal) -> TransportResult<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("event-socket stopped accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    trace!(peer = %peer, "connection accepted");
                    let pipeline = Arc::clone(&self.pipeline);
                    let signal = shutdown.clone();
                    shutdown.spawn(async move {
                        handle_connection(stream, peer, pipeline, signal).await;
                    });
                }
            }
        }
    }
}

#[async_trait]
impl Transport for EventSocketServer {
    async fn serve(self: Box<Self>, shutdown: ShutdownSignal) -> TransportResult<()> {
        EventSocketServer::serve(*self, shutdown).await
    }
}

/// Serves one connection until close, decode failure or drain.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    pipeline: Arc<Pipeline>,
    shutdown: ShutdownSignal,
) {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(peer = %peer, "draining, closing idle connection");
                break;
            }
            read = parse::read_message(&mut stream, &mut buf) => match read {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(err))) => {
                    debug!(peer = %peer, error = %err, "malformed request, answering 400");
                    let _ = stream.write_all(&wire::encode_parse_failure()).await;
                    break;
                }
                Ok(None) => break,
                Err(err) => {
                    debug!(peer = %peer, error = %err, "connection read failed");
                    break;
                }
            }
        };

        let keep_alive = parse::keep_alive(message.head.http_11, &message.head.headers);
        let request = Request::builder()
            .method(&message.head.method)
            .uri(message.head.target)
            .headers(message.head.headers)
            .body(message.body)
            .keep_alive(keep_alive)
            .identity(ConnectionIdentity::socket(peer.to_string()))
            .build();

        let written = match pipeline.handle(request).await {
            Ok(response) => {
                stream
                    .write_all(&wire::encode_response(&response, keep_alive))
                    .await
            }
            Err(err) => {
                // Past the recovery point; deliver the hardcoded
                // response rather than leaking a hung connection.
                warn!(peer = %peer, error = %err, "after filter failed");
                let _ = stream.write_all(wire::MINIMAL_ERROR).await;
                break;
            }
        };

        if written.is_err() {
            debug!(peer = %peer, "peer went away before response was written");
            break;
        }

        if !keep_alive || shutdown.is_cancelled() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use weld_core::{Response, StatusCode};
    use weld_framework::extract::{get, path, ExtractExt};
    use weld_framework::Router;

    use super::*;

    fn test_pipeline() -> Arc<Pipeline> {
        let router = Router::new()
            .route(get().and(path("/example")), |_req, _| async {
                Ok(Response::text("hello"))
            })
            .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) });

        Arc::new(
            Pipeline::builder()
                .router(router)
                .recover_fallback(|_req, _err| Response::internal_error())
                .build()
                .unwrap(),
        )
    }

    async fn start_server() -> (SocketAddr, ShutdownSignal) {
        start_server_with(test_pipeline()).await
    }

    async fn start_server_with(pipeline: Arc<Pipeline>) -> (SocketAddr, ShutdownSignal) {
        let config = EventSocketConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = EventSocketServer::bind(&config, pipeline).await.unwrap();
        let addr = server.local_addr().unwrap();

        let shutdown = ShutdownSignal::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.serve(signal).await;
        });
        (addr, shutdown)
    }

    async fn read_until_body(stream: &mut TcpStream, expected_tail: &str) -> String {
        let mut collected = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before full response");
            collected.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&collected).to_string();
            if text.ends_with(expected_tail) {
                return text;
            }
        }
    }

    #[tokio::test]
    async fn serves_matched_route_over_tcp() {
        let (addr, _shutdown) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream
            .write_all(b"GET /example HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();

        let text = read_until_body(&mut stream, "hello").await;
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
    }

    #[tokio::test]
    async fn keep_alive_serves_sequential_requests() {
        let (addr, _shutdown) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream
            .write_all(b"GET /example HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let first = read_until_body(&mut stream, "hello").await;
        assert!(first.starts_with("HTTP/1.1 200"));

        stream
            .write_all(b"POST /unknown-path HTTP/1.1\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        let second = read_until_body(&mut stream, "\r\n\r\n").await;
        assert!(second.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn after_filter_failure_delivers_minimal_500_and_closes() {
        use weld_core::PipelineError;

        let pipeline = Arc::new(
            Pipeline::builder()
                .responder(|_req| async { Ok(Response::text("never delivered")) })
                .recover_fallback(|_req, _err| Response::internal_error())
                .after(|_resp| async { Err(PipelineError::new("AfterBoom", "tag failed")) })
                .build()
                .unwrap(),
        );
        let (addr, _shutdown) = start_server_with(pipeline).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream
            .write_all(b"GET /example HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(!text.contains("never delivered"));
    }

    #[tokio::test]
    async fn malformed_request_gets_400_without_pipeline() {
        let (addr, _shutdown) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"NOT-HTTP\r\n\r\n").await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }
}

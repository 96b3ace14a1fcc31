//! Queue worker transport.
//!
//! Connects to a message broker over two TCP streams: one carrying
//! inbound request envelopes, one carrying outbound replies. Each
//! stream is opened with a single netstring handshake announcing the
//! worker identity, after which the broker starts pushing envelopes.
//!
//! Request envelopes are dispatched to the pipeline as tracked tasks,
//! so many requests can be in flight at once; replies are funnelled
//! through one writer task to keep the send stream coherent. A
//! malformed envelope is counted and dropped without tearing down the
//! connection. Disconnect directives are observed and discarded.
//!
//! # Example
//!
//! ```rust,ignore
//! let worker = QueueWorker::new(config, pipeline);
//! worker.serve(shutdown).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use weld_core::{Request, Response, TransportError, TransportResult};
use weld_framework::Pipeline;

use super::codec::{EnvelopeCodec, encode_netstring};
use super::envelope::{Envelope, ResponseEnvelope};
use crate::http::wire;
use crate::signal::ShutdownSignal;
use crate::Transport;

/// Broker addressing and worker identity.
#[derive(Debug, Clone)]
pub struct QueueWorkerConfig {
    /// Address of the broker's request-push socket.
    pub recv_addr: String,
    /// Address of the broker's reply socket.
    pub send_addr: String,
    /// Identity announced in the registration handshake.
    pub identity: String,
}

/// A worker pulling request envelopes from a broker.
pub struct QueueWorker {
    config: QueueWorkerConfig,
    pipeline: Arc<Pipeline>,
    decode_errors: Arc<AtomicU64>,
}

impl QueueWorker {
    pub fn new(config: QueueWorkerConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            decode_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of malformed envelopes dropped so far.
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    /// Runs the worker until the broker closes the stream or shutdown
    /// is signalled.
    pub async fn serve(self, shutdown: ShutdownSignal) -> TransportResult<()> {
        let recv = connect_and_register(&self.config.recv_addr, &self.config.identity).await?;
        let send = connect_and_register(&self.config.send_addr, &self.config.identity).await?;
        info!(
            recv = %self.config.recv_addr,
            send = %self.config.send_addr,
            identity = %self.config.identity,
            "queue worker registered"
        );

        let mut frames = FramedRead::new(recv, EnvelopeCodec::new());
        let (reply_tx, reply_rx) = mpsc::channel::<ResponseEnvelope>(64);
        shutdown.spawn(write_replies(send.into_split().1, reply_rx));

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("queue worker draining");
                    break;
                }
                frame = frames.next() => {
                    match frame {
                        None => {
                            return Err(TransportError::BrokerClosed(
                                self.config.recv_addr.clone(),
                            ));
                        }
                        Some(Err(err)) => return Err(err),
                        Some(Ok(Err(err))) => {
                            self.decode_errors.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %err, "dropping malformed envelope");
                        }
                        Some(Ok(Ok(Envelope::Disconnect { sender }))) => {
                            debug!(sender = %sender, "broker dropped sender connections");
                        }
                        Some(Ok(Ok(Envelope::Request(envelope)))) => {
                            let pipeline = Arc::clone(&self.pipeline);
                            let reply_tx = reply_tx.clone();
                            shutdown.spawn(async move {
                                let reply = respond(&pipeline, envelope).await;
                                let _ = reply_tx.send(reply).await;
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for QueueWorker {
    async fn serve(self: Box<Self>, shutdown: ShutdownSignal) -> TransportResult<()> {
        (*self).serve(shutdown).await
    }
}

/// Runs one request envelope through the pipeline and addresses the
/// reply back to its originating (sender, connection) pair.
async fn respond(pipeline: &Pipeline, envelope: super::RequestEnvelope) -> ResponseEnvelope {
    let sender = envelope.sender.clone();
    let connection = envelope.connection.clone();
    let request: Request = envelope.into_request();

    let payload = match pipeline.handle(request).await {
        Ok(response) => wire::encode_payload(&response).to_vec(),
        Err(err) => {
            warn!(error = %err, sender = %sender, "request abandoned after post-filter failure");
            wire::encode_payload(&Response::internal_error()).to_vec()
        }
    };
    ResponseEnvelope::new(sender, connection, payload)
}

async fn connect_and_register(addr: &str, identity: &str) -> TransportResult<TcpStream> {
    let mut stream =
        TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::BrokerConnect {
                addr: addr.to_string(),
                source,
            })?;

    let mut handshake = BytesMut::new();
    encode_netstring(&mut handshake, identity.as_bytes());
    stream.write_all(&handshake).await?;
    Ok(stream)
}

async fn write_replies(mut send: OwnedWriteHalf, mut replies: mpsc::Receiver<ResponseEnvelope>) {
    let mut buf = BytesMut::new();
    while let Some(reply) = replies.recv().await {
        buf.clear();
        reply.encode(&mut buf);
        if let Err(err) = send.write_all(&buf).await {
            warn!(error = %err, "reply stream closed");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use weld_framework::PipelineBuilder;

    use super::*;

    fn counting_pipeline(hits: Arc<AtomicUsize>) -> Pipeline {
        PipelineBuilder::new()
            .responder(move |_req| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(Response::text("handled"))
                }
            })
            .recover_fallback(|_req, _err| Response::internal_error())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn request_envelope_gets_an_addressed_reply() {
        let hits = Arc::new(AtomicUsize::new(0));
        let pipeline = counting_pipeline(Arc::clone(&hits));

        let block = br#"{"METHOD":"GET"}"#;
        let Envelope::Request(envelope) =
            Envelope::decode(b"front-1", b"7", b"/anything", block, b"").unwrap()
        else {
            panic!("expected a request envelope");
        };

        let reply = respond(&pipeline, envelope).await;
        assert_eq!(reply.sender, "front-1");
        assert_eq!(reply.connection, "7");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let text = String::from_utf8(reply.payload).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("handled"));
    }

    #[tokio::test]
    async fn round_trip_against_a_fake_broker() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        use super::super::codec::{MAX_NETSTRING_BYTES, decode_netstring};

        let recv_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let send_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = QueueWorkerConfig {
            recv_addr: recv_listener.local_addr().unwrap().to_string(),
            send_addr: send_listener.local_addr().unwrap().to_string(),
            identity: "worker-1".to_string(),
        };

        let hits = Arc::new(AtomicUsize::new(0));
        let worker = QueueWorker::new(config, Arc::new(counting_pipeline(Arc::clone(&hits))));
        let errors = Arc::clone(&worker.decode_errors);

        let shutdown = ShutdownSignal::new();
        let serve_task = tokio::spawn(worker.serve(shutdown.clone()));

        let (mut broker_push, _) = recv_listener.accept().await.unwrap();
        let (mut broker_reply, _) = send_listener.accept().await.unwrap();

        // Both streams open with the registration handshake.
        let mut handshake = [0u8; 11];
        broker_push.read_exact(&mut handshake).await.unwrap();
        assert_eq!(&handshake, b"8:worker-1,");
        broker_reply.read_exact(&mut handshake).await.unwrap();
        assert_eq!(&handshake, b"8:worker-1,");

        // One malformed envelope (garbage header block), then a good one.
        let mut frames = BytesMut::new();
        for field in [&b"front-1"[..], b"9", b"/x", b"not json", b""] {
            encode_netstring(&mut frames, field);
        }
        for field in [&b"front-1"[..], b"9", b"/greet", br#"{"METHOD":"GET"}"#, b""] {
            encode_netstring(&mut frames, field);
        }
        broker_push.write_all(&frames).await.unwrap();

        // The reply envelope is three netstrings on the send stream.
        let mut reply = BytesMut::new();
        let fields = loop {
            let mut chunk = [0u8; 1024];
            let n = broker_reply.read(&mut chunk).await.unwrap();
            assert!(n > 0, "broker reply stream closed early");
            reply.extend_from_slice(&chunk[..n]);

            let mut scratch = reply.clone();
            let mut fields = Vec::new();
            while let Some(field) = decode_netstring(&mut scratch, MAX_NETSTRING_BYTES).unwrap() {
                fields.push(field);
            }
            if fields.len() == 3 {
                break fields;
            }
        };

        assert_eq!(fields[0].as_ref(), b"front-1");
        assert_eq!(fields[1].as_ref(), b"9");
        let payload = String::from_utf8(fields[2].to_vec()).unwrap();
        assert!(payload.starts_with("HTTP/1.1 200 OK\r\n"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::Relaxed), 1);

        shutdown.cancel();
        serve_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn disconnect_directive_never_reaches_the_pipeline() {
        use std::time::Duration;

        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let recv_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let send_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = QueueWorkerConfig {
            recv_addr: recv_listener.local_addr().unwrap().to_string(),
            send_addr: send_listener.local_addr().unwrap().to_string(),
            identity: "worker-1".to_string(),
        };

        let hits = Arc::new(AtomicUsize::new(0));
        let worker = QueueWorker::new(config, Arc::new(counting_pipeline(Arc::clone(&hits))));
        let errors = Arc::clone(&worker.decode_errors);

        let shutdown = ShutdownSignal::new();
        let serve_task = tokio::spawn(worker.serve(shutdown.clone()));

        let (mut broker_push, _) = recv_listener.accept().await.unwrap();
        let (mut broker_reply, _) = send_listener.accept().await.unwrap();

        let mut handshake = [0u8; 11];
        broker_push.read_exact(&mut handshake).await.unwrap();
        broker_reply.read_exact(&mut handshake).await.unwrap();

        // Wildcard connection with an empty body is the broker telling
        // the worker that a sender's connections went away.
        let mut frames = BytesMut::new();
        for field in [&b"front-1"[..], b"*", b"", b"", b""] {
            encode_netstring(&mut frames, field);
        }
        broker_push.write_all(&frames).await.unwrap();

        // The directive is consumed without a reply: nothing shows up
        // on the send stream within the grace window.
        let mut chunk = [0u8; 64];
        let silent =
            tokio::time::timeout(Duration::from_millis(200), broker_reply.read(&mut chunk)).await;
        assert!(silent.is_err(), "unexpected reply to a disconnect directive");

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::Relaxed), 0);

        shutdown.cancel();
        serve_task.await.unwrap().unwrap();
    }
}

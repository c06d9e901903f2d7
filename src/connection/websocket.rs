//! WebSocket transport
//!
//! Implements [`Connection`] over any `tokio-tungstenite` stream. Text frames
//! carry JSON envelopes; binary frames are accepted when they hold UTF-8.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use crate::chat::Conversant;
use crate::error::{AuthError, Error, Result};
use crate::protocol::{decode_credentials, Credentials, Request, Response};
use crate::server::config::ConnectionConfig;

use super::{Authenticator, Connection, ConnectionId, Leave};

/// A client session over a WebSocket
pub struct WsConnection<S> {
    id: ConnectionId,
    socket: Option<WebSocketStream<S>>,
    authenticator: Arc<dyn Authenticator>,
    config: ConnectionConfig,
    conversant: Option<Conversant>,
    requests_tx: Option<mpsc::Sender<Request>>,
    requests_rx: mpsc::Receiver<Request>,
    responses_tx: mpsc::Sender<Response>,
    responses_rx: Option<mpsc::Receiver<Response>>,
    leave: Leave,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an upgraded WebSocket
    ///
    /// Nothing is read until [`authorize`](Connection::authorize) is called.
    pub fn new(
        id: ConnectionId,
        socket: WebSocketStream<S>,
        authenticator: Arc<dyn Authenticator>,
        config: ConnectionConfig,
    ) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(config.request_buffer.max(1));
        let (responses_tx, responses_rx) = mpsc::channel(config.response_buffer.max(1));

        Self {
            id,
            socket: Some(socket),
            authenticator,
            config,
            conversant: None,
            requests_tx: Some(requests_tx),
            requests_rx,
            responses_tx,
            responses_rx: Some(responses_rx),
            leave: Leave::new(),
        }
    }

    fn start_pumps(&mut self, socket: WebSocketStream<S>) -> Result<()> {
        let (requests, responses) = match (self.requests_tx.take(), self.responses_rx.take()) {
            (Some(requests), Some(responses)) => (requests, responses),
            _ => return Err(Error::Closed),
        };
        let (sink, stream) = socket.split();

        tokio::spawn(pump_in(self.id, stream, requests, self.leave.clone()));
        tokio::spawn(pump_out(
            self.id,
            sink,
            responses,
            self.leave.clone(),
            self.config.write_timeout,
        ));
        Ok(())
    }
}

#[async_trait]
impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn authorize(&mut self) -> Result<()> {
        if self.conversant.is_some() {
            return Err(AuthError::AlreadyAuthorized.into());
        }
        let mut socket = self.socket.take().ok_or(Error::Closed)?;

        let outcome = match timeout(self.config.handshake_timeout, read_credentials(&mut socket))
            .await
        {
            Ok(Ok(credentials)) => self.authenticator.authenticate(&credentials).await,
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AuthError::Timeout),
        };

        match outcome {
            Ok(conversant) => {
                tracing::debug!(
                    connection_id = self.id,
                    conversant = %conversant.id,
                    "Connection authorized"
                );
                self.conversant = Some(conversant);
                self.start_pumps(socket)
            }
            Err(e) => {
                tracing::debug!(connection_id = self.id, error = %e, "Authorization failed");
                let _ = timeout(self.config.write_timeout, socket.close(None)).await;
                self.leave.fire();
                Err(e.into())
            }
        }
    }

    fn conversant(&self) -> Option<&Conversant> {
        self.conversant.as_ref()
    }

    fn requests(&mut self) -> &mut mpsc::Receiver<Request> {
        &mut self.requests_rx
    }

    fn responses(&self) -> mpsc::Sender<Response> {
        self.responses_tx.clone()
    }

    fn leave(&self) -> Leave {
        self.leave.clone()
    }
}

/// Read frames until the credential frame arrives
async fn read_credentials<S>(socket: &mut WebSocketStream<S>) -> std::result::Result<Credentials, AuthError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match socket.next().await {
            Some(Ok(WsMessage::Text(text))) => return decode_credentials(text.as_str()),
            Some(Ok(WsMessage::Binary(data))) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| AuthError::MalformedCredentials(e.to_string()))?;
                return decode_credentials(text);
            }
            Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => {
                return Err(AuthError::Disconnected)
            }
            Some(Ok(_)) => continue,
        }
    }
}

/// Decode inbound frames into requests until leave fires
async fn pump_in<S>(
    id: ConnectionId,
    mut stream: SplitStream<WebSocketStream<S>>,
    requests: mpsc::Sender<Request>,
    leave: Leave,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = leave.fired() => break,
            frame = stream.next() => frame,
        };

        let request = match frame {
            Some(Ok(WsMessage::Text(text))) => Request::decode(text.as_str()),
            Some(Ok(WsMessage::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => Request::decode(text),
                Err(e) => Err(Error::Protocol(format!("binary frame is not UTF-8: {}", e))),
            },
            Some(Ok(WsMessage::Close(_))) | None => {
                tracing::debug!(connection_id = id, "Peer closed connection");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(connection_id = id, error = %e, "Read failed");
                break;
            }
        };

        let request = match request {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(connection_id = id, error = %e, "Undecodable frame, closing");
                break;
            }
        };

        tokio::select! {
            _ = leave.fired() => break,
            sent = requests.send(request) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    leave.fire();
}

/// Serialize and write responses until leave fires
async fn pump_out<S>(
    id: ConnectionId,
    mut sink: SplitSink<WebSocketStream<S>, WsMessage>,
    mut responses: mpsc::Receiver<Response>,
    leave: Leave,
    write_timeout: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let response = tokio::select! {
            _ = leave.fired() => break,
            response = responses.recv() => match response {
                Some(response) => response,
                None => break,
            },
        };

        let frame = match response.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(connection_id = id, error = %e, "Failed to encode response");
                continue;
            }
        };

        match timeout(write_timeout, sink.send(WsMessage::text(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(connection_id = id, error = %e, "Write failed");
                break;
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "Write deadline exceeded"
                );
                break;
            }
        }
    }

    leave.fire();
    let _ = timeout(write_timeout, sink.close()).await;
}

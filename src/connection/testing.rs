//! In-process connection for unit tests

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chat::Conversant;
use crate::error::{AuthError, Result};
use crate::protocol::{Request, Response};

use super::{Connection, ConnectionId, Leave};

const WAIT: Duration = Duration::from_secs(2);

/// Connection whose transport is a pair of channels
pub(crate) struct MockConnection {
    id: ConnectionId,
    identity: Conversant,
    accept: bool,
    conversant: Option<Conversant>,
    requests: mpsc::Receiver<Request>,
    responses: mpsc::Sender<Response>,
    leave: Leave,
}

/// Client end of a [`MockConnection`]
pub(crate) struct MockPeer {
    pub requests: mpsc::Sender<Request>,
    pub responses: mpsc::Receiver<Response>,
    pub leave: Leave,
}

impl MockPeer {
    pub async fn send(&self, request: Request) {
        self.requests.send(request).await.expect("handler gone");
    }

    pub async fn recv(&mut self) -> Response {
        tokio::time::timeout(WAIT, self.responses.recv())
            .await
            .expect("timed out waiting for response")
            .expect("response channel closed")
    }

    pub async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.responses.recv()).await;
        assert!(next.is_err(), "unexpected response: {:?}", next);
    }
}

pub(crate) fn mock_connection(id: ConnectionId, identity: Conversant) -> (MockConnection, MockPeer) {
    build(id, identity, true)
}

pub(crate) fn rejecting_connection(id: ConnectionId, identity: Conversant) -> (MockConnection, MockPeer) {
    build(id, identity, false)
}

fn build(id: ConnectionId, identity: Conversant, accept: bool) -> (MockConnection, MockPeer) {
    let (requests_tx, requests_rx) = mpsc::channel(16);
    let (responses_tx, responses_rx) = mpsc::channel(64);
    let leave = Leave::new();

    let conn = MockConnection {
        id,
        identity,
        accept,
        conversant: None,
        requests: requests_rx,
        responses: responses_tx,
        leave: leave.clone(),
    };
    let peer = MockPeer {
        requests: requests_tx,
        responses: responses_rx,
        leave,
    };
    (conn, peer)
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn authorize(&mut self) -> Result<()> {
        if !self.accept {
            self.leave.fire();
            return Err(AuthError::Rejected("mock rejection".into()).into());
        }
        self.conversant = Some(self.identity.clone());
        Ok(())
    }

    fn conversant(&self) -> Option<&Conversant> {
        self.conversant.as_ref()
    }

    fn requests(&mut self) -> &mut mpsc::Receiver<Request> {
        &mut self.requests
    }

    fn responses(&self) -> mpsc::Sender<Response> {
        self.responses.clone()
    }

    fn leave(&self) -> Leave {
        self.leave.clone()
    }
}

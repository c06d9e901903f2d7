//! Per-connection request loop

use crate::connection::Connection;
use crate::error::{AuthError, Error, Result};
use crate::protocol::{
    CreateConversationRequest, Request, Response, RetrieveConversationRequest,
    SendMessageRequest, CREATE_FAILED, RETRIEVE_FAILED, SEND_FAILED,
};
use crate::registry::ConnectionHandle;
use crate::server::worker::SendJob;

use super::context::SessionContext;
use super::state::{SessionPhase, SessionState};

/// Dispatches one authorized connection's requests until it leaves
pub struct SessionHandler<C: Connection> {
    conn: C,
    handle: ConnectionHandle,
    state: SessionState,
    ctx: SessionContext,
}

impl<C: Connection> SessionHandler<C> {
    /// Wrap an authorized connection
    ///
    /// Fails if `authorize` has not completed on `conn`.
    pub fn new(conn: C, ctx: SessionContext) -> Result<Self> {
        let (Some(handle), Some(conversant)) = (
            ConnectionHandle::for_connection(&conn),
            conn.conversant().cloned(),
        ) else {
            return Err(AuthError::Rejected("connection not authorized".into()).into());
        };

        Ok(Self {
            state: SessionState::new(conn.id(), conversant),
            conn,
            handle,
            ctx,
        })
    }

    /// Registry handle for this connection
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Run until the connection leaves or its request stream ends
    ///
    /// Always deregisters before returning.
    pub async fn run(mut self) -> SessionState {
        let leave = self.conn.leave();

        tracing::debug!(
            connection_id = self.state.connection_id,
            conversant = %self.state.conversant.id,
            "Session started"
        );

        while self.state.phase == SessionPhase::Active {
            let request = tokio::select! {
                biased;
                _ = leave.fired() => None,
                request = self.conn.requests().recv() => request,
            };

            match request {
                Some(request) => self.dispatch(request).await,
                None => break,
            }
        }

        self.terminate().await;
        self.state
    }

    async fn dispatch(&mut self, request: Request) {
        self.state.record_request();
        self.ctx.stats.request_received();

        tracing::trace!(
            connection_id = self.state.connection_id,
            request = request.kind(),
            "Request"
        );

        let response = match request {
            Request::Invalid(e) => Some(self.fail(&Error::from(e), SEND_FAILED)),
            Request::SendMessage(req) => self.send_message(req).await,
            Request::CreateConversation(req) => Some(self.create_conversation(req).await),
            Request::RetrieveConversation(req) => Some(self.retrieve_conversation(req).await),
        };

        if let Some(response) = response {
            if !self.handle.reply(response).await {
                tracing::debug!(
                    connection_id = self.state.connection_id,
                    "Reply dropped, outbound closed"
                );
            }
        }
    }

    /// Validate and queue; success is answered by fan-out, not here
    ///
    /// A leave while waiting for queue space abandons the message.
    async fn send_message(&mut self, req: SendMessageRequest) -> Option<Response> {
        let message = match self.ctx.interactor.prepare_message(&self.state.conversant, req) {
            Ok(message) => message,
            Err(e) => return Some(self.fail(&Error::from(e), SEND_FAILED)),
        };

        let job = SendJob {
            origin: self.handle.clone(),
            message,
        };
        let leave = self.conn.leave();
        let queued = tokio::select! {
            biased;
            _ = leave.fired() => {
                tracing::debug!(
                    connection_id = self.state.connection_id,
                    "Left while waiting for worker queue"
                );
                return None;
            }
            queued = self.ctx.queue.enqueue(job) => queued,
        };
        match queued {
            Ok(()) => None,
            Err(e) => {
                if matches!(e, Error::Backpressure) {
                    self.ctx.stats.backpressure();
                }
                Some(self.fail(&e, SEND_FAILED))
            }
        }
    }

    async fn create_conversation(&mut self, req: CreateConversationRequest) -> Response {
        match self
            .ctx
            .interactor
            .create_conversation(&self.state.conversant, req)
            .await
        {
            Ok(conversation) => {
                tracing::info!(
                    conversation = %conversation.id,
                    creator = %self.state.conversant.id,
                    members = conversation.conversants.len(),
                    direct = conversation.direct,
                    "Conversation created"
                );
                Response::NewConversation(conversation)
            }
            Err(e) => self.fail(&e, CREATE_FAILED),
        }
    }

    async fn retrieve_conversation(&mut self, req: RetrieveConversationRequest) -> Response {
        match self.ctx.interactor.retrieve_conversation(req).await {
            Ok(conversation) => Response::ReturnConversation(conversation),
            Err(e) => self.fail(&e, RETRIEVE_FAILED),
        }
    }

    fn fail(&mut self, err: &Error, storage_message: &str) -> Response {
        self.state.record_error();
        if matches!(err, Error::Validation(_)) {
            self.ctx.stats.request_invalid();
        }
        tracing::debug!(
            connection_id = self.state.connection_id,
            error = %err,
            "Request failed"
        );
        Response::failure(err, storage_message)
    }

    async fn terminate(&mut self) {
        if !self.state.terminate() {
            return;
        }

        // pumps may still be running if only the request stream ended
        self.conn.leave().fire();

        self.ctx
            .registry
            .remove(self.state.conversant.id, &self.handle)
            .await;
        self.ctx.stats.connection_closed();

        tracing::info!(
            connection_id = self.state.connection_id,
            conversant = %self.state.conversant.id,
            requests = self.state.requests,
            errors = self.state.errors,
            duration_ms = self.state.duration().as_millis() as u64,
            "Session terminated"
        );
    }
}

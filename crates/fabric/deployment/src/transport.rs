//! In-process transport
//!
//! Requests travel over a bounded `mpsc` channel, each carrying a `oneshot`
//! sender for its response. [`serve`] drains the channel into a
//! [`ProtocolHandler`] one request at a time.

use crate::error::ProtocolError;
use crate::protocol::{ProtocolHandler, ProtocolRequest, ProtocolResponse, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// A request and the slot its response goes to
pub struct Envelope {
    pub request: ProtocolRequest,
    pub reply: oneshot::Sender<ProtocolResponse>,
}

#[derive(Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl ChannelTransport {
    pub fn channel(capacity: usize, timeout: Duration) -> (Self, mpsc::Receiver<Envelope>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, timeout }, receiver)
    }

    /// Start serving `handler` on a background task
    pub fn spawn(
        handler: Arc<dyn ProtocolHandler>,
        capacity: usize,
        timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (transport, receiver) = Self::channel(capacity, timeout);
        let task = tokio::spawn(serve(handler, receiver));
        (transport, task)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn request(&self, request: ProtocolRequest) -> Result<ProtocolResponse, ProtocolError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope { request, reply })
            .await
            .map_err(|_| ProtocolError::ChannelClosed)?;

        match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ProtocolError::ChannelClosed),
            Err(_) => Err(ProtocolError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

pub async fn serve(handler: Arc<dyn ProtocolHandler>, mut receiver: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { request, reply }) = receiver.recv().await {
        let response = handler.handle(request).await;
        if reply.send(response).is_err() {
            debug!("Requester dropped before the response was ready");
        }
    }
    debug!("Transport closed");
}

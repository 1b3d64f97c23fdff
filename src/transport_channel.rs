//! In-process channel transport for the control plane.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::command::TransportRequest;
use crate::dispatch::Dispatcher;
use crate::reply::WireReply;
use crate::transport::{self, ControlTransport, ReplyError};

type RequestTx = mpsc::Sender<(TransportRequest, oneshot::Sender<WireReply>)>;
type RequestRx = mpsc::Receiver<(TransportRequest, oneshot::Sender<WireReply>)>;

/// Channel-backed [`ControlTransport`]: requests arrive paired with a
/// oneshot reply slot.
pub struct ChannelTransport {
    rx: RequestRx,
    pending: Option<oneshot::Sender<WireReply>>,
}

impl ChannelTransport {
    /// Create a transport and the controller-side handle feeding it.
    pub fn new(capacity: usize) -> (Self, ControlHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { rx, pending: None }, ControlHandle { tx })
    }
}

#[async_trait]
impl ControlTransport for ChannelTransport {
    async fn recv(&mut self) -> Option<TransportRequest> {
        let (request, reply_tx) = self.rx.recv().await?;
        self.pending = Some(reply_tx);
        Some(request)
    }

    async fn send_reply(&mut self, reply: WireReply) -> Result<(), ReplyError> {
        let slot = self.pending.take().ok_or(ReplyError::NoPending)?;
        slot.send(reply).map_err(|_| ReplyError::ChannelClosed)
    }

    async fn teardown(&mut self) {
        self.rx.close();
    }
}

/// Controller-side handle: send a raw frame, await its correlated reply.
#[derive(Clone)]
pub struct ControlHandle {
    tx: RequestTx,
}

impl ControlHandle {
    /// Spawn a worker serving `dispatcher` over a fresh channel transport
    /// and return the handle to it.
    pub fn spawn(dispatcher: Arc<Dispatcher>) -> Self {
        let (channel, handle) = ChannelTransport::new(64);
        tokio::spawn(transport::serve(dispatcher, channel));
        handle
    }

    /// Send a request and await its reply.
    pub async fn send(&self, request: TransportRequest) -> Result<WireReply, ReplyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send((request, reply_tx)).await.map_err(|_| ReplyError::ChannelClosed)?;
        reply_rx.await.map_err(|_| ReplyError::ChannelClosed)
    }
}

//! Transport boundary: the contract between the dispatch core and whatever
//! carries raw frames to and from the single registered controller.
//!
//! The core is transport-agnostic. An implementation delivers
//! [`TransportRequest`] frames, accepts one [`WireReply`] per frame, and
//! tears the endpoint down when the dispatcher terminates. [`serve`] is the
//! drive loop shared by every implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::attr::AttrTag;
use crate::command::{Command, TransportRequest};
use crate::dispatch::Dispatcher;
use crate::reply::WireReply;

/// Family name registered with the transport at startup.
pub const FAMILY_NAME: &str = "pathveil";

/// Control protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Endpoint registration handed to the transport at startup: the family,
/// the three command ids, and the attribute schema (one optional string
/// field under [`AttrTag::Msg`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registration {
    /// Family name identifying the endpoint.
    pub family: &'static str,
    /// Protocol version.
    pub version: u8,
    /// Commands the endpoint accepts.
    pub commands: [Command; 3],
    /// Tag of the single recognized attribute.
    pub path_tag: AttrTag,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            family: FAMILY_NAME,
            version: PROTOCOL_VERSION,
            commands: [Command::Hide, Command::Unhide, Command::Uninstall],
            path_tag: AttrTag::Msg,
        }
    }
}

/// Failure to deliver a reply frame. Local to one request: logged, reported
/// to the transport's caller, and never allowed to crash the agent.
#[derive(thiserror::Error, Debug)]
pub enum ReplyError {
    /// The control channel closed before the reply could be delivered.
    #[error("control channel closed before reply delivery")]
    ChannelClosed,
    /// `send_reply` was called with no request awaiting a reply.
    #[error("no request pending a reply")]
    NoPending,
    /// The transport could not allocate or encode the reply frame.
    #[error("reply buffer: {0}")]
    Buffer(String),
}

/// A control-channel implementation the core can be served over.
#[async_trait]
pub trait ControlTransport: Send {
    /// Registration advertised for this endpoint.
    fn registration(&self) -> Registration {
        Registration::default()
    }

    /// Receive the next raw frame. `None` means the channel is closed.
    async fn recv(&mut self) -> Option<TransportRequest>;

    /// Deliver the reply for the most recently received frame.
    async fn send_reply(&mut self, reply: WireReply) -> Result<(), ReplyError>;

    /// Tear the endpoint down. Called once, after termination or channel
    /// close.
    async fn teardown(&mut self);
}

/// Drive a dispatcher over a transport until the channel closes or the
/// agent terminates. Every received frame gets exactly one reply attempt;
/// a delivery failure is logged and the loop continues, since the request
/// itself completed and the lock is long released.
pub async fn serve<T: ControlTransport>(dispatcher: Arc<Dispatcher>, mut transport: T) {
    let registration = transport.registration();
    info!(
        target: "pathveil::transport",
        family = registration.family,
        version = registration.version,
        "control endpoint registered"
    );
    while let Some(request) = transport.recv().await {
        let outcome = dispatcher.dispatch(request).await;
        if let Err(err) = transport.send_reply(outcome.reply).await {
            error!(target: "pathveil::transport", %err, "failed to deliver reply");
        }
        if outcome.terminated {
            break;
        }
    }
    transport.teardown().await;
    info!(target: "pathveil::transport", "control endpoint torn down");
}

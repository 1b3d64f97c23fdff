#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # pathveil
//!
//! Command-dispatch core for a path-hiding policy agent. A single trusted
//! controller issues three operations over a connectionless request/reply
//! channel: hide a filesystem path, unhide it, and uninstall the agent.
//!
//! The crate owns parsing the structured request, validating its one
//! payload field, serializing mutations of the hidden-path set against
//! concurrent requests, and producing exactly one correlated reply per
//! request. The transport carrying raw frames and the mechanism that
//! actually hides paths sit behind the [`transport::ControlTransport`] and
//! [`effector::Effector`] traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use pathveil::{ControlHandle, Correlation, Dispatcher, TransportRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Arc::new(Dispatcher::builder().build());
//!     let handle = ControlHandle::spawn(dispatcher);
//!
//!     let request = TransportRequest::hide("/etc/secret", Correlation::new(1, 0));
//!     let reply = handle.send(request).await.unwrap();
//!     println!("{:?}", reply.decode());
//! }
//! ```

pub mod attr;
pub mod command;
pub mod dispatch;
pub mod effector;
pub mod error;
pub mod reply;
pub mod store;
pub mod transport;
pub mod transport_channel;

// Re-exports
pub use attr::{AttrError, AttrTag, ReplyPayload};
pub use command::{Command, Correlation, Request, Response, ResultCode, TransportRequest};
pub use dispatch::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use effector::{Effector, EffectorCall, EffectorError, RecordingEffector, TracingEffector};
pub use error::AgentError;
pub use reply::WireReply;
pub use store::PolicyStore;
pub use transport::{serve, ControlTransport, Registration, ReplyError, FAMILY_NAME, PROTOCOL_VERSION};
pub use transport_channel::{ChannelTransport, ControlHandle};

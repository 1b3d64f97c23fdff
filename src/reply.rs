//! Reply builder: assembles the correlated wire response for one request.
//!
//! The dispatcher emits code replies only: every wire reply carries the
//! one-byte result code, and the human-readable `Response.message` stays
//! in-process (it is logged on rejection). [`build_message`] implements
//! the wire contract's descriptive-string variant for controller-side
//! diagnostics; no dispatch path emits it.
//!
//! Building never fails given a valid correlation token; a transport that
//! cannot deliver the frame reports that to its own caller as a
//! [`crate::transport::ReplyError`], distinct from a reply that merely
//! carries a handler-level failure code.

use crate::attr::{self, AttrError, ReplyPayload};
use crate::command::{Correlation, Response};

/// Wire-ready response frame handed back to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireReply {
    /// Reply routing token: the request's endpoint, sequence advanced by one.
    pub correlation: Correlation,
    /// Echo of the request's command id.
    pub command_id: u8,
    /// Encoded attribute payload.
    pub payload: Vec<u8>,
}

impl WireReply {
    /// Decode this reply's payload (controller side).
    pub fn decode(&self) -> Result<ReplyPayload, AttrError> {
        attr::decode_reply(&self.payload)
    }
}

/// Build the standard reply: the one-byte result code under the `Msg` tag.
pub fn build(correlation: Correlation, response: &Response) -> WireReply {
    WireReply {
        correlation: correlation.reply(),
        command_id: response.command_id,
        payload: attr::encode_result(response.result),
    }
}

/// Build a reply whose `Msg` attribute carries a descriptive string instead
/// of the result code. Used for diagnostic reply variants.
pub fn build_message(correlation: Correlation, command_id: u8, text: &str) -> WireReply {
    WireReply {
        correlation: correlation.reply(),
        command_id,
        payload: attr::encode_message(text),
    }
}

//! Commands, correlation tokens, and the request/response model.
//!
//! The wire identifiers here are a stable contract with the controller:
//! command ids `0..=2` and result codes `0..=5` must not be renumbered.

use crate::attr;
use crate::error::AgentError;

/// Control command accepted by the agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Hide a filesystem path.
    Hide = 0,
    /// Unhide a previously hidden path.
    Unhide = 1,
    /// Reverse all hides and terminate the agent.
    Uninstall = 2,
}

impl Command {
    /// Map a wire command id to a command. Unknown ids are a protocol error
    /// handled by the dispatcher.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Command::Hide),
            1 => Some(Command::Unhide),
            2 => Some(Command::Uninstall),
            _ => None,
        }
    }

    /// Wire command id.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Stable label for logs and audit output.
    pub fn label(self) -> &'static str {
        match self {
            Command::Hide => "hide",
            Command::Unhide => "unhide",
            Command::Uninstall => "uninstall",
        }
    }

    /// Whether the command carries a mandatory path attribute.
    pub fn requires_path(self) -> bool {
        matches!(self, Command::Hide | Command::Unhide)
    }
}

/// Transport-supplied token routing a reply back to the caller that issued
/// the request. Opaque to the dispatch core apart from the reply sequence
/// advance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Correlation {
    /// Identifies the calling endpoint.
    pub port_id: u32,
    /// Request sequence number.
    pub seq: u32,
}

impl Correlation {
    /// Create a correlation token.
    pub fn new(port_id: u32, seq: u32) -> Self {
        Self { port_id, seq }
    }

    /// Correlation for the reply: same endpoint, sequence advanced by one.
    pub fn reply(self) -> Self {
        Self { port_id: self.port_id, seq: self.seq.wrapping_add(1) }
    }
}

/// Raw frame as delivered by the transport: a command id, the undecoded
/// attribute payload, and the correlation token.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// Wire command id.
    pub command_id: u8,
    /// Raw attribute payload.
    pub attrs: Vec<u8>,
    /// Token routing the reply.
    pub correlation: Correlation,
}

impl TransportRequest {
    /// Build a Hide request frame (controller side).
    pub fn hide(path: &str, correlation: Correlation) -> Self {
        Self { command_id: Command::Hide.id(), attrs: attr::encode_path(path), correlation }
    }

    /// Build an Unhide request frame (controller side).
    pub fn unhide(path: &str, correlation: Correlation) -> Self {
        Self { command_id: Command::Unhide.id(), attrs: attr::encode_path(path), correlation }
    }

    /// Build an Uninstall request frame (controller side). Carries no
    /// attributes.
    pub fn uninstall(correlation: Correlation) -> Self {
        Self { command_id: Command::Uninstall.id(), attrs: Vec::new(), correlation }
    }
}

/// Parsed form of one inbound frame. Immutable once decoded; lives only for
/// the handling of a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Hide the given path.
    Hide {
        /// Path to hide.
        path: String,
    },
    /// Unhide the given path.
    Unhide {
        /// Path to unhide.
        path: String,
    },
    /// Reverse all hides and terminate.
    Uninstall,
}

impl Request {
    /// Decode the attribute payload of a known command into a typed request.
    ///
    /// Hide/Unhide require the path attribute; Uninstall ignores the payload
    /// entirely, present or not.
    pub fn decode(command: Command, attrs: &[u8]) -> Result<Self, AgentError> {
        match command {
            Command::Hide => Ok(Request::Hide { path: attr::decode_path(attrs)? }),
            Command::Unhide => Ok(Request::Unhide { path: attr::decode_path(attrs)? }),
            Command::Uninstall => Ok(Request::Uninstall),
        }
    }
}

/// Result code carried in every reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    /// Command applied.
    Ok = 0,
    /// Resource, allocation, or lock-acquisition fault.
    ErrorSystem = 1,
    /// Malformed or out-of-sequence request.
    ErrorProtocol = 2,
    /// Required path attribute missing or empty.
    ErrorNoPath = 3,
    /// Unhide referenced a path that is not hidden.
    ErrorPathNotFound = 4,
    /// Effector-level failure not otherwise classified.
    ErrorOther = 5,
}

impl ResultCode {
    /// Map a wire byte back to a result code.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ResultCode::Ok),
            1 => Some(ResultCode::ErrorSystem),
            2 => Some(ResultCode::ErrorProtocol),
            3 => Some(ResultCode::ErrorNoPath),
            4 => Some(ResultCode::ErrorPathNotFound),
            5 => Some(ResultCode::ErrorOther),
            _ => None,
        }
    }

    /// Wire byte for this code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this code reports success.
    pub fn is_ok(self) -> bool {
        matches!(self, ResultCode::Ok)
    }
}

/// Outcome of one request: echoes the command, carries the result code and
/// an optional human-readable message. Built exactly once per request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Wire id of the command being answered. Echoes the request verbatim,
    /// including ids the agent does not recognize.
    pub command_id: u8,
    /// Result of the request.
    pub result: ResultCode,
    /// Human-readable failure description, absent on success.
    pub message: Option<String>,
}

impl Response {
    /// Success response for a command.
    pub fn ok(command: Command) -> Self {
        Self { command_id: command.id(), result: ResultCode::Ok, message: None }
    }

    /// Failure response for a recognized command.
    pub fn failed(command: Command, err: &AgentError) -> Self {
        Self::failed_raw(command.id(), err)
    }

    /// Failure response echoing a raw command id. Used when the id itself is
    /// not recognized.
    pub fn failed_raw(command_id: u8, err: &AgentError) -> Self {
        Self { command_id, result: err.code(), message: Some(err.to_string()) }
    }
}

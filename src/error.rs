//! Error taxonomy for the dispatch core.
//!
//! Every failure a request can hit maps to exactly one wire result code;
//! nothing is silently dropped. The only fault that does not become a
//! result code is a failure to deliver the reply itself, which the
//! transport layer reports to its own caller (see [`crate::transport`]).

use crate::attr::AttrError;
use crate::command::ResultCode;
use crate::effector::EffectorError;

/// Unified failure type for request handling.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// Environment-level fault: allocation, OS resource, or an interrupted
    /// lock acquisition. Not the caller's fault.
    #[error("system fault: {0}")]
    System(String),
    /// Malformed or out-of-sequence request, including any request after a
    /// successful uninstall.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The required path attribute is missing or empty.
    #[error("request carries no usable path")]
    NoPath,
    /// Unhide referenced a path that is not currently hidden.
    #[error("path not hidden: {0}")]
    PathNotFound(String),
    /// The effector refused or failed to apply an effect.
    #[error(transparent)]
    Effector(#[from] EffectorError),
}

impl AgentError {
    /// The wire result code this error reports.
    pub fn code(&self) -> ResultCode {
        match self {
            AgentError::System(_) => ResultCode::ErrorSystem,
            AgentError::Protocol(_) => ResultCode::ErrorProtocol,
            AgentError::NoPath => ResultCode::ErrorNoPath,
            AgentError::PathNotFound(_) => ResultCode::ErrorPathNotFound,
            AgentError::Effector(EffectorError::Resource(_)) => ResultCode::ErrorSystem,
            AgentError::Effector(EffectorError::Failed(_)) => ResultCode::ErrorOther,
        }
    }

    /// Check if this is a protocol-level rejection.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Check if this classifies as an environment fault.
    pub fn is_system(&self) -> bool {
        self.code() == ResultCode::ErrorSystem
    }
}

impl From<AttrError> for AgentError {
    fn from(err: AttrError) -> Self {
        match err {
            AttrError::MissingPath | AttrError::EmptyPath => AgentError::NoPath,
            other => AgentError::Protocol(other.to_string()),
        }
    }
}

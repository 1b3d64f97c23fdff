//! Effector seam: the external mechanism that actually hides and unhides
//! paths. The dispatch core treats it as a black box behind a trait so the
//! real mechanism, a logging stand-in, and test doubles are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

/// Effector failures, split by who is at fault.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectorError {
    /// OS or allocation fault; reported to the caller as a system error.
    #[error("effector resource fault: {0}")]
    Resource(String),
    /// The mechanism refused or failed to apply the effect.
    #[error("effect failed: {0}")]
    Failed(String),
}

/// Applies visibility effects on behalf of the command handlers.
///
/// Implementations must be safe to call from concurrent dispatch contexts;
/// the dispatcher only ever invokes one effect at a time, under its lock.
#[async_trait]
pub trait Effector: Send + Sync {
    /// Suppress visibility of `path`.
    async fn apply_hide(&self, path: &str) -> Result<(), EffectorError>;
    /// Restore visibility of `path`.
    async fn apply_unhide(&self, path: &str) -> Result<(), EffectorError>;
    /// Reverse every active hide in one shot. `paths` is the full snapshot
    /// of the hidden set at the time of the call.
    async fn apply_uninstall_all(&self, paths: &[String]) -> Result<(), EffectorError>;
}

/// Effector that logs each effect and always succeeds. The default.
pub struct TracingEffector;

#[async_trait]
impl Effector for TracingEffector {
    async fn apply_hide(&self, path: &str) -> Result<(), EffectorError> {
        info!(target: "pathveil::effector", %path, "hide path");
        Ok(())
    }

    async fn apply_unhide(&self, path: &str) -> Result<(), EffectorError> {
        info!(target: "pathveil::effector", %path, "unhide path");
        Ok(())
    }

    async fn apply_uninstall_all(&self, paths: &[String]) -> Result<(), EffectorError> {
        info!(target: "pathveil::effector", count = paths.len(), "reverse all hides");
        Ok(())
    }
}

/// One recorded effector invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectorCall {
    /// `apply_hide` with the given path.
    Hide(String),
    /// `apply_unhide` with the given path.
    Unhide(String),
    /// `apply_uninstall_all` with the snapshot it received.
    UninstallAll(Vec<String>),
}

/// Effector that records every call and can be scripted to fail
/// (tests/diagnostics).
#[derive(Default)]
pub struct RecordingEffector {
    calls: Arc<Mutex<Vec<EffectorCall>>>,
    next_failure: Arc<Mutex<Option<EffectorError>>>,
}

impl RecordingEffector {
    /// Create a recording effector that succeeds until scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next effect with `err`, then go back to succeeding.
    pub async fn fail_next(&self, err: EffectorError) {
        *self.next_failure.lock().await = Some(err);
    }

    /// Calls recorded so far, in invocation order.
    pub async fn calls(&self) -> Vec<EffectorCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: EffectorCall) -> Result<(), EffectorError> {
        if let Some(err) = self.next_failure.lock().await.take() {
            return Err(err);
        }
        self.calls.lock().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl Effector for RecordingEffector {
    async fn apply_hide(&self, path: &str) -> Result<(), EffectorError> {
        self.record(EffectorCall::Hide(path.to_owned())).await
    }

    async fn apply_unhide(&self, path: &str) -> Result<(), EffectorError> {
        self.record(EffectorCall::Unhide(path.to_owned())).await
    }

    async fn apply_uninstall_all(&self, paths: &[String]) -> Result<(), EffectorError> {
        self.record(EffectorCall::UninstallAll(paths.to_vec())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_effector_captures_calls_in_order() {
        let effector = RecordingEffector::new();
        effector.apply_hide("/a").await.unwrap();
        effector.apply_unhide("/a").await.unwrap();
        effector.apply_uninstall_all(&[]).await.unwrap();
        assert_eq!(
            effector.calls().await,
            vec![
                EffectorCall::Hide("/a".into()),
                EffectorCall::Unhide("/a".into()),
                EffectorCall::UninstallAll(vec![]),
            ]
        );
    }

    #[tokio::test]
    async fn scripted_failure_fires_once() {
        let effector = RecordingEffector::new();
        effector.fail_next(EffectorError::Failed("nope".into())).await;
        assert!(effector.apply_hide("/a").await.is_err());
        assert!(effector.apply_hide("/a").await.is_ok());
        // The failed call is not recorded.
        assert_eq!(effector.calls().await, vec![EffectorCall::Hide("/a".into())]);
    }
}

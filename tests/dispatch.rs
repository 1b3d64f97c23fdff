#![allow(missing_docs)]

use std::sync::Arc;

use pathveil::{
    Correlation, Dispatcher, Effector, EffectorCall, EffectorError, RecordingEffector,
    ResultCode, TransportRequest,
};
use tokio::sync::{watch, Notify};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn corr(seq: u32) -> Correlation {
    Correlation::new(7, seq)
}

fn setup() -> (Arc<RecordingEffector>, Dispatcher) {
    init_tracing();
    let effector = Arc::new(RecordingEffector::new());
    let dispatcher = Dispatcher::builder().effector(effector.clone()).build();
    (effector, dispatcher)
}

#[tokio::test]
async fn hide_applies_effect_then_records() {
    let (effector, dispatcher) = setup();
    let outcome = dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(0))).await;
    assert_eq!(outcome.response.result, ResultCode::Ok);
    assert_eq!(dispatcher.hidden_paths().await, vec!["/etc/secret"]);
    assert_eq!(effector.calls().await, vec![EffectorCall::Hide("/etc/secret".into())]);
}

#[tokio::test]
async fn rehide_is_idempotent_but_still_applies_the_effect() {
    let (effector, dispatcher) = setup();
    for seq in 0..2 {
        let outcome = dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(seq))).await;
        assert_eq!(outcome.response.result, ResultCode::Ok);
    }
    assert_eq!(dispatcher.hidden_paths().await.len(), 1);
    assert_eq!(effector.calls().await.len(), 2);
}

#[tokio::test]
async fn unhide_removes_a_hidden_path() {
    let (effector, dispatcher) = setup();
    dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(0))).await;
    let outcome = dispatcher.dispatch(TransportRequest::unhide("/etc/secret", corr(1))).await;
    assert_eq!(outcome.response.result, ResultCode::Ok);
    assert!(dispatcher.hidden_paths().await.is_empty());
    assert_eq!(
        effector.calls().await,
        vec![
            EffectorCall::Hide("/etc/secret".into()),
            EffectorCall::Unhide("/etc/secret".into()),
        ]
    );
}

#[tokio::test]
async fn unhide_of_unknown_path_never_reaches_the_effector() {
    let (effector, dispatcher) = setup();
    dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(0))).await;
    let outcome = dispatcher.dispatch(TransportRequest::unhide("/etc/other", corr(1))).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorPathNotFound);
    assert_eq!(dispatcher.hidden_paths().await, vec!["/etc/secret"]);
    assert_eq!(effector.calls().await, vec![EffectorCall::Hide("/etc/secret".into())]);
}

#[tokio::test]
async fn missing_path_is_rejected_before_any_effect() {
    let (effector, dispatcher) = setup();
    let bare = TransportRequest { command_id: 0, attrs: Vec::new(), correlation: corr(0) };
    let outcome = dispatcher.dispatch(bare).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorNoPath);
    assert!(effector.calls().await.is_empty());
    assert!(dispatcher.hidden_paths().await.is_empty());
}

#[tokio::test]
async fn empty_path_is_rejected() {
    let (effector, dispatcher) = setup();
    let outcome = dispatcher.dispatch(TransportRequest::hide("", corr(0))).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorNoPath);
    assert!(effector.calls().await.is_empty());
}

#[tokio::test]
async fn corrupt_attribute_stream_is_a_protocol_error() {
    let (effector, dispatcher) = setup();

    // Attribute header claiming a payload that runs past the buffer.
    let mut attrs = Vec::new();
    attrs.extend_from_slice(&64u16.to_ne_bytes());
    attrs.extend_from_slice(&1u16.to_ne_bytes());
    attrs.extend_from_slice(b"/etc");
    let corrupt = TransportRequest { command_id: 0, attrs, correlation: corr(0) };

    let outcome = dispatcher.dispatch(corrupt).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorProtocol);
    assert!(effector.calls().await.is_empty());
    assert!(dispatcher.hidden_paths().await.is_empty());

    // The decode failure released the lock; the dispatcher keeps serving.
    let outcome = dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(1))).await;
    assert_eq!(outcome.response.result, ResultCode::Ok);
}

#[tokio::test]
async fn uninstall_reverses_everything_and_terminates() {
    let (effector, dispatcher) = setup();
    dispatcher.dispatch(TransportRequest::hide("/b", corr(0))).await;
    dispatcher.dispatch(TransportRequest::hide("/a", corr(1))).await;

    let outcome = dispatcher.dispatch(TransportRequest::uninstall(corr(2))).await;
    assert_eq!(outcome.response.result, ResultCode::Ok);
    assert!(outcome.terminated);
    assert!(dispatcher.is_terminated());
    assert!(dispatcher.hidden_paths().await.is_empty());

    let calls = effector.calls().await;
    assert_eq!(calls.last(), Some(&EffectorCall::UninstallAll(vec!["/a".into(), "/b".into()])));

    // Any further request, of any kind, is a protocol error and leaves no
    // trace in the effector.
    for request in [
        TransportRequest::hide("/x", corr(3)),
        TransportRequest::unhide("/x", corr(4)),
        TransportRequest::uninstall(corr(5)),
    ] {
        let outcome = dispatcher.dispatch(request).await;
        assert_eq!(outcome.response.result, ResultCode::ErrorProtocol);
    }
    assert_eq!(effector.calls().await.len(), calls.len());
}

#[tokio::test]
async fn failed_uninstall_leaves_the_agent_active() {
    let (effector, dispatcher) = setup();
    dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(0))).await;

    effector.fail_next(EffectorError::Failed("reversal refused".into())).await;
    let outcome = dispatcher.dispatch(TransportRequest::uninstall(corr(1))).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorOther);
    assert!(!outcome.terminated);
    assert!(!dispatcher.is_terminated());
    assert_eq!(dispatcher.hidden_paths().await, vec!["/etc/secret"]);

    // The agent recovers: a second uninstall goes through.
    let outcome = dispatcher.dispatch(TransportRequest::uninstall(corr(2))).await;
    assert_eq!(outcome.response.result, ResultCode::Ok);
    assert!(dispatcher.is_terminated());
}

#[tokio::test]
async fn effector_resource_fault_reports_a_system_error() {
    let (effector, dispatcher) = setup();
    effector.fail_next(EffectorError::Resource("enomem".into())).await;
    let outcome = dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(0))).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorSystem);
    assert!(dispatcher.hidden_paths().await.is_empty());
}

#[tokio::test]
async fn effector_refusal_reports_other_and_leaves_store_untouched() {
    let (effector, dispatcher) = setup();
    effector.fail_next(EffectorError::Failed("busy".into())).await;
    let outcome = dispatcher.dispatch(TransportRequest::hide("/etc/secret", corr(0))).await;
    assert_eq!(outcome.response.result, ResultCode::ErrorOther);
    assert!(dispatcher.hidden_paths().await.is_empty());
}

#[tokio::test]
async fn reply_correlation_echoes_port_and_advances_sequence() {
    let (_, dispatcher) = setup();
    let outcome = dispatcher.dispatch(TransportRequest::hide("/a", Correlation::new(99, 41))).await;
    assert_eq!(outcome.reply.correlation, Correlation::new(99, 42));
    assert_eq!(outcome.reply.command_id, 0);
}

/// Effector that parks inside `apply_hide` until released, so a test can
/// hold the dispatcher's lock at a known point.
struct GateEffector {
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl Effector for GateEffector {
    async fn apply_hide(&self, _path: &str) -> Result<(), EffectorError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }

    async fn apply_unhide(&self, _path: &str) -> Result<(), EffectorError> {
        Ok(())
    }

    async fn apply_uninstall_all(&self, _paths: &[String]) -> Result<(), EffectorError> {
        Ok(())
    }
}

#[tokio::test]
async fn shutdown_interrupts_a_pending_lock_acquisition() {
    init_tracing();
    let gate = Arc::new(GateEffector { entered: Notify::new(), release: Notify::new() });
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher =
        Arc::new(Dispatcher::builder().effector(gate.clone()).shutdown(shutdown_rx).build());

    // First request takes the lock and parks inside the effector.
    let holder = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(
            async move { dispatcher.dispatch(TransportRequest::hide("/a", corr(0))).await },
        )
    };
    gate.entered.notified().await;

    // Second request is now stuck waiting for the lock; shutting down must
    // abort it with a system error before any handler runs.
    let blocked = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(
            async move { dispatcher.dispatch(TransportRequest::hide("/b", corr(1))).await },
        )
    };
    tokio::task::yield_now().await;
    shutdown_tx.send(true).unwrap();

    let outcome = blocked.await.unwrap();
    assert_eq!(outcome.response.result, ResultCode::ErrorSystem);

    // The in-flight handler runs to completion; no cancellation under the lock.
    gate.release.notify_one();
    let outcome = holder.await.unwrap();
    assert_eq!(outcome.response.result, ResultCode::Ok);
    assert_eq!(dispatcher.hidden_paths().await, vec!["/a"]);
}

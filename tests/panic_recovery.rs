//! Panic handling with the binary's panic hook installed
//!
//! The hook is process-global, so these tests live in their own test binary.
//! A client that panics must leave the run alive and its entry recorded as
//! an error, exactly as it would without the hook.

use async_trait::async_trait;
use model_connectivity_tester::{
    app::install_panic_hook, CancelToken, NoopSink, ProbeClient, ProbeOutcome, ProbeRequest, ProviderEngine,
    ProviderTarget, Result, Scheduler, StartOutcome, TestSession, TestStatus,
};
use std::sync::{Arc, Once};

static HOOK: Once = Once::new();

fn with_binary_hook() {
    HOOK.call_once(install_panic_hook);
}

/// Client that panics for `exploding` and answers every other model
struct ExplodingClient;

#[async_trait]
impl ProbeClient for ExplodingClient {
    async fn check(&self, request: &ProbeRequest, _cancel: &CancelToken) -> Result<ProbeOutcome> {
        if request.model == "exploding" {
            panic!("upstream exploded");
        }
        Ok(ProbeOutcome::success(7))
    }
}

fn session() -> Arc<TestSession> {
    let provider = ProviderTarget::new(ProviderEngine::OpenAi, "https://api.example.com", "sk-test");
    let models: Vec<(String, String)> = ["exploding", "steady"]
        .iter()
        .map(|m| (m.to_string(), m.to_string()))
        .collect();
    Arc::new(TestSession::new(provider, models))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panic_hook_leaves_bulk_run_alive() {
    with_binary_hook();
    let scheduler = Scheduler::new(Arc::new(ExplodingClient), Arc::new(NoopSink));
    let session = session();

    let outcome = scheduler.start_all(&session, 2).unwrap();
    assert!(matches!(outcome, StartOutcome::Started { workers: 2, .. }));
    scheduler.wait_idle(&session).await;

    let exploded = session.store().get("exploding").unwrap();
    assert_eq!(exploded.status, TestStatus::Error);
    let message = exploded.error_message.unwrap();
    assert!(message.contains("upstream exploded"), "{}", message);

    let steady = session.store().get("steady").unwrap();
    assert_eq!(steady.status, TestStatus::Success);
    assert_eq!(steady.latency_ms, Some(7));

    let counts = session.store().counts();
    assert_eq!(counts.testing, 0);
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_panic_hook_single_test_records_error() {
    with_binary_hook();
    let scheduler = Scheduler::new(Arc::new(ExplodingClient), Arc::new(NoopSink));
    let session = session();

    let entry = scheduler.test_one(&session, "exploding").await.unwrap();
    assert_eq!(entry.status, TestStatus::Error);
    assert!(entry.latency_ms.is_none());

    // The scheduler stays usable after the panic.
    let entry = scheduler.test_one(&session, "steady").await.unwrap();
    assert_eq!(entry.status, TestStatus::Success);
}

//! Common test utilities for workflow tests.

use workflow_tests::WorkflowHarness;

/// Spawn a fresh harness: one engine against its own simulated backend.
pub async fn setup() -> WorkflowHarness {
    WorkflowHarness::spawn().await
}

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use turnstile_core::{FailureKind, ToolCallRequest, ToolCallResult, ToolRegistry};

/// Default per-call deadline.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs tool calls to completion, deadline, or cancellation.
///
/// Owns no orchestration state: every call resolves to a [`ToolCallResult`],
/// never to an error or a hang. Each call runs on its own Tokio task, which is
/// aborted when the deadline passes, when the run is cancelled, or when the
/// `execute` future itself is dropped, so a late result can never be observed
/// after its timeout was reported.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one call, bounded by `timeout` and `cancel`.
    #[instrument(skip(self, call, cancel), fields(tool = %call.name, call_id = %call.call_id))]
    pub async fn execute(
        &self,
        call: &ToolCallRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ToolCallResult {
        if cancel.is_cancelled() {
            return cancelled(&call.name);
        }

        let tool = match self.registry.resolve(&call.name) {
            Ok(tool) => tool,
            Err(e) => {
                warn!(error = %e, "Tool lookup failed");
                return ToolCallResult::failure(FailureKind::NotFound, e.to_string());
            }
        };

        let args = call.args.clone();
        debug!("Spawning tool task");
        // Dropping the set aborts the task, so nothing outlives this call.
        let mut task = JoinSet::new();
        task.spawn(async move { tool.execute(args).await });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Tool call cancelled");
                cancelled(&call.name)
            }
            outcome = tokio::time::timeout(timeout, task.join_next()) => match outcome {
                Ok(Some(Ok(Ok(output)))) => {
                    info!("Tool call succeeded");
                    ToolCallResult::success(output)
                }
                Ok(Some(Ok(Err(e)))) => {
                    warn!(error = %e, "Tool call failed");
                    ToolCallResult::failure(FailureKind::Execution, e.to_string())
                }
                Ok(Some(Err(join_err))) => {
                    warn!(error = %join_err, "Tool task did not complete");
                    ToolCallResult::failure(
                        FailureKind::Execution,
                        format!("tool '{}' crashed: {}", call.name, join_err),
                    )
                }
                Ok(None) => ToolCallResult::failure(
                    FailureKind::Execution,
                    format!("tool '{}' produced no result", call.name),
                ),
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs_f64(), "Tool call timed out");
                    ToolCallResult::failure(
                        FailureKind::Timeout,
                        format!(
                            "tool '{}' timed out after {}s",
                            call.name,
                            timeout.as_secs_f64()
                        ),
                    )
                }
            }
        }
    }

    /// Execute every call of one turn concurrently.
    ///
    /// Returns only once each call has a result; results are in request order.
    pub async fn execute_all(
        &self,
        calls: &[ToolCallRequest],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<ToolCallResult> {
        info!(count = calls.len(), "Executing tool calls");
        join_all(calls.iter().map(|call| self.execute(call, timeout, cancel))).await
    }
}

fn cancelled(name: &str) -> ToolCallResult {
    ToolCallResult::failure(
        FailureKind::Cancelled,
        format!("tool '{}' was cancelled", name),
    )
}

//! Analysis process lifecycle: startup, steady state and the termination
//! handshake.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use skymon_core::{config::PROCESS_ANALYSIS, MonitorConfig};
use skymon_ipc::{destroy_all, ChannelError, TerminationCoordinator};

use crate::engine::AnalysisEngine;

/// Runs the analysis process until shutdown completes.
///
/// `cancel` is the local trigger: cancelling it (typically from a signal
/// handler) makes this process the termination initiator. A request observed
/// on the termination channel shuts the process down as a peer instead.
pub async fn run(config: MonitorConfig, cancel: CancellationToken) -> Result<(), ChannelError> {
    let mut coordinator = TerminationCoordinator::open(&config, PROCESS_ANALYSIS)?;
    let engine = Arc::new(AnalysisEngine::open(config.clone())?);

    let handles = engine.spawn_tasks(&cancel);
    info!(tasks = handles.len(), "analysis engine running");

    let trigger = coordinator.await_trigger(&cancel).await;

    // Stop the periodic tasks before announcing; shutdown latency is bounded
    // by the slowest task period.
    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "engine task did not shut down cleanly");
        }
    }

    // All peers must be done before local mappings are released; the teardown
    // owner additionally removes every named region system-wide.
    let teardown_owner = coordinator.complete(trigger).await?;
    drop(engine);
    if teardown_owner {
        destroy_all(&config.namespace, config.max_aircraft)?;
        info!(namespace = %config.namespace, "shared regions removed");
    }

    info!("analysis process terminated");
    Ok(())
}

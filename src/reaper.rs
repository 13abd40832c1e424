//! Resource Reaper: the teardown pipeline and the prune-retry helper it
//! shares across the volume and network phases. Cross-test isolation rests
//! entirely on label filtering here: every list/prune call is scoped by
//! `PrimaryLabelKey=<test>`.

use crate::error::{ReapError, RemovalError};
use crate::label::{BollardFilterExt, Filter};
use crate::policy::TeardownPolicy;
use crate::{coverage, logs};
use bollard::Docker;
use bollard::container::{
    ListContainersOptions, RemoveContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::network::{ListNetworksOptions, PruneNetworksOptions};
use bollard::service::ContainerSummary;
use bollard::volume::PruneVolumesOptions;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);
const WAIT_GRACE: Duration = Duration::from_millis(500);
const PRUNE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Runs the full teardown pipeline for `test`: log capture, coverage export,
/// stop, remove, then label-scoped volume and network pruning, in that
/// load-bearing order. Never returns an error for per-container failures;
/// only a non-conflict prune failure surfaces.
pub async fn teardown(
    docker: &Docker,
    test: &str,
    test_failed: bool,
    policy: &TeardownPolicy,
    coverage_enabled: bool,
) -> Result<(), ReapError> {
    let containers = list_labeled_containers(docker, test).await?;

    // Capture logs if the test failed, or if always-on.
    let should_capture = test_failed || policy.show_container_logs_always;
    if should_capture {
        for container in &containers {
            logs::capture(docker, container, policy.container_log_tail).await;
        }
    }

    if coverage_enabled {
        coverage::export_all(docker, &containers, &policy.coverage_dir_for(test)).await;
    }

    if policy.keep_containers {
        info!("Keeping containers.");
        return Ok(());
    }

    // Phase D + E: stop then force-remove each container.
    for container in &containers {
        let name = container_display_name(container);
        if let Err(e) = stop_container(docker, container).await {
            warn!("failed to stop {}: {}", name, e);
        }
        if let Err(e) = remove_container(docker, container).await {
            warn!("failed to remove {}: {}", name, e);
        }
    }

    let cancel = CancellationToken::new();

    // Phase F.
    if policy.keep_volumes_on_failure && test_failed {
        debug!("Skipping volume prune: test failed and volumes are being kept");
    } else {
        prune_volumes(docker, test, &cancel).await?;
    }

    // Phase G.
    prune_networks(docker, test, &cancel).await?;

    Ok(())
}

async fn list_labeled_containers(
    docker: &Docker,
    test: &str,
) -> Result<Vec<ContainerSummary>, ReapError> {
    let filters = vec![Filter::primary_label(test)];
    let containers = docker
        .list_containers(Some(ListContainersOptions {
            all: true,
            filters: filters.to_bollard_filters(),
            ..Default::default()
        }))
        .await?;
    Ok(containers)
}

async fn stop_container(docker: &Docker, container: &ContainerSummary) -> Result<(), RemovalError> {
    let Some(id) = container.id.as_deref() else {
        return Ok(());
    };
    let name = container_display_name(container);

    match docker
        .stop_container(id, Some(StopContainerOptions { t: STOP_TIMEOUT.as_secs() as i64 }))
        .await
    {
        Ok(()) => {}
        Err(e) if is_benign_stop_error(&e) => {
            debug!("{} already stopped: {}", name, e);
        }
        Err(e) => return Err(RemovalError::Docker(e)),
    }

    let wait_deadline = STOP_TIMEOUT + WAIT_GRACE;
    let mut wait_stream = docker.wait_container(
        id,
        Some(WaitContainerOptions {
            condition: "not-running",
        }),
    );
    match tokio::time::timeout(wait_deadline, wait_stream.next()).await {
        Err(_) => warn!("timed out waiting for {} to stop", name),
        Ok(None) => debug!("{} wait stream ended", name),
        Ok(Some(Err(e))) => warn!("error waiting for {} to stop: {}", name, e),
        Ok(Some(Ok(response))) => {
            debug!("{} stopped with status {}", name, response.status_code);
        }
    }
    Ok(())
}

async fn remove_container(docker: &Docker, container: &ContainerSummary) -> Result<(), RemovalError> {
    let Some(id) = container.id.as_deref() else {
        return Ok(());
    };
    let name = container_display_name(container);
    match docker
        .remove_container(
            id,
            Some(RemoveContainerOptions {
                force: true,
                v: false,
                ..Default::default()
            }),
        )
        .await
    {
        Ok(()) => {
            debug!("removed {}", name);
            Ok(())
        }
        Err(e) if is_benign_stop_error(&e) => {
            debug!("{} already removed: {}", name, e);
            Ok(())
        }
        Err(e) => Err(RemovalError::Docker(e)),
    }
}

fn container_display_name(container: &ContainerSummary) -> String {
    container
        .names
        .as_ref()
        .and_then(|names| names.first())
        .cloned()
        .or_else(|| container.id.clone())
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn is_benign_stop_error(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError { status_code: 304, .. }
            | DockerError::DockerResponseServerError { status_code: 404, .. }
    )
}

fn is_conflict(err: &DockerError) -> bool {
    matches!(err, DockerError::DockerResponseServerError { status_code: 409, .. })
}

/// Retries `op` only on 409 conflict responses (a concurrent prune already
/// in progress on the engine), with a fixed delay between attempts, bounded
/// by `cancel`. Any other error is unrecoverable immediately.
async fn retry_on_conflict<F, Fut, T>(
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, ReapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DockerError>>,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_conflict(&e) => {
                debug!("prune conflict, retrying: {}", e);
                tokio::select! {
                    _ = tokio::time::sleep(PRUNE_RETRY_DELAY) => {}
                    _ = cancel.cancelled() => return Err(ReapError::PruneConflictExhausted),
                }
            }
            Err(e) => return Err(ReapError::Docker(e)),
        }
    }
}

async fn prune_volumes(docker: &Docker, test: &str, cancel: &CancellationToken) -> Result<(), ReapError> {
    let filters = vec![Filter::primary_label(test)];
    let bollard_filters = filters.to_bollard_filters();
    let response = retry_on_conflict(cancel, || {
        docker.prune_volumes(Some(PruneVolumesOptions {
            filters: bollard_filters.clone(),
        }))
    })
    .await?;

    let deleted = response.volumes_deleted.unwrap_or_default();
    let reclaimed_mb = response.space_reclaimed.unwrap_or(0) as f64 / (1024.0 * 1024.0);
    if !deleted.is_empty() {
        info!("Pruned {} volumes, reclaiming {:.2} MB", deleted.len(), reclaimed_mb);
    }
    Ok(())
}

async fn prune_networks(docker: &Docker, test: &str, cancel: &CancellationToken) -> Result<(), ReapError> {
    let filters = vec![Filter::primary_label(test)];
    let bollard_filters = filters.to_bollard_filters();
    let response = retry_on_conflict(cancel, || {
        docker.prune_networks(Some(PruneNetworksOptions {
            filters: bollard_filters.clone(),
        }))
    })
    .await?;

    let deleted = response.networks_deleted.unwrap_or_default();
    if !deleted.is_empty() {
        info!("Pruned networks: {:?}", deleted);
    }
    Ok(())
}

/// Lists all containers matching `PrimaryLabelKey=<test>`, exposed for the
/// eager reap at setup time and for tests asserting on post-teardown
/// resource counts.
pub async fn list_for_test(docker: &Docker, test: &str) -> Result<Vec<ContainerSummary>, ReapError> {
    list_labeled_containers(docker, test).await
}

/// Lists networks matching `PrimaryLabelKey=<test>`.
pub async fn list_networks_for_test(
    docker: &Docker,
    test: &str,
) -> Result<Vec<bollard::models::Network>, ReapError> {
    let filters = vec![Filter::primary_label(test)];
    Ok(docker
        .list_networks(Some(ListNetworksOptions {
            filters: filters.to_bollard_filters(),
        }))
        .await?)
}

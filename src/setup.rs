//! Setup Orchestrator: a test's per-test entry point. Opens the Docker
//! client, eagerly reaps leftovers from a prior interrupted run of the same
//! test identity, creates a fresh per-test network, and registers a scoped
//! teardown that a caller runs via [`TestScope::run_cleanup`].

use crate::error::SetupError;
use crate::label::{primary_labels, random_network_name};
use crate::policy::TeardownPolicy;
use crate::scope::TestScope;
use crate::{docker_client, reaper};
use bollard::Docker;
use bollard::network::CreateNetworkOptions;
use std::sync::Arc;
use tracing::info;

/// Result of [`setup`]: the opened client and the id of the freshly created
/// per-test network.
pub struct Setup {
    pub docker: Docker,
    pub network_id: String,
}

/// Runs the Setup Orchestrator for `scope`, and registers teardown to run
/// with `policy` when [`TestScope::run_cleanup`] is invoked. Failure here is
/// fatal: the test cannot continue without Docker.
pub async fn setup(scope: Arc<TestScope>, policy: TeardownPolicy) -> Result<Setup, SetupError> {
    let docker = docker_client::open()?;

    // Eager reap: not a dry run. A prior process may have died without
    // running teardown, and the duplicate-name check below would otherwise
    // fail against its leftovers.
    reaper::teardown(&docker, scope.name(), false, &policy, false)
        .await
        .map_err(SetupError::EagerReap)?;

    let network_name = random_network_name();
    let network = docker
        .create_network(CreateNetworkOptions {
            name: network_name.clone(),
            check_duplicate: true,
            labels: primary_labels(scope.name()),
            ..Default::default()
        })
        .await
        .map_err(SetupError::CreateNetwork)?;
    let network_id = network.id.unwrap_or(network_name);
    info!("created per-test network {}", network_id);

    {
        let docker = docker.clone();
        let test_name = scope.name().to_string();
        let scope_for_failed = scope.clone();
        scope.register_cleanup(async move {
            let test_failed = scope_for_failed.failed();
            if let Err(e) = reaper::teardown(&docker, &test_name, test_failed, &policy, true).await
            {
                tracing::error!("teardown failed for {}: {}", test_name, e);
            }
        });
    }

    Ok(Setup { docker, network_id })
}

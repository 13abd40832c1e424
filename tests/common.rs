//! Common utility functions for integration tests.
//!
//! These require a reachable Docker daemon and are skipped (not merely
//! ignored) when one isn't available. Resources are scoped by each test's
//! own test-identity label rather than a single fixed label value, so
//! tests can run concurrently without colliding.
#![allow(dead_code)]

use bollard::container::{Config, NetworkingConfig};
use bollard::image::CreateImageOptions;
use bollard::network::CreateNetworkOptions;
use bollard::secret::{ContainerCreateResponse, EndpointSettings};
use bollard::volume::CreateVolumeOptions;
use bollard::Docker;
use ibctest_docker_harness::PRIMARY_LABEL_KEY;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio_stream::StreamExt;

/// Obtain a client for the local Docker daemon.
pub(crate) fn docker_client() -> &'static Docker {
    static CLIENT: OnceLock<Docker> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Docker::connect_with_local_defaults().expect("failed to connect to Docker daemon")
    })
}

/// Returns `true` if a Docker daemon is actually reachable, so Docker-backed
/// tests can skip themselves cleanly in environments without one. Checked
/// independently of [`docker_client`], which panics on connection failure.
pub(crate) async fn docker_available() -> bool {
    match Docker::connect_with_local_defaults() {
        Ok(client) => client.ping().await.is_ok(),
        Err(_) => false,
    }
}

pub(crate) struct RunContainerResult {
    pub(crate) container_id: String,
    pub(crate) network_id: Option<String>,
}

/// Runs a container labeled `PrimaryLabelKey=<test>`.
pub(crate) async fn run_container(
    test: &str,
    with_network: bool,
    extra_labels: Option<HashMap<String, String>>,
) -> RunContainerResult {
    static TEST_IMAGE: &str = "busybox:latest";

    let client = docker_client();
    let mut labels = HashMap::from([(PRIMARY_LABEL_KEY.to_string(), test.to_string())]);
    if let Some(ref extra_labels) = extra_labels {
        labels.extend(extra_labels.clone());
    }
    let mut network_id = None;

    if client.inspect_image(TEST_IMAGE).await.is_err() {
        let mut pull_results_stream = client.create_image(
            Some(CreateImageOptions {
                from_image: TEST_IMAGE,
                ..Default::default()
            }),
            None,
            None,
        );
        while let Some(result) = pull_results_stream.next().await {
            result.expect("failed to pull test image");
        }
    }

    let ContainerCreateResponse {
        id: container_id, ..
    } = client
        .create_container::<String, String>(
            None,
            Config {
                tty: Some(true),
                cmd: None,
                image: Some(TEST_IMAGE.to_string()),
                labels: Some(labels),
                networking_config: {
                    if with_network {
                        let name = create_network(test, extra_labels.clone()).await;
                        network_id = Some(name.clone());
                        Some(NetworkingConfig {
                            endpoints_config: HashMap::from([(
                                name.clone(),
                                EndpointSettings { network_id: Some(name), ..Default::default() },
                            )]),
                        })
                    } else {
                        None
                    }
                },
                ..Default::default()
            },
        )
        .await
        .expect("failed to create container");
    client
        .start_container::<&str>(&container_id, None)
        .await
        .unwrap_or_else(|e| panic!("failed to start container {container_id}: {e}"));
    RunContainerResult { container_id, network_id }
}

/// Creates a network labeled `PrimaryLabelKey=<test>`. Returns its name.
pub(crate) async fn create_network(test: &str, extra_labels: Option<HashMap<String, String>>) -> String {
    let client = docker_client();
    let mut labels = HashMap::from([(PRIMARY_LABEL_KEY.to_string(), test.to_string())]);
    if let Some(extra_labels) = extra_labels {
        labels.extend(extra_labels);
    }
    let name = format!("{test}-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    client
        .create_network(CreateNetworkOptions { name: name.clone(), labels, ..Default::default() })
        .await
        .expect("failed to create network");
    name
}

/// Creates a volume labeled `PrimaryLabelKey=<test>`. Returns its name.
pub(crate) async fn create_volume(test: &str, extra_labels: Option<HashMap<String, String>>) -> String {
    let client = docker_client();
    let mut labels = HashMap::from([(PRIMARY_LABEL_KEY.to_string(), test.to_string())]);
    if let Some(extra_labels) = extra_labels {
        labels.extend(extra_labels);
    }
    let name = format!("{test}-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    client
        .create_volume(CreateVolumeOptions { name: name.clone(), labels, ..Default::default() })
        .await
        .expect("failed to create volume");
    name
}

pub(crate) async fn container_exists(id: &str) -> bool {
    match docker_client().inspect_container(id, None).await {
        Ok(_) => true,
        Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => false,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

pub(crate) async fn network_exists(name: &str) -> bool {
    match docker_client().inspect_network::<&str>(name, None).await {
        Ok(_) => true,
        Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => false,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

pub(crate) async fn volume_exists(name: &str) -> bool {
    match docker_client().inspect_volume(name).await {
        Ok(_) => true,
        Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => false,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

/// Runs the harness's own teardown pipeline scoped to `test`, used both as
/// the thing under test and as end-of-test cleanup for leftovers.
pub(crate) async fn cleanup(test: &str) {
    let policy = ibctest_docker_harness::TeardownPolicy {
        keep_volumes_on_failure: false,
        keep_containers: false,
        show_container_logs_always: false,
        container_log_tail: 1000,
        coverage_output_dir: None,
    };
    ibctest_docker_harness::teardown(docker_client(), test, false, &policy, false)
        .await
        .expect("failed to clean up test resources");
}

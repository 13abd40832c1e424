//! Log Collector: captures a bounded tail of each labeled container's
//! combined stdout+stderr and emits it through the test's log sink,
//! annotated with the container name. Failures here are logged and
//! ignored; they never block teardown.

use bollard::Docker;
use bollard::container::LogsOptions;
use bollard::service::ContainerSummary;
use futures::StreamExt;
use tracing::{info, warn};

/// Captures up to `tail` lines of combined stdout/stderr from `container`
/// and emits them via `tracing`, annotated with the container's name.
pub async fn capture(docker: &Docker, container: &ContainerSummary, tail: usize) {
    let Some(id) = container.id.as_deref() else {
        return;
    };
    let name = container
        .names
        .as_ref()
        .and_then(|names| names.first())
        .cloned()
        .unwrap_or_else(|| id.to_string());

    let options = LogsOptions::<String> {
        follow: false,
        stdout: true,
        stderr: true,
        tail: tail.to_string(),
        ..Default::default()
    };

    let mut stream = docker.logs(id, Some(options));
    let mut buf = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(output) => buf.push_str(&output.to_string()),
            Err(e) => {
                warn!("failed to read logs for {}: {}", name, e);
                return;
            }
        }
    }

    if buf.is_empty() {
        return;
    }
    info!("--- logs: {} ---\n{}", name, buf);
}

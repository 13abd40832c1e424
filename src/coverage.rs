//! Coverage Exporter: copies in-container coverage artifacts to a host
//! directory before the container is removed. Best-effort by design: a
//! recovered panic here is logged and suppressed; no other component in
//! this crate does that.

use bollard::Docker;
use bollard::container::DownloadFromContainerOptions;
use bollard::service::ContainerSummary;
use futures::future::FutureExt;
use futures::StreamExt;
use std::fs;
use std::io::Read;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::warn;

/// Name of the in-container environment variable naming the coverage
/// artifact directory, as recognized by the Go coverage tooling this
/// harness was built to accompany.
const COVERAGE_DIR_ENV_VAR: &str = "GOCOVERDIR";

/// Exports coverage artifacts for every labeled container into
/// subdirectories of `output_root`, one per container. Each container's
/// export (inspect, download, extract) runs behind a panic-safe boundary:
/// any panic is logged as "Failed to export coverage data" and suppressed,
/// so a bug here never prevents teardown.
pub async fn export_all(docker: &Docker, containers: &[ContainerSummary], output_root: &Path) {
    for container in containers {
        let result = AssertUnwindSafe(export_one(docker, container, output_root))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("coverage export failed for a container: {}", e),
            Err(_) => warn!("Failed to export coverage data"),
        }
    }
}

async fn export_one(
    docker: &Docker,
    container: &ContainerSummary,
    output_root: &Path,
) -> anyhow::Result<()> {
    let Some(id) = container.id.as_deref() else {
        return Ok(());
    };

    let inspected = docker.inspect_container(id, None).await?;
    let Some(coverage_path) = find_coverage_env(&inspected) else {
        return Ok(());
    };

    let name = inspected
        .name
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.chars().take(12).collect());
    let out_dir = output_root.join(&name);

    let mut stream = docker.download_from_container(
        id,
        Some(DownloadFromContainerOptions { path: coverage_path }),
    );
    let mut tar_bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        tar_bytes.extend_from_slice(&chunk?);
    }

    if let Err(e) = extract_files(&tar_bytes, &out_dir) {
        warn!("failed to extract coverage for {}: {}", name, e);
    }
    Ok(())
}

fn find_coverage_env(inspected: &bollard::models::ContainerInspectResponse) -> Option<String> {
    inspected
        .config
        .as_ref()?
        .env
        .as_ref()?
        .iter()
        .find_map(|entry| entry.strip_prefix(&format!("{COVERAGE_DIR_ENV_VAR}=")))
        .map(str::to_string)
}

/// Extracts file entries only (directory entries are skipped) from a tar
/// archive, flattening them into `out_dir/<basename(header.name)>`.
fn extract_files(tar_bytes: &[u8], out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(out_dir, fs::Permissions::from_mode(0o755))?;
    }

    let mut archive = Archive::new(tar_bytes);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let path = entry.path()?.into_owned();
        let Some(basename) = path.file_name() else {
            continue;
        };
        let dest: PathBuf = out_dir.join(basename);
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        fs::write(dest, contents)?;
    }
    Ok(())
}

//! Teardown policy flags, read once from the environment at setup time and
//! threaded through the rest of the program as a single typed struct.

use std::env;
use std::path::PathBuf;

const DEFAULT_LOG_TAIL: usize = 1000;

#[derive(Debug, Clone)]
pub struct TeardownPolicy {
    /// Retain volumes when the test failed.
    pub keep_volumes_on_failure: bool,
    /// Skip the entire stop/remove/prune path.
    pub keep_containers: bool,
    /// Force log capture even on success.
    pub show_container_logs_always: bool,
    /// Tail length for captured container logs.
    pub container_log_tail: usize,
    /// Host root for exported coverage.
    pub coverage_output_dir: Option<PathBuf>,
}

impl TeardownPolicy {
    pub fn from_env() -> Self {
        Self {
            keep_volumes_on_failure: env_is_set("ICTEST_SKIP_FAILURE_CLEANUP"),
            keep_containers: env_is_set("KEEP_CONTAINERS"),
            show_container_logs_always: env::var("SHOW_CONTAINER_LOGS")
                .map(|v| v == "always")
                .unwrap_or(false),
            container_log_tail: env::var("CONTAINER_LOG_TAIL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LOG_TAIL),
            coverage_output_dir: env::var("ICTEST_GOCOVERDIR").ok().map(PathBuf::from),
        }
    }

    /// Host root for exported coverage for `test`, defaulting to
    /// `coverage/<test-name>` when `ICTEST_GOCOVERDIR` is unset.
    pub fn coverage_dir_for(&self, test: &str) -> PathBuf {
        match &self.coverage_output_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from("coverage").join(test),
        }
    }
}

fn env_is_set(key: &str) -> bool {
    env::var(key).map(|v| !v.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        // Constructed directly (not from_env) to avoid cross-test env races.
        let policy = TeardownPolicy {
            keep_volumes_on_failure: false,
            keep_containers: false,
            show_container_logs_always: false,
            container_log_tail: DEFAULT_LOG_TAIL,
            coverage_output_dir: None,
        };
        assert_eq!(policy.container_log_tail, 1000);
        assert_eq!(policy.coverage_dir_for("TestAlpha"), PathBuf::from("coverage/TestAlpha"));
    }

    #[test]
    fn coverage_dir_honors_override() {
        let policy = TeardownPolicy {
            keep_volumes_on_failure: false,
            keep_containers: false,
            show_container_logs_always: false,
            container_log_tail: DEFAULT_LOG_TAIL,
            coverage_output_dir: Some(PathBuf::from("/tmp/cov")),
        };
        assert_eq!(policy.coverage_dir_for("TestAlpha"), PathBuf::from("/tmp/cov"));
    }
}

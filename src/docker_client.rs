//! Thin, version-negotiating handle to the Docker Engine. `bollard`
//! negotiates the API version on connect; this module's only job is picking
//! the right transport from ambient environment.

use crate::error::SetupError;
use bollard::Docker;
use std::env;
use tracing::debug;

/// Opens a handle to the Docker Engine. Failure here is fatal to the test:
/// the caller cannot continue without Docker.
pub fn open() -> Result<Docker, SetupError> {
    if env::var("DOCKER_CERT_PATH").is_ok() {
        debug!("DOCKER_CERT_PATH set, connecting via TLS");
        Docker::connect_with_ssl_defaults().map_err(SetupError::Connect)
    } else if env::var("DOCKER_HOST").is_ok() {
        debug!("DOCKER_HOST set without DOCKER_CERT_PATH, connecting via HTTP");
        Docker::connect_with_http_defaults().map_err(SetupError::Connect)
    } else {
        debug!("no DOCKER_HOST set, connecting to local Docker daemon");
        Docker::connect_with_local_defaults().map_err(SetupError::Connect)
    }
}

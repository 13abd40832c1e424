//! Error taxonomy: a narrow per-resource removal error, a broader per-phase
//! teardown error, a fatal setup error, and a wrapped finalizer error that
//! always propagates to the caller.

use thiserror::Error;

/// Error encountered while stopping or removing a single container, network,
/// or volume. `NotModified` (409, already stopped) and `NotFound` (404,
/// already gone) are benign and handled by the caller rather than
/// constructed as variants here.
#[derive(Error, Debug)]
pub enum RemovalError {
    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),
}

/// Unrecoverable error encountered during a teardown phase.
#[derive(Error, Debug)]
pub enum ReapError {
    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),
    #[error("prune conflict persisted past retry budget")]
    PruneConflictExhausted,
}

/// Fatal-at-setup error: the test cannot proceed without a working Docker
/// daemon and a fresh per-test network, so this is never swallowed.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to open Docker client: {0}")]
    Connect(#[source] bollard::errors::Error),
    #[error("eager reap of stale resources failed: {0}")]
    EagerReap(#[source] ReapError),
    #[error("failed to create per-test network: {0}")]
    CreateNetwork(#[source] bollard::errors::Error),
}

/// Error from the Channel Finalizer. Every variant wraps the step that
/// failed so the caller sees exactly where the handshake broke down.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("failed to stop relayer: {0}")]
    RelayerStop(#[source] anyhow::Error),
    #[error("failed to start relayer: {0}")]
    RelayerStart(#[source] anyhow::Error),
    #[error("failed to query bonded validators: {0}")]
    QueryValidators(#[source] anyhow::Error),
    #[error("failed to delegate to validator: {0}")]
    Delegate(#[source] anyhow::Error),
    #[error("failed to find provider validator after delegation")]
    ValidatorNotFound,
    #[error(
        "validator power did not increase after delegation (before={before}, after={after})"
    )]
    PowerDidNotIncrease { before: u64, after: u64 },
    #[error("failed to list relayer channels: {0}")]
    ListChannels(#[source] anyhow::Error),
    #[error("failed to flush pending packets: {0}")]
    Flush(#[source] anyhow::Error),
}

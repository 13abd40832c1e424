//! Docker test-harness core for ephemeral, leak-free blockchain integration
//! test environments: per-test Docker lifecycle management (label scheme,
//! setup, teardown with log capture and coverage export) plus a
//! provider↔consumer IBC channel finalizer built on top of it.

pub mod channel;
pub mod coverage;
pub mod docker_client;
pub mod error;
pub mod label;
pub mod logs;
pub mod policy;
pub mod reaper;
pub mod scope;
pub mod setup;

#[doc(no_inline)]
pub use bollard::Docker;
pub use channel::{finalize, flush, BondedValidator, ChainHandle, ChannelInfo, Relayer};
pub use error::{ChannelError, ReapError, RemovalError, SetupError};
pub use label::{Filter, PRIMARY_LABEL_KEY};
pub use policy::TeardownPolicy;
pub use reaper::teardown;
pub use scope::TestScope;
pub use setup::{setup, Setup};

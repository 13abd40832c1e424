use anyhow::Context;
use async_trait::async_trait;
use ibctest_docker_harness::{
    finalize, reaper, setup, BondedValidator, ChainHandle, ChannelInfo, Relayer, TeardownPolicy,
    TestScope,
};
use std::sync::Arc;
use tabled::Tabled;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

/// Manually exercises the harness against a live Docker daemon: not part of
/// the production API surface (embedding test frameworks call the library
/// directly), just an operable entry point for humans.
#[derive(Debug, clap::Parser)]
#[command(about = "Exercises the ibctest Docker test-harness core standalone")]
struct Cli {
    /// Identity of the test to simulate; also the label value scoping every
    /// resource this run touches.
    #[arg(long, default_value = "manual-exercise")]
    test_name: String,
    /// How long to hold the per-test network open between setup and
    /// teardown, so resources are observable with `docker ps` meanwhile.
    #[arg(long, value_name = "duration", value_parser = parse_duration, default_value = "0s")]
    settle: Duration,
    /// Also run the Channel Finalizer against built-in no-op stubs, to
    /// exercise the relayer-restart/delegate/flush sequence end to end.
    #[arg(long)]
    with_channel_finalize: bool,
}

fn parse_duration(value: &str) -> Result<Duration, anyhow::Error> {
    let ns = match go_parse_duration::parse_duration(value) {
        Ok(ns) if ns < 0 => anyhow::bail!("must be a non-negative duration: {}", value),
        Ok(ns) => ns,
        Err(_) => anyhow::bail!("failed to parse duration: {}", value),
    };
    Ok(Duration::from_nanos(ns as u64))
}

#[derive(Tabled)]
struct ContainerRow {
    name: String,
    status: String,
}

struct NoOpRelayer;

#[async_trait]
impl Relayer for NoOpRelayer {
    async fn stop(&self) -> anyhow::Result<()> {
        info!("(stub) relayer stop");
        Ok(())
    }
    async fn start(&self) -> anyhow::Result<()> {
        info!("(stub) relayer start");
        Ok(())
    }
    async fn channels(&self, _chain_id: &str) -> anyhow::Result<Vec<ChannelInfo>> {
        Ok(vec![ChannelInfo { port_id: "provider".to_string(), channel_id: "channel-0".to_string() }])
    }
    async fn flush(&self, ibc_path: &str, channel_id: &str) -> anyhow::Result<()> {
        info!("(stub) relayer flush path={} channel={}", ibc_path, channel_id);
        Ok(())
    }
}

struct NoOpChain;

#[async_trait]
impl ChainHandle for NoOpChain {
    async fn bonded_validators(&self) -> anyhow::Result<Vec<BondedValidator>> {
        Ok(vec![BondedValidator { operator_address: "stubvaloper1".to_string(), tokens: 1_000_000 }])
    }
    async fn delegate(&self, from_key: &str, operator: &str, amount: &str) -> anyhow::Result<()> {
        info!("(stub) delegate {} from={} to={}", amount, from_key, operator);
        Ok(())
    }
    fn native_denom(&self) -> &str {
        "ustake"
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let cli: Cli = clap::Parser::parse();
    let scope = Arc::new(TestScope::new(cli.test_name.clone()));
    let policy = TeardownPolicy::from_env();

    // Fatal-at-setup: the test cannot proceed without Docker.
    let harness = setup(scope.clone(), policy)
        .await
        .context("setup failed; aborting")?;
    info!("setup complete, network id {}", harness.network_id);

    let containers = reaper::list_for_test(&harness.docker, scope.name()).await?;
    if !containers.is_empty() {
        let rows: Vec<ContainerRow> = containers
            .iter()
            .map(|c| ContainerRow {
                name: c
                    .names
                    .as_ref()
                    .and_then(|n| n.first())
                    .cloned()
                    .unwrap_or_default(),
                status: c.status.clone().unwrap_or_default(),
            })
            .collect();
        info!("\n{}", tabled::Table::new(rows));
    }

    if cli.with_channel_finalize {
        match finalize(&NoOpRelayer, &NoOpChain, "provider-chain", "demo-path").await {
            Ok(()) => info!("channel finalize completed"),
            Err(e) => error!("channel finalize failed: {}", e),
        }
    }

    if !cli.settle.is_zero() {
        info!("settling for {:?} before teardown", cli.settle);
        sleep(cli.settle).await;
    }

    scope.run_cleanup().await;
    info!("teardown complete");
    Ok(())
}

//! Channel Finalizer: completes a partial provider<->consumer IBC handshake
//! by restarting the relayer, perturbing validator power to force a
//! validator-set-update packet, and flushing it through on the correct port.
//! Consumes only the `Relayer`/`ChainHandle` collaborator interfaces; it
//! never touches Docker directly.

use crate::error::ChannelError;
use async_trait::async_trait;
use tracing::warn;

/// Quantum delegated to force a validator-set-update packet.
const DELEGATION_AMOUNT: u64 = 1_000_000;

/// A single IBC channel as reported by the relayer's channel listing.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub port_id: String,
    pub channel_id: String,
}

/// A bonded validator as reported by the chain's staking query.
#[derive(Debug, Clone)]
pub struct BondedValidator {
    pub operator_address: String,
    pub tokens: u64,
}

/// The relayer collaborator interface: stop, start, list channels for a
/// chain id, flush pending packets on `(path, channelId)`.
#[async_trait]
pub trait Relayer: Send + Sync {
    async fn stop(&self) -> anyhow::Result<()>;
    async fn start(&self) -> anyhow::Result<()>;
    async fn channels(&self, chain_id: &str) -> anyhow::Result<Vec<ChannelInfo>>;
    async fn flush(&self, ibc_path: &str, channel_id: &str) -> anyhow::Result<()>;
}

/// The chain collaborator interface: query bonded validators, delegate,
/// read the native denom.
///
/// `bonded_validators` is always consumed at index 0 by the finalizer; if a
/// concrete implementation cannot guarantee a stable ordering across calls,
/// the finalizer becomes non-deterministic. Implementers should prefer an
/// implementation that sorts by `operator_address`.
#[async_trait]
pub trait ChainHandle: Send + Sync {
    async fn bonded_validators(&self) -> anyhow::Result<Vec<BondedValidator>>;
    async fn delegate(&self, from_key: &str, operator_address: &str, amount_with_denom: &str) -> anyhow::Result<()>;
    fn native_denom(&self) -> &str;
}

/// Drives the provider<->consumer bring-up handshake to completion: relayer
/// restart, validator power perturbation, then a targeted packet flush.
/// Every failure path wraps which step broke and is returned to the caller;
/// none of it is swallowed, unlike teardown.
pub async fn finalize(
    relayer: &dyn Relayer,
    chain: &dyn ChainHandle,
    provider_chain_id: &str,
    ibc_path: &str,
) -> Result<(), ChannelError> {
    relayer.stop().await.map_err(ChannelError::RelayerStop)?;
    relayer.start().await.map_err(ChannelError::RelayerStart)?;

    let before = chain
        .bonded_validators()
        .await
        .map_err(ChannelError::QueryValidators)?;
    let target = before.first().ok_or(ChannelError::ValidatorNotFound)?.clone();

    let amount = format!("{DELEGATION_AMOUNT}{}", chain.native_denom());
    chain
        .delegate("validator", &target.operator_address, &amount)
        .await
        .map_err(ChannelError::Delegate)?;

    let after = chain
        .bonded_validators()
        .await
        .map_err(ChannelError::QueryValidators)?;
    let updated = after
        .iter()
        .find(|v| v.operator_address == target.operator_address)
        .ok_or(ChannelError::ValidatorNotFound)?;

    // Strictly-less-than, not less-or-equal: a delegation always adds tokens
    // in practice, so this only matters if callers want equality treated as
    // failure too, in which case switch this to `<=`.
    if updated.tokens < target.tokens {
        return Err(ChannelError::PowerDidNotIncrease {
            before: target.tokens,
            after: updated.tokens,
        });
    }

    flush(relayer, provider_chain_id, ibc_path).await
}

/// Flushes any packets pending on the provider-side channel. If no channel
/// with port id `"provider"` exists, the empty channel id is forwarded to
/// the relayer; this is logged so the silent case is still observable.
pub async fn flush(relayer: &dyn Relayer, chain_id: &str, ibc_path: &str) -> Result<(), ChannelError> {
    let channels = relayer
        .channels(chain_id)
        .await
        .map_err(ChannelError::ListChannels)?;

    let channel_id = channels
        .iter()
        .rfind(|c| c.port_id == "provider")
        .map(|c| c.channel_id.clone())
        .unwrap_or_else(|| {
            warn!("no channel with port id \"provider\" found for chain {}", chain_id);
            String::new()
        });

    relayer
        .flush(ibc_path, &channel_id)
        .await
        .map_err(ChannelError::Flush)
}

//! Scripted walk-through against a dev node.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Result};
use red_envelope_client::{EnvelopeKind, EMPTY_ROOM_ID_HASH};
use tracing::info;

use crate::{
    commands::{print_chain_info, service},
    display, Cli,
};

const DEMO_CLAIMS: u32 = 5;
const DEMO_AMOUNT_PER_CLAIM: u64 = 100_000_000_000_000_000;
const DEMO_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

pub async fn run(cli: &Cli) -> Result<()> {
    let svc = service(cli).await?;
    let poll = cli.poll_config();

    display::section("Chain");
    print_chain_info(svc.client(), Some(svc.address())).await?;
    println!("contract:     {}", svc.contract_address());

    display::section("Next envelope");
    let id = svc.next_envelope_id().await?;
    println!("next envelope id: {id}");

    display::section("Create GROUP_FIXED envelope");
    let amount = U256::from(DEMO_AMOUNT_PER_CLAIM);
    let quote = svc.quote_create(EnvelopeKind::GroupFixed, amount, DEMO_CLAIMS, cli.fee_bps);
    display::print_quote(&quote, Address::ZERO);
    let sent = svc
        .create_envelope(
            EnvelopeKind::GroupFixed,
            Address::ZERO,
            DEMO_CLAIMS,
            amount,
            DEMO_EXPIRY,
            EMPTY_ROOM_ID_HASH,
            Address::ZERO,
        )
        .await?;
    display::print_sent("createEnvelope", &sent);
    let receipt = svc.wait_for_receipt(sent.hash, poll).await?;
    display::print_receipt(&receipt);
    if !receipt.is_success() {
        bail!("createEnvelope {} reverted", sent.hash);
    }

    display::section("Read back");
    let envelope = svc.get_envelope(id).await?;
    display::print_envelope(id, &envelope);

    display::section("Claim");
    if svc.has_claimed(id, svc.address()).await? {
        println!("{} already claimed envelope #{id}", svc.address());
        return Ok(());
    }
    let sent = svc.claim_envelope(id).await?;
    display::print_sent("claimEnvelope", &sent);
    let receipt = svc.wait_for_receipt(sent.hash, poll).await?;
    display::print_receipt(&receipt);

    display::section("Updated envelope");
    display::print_envelope(id, &svc.get_envelope(id).await?);
    println!(
        "claimed by signer: {}",
        svc.has_claimed(id, svc.address()).await?
    );
    info!(envelope_id = %id, "demo finished");
    Ok(())
}

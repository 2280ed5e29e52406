use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use anyhow::{anyhow, bail, Context, Result};
use red_envelope_client::{
    connect, format_ether, room_id_hash, send_native, wait_for_receipt, ChainClient,
    EnvelopeKind, EnvelopeService, TxSigner, EMPTY_ROOM_ID_HASH,
};
use tracing::{debug, warn};

use crate::{display, Cli, Command};

pub async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Chain => chain_info(cli).await,
        Command::Transfer { to, amount } => transfer(cli, *to, *amount).await,
        Command::NextId => {
            let svc = service(cli).await?;
            println!("{}", svc.next_envelope_id().await?);
            Ok(())
        }
        Command::Get { id, json } => {
            let svc = service(cli).await?;
            let envelope = svc.get_envelope(*id).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else {
                display::print_envelope(*id, &envelope);
            }
            Ok(())
        }
        Command::HasClaimed { id, user } => {
            let svc = service(cli).await?;
            let user = user.unwrap_or_else(|| svc.address());
            let claimed = svc.has_claimed(*id, user).await?;
            println!("{user} has claimed envelope #{id}: {claimed}");
            Ok(())
        }
        Command::RoomHash { room } => {
            println!("{}", room_id_hash(room));
            Ok(())
        }
        Command::Create {
            kind,
            amount,
            claims,
            expiry_secs,
            room,
            room_hash,
            recipient,
            token,
            wait,
        } => {
            let room_hash = match (room, room_hash) {
                (Some(room), _) => room_id_hash(room),
                (None, Some(hash)) => *hash,
                (None, None) => EMPTY_ROOM_ID_HASH,
            };
            let recipient = recipient.unwrap_or(Address::ZERO);
            if *kind == EnvelopeKind::DirectFixed && recipient == Address::ZERO {
                bail!("DIRECT_FIXED envelopes need --recipient");
            }
            create(
                cli,
                CreateRequest {
                    kind: *kind,
                    token: token.unwrap_or(Address::ZERO),
                    claims: *claims,
                    amount: *amount,
                    expiry: Duration::from_secs(*expiry_secs),
                    room_hash,
                    recipient,
                },
                *wait,
            )
            .await
        }
        Command::Claim { id, wait } => {
            let svc = service(cli).await?;
            let sent = svc.claim_envelope(*id).await?;
            display::print_sent("claimEnvelope", &sent);
            if *wait {
                let receipt = svc.wait_for_receipt(sent.hash, cli.poll_config()).await?;
                display::print_receipt(&receipt);
                if receipt.is_success() {
                    display::print_envelope(*id, &svc.get_envelope(*id).await?);
                } else {
                    warn!(hash = %sent.hash, envelope_id = %id, "claim reverted");
                }
            }
            Ok(())
        }
        Command::Refund { id, wait } => {
            let svc = service(cli).await?;
            let sent = svc.refund_envelope(*id).await?;
            display::print_sent("refundEnvelope", &sent);
            if *wait {
                let receipt = svc.wait_for_receipt(sent.hash, cli.poll_config()).await?;
                display::print_receipt(&receipt);
            }
            Ok(())
        }
        Command::Demo => crate::demo::run(cli).await,
    }
}

fn private_key(cli: &Cli) -> Result<&str> {
    cli.private_key
        .as_deref()
        .ok_or_else(|| anyhow!("missing signing key: provide --private-key (or set PKEY)"))
}

fn contract_address(cli: &Cli) -> Result<&str> {
    cli.contract_address
        .as_deref()
        .ok_or_else(|| anyhow!("missing contract: provide --contract (or set CONTRACT_ADDRESS)"))
}

pub async fn service(cli: &Cli) -> Result<EnvelopeService> {
    let svc = EnvelopeService::connect(&cli.rpc_url, contract_address(cli)?, private_key(cli)?)
        .await
        .with_context(|| format!("failed to set up envelope service on {}", cli.rpc_url))?;
    debug!(address = %svc.address(), chain_id = svc.chain_id(), "service connected");
    Ok(svc)
}

/// Chain id, latest block and, when a key is configured, the signer's balance.
pub async fn print_chain_info<C: ChainClient>(client: &C, signer: Option<Address>) -> Result<()> {
    let chain_id = client.chain_id().await.context("failed to get chain ID")?;
    let number = client.block_number().await.context("failed to get block number")?;
    println!("chain id:     {chain_id}");
    println!("block number: {number}");
    match client
        .block_summary(number)
        .await
        .context("failed to get latest block")?
    {
        Some(block) => {
            let hash = block
                .hash
                .map(|h| h.to_string())
                .unwrap_or_else(|| "pending".to_string());
            println!("block hash:   {hash}");
            println!("block time:   {}", display::format_timestamp(block.timestamp));
            println!("transactions: {}", block.transaction_count);
        }
        None => println!("latest block not available"),
    }
    if let Some(address) = signer {
        let balance = client.balance(address).await.context("failed to get balance")?;
        println!("signer:       {address}");
        println!("balance:      {} ETH", format_ether(balance));
    }
    Ok(())
}

async fn chain_info(cli: &Cli) -> Result<()> {
    let provider = connect(&cli.rpc_url)?;
    let signer = match &cli.private_key {
        Some(key) => Some(TxSigner::address_of(key)?),
        None => None,
    };
    print_chain_info(&provider, signer).await
}

async fn transfer(cli: &Cli, to: Address, amount: U256) -> Result<()> {
    let provider = connect(&cli.rpc_url)?;
    let chain_id = ChainClient::chain_id(&provider)
        .await
        .context("failed to get chain ID")?;
    let signer = TxSigner::from_hex(private_key(cli)?, chain_id)?;

    let sent = send_native(&provider, &signer, to, amount).await?;
    display::print_sent("transfer", &sent);
    let receipt = wait_for_receipt(&provider, sent.hash, cli.poll_config()).await?;
    display::print_receipt(&receipt);

    for (label, address) in [("sender", signer.address()), ("recipient", to)] {
        let balance = ChainClient::balance(&provider, address)
            .await
            .with_context(|| format!("failed to get balance of {address}"))?;
        println!("{label} {address}: {} ETH", format_ether(balance));
    }
    Ok(())
}

pub struct CreateRequest {
    pub kind: EnvelopeKind,
    pub token: Address,
    pub claims: u32,
    pub amount: U256,
    pub expiry: Duration,
    pub room_hash: B256,
    pub recipient: Address,
}

async fn create(cli: &Cli, request: CreateRequest, wait: bool) -> Result<()> {
    let svc = service(cli).await?;
    let quote = svc.quote_create(request.kind, request.amount, request.claims, cli.fee_bps);
    display::print_quote(&quote, request.token);

    let expected_id = svc.next_envelope_id().await?;
    let sent = svc
        .create_envelope(
            request.kind,
            request.token,
            request.claims,
            request.amount,
            request.expiry,
            request.room_hash,
            request.recipient,
        )
        .await?;
    display::print_sent("createEnvelope", &sent);
    println!("expected envelope id: {expected_id}");

    if wait {
        let receipt = svc.wait_for_receipt(sent.hash, cli.poll_config()).await?;
        display::print_receipt(&receipt);
        if receipt.is_success() {
            display::print_envelope(expected_id, &svc.get_envelope(expected_id).await?);
        }
    }
    Ok(())
}

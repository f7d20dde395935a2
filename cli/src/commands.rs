use std::path::Path;

use anyhow::{Context, Result, anyhow};
use shadowvote_config::ShadowVoteConfig;
use shadowvote_core::ballot::{Nullifier, OptionIndex, VoterIdentity};
use shadowvote_core::{
    Deployment, LedgerReader, ProvingBackend, SubmissionState, Tally, VotingClient,
    WalletProvider,
};

fn load_config(path: Option<&str>) -> Result<ShadowVoteConfig> {
    match path {
        Some(path) => {
            log::debug!("Using config file from --config: {}", path);
            ShadowVoteConfig::load_from(Path::new(path))
        }
        None => ShadowVoteConfig::load(),
    }
}

fn deploy(path: Option<&str>) -> Result<Deployment> {
    let config = load_config(path)?;
    Deployment::from_config(&config).context("invalid configuration")
}

fn print_tallies(tallies: &[Tally]) {
    let total: u64 = tallies.iter().map(|t| t.votes).sum();
    for tally in tallies {
        println!("  {tally}");
    }
    println!("  total: {total}");
}

pub async fn tally(config: Option<&str>, json: bool) -> Result<()> {
    let deployment = deploy(config)?;
    let tallies = deployment
        .catalog
        .fetch_all()
        .await
        .context("failed to read tallies")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tallies)?);
    } else {
        println!("Current standings:");
        print_tallies(&tallies);
    }
    Ok(())
}

pub async fn vote(config: Option<&str>, index: usize) -> Result<()> {
    let deployment = deploy(config)?;
    let client = deployment
        .voting()
        .map_err(|e| anyhow!("voting is disabled: {e}"))?;
    cast(client, OptionIndex(index)).await
}

/// Validate, connect, prove and submit, printing progress along the way
async fn cast<P, W, R>(client: &VotingClient<P, W, R>, option: OptionIndex) -> Result<()>
where
    P: ProvingBackend,
    W: WalletProvider,
    R: LedgerReader,
{
    // Reject a bad index before the wallet sees any request
    client.pipeline().check_option(option)?;

    let identity = client.connect().await?;
    println!("Connected as {identity}");

    let mut status = client.subscribe();
    let progress = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let state = status.borrow_and_update().state.clone();
            match state {
                SubmissionState::Proving => println!("⏳ Generating proof..."),
                SubmissionState::Submitting => println!("📤 Submitting vote..."),
                _ => {}
            }
        }
    });

    let outcome = client.vote(option).await;
    progress.abort();
    let confirmation = outcome?;

    let message = client.status().message.unwrap_or_default();
    println!("✅ {message}");
    println!("   tx:        {}", confirmation.tx_hash);
    if let Some(block) = confirmation.block_number {
        println!("   block:     {block}");
    }
    println!("   nullifier: {}", confirmation.nullifier);

    let tallies = client.tallies().await.context("failed to re-read tallies")?;
    println!();
    print_tallies(&tallies);
    Ok(())
}

pub fn nullifier(address: &str) -> Result<()> {
    let identity: VoterIdentity = address.parse()?;
    let nullifier = Nullifier::derive(&identity);
    println!("identity:        {identity}");
    println!("nullifier:       {nullifier}");
    println!("public signal:   {}", nullifier.to_field_element());
    Ok(())
}

pub fn print_sample_config() {
    println!("{}", ShadowVoteConfig::generate_sample());
}

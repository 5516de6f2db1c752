use clap::Parser;
use hl_ledger_staking::{
    device::{open_transport, MAX_ACCOUNT_INDEX},
    prelude::Result, BaseUrl, DerivationPath, Error, InfoClient, SignerKind,
    TypedDataSigner,
};
use log::info;
use serde::Serialize;

/// Prints the staking summary, delegations and recent rewards of an account.
#[derive(Parser, Debug)]
struct Opts {
    #[arg(
        long,
        env = "HL_LEDGER_ACCOUNT",
        default_value_t = 0,
        value_parser = clap::value_parser!(u32).range(..=MAX_ACCOUNT_INDEX as i64)
    )]
    ledger_account: u32,

    #[arg(long, value_enum, env = "HL_SIGNER", default_value_t = SignerKind::Ledger)]
    signer: SignerKind,

    #[arg(long)]
    testnet: bool,
}

fn print_json<T: Serialize + ?Sized>(title: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::JsonParse(e.to_string()))?;
    println!("{title}");
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    let opts = Opts::parse();

    let device = open_transport(opts.signer)?;
    let signer =
        TypedDataSigner::connect(device, DerivationPath::ledger_live(opts.ledger_account)?).await?;
    let address = signer.address();
    info!("Account {address:?}");

    let base_url = if opts.testnet {
        BaseUrl::Testnet
    } else {
        BaseUrl::Mainnet
    };
    let info_client = InfoClient::new(None, Some(base_url));

    let summary = info_client.user_staking_summary(address).await?;
    print_json("Staking summary:", &summary)?;

    let delegations = info_client.user_staking_delegations(address).await?;
    print_json("Staking breakdown:", &delegations)?;

    let rewards = info_client.user_staking_rewards(address).await?;
    print_json(
        "Most recent staking rewards:",
        &rewards[..rewards.len().min(5)],
    )?;

    Ok(())
}

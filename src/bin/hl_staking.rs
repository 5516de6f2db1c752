use clap::Parser;
use hl_ledger_staking::cli::{retry_hint, run, Args, Outcome};
use std::process;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(outcome) => {
            match &outcome {
                Outcome::Submitted(response) => match serde_json::to_string_pretty(response) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        process::exit(1);
                    }
                },
                Outcome::Cancelled => println!("\nCancelled."),
            }
            // exit explicitly: after a cancel the blocked stdin reader would hold the runtime open
            process::exit(outcome.exit_code());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = retry_hint(&e) {
                eprintln!("{hint}");
            }
            process::exit(1);
        }
    }
}

//! The `hl-staking` command line: argument parsing, the confirmation gate and dispatch to
//! the exchange client.

use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use clap::{Parser, ValueEnum};
use log::info;

use crate::{
    device::{open_transport, DerivationPath, DeviceTransport, SignerKind, MAX_ACCOUNT_INDEX},
    exchange::{ExchangeClient, ExchangeResponseStatus, ValidatorProfileChange, ValidatorRegistration},
    helpers::format_hype,
    prelude::*,
    signature::TypedDataSigner,
    BaseUrl, Error, DEFAULT_DEVICE_TIMEOUT_SECS,
};

const EXAMPLES: &str = "\
Examples:
  # Deposit 1 HYPE into staking (1 HYPE = 1e8 wei)
  hl-staking deposit --wei 100000000 --ledger-account 0

  # Withdraw 0.5 HYPE from staking
  hl-staking withdraw --wei 50000000 --ledger-account 0

  # Jail or unjail self (validator signer action)
  hl-staking jail-self --ledger-account 0
  hl-staking unjail-self --ledger-account 0

  # Register a validator
  hl-staking validator-register --ledger-account 0 --json '{\"node_ip\": \"1.2.3.4\", \"name\": \"My Validator\", \"description\": \"A great validator\", \"delegations_disabled\": false, \"commission_bps\": 1000, \"signer\": \"0x...\", \"unjailed\": true, \"initial_wei\": 100000000}'

  # Change validator profile (only \"unjailed\" is required)
  hl-staking validator-change-profile --ledger-account 0 --json '{\"unjailed\": true, \"commission_bps\": 500}'

  # Unregister validator
  hl-staking validator-unregister --ledger-account 0

  # Use testnet
  hl-staking deposit --wei 100000000 --ledger-account 0 --testnet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    /// Move HYPE from the spot balance into staking
    #[value(alias = "cDeposit")]
    Deposit,
    /// Move HYPE from staking back to the spot balance
    #[value(alias = "cWithdraw")]
    Withdraw,
    /// Jail the validator this signer belongs to
    #[value(alias = "cSignerJailSelf")]
    JailSelf,
    /// Unjail the validator this signer belongs to
    #[value(alias = "cSignerUnjailSelf")]
    UnjailSelf,
    #[value(alias = "cValidatorRegister")]
    ValidatorRegister,
    #[value(alias = "cValidatorChangeProfile")]
    ValidatorChangeProfile,
    #[value(alias = "cValidatorUnregister")]
    ValidatorUnregister,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Deposit => "deposit",
            Command::Withdraw => "withdraw",
            Command::JailSelf => "jail-self",
            Command::UnjailSelf => "unjail-self",
            Command::ValidatorRegister => "validator-register",
            Command::ValidatorChangeProfile => "validator-change-profile",
            Command::ValidatorUnregister => "validator-unregister",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hl-staking",
    version,
    about = "Hyperliquid staking and validator operations signed on a Ledger",
    after_help = EXAMPLES
)]
pub struct Args {
    #[arg(value_enum)]
    pub command: Command,

    /// Amount in wei (1 HYPE = 1e8 wei). Required for deposit and withdraw
    #[arg(long)]
    pub wei: Option<u64>,

    /// JSON parameters for validator-register and validator-change-profile
    #[arg(long)]
    pub json: Option<String>,

    /// Account index, signed with the key at 44'/60'/<index>'/0/0
    #[arg(
        long,
        env = "HL_LEDGER_ACCOUNT",
        value_parser = clap::value_parser!(u32).range(..=MAX_ACCOUNT_INDEX as i64)
    )]
    pub ledger_account: u32,

    /// Use testnet instead of mainnet
    #[arg(long)]
    pub testnet: bool,

    /// Use a local node API on localhost:3001
    #[arg(long, conflicts_with = "testnet")]
    pub local: bool,

    /// Where the signing key lives
    #[arg(long, value_enum, env = "HL_SIGNER", default_value_t = SignerKind::Ledger)]
    pub signer: SignerKind,

    /// Seconds to wait for approval on the device (0 waits forever)
    #[arg(long, env = "HL_DEVICE_TIMEOUT_SECS", default_value_t = DEFAULT_DEVICE_TIMEOUT_SECS)]
    pub device_timeout: u64,
}

impl Args {
    pub fn base_url(&self) -> BaseUrl {
        if self.local {
            BaseUrl::Localhost
        } else if self.testnet {
            BaseUrl::Testnet
        } else {
            BaseUrl::Mainnet
        }
    }

    pub fn derivation_path(&self) -> Result<DerivationPath> {
        DerivationPath::ledger_live(self.ledger_account)
    }
}

/// A fully parsed command, ready to be confirmed and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Deposit { wei: u64 },
    Withdraw { wei: u64 },
    JailSelf,
    UnjailSelf,
    Register(ValidatorRegistration),
    ChangeProfile(ValidatorProfileChange),
    Unregister,
}

impl PendingAction {
    /// Checks the command's arguments. Nothing here touches the device.
    pub fn from_args(command: Command, wei: Option<u64>, json: Option<&str>) -> Result<Self> {
        let missing = |argument| Error::MissingArgument {
            argument,
            command: command.name(),
        };
        Ok(match command {
            Command::Deposit => PendingAction::Deposit {
                wei: wei.ok_or_else(|| missing("wei"))?,
            },
            Command::Withdraw => PendingAction::Withdraw {
                wei: wei.ok_or_else(|| missing("wei"))?,
            },
            Command::JailSelf => PendingAction::JailSelf,
            Command::UnjailSelf => PendingAction::UnjailSelf,
            Command::ValidatorRegister => PendingAction::Register(ValidatorRegistration::from_json(
                json.ok_or_else(|| missing("json"))?,
            )?),
            Command::ValidatorChangeProfile => PendingAction::ChangeProfile(
                ValidatorProfileChange::from_json(json.ok_or_else(|| missing("json"))?)?,
            ),
            Command::ValidatorUnregister => PendingAction::Unregister,
        })
    }

    /// What the user is asked to confirm.
    pub fn describe(&self) -> String {
        match self {
            PendingAction::Deposit { wei } => {
                format!("Deposit {wei} wei ({} HYPE) into staking", format_hype(*wei))
            }
            PendingAction::Withdraw { wei } => {
                format!("Withdraw {wei} wei ({} HYPE) from staking", format_hype(*wei))
            }
            PendingAction::JailSelf => "Jail self (validator signer)".to_string(),
            PendingAction::UnjailSelf => "Unjail self (validator signer)".to_string(),
            PendingAction::Register(registration) => {
                format!("Register validator: {}", registration.profile.name)
            }
            PendingAction::ChangeProfile(change) => match serde_json::to_string_pretty(change) {
                Ok(json) => format!("Change validator profile\n{json}"),
                Err(_) => format!("Change validator profile\n{change:?}"),
            },
            PendingAction::Unregister => "Unregister validator".to_string(),
        }
    }

    pub async fn execute<D: DeviceTransport>(
        self,
        exchange: &mut ExchangeClient<D>,
    ) -> Result<ExchangeResponseStatus> {
        match self {
            PendingAction::Deposit { wei } => exchange.c_deposit(wei).await,
            PendingAction::Withdraw { wei } => exchange.c_withdraw(wei).await,
            PendingAction::JailSelf => exchange.c_signer_jail_self().await,
            PendingAction::UnjailSelf => exchange.c_signer_unjail_self().await,
            PendingAction::Register(registration) => exchange.c_validator_register(registration).await,
            PendingAction::ChangeProfile(change) => exchange.c_validator_change_profile(change).await,
            PendingAction::Unregister => exchange.c_validator_unregister().await,
        }
    }
}

/// Blocks until the user presses Enter. `false` means Ctrl+C or end of input.
pub async fn confirm_action(description: &str) -> Result<bool> {
    let rule = "=".repeat(50);
    println!();
    println!("{rule}");
    println!("Action: {description}");
    println!("{rule}");
    println!();
    print!("Press Enter to continue to signing (Ctrl+C to cancel)...");
    io::stdout()
        .flush()
        .map_err(|e| Error::Terminal(e.to_string()))?;

    let enter = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|read| read > 0)
    });

    tokio::select! {
        answer = enter => match answer {
            Ok(Ok(pressed)) => Ok(pressed),
            Ok(Err(e)) => Err(Error::Terminal(e.to_string())),
            Err(e) => Err(Error::Terminal(e.to_string())),
        },
        _ = tokio::signal::ctrl_c() => Ok(false),
    }
}

pub enum Outcome {
    Submitted(ExchangeResponseStatus),
    Cancelled,
}

impl Outcome {
    /// A cancel is a clean exit; an error status from the exchange is not.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Submitted(response) if !response.is_ok() => 1,
            _ => 0,
        }
    }
}

/// Extra advice printed under an error the user can fix at the device and retry.
pub fn retry_hint(e: &Error) -> Option<&'static str> {
    match e {
        Error::Signer(signer_error) if signer_error.is_retryable() => Some(
            "Check that the device is connected and unlocked with the Ethereum app open, then run the command again.",
        ),
        _ => None,
    }
}

pub async fn run(args: Args) -> Result<Outcome> {
    let action = PendingAction::from_args(args.command, args.wei, args.json.as_deref())?;

    let path = args.derivation_path()?;
    println!("Connecting to {:?} signer (account path: {path})...", args.signer);
    let device = open_transport(args.signer)?;
    let mut signer = TypedDataSigner::connect(device, path).await?;
    if args.device_timeout > 0 {
        signer = signer.with_timeout(Duration::from_secs(args.device_timeout));
    }
    println!("Address: {:?}", signer.address());

    let base_url = args.base_url();
    println!("Network: {}", base_url.network_name());
    let mut exchange = ExchangeClient::new(None, signer, Some(base_url));

    if !confirm_action(&action.describe()).await? {
        return Ok(Outcome::Cancelled);
    }
    info!("Submitting {}", args.command.name());
    Ok(Outcome::Submitted(action.execute(&mut exchange).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("hl-staking").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_names_and_aliases() {
        let args = parse(&["deposit", "--wei", "100000000", "--ledger-account", "11"]);
        assert_eq!(args.command, Command::Deposit);
        assert_eq!(args.wei, Some(100_000_000));
        assert_eq!(args.derivation_path().unwrap().as_str(), "44'/60'/11'/0/0");
        assert_eq!(args.base_url(), BaseUrl::Mainnet);
        assert_eq!(args.signer, SignerKind::Ledger);

        let args = parse(&["cValidatorUnregister", "--ledger-account", "0", "--testnet"]);
        assert_eq!(args.command, Command::ValidatorUnregister);
        assert_eq!(args.base_url(), BaseUrl::Testnet);

        let args = parse(&["jail-self", "--ledger-account", "0", "--signer", "private-key"]);
        assert_eq!(args.signer, SignerKind::PrivateKey);
    }

    #[test]
    fn test_account_index_must_not_be_hardened() {
        let args = parse(&["jail-self", "--ledger-account", "2147483647"]);
        assert_eq!(
            args.derivation_path().unwrap().as_str(),
            "44'/60'/2147483647'/0/0"
        );

        for index in ["2147483648", "2147483653", "4294967295"] {
            assert!(
                Args::try_parse_from(["hl-staking", "jail-self", "--ledger-account", index]).is_err(),
                "{index} should be rejected"
            );
        }
    }

    #[test]
    fn test_local_network() {
        let args = parse(&["unjail-self", "--ledger-account", "0", "--local"]);
        assert_eq!(args.base_url(), BaseUrl::Localhost);
        assert!(Args::try_parse_from([
            "hl-staking",
            "unjail-self",
            "--ledger-account",
            "0",
            "--local",
            "--testnet"
        ])
        .is_err());
    }

    #[test]
    fn test_exit_codes() {
        let ok: ExchangeResponseStatus =
            serde_json::from_str(r#"{"status":"ok","response":{"type":"default"}}"#).unwrap();
        let err = ExchangeResponseStatus::Err("Insufficient staking balance".to_string());
        assert_eq!(Outcome::Submitted(ok).exit_code(), 0);
        assert_eq!(Outcome::Submitted(err).exit_code(), 1);
        assert_eq!(Outcome::Cancelled.exit_code(), 0);
    }

    #[test]
    fn test_retry_hint_only_for_unavailable_device() {
        use crate::SignerError;
        assert!(retry_hint(&Error::Signer(SignerError::DeviceUnavailable(
            "locked".to_string()
        )))
        .is_some());
        assert!(retry_hint(&Error::Signer(SignerError::UserRejected("denied".to_string()))).is_none());
        assert!(retry_hint(&Error::Signer(SignerError::MalformedTypedData("x".to_string()))).is_none());
        assert!(retry_hint(&Error::LedgerSupportDisabled).is_none());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Args::try_parse_from(["hl-staking", "stake", "--ledger-account", "0"]).is_err());
    }

    #[test]
    fn test_missing_amount() {
        match PendingAction::from_args(Command::Withdraw, None, None) {
            Err(e @ Error::MissingArgument { .. }) => {
                assert_eq!(e.to_string(), "--wei is required for withdraw")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            PendingAction::from_args(Command::ValidatorRegister, None, None),
            Err(Error::MissingArgument { argument: "json", .. })
        ));
    }

    #[test]
    fn test_descriptions() {
        let deposit = PendingAction::from_args(Command::Deposit, Some(150_000_000), None).unwrap();
        assert_eq!(
            deposit.describe(),
            "Deposit 150000000 wei (1.5 HYPE) into staking"
        );

        let register = PendingAction::from_args(
            Command::ValidatorRegister,
            None,
            Some(
                r#"{"node_ip": "1.2.3.4", "name": "My Validator", "description": "d",
                    "delegations_disabled": false, "commission_bps": 0,
                    "signer": "0x0000000000000000000000000000000000000001",
                    "unjailed": true, "initial_wei": 1}"#,
            ),
        )
        .unwrap();
        assert_eq!(register.describe(), "Register validator: My Validator");

        let change = PendingAction::from_args(
            Command::ValidatorChangeProfile,
            None,
            Some(r#"{"unjailed": true}"#),
        )
        .unwrap();
        assert!(change.describe().starts_with("Change validator profile\n{"));
        assert_eq!(
            PendingAction::from_args(Command::ValidatorUnregister, None, None)
                .unwrap()
                .describe(),
            "Unregister validator"
        );
    }
}

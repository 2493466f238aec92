//! typed-signer CLI
//!
//! Hash typed data, build and sign transactions, and normalize receipts.

use alloy::primitives::{Bytes, U256};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use typed_signer::personal::signature_to_bytes;
use typed_signer::primitives::{decode_hex_lenient, encode_address, encode_bytes, parse_address};
use typed_signer::{
    hash_typed_data_with, personal_ec_recover, sign_tx, Config, Error, Receipt, Result,
    SecureWallet, SignerEnv, Transaction, TransactionRequest,
};

#[derive(Parser)]
#[command(name = "typed-signer")]
#[command(about = "EIP-712 hashing, transaction signing and receipt tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the EIP-712 signing hash of a typed-data document
    HashTypedData {
        /// JSON file (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Recover the signer of a personal_sign signature
    PersonalRecover {
        /// Signed message (UTF-8)
        #[arg(short, long)]
        message: String,

        /// 65 byte signature, hex encoded
        #[arg(short, long)]
        signature: String,
    },

    /// Sign a message with the PRIVATE_KEY account
    PersonalSign {
        /// Message to sign (UTF-8)
        #[arg(short, long)]
        message: String,
    },

    /// Build an unsigned transaction and print its JSON form
    EncodeTx(TxArgs),

    /// Sign a transaction with the PRIVATE_KEY account
    SignTx(TxArgs),

    /// Decode a receipt and print it in canonical form
    Receipt {
        /// JSON file (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show current configuration
    Config,
}

#[derive(Args)]
struct TxArgs {
    /// Receiver address (omit for contract creation)
    #[arg(long)]
    to: Option<String>,

    #[arg(long, default_value_t = 0)]
    nonce: u64,

    /// Gas limit
    #[arg(long, default_value_t = 21000)]
    gas: u64,

    /// Legacy gas price in wei
    #[arg(long)]
    gas_price: Option<String>,

    /// Fee cap in wei (fee-market transactions)
    #[arg(long)]
    max_fee_per_gas: Option<String>,

    /// Priority fee in wei (fee-market transactions)
    #[arg(long)]
    max_priority_fee_per_gas: Option<String>,

    /// Value in wei
    #[arg(long, default_value = "0")]
    value: String,

    /// Calldata (hex encoded, with or without 0x prefix)
    #[arg(long, default_value = "")]
    data: String,

    /// Chain id (defaults to the configured chain)
    #[arg(long)]
    chain_id: Option<u64>,
}

fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let env = SignerEnv::from_env()?;
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env(&env);

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::HashTypedData { file } => {
            let json = read_input(file.as_deref())?;
            let digest = hash_typed_data_with(&json, &config.typed_data)?;
            println!("{}", digest);
        }
        Commands::PersonalRecover { message, signature } => {
            let signature = decode_hex_lenient(&signature)?;
            let address = personal_ec_recover(message.as_bytes(), &signature)?;
            println!("{}", encode_address(&address));
        }
        Commands::PersonalSign { message } => {
            let wallet = load_wallet(&env)?;
            let digest = typed_signer::text_hash(message.as_bytes());
            let signature = wallet.sign_hash(&digest)?;
            tracing::info!(address = %wallet.address(), "Signed personal message");
            println!("{}", encode_bytes(&signature_to_bytes(&signature)));
        }
        Commands::EncodeTx(args) => {
            let chain_id = args.chain_id.unwrap_or(config.chain_id);
            let tx = Transaction::new(args.into_request(chain_id, None)?);
            println!("{}", tx.encode_json()?);
        }
        Commands::SignTx(args) => {
            let wallet = load_wallet(&env)?;
            let chain_id = args.chain_id.unwrap_or(config.chain_id);
            let tx = Transaction::new(args.into_request(chain_id, Some(&wallet))?);
            let signed = sign_tx(&wallet, &wallet.address(), &tx, U256::from(chain_id))?;
            println!("{}", signed.encode_json()?);
        }
        Commands::Receipt { file } => {
            let json = read_input(file.as_deref())?;
            let receipt = Receipt::from_json(&json)?;
            println!("{}", receipt.encode_json()?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    // Logs go to stderr so stdout stays machine readable
    if config.logging.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

fn load_wallet(env: &SignerEnv) -> Result<SecureWallet> {
    let wallet = SecureWallet::from_env(env)?;
    tracing::info!(address = %wallet.address(), "Loaded wallet from PRIVATE_KEY");
    Ok(wallet)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| Error::MalformedInput(format!("{}: {}", path.display(), e))),
        None => std::io::read_to_string(std::io::stdin())
            .map_err(|e| Error::MalformedInput(format!("stdin: {}", e))),
    }
}

fn parse_wei(flag: &str, value: &str) -> Result<U256> {
    value
        .parse::<U256>()
        .map_err(|e| Error::MalformedInput(format!("--{}: {}", flag, e)))
}

impl TxArgs {
    fn into_request(self, chain_id: u64, sender: Option<&SecureWallet>) -> Result<TransactionRequest> {
        let opt_wei = |flag: &str, value: Option<String>| -> Result<Option<U256>> {
            value.map(|v| parse_wei(flag, &v)).transpose()
        };

        Ok(TransactionRequest {
            from: sender.map(SecureWallet::address),
            to: self.to.as_deref().map(parse_address).transpose()?,
            nonce: self.nonce,
            gas: self.gas,
            gas_price: opt_wei("gas-price", self.gas_price)?,
            max_fee_per_gas: opt_wei("max-fee-per-gas", self.max_fee_per_gas)?,
            max_priority_fee_per_gas: opt_wei(
                "max-priority-fee-per-gas",
                self.max_priority_fee_per_gas,
            )?,
            value: parse_wei("value", &self.value)?,
            chain_id: U256::from(chain_id),
            input: Bytes::from(decode_hex_lenient(&self.data)?),
            access_list: None,
        })
    }
}

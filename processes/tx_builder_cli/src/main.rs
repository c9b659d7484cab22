//! 'main' for the Sendada transaction builder CLI

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use config::{Config, Environment, File};
use sendada_cardano::{TxBuilder, TxRequest};
use sendada_codec::{encode_body, encode_legacy_aux, era_transaction_id};
use sendada_common::{Address, BuilderConfig, Era, Lovelace, TxOutput, UnspentOutput, Value};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter, fmt, EnvFilter, Registry};

#[derive(Parser, Debug)]
#[command(name = "tx-builder-cli")]
#[command(about = "Quote fees and build unsigned Cardano transactions")]
struct Args {
    /// Configuration file, without extension
    #[arg(short, long, default_value = "tx-builder")]
    config: String,

    /// JSON array of spendable outputs
    #[arg(short, long, default_value = "utxos.json")]
    utxos: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fee a payment would pay
    Quote(Payment),

    /// Print the fee, id and body bytes of a payment
    Build(Payment),
}

#[derive(ClapArgs, Debug)]
struct Payment {
    /// Destination address
    #[arg(long)]
    to: Address,

    /// Lovelace to send; ignored with --max
    #[arg(long, default_value_t = 0)]
    amount: Lovelace,

    /// Change address, defaults to the destination
    #[arg(long)]
    change: Option<Address>,

    /// Send everything the UTXOs hold, less the fee
    #[arg(long)]
    max: bool,
}

impl Payment {
    fn request(&self) -> TxRequest {
        if self.max {
            return TxRequest::sweep(self.to.clone());
        }
        TxRequest::pay(
            vec![TxOutput::new(self.to.clone(), Value::lovelace(self.amount))],
            self.change.clone().unwrap_or_else(|| self.to.clone()),
        )
    }
}

fn read_utxos(path: &PathBuf) -> Result<Vec<UnspentOutput>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Bad UTXO list in {}", path.display()))
}

fn main() -> Result<()> {
    let fmt_layer = fmt::layer().with_filter(
        EnvFilter::from_default_env().add_directive(filter::LevelFilter::INFO.into()),
    );
    Registry::default().with(fmt_layer).init();

    let args = Args::parse();

    let config = Config::builder()
        .add_source(File::with_name(&args.config).required(false))
        .add_source(Environment::with_prefix("SENDADA").separator("__"))
        .build()?;
    let builder = TxBuilder::new(BuilderConfig::from_config(&config)?);
    info!(
        era = ?builder.config().params.era,
        selection = %builder.config().selection,
        "Sendada transaction builder"
    );

    let utxos = read_utxos(&args.utxos)?;
    match args.command {
        Command::Quote(payment) => {
            let tx = builder.build(&payment.request(), &utxos)?;
            println!("fee: {}", tx.body.fee);
            if payment.max {
                let sent: Lovelace = tx.body.outputs.iter().map(|output| output.value.coin).sum();
                println!("max: {sent}");
            }
        }
        Command::Build(payment) => {
            let tx = builder.build(&payment.request(), &utxos)?;
            println!("fee: {}", tx.body.fee);
            println!("id: {}", era_transaction_id(tx.era, &tx.body)?);
            let body = match tx.era {
                Era::Byron => encode_legacy_aux(&tx.body)?,
                Era::Shelley => encode_body(&tx.body)?,
            };
            println!("body: {}", hex::encode(body));
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pasargad_gateway::config::GatewaySettings;
use pasargad_gateway::payments::{
    FileKeyLoader, GatewayOutcome, HttpTransport, PaymentSession, TransactionReferenceId,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML/JSON/YAML); PASARGAD_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Request a payment token and print the redirect URL
    Token {
        #[command(flatten)]
        invoice: InvoiceArgs,
    },
    /// Verify a completed payment
    Verify {
        #[command(flatten)]
        invoice: InvoiceArgs,
    },
    /// Query the status of a transaction
    Check {
        #[command(flatten)]
        invoice: InvoiceArgs,
        /// Transaction reference ID returned by the bank (`tref`)
        #[arg(long)]
        tref: String,
    },
    /// Refund a completed payment
    Refund {
        #[command(flatten)]
        invoice: InvoiceArgs,
    },
}

#[derive(Args)]
struct InvoiceArgs {
    /// Amount in rials
    #[arg(long)]
    amount: Option<u64>,
    #[arg(long)]
    invoice_number: String,
    /// Invoice date exactly as sent when the token was requested
    #[arg(long)]
    invoice_date: String,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn apply_invoice(session: &PaymentSession, invoice: &InvoiceArgs) -> Result<()> {
    if let Some(amount) = invoice.amount {
        session.set_amount(amount).await?;
    }
    session
        .set_invoice_number(invoice.invoice_number.as_str())
        .await?;
    session
        .set_invoice_date(invoice.invoice_date.as_str())
        .await?;
    Ok(())
}

fn print_outcome<T: Serialize>(outcome: &GatewayOutcome<T>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(outcome).context("Failed to render response")?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings =
        GatewaySettings::load(cli.config.as_deref()).context("Failed to load gateway settings")?;
    tracing::info!(
        "Pasargad gateway client: merchant_code={}, terminal_code={}",
        settings.merchant_code,
        settings.terminal_code
    );

    let signer = FileKeyLoader::new()
        .load_signer(&settings.key_path)
        .context("Failed to load merchant key")?;
    let transport = HttpTransport::new(settings.transport_config())?;
    let session = PaymentSession::new(settings.merchant_config()?, signer, Arc::new(transport));

    match cli.command {
        Command::Token { invoice } => {
            apply_invoice(&session, &invoice).await?;
            let url = session.redirect().await?;
            println!("{}", url);
        }
        Command::Verify { invoice } => {
            apply_invoice(&session, &invoice).await?;
            print_outcome(&session.verify_payment().await?)?;
        }
        Command::Check { invoice, tref } => {
            apply_invoice(&session, &invoice).await?;
            session
                .set_transaction_reference_id(TransactionReferenceId::new(tref))
                .await;
            print_outcome(&session.check_transaction().await?)?;
        }
        Command::Refund { invoice } => {
            apply_invoice(&session, &invoice).await?;
            print_outcome(&session.refund_payment().await?)?;
        }
    }

    Ok(())
}

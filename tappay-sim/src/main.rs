//! TapPay terminal simulator
//!
//! Seeds the default funding sources, runs a simulated tap-to-pay charge
//! and prints the resulting balances.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tappay_wallet::ledger::{default_funding_sources, Ledger};
use tappay_wallet::payment::engine::PaymentEngine;
use tappay_wallet::verification::{VerificationState, VerifiedIdentity};

#[derive(Parser, Debug)]
#[command(
    name = "tappay-sim",
    about = "Simulate a tap-to-pay charge against the default wallet"
)]
struct Args {
    /// Charge amount in USD; a random terminal amount is drawn when omitted
    #[arg(long)]
    amount: Option<Decimal>,

    /// Treat the wallet owner as identity-verified
    #[arg(long)]
    verified: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let ledger = Arc::new(Ledger::with_sources(default_funding_sources()));
    let verification = Arc::new(VerificationState::new());
    if args.verified {
        verification
            .set_verified(Some(VerifiedIdentity {
                nationality: "AR".to_string(),
                document_number: "X123".to_string(),
            }))
            .await;
    }

    let engine = PaymentEngine::new(ledger.clone(), verification.clone());
    info!(total = %ledger.total_balance().await, "wallet ready");

    let result = match args.amount {
        Some(amount) => engine.charge(amount).await,
        None => engine.charge_random().await,
    };

    match result {
        Ok(receipt) => {
            info!(
                source = %receipt.source_id,
                amount = %receipt.amount,
                new_balance = %receipt.new_balance,
                "charge settled"
            );
        }
        Err(err) => {
            error!(%err, "charge failed");
        }
    }

    let disabled_ids = ledger
        .disabled_source_ids(verification.is_verified().await)
        .await;
    for source in ledger.list_ordered_by_priority().await {
        let disabled = disabled_ids.contains(&source.id);
        info!(
            priority = source.priority,
            name = %source.name,
            balance = %source.balance,
            disabled,
            "funding source"
        );
    }

    Ok(())
}

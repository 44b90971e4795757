//! Default payment methods seeded into a fresh wallet

use rust_decimal::Decimal;

use super::FundingSource;

/// The default funding sources, in priority order.
///
/// Coinbase ships without a linked account and stays disabled until one is
/// connected; Celo, Base and Starknet are gated behind identity verification.
pub fn default_funding_sources() -> Vec<FundingSource> {
    vec![
        FundingSource::new("lemoncash", "LemonCash", 1, Decimal::new(18725, 2), false),
        FundingSource::new("coinbase", "Coinbase", 2, Decimal::ZERO, false).unlinked(),
        FundingSource::new("binance", "Binance Pay", 3, Decimal::new(3700, 2), false),
        FundingSource::new("celo", "Celo", 4, Decimal::new(32999, 2), true),
        FundingSource::new("base", "Base", 5, Decimal::new(20332, 2), true),
        FundingSource::new("starknet", "Starknet", 6, Decimal::new(9813, 2), true),
    ]
}

// Share purchases at the quoted probability price

use chrono::Utc;

use super::LedgerEngine;
use crate::error::LedgerError;
use crate::models::{BuyRequest, MarketPhase, Side, TradeReceipt};
use crate::pricing;
use crate::store::EntityKey;

impl LedgerEngine {
    /// Buy `quantity` contracts on one side of an ongoing market.
    ///
    /// The unit price is quoted from the counts this transaction reads, so
    /// every contract in one purchase costs the same and the counts move
    /// only when it commits. Payment, position update and count increment
    /// land atomically or not at all.
    pub fn buy(&self, market_id: &str, req: BuyRequest) -> Result<TradeReceipt, LedgerError> {
        if req.quantity == 0 {
            return Err(LedgerError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let keys = [
            EntityKey::Market(market_id.to_string()),
            EntityKey::Account(req.user_id.clone()),
        ];
        self.transact(&keys, |snap| {
            let mut market = snap.market(market_id)?;
            let mut account = snap.account(&req.user_id)?;

            if market.phase(Utc::now()) != MarketPhase::Ongoing {
                return Err(LedgerError::MarketNotOpen(market_id.to_string()));
            }

            let unit_price = pricing::unit_price(market.yes_count, market.no_count, req.side);
            let too_large = || LedgerError::Validation("quantity too large".to_string());
            let total_cost = unit_price.checked_mul(req.quantity).ok_or_else(too_large)?;

            if account.balance < total_cost {
                return Err(LedgerError::InsufficientBalance(format!(
                    "{} costs {} but {} holds {}",
                    req.quantity, total_cost, req.user_id, account.balance
                )));
            }

            account.balance -= total_cost;
            let position = account.portfolio.entry(market_id.to_string()).or_default();
            let holding = position.side_mut(req.side);
            holding.amount = holding.amount.checked_add(req.quantity).ok_or_else(too_large)?;
            holding.cost = holding.cost.checked_add(total_cost).ok_or_else(too_large)?;

            match req.side {
                Side::Yes => {
                    market.yes_count = market.yes_count.checked_add(req.quantity).ok_or_else(too_large)?
                }
                Side::No => {
                    market.no_count = market.no_count.checked_add(req.quantity).ok_or_else(too_large)?
                }
            }

            tracing::info!(
                "Trade on {}: {} bought {} {} at {} each",
                market.id,
                account.user_id,
                req.quantity,
                req.side,
                unit_price
            );

            let receipt = TradeReceipt {
                market_id: market.id.clone(),
                user_id: account.user_id.clone(),
                side: req.side,
                quantity: req.quantity,
                unit_price,
                total_cost,
                new_balance: account.balance,
                position: account.position(market_id),
                quote: pricing::quote(market.yes_count, market.no_count),
            };
            snap.put_market(market);
            snap.put_account(account);
            Ok(receipt)
        })
    }
}

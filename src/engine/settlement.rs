// Resolution by the creator and payout claims by winners

use chrono::Utc;

use super::{LedgerEngine, PAYOUT_PER_CONTRACT};
use crate::error::LedgerError;
use crate::models::{ClaimReceipt, Market, MarketPhase, ResolveRequest};
use crate::store::EntityKey;

impl LedgerEngine {
    /// Record the winning side. Only the creator may resolve, only after the
    /// trading window closed, and only once.
    pub fn resolve(&self, market_id: &str, req: ResolveRequest) -> Result<Market, LedgerError> {
        let keys = [EntityKey::Market(market_id.to_string())];
        self.transact(&keys, |snap| {
            let mut market = snap.market(market_id)?;

            if market.creator_id != req.user_id {
                return Err(LedgerError::NotCreator(format!(
                    "{} did not create market {}",
                    req.user_id, market_id
                )));
            }
            if market.resolved {
                return Err(LedgerError::AlreadyResolved(market_id.to_string()));
            }
            let now = Utc::now();
            if market.phase(now) != MarketPhase::Closed {
                return Err(LedgerError::MarketStillOpen(market_id.to_string()));
            }

            market.resolved = true;
            market.winning_side = Some(req.winning_side);
            market.resolved_at = Some(now);

            tracing::info!("Market {} resolved: {} wins", market.id, req.winning_side);
            snap.put_market(market.clone());
            Ok(market)
        })
    }

    /// Pay out the caller's contracts on the winning side, exactly once per
    /// user per market.
    pub fn claim(&self, market_id: &str, user_id: &str) -> Result<ClaimReceipt, LedgerError> {
        let keys = [
            EntityKey::Market(market_id.to_string()),
            EntityKey::Account(user_id.to_string()),
        ];
        self.transact(&keys, |snap| {
            let mut market = snap.market(market_id)?;
            let mut account = snap.account(user_id)?;

            if !market.resolved {
                return Err(LedgerError::NotResolved(market_id.to_string()));
            }
            let winning_side = market.winning_side.ok_or_else(|| {
                LedgerError::Storage(format!(
                    "market {} resolved without a winning side",
                    market_id
                ))
            })?;
            if market.has_claimed(user_id) {
                return Err(LedgerError::AlreadyClaimed(format!(
                    "{} already claimed on {}",
                    user_id, market_id
                )));
            }

            let winning_holdings = account.position(market_id).side(winning_side).amount;
            if winning_holdings == 0 {
                return Err(LedgerError::NothingToClaim(format!(
                    "{} holds no {} contracts on {}",
                    user_id, winning_side, market_id
                )));
            }

            let payout = winning_holdings
                .checked_mul(PAYOUT_PER_CONTRACT)
                .ok_or_else(|| LedgerError::Validation("payout too large".to_string()))?;
            account.balance = account
                .balance
                .checked_add(payout)
                .ok_or_else(|| LedgerError::Validation("balance overflow".to_string()))?;
            market.claimed_by.push(user_id.to_string());

            tracing::info!("Claim on {}: {} collected {}", market.id, user_id, payout);

            let receipt = ClaimReceipt {
                market_id: market.id.clone(),
                user_id: account.user_id.clone(),
                winning_side,
                winning_holdings,
                payout,
                new_balance: account.balance,
            };
            snap.put_market(market);
            snap.put_account(account);
            Ok(receipt)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::STARTING_BALANCE;
    use crate::models::{BuyRequest, Category, CreateMarketRequest, Side};
    use crate::store::{Entity, MemoryStore};
    use chrono::Duration;
    use std::sync::Arc;

    fn engine() -> LedgerEngine {
        LedgerEngine::new(Arc::new(MemoryStore::new()))
    }

    fn open_market(engine: &LedgerEngine, creator: &str) -> String {
        let now = Utc::now();
        engine
            .create_market(CreateMarketRequest {
                creator_id: creator.to_string(),
                category: Category::Politics,
                question: "Will the bill pass this session?".to_string(),
                description: String::new(),
                start_at: now - Duration::hours(1),
                end_at: now + Duration::hours(1),
            })
            .unwrap()
            .id
    }

    /// Rewind the trading window so the market reads as closed
    fn close_market(engine: &LedgerEngine, market_id: &str) {
        let key = EntityKey::Market(market_id.to_string());
        let read = engine.store().read_many(std::slice::from_ref(&key)).unwrap();
        let mut market = match read[0].entity.clone() {
            Some(Entity::Market(m)) => m,
            _ => panic!("expected market"),
        };
        market.end_at = Utc::now() - Duration::seconds(1);
        engine
            .store()
            .commit(&[(key, read[0].version)], &[Entity::Market(market)])
            .unwrap();
    }

    fn buy(user: &str, side: Side, quantity: u64) -> BuyRequest {
        BuyRequest {
            user_id: user.to_string(),
            side,
            quantity,
        }
    }

    fn resolve(user: &str, side: Side) -> ResolveRequest {
        ResolveRequest {
            user_id: user.to_string(),
            winning_side: side,
        }
    }

    #[test]
    fn test_resolve_then_claim_pays_per_contract() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine.connect("bob").unwrap();
        let market_id = open_market(&engine, "alice");

        // 4 YES at the even-odds price of 50
        engine.buy(&market_id, buy("bob", Side::Yes, 4)).unwrap();
        close_market(&engine, &market_id);

        let market = engine.resolve(&market_id, resolve("alice", Side::Yes)).unwrap();
        assert!(market.resolved);
        assert_eq!(market.winning_side, Some(Side::Yes));
        assert!(market.resolved_at.is_some());

        let receipt = engine.claim(&market_id, "bob").unwrap();
        assert_eq!(receipt.winning_holdings, 4);
        assert_eq!(receipt.payout, 400);
        assert_eq!(receipt.new_balance, STARTING_BALANCE - 200 + 400);

        let account = engine.account("bob").unwrap();
        assert_eq!(account.balance, STARTING_BALANCE + 200);
        assert!(engine.market(&market_id).unwrap().has_claimed("bob"));
    }

    #[test]
    fn test_claim_is_exactly_once() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine.connect("bob").unwrap();
        let market_id = open_market(&engine, "alice");

        engine.buy(&market_id, buy("bob", Side::Yes, 2)).unwrap();
        close_market(&engine, &market_id);
        engine.resolve(&market_id, resolve("alice", Side::Yes)).unwrap();

        engine.claim(&market_id, "bob").unwrap();
        let balance_after_first = engine.account("bob").unwrap().balance;

        let result = engine.claim(&market_id, "bob");
        assert!(matches!(result, Err(LedgerError::AlreadyClaimed(_))));
        assert_eq!(engine.account("bob").unwrap().balance, balance_after_first);

        // The claim register holds one entry, not two
        let market = engine.market(&market_id).unwrap();
        assert_eq!(market.claimed_by.iter().filter(|u| *u == "bob").count(), 1);
    }

    #[test]
    fn test_losing_side_has_nothing_to_claim() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine.connect("bob").unwrap();
        engine.connect("carol").unwrap();
        let market_id = open_market(&engine, "alice");

        engine.buy(&market_id, buy("bob", Side::Yes, 1)).unwrap();
        engine.buy(&market_id, buy("carol", Side::No, 1)).unwrap();
        close_market(&engine, &market_id);
        engine.resolve(&market_id, resolve("alice", Side::Yes)).unwrap();

        let before = engine.account("carol").unwrap().balance;
        let result = engine.claim(&market_id, "carol");
        assert!(matches!(result, Err(LedgerError::NothingToClaim(_))));

        // A failed claim leaves no trace
        assert_eq!(engine.account("carol").unwrap().balance, before);
        assert!(!engine.market(&market_id).unwrap().has_claimed("carol"));
    }

    #[test]
    fn test_claim_requires_resolution() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine.connect("bob").unwrap();
        let market_id = open_market(&engine, "alice");

        engine.buy(&market_id, buy("bob", Side::Yes, 1)).unwrap();
        close_market(&engine, &market_id);

        let result = engine.claim(&market_id, "bob");
        assert!(matches!(result, Err(LedgerError::NotResolved(_))));
    }

    #[test]
    fn test_only_creator_resolves() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine.connect("bob").unwrap();
        let market_id = open_market(&engine, "alice");
        close_market(&engine, &market_id);

        let result = engine.resolve(&market_id, resolve("bob", Side::No));
        assert!(matches!(result, Err(LedgerError::NotCreator(_))));
        assert!(!engine.market(&market_id).unwrap().resolved);
    }

    #[test]
    fn test_resolve_requires_closed_window() {
        let engine = engine();
        engine.connect("alice").unwrap();
        let market_id = open_market(&engine, "alice");

        let result = engine.resolve(&market_id, resolve("alice", Side::Yes));
        assert!(matches!(result, Err(LedgerError::MarketStillOpen(_))));
    }

    #[test]
    fn test_resolve_is_one_shot() {
        let engine = engine();
        engine.connect("alice").unwrap();
        let market_id = open_market(&engine, "alice");
        close_market(&engine, &market_id);

        engine.resolve(&market_id, resolve("alice", Side::Yes)).unwrap();
        let result = engine.resolve(&market_id, resolve("alice", Side::No));
        assert!(matches!(result, Err(LedgerError::AlreadyResolved(_))));

        // The first outcome stands
        let market = engine.market(&market_id).unwrap();
        assert_eq!(market.winning_side, Some(Side::Yes));
    }

    #[test]
    fn test_positions_report_claimable_payout() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine.connect("bob").unwrap();
        let market_id = open_market(&engine, "alice");

        engine.buy(&market_id, buy("bob", Side::Yes, 3)).unwrap();
        close_market(&engine, &market_id);
        engine.resolve(&market_id, resolve("alice", Side::Yes)).unwrap();

        let positions = engine.positions("bob").unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].claimable, 300);
        assert!(!positions[0].claimed);

        engine.claim(&market_id, "bob").unwrap();
        let positions = engine.positions("bob").unwrap();
        assert_eq!(positions[0].claimable, 0);
        assert!(positions[0].claimed);
    }
}

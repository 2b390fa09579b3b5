// Account lifecycle: connect bootstrap, profile edits, portfolio views

use chrono::Utc;

use super::{LedgerEngine, PAYOUT_PER_CONTRACT, STARTING_BALANCE};
use crate::error::LedgerError;
use crate::models::{Account, PositionView, UpdateProfileRequest};
use crate::store::{Entity, EntityKey};

impl LedgerEngine {
    /// Idempotent login bootstrap. The first connect funds the account with
    /// the starting balance; every later connect returns it unchanged.
    pub fn connect(&self, user_id: &str) -> Result<Account, LedgerError> {
        let user_id = user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(LedgerError::Validation(
                "userId must not be empty".to_string(),
            ));
        }

        let keys = [EntityKey::Account(user_id.clone())];
        self.transact(&keys, |snap| {
            if let Some(existing) = snap.account_opt(&user_id) {
                return Ok(existing);
            }
            let account = Account::new(&user_id, STARTING_BALANCE, Utc::now());
            tracing::info!(
                "Account {} created with {} tokens",
                account.user_id,
                account.balance
            );
            snap.put_account(account.clone());
            Ok(account)
        })
    }

    pub fn account(&self, user_id: &str) -> Result<Account, LedgerError> {
        match self.store().get(&EntityKey::Account(user_id.to_string()))? {
            Some(Entity::Account(a)) => Ok(a),
            _ => Err(LedgerError::AccountNotFound(user_id.to_string())),
        }
    }

    /// Replace the display name and, when supplied, bio and photo. Omitted
    /// fields keep their stored value.
    pub fn update_profile(
        &self,
        user_id: &str,
        req: UpdateProfileRequest,
    ) -> Result<Account, LedgerError> {
        let display_name = req.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(LedgerError::Validation(
                "displayName must not be empty".to_string(),
            ));
        }

        let keys = [EntityKey::Account(user_id.to_string())];
        self.transact(&keys, |snap| {
            let mut account = snap.account(user_id)?;
            account.display_name = display_name.clone();
            if let Some(bio) = &req.bio {
                account.bio = bio.clone();
            }
            if let Some(photo_url) = &req.photo_url {
                account.photo_url = photo_url.clone();
            }
            snap.put_account(account.clone());
            Ok(account)
        })
    }

    /// Portfolio summary across every market the user holds a position in,
    /// newest market first.
    pub fn positions(&self, user_id: &str) -> Result<Vec<PositionView>, LedgerError> {
        let account = self.account(user_id)?;
        let now = Utc::now();

        let mut rows = Vec::with_capacity(account.portfolio.len());
        for (market_id, position) in &account.portfolio {
            let market = match self.store().get(&EntityKey::Market(market_id.clone()))? {
                Some(Entity::Market(m)) => m,
                _ => continue,
            };

            let claimed = market.has_claimed(user_id);
            let claimable = match market.winning_side {
                Some(side) if market.resolved && !claimed => position
                    .side(side)
                    .amount
                    .saturating_mul(PAYOUT_PER_CONTRACT),
                _ => 0,
            };

            let view = PositionView {
                market_id: market_id.clone(),
                question: market.question.clone(),
                phase: market.phase(now),
                resolved: market.resolved,
                winning_side: market.winning_side,
                yes: position.yes,
                no: position.no,
                claimed,
                claimable,
            };
            rows.push((market.created_at, view));
        }

        rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.market_id.cmp(&b.1.market_id)));
        Ok(rows.into_iter().map(|(_, view)| view).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn engine() -> LedgerEngine {
        LedgerEngine::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_connect_funds_new_account() {
        let engine = engine();
        let account = engine.connect("user-abc-123").unwrap();

        assert_eq!(account.balance, STARTING_BALANCE);
        assert_eq!(account.display_name, "Trader-user-a");
        assert!(account.portfolio.is_empty());
    }

    #[test]
    fn test_connect_is_idempotent() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine
            .update_profile(
                "alice",
                UpdateProfileRequest {
                    display_name: "Alice".to_string(),
                    bio: Some("trader".to_string()),
                    photo_url: None,
                },
            )
            .unwrap();

        let again = engine.connect("alice").unwrap();
        assert_eq!(again.display_name, "Alice");
        assert_eq!(again.bio, "trader");
        assert_eq!(again.balance, STARTING_BALANCE);
    }

    #[test]
    fn test_connect_rejects_blank_id() {
        let engine = engine();
        assert!(engine.connect("   ").is_err());
    }

    #[test]
    fn test_update_profile_keeps_omitted_fields() {
        let engine = engine();
        engine.connect("alice").unwrap();
        engine
            .update_profile(
                "alice",
                UpdateProfileRequest {
                    display_name: "Alice".to_string(),
                    bio: Some("macro desk".to_string()),
                    photo_url: Some("https://example.com/a.png".to_string()),
                },
            )
            .unwrap();

        // Only the name this time; bio and photo stay
        let account = engine
            .update_profile(
                "alice",
                UpdateProfileRequest {
                    display_name: "Alice B".to_string(),
                    bio: None,
                    photo_url: None,
                },
            )
            .unwrap();

        assert_eq!(account.display_name, "Alice B");
        assert_eq!(account.bio, "macro desk");
        assert_eq!(account.photo_url, "https://example.com/a.png");
    }

    #[test]
    fn test_update_profile_unknown_account() {
        let engine = engine();
        let result = engine.update_profile(
            "ghost",
            UpdateProfileRequest {
                display_name: "Ghost".to_string(),
                bio: None,
                photo_url: None,
            },
        );
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }
}

// Market creation and listing

use chrono::{DateTime, Utc};

use super::LedgerEngine;
use crate::error::LedgerError;
use crate::models::{Category, CreateMarketRequest, Market, MarketPhase, MarketView};
use crate::pricing;
use crate::store::{Entity, EntityKey, EntityKind};

impl LedgerEngine {
    /// Open a new binary market. The creator must already have an account;
    /// their display name at creation time is snapshotted onto the market.
    pub fn create_market(&self, req: CreateMarketRequest) -> Result<Market, LedgerError> {
        let question = req.question.trim().to_string();
        if question.is_empty() {
            return Err(LedgerError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        if req.end_at <= req.start_at {
            return Err(LedgerError::Validation(
                "endAt must be after startAt".to_string(),
            ));
        }

        let market_id = uuid::Uuid::new_v4().simple().to_string();
        let keys = [
            EntityKey::Account(req.creator_id.clone()),
            EntityKey::Market(market_id.clone()),
        ];
        self.transact(&keys, |snap| {
            let creator = snap.account(&req.creator_id)?;
            let market = Market {
                id: market_id.clone(),
                category: req.category,
                question: question.clone(),
                description: req.description.trim().to_string(),
                creator_id: creator.user_id.clone(),
                creator_name: creator.display_name.clone(),
                start_at: Some(req.start_at),
                end_at: req.end_at,
                yes_count: 0,
                no_count: 0,
                resolved: false,
                winning_side: None,
                claimed_by: Vec::new(),
                created_at: Utc::now(),
                resolved_at: None,
            };
            tracing::info!("Market {} created: {}", market.id, market.question);
            snap.put_market(market.clone());
            Ok(market)
        })
    }

    pub fn market(&self, id: &str) -> Result<Market, LedgerError> {
        match self.store().get(&EntityKey::Market(id.to_string()))? {
            Some(Entity::Market(m)) => Ok(m),
            _ => Err(LedgerError::MarketNotFound(id.to_string())),
        }
    }

    /// Market with its derived phase, quote and volume
    pub fn market_view(&self, id: &str) -> Result<MarketView, LedgerError> {
        Ok(Self::view_at(self.market(id)?, Utc::now()))
    }

    /// All markets, optionally narrowed to one category. Ongoing markets
    /// come first (closest close first), then scheduled ones (soonest open
    /// first), then closed ones (most recently closed first).
    pub fn list_markets(&self, category: Option<Category>) -> Result<Vec<MarketView>, LedgerError> {
        let now = Utc::now();

        let mut ongoing = Vec::new();
        let mut scheduled = Vec::new();
        let mut closed = Vec::new();
        for entity in self.store().list(EntityKind::Market)? {
            if let Entity::Market(market) = entity {
                if category.is_some_and(|c| market.category != c) {
                    continue;
                }
                match market.phase(now) {
                    MarketPhase::Ongoing => ongoing.push(market),
                    MarketPhase::Scheduled => scheduled.push(market),
                    MarketPhase::Closed => closed.push(market),
                }
            }
        }

        ongoing.sort_by(|a, b| a.end_at.cmp(&b.end_at).then_with(|| a.id.cmp(&b.id)));
        scheduled.sort_by(|a, b| {
            let a_start = a.start_at.unwrap_or(a.created_at);
            let b_start = b.start_at.unwrap_or(b.created_at);
            a_start.cmp(&b_start).then_with(|| a.id.cmp(&b.id))
        });
        closed.sort_by(|a, b| b.end_at.cmp(&a.end_at).then_with(|| a.id.cmp(&b.id)));

        Ok(ongoing
            .into_iter()
            .chain(scheduled)
            .chain(closed)
            .map(|market| Self::view_at(market, now))
            .collect())
    }

    fn view_at(market: Market, now: DateTime<Utc>) -> MarketView {
        let quote = pricing::quote(market.yes_count, market.no_count);
        let total_contracts = market.total_contracts();
        let phase = market.phase(now);
        MarketView {
            market,
            phase,
            quote,
            total_contracts,
        }
    }
}

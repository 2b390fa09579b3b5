// Data models for the STACKING prediction market ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pricing::Quote;

// ============================================================================
// ENUMS
// ============================================================================

/// Outcome side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Yes => write!(f, "Yes"),
            Side::No => write!(f, "No"),
        }
    }
}

/// Which side of the argument a comment takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Pro,
    Con,
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stance::Pro => write!(f, "Pro"),
            Stance::Con => write!(f, "Con"),
        }
    }
}

/// Market category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Economy,
    PreIPO,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Politics => write!(f, "Politics"),
            Category::Economy => write!(f, "Economy"),
            Category::PreIPO => write!(f, "PreIPO"),
        }
    }
}

/// Market lifecycle phase, derived from timestamps and the resolved flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketPhase {
    Scheduled,
    Ongoing,
    Closed,
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A binary prediction market
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Unique market identifier
    pub id: String,

    /// Market category
    pub category: Category,

    /// The question being predicted
    pub question: String,

    /// Longer free-form description
    #[serde(default)]
    pub description: String,

    /// User who created the market and holds resolution rights
    pub creator_id: String,

    /// Creator display name at creation time
    pub creator_name: String,

    /// When trading opens; legacy rows without it fall back to creation time
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,

    /// When trading closes
    pub end_at: DateTime<Utc>,

    /// Total YES contracts ever bought (never decreases)
    #[serde(default)]
    pub yes_count: u64,

    /// Total NO contracts ever bought (never decreases)
    #[serde(default)]
    pub no_count: u64,

    /// Set once by the creator, never cleared
    #[serde(default)]
    pub resolved: bool,

    /// Winning side, present exactly when resolved
    #[serde(default)]
    pub winning_side: Option<Side>,

    /// Users who already collected their winnings
    #[serde(default)]
    pub claimed_by: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Resolution timestamp, if resolved
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Market {
    /// Phase at the given instant. Markets missing an explicit start
    /// timestamp treat their creation time as the start.
    pub fn phase(&self, now: DateTime<Utc>) -> MarketPhase {
        if now >= self.end_at || self.resolved {
            return MarketPhase::Closed;
        }
        let start = self.start_at.unwrap_or(self.created_at);
        if now < start {
            MarketPhase::Scheduled
        } else {
            MarketPhase::Ongoing
        }
    }

    pub fn total_contracts(&self) -> u64 {
        self.yes_count + self.no_count
    }

    pub fn side_count(&self, side: Side) -> u64 {
        match side {
            Side::Yes => self.yes_count,
            Side::No => self.no_count,
        }
    }

    pub fn has_claimed(&self, user_id: &str) -> bool {
        self.claimed_by.iter().any(|u| u == user_id)
    }
}

/// Holdings on one side of one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideHolding {
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub cost: u64,
}

/// Both sides of a user's position in one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPosition {
    #[serde(rename = "Yes", default)]
    pub yes: SideHolding,

    #[serde(rename = "No", default)]
    pub no: SideHolding,
}

impl MarketPosition {
    pub fn side(&self, side: Side) -> SideHolding {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideHolding {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }
}

/// A user's ledger account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Opaque identifier supplied by the identity layer
    pub user_id: String,

    /// Public display name
    pub display_name: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub photo_url: String,

    /// Spendable token balance, never negative
    pub balance: u64,

    /// Per-market share positions
    #[serde(default)]
    pub portfolio: HashMap<String, MarketPosition>,

    /// Comments this user paid to reveal
    #[serde(default)]
    pub unlocked_comments: Vec<String>,

    /// First-connect timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account funded with the starting balance. The default display
    /// name is derived from the id prefix, as shown in the client.
    pub fn new(user_id: &str, starting_balance: u64, now: DateTime<Utc>) -> Self {
        let prefix: String = user_id.chars().take(6).collect();
        Self {
            user_id: user_id.to_string(),
            display_name: format!("Trader-{}", prefix),
            bio: String::new(),
            photo_url: String::new(),
            balance: starting_balance,
            portfolio: HashMap::new(),
            unlocked_comments: Vec::new(),
            created_at: now,
        }
    }

    pub fn position(&self, market_id: &str) -> MarketPosition {
        self.portfolio.get(market_id).copied().unwrap_or_default()
    }

    pub fn has_unlocked(&self, comment_id: &str) -> bool {
        self.unlocked_comments.iter().any(|c| c == comment_id)
    }
}

/// A discussion comment attached to a market
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,

    pub market_id: String,

    pub author_id: String,

    /// Author display name at post time
    pub author_name: String,

    #[serde(default)]
    pub photo_url: String,

    /// Full comment text; visibility gating happens at view time only
    pub text: String,

    pub side: Stance,

    /// Users who currently like this comment, never includes the author
    #[serde(default)]
    pub liked_by: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }

    pub fn liked_by_user(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|u| u == user_id)
    }
}

// ============================================================================
// REQUEST BODIES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: String,
    /// Omitted fields keep their stored value
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketRequest {
    pub creator_id: String,
    pub category: Category,
    pub question: String,
    #[serde(default)]
    pub description: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub user_id: String,
    pub side: Side,
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub user_id: String,
    pub winning_side: Side,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentRequest {
    pub user_id: String,
    pub side: Stance,
    pub text: String,
}

/// Body for claim, like and unlock: just the acting user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionRequest {
    pub user_id: String,
}

// ============================================================================
// VIEWS & RECEIPTS
// ============================================================================

/// Market plus everything the client derives from it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketView {
    #[serde(flatten)]
    pub market: Market,
    pub phase: MarketPhase,
    #[serde(flatten)]
    pub quote: Quote,
    pub total_contracts: u64,
}

/// Comment as one specific viewer sees it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub market_id: String,
    pub author_id: String,
    pub author_name: String,
    pub photo_url: String,
    /// Full text, or the blur placeholder when hidden for this viewer
    pub text: String,
    pub side: Stance,
    pub like_count: usize,
    pub liked_by_viewer: bool,
    /// Like count reached the blur threshold
    pub blurred: bool,
    /// Blurred and this viewer has no access (not author, not unlocked)
    pub hidden: bool,
    pub unlocked_by_viewer: bool,
    pub created_at: DateTime<Utc>,
}

/// One row of a user's portfolio summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub market_id: String,
    pub question: String,
    pub phase: MarketPhase,
    pub resolved: bool,
    pub winning_side: Option<Side>,
    pub yes: SideHolding,
    pub no: SideHolding,
    pub claimed: bool,
    /// Payout still collectable on this market (0 unless resolved, unclaimed
    /// and holding the winning side)
    pub claimable: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub market_id: String,
    pub user_id: String,
    pub side: Side,
    pub quantity: u64,
    pub unit_price: u64,
    pub total_cost: u64,
    pub new_balance: u64,
    pub position: MarketPosition,
    /// Quote after this trade was applied
    pub quote: Quote,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub market_id: String,
    pub user_id: String,
    pub winning_side: Side,
    pub winning_holdings: u64,
    pub payout: u64,
    pub new_balance: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeReceipt {
    pub comment_id: String,
    /// Whether the caller likes the comment after this toggle
    pub liked: bool,
    pub like_count: usize,
    /// False only when an unlike skipped the reversal to keep the author
    /// balance non-negative
    pub reward_transferred: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockReceipt {
    pub comment_id: String,
    pub cost: u64,
    pub new_balance: u64,
}

// ============================================================================
// TESTS
// ============================================================================

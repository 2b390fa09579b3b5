/// STACKING Prediction Market Ledger
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod store;

pub use app_state::{AppState, SharedState};
pub use config::{Config, StoreBackend};
pub use engine::comments::BLUR_PLACEHOLDER;
pub use engine::{
    ChangeEvent, LedgerEngine, BLUR_THRESHOLD, LIKE_REWARD, PAYOUT_PER_CONTRACT, STARTING_BALANCE,
    UNLOCK_COST,
};
pub use error::{ErrorKind, LedgerError};
pub use handlers::build_router;
pub use models::{
    Account, BuyRequest, Category, ClaimReceipt, Comment, CommentView, ConnectRequest,
    CreateMarketRequest, LikeReceipt, Market, MarketPhase, MarketPosition, MarketView,
    PositionView, PostCommentRequest, ResolveRequest, Side, SideHolding, Stance, TradeReceipt,
    UnlockReceipt, UpdateProfileRequest, UserActionRequest,
};
pub use pricing::{quote, unit_price, Quote};
pub use store::{Entity, EntityKey, EntityKind, EntityStore, MemoryStore, SledStore, StoreError};

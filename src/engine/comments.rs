// Market discussion: comments, like rewards, paid unlocks, blur gating

use chrono::Utc;

use super::{LedgerEngine, BLUR_THRESHOLD, LIKE_REWARD, UNLOCK_COST};
use crate::error::LedgerError;
use crate::models::{Account, Comment, CommentView, LikeReceipt, PostCommentRequest, UnlockReceipt};
use crate::store::{Entity, EntityKey, EntityKind};

/// Shown in place of the text of a blurred comment the viewer has no
/// access to
pub const BLUR_PLACEHOLDER: &str = "*********** This comment has been blurred. ***********";

impl LedgerEngine {
    /// Attach a comment to a market. The author's display name and photo
    /// are snapshotted at post time.
    pub fn post_comment(
        &self,
        market_id: &str,
        req: PostCommentRequest,
    ) -> Result<Comment, LedgerError> {
        let text = req.text.trim().to_string();
        if text.is_empty() {
            return Err(LedgerError::Validation(
                "text must not be empty".to_string(),
            ));
        }

        let comment_id = format!("cmt_{}", uuid::Uuid::new_v4().simple());
        let keys = [
            EntityKey::Market(market_id.to_string()),
            EntityKey::Account(req.user_id.clone()),
            EntityKey::Comment(comment_id.clone()),
        ];
        self.transact(&keys, |snap| {
            snap.market(market_id)?;
            let author = snap.account(&req.user_id)?;

            let comment = Comment {
                id: comment_id.clone(),
                market_id: market_id.to_string(),
                author_id: author.user_id.clone(),
                author_name: author.display_name.clone(),
                photo_url: author.photo_url.clone(),
                text: text.clone(),
                side: req.side,
                liked_by: Vec::new(),
                created_at: Utc::now(),
            };
            snap.put_comment(comment.clone());
            Ok(comment)
        })
    }

    pub fn comment(&self, id: &str) -> Result<Comment, LedgerError> {
        match self.store().get(&EntityKey::Comment(id.to_string()))? {
            Some(Entity::Comment(c)) => Ok(c),
            _ => Err(LedgerError::CommentNotFound(id.to_string())),
        }
    }

    /// Flip the caller's like on a comment.
    ///
    /// A like pays the author the reward; removing it claws the reward
    /// back unless that would push the author's balance negative, in which
    /// case the like is still removed and the debit is skipped. The
    /// direction of the toggle is decided from the membership this
    /// transaction reads, so repeating a delivery can never double-count.
    pub fn toggle_like(&self, comment_id: &str, user_id: &str) -> Result<LikeReceipt, LedgerError> {
        // The author of a comment never changes, so it is safe to learn it
        // outside the transaction.
        let comment = self.comment(comment_id)?;
        if comment.author_id == user_id {
            return Err(LedgerError::SelfLike(
                "authors cannot like their own comments".to_string(),
            ));
        }
        self.account(user_id)?;
        let author_id = comment.author_id;

        let keys = [
            EntityKey::Comment(comment_id.to_string()),
            EntityKey::Account(author_id.clone()),
        ];
        self.transact(&keys, |snap| {
            let mut comment = snap.comment(comment_id)?;
            let mut author = snap.account(&author_id)?;

            let (liked, reward_transferred) = if comment.liked_by_user(user_id) {
                comment.liked_by.retain(|u| u != user_id);
                if author.balance >= LIKE_REWARD {
                    author.balance -= LIKE_REWARD;
                    (false, true)
                } else {
                    (false, false)
                }
            } else {
                comment.liked_by.push(user_id.to_string());
                author.balance = author.balance.checked_add(LIKE_REWARD).ok_or_else(|| {
                    LedgerError::Validation("balance overflow".to_string())
                })?;
                (true, true)
            };

            tracing::info!(
                "Comment {} {} by {}",
                comment.id,
                if liked { "liked" } else { "unliked" },
                user_id
            );

            let receipt = LikeReceipt {
                comment_id: comment.id.clone(),
                liked,
                like_count: comment.like_count(),
                reward_transferred,
            };
            snap.put_comment(comment);
            snap.put_account(author);
            Ok(receipt)
        })
    }

    /// Pay the author to permanently reveal a blurred comment for the
    /// caller. One purchase per comment per user.
    pub fn unlock_comment(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> Result<UnlockReceipt, LedgerError> {
        let comment = self.comment(comment_id)?;
        if comment.author_id == user_id {
            return Err(LedgerError::SelfUnlock(
                "authors always see their own comments".to_string(),
            ));
        }
        let author_id = comment.author_id;

        let keys = [
            EntityKey::Account(user_id.to_string()),
            EntityKey::Account(author_id.clone()),
        ];
        self.transact(&keys, |snap| {
            let mut viewer = snap.account(user_id)?;
            let mut author = snap.account(&author_id)?;

            if viewer.has_unlocked(comment_id) {
                return Err(LedgerError::AlreadyUnlocked(format!(
                    "{} already unlocked {}",
                    user_id, comment_id
                )));
            }
            if viewer.balance < UNLOCK_COST {
                return Err(LedgerError::InsufficientBalance(format!(
                    "unlock costs {} but {} holds {}",
                    UNLOCK_COST, user_id, viewer.balance
                )));
            }

            viewer.balance -= UNLOCK_COST;
            author.balance = author.balance.checked_add(UNLOCK_COST).ok_or_else(|| {
                LedgerError::Validation("balance overflow".to_string())
            })?;
            viewer.unlocked_comments.push(comment_id.to_string());

            tracing::info!("Comment {} unlocked by {}", comment_id, user_id);

            let receipt = UnlockReceipt {
                comment_id: comment_id.to_string(),
                cost: UNLOCK_COST,
                new_balance: viewer.balance,
            };
            snap.put_account(viewer);
            snap.put_account(author);
            Ok(receipt)
        })
    }

    /// Comments on one market as `viewer` sees them, most liked first and
    /// newest first among ties.
    pub fn comments_for_market(
        &self,
        market_id: &str,
        viewer: Option<&str>,
    ) -> Result<Vec<CommentView>, LedgerError> {
        self.market(market_id)?;
        let viewer_account = self.viewer_account(viewer)?;

        let mut comments = self.all_comments()?;
        comments.retain(|c| c.market_id == market_id);
        comments.sort_by(|a, b| {
            b.like_count()
                .cmp(&a.like_count())
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(comments
            .into_iter()
            .map(|c| Self::comment_view(c, viewer_account.as_ref()))
            .collect())
    }

    /// Comments one user wrote, across all markets, newest first
    pub fn comments_by_author(
        &self,
        author_id: &str,
        viewer: Option<&str>,
    ) -> Result<Vec<CommentView>, LedgerError> {
        self.account(author_id)?;
        let viewer_account = self.viewer_account(viewer)?;

        let mut comments = self.all_comments()?;
        comments.retain(|c| c.author_id == author_id);
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(comments
            .into_iter()
            .map(|c| Self::comment_view(c, viewer_account.as_ref()))
            .collect())
    }

    fn all_comments(&self) -> Result<Vec<Comment>, LedgerError> {
        let mut comments = Vec::new();
        for entity in self.store().list(EntityKind::Comment)? {
            if let Entity::Comment(c) = entity {
                comments.push(c);
            }
        }
        Ok(comments)
    }

    /// Unknown viewer ids browse anonymously rather than failing the read
    fn viewer_account(&self, viewer: Option<&str>) -> Result<Option<Account>, LedgerError> {
        let Some(user_id) = viewer else {
            return Ok(None);
        };
        match self.store().get(&EntityKey::Account(user_id.to_string()))? {
            Some(Entity::Account(a)) => Ok(Some(a)),
            _ => Ok(None),
        }
    }

    fn comment_view(comment: Comment, viewer: Option<&Account>) -> CommentView {
        let like_count = comment.like_count();
        let blurred = like_count >= BLUR_THRESHOLD;
        let viewer_id = viewer.map(|a| a.user_id.as_str());
        let is_author = viewer_id == Some(comment.author_id.as_str());
        let unlocked_by_viewer = viewer.map(|a| a.has_unlocked(&comment.id)).unwrap_or(false);
        let hidden = blurred && !is_author && !unlocked_by_viewer;
        let liked_by_viewer = viewer_id
            .map(|id| comment.liked_by_user(id))
            .unwrap_or(false);
        let text = if hidden {
            BLUR_PLACEHOLDER.to_string()
        } else {
            comment.text
        };

        CommentView {
            id: comment.id,
            market_id: comment.market_id,
            author_id: comment.author_id,
            author_name: comment.author_name,
            photo_url: comment.photo_url,
            text,
            side: comment.side,
            like_count,
            liked_by_viewer,
            blurred,
            hidden,
            unlocked_by_viewer,
            created_at: comment.created_at,
        }
    }
}

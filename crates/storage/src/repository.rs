use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{Item, ItemId, Review, ReviewDraft, ReviewFields, ReviewId};
use tracing::warn;

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn find_active_item(&self, id: &ItemId) -> Result<Option<Item>>;

    /// Looks the item up whether or not it has been soft-deleted.
    async fn find_item(&self, id: &ItemId) -> Result<Option<Item>>;

    /// Adds `delta` to the review counter in a single store-side operation.
    /// Returns `None` when no active item has this id.
    async fn increment_review_count(&self, id: &ItemId, delta: i64) -> Result<Option<Item>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_active_review(&self, id: &ReviewId) -> Result<Option<Review>>;
    async fn list_active_reviews(&self, item_id: &ItemId) -> Result<Vec<Review>>;
    async fn create_review(&self, draft: &ReviewDraft) -> Result<Review>;
    async fn update_review_fields(
        &self,
        id: &ReviewId,
        fields: &ReviewFields,
    ) -> Result<Option<Review>>;
    /// Returns false when the review was already deleted or never existed.
    async fn mark_review_deleted(&self, id: &ReviewId) -> Result<bool>;
}

/// Review mutations that also move the owning item's counter.
///
/// The default methods sequence the two steps and undo the first when the second fails.
/// Stores with transactions should override both.
#[async_trait]
pub trait ReviewLedger: ItemStore + ReviewStore {
    /// Persists the review and counts it. `None` when the item is not active.
    async fn record_review(&self, draft: &ReviewDraft) -> Result<Option<(Item, Review)>> {
        let review = self.create_review(draft).await?;
        let counted = self.increment_review_count(&draft.item_id, 1).await;
        match counted {
            Ok(Some(item)) => Ok(Some((item, review))),
            Ok(None) => {
                self.mark_review_deleted(&review.id).await?;
                Ok(None)
            }
            Err(error) => {
                warn!(
                    review_id = %review.id,
                    item_id = %draft.item_id,
                    %error,
                    "review count increment failed; retracting review"
                );
                if let Err(undo) = self.mark_review_deleted(&review.id).await {
                    return Err(error.context(format!(
                        "retracting review {} also failed: {undo}",
                        review.id
                    )));
                }
                Err(error)
            }
        }
    }

    /// Soft-deletes the review and uncounts it. `None` when either side is not active.
    async fn retire_review(&self, item_id: &ItemId, review_id: &ReviewId) -> Result<Option<Item>> {
        match self.find_active_review(review_id).await? {
            Some(review) if review.item_id == *item_id => {}
            _ => return Ok(None),
        }
        let Some(item) = self.increment_review_count(item_id, -1).await? else {
            return Ok(None);
        };
        let marked = self.mark_review_deleted(review_id).await;
        if let Ok(true) = marked {
            return Ok(Some(item));
        }

        warn!(%item_id, %review_id, "review delete did not apply; restoring review count");
        let restored = self.increment_review_count(item_id, 1).await;
        match (marked, restored) {
            (Ok(_), Ok(_)) => Ok(None),
            (Ok(_), Err(undo)) => Err(undo.context(format!(
                "restoring review count of item {item_id} failed"
            ))),
            (Err(error), Ok(_)) => Err(error),
            (Err(error), Err(undo)) => Err(error.context(format!(
                "restoring review count of item {item_id} also failed: {undo}"
            ))),
        }
    }
}

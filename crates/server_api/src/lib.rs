use std::sync::Arc;

use shared::{
    domain::{Item, ItemId, ItemWithReview, Review, ReviewDraft, ReviewId},
    error::{ApiError, ErrorCode},
    protocol::ReviewPayload,
};
use storage::ReviewLedger;
use tracing::{debug, error, info};

mod clock;
mod fields;

pub use clock::{Clock, FixedClock, SystemClock};

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn ReviewLedger>,
    pub clock: Arc<dyn Clock>,
    pub policy: ReviewPolicy,
}

impl ApiContext {
    pub fn new(store: Arc<dyn ReviewLedger>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            policy: ReviewPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewPolicy {
    /// An update without `reviewedBy` rewrites the reviewer to the guest name.
    pub guest_reviewer_on_update: bool,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            guest_reviewer_on_update: true,
        }
    }
}

pub async fn create_review(
    ctx: &ApiContext,
    item_id: &str,
    payload: ReviewPayload,
) -> Result<ItemWithReview, ApiError> {
    let item = ensure_active_item(ctx, item_id).await?;

    let reviewed_by = fields::reviewer_or_guest(payload.reviewed_by.as_ref())?;
    let reviewed_at = ctx.clock.now();
    let rating = fields::required_rating(payload.rating.as_ref())?;
    let text = fields::optional_text(payload.text.as_ref())?;
    if !payload.unsupported.is_empty() {
        debug!(keys = ?payload.unsupported_keys(), "ignoring client supplied review keys");
    }

    let draft = ReviewDraft {
        item_id: item.id,
        reviewed_by,
        text,
        rating,
        reviewed_at,
    };
    let Some((item, review)) = ctx.store.record_review(&draft).await.map_err(internal)? else {
        return Err(item_not_found(&draft.item_id));
    };

    info!(
        item_id = %item.id,
        review_id = %review.id,
        review_count = item.review_count,
        "review created"
    );
    Ok(ItemWithReview { item, review })
}

pub async fn update_review(
    ctx: &ApiContext,
    item_id: &str,
    review_id: &str,
    payload: ReviewPayload,
) -> Result<ItemWithReview, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::new(
            ErrorCode::EmptyBody,
            "request body must not be empty",
        ));
    }
    let item = ensure_active_item(ctx, item_id).await?;
    let review = ensure_active_review(ctx, &item, review_id).await?;
    let fields = fields::update_fields(&payload, ctx.policy.guest_reviewer_on_update)?;

    let review = ctx
        .store
        .update_review_fields(&review.id, &fields)
        .await
        .map_err(internal)?
        .ok_or_else(|| review_not_found(&review.id))?;
    // The review is already written; report the item as stored even if it was deleted since.
    let item = ctx
        .store
        .find_item(&item.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| item_not_found(&item.id))?;

    info!(item_id = %item.id, review_id = %review.id, "review updated");
    Ok(ItemWithReview { item, review })
}

pub async fn delete_review(
    ctx: &ApiContext,
    item_id: &str,
    review_id: &str,
) -> Result<(), ApiError> {
    let item = ensure_active_item(ctx, item_id).await?;
    let review = ensure_active_review(ctx, &item, review_id).await?;

    let Some(item) = ctx
        .store
        .retire_review(&item.id, &review.id)
        .await
        .map_err(internal)?
    else {
        // Either side may have gone between the guards and the write.
        let still_active = ctx
            .store
            .find_active_item(&item.id)
            .await
            .map_err(internal)?;
        return Err(match still_active {
            Some(_) => review_not_found(&review.id),
            None => item_not_found(&item.id),
        });
    };

    info!(
        item_id = %item.id,
        review_id = %review.id,
        review_count = item.review_count,
        "review deleted"
    );
    Ok(())
}

async fn ensure_active_item(ctx: &ApiContext, raw_id: &str) -> Result<Item, ApiError> {
    let id = ItemId::parse(raw_id).ok_or_else(|| {
        ApiError::for_field(
            ErrorCode::InvalidReference,
            "itemId",
            format!("'{raw_id}' is not a valid item id"),
        )
    })?;
    ctx.store
        .find_active_item(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| item_not_found(&id))
}

/// The review must be active and belong to `item`.
async fn ensure_active_review(
    ctx: &ApiContext,
    item: &Item,
    raw_id: &str,
) -> Result<Review, ApiError> {
    let id = ReviewId::parse(raw_id).ok_or_else(|| {
        ApiError::for_field(
            ErrorCode::InvalidReference,
            "reviewId",
            format!("'{raw_id}' is not a valid review id"),
        )
    })?;
    ctx.store
        .find_active_review(&id)
        .await
        .map_err(internal)?
        .filter(|review| review.item_id == item.id)
        .ok_or_else(|| review_not_found(&id))
}

fn item_not_found(id: &ItemId) -> ApiError {
    ApiError::for_field(
        ErrorCode::NotFound,
        "itemId",
        format!("no active item found for id {id}"),
    )
}

fn review_not_found(id: &ReviewId) -> ApiError {
    ApiError::for_field(
        ErrorCode::NotFound,
        "reviewId",
        format!("no active review found for id {id}"),
    )
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %format!("{err:#}"), "review store failure");
    ApiError::new(ErrorCode::StoreFailure, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use super::*;

fn draft(item_id: &ItemId, rating: i64) -> ReviewDraft {
    ReviewDraft {
        item_id: item_id.clone(),
        reviewed_by: "Guest".into(),
        text: Some("worth reading".into()),
        rating: Rating::new(rating).expect("rating"),
        reviewed_at: Utc::now(),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let db_path = temp_root.path().join("nested").join("reviews.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn inserted_item_starts_active_with_zero_reviews() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Dune").await.expect("item");
    assert!(!item.is_deleted);
    assert_eq!(item.review_count, 0);

    let found = storage
        .find_active_item(&item.id)
        .await
        .expect("lookup")
        .expect("active item");
    assert_eq!(found, item);
}

#[tokio::test]
async fn soft_deleted_item_is_invisible_and_not_counted() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Emma").await.expect("item");
    assert!(storage.soft_delete_item(&item.id).await.expect("delete"));
    assert!(!storage.soft_delete_item(&item.id).await.expect("second delete"));

    assert!(storage
        .find_active_item(&item.id)
        .await
        .expect("lookup")
        .is_none());
    assert!(storage
        .increment_review_count(&item.id, 1)
        .await
        .expect("increment")
        .is_none());

    let tombstoned = storage
        .find_item(&item.id)
        .await
        .expect("lookup")
        .expect("row retained");
    assert!(tombstoned.is_deleted);
}

#[tokio::test]
async fn increments_and_decrements_review_count() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Ulysses").await.expect("item");

    let up = storage
        .increment_review_count(&item.id, 1)
        .await
        .expect("increment")
        .expect("active");
    assert_eq!(up.review_count, 1);

    let down = storage
        .increment_review_count(&item.id, -1)
        .await
        .expect("decrement")
        .expect("active");
    assert_eq!(down.review_count, 0);
}

#[tokio::test]
async fn counter_cannot_go_negative() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Walden").await.expect("item");
    assert!(storage.increment_review_count(&item.id, -1).await.is_err());
}

#[tokio::test]
async fn created_review_is_active_and_listed() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Dracula").await.expect("item");

    let review = storage
        .create_review(&draft(&item.id, 4))
        .await
        .expect("review");
    assert!(!review.is_deleted);
    assert_eq!(review.item_id, item.id);
    assert_eq!(review.rating.get(), 4);

    let found = storage
        .find_active_review(&review.id)
        .await
        .expect("lookup")
        .expect("active review");
    assert_eq!(found, review);

    let listed = storage.list_active_reviews(&item.id).await.expect("list");
    assert_eq!(listed, vec![review]);
}

#[tokio::test]
async fn update_fields_only_touches_supplied_columns() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Beloved").await.expect("item");
    let review = storage
        .create_review(&draft(&item.id, 2))
        .await
        .expect("review");

    let updated = storage
        .update_review_fields(
            &review.id,
            &ReviewFields {
                rating: Rating::new(5),
                ..ReviewFields::default()
            },
        )
        .await
        .expect("update")
        .expect("active review");

    assert_eq!(updated.rating.get(), 5);
    assert_eq!(updated.text, review.text);
    assert_eq!(updated.reviewed_by, review.reviewed_by);
    assert_eq!(updated.reviewed_at, review.reviewed_at);
}

#[tokio::test]
async fn deleted_review_is_hidden_from_lookups_and_updates() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Middlemarch").await.expect("item");
    let review = storage
        .create_review(&draft(&item.id, 3))
        .await
        .expect("review");

    assert!(storage.mark_review_deleted(&review.id).await.expect("mark"));
    assert!(!storage
        .mark_review_deleted(&review.id)
        .await
        .expect("second mark"));

    assert!(storage
        .find_active_review(&review.id)
        .await
        .expect("lookup")
        .is_none());
    assert!(storage
        .list_active_reviews(&item.id)
        .await
        .expect("list")
        .is_empty());
    let update = storage
        .update_review_fields(
            &review.id,
            &ReviewFields {
                text: Some("edited".into()),
                ..ReviewFields::default()
            },
        )
        .await
        .expect("update");
    assert!(update.is_none());
}

#[tokio::test]
async fn deleted_review_keeps_its_content() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Kindred").await.expect("item");
    let review = storage
        .create_review(&draft(&item.id, 2))
        .await
        .expect("review");
    storage.mark_review_deleted(&review.id).await.expect("mark");

    let row = sqlx::query("SELECT text, rating, is_deleted FROM reviews WHERE id = ?")
        .bind(review.id.as_str())
        .fetch_one(storage.pool())
        .await
        .expect("raw row");
    assert_eq!(row.get::<Option<String>, _>(0).as_deref(), Some("worth reading"));
    assert_eq!(row.get::<i64, _>(1), 2);
    assert!(row.get::<bool, _>(2));
}

#[tokio::test]
async fn record_review_persists_and_counts_together() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Persuasion").await.expect("item");

    let (counted, review) = storage
        .record_review(&draft(&item.id, 5))
        .await
        .expect("record")
        .expect("active item");
    assert_eq!(counted.review_count, 1);
    assert_eq!(review.item_id, item.id);
    assert_eq!(
        storage.list_active_reviews(&item.id).await.expect("list").len(),
        1
    );
}

#[tokio::test]
async fn record_review_on_deleted_item_writes_nothing() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Ivanhoe").await.expect("item");
    storage.soft_delete_item(&item.id).await.expect("delete item");

    let outcome = storage
        .record_review(&draft(&item.id, 5))
        .await
        .expect("record");
    assert!(outcome.is_none());

    let reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(storage.pool())
        .await
        .expect("count");
    assert_eq!(reviews, 0);
}

#[tokio::test]
async fn retire_review_marks_and_uncounts_together() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let item = storage.insert_item("Rebecca").await.expect("item");
    let (_, review) = storage
        .record_review(&draft(&item.id, 4))
        .await
        .expect("record")
        .expect("active item");

    let after = storage
        .retire_review(&item.id, &review.id)
        .await
        .expect("retire")
        .expect("retired");
    assert_eq!(after.review_count, 0);

    let again = storage
        .retire_review(&item.id, &review.id)
        .await
        .expect("second retire");
    assert!(again.is_none());
    let item = storage
        .find_active_item(&item.id)
        .await
        .expect("lookup")
        .expect("active");
    assert_eq!(item.review_count, 0);
}

#[tokio::test]
async fn retire_review_ignores_review_of_another_item() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let owner = storage.insert_item("Owner").await.expect("item");
    let other = storage.insert_item("Other").await.expect("item");
    let (_, review) = storage
        .record_review(&draft(&owner.id, 4))
        .await
        .expect("record")
        .expect("active item");

    let outcome = storage
        .retire_review(&other.id, &review.id)
        .await
        .expect("retire");
    assert!(outcome.is_none());
    assert!(storage
        .find_active_review(&review.id)
        .await
        .expect("lookup")
        .is_some());
}

#[tokio::test]
async fn reconcile_repairs_drifted_counters() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let drifted = storage.insert_item("Drifted").await.expect("item");
    let healthy = storage.insert_item("Healthy").await.expect("item");
    storage
        .record_review(&draft(&drifted.id, 3))
        .await
        .expect("record")
        .expect("active");
    storage
        .record_review(&draft(&healthy.id, 3))
        .await
        .expect("record")
        .expect("active");

    sqlx::query("UPDATE items SET review_count = 7 WHERE id = ?")
        .bind(drifted.id.as_str())
        .execute(storage.pool())
        .await
        .expect("inject drift");

    let fixed = storage.reconcile_review_counts().await.expect("reconcile");
    assert_eq!(fixed, 1);
    let drifted = storage
        .find_active_item(&drifted.id)
        .await
        .expect("lookup")
        .expect("active");
    assert_eq!(drifted.review_count, 1);
    assert_eq!(storage.reconcile_review_counts().await.expect("noop"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_on_file_database_lose_no_updates() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let db_path = temp_root.path().join("concurrent.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let storage = Storage::new(&database_url).await.expect("db");
    let item = storage.insert_item("Contended").await.expect("item");

    let tasks = (0..16).map(|n| {
        let storage = storage.clone();
        let draft = draft(&item.id, n % 5 + 1);
        tokio::spawn(async move { storage.record_review(&draft).await })
    });
    for outcome in futures::future::join_all(tasks).await {
        outcome
            .expect("task")
            .expect("record")
            .expect("active item");
    }

    let item = storage
        .find_active_item(&item.id)
        .await
        .expect("lookup")
        .expect("active");
    assert_eq!(item.review_count, 16);
}

#[test]
fn in_memory_urls_have_no_file_path() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("sqlite:file:reviews?mode=memory&cache=shared").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/reviews.db"),
        Some(PathBuf::from("./data/reviews.db"))
    );
}

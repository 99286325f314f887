//! Reclamation queries: grace-period filtering, cascade deletion, counters.

mod common;

use common::{sqlite_store, wish_record};
use time::{Duration, OffsetDateTime};
use wisp_metadata::repos::WishRepo;

#[tokio::test]
async fn find_reclaimable_respects_the_cutoff() {
    let (_temp, store) = sqlite_store().await;
    let now = OffsetDateTime::now_utc();

    store.create_wish(&wish_record("aaaabbbb", Some(1), None)).await.unwrap();
    store.create_wish(&wish_record("ccccdddd", Some(1), None)).await.unwrap();
    store.create_wish(&wish_record("eeeeffff", Some(1), None)).await.unwrap();

    // One tombstoned long ago, one just now, one still live.
    store
        .tombstone_wish("aaaabbbb", now - Duration::hours(2))
        .await
        .unwrap();
    store.tombstone_wish("ccccdddd", now).await.unwrap();

    let cutoff = now - Duration::hours(1);
    let reclaimable = store.find_reclaimable(cutoff, 100).await.unwrap();
    assert_eq!(reclaimable.len(), 1);
    assert_eq!(reclaimable[0].slug, "aaaabbbb");
}

#[tokio::test]
async fn cutoff_boundary_is_inclusive() {
    let (_temp, store) = sqlite_store().await;
    let now = OffsetDateTime::now_utc();

    store.create_wish(&wish_record("aaaabbbb", Some(1), None)).await.unwrap();
    store.tombstone_wish("aaaabbbb", now).await.unwrap();

    let reclaimable = store.find_reclaimable(now, 100).await.unwrap();
    assert_eq!(reclaimable.len(), 1);
}

#[tokio::test]
async fn delete_wish_cascades_to_images() {
    let (_temp, store) = sqlite_store().await;
    let now = OffsetDateTime::now_utc();

    let wish = store
        .create_wish(&wish_record("aaaabbbb", Some(1), None))
        .await
        .unwrap();
    store
        .add_image(wish.wish_id, "wishes/1/a.webp", now)
        .await
        .unwrap();
    store
        .add_image(wish.wish_id, "wishes/1/b.webp", now)
        .await
        .unwrap();
    assert_eq!(store.count_images().await.unwrap(), 2);

    assert!(store.delete_wish(wish.wish_id).await.unwrap());
    assert_eq!(store.count_images().await.unwrap(), 0);
    assert!(store.get_wish("aaaabbbb").await.unwrap().is_none());

    // A second delete finds nothing.
    assert!(!store.delete_wish(wish.wish_id).await.unwrap());
}

#[tokio::test]
async fn count_tombstoned_splits_at_the_cutoff() {
    let (_temp, store) = sqlite_store().await;
    let now = OffsetDateTime::now_utc();

    store.create_wish(&wish_record("aaaabbbb", Some(1), None)).await.unwrap();
    store.create_wish(&wish_record("ccccdddd", Some(1), None)).await.unwrap();
    store.create_wish(&wish_record("eeeeffff", Some(1), None)).await.unwrap();

    store
        .tombstone_wish("aaaabbbb", now - Duration::hours(2))
        .await
        .unwrap();
    store.tombstone_wish("ccccdddd", now).await.unwrap();

    let counts = store
        .count_tombstoned(now - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(counts.purge_eligible, 1);
    assert_eq!(counts.in_grace_period, 1);

    assert_eq!(store.count_wishes().await.unwrap(), 3);
}

#[tokio::test]
async fn image_bookkeeping_roundtrip() {
    let (_temp, store) = sqlite_store().await;
    let now = OffsetDateTime::now_utc();

    let wish = store
        .create_wish(&wish_record("aaaabbbb", Some(1), None))
        .await
        .unwrap();
    let image = store
        .add_image(wish.wish_id, "wishes/1/a.webp", now)
        .await
        .unwrap();

    let images = store.images_for_wish(wish.wish_id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].path, "wishes/1/a.webp");

    let all = store.list_images().await.unwrap();
    assert_eq!(all.len(), 1);

    assert!(store.delete_image(image.image_id).await.unwrap());
    assert!(!store.delete_image(image.image_id).await.unwrap());
    assert!(store.images_for_wish(wish.wish_id).await.unwrap().is_empty());
}
